//! Generic condition polling
//!
//! A [`Poller`] repeatedly invokes a probe on a fixed interval until the probe
//! reports [`ProbeResult::Done`], the probe reports a non-retryable
//! [`ProbeResult::Fatal`] error, the timeout elapses, or the caller cancels.
//!
//! # Timing
//!
//! Elapsed time is measured from the start of the poll. A probe that is
//! running when the deadline passes is awaited and its result honored, but a
//! probe is never *started* after the deadline: when the next probe would
//! begin past `start + timeout`, the poller sleeps out the remaining budget
//! and reports [`PollError::DeadlineExceeded`]. So with `timeout < interval`
//! an immediate poll probes exactly once and a non-immediate poll not at all.
//!
//! # Example
//!
//! ```ignore
//! use clusterwait::{Poller, PollSpec, ProbeResult};
//!
//! let outcome = Poller::new(PollSpec::new(Duration::from_secs(20), Duration::from_secs(300)))
//!     .describe("kube-apiserver webhook condition")
//!     .run(|| async { check_webhook_condition().await.into() })
//!     .await;
//! outcome.into_result()?;
//! ```

use std::fmt;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// Default time between probe attempts
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Default maximum time to poll (10 minutes)
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(600);

/// Lower bound applied to a zero interval so a misconfigured poll cannot spin
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Description used when the caller does not provide one
const DEFAULT_DESCRIPTION: &str = "condition";

/// Timing configuration for one polling sequence
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollSpec {
    /// Time to sleep between probe attempts
    pub interval: Duration,
    /// Maximum time from poll start before giving up
    pub timeout: Duration,
    /// Probe once before the first sleep
    pub immediate: bool,
}

impl PollSpec {
    /// Create a spec that waits one interval before the first probe
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self {
            interval,
            timeout,
            immediate: false,
        }
    }

    /// Create a spec that probes once before the first sleep
    pub fn immediate(interval: Duration, timeout: Duration) -> Self {
        Self {
            interval,
            timeout,
            immediate: true,
        }
    }

    /// Return a copy with the given `immediate` setting
    pub fn with_immediate(mut self, immediate: bool) -> Self {
        self.immediate = immediate;
        self
    }

    /// Check the `interval > 0` invariant
    pub fn validate(&self) -> crate::Result<()> {
        if self.interval.is_zero() {
            return Err(crate::Error::config(
                "interval",
                "poll interval must be greater than zero",
            ));
        }
        Ok(())
    }
}

impl Default for PollSpec {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL, DEFAULT_POLL_TIMEOUT)
    }
}

/// Result of one probe invocation
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProbeResult<E> {
    /// The condition was observed; stop polling
    Done,
    /// Not there yet; optionally describes what was observed instead
    Retry(Option<String>),
    /// Non-retryable failure; stop polling and surface the error unchanged
    Fatal(E),
}

impl<E> ProbeResult<E> {
    /// Retry without an observation
    pub fn retry() -> Self {
        Self::Retry(None)
    }

    /// Retry, recording what was observed instead of the condition
    pub fn retry_with(observation: impl Into<String>) -> Self {
        Self::Retry(Some(observation.into()))
    }

    /// Whether this result ends polling successfully
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }
}

/// `Ok(true)` is done, `Ok(false)` retries, `Err` is fatal
impl<E> From<Result<bool, E>> for ProbeResult<E> {
    fn from(result: Result<bool, E>) -> Self {
        match result {
            Ok(true) => Self::Done,
            Ok(false) => Self::Retry(None),
            Err(e) => Self::Fatal(e),
        }
    }
}

/// Why polling ended without success
#[derive(Debug, Error, PartialEq)]
pub enum PollError<E> {
    /// The condition was never observed within the timeout
    #[error(
        "{description} was not observed within {timeout:?} ({attempts} attempts){}",
        observation_suffix(.last_observation)
    )]
    DeadlineExceeded {
        /// What was being waited for
        description: String,
        /// Configured timeout
        timeout: Duration,
        /// Probe invocations made
        attempts: u32,
        /// Observation carried by the last `Retry`, if any
        last_observation: Option<String>,
    },

    /// The caller cancelled the poll
    #[error("polling for {description} was cancelled after {attempts} attempts ({elapsed:?})")]
    Cancelled {
        /// What was being waited for
        description: String,
        /// Probe invocations made
        attempts: u32,
        /// Time from poll start to cancellation
        elapsed: Duration,
    },

    /// An unwanted state was observed (see [`crate::wait::never`])
    #[error("{description}: unexpected state observed after {elapsed:?} ({attempts} attempts)")]
    Observed {
        /// What must not happen
        description: String,
        /// Probe invocations made
        attempts: u32,
        /// Time from poll start to the observation
        elapsed: Duration,
    },

    /// The probe itself failed
    #[error("{0}")]
    Probe(E),
}

fn observation_suffix(observation: &Option<String>) -> String {
    match observation {
        Some(obs) => format!("; last observed: {obs}"),
        None => String::new(),
    }
}

impl<E> PollError<E> {
    /// Whether the condition was never observed before the timeout
    pub fn is_deadline_exceeded(&self) -> bool {
        matches!(self, Self::DeadlineExceeded { .. })
    }

    /// Whether an unwanted state was observed
    pub fn is_observed(&self) -> bool {
        matches!(self, Self::Observed { .. })
    }

    /// Whether the caller cancelled the poll
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// The probe's own error, if that is why polling stopped
    pub fn probe_error(&self) -> Option<&E> {
        match self {
            Self::Probe(e) => Some(e),
            _ => None,
        }
    }

    /// Consume and return the probe's own error, if any
    pub fn into_probe_error(self) -> Option<E> {
        match self {
            Self::Probe(e) => Some(e),
            _ => None,
        }
    }
}

/// Attempt count and elapsed time of a successful poll
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollReport {
    /// Probe invocations made
    pub attempts: u32,
    /// Time from poll start to the end of the poll
    pub elapsed: Duration,
}

/// Final result of a poll
#[derive(Debug, PartialEq)]
pub struct PollOutcome<E> {
    /// Whether the probe reported `Done`
    pub succeeded: bool,
    /// Why polling failed; `None` on success
    pub last_error: Option<PollError<E>>,
    /// Probe invocations made
    pub attempts: u32,
    /// Time from poll start to the end of the poll
    pub elapsed: Duration,
}

impl<E> PollOutcome<E> {
    fn success(attempts: u32, elapsed: Duration) -> Self {
        Self {
            succeeded: true,
            last_error: None,
            attempts,
            elapsed,
        }
    }

    fn failure(error: PollError<E>, attempts: u32, elapsed: Duration) -> Self {
        Self {
            succeeded: false,
            last_error: Some(error),
            attempts,
            elapsed,
        }
    }

    /// Attempt count and elapsed time, regardless of success
    pub fn report(&self) -> PollReport {
        PollReport {
            attempts: self.attempts,
            elapsed: self.elapsed,
        }
    }

    /// Convert into a `Result`, keeping the error on failure
    pub fn into_result(self) -> Result<PollReport, PollError<E>> {
        let report = self.report();
        match self.last_error {
            Some(err) => Err(err),
            None => Ok(report),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Waiting,
    Probing,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Waiting => f.write_str("waiting"),
            Phase::Probing => f.write_str("probing"),
        }
    }
}

/// Polls a probe according to a [`PollSpec`]
///
/// Holds no state between runs; each call to [`Poller::run`] owns its own
/// loop state, so one `Poller` can be reused for several polls.
#[derive(Clone, Debug)]
pub struct Poller {
    spec: PollSpec,
    description: String,
    cancel: Option<CancellationToken>,
}

impl Poller {
    /// Create a poller for the given spec
    pub fn new(spec: PollSpec) -> Self {
        Self {
            spec,
            description: DEFAULT_DESCRIPTION.to_string(),
            cancel: None,
        }
    }

    /// Set the human-readable description used in logs and errors
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Stop at the next sleep boundary once `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Replace the spec, keeping description and cancellation
    pub fn with_spec(mut self, spec: PollSpec) -> Self {
        self.spec = spec;
        self
    }

    /// The spec this poller runs with
    pub fn spec(&self) -> &PollSpec {
        &self.spec
    }

    /// The description used in logs and errors
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Poll `probe` until it is done, fails fatally, times out, or is cancelled
    pub async fn run<E, F, Fut>(&self, mut probe: F) -> PollOutcome<E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ProbeResult<E>>,
    {
        let interval = if self.spec.interval.is_zero() {
            warn!(
                description = %self.description,
                "Poll interval is zero, using {:?}",
                MIN_POLL_INTERVAL
            );
            MIN_POLL_INTERVAL
        } else {
            self.spec.interval
        };

        let start = Instant::now();
        let deadline = saturating_add(start, self.spec.timeout);
        let mut attempts = 0u32;
        let mut last_observation: Option<String> = None;
        let mut phase = if self.spec.immediate {
            Phase::Probing
        } else {
            Phase::Waiting
        };

        loop {
            trace!(description = %self.description, %phase, attempts, "Poll transition");

            phase = match phase {
                Phase::Waiting => {
                    let next_probe = saturating_add(Instant::now(), interval);
                    let wake = next_probe.min(deadline);
                    if !self.sleep_until(wake).await {
                        return self.cancelled(attempts, start.elapsed());
                    }
                    if next_probe > deadline {
                        return self.deadline_exceeded(attempts, start.elapsed(), last_observation);
                    }
                    Phase::Probing
                }
                Phase::Probing => {
                    if self.is_cancelled() {
                        return self.cancelled(attempts, start.elapsed());
                    }

                    attempts += 1;
                    match probe().await {
                        ProbeResult::Done => {
                            let elapsed = start.elapsed();
                            debug!(
                                description = %self.description,
                                attempts,
                                elapsed_ms = elapsed.as_millis() as u64,
                                "Condition observed"
                            );
                            return PollOutcome::success(attempts, elapsed);
                        }
                        ProbeResult::Fatal(e) => {
                            let elapsed = start.elapsed();
                            debug!(
                                description = %self.description,
                                attempts,
                                "Probe failed, not retrying"
                            );
                            return PollOutcome::failure(PollError::Probe(e), attempts, elapsed);
                        }
                        ProbeResult::Retry(observation) => {
                            trace!(
                                description = %self.description,
                                attempt = attempts,
                                observation = observation.as_deref().unwrap_or(""),
                                "Condition not yet met, retrying"
                            );
                            if observation.is_some() {
                                last_observation = observation;
                            }
                            if self.is_cancelled() {
                                return self.cancelled(attempts, start.elapsed());
                            }
                            if Instant::now() >= deadline {
                                return self.deadline_exceeded(
                                    attempts,
                                    start.elapsed(),
                                    last_observation,
                                );
                            }
                            Phase::Waiting
                        }
                    }
                }
            };
        }
    }

    /// Run on a fresh current-thread runtime, blocking the calling thread
    ///
    /// Must not be called from inside a Tokio runtime.
    pub fn run_blocking<E, F>(&self, mut probe: F) -> crate::Result<PollOutcome<E>>
    where
        F: FnMut() -> ProbeResult<E>,
    {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .map_err(|e| {
                crate::Error::internal_with_context(
                    "poll_blocking",
                    format!("failed to build runtime: {}", e),
                )
            })?;
        Ok(runtime.block_on(self.run(|| std::future::ready(probe()))))
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|t| t.is_cancelled())
    }

    /// Sleep until `wake`; returns false if cancelled first
    async fn sleep_until(&self, wake: Instant) -> bool {
        match &self.cancel {
            Some(token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => false,
                    _ = tokio::time::sleep_until(wake) => true,
                }
            }
            None => {
                tokio::time::sleep_until(wake).await;
                true
            }
        }
    }

    fn cancelled<E>(&self, attempts: u32, elapsed: Duration) -> PollOutcome<E> {
        debug!(description = %self.description, attempts, "Poll cancelled");
        PollOutcome::failure(
            PollError::Cancelled {
                description: self.description.clone(),
                attempts,
                elapsed,
            },
            attempts,
            elapsed,
        )
    }

    fn deadline_exceeded<E>(
        &self,
        attempts: u32,
        elapsed: Duration,
        last_observation: Option<String>,
    ) -> PollOutcome<E> {
        debug!(
            description = %self.description,
            attempts,
            timeout_secs = self.spec.timeout.as_secs_f64(),
            "Condition not observed before timeout"
        );
        PollOutcome::failure(
            PollError::DeadlineExceeded {
                description: self.description.clone(),
                timeout: self.spec.timeout,
                attempts,
                last_observation,
            },
            attempts,
            elapsed,
        )
    }
}

/// `at + d`, clamped to roughly 30 years out for very large timeouts
fn saturating_add(at: Instant, d: Duration) -> Instant {
    at.checked_add(d)
        .unwrap_or_else(|| at + Duration::from_secs(86_400 * 365 * 30))
}

/// Poll `probe` with `spec` and no cancellation
pub async fn poll<E, F, Fut>(spec: PollSpec, probe: F) -> PollOutcome<E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ProbeResult<E>>,
{
    Poller::new(spec).run(probe).await
}

/// Poll a synchronous `probe`, blocking the calling thread
///
/// Must not be called from inside a Tokio runtime.
pub fn poll_blocking<E, F>(spec: PollSpec, probe: F) -> crate::Result<PollOutcome<E>>
where
    F: FnMut() -> ProbeResult<E>,
{
    Poller::new(spec).run_blocking(probe)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    fn assert_near(actual: Duration, expected: Duration) {
        assert!(
            actual >= expected && actual < expected + Duration::from_millis(10),
            "expected ~{:?}, got {:?}",
            expected,
            actual
        );
    }

    #[derive(Debug, PartialEq, Error)]
    #[error("authentication failed")]
    struct AuthError;

    #[tokio::test(start_paused = true)]
    async fn test_done_after_retries_immediate() {
        let mut calls = 0u32;
        let outcome: PollOutcome<AuthError> = poll(PollSpec::immediate(secs(1), secs(5)), || {
            calls += 1;
            let n = calls;
            async move {
                if n <= 3 {
                    ProbeResult::retry()
                } else {
                    ProbeResult::Done
                }
            }
        })
        .await;

        assert!(outcome.succeeded);
        assert_eq!(outcome.attempts, 4);
        assert!(outcome.last_error.is_none());
        assert_eq!(calls, 4);
        assert_near(outcome.elapsed, secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_always_retry_times_out() {
        let outcome: PollOutcome<AuthError> =
            poll(PollSpec::new(secs(1), secs(3)), || async { ProbeResult::retry() }).await;

        assert!(!outcome.succeeded);
        assert_eq!(outcome.attempts, 3);
        assert!(outcome.last_error.as_ref().unwrap().is_deadline_exceeded());
        assert_near(outcome.elapsed, secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_on_first_attempt() {
        let outcome = poll(PollSpec::new(secs(1), secs(600)), || async {
            ProbeResult::Fatal(AuthError)
        })
        .await;

        assert!(!outcome.succeeded);
        assert_eq!(outcome.attempts, 1);
        assert_eq!(outcome.last_error, Some(PollError::Probe(AuthError)));
        // Non-immediate: one interval waited, not the whole timeout
        assert_near(outcome.elapsed, secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_on_kth_attempt_stops_probing() {
        let mut calls = 0u32;
        let outcome = poll(PollSpec::immediate(secs(1), secs(60)), || {
            calls += 1;
            let n = calls;
            async move {
                if n == 3 {
                    ProbeResult::Fatal(AuthError)
                } else {
                    ProbeResult::retry()
                }
            }
        })
        .await;

        assert_eq!(outcome.attempts, 3);
        assert_eq!(calls, 3);
        assert_eq!(outcome.into_result(), Err(PollError::Probe(AuthError)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_shorter_than_interval_immediate_probes_once() {
        let mut calls = 0u32;
        let outcome: PollOutcome<AuthError> =
            poll(PollSpec::immediate(secs(2), Duration::from_millis(500)), || {
                calls += 1;
                async { ProbeResult::retry() }
            })
            .await;

        assert_eq!(calls, 1);
        assert_eq!(outcome.attempts, 1);
        assert!(outcome.last_error.unwrap().is_deadline_exceeded());
        assert_near(outcome.elapsed, Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_shorter_than_interval_not_immediate_never_probes() {
        let mut calls = 0u32;
        let outcome: PollOutcome<AuthError> =
            poll(PollSpec::new(secs(2), Duration::from_millis(500)), || {
                calls += 1;
                async { ProbeResult::Done }
            })
            .await;

        assert_eq!(calls, 0);
        assert_eq!(outcome.attempts, 0);
        assert!(!outcome.succeeded);
        assert!(outcome.last_error.unwrap().is_deadline_exceeded());
        assert_near(outcome.elapsed, Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_probe_started_past_deadline() {
        // Probes at 0, 1, 2, 3; a probe at 4 would start after the 3.5s deadline
        let outcome: PollOutcome<AuthError> = poll(
            PollSpec::immediate(secs(1), Duration::from_millis(3500)),
            || async { ProbeResult::retry() },
        )
        .await;

        assert_eq!(outcome.attempts, 4);
        assert_near(outcome.elapsed, Duration::from_millis(3500));
        let expected = secs(1) * outcome.attempts;
        let drift = if expected > outcome.elapsed {
            expected - outcome.elapsed
        } else {
            outcome.elapsed - expected
        };
        assert!(drift <= secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_probe_at_deadline_is_honored() {
        let mut calls = 0u32;
        let outcome: PollOutcome<AuthError> = poll(PollSpec::immediate(secs(1), secs(3)), || {
            calls += 1;
            let n = calls;
            async move {
                tokio::time::sleep(secs(2)).await;
                if n == 2 {
                    ProbeResult::Done
                } else {
                    ProbeResult::retry()
                }
            }
        })
        .await;

        // Second probe starts at 3s and finishes at 5s, past the deadline
        assert!(outcome.succeeded);
        assert_eq!(outcome.attempts, 2);
        assert_near(outcome.elapsed, secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_keeps_last_observation() {
        let mut calls = 0u32;
        let outcome: PollOutcome<AuthError> = poll(PollSpec::new(secs(1), secs(3)), || {
            calls += 1;
            let n = calls;
            async move {
                match n {
                    1 => ProbeResult::retry_with("Available=False"),
                    2 => ProbeResult::retry_with("Available=Unknown"),
                    _ => ProbeResult::retry(),
                }
            }
        })
        .await;

        match outcome.last_error {
            Some(PollError::DeadlineExceeded {
                last_observation,
                attempts,
                ..
            }) => {
                assert_eq!(attempts, 3);
                assert_eq!(last_observation.as_deref(), Some("Available=Unknown"));
            }
            other => panic!("expected deadline exceeded, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_error_message() {
        let outcome: PollOutcome<AuthError> = Poller::new(PollSpec::new(secs(1), secs(2)))
            .describe("operator authentication to become available")
            .run(|| async { ProbeResult::retry_with("Progressing=True") })
            .await;

        let msg = outcome.last_error.unwrap().to_string();
        assert!(msg.starts_with("operator authentication to become available was not observed within 2s"));
        assert!(msg.ends_with("last observed: Progressing=True"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_sleep() {
        let token = CancellationToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(1500)).await;
            canceller.cancel();
        });

        let outcome: PollOutcome<AuthError> = Poller::new(PollSpec::new(secs(1), secs(60)))
            .with_cancellation(token)
            .run(|| async { ProbeResult::retry() })
            .await;

        assert_eq!(outcome.attempts, 1);
        assert!(outcome.last_error.as_ref().unwrap().is_cancelled());
        assert!(!outcome.last_error.unwrap().is_deadline_exceeded());
        assert_near(outcome.elapsed, Duration::from_millis(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_last_probe_is_not_a_timeout() {
        let token = CancellationToken::new();
        let canceller = token.clone();

        let outcome: PollOutcome<AuthError> = Poller::new(PollSpec::immediate(secs(1), secs(2)))
            .with_cancellation(token)
            .run(|| {
                let canceller = canceller.clone();
                async move {
                    tokio::time::sleep(secs(3)).await;
                    canceller.cancel();
                    ProbeResult::retry()
                }
            })
            .await;

        // The probe finishes past the deadline, but cancellation wins
        let err = outcome.last_error.unwrap();
        assert!(err.is_cancelled(), "got {:?}", err);
        assert_eq!(outcome.attempts, 1);
        assert_near(outcome.elapsed, secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_already_cancelled_never_probes() {
        let token = CancellationToken::new();
        token.cancel();
        let mut calls = 0u32;

        let outcome: PollOutcome<AuthError> = Poller::new(PollSpec::immediate(secs(1), secs(60)))
            .with_cancellation(token)
            .run(|| {
                calls += 1;
                async { ProbeResult::Done }
            })
            .await;

        assert_eq!(calls, 0);
        assert!(outcome.last_error.unwrap().is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_polls_classify_identically() {
        let poller = Poller::new(PollSpec::new(secs(1), secs(4)));
        for _ in 0..2 {
            let outcome: PollOutcome<AuthError> =
                poller.run(|| async { ProbeResult::retry() }).await;
            assert!(outcome.last_error.unwrap().is_deadline_exceeded());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_is_clamped() {
        let mut calls = 0u32;
        let outcome: PollOutcome<AuthError> =
            poll(PollSpec::immediate(Duration::ZERO, Duration::from_millis(5)), || {
                calls += 1;
                async { ProbeResult::retry() }
            })
            .await;

        assert!(outcome.last_error.unwrap().is_deadline_exceeded());
        assert!(calls >= 2 && calls <= 6, "calls = {}", calls);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbounded_timeout() {
        let outcome: PollOutcome<AuthError> =
            poll(PollSpec::immediate(secs(1), Duration::MAX), || async { ProbeResult::Done }).await;
        assert!(outcome.succeeded);
        assert_eq!(outcome.attempts, 1);
    }

    #[test]
    fn test_probe_result_from_bool_result() {
        assert_eq!(ProbeResult::<AuthError>::from(Ok(true)), ProbeResult::Done);
        assert_eq!(ProbeResult::<AuthError>::from(Ok(false)), ProbeResult::Retry(None));
        assert_eq!(ProbeResult::from(Err(AuthError)), ProbeResult::Fatal(AuthError));
    }

    #[test]
    fn test_spec_validate() {
        assert!(PollSpec::new(secs(1), secs(5)).validate().is_ok());
        assert!(PollSpec::new(Duration::ZERO, secs(5)).validate().is_err());
        assert!(PollSpec::default().with_immediate(true).immediate);
    }

    #[test]
    fn test_poll_blocking() {
        let mut calls = 0u32;
        let outcome = poll_blocking(
            PollSpec::immediate(Duration::from_millis(5), secs(5)),
            || {
                calls += 1;
                if calls < 3 {
                    ProbeResult::retry()
                } else {
                    ProbeResult::<AuthError>::Done
                }
            },
        )
        .unwrap();

        assert!(outcome.succeeded);
        assert_eq!(outcome.attempts, 3);
    }

    #[test]
    fn test_poll_blocking_propagates_fatal() {
        let outcome = poll_blocking(
            PollSpec::immediate(Duration::from_millis(5), secs(5)),
            || ProbeResult::Fatal("malformed selector"),
        )
        .unwrap();

        assert_eq!(outcome.attempts, 1);
        assert_eq!(
            outcome.last_error.and_then(PollError::into_probe_error),
            Some("malformed selector")
        );
    }
}
