//! Assertion-style wrappers around [`Poller`]
//!
//! A poll that times out means different things at different call sites:
//! a failure when waiting for something to happen, a pass when checking that
//! something does *not* happen within a window. Each intent gets its own
//! function so the meaning of a timeout is never implicit.
//!
//! | Function            | Passes when                                   |
//! |---------------------|-----------------------------------------------|
//! | [`eventually`]      | the probe reports `Done` before the timeout   |
//! | [`never`]           | the timeout is reached without `Done`         |
//! | [`consistently`]    | the check is true at every probe              |
//! | [`eventually_stable`] | the check stays true for a whole window     |

use std::future::Future;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::poll::{PollError, PollReport, PollSpec, Poller, ProbeResult};

/// Wait until the probe reports `Done`; a timeout is a failure
pub async fn eventually<E, F, Fut>(poller: &Poller, probe: F) -> Result<PollReport, PollError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ProbeResult<E>>,
{
    let outcome = poller.run(probe).await;
    if outcome.succeeded {
        info!(
            description = %poller.description(),
            attempts = outcome.attempts,
            elapsed_secs = outcome.elapsed.as_secs_f64(),
            "Condition met"
        );
    } else {
        warn!(
            description = %poller.description(),
            attempts = outcome.attempts,
            elapsed_secs = outcome.elapsed.as_secs_f64(),
            "Condition not met"
        );
    }
    outcome.into_result()
}

/// Check that the probe never reports `Done` within the poll window
///
/// The probe returns `Done` when it sees the unwanted state. Reaching the
/// timeout passes; `Done` fails with [`PollError::Observed`]. Fatal probe
/// errors and cancellation still fail.
///
/// The window is always checked at least once: when the spec waits first and
/// the timeout is shorter than the interval, the single probe runs at the end
/// of the window.
pub async fn never<E, F, Fut>(poller: &Poller, probe: F) -> Result<PollReport, PollError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ProbeResult<E>>,
{
    let windowed;
    let poller = match at_least_one_probe(poller.spec()) {
        Some(spec) => {
            windowed = poller.clone().with_spec(spec);
            &windowed
        }
        None => poller,
    };

    let outcome = poller.run(probe).await;
    let report = outcome.report();
    match outcome.last_error {
        None => {
            warn!(
                description = %poller.description(),
                attempts = report.attempts,
                "Unwanted state observed"
            );
            Err(PollError::Observed {
                description: poller.description().to_string(),
                attempts: report.attempts,
                elapsed: report.elapsed,
            })
        }
        Some(PollError::DeadlineExceeded { .. }) => {
            debug!(
                description = %poller.description(),
                attempts = report.attempts,
                "Unwanted state not observed within window"
            );
            Ok(report)
        }
        Some(err) => Err(err),
    }
}

/// Spec that probes at least once within the window, if `spec` would not
fn at_least_one_probe(spec: &PollSpec) -> Option<PollSpec> {
    if spec.immediate || spec.timeout >= spec.interval {
        return None;
    }
    if spec.timeout.is_zero() {
        return Some(spec.with_immediate(true));
    }
    Some(PollSpec::new(spec.timeout, spec.timeout))
}

/// Check that `check` stays true at every probe for the whole poll window
///
/// The first `Ok(false)` fails with [`PollError::Observed`].
pub async fn consistently<E, F, Fut>(
    poller: &Poller,
    mut check: F,
) -> Result<PollReport, PollError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, E>>,
{
    never(poller, move || {
        let fut = check();
        async move {
            match fut.await {
                Ok(true) => ProbeResult::retry(),
                Ok(false) => ProbeResult::Done,
                Err(e) => ProbeResult::Fatal(e),
            }
        }
    })
    .await
}

/// Wait until `check` has been true at every probe for at least `window`
///
/// A false observation restarts the window. Errors from `check` are fatal.
pub async fn eventually_stable<E, F, Fut>(
    poller: &Poller,
    window: Duration,
    mut check: F,
) -> Result<PollReport, PollError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, E>>,
{
    let held_since: Mutex<Option<Instant>> = Mutex::new(None);
    let held_since = &held_since;

    eventually(poller, move || {
        let fut = check();
        async move {
            match fut.await {
                Ok(true) => {
                    let now = Instant::now();
                    let since = *held_since.lock().get_or_insert(now);
                    let held = now.duration_since(since);
                    if held >= window {
                        ProbeResult::Done
                    } else {
                        ProbeResult::retry_with(format!("held for {:?} of {:?}", held, window))
                    }
                }
                Ok(false) => {
                    *held_since.lock() = None;
                    ProbeResult::retry_with("condition not holding")
                }
                Err(e) => ProbeResult::Fatal(e),
            }
        }
    })
    .await
}
