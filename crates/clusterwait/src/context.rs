//! Per-scenario state
//!
//! Each test scenario gets its own [`ScenarioContext`] holding its polling
//! defaults, a cancellation token, scratch values shared between steps, and
//! the cleanups to run when it finishes. Nothing here is process-wide, so
//! independent scenarios never see each other's state.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::PollConfig;
use crate::poll::{PollSpec, Poller};

type CleanupFn = Box<dyn FnOnce() -> BoxFuture<'static, Result<(), String>> + Send>;

/// A cleanup that returned an error
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CleanupFailure {
    /// Description given to [`ScenarioContext::defer`]
    pub description: String,
    /// Error returned by the cleanup
    pub error: String,
}

/// State owned by one test scenario
pub struct ScenarioContext {
    name: String,
    namespace: Option<String>,
    config: PollConfig,
    cancel: CancellationToken,
    values: HashMap<String, String>,
    cleanups: Vec<(String, CleanupFn)>,
}

impl ScenarioContext {
    /// Create a context for the named scenario
    pub fn new(name: impl Into<String>, config: PollConfig) -> Self {
        Self {
            name: name.into(),
            namespace: None,
            config,
            cancel: CancellationToken::new(),
            values: HashMap::new(),
            cleanups: Vec::new(),
        }
    }

    /// Set the namespace the scenario works in
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Scenario name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Namespace the scenario works in, if any
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Polling defaults
    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    /// Default spec (waits one interval before the first probe)
    pub fn spec(&self) -> PollSpec {
        self.config.spec()
    }

    /// Default spec that probes immediately
    pub fn immediate_spec(&self) -> PollSpec {
        self.config.immediate_spec()
    }

    /// Poller with the default spec, cancelled with this scenario
    pub fn poller(&self, description: impl Into<String>) -> Poller {
        self.poller_with(description, self.spec())
    }

    /// Poller with a custom spec, cancelled with this scenario
    pub fn poller_with(&self, description: impl Into<String>, spec: PollSpec) -> Poller {
        Poller::new(spec)
            .describe(format!("[{}] {}", self.name, description.into()))
            .with_cancellation(self.cancel.child_token())
    }

    /// Token cancelled together with this scenario
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.child_token()
    }

    /// Cancel every poll created from this context
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Whether [`ScenarioContext::cancel`] has been called
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Store a value for later steps
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Read a stored value
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Remove and return a stored value
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.values.remove(key)
    }

    /// Register a cleanup; cleanups run in reverse registration order
    pub fn defer<F, Fut>(&mut self, description: impl Into<String>, cleanup: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), String>> + Send + 'static,
    {
        self.cleanups
            .push((description.into(), Box::new(move || cleanup().boxed())));
    }

    /// Number of cleanups not yet run
    pub fn pending_cleanups(&self) -> usize {
        self.cleanups.len()
    }

    /// Run all registered cleanups, newest first
    ///
    /// A failing cleanup is logged and does not stop the others.
    pub async fn run_cleanups(&mut self) -> Vec<CleanupFailure> {
        let mut failures = Vec::new();
        while let Some((description, cleanup)) = self.cleanups.pop() {
            match cleanup().await {
                Ok(()) => info!(scenario = %self.name, cleanup = %description, "Cleanup done"),
                Err(error) => {
                    warn!(scenario = %self.name, cleanup = %description, error = %error, "Cleanup failed");
                    failures.push(CleanupFailure { description, error });
                }
            }
        }
        failures
    }
}

impl fmt::Debug for ScenarioContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScenarioContext")
            .field("name", &self.name)
            .field("namespace", &self.namespace)
            .field("config", &self.config)
            .field("cancelled", &self.cancel.is_cancelled())
            .field("values", &self.values)
            .field("pending_cleanups", &self.cleanups.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poll::ProbeResult;
    use crate::wait::eventually;
    use std::sync::Arc;
    use std::time::Duration;

    fn context() -> ScenarioContext {
        ScenarioContext::new(
            "ocp-41899",
            PollConfig {
                interval: Duration::from_secs(1),
                timeout: Duration::from_secs(30),
                ..Default::default()
            },
        )
        .with_namespace("e2e-test-apiserver")
    }

    #[test]
    fn test_specs_follow_config() {
        let ctx = context();
        assert_eq!(ctx.spec().interval, Duration::from_secs(1));
        assert_eq!(ctx.spec().timeout, Duration::from_secs(30));
        assert!(!ctx.spec().immediate);
        assert!(ctx.immediate_spec().immediate);
        assert_eq!(ctx.namespace(), Some("e2e-test-apiserver"));
    }

    #[test]
    fn test_poller_description_is_scoped() {
        let ctx = context();
        assert_eq!(
            ctx.poller("kube-apiserver rollout").description(),
            "[ocp-41899] kube-apiserver rollout"
        );
    }

    #[test]
    fn test_values() {
        let mut ctx = context();
        assert_eq!(ctx.get("previous-profile"), None);
        ctx.set("previous-profile", "Default");
        assert_eq!(ctx.get("previous-profile"), Some("Default"));
        assert_eq!(ctx.remove("previous-profile").as_deref(), Some("Default"));
        assert_eq!(ctx.get("previous-profile"), None);
    }

    #[test]
    fn test_contexts_are_independent() {
        let mut a = context();
        let b = context();
        a.set("key", "value");
        a.cancel();
        assert_eq!(b.get("key"), None);
        assert!(!b.is_cancelled());
    }

    #[tokio::test]
    async fn test_cleanups_run_newest_first_and_continue_on_failure() {
        let mut ctx = context();
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));

        for name in ["delete namespace", "restore audit profile", "delete webhook"] {
            let order = order.clone();
            ctx.defer(name, move || async move {
                order.lock().push(name);
                if name == "restore audit profile" {
                    Err("patch rejected".to_string())
                } else {
                    Ok(())
                }
            });
        }
        assert_eq!(ctx.pending_cleanups(), 3);

        let failures = ctx.run_cleanups().await;

        assert_eq!(
            *order.lock(),
            vec!["delete webhook", "restore audit profile", "delete namespace"]
        );
        assert_eq!(
            failures,
            vec![CleanupFailure {
                description: "restore audit profile".to_string(),
                error: "patch rejected".to_string(),
            }]
        );
        assert_eq!(ctx.pending_cleanups(), 0);
        assert!(ctx.run_cleanups().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_handed_out_token_does_not_cancel_scenario() {
        let ctx = context();
        let poller = ctx.poller("operator available");
        let token = ctx.cancellation_token();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(2500)).await;
            token.cancel();
        });

        let err = eventually::<String, _, _>(&poller, || async { ProbeResult::retry() })
            .await
            .unwrap_err();
        assert!(err.is_deadline_exceeded());
        assert!(!ctx.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_scenario_cancel_reaches_pollers() {
        let ctx = context();
        let poller = ctx.poller("alert firing");
        let scenario_token = ctx.cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(2500)).await;
            scenario_token.cancel();
        });

        let err = eventually::<String, _, _>(&poller, || async { ProbeResult::retry() })
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
        assert!(ctx.is_cancelled());
    }
}
