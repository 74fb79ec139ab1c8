//! Polling defaults loaded from the environment
//!
//! ```bash
//! CLUSTERWAIT_POLL_INTERVAL_SECS=5    # time between probes
//! CLUSTERWAIT_POLL_TIMEOUT_SECS=900   # overall timeout per poll
//! CLUSTERWAIT_HTTP_TIMEOUT_SECS=3     # per-request timeout for HTTP probes
//! CLUSTERWAIT_TIMEOUT_SCALE=2.5       # multiplier applied to the timeout on slow CI
//! ```

use std::time::Duration;

use crate::poll::{PollSpec, DEFAULT_POLL_INTERVAL, DEFAULT_POLL_TIMEOUT};
use crate::Error;

/// Environment variable for the probe interval in seconds
pub const ENV_POLL_INTERVAL: &str = "CLUSTERWAIT_POLL_INTERVAL_SECS";
/// Environment variable for the poll timeout in seconds
pub const ENV_POLL_TIMEOUT: &str = "CLUSTERWAIT_POLL_TIMEOUT_SECS";
/// Environment variable for the HTTP request timeout in seconds
pub const ENV_HTTP_TIMEOUT: &str = "CLUSTERWAIT_HTTP_TIMEOUT_SECS";
/// Environment variable for the timeout multiplier
pub const ENV_TIMEOUT_SCALE: &str = "CLUSTERWAIT_TIMEOUT_SCALE";

/// Default per-request timeout for HTTP probes
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(3);

/// Polling defaults shared by the scenarios of one run
#[derive(Clone, Debug, PartialEq)]
pub struct PollConfig {
    /// Time between probe attempts
    pub interval: Duration,
    /// Overall timeout per poll, already scaled
    pub timeout: Duration,
    /// Per-request timeout for HTTP probes
    pub http_timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_POLL_TIMEOUT,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }
}

impl PollConfig {
    /// Load from the process environment, falling back to defaults
    pub fn from_env() -> crate::Result<Self> {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Load using `lookup` to resolve variable names
    pub fn from_env_with<F>(lookup: F) -> crate::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let interval = secs_var(&lookup, ENV_POLL_INTERVAL)?.unwrap_or(defaults.interval);
        let timeout = secs_var(&lookup, ENV_POLL_TIMEOUT)?.unwrap_or(defaults.timeout);
        let http_timeout = secs_var(&lookup, ENV_HTTP_TIMEOUT)?.unwrap_or(defaults.http_timeout);

        if interval.is_zero() {
            return Err(Error::config(ENV_POLL_INTERVAL, "must be greater than zero"));
        }

        let scale = match lookup(ENV_TIMEOUT_SCALE) {
            Some(raw) => {
                let scale: f64 = raw.trim().parse().map_err(|_| {
                    Error::config(ENV_TIMEOUT_SCALE, format!("not a number: {:?}", raw))
                })?;
                if !scale.is_finite() || scale <= 0.0 {
                    return Err(Error::config(
                        ENV_TIMEOUT_SCALE,
                        format!("must be a positive number, got {}", scale),
                    ));
                }
                scale
            }
            None => 1.0,
        };

        Ok(Self {
            interval,
            timeout: timeout.mul_f64(scale),
            http_timeout,
        })
    }

    /// Spec that waits one interval before the first probe
    pub fn spec(&self) -> PollSpec {
        PollSpec::new(self.interval, self.timeout)
    }

    /// Spec that probes immediately
    pub fn immediate_spec(&self) -> PollSpec {
        PollSpec::immediate(self.interval, self.timeout)
    }
}

fn secs_var<F>(lookup: &F, key: &str) -> crate::Result<Option<Duration>>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(|s| Some(Duration::from_secs(s)))
            .map_err(|_| Error::config(key, format!("expected whole seconds, got {:?}", raw))),
        None => Ok(None),
    }
}
