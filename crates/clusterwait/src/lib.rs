//! Condition polling and wait primitives for end-to-end cluster tests
//!
//! Every check against an eventually consistent control plane goes through
//! [`Poller`]: operator availability, alert firing, pod readiness, resource
//! field convergence. The helper modules map common observations (resource
//! conditions, HTTP responses) onto [`ProbeResult`] so call sites stay small.

#![deny(missing_docs)]

pub mod conditions;
pub mod config;
pub mod context;
pub mod error;
pub mod http;
pub mod poll;
pub mod reason;
pub mod telemetry;
pub mod wait;

pub use conditions::{Condition, ConditionMatcher, Conditions, StatusExpectation};
pub use config::PollConfig;
pub use context::ScenarioContext;
pub use error::Error;
pub use http::HttpProbe;
pub use poll::{
    poll, poll_blocking, PollError, PollOutcome, PollReport, PollSpec, Poller, ProbeResult,
};
pub use reason::ReasonMatch;
pub use wait::{consistently, eventually, eventually_stable, never};

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;
