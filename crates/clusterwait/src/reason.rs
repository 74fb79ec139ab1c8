//! Reason matching for condition checks
//!
//! Some checks accept exactly one reason, others accept any of several
//! (an admission webhook may report `WebhookServiceNotFound` or
//! `WebhookServiceNotReady` for the same fault). [`ReasonMatch`] makes the
//! two cases explicit.

use std::fmt;

/// Expected reason(s) for a condition
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReasonMatch {
    /// Exactly this reason must appear
    Single(String),
    /// At least one of these reasons must appear
    AnyOf(Vec<String>),
}

impl ReasonMatch {
    /// Whether `text` contains the expected reason (or any of them)
    ///
    /// Matching is by substring, so `text` can be a bare reason or a whole
    /// serialized condition. An empty `AnyOf` never matches.
    pub fn matches(&self, text: &str) -> bool {
        match self {
            ReasonMatch::Single(reason) => text.contains(reason.as_str()),
            ReasonMatch::AnyOf(reasons) => reasons.iter().any(|r| text.contains(r.as_str())),
        }
    }
}

impl fmt::Display for ReasonMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReasonMatch::Single(reason) => f.write_str(reason),
            ReasonMatch::AnyOf(reasons) => write!(f, "any of [{}]", reasons.join(", ")),
        }
    }
}

impl From<&str> for ReasonMatch {
    fn from(reason: &str) -> Self {
        ReasonMatch::Single(reason.to_string())
    }
}

impl From<String> for ReasonMatch {
    fn from(reason: String) -> Self {
        ReasonMatch::Single(reason)
    }
}

impl From<Vec<String>> for ReasonMatch {
    fn from(reasons: Vec<String>) -> Self {
        ReasonMatch::AnyOf(reasons)
    }
}

impl<const N: usize> From<[&str; N]> for ReasonMatch {
    fn from(reasons: [&str; N]) -> Self {
        ReasonMatch::AnyOf(reasons.iter().map(|r| r.to_string()).collect())
    }
}
