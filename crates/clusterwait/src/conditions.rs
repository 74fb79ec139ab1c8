//! Resource condition comparison
//!
//! Parses the `status.conditions` of a Kubernetes-style resource from CLI
//! JSON output and compares it against expectations. Each comparison also
//! has a `probe` form that maps the result onto [`ProbeResult`] so it can be
//! handed straight to a [`crate::Poller`].

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::poll::ProbeResult;
use crate::reason::ReasonMatch;
use crate::Error;

/// Status of a condition that holds
pub const STATUS_TRUE: &str = "True";
/// Status of a condition that does not hold
pub const STATUS_FALSE: &str = "False";

/// One entry of `status.conditions`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Condition type (e.g., "Available")
    #[serde(rename = "type")]
    pub type_: String,
    /// "True", "False" or "Unknown"
    pub status: String,
    /// Machine-readable reason for the last transition
    #[serde(default)]
    pub reason: Option<String>,
    /// Human-readable message
    #[serde(default)]
    pub message: Option<String>,
    /// RFC 3339 timestamp of the last transition
    #[serde(default)]
    pub last_transition_time: Option<String>,
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.type_, self.status)?;
        if let Some(reason) = &self.reason {
            write!(f, " ({})", reason)?;
        }
        Ok(())
    }
}

/// The conditions of one resource
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Conditions(Vec<Condition>);

impl Conditions {
    /// Wrap an already-parsed list
    pub fn new(conditions: Vec<Condition>) -> Self {
        Self(conditions)
    }

    /// Parse conditions from CLI JSON output
    ///
    /// Accepts a whole resource (`status.conditions` is read), a bare status
    /// object, a conditions array, or a single condition object as printed by
    /// a `jsonpath` filter expression. Surrounding single quotes are stripped.
    /// Empty output parses as no conditions.
    pub fn from_json(raw: &str) -> crate::Result<Self> {
        let trimmed = strip_quotes(raw.trim());
        if trimmed.is_empty() {
            return Ok(Self::default());
        }

        let value: Value = serde_json::from_str(trimmed)?;
        match value {
            Value::Array(_) => Ok(Self(serde_json::from_value(value)?)),
            Value::Object(ref obj) => {
                if obj.get("type").is_some_and(Value::is_string)
                    && obj.get("status").is_some_and(Value::is_string)
                {
                    return Ok(Self(vec![serde_json::from_value(value.clone())?]));
                }
                if let Some(status) = obj.get("status").and_then(Value::as_object) {
                    return match status.get("conditions").filter(|c| !c.is_null()) {
                        Some(conditions) => Ok(Self(serde_json::from_value(conditions.clone())?)),
                        None => Ok(Self::default()),
                    };
                }
                if let Some(conditions) = obj.get("conditions") {
                    if conditions.is_null() {
                        return Ok(Self::default());
                    }
                    return Ok(Self(serde_json::from_value(conditions.clone())?));
                }
                Err(Error::parse(
                    "conditions",
                    "object has neither status.conditions nor condition fields",
                ))
            }
            other => Err(Error::parse(
                "conditions",
                format!("expected an object or array, got {}", json_kind(&other)),
            )),
        }
    }

    /// Look up a condition by type
    pub fn get(&self, type_: &str) -> Option<&Condition> {
        self.0.iter().find(|c| c.type_ == type_)
    }

    /// Status of the condition with the given type
    pub fn status_of(&self, type_: &str) -> Option<&str> {
        self.get(type_).map(|c| c.status.as_str())
    }

    /// Iterate over all conditions
    pub fn iter(&self) -> impl Iterator<Item = &Condition> {
        self.0.iter()
    }

    /// Number of conditions
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no conditions
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn strip_quotes(s: &str) -> &str {
    s.strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .unwrap_or(s)
        .trim()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// One condition whose status differs from the expectation
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusMismatch {
    /// Condition type
    pub type_: String,
    /// Expected status
    pub expected: String,
    /// Observed status; `None` if the condition is absent
    pub actual: Option<String>,
}

impl fmt::Display for StatusMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.actual {
            Some(actual) => write!(
                f,
                "{}: expected {}, got {}",
                self.type_, self.expected, actual
            ),
            None => write!(f, "{}: expected {}, condition missing", self.type_, self.expected),
        }
    }
}

/// Expected status per condition type
///
/// Conditions not named in the expectation are ignored.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StatusExpectation(BTreeMap<String, String>);

impl StatusExpectation {
    /// Empty expectation (matches anything)
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the expected status for a condition type
    pub fn expect(mut self, type_: impl Into<String>, status: impl Into<String>) -> Self {
        self.0.insert(type_.into(), status.into());
        self
    }

    /// Available=True, Progressing=False, Degraded=False
    pub fn healthy_operator() -> Self {
        Self::new()
            .expect("Available", STATUS_TRUE)
            .expect("Progressing", STATUS_FALSE)
            .expect("Degraded", STATUS_FALSE)
    }

    /// Conditions whose status differs, in type order
    pub fn diff(&self, conditions: &Conditions) -> Vec<StatusMismatch> {
        self.0
            .iter()
            .filter_map(|(type_, expected)| {
                let actual = conditions.status_of(type_);
                if actual == Some(expected.as_str()) {
                    None
                } else {
                    Some(StatusMismatch {
                        type_: type_.clone(),
                        expected: expected.clone(),
                        actual: actual.map(str::to_string),
                    })
                }
            })
            .collect()
    }

    /// Whether every expected status is observed
    pub fn is_met(&self, conditions: &Conditions) -> bool {
        self.diff(conditions).is_empty()
    }

    /// Probe over raw CLI JSON output
    ///
    /// Output that cannot be parsed is fatal; mismatches are retried with the
    /// mismatches as the observation.
    pub fn probe(&self, raw: &str) -> ProbeResult<Error> {
        let conditions = match Conditions::from_json(raw) {
            Ok(c) => c,
            Err(e) => return ProbeResult::Fatal(e),
        };
        let mismatches = self.diff(&conditions);
        if mismatches.is_empty() {
            ProbeResult::Done
        } else {
            let observed: Vec<String> = mismatches.iter().map(ToString::to_string).collect();
            ProbeResult::retry_with(observed.join("; "))
        }
    }
}

impl<K, V> FromIterator<(K, V)> for StatusExpectation
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl fmt::Display for StatusExpectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|(t, s)| format!("{t}={s}")).collect();
        f.write_str(&parts.join(", "))
    }
}

/// Match a single condition by type, status and optionally reason
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConditionMatcher {
    /// Condition type to look up
    pub type_: String,
    /// Required status
    pub status: String,
    /// Required reason(s); matched against the reason, then the message
    pub reason: Option<ReasonMatch>,
}

impl ConditionMatcher {
    /// Match on type and status only
    pub fn new(type_: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            type_: type_.into(),
            status: status.into(),
            reason: None,
        }
    }

    /// Also require the given reason(s)
    pub fn with_reason(mut self, reason: impl Into<ReasonMatch>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Whether the matching condition is present
    pub fn matches(&self, conditions: &Conditions) -> bool {
        conditions.get(&self.type_).is_some_and(|c| self.matches_condition(c))
    }

    fn matches_condition(&self, condition: &Condition) -> bool {
        if condition.status != self.status {
            return false;
        }
        match &self.reason {
            None => true,
            Some(reason) => {
                condition.reason.as_deref().is_some_and(|r| reason.matches(r))
                    || condition.message.as_deref().is_some_and(|m| reason.matches(m))
            }
        }
    }

    /// Probe over raw CLI JSON output
    pub fn probe(&self, raw: &str) -> ProbeResult<Error> {
        let conditions = match Conditions::from_json(raw) {
            Ok(c) => c,
            Err(e) => return ProbeResult::Fatal(e),
        };
        match conditions.get(&self.type_) {
            Some(c) if self.matches_condition(c) => ProbeResult::Done,
            Some(c) => ProbeResult::retry_with(c.to_string()),
            None => ProbeResult::retry_with(format!("{} not present", self.type_)),
        }
    }
}

impl fmt::Display for ConditionMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.type_, self.status)?;
        if let Some(reason) = &self.reason {
            write!(f, " with reason {}", reason)?;
        }
        Ok(())
    }
}
