//! Error types for the helper modules
//!
//! Polling itself reports through [`crate::PollError`]; this type covers the
//! things around it: configuration, parsing observed state, and HTTP probes.

use thiserror::Error;

/// Main error type for clusterwait helpers
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid configuration value
    #[error("configuration error for {key}: {message}")]
    Config {
        /// Setting or environment variable that was rejected
        key: String,
        /// Description of what's invalid
        message: String,
    },

    /// Observed state had an unexpected shape
    #[error("parse error [{context}]: {message}")]
    Parse {
        /// What was being parsed (e.g., "conditions")
        context: String,
        /// Description of what failed
        message: String,
    },

    /// HTTP request could not be built or sent
    #[error("http error for {url}: {message}")]
    Http {
        /// Target URL
        url: String,
        /// Description of what failed
        message: String,
    },

    /// Internal/operational error
    #[error("internal error [{context}]: {message}")]
    Internal {
        /// Description of what failed
        message: String,
        /// Context where the error occurred (e.g., "poll_blocking", "cleanup")
        context: String,
    },
}

impl Error {
    /// Create a configuration error for the given key
    pub fn config(key: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Config {
            key: key.into(),
            message: msg.into(),
        }
    }

    /// Create a parse error with context
    pub fn parse(context: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Parse {
            context: context.into(),
            message: msg.into(),
        }
    }

    /// Create an HTTP error for the given URL
    pub fn http(url: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Http {
            url: url.into(),
            message: msg.into(),
        }
    }

    /// Create an internal error with context
    pub fn internal_with_context(context: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
            context: context.into(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::parse("json", e.to_string())
    }
}
