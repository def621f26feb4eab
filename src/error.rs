//! Error types for the limit checker.
//!
//! Connection and fetch failures are scoped to a single probe and are downgraded to a
//! per-service report entry by the orchestrator. Configuration failures abort before any
//! probe runs. Evaluation failures become a per-limit verdict.

use crate::config::ConfigurationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Classification of a failed paginated read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchFailureKind {
    /// The provider rejected the request rate
    Throttled,
    /// Credentials lack permission for the operation
    AccessDenied,
    /// Network or server-side failure that may succeed on a later pass
    Transient,
    /// A page or record could not be decoded
    MalformedResponse,
    Other,
}

impl fmt::Display for FetchFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FetchFailureKind::Throttled => "throttled",
            FetchFailureKind::AccessDenied => "access denied",
            FetchFailureKind::Transient => "transient",
            FetchFailureKind::MalformedResponse => "malformed response",
            FetchFailureKind::Other => "other",
        };
        f.write_str(label)
    }
}

/// A limit could not be compared against its ceiling
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum EvaluationError {
    #[error("Limit {service}/{limit} has no known ceiling")]
    CeilingUnset { service: String, limit: String },
    #[error("Limit {service}/{limit} has a ceiling of zero")]
    CeilingZero { service: String, limit: String },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LimitCheckerError {
    #[error("Connection error for {api_name}: {reason}")]
    ConnectionError { api_name: String, reason: String },
    #[error("Fetch error in {api_name}:{operation} ({kind}): {reason}")]
    FetchError {
        api_name: String,
        operation: String,
        kind: FetchFailureKind,
        reason: String,
    },
    #[error(transparent)]
    ConfigurationError(#[from] ConfigurationError),
    #[error("Usage collection for {service} timed out after {timeout:?}")]
    Timeout { service: String, timeout: Duration },
    #[error("Check pass cancelled")]
    Cancelled,
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LimitCheckerError {
    /// Create a connection error
    pub fn connection<A: Into<String>, R: fmt::Display>(api_name: A, reason: R) -> Self {
        Self::ConnectionError {
            api_name: api_name.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a fetch error
    pub fn fetch<A: Into<String>, O: Into<String>, R: fmt::Display>(
        api_name: A,
        operation: O,
        kind: FetchFailureKind,
        reason: R,
    ) -> Self {
        Self::FetchError {
            api_name: api_name.into(),
            operation: operation.into(),
            kind,
            reason: reason.to_string(),
        }
    }
}

pub type CheckerResult<T> = std::result::Result<T, LimitCheckerError>;
