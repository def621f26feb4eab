//! Configuration Error Types
//!
//! Raised before any probe executes: an invalid invocation is rejected as a whole
//! instead of producing a report built on a corrupt configuration.

use thiserror::Error;

/// Configuration-related errors with detailed context
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// Configuration sources could not be read or deserialized
    #[error("Failed to load configuration from {source_name}: {error}")]
    LoadError { source_name: String, error: String },

    /// A service name that no registered probe answers to
    #[error("Unknown service '{service}'")]
    UnknownService { service: String },

    /// A limit name that the named service does not declare
    #[error("Unknown limit '{limit}' for service '{service}'")]
    UnknownLimit { service: String, limit: String },

    /// Threshold values outside the accepted policy
    #[error("Invalid thresholds for {scope}: {reason}")]
    InvalidThreshold { scope: String, reason: String },

    /// Invalid configuration value
    #[error("Invalid value '{value}' for field '{field}': {context}")]
    InvalidValue {
        field: String,
        value: String,
        context: String,
    },

    /// The same service or limit configured more than once
    #[error("Duplicate configuration entry for {entry}")]
    DuplicateEntry { entry: String },
}

impl ConfigurationError {
    /// Create a load error
    pub fn load_error<S: Into<String>, E: std::fmt::Display>(source_name: S, error: E) -> Self {
        Self::LoadError {
            source_name: source_name.into(),
            error: error.to_string(),
        }
    }

    /// Create an unknown service error
    pub fn unknown_service<S: Into<String>>(service: S) -> Self {
        Self::UnknownService {
            service: service.into(),
        }
    }

    /// Create an unknown limit error
    pub fn unknown_limit<S: Into<String>, L: Into<String>>(service: S, limit: L) -> Self {
        Self::UnknownLimit {
            service: service.into(),
            limit: limit.into(),
        }
    }

    /// Create an invalid threshold error
    pub fn invalid_threshold<S: Into<String>, R: Into<String>>(scope: S, reason: R) -> Self {
        Self::InvalidThreshold {
            scope: scope.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid value error
    pub fn invalid_value<F: Into<String>, V: Into<String>, C: Into<String>>(
        field: F,
        value: V,
        context: C,
    ) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.into(),
            context: context.into(),
        }
    }

    /// Create a duplicate entry error
    pub fn duplicate_entry<E: Into<String>>(entry: E) -> Self {
        Self::DuplicateEntry {
            entry: entry.into(),
        }
    }
}

impl From<config::ConfigError> for ConfigurationError {
    fn from(error: config::ConfigError) -> Self {
        Self::load_error("configuration sources", error)
    }
}

pub type ConfigResult<T> = std::result::Result<T, ConfigurationError>;
