//! Error types for configuration loading.

use thiserror::Error;

/// Primary error type for configuration loading.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Variable held a value that failed validation.
    #[error("invalid configuration field")]
    InvalidField {
        /// Environment variable name.
        field: String,
        /// Machine-readable reason for the failure.
        reason: &'static str,
        /// Offending value when it is safe to echo.
        value: Option<String>,
    },
    /// Variable required by an enabled feature was not set.
    #[error("missing configuration field")]
    MissingField {
        /// Environment variable name.
        field: String,
        /// Feature that requires it.
        required_by: &'static str,
    },
}

impl ConfigError {
    pub(crate) fn invalid(field: &str, reason: &'static str, value: Option<&str>) -> Self {
        Self::InvalidField {
            field: field.to_string(),
            reason,
            value: value.map(str::to_string),
        }
    }

    pub(crate) fn missing(field: &str, required_by: &'static str) -> Self {
        Self::MissingField {
            field: field.to_string(),
            required_by,
        }
    }

    /// Environment variable the error refers to.
    #[must_use]
    pub fn field(&self) -> &str {
        match self {
            Self::InvalidField { field, .. } | Self::MissingField { field, .. } => field,
        }
    }
}

/// Convenience alias for configuration results.
pub type ConfigResult<T> = Result<T, ConfigError>;
