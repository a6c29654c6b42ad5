//! Error types for configuration loading.
//!
//! # Design
//! - Constant messages; the environment key, reason, and value travel as fields.
//! - Reasons are static, machine-readable identifiers so tests can match on them.

use thiserror::Error;

/// Primary error type for configuration operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required setting was not provided.
    #[error("missing configuration field")]
    MissingField {
        /// Environment key of the missing setting.
        field: &'static str,
    },
    /// A setting contained an invalid value.
    #[error("invalid configuration field")]
    InvalidField {
        /// Environment key of the offending setting.
        field: &'static str,
        /// Machine-readable reason for the failure.
        reason: &'static str,
        /// Offending value when available.
        value: Option<String>,
    },
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: &'static str, value: &str) -> Self {
        Self::InvalidField {
            field,
            reason,
            value: Some(value.to_string()),
        }
    }
}

/// Convenience alias for configuration results.
pub type ConfigResult<T> = Result<T, ConfigError>;
