//! # Design
//!
//! - Centralize application-level errors for bootstrap and scheduling.
//! - Keep error messages constant while carrying context fields for debugging.
//! - Preserve source errors without re-logging at call sites.

use std::io;

use thiserror::Error;

/// Result alias for application operations.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Environment configuration was missing.
    #[error("missing environment configuration")]
    MissingEnv {
        /// Name of the missing environment variable.
        name: &'static str,
    },
    /// Configuration operations failed.
    #[error("configuration operation failed")]
    Config {
        /// Operation identifier.
        operation: &'static str,
        /// Source configuration error.
        source: intake_config::ConfigError,
    },
    /// Telemetry operations failed.
    #[error("telemetry operation failed")]
    Telemetry {
        /// Operation identifier.
        operation: &'static str,
        /// Source telemetry error.
        source: intake_telemetry::TelemetryError,
    },
    /// Index or catalog operations failed.
    #[error("index operation failed")]
    Index {
        /// Operation identifier.
        operation: &'static str,
        /// Source index error.
        source: intake_index::IndexError,
    },
    /// The import job could not run.
    #[error("import job failed")]
    Import {
        /// Operation identifier.
        operation: &'static str,
        /// Source import error.
        source: intake_import::ImportError,
    },
    /// Summary serialization failed.
    #[error("summary serialization failed")]
    Serialize {
        /// Operation identifier.
        operation: &'static str,
        /// Source serialization error.
        source: serde_json::Error,
    },
    /// Writing command output failed.
    #[error("output write failed")]
    Output {
        /// Operation identifier.
        operation: &'static str,
        /// Source IO error.
        source: io::Error,
    },
}

impl AppError {
    pub(crate) const fn config(
        operation: &'static str,
        source: intake_config::ConfigError,
    ) -> Self {
        Self::Config { operation, source }
    }

    pub(crate) const fn telemetry(
        operation: &'static str,
        source: intake_telemetry::TelemetryError,
    ) -> Self {
        Self::Telemetry { operation, source }
    }

    pub(crate) const fn index(operation: &'static str, source: intake_index::IndexError) -> Self {
        Self::Index { operation, source }
    }

    pub(crate) const fn import(
        operation: &'static str,
        source: intake_import::ImportError,
    ) -> Self {
        Self::Import { operation, source }
    }

    pub(crate) const fn serialize(operation: &'static str, source: serde_json::Error) -> Self {
        Self::Serialize { operation, source }
    }

    pub(crate) const fn output(operation: &'static str, source: io::Error) -> Self {
        Self::Output { operation, source }
    }
}
