//! # Design
//!
//! - Constant messages; the failing operation and program travel as fields.

use thiserror::Error;

/// Result alias for collaborator calls.
pub type IndexResult<T> = Result<T, IndexError>;

/// Errors raised by indexing, directory, and preview collaborators.
#[derive(Debug, Error)]
pub enum IndexError {
    /// The scan command could not be started.
    #[error("failed to spawn scan command")]
    Spawn {
        /// Program that failed to start.
        program: String,
        /// Underlying IO error.
        source: std::io::Error,
    },
    /// Reading the scan command's output or exit status failed.
    #[error("failed to collect scan command output")]
    Output {
        /// Program being observed.
        program: String,
        /// Underlying IO error.
        source: std::io::Error,
    },
    /// Connecting to the catalog database failed.
    #[error("failed to connect to catalog database")]
    Connect {
        /// Underlying SQL error.
        source: sqlx::Error,
    },
    /// A catalog query failed.
    #[error("catalog query failed")]
    Query {
        /// Operation identifier.
        operation: &'static str,
        /// Underlying SQL error.
        source: sqlx::Error,
    },
    /// The collaborator does not support the requested operation.
    #[error("operation not supported by collaborator")]
    Unsupported {
        /// Operation that was requested.
        operation: &'static str,
    },
    /// Input validation failures.
    #[error("invalid collaborator input")]
    InvalidInput {
        /// Field that failed validation.
        field: &'static str,
        /// Static reason for the failure.
        reason: &'static str,
        /// Offending value when available.
        value: Option<String>,
    },
}

pub(crate) fn map_sqlx_err(operation: &'static str) -> impl FnOnce(sqlx::Error) -> IndexError {
    move |source| IndexError::Query { operation, source }
}
