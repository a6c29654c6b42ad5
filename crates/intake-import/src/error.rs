//! # Design
//!
//! - Only job-level failures surface as errors; per-file and per-user faults
//!   are logged and counted instead (see [`crate::fault::ImportFault`]).

use intake_index::IndexError;
use thiserror::Error;

/// Result alias for import jobs.
pub type ImportResult<T> = Result<T, ImportError>;

/// Errors that prevent a whole import job from running.
#[derive(Debug, Error)]
pub enum ImportError {
    /// The user directory could not be listed.
    #[error("failed to list users")]
    UserDirectory {
        /// Underlying collaborator error.
        source: IndexError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn user_directory_error_keeps_source() {
        let err = ImportError::UserDirectory {
            source: IndexError::Unsupported {
                operation: "list_users",
            },
        };
        assert_eq!(err.to_string(), "failed to list users");
        assert!(err.source().is_some());
    }
}
