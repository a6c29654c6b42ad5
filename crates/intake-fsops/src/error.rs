//! # Design
//!
//! - Constant-message errors for the import filesystem steps.
//! - Operation names and paths travel as fields so callers can log them structurally.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for filesystem operations.
pub type FsOpsResult<T> = Result<T, FsOpsError>;

/// Errors produced while discovering, replicating, or relocating files.
#[derive(Debug, Error)]
pub enum FsOpsError {
    /// IO failures while interacting with the filesystem.
    #[error("fsops io failure")]
    Io {
        /// Operation that triggered the IO failure.
        operation: &'static str,
        /// Path involved in the IO failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// Walkdir traversal failures.
    #[error("fsops walkdir failure")]
    Walkdir {
        /// Operation that triggered the walkdir failure.
        operation: &'static str,
        /// Path involved in the walkdir failure.
        path: PathBuf,
        /// Underlying walkdir error.
        source: walkdir::Error,
    },
    /// The staging directory for a user does not exist.
    #[error("staging directory missing")]
    StagingMissing {
        /// Expected staging directory.
        path: PathBuf,
    },
    /// A destination path component exists but is not a directory.
    #[error("destination path component is not a directory")]
    PathConflict {
        /// Offending path component.
        path: PathBuf,
    },
    /// The destination file path is occupied by a directory.
    #[error("destination is a directory")]
    DestinationIsDirectory {
        /// Destination path.
        path: PathBuf,
    },
    /// Rename crossed a filesystem boundary.
    #[error("rename crosses filesystem boundary")]
    CrossDevice {
        /// File that was being moved.
        source_path: PathBuf,
        /// Intended destination.
        destination: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// A staged file name is not valid UTF-8 and cannot be scanned or recorded.
    #[error("staged file name is not utf-8")]
    NonUtf8Name {
        /// Offending staged file.
        path: PathBuf,
    },
    /// Input validation failures.
    #[error("fsops invalid input")]
    InvalidInput {
        /// Field that failed validation.
        field: &'static str,
        /// Static reason for the failure.
        reason: &'static str,
        /// Offending value when available.
        value: Option<String>,
    },
}

impl FsOpsError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn walkdir(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: walkdir::Error,
    ) -> Self {
        Self::Walkdir {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn invalid(field: &'static str, reason: &'static str, value: &str) -> Self {
        Self::InvalidInput {
            field,
            reason,
            value: Some(value.to_string()),
        }
    }

    /// Path most closely associated with the failure, when one exists.
    #[must_use]
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            Self::Io { path, .. }
            | Self::Walkdir { path, .. }
            | Self::StagingMissing { path }
            | Self::PathConflict { path }
            | Self::DestinationIsDirectory { path }
            | Self::NonUtf8Name { path } => Some(path),
            Self::CrossDevice { destination, .. } => Some(destination),
            Self::InvalidInput { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;
    use std::path::Path;

    #[test]
    fn messages_are_constant_and_context_is_structured() {
        let err = FsOpsError::io("relocate.rename", "/data/u/files/a", io::Error::other("boom"));
        assert_eq!(err.to_string(), "fsops io failure");
        assert_eq!(err.path(), Some(Path::new("/data/u/files/a")));
        assert!(err.source().is_some());

        let conflict = FsOpsError::PathConflict {
            path: PathBuf::from("/data/u/files/sub"),
        };
        assert_eq!(
            conflict.to_string(),
            "destination path component is not a directory"
        );
        assert!(conflict.source().is_none());
    }

    #[test]
    fn invalid_input_has_no_path() {
        let err = FsOpsError::invalid("user", "separator", "a/b");
        assert!(err.path().is_none());
        assert!(matches!(
            err,
            FsOpsError::InvalidInput {
                field: "user",
                reason: "separator",
                ..
            }
        ));
    }
}
