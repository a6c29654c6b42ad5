//! Fault taxonomy with stable labels for logs and metrics.

use intake_fsops::FsOpsError;

/// Non-fatal faults isolated to a single file or user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImportFault {
    /// The user has no staging directory.
    StagingMissing,
    /// The destination chain or destination path is occupied by the wrong kind of entry.
    PathConflict,
    /// A candidate could not be measured and was dropped.
    UnreadableCandidate,
    /// The move itself failed.
    RelocationFailed,
    /// The index scan after a move failed.
    ScanFailed,
    /// The relocated file has no id in the index.
    PreviewLookupMiss,
    /// Preview lookup or enqueue failed.
    PreviewFailed,
    /// A candidate never stabilised before the poll bound.
    Abandoned,
    /// The user identifier cannot be mapped to paths safely.
    InvalidUser,
}

impl ImportFault {
    /// Label used for the `kind` metric dimension.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::StagingMissing => "staging_missing",
            Self::PathConflict => "path_conflict",
            Self::UnreadableCandidate => "unreadable_candidate",
            Self::RelocationFailed => "relocation_failed",
            Self::ScanFailed => "scan_failed",
            Self::PreviewLookupMiss => "preview_lookup_miss",
            Self::PreviewFailed => "preview_failed",
            Self::Abandoned => "abandoned",
            Self::InvalidUser => "invalid_user",
        }
    }

    /// Classify a failed replication or relocation.
    #[must_use]
    pub const fn from_fsops(err: &FsOpsError) -> Self {
        match err {
            FsOpsError::PathConflict { .. } | FsOpsError::DestinationIsDirectory { .. } => {
                Self::PathConflict
            }
            FsOpsError::StagingMissing { .. } => Self::StagingMissing,
            _ => Self::RelocationFailed,
        }
    }
}
