//! Capability seams consumed by the import job.
//!
//! # Design
//! - The job only sees these traits; concrete adapters live beside them and
//!   test doubles live in `intake-test-support`.

use async_trait::async_trait;
use serde::Serialize;

use crate::error::IndexResult;

/// Outcome of asking the indexing subsystem to scan a path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    /// Exit status reported by the scan; `-1` when it was terminated abnormally.
    pub exit_code: i32,
    /// Error-level lines observed in the scan's log stream.
    pub error_lines: Vec<String>,
}

impl ScanReport {
    /// Report for a clean scan.
    #[must_use]
    pub const fn clean() -> Self {
        Self {
            exit_code: 0,
            error_lines: Vec::new(),
        }
    }

    /// Whether any error-level output was seen.
    #[must_use]
    pub const fn has_errors(&self) -> bool {
        !self.error_lines.is_empty()
    }

    /// A scan succeeded only when it exited cleanly and logged no errors.
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        self.exit_code == 0 && !self.has_errors()
    }
}

/// Indexing subsystem that must learn about relocated files.
#[async_trait]
pub trait Indexer: Send + Sync {
    /// Scan `path` (`<user>/files/<relative>`) so the index picks the file up.
    ///
    /// # Errors
    ///
    /// Returns an error when the scan could not be run at all; a scan that
    /// ran and failed is reported through [`ScanReport`].
    async fn scan(&self, path: &str) -> IndexResult<ScanReport>;

    /// Resolve the numeric file id for `relative_path` inside `storage_id`.
    ///
    /// # Errors
    ///
    /// Returns an error when the lookup could not be performed.
    async fn lookup_file_id(&self, storage_id: &str, relative_path: &str)
    -> IndexResult<Option<i64>>;
}

/// Optional preview-generation work queue.
#[async_trait]
pub trait PreviewQueue: Send + Sync {
    /// Whether the preview subsystem is installed.
    ///
    /// # Errors
    ///
    /// Returns an error when the capability cannot be determined.
    async fn available(&self) -> IndexResult<bool>;

    /// Whether a pending request exists for `(user, file_id)`.
    ///
    /// # Errors
    ///
    /// Returns an error when the queue cannot be queried.
    async fn exists(&self, user: &str, file_id: i64) -> IndexResult<bool>;

    /// Enqueue a request for `(user, file_id)`.
    ///
    /// # Errors
    ///
    /// Returns an error when the queue rejects the insert.
    async fn insert(&self, user: &str, file_id: i64) -> IndexResult<()>;
}

/// Source of the user identifiers processed by each job.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// All known user identifiers.
    ///
    /// # Errors
    ///
    /// Returns an error when the directory cannot be listed.
    async fn list_users(&self) -> IndexResult<Vec<String>>;
}
