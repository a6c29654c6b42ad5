//! Post-move notification: index scan, then optional preview enqueue.
//!
//! # Design
//! - A failed scan stops notification for that file; the move is not undone.
//! - Preview work only happens when the queue was found installed for this job.
//! - Enqueue probes for a pending row first and inserts only when absent.

use std::path::Path;
use std::sync::Arc;

use intake_fsops::UserLayout;
use intake_index::{Indexer, PreviewQueue};
use serde::Serialize;
use tracing::{error, info, warn};

/// What happened to the preview step for a relocated file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "file_id")]
pub enum PreviewOutcome {
    /// A new request was queued.
    Enqueued(i64),
    /// A request was already pending.
    AlreadyQueued(i64),
    /// The index has no id for the file.
    LookupMiss,
    /// The preview subsystem is not installed.
    Unavailable,
    /// Lookup or queue access failed.
    Failed,
}

/// Result of notifying collaborators about one relocated file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyOutcome {
    /// The scan succeeded; carries the preview step's outcome.
    Scanned(PreviewOutcome),
    /// The scan failed or could not run; no preview work was attempted.
    ScanFailed,
}

/// Tells the index, and optionally the preview queue, about relocated files.
#[derive(Clone)]
pub struct PostMoveNotifier {
    indexer: Arc<dyn Indexer>,
    previews: Option<Arc<dyn PreviewQueue>>,
}

impl PostMoveNotifier {
    /// Notifier using `indexer`; `previews` is `None` when the preview
    /// subsystem is not installed.
    #[must_use]
    pub fn new(indexer: Arc<dyn Indexer>, previews: Option<Arc<dyn PreviewQueue>>) -> Self {
        Self { indexer, previews }
    }

    /// Notify collaborators that `relative` now lives in `layout`'s storage.
    pub async fn notify(&self, layout: &UserLayout, relative: &Path) -> NotifyOutcome {
        let scan_path = layout.scan_path(relative);
        match self.indexer.scan(&scan_path).await {
            Ok(report) if report.succeeded() => {}
            Ok(report) => {
                error!(
                    scan_path = %scan_path,
                    exit_code = report.exit_code,
                    error_lines = report.error_lines.len(),
                    "scan failed"
                );
                return NotifyOutcome::ScanFailed;
            }
            Err(err) => {
                error!(scan_path = %scan_path, error = %err, "scan could not be run");
                return NotifyOutcome::ScanFailed;
            }
        }

        NotifyOutcome::Scanned(self.enqueue_preview(layout, relative).await)
    }

    async fn enqueue_preview(&self, layout: &UserLayout, relative: &Path) -> PreviewOutcome {
        let Some(queue) = &self.previews else {
            info!("preview generator not installed; skipping preview request");
            return PreviewOutcome::Unavailable;
        };

        let storage_id = layout.storage_id();
        let cache_path = layout.cache_path(relative);
        let file_id = match self.indexer.lookup_file_id(&storage_id, &cache_path).await {
            Ok(Some(file_id)) => file_id,
            Ok(None) => {
                info!(storage_id = %storage_id, cache_path = %cache_path, "file id not found; no preview requested");
                return PreviewOutcome::LookupMiss;
            }
            Err(err) => {
                warn!(storage_id = %storage_id, cache_path = %cache_path, error = %err, "file id lookup failed");
                return PreviewOutcome::Failed;
            }
        };

        match queue.exists(&layout.user, file_id).await {
            Ok(true) => {
                info!(file_id, "preview request already queued");
                PreviewOutcome::AlreadyQueued(file_id)
            }
            Ok(false) => match queue.insert(&layout.user, file_id).await {
                Ok(()) => {
                    info!(file_id, "preview request queued");
                    PreviewOutcome::Enqueued(file_id)
                }
                Err(err) => {
                    warn!(file_id, error = %err, "failed to queue preview request");
                    PreviewOutcome::Failed
                }
            },
            Err(err) => {
                warn!(file_id, error = %err, "failed to check preview queue");
                PreviewOutcome::Failed
            }
        }
    }
}
