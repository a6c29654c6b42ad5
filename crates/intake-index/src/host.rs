//! Indexer combining the scan command with catalog lookups.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::IndexResult;
use crate::traits::{Indexer, ScanReport};

/// Routes scans and file-id lookups to separate collaborators.
#[derive(Clone)]
pub struct HostIndexer {
    scanner: Arc<dyn Indexer>,
    lookup: Arc<dyn Indexer>,
}

impl HostIndexer {
    /// Combine a scanning collaborator with a lookup collaborator.
    #[must_use]
    pub fn new(scanner: Arc<dyn Indexer>, lookup: Arc<dyn Indexer>) -> Self {
        Self { scanner, lookup }
    }
}

#[async_trait]
impl Indexer for HostIndexer {
    async fn scan(&self, path: &str) -> IndexResult<ScanReport> {
        self.scanner.scan(path).await
    }

    async fn lookup_file_id(
        &self,
        storage_id: &str,
        relative_path: &str,
    ) -> IndexResult<Option<i64>> {
        self.lookup.lookup_file_id(storage_id, relative_path).await
    }
}
