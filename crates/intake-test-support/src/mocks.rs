//! Scripted probe and in-memory collaborators.
//!
//! Every double uses interior mutability so it can be shared behind `Arc`
//! with the code under test and inspected afterwards.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use intake_fsops::{LocalFs, SizeProbe};
use intake_index::{IndexError, IndexResult, Indexer, PreviewQueue, ScanReport, UserDirectory};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One scripted observation for a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeStep {
    /// Truncate or extend the real file to this length, then measure it.
    Resize(u64),
    /// Report this size without touching the file.
    Report(u64),
    /// Fail the measurement with this error kind.
    Fail(io::ErrorKind),
}

/// Size probe replaying per-path scripts, falling back to the real filesystem.
#[derive(Debug, Default)]
pub struct ScriptedProbe {
    scripts: Mutex<HashMap<PathBuf, VecDeque<ProbeStep>>>,
    calls: Mutex<HashMap<PathBuf, usize>>,
}

impl ScriptedProbe {
    /// Probe with no scripts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `steps` to the script for `path`.
    pub fn script(&self, path: impl Into<PathBuf>, steps: impl IntoIterator<Item = ProbeStep>) {
        lock(&self.scripts)
            .entry(path.into())
            .or_default()
            .extend(steps);
    }

    /// Grow the real file through `sizes`, one size per measurement.
    pub fn grow(&self, path: impl Into<PathBuf>, sizes: impl IntoIterator<Item = u64>) {
        self.script(path, sizes.into_iter().map(ProbeStep::Resize));
    }

    /// Number of measurements taken for `path`.
    #[must_use]
    pub fn measurements(&self, path: &Path) -> usize {
        lock(&self.calls).get(path).copied().unwrap_or(0)
    }
}

impl SizeProbe for ScriptedProbe {
    fn size_of(&self, path: &Path) -> io::Result<u64> {
        *lock(&self.calls).entry(path.to_path_buf()).or_default() += 1;
        let step = lock(&self.scripts)
            .get_mut(path)
            .and_then(VecDeque::pop_front);
        match step {
            Some(ProbeStep::Resize(len)) => {
                OpenOptions::new().write(true).open(path)?.set_len(len)?;
                LocalFs.size_of(path)
            }
            Some(ProbeStep::Report(len)) => Ok(len),
            Some(ProbeStep::Fail(kind)) => Err(io::Error::new(kind, "scripted probe failure")),
            None => LocalFs.size_of(path),
        }
    }
}

/// In-memory indexer recording every call.
#[derive(Debug, Default)]
pub struct FakeIndexer {
    reports: Mutex<HashMap<String, ScanReport>>,
    broken_scans: Mutex<BTreeSet<String>>,
    file_ids: Mutex<HashMap<(String, String), i64>>,
    scanned: Mutex<Vec<String>>,
    lookups: Mutex<Vec<(String, String)>>,
}

impl FakeIndexer {
    /// Indexer where every scan succeeds and no file ids are known.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return `report` when `path` is scanned.
    #[must_use]
    pub fn with_scan_report(self, path: &str, report: ScanReport) -> Self {
        lock(&self.reports).insert(path.to_string(), report);
        self
    }

    /// Fail the scan call itself for `path`.
    #[must_use]
    pub fn with_broken_scan(self, path: &str) -> Self {
        lock(&self.broken_scans).insert(path.to_string());
        self
    }

    /// Resolve `(storage_id, cache_path)` to `file_id`.
    #[must_use]
    pub fn with_file_id(self, storage_id: &str, cache_path: &str, file_id: i64) -> Self {
        lock(&self.file_ids).insert((storage_id.to_string(), cache_path.to_string()), file_id);
        self
    }

    /// Paths scanned so far, in call order.
    #[must_use]
    pub fn scanned(&self) -> Vec<String> {
        lock(&self.scanned).clone()
    }

    /// File-id lookups performed so far, in call order.
    #[must_use]
    pub fn lookups(&self) -> Vec<(String, String)> {
        lock(&self.lookups).clone()
    }
}

#[async_trait]
impl Indexer for FakeIndexer {
    async fn scan(&self, path: &str) -> IndexResult<ScanReport> {
        lock(&self.scanned).push(path.to_string());
        if lock(&self.broken_scans).contains(path) {
            return Err(IndexError::Output {
                program: "fake-scan".to_string(),
                source: io::Error::other("scripted scan failure"),
            });
        }
        Ok(lock(&self.reports)
            .get(path)
            .cloned()
            .unwrap_or_else(ScanReport::clean))
    }

    async fn lookup_file_id(
        &self,
        storage_id: &str,
        relative_path: &str,
    ) -> IndexResult<Option<i64>> {
        let key = (storage_id.to_string(), relative_path.to_string());
        lock(&self.lookups).push(key.clone());
        Ok(lock(&self.file_ids).get(&key).copied())
    }
}

/// Preview queue with set semantics and call counters.
#[derive(Debug)]
pub struct FakePreviewQueue {
    available: bool,
    failing: bool,
    entries: Mutex<Vec<(String, i64)>>,
    exists_calls: Mutex<usize>,
    insert_calls: Mutex<usize>,
}

impl Default for FakePreviewQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl FakePreviewQueue {
    /// Installed, empty queue.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            available: true,
            failing: false,
            entries: Mutex::new(Vec::new()),
            exists_calls: Mutex::new(0),
            insert_calls: Mutex::new(0),
        }
    }

    /// Queue whose capability check reports "not installed".
    #[must_use]
    pub const fn absent() -> Self {
        let mut queue = Self::new();
        queue.available = false;
        queue
    }

    /// Queue whose `exists` and `insert` calls fail.
    #[must_use]
    pub const fn failing() -> Self {
        let mut queue = Self::new();
        queue.failing = true;
        queue
    }

    /// Queue rows, in insertion order.
    #[must_use]
    pub fn entries(&self) -> Vec<(String, i64)> {
        lock(&self.entries).clone()
    }

    /// Number of `exists` calls.
    #[must_use]
    pub fn exists_calls(&self) -> usize {
        *lock(&self.exists_calls)
    }

    /// Number of `insert` calls.
    #[must_use]
    pub fn insert_calls(&self) -> usize {
        *lock(&self.insert_calls)
    }

    fn check_failing(&self, operation: &'static str) -> IndexResult<()> {
        if self.failing {
            return Err(IndexError::Unsupported { operation });
        }
        Ok(())
    }
}

#[async_trait]
impl PreviewQueue for FakePreviewQueue {
    async fn available(&self) -> IndexResult<bool> {
        Ok(self.available)
    }

    async fn exists(&self, user: &str, file_id: i64) -> IndexResult<bool> {
        *lock(&self.exists_calls) += 1;
        self.check_failing("preview_exists")?;
        Ok(lock(&self.entries)
            .iter()
            .any(|(uid, id)| uid == user && *id == file_id))
    }

    async fn insert(&self, user: &str, file_id: i64) -> IndexResult<()> {
        *lock(&self.insert_calls) += 1;
        self.check_failing("preview_insert")?;
        let mut entries = lock(&self.entries);
        if !entries.iter().any(|(uid, id)| uid == user && *id == file_id) {
            entries.push((user.to_string(), file_id));
        }
        Ok(())
    }
}

/// Fixed user directory.
#[derive(Debug, Clone, Default)]
pub struct StaticUsers {
    users: Vec<String>,
    unavailable: bool,
}

impl StaticUsers {
    /// Directory listing `users` in the given order.
    #[must_use]
    pub fn new<I, S>(users: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            users: users.into_iter().map(Into::into).collect(),
            unavailable: false,
        }
    }

    /// Directory whose listing always fails.
    #[must_use]
    pub fn unavailable() -> Self {
        Self {
            users: Vec::new(),
            unavailable: true,
        }
    }
}

#[async_trait]
impl UserDirectory for StaticUsers {
    async fn list_users(&self) -> IndexResult<Vec<String>> {
        if self.unavailable {
            return Err(IndexError::Unsupported {
                operation: "list_users",
            });
        }
        Ok(self.users.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn scripted_probe_resizes_then_falls_back() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("a.bin");
        fs::write(&path, b"ab")?;

        let probe = ScriptedProbe::new();
        probe.grow(&path, [5, 8]);
        probe.script(&path, [ProbeStep::Report(100), ProbeStep::Fail(io::ErrorKind::NotFound)]);

        assert_eq!(probe.size_of(&path)?, 5);
        assert_eq!(probe.size_of(&path)?, 8);
        assert_eq!(fs::metadata(&path)?.len(), 8);
        assert_eq!(probe.size_of(&path)?, 100);
        assert!(probe.size_of(&path).is_err());
        assert_eq!(probe.size_of(&path)?, 8);
        assert_eq!(probe.measurements(&path), 5);
        Ok(())
    }

    #[tokio::test]
    async fn preview_queue_keeps_one_row_per_pair() -> anyhow::Result<()> {
        let queue = FakePreviewQueue::new();
        queue.insert("user1", 7).await?;
        queue.insert("user1", 7).await?;
        queue.insert("user2", 7).await?;
        assert_eq!(
            queue.entries(),
            vec![("user1".to_string(), 7), ("user2".to_string(), 7)]
        );
        assert_eq!(queue.insert_calls(), 3);
        assert!(queue.exists("user1", 7).await?);
        assert!(!FakePreviewQueue::absent().available().await?);
        Ok(())
    }

    #[tokio::test]
    async fn fake_indexer_records_calls() -> anyhow::Result<()> {
        let indexer = FakeIndexer::new().with_file_id("home::u", "files/a", 3);
        assert!(indexer.scan("u/files/a").await?.succeeded());
        assert_eq!(indexer.lookup_file_id("home::u", "files/a").await?, Some(3));
        assert_eq!(indexer.lookup_file_id("home::u", "files/b").await?, None);
        assert_eq!(indexer.scanned(), vec!["u/files/a".to_string()]);
        assert_eq!(indexer.lookups().len(), 2);
        Ok(())
    }
}
