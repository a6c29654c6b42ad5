//! Per-user import run.
//!
//! # Design
//! - Explicit states: `Discovering → Polling ⇄ Draining → Done`.
//! - Time comes from an injected [`Clock`], sizes from an injected probe, so a
//!   finite scripted input always terminates.
//! - Ready candidates are handled one at a time in discovery order; a fault
//!   only ends that candidate's journey.
//! - An optional poll bound abandons candidates that never settle; they stay
//!   in staging for the next job.

use std::sync::Arc;
use std::time::Duration;

use intake_fsops::{
    Candidate, FsOpsError, Relocator, SizeProbe, TreeReplicator, UserLayout, discover,
};
use intake_telemetry::Metrics;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::clock::Clock;
use crate::fault::ImportFault;
use crate::notify::{NotifyOutcome, PostMoveNotifier, PreviewOutcome};
use crate::stability::StabilityTracker;

/// Position of an [`ImportRun`] in its state machine.
#[derive(Debug)]
pub enum RunState {
    /// Enumerating the staging directory.
    Discovering,
    /// Waiting, then re-measuring active candidates.
    Polling,
    /// Relocating and notifying the candidates found ready.
    Draining(Vec<Candidate>),
    /// Nothing left to do.
    Done,
}

impl RunState {
    /// Short label for logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Discovering => "discovering",
            Self::Polling => "polling",
            Self::Draining(_) => "draining",
            Self::Done => "done",
        }
    }
}

/// Result of handling one ready candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelocationResult {
    /// The file moved and the index scan succeeded.
    Moved {
        /// Whether an existing destination file was replaced.
        replaced: bool,
        /// Outcome of the preview step.
        preview: PreviewOutcome,
    },
    /// The destination chain or path is occupied by the wrong kind of entry.
    SkippedConflict,
    /// The file moved but the index scan failed.
    SkippedScanFailed {
        /// Whether an existing destination file was replaced.
        replaced: bool,
    },
    /// The move failed; the file stays in staging.
    Failed,
}

/// How a user's run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// Every candidate was handled.
    #[default]
    Completed,
    /// The user has no staging directory.
    StagingMissing,
    /// The poll bound was hit with candidates still changing.
    Abandoned,
    /// The user identifier was rejected.
    InvalidUser,
}

impl RunOutcome {
    /// Label used for the `outcome` metric dimension.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::StagingMissing => "staging_missing",
            Self::Abandoned => "abandoned",
            Self::InvalidUser => "invalid_user",
        }
    }
}

/// Counters describing one user's run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// User identifier.
    pub user: String,
    /// How the run ended.
    pub outcome: RunOutcome,
    /// Files found by discovery.
    pub discovered: usize,
    /// Entries discovery could not read.
    pub unreadable_entries: usize,
    /// Files relocated, including those whose scan failed.
    pub moved: usize,
    /// Relocations that replaced an existing file.
    pub replaced: usize,
    /// Candidates skipped because of a path conflict.
    pub conflicts: usize,
    /// Candidates whose move failed.
    pub failures: usize,
    /// Relocated files whose index scan failed.
    pub scan_failures: usize,
    /// Preview requests inserted.
    pub previews_enqueued: usize,
    /// Candidates dropped because they could not be measured.
    pub dropped: usize,
    /// Candidates given up on at the poll bound.
    pub abandoned: usize,
    /// Polling rounds executed.
    pub polls: u32,
}

impl RunSummary {
    pub(crate) fn new(user: &str) -> Self {
        Self {
            user: user.to_string(),
            ..Self::default()
        }
    }

    fn record(&mut self, result: RelocationResult) {
        match result {
            RelocationResult::Moved { replaced, preview } => {
                self.moved += 1;
                self.replaced += usize::from(replaced);
                if matches!(preview, PreviewOutcome::Enqueued(_)) {
                    self.previews_enqueued += 1;
                }
            }
            RelocationResult::SkippedScanFailed { replaced } => {
                self.moved += 1;
                self.replaced += usize::from(replaced);
                self.scan_failures += 1;
            }
            RelocationResult::SkippedConflict => self.conflicts += 1,
            RelocationResult::Failed => self.failures += 1,
        }
    }
}

/// Shared, per-job pieces an [`ImportRun`] borrows.
pub struct RunContext<'a> {
    /// Size source for the debounce.
    pub probe: Arc<dyn SizeProbe>,
    /// Time source for the polling delay.
    pub clock: &'a dyn Clock,
    /// Collaborator notification.
    pub notifier: &'a PostMoveNotifier,
    /// Destination directory creation.
    pub replicator: TreeReplicator,
    /// Destination collision handling and move.
    pub relocator: Relocator,
    /// Delay between measurement rounds.
    pub poll_interval: Duration,
    /// Maximum polling rounds, `None` for unbounded.
    pub max_polls: Option<u32>,
    /// Metrics registry.
    pub metrics: &'a Metrics,
}

/// Imports one user's staging directory.
pub struct ImportRun<'a> {
    layout: &'a UserLayout,
    context: &'a RunContext<'a>,
    tracker: Option<StabilityTracker>,
    summary: RunSummary,
}

impl<'a> ImportRun<'a> {
    /// Prepare a run for `layout`.
    #[must_use]
    pub fn new(layout: &'a UserLayout, context: &'a RunContext<'a>) -> Self {
        Self {
            layout,
            context,
            tracker: None,
            summary: RunSummary::new(&layout.user),
        }
    }

    /// Drive the state machine to completion.
    pub async fn execute(mut self) -> RunSummary {
        let mut state = RunState::Discovering;
        loop {
            debug!(state = state.as_str(), "import run state");
            state = match state {
                RunState::Discovering => self.discover(),
                RunState::Polling => self.poll().await,
                RunState::Draining(ready) => self.drain(ready).await,
                RunState::Done => break,
            };
        }
        self.context.metrics.set_active_candidates(0);
        self.summary
    }

    fn discover(&mut self) -> RunState {
        let snapshot = match discover(&self.layout.staging_dir) {
            Ok(snapshot) => snapshot,
            Err(FsOpsError::StagingMissing { path }) => {
                info!(path = %path.display(), "staging directory not found; skipping user");
                self.fault(ImportFault::StagingMissing);
                self.summary.outcome = RunOutcome::StagingMissing;
                return RunState::Done;
            }
            Err(err) => {
                warn!(error = %err, "staging directory could not be read");
                return RunState::Done;
            }
        };

        for skipped in &snapshot.skipped {
            warn!(
                error = %skipped,
                path = ?skipped.path(),
                "staging entry could not be read; left for the next run"
            );
        }
        self.summary.unreadable_entries = snapshot.skipped.len();
        self.summary.discovered = snapshot.candidates.len();
        if snapshot.candidates.is_empty() {
            return RunState::Done;
        }

        info!(candidates = snapshot.candidates.len(), "discovered staged files");
        self.context
            .metrics
            .set_active_candidates(snapshot.candidates.len());
        self.tracker = Some(StabilityTracker::new(
            Arc::clone(&self.context.probe),
            snapshot.candidates,
        ));
        RunState::Polling
    }

    async fn poll(&mut self) -> RunState {
        let Some(tracker) = self.tracker.as_mut() else {
            return RunState::Done;
        };

        if self
            .context
            .max_polls
            .is_some_and(|limit| self.summary.polls >= limit)
        {
            for candidate in tracker.abandon() {
                warn!(
                    path = %candidate.source_path.display(),
                    size = candidate.last_observed_size,
                    polls = self.summary.polls,
                    "file never reached a stable size; left in staging"
                );
                self.summary.abandoned += 1;
                self.context.metrics.inc_fault(ImportFault::Abandoned.as_str());
            }
            self.summary.outcome = RunOutcome::Abandoned;
            return RunState::Done;
        }

        self.context.clock.sleep(self.context.poll_interval).await;
        self.summary.polls += 1;
        self.context.metrics.inc_polls();

        let measurement = tracker.remeasure();
        for (candidate, err) in &measurement.dropped {
            debug!(
                path = %candidate.source_path.display(),
                error = %err,
                "candidate could not be measured; dropped"
            );
        }
        let remaining = tracker.len();
        let dropped = measurement.dropped.len();
        debug!(
            poll = self.summary.polls,
            ready = measurement.ready.len(),
            changed = measurement.changed,
            dropped,
            "measurement round finished"
        );
        self.summary.dropped += dropped;
        for _ in 0..dropped {
            self.fault(ImportFault::UnreadableCandidate);
        }
        self.context
            .metrics
            .set_active_candidates(remaining + measurement.ready.len());

        if !measurement.ready.is_empty() {
            RunState::Draining(measurement.ready)
        } else if remaining == 0 {
            RunState::Done
        } else {
            RunState::Polling
        }
    }

    async fn drain(&mut self, ready: Vec<Candidate>) -> RunState {
        for candidate in ready {
            let result = self.relocate(&candidate).await;
            self.summary.record(result);
        }

        let remaining = self.tracker.as_ref().map_or(0, StabilityTracker::len);
        self.context.metrics.set_active_candidates(remaining);
        if remaining == 0 {
            RunState::Done
        } else {
            RunState::Polling
        }
    }

    async fn relocate(&self, candidate: &Candidate) -> RelocationResult {
        let relative = &candidate.relative_path;
        let destination = match self
            .context
            .replicator
            .ensure_parent_chain(&self.layout.files_dir, relative)
        {
            Ok(destination) => destination,
            Err(err) => return self.reject(candidate, &err),
        };

        let relocation = match self
            .context
            .relocator
            .relocate(&candidate.source_path, &destination)
        {
            Ok(relocation) => relocation,
            Err(err) => return self.reject(candidate, &err),
        };
        self.context.metrics.inc_files_moved(relocation.replaced);
        info!(
            source = %candidate.source_path.display(),
            destination = %relocation.destination.display(),
            replaced = relocation.replaced,
            mode_applied = relocation.mode_applied,
            "file transferred"
        );

        match self.context.notifier.notify(self.layout, relative).await {
            NotifyOutcome::ScanFailed => {
                self.fault(ImportFault::ScanFailed);
                RelocationResult::SkippedScanFailed {
                    replaced: relocation.replaced,
                }
            }
            NotifyOutcome::Scanned(preview) => {
                match preview {
                    PreviewOutcome::Enqueued(_) => self.context.metrics.inc_previews_enqueued(),
                    PreviewOutcome::LookupMiss => self.fault(ImportFault::PreviewLookupMiss),
                    PreviewOutcome::Failed => self.fault(ImportFault::PreviewFailed),
                    PreviewOutcome::AlreadyQueued(_) | PreviewOutcome::Unavailable => {}
                }
                RelocationResult::Moved {
                    replaced: relocation.replaced,
                    preview,
                }
            }
        }
    }

    fn reject(&self, candidate: &Candidate, err: &FsOpsError) -> RelocationResult {
        let fault = ImportFault::from_fsops(err);
        error!(
            source = %candidate.source_path.display(),
            path = ?err.path(),
            fault = fault.as_str(),
            error = %err,
            "transfer skipped"
        );
        self.fault(fault);
        match fault {
            ImportFault::PathConflict => RelocationResult::SkippedConflict,
            _ => RelocationResult::Failed,
        }
    }

    fn fault(&self, fault: ImportFault) {
        self.context.metrics.inc_fault(fault.as_str());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use intake_fsops::{LocalFs, PathResolver};
    use intake_index::Indexer;
    use intake_test_support::fixtures::StagingFixture;
    use intake_test_support::mocks::FakeIndexer;
    use std::fs;

    struct Harness {
        fixture: StagingFixture,
        clock: ManualClock,
        notifier: PostMoveNotifier,
        metrics: Metrics,
    }

    impl Harness {
        fn new() -> anyhow::Result<Self> {
            let indexer: Arc<dyn Indexer> = Arc::new(FakeIndexer::new());
            Ok(Self {
                fixture: StagingFixture::new()?,
                clock: ManualClock::new(),
                notifier: PostMoveNotifier::new(indexer, None),
                metrics: Metrics::new()?,
            })
        }

        fn context(&self, max_polls: Option<u32>) -> RunContext<'_> {
            RunContext {
                probe: Arc::new(LocalFs),
                clock: &self.clock,
                notifier: &self.notifier,
                replicator: TreeReplicator::new(0o755),
                relocator: Relocator::new(0o644),
                poll_interval: Duration::from_secs(5),
                max_polls,
                metrics: &self.metrics,
            }
        }

        fn layout(&self, user: &str) -> anyhow::Result<UserLayout> {
            Ok(PathResolver::new(self.fixture.import_root(), self.fixture.data_root())
                .resolve(user)?)
        }
    }

    #[tokio::test]
    async fn stable_file_moves_after_one_poll() -> anyhow::Result<()> {
        let harness = Harness::new()?;
        harness.fixture.stage("user1", "a.txt", b"0123456789")?;
        harness.fixture.provision_user("user1")?;
        let layout = harness.layout("user1")?;
        let context = harness.context(None);

        let summary = ImportRun::new(&layout, &context).execute().await;

        assert_eq!(summary.outcome, RunOutcome::Completed);
        assert_eq!(summary.moved, 1);
        assert_eq!(summary.polls, 1);
        assert_eq!(harness.clock.sleeps(), vec![Duration::from_secs(5)]);
        assert_eq!(harness.fixture.read_destination("user1", "a.txt")?, b"0123456789");
        Ok(())
    }

    #[tokio::test]
    async fn empty_staging_finishes_without_polling() -> anyhow::Result<()> {
        let harness = Harness::new()?;
        fs::create_dir_all(harness.fixture.staging_dir("user1").join("empty-dir"))?;
        let layout = harness.layout("user1")?;
        let context = harness.context(None);

        let summary = ImportRun::new(&layout, &context).execute().await;

        assert_eq!(summary.discovered, 0);
        assert_eq!(summary.polls, 0);
        assert!(harness.clock.sleeps().is_empty());
        Ok(())
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn unreadable_entries_are_counted_and_the_run_completes() -> anyhow::Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let harness = Harness::new()?;
        harness.fixture.stage("user1", "a.txt", b"abc")?;
        harness.fixture.provision_user("user1")?;
        let locked = harness.fixture.staging_dir("user1").join("locked");
        fs::create_dir(&locked)?;
        fs::write(locked.join("hidden.txt"), b"hidden")?;
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000))?;
        if fs::read_dir(&locked).is_ok() {
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755))?;
            eprintln!("skipping: directory permissions are not enforced for this user");
            return Ok(());
        }
        let layout = harness.layout("user1")?;
        let context = harness.context(None);

        let summary = ImportRun::new(&layout, &context).execute().await;
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755))?;

        assert_eq!(summary.outcome, RunOutcome::Completed);
        assert_eq!(summary.unreadable_entries, 1);
        assert_eq!(summary.discovered, 1);
        assert_eq!(summary.moved, 1);
        assert!(locked.join("hidden.txt").exists());
        Ok(())
    }

    #[tokio::test]
    async fn missing_files_dir_is_a_relocation_failure() -> anyhow::Result<()> {
        let harness = Harness::new()?;
        let staged = harness.fixture.stage("user1", "a.txt", b"abc")?;
        let layout = harness.layout("user1")?;
        let context = harness.context(None);

        let summary = ImportRun::new(&layout, &context).execute().await;

        assert_eq!(summary.failures, 1);
        assert_eq!(summary.moved, 0);
        assert!(staged.exists());
        assert_eq!(harness.metrics.fault_count("relocation_failed"), 1);
        Ok(())
    }

    #[test]
    fn summary_counts_scan_failures_as_moved() {
        let mut summary = RunSummary::new("user1");
        summary.record(RelocationResult::SkippedScanFailed { replaced: true });
        summary.record(RelocationResult::Moved {
            replaced: false,
            preview: PreviewOutcome::Enqueued(4),
        });
        summary.record(RelocationResult::SkippedConflict);
        assert_eq!(summary.moved, 2);
        assert_eq!(summary.replaced, 1);
        assert_eq!(summary.scan_failures, 1);
        assert_eq!(summary.previews_enqueued, 1);
        assert_eq!(summary.conflicts, 1);
    }
}
