//! One scheduled import job across users.
//!
//! # Design
//! - Users are processed sequentially; a user's run drains before the next starts.
//! - The preview capability is probed once per job and shared by every run.
//! - Each user's logs are wrapped in a `user` span; each job carries a `run_id`.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use intake_config::ImportConfig;
use intake_fsops::{LocalFs, PathResolver, Relocator, SizeProbe, TreeReplicator};
use intake_index::{Indexer, PreviewQueue, UserDirectory};
use intake_telemetry::Metrics;
use serde::Serialize;
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

use crate::clock::{Clock, TokioClock};
use crate::error::{ImportError, ImportResult};
use crate::fault::ImportFault;
use crate::notify::PostMoveNotifier;
use crate::run::{ImportRun, RunContext, RunOutcome, RunSummary};

/// Paths, timing, and modes used by an [`ImportJob`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSettings {
    /// Root of the per-user staging directories; `None` disables the job.
    pub import_root: Option<PathBuf>,
    /// Root of managed user storage.
    pub data_root: PathBuf,
    /// Delay between measurement rounds.
    pub poll_interval: Duration,
    /// Maximum measurement rounds per user, `None` for unbounded.
    pub max_polls: Option<u32>,
    /// Mode for created directories.
    pub dir_mode: u32,
    /// Mode for relocated files.
    pub file_mode: u32,
}

impl From<&ImportConfig> for JobSettings {
    fn from(config: &ImportConfig) -> Self {
        Self {
            import_root: config.import_root().map(PathBuf::from),
            data_root: config.data_root.clone(),
            poll_interval: config.poll_interval,
            max_polls: config.max_polls,
            dir_mode: config.dir_mode,
            file_mode: config.file_mode,
        }
    }
}

/// Aggregated result of one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobSummary {
    /// Identifier attached to every log line of the job.
    pub run_id: Uuid,
    /// Whether the job was skipped because no import root is configured.
    pub disabled: bool,
    /// Per-user results, in processing order.
    pub users: Vec<RunSummary>,
}

impl JobSummary {
    fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            disabled: false,
            users: Vec::new(),
        }
    }

    /// Files relocated across all users.
    #[must_use]
    pub fn moved(&self) -> usize {
        self.users.iter().map(|user| user.moved).sum()
    }

    /// Per-file faults across all users.
    #[must_use]
    pub fn faults(&self) -> usize {
        self.users
            .iter()
            .map(|user| {
                user.conflicts + user.failures + user.scan_failures + user.dropped + user.abandoned
            })
            .sum()
    }
}

/// Runs the import for every known user.
pub struct ImportJob {
    settings: JobSettings,
    users: Arc<dyn UserDirectory>,
    indexer: Arc<dyn Indexer>,
    previews: Option<Arc<dyn PreviewQueue>>,
    probe: Arc<dyn SizeProbe>,
    clock: Arc<dyn Clock>,
    metrics: Metrics,
}

impl ImportJob {
    /// Job over `users`, notifying `indexer`, measuring the local filesystem
    /// and sleeping on the tokio timer.
    #[must_use]
    pub fn new(
        settings: JobSettings,
        users: Arc<dyn UserDirectory>,
        indexer: Arc<dyn Indexer>,
        metrics: Metrics,
    ) -> Self {
        Self {
            settings,
            users,
            indexer,
            previews: None,
            probe: Arc::new(LocalFs),
            clock: Arc::new(TokioClock),
            metrics,
        }
    }

    /// Use `queue` for preview requests when it reports itself installed.
    #[must_use]
    pub fn with_previews(mut self, queue: Arc<dyn PreviewQueue>) -> Self {
        self.previews = Some(queue);
        self
    }

    /// Replace the size probe.
    #[must_use]
    pub fn with_probe(mut self, probe: Arc<dyn SizeProbe>) -> Self {
        self.probe = probe;
        self
    }

    /// Replace the time source.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Metrics registry the job records into.
    #[must_use]
    pub const fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Import staged files for every user in the directory.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::UserDirectory`] when the users cannot be listed.
    pub async fn run_once(&self) -> ImportResult<JobSummary> {
        let run_id = Uuid::new_v4();
        self.run_all(run_id)
            .instrument(info_span!("import_job", run_id = %run_id))
            .await
    }

    /// Import staged files for a single user without consulting the directory.
    pub async fn run_for_user(&self, user: &str) -> JobSummary {
        let run_id = Uuid::new_v4();
        let span = info_span!("import_job", run_id = %run_id);
        match self.resolver() {
            Some(resolver) => {
                self.run_users(run_id, &resolver, &[user.to_string()])
                    .instrument(span)
                    .await
            }
            None => span.in_scope(|| Self::disabled(run_id)),
        }
    }

    async fn run_all(&self, run_id: Uuid) -> ImportResult<JobSummary> {
        let Some(resolver) = self.resolver() else {
            return Ok(Self::disabled(run_id));
        };
        let users = self
            .users
            .list_users()
            .await
            .map_err(|source| ImportError::UserDirectory { source })?;
        info!(users = users.len(), "import job started");
        let summary = self.run_users(run_id, &resolver, &users).await;
        info!(
            moved = summary.moved(),
            faults = summary.faults(),
            "import job finished"
        );
        Ok(summary)
    }

    fn resolver(&self) -> Option<PathResolver> {
        self.settings
            .import_root
            .as_ref()
            .map(|root| PathResolver::new(root, &self.settings.data_root))
    }

    fn disabled(run_id: Uuid) -> JobSummary {
        info!("import root is not configured; nothing to do");
        JobSummary {
            disabled: true,
            ..JobSummary::new(run_id)
        }
    }

    async fn run_users(
        &self,
        run_id: Uuid,
        resolver: &PathResolver,
        users: &[String],
    ) -> JobSummary {
        let notifier =
            PostMoveNotifier::new(Arc::clone(&self.indexer), self.preview_queue().await);
        let context = RunContext {
            probe: Arc::clone(&self.probe),
            clock: self.clock.as_ref(),
            notifier: &notifier,
            replicator: TreeReplicator::new(self.settings.dir_mode),
            relocator: Relocator::new(self.settings.file_mode),
            poll_interval: self.settings.poll_interval,
            max_polls: self.settings.max_polls,
            metrics: &self.metrics,
        };

        let mut summary = JobSummary::new(run_id);
        for user in users {
            let span = info_span!("user", user = %user);
            let result = async {
                match resolver.resolve(user) {
                    Ok(layout) => ImportRun::new(&layout, &context).execute().await,
                    Err(err) => {
                        warn!(error = %err, "user identifier rejected; skipping user");
                        self.metrics.inc_fault(ImportFault::InvalidUser.as_str());
                        RunSummary {
                            outcome: RunOutcome::InvalidUser,
                            ..RunSummary::new(user)
                        }
                    }
                }
            }
            .instrument(span)
            .await;
            self.metrics.inc_user_run(result.outcome.as_str());
            summary.users.push(result);
        }
        summary
    }

    async fn preview_queue(&self) -> Option<Arc<dyn PreviewQueue>> {
        let queue = self.previews.as_ref()?;
        match queue.available().await {
            Ok(true) => Some(Arc::clone(queue)),
            Ok(false) => None,
            Err(err) => {
                warn!(error = %err, "preview capability check failed; previews disabled for this job");
                None
            }
        }
    }
}
