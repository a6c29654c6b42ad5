//! Periodic execution of the import job.
//!
//! # Design
//! - One job at a time on a single task, so runs never overlap.
//! - Shutdown is observed between jobs and at every suspension point of the
//!   in-flight job; unmoved files stay staged for the next start.
//! - A failed job is logged and retried at the next tick.

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use intake_import::{ImportJob, JobSummary};
use intake_telemetry::Metrics;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{error, info, warn};

/// Interval and export settings for the scheduler loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    interval: Duration,
    metrics_file: Option<PathBuf>,
}

impl Schedule {
    /// Schedule firing every `interval`, exporting metrics to `metrics_file` after each job.
    #[must_use]
    pub const fn new(interval: Duration, metrics_file: Option<PathBuf>) -> Self {
        Self {
            interval,
            metrics_file,
        }
    }

    /// Run `job` immediately and then every interval until `shutdown` resolves.
    ///
    /// Returns the number of jobs that ran to completion.
    pub async fn run_until<F>(&self, job: &ImportJob, shutdown: F) -> usize
    where
        F: Future<Output = ()>,
    {
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        info!(interval_secs = self.interval.as_secs(), "import scheduler started");
        let mut completed = 0;
        loop {
            tokio::select! {
                () = &mut shutdown => {
                    info!("shutdown requested; scheduler stopping");
                    break;
                }
                _ = ticker.tick() => {}
            }

            tokio::select! {
                () = &mut shutdown => {
                    warn!("shutdown requested; in-flight import job interrupted");
                    break;
                }
                result = job.run_once() => {
                    match result {
                        Ok(summary) => log_summary(&summary),
                        Err(err) => error!(error = %err, "import job failed; retrying at next interval"),
                    }
                    completed += 1;
                    self.export_metrics(job.metrics());
                }
            }
        }
        completed
    }

    /// Write the metrics textfile when one is configured.
    pub fn export_metrics(&self, metrics: &Metrics) {
        let Some(path) = self.metrics_file.as_deref() else {
            return;
        };
        if let Err(err) = metrics.write_textfile(path) {
            warn!(error = %err, path = %path.display(), "failed to export metrics textfile");
        }
    }
}

fn log_summary(summary: &JobSummary) {
    if summary.disabled {
        return;
    }
    info!(
        run_id = %summary.run_id,
        users = summary.users.len(),
        moved = summary.moved(),
        faults = summary.faults(),
        "import job summary"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use intake_import::JobSettings;
    use intake_test_support::fixtures::StagingFixture;
    use intake_test_support::mocks::{FakeIndexer, StaticUsers};

    fn job(fixture: &StagingFixture, import_root: Option<PathBuf>) -> anyhow::Result<ImportJob> {
        Ok(ImportJob::new(
            JobSettings {
                import_root,
                data_root: fixture.data_root().to_path_buf(),
                poll_interval: Duration::from_secs(5),
                max_polls: Some(3),
                dir_mode: 0o755,
                file_mode: 0o644,
            },
            Arc::new(StaticUsers::new(["user1"])),
            Arc::new(FakeIndexer::new()),
            Metrics::new()?,
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn runs_immediately_and_then_every_interval() -> anyhow::Result<()> {
        let fixture = StagingFixture::new()?;
        let job = job(&fixture, None)?;
        let schedule = Schedule::new(Duration::from_secs(300), None);

        let completed = schedule
            .run_until(&job, tokio::time::sleep(Duration::from_secs(650)))
            .await;

        assert_eq!(completed, 3);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_before_first_tick_runs_nothing() -> anyhow::Result<()> {
        let fixture = StagingFixture::new()?;
        let job = job(&fixture, None)?;
        let schedule = Schedule::new(Duration::from_secs(300), None);

        let completed = schedule.run_until(&job, std::future::ready(())).await;

        assert_eq!(completed, 0);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn failed_jobs_do_not_stop_the_scheduler() -> anyhow::Result<()> {
        let fixture = StagingFixture::new()?;
        let job = ImportJob::new(
            JobSettings {
                import_root: Some(fixture.import_root().to_path_buf()),
                data_root: fixture.data_root().to_path_buf(),
                poll_interval: Duration::from_secs(5),
                max_polls: Some(3),
                dir_mode: 0o755,
                file_mode: 0o644,
            },
            Arc::new(StaticUsers::unavailable()),
            Arc::new(FakeIndexer::new()),
            Metrics::new()?,
        );
        let schedule = Schedule::new(Duration::from_secs(60), None);

        let completed = schedule
            .run_until(&job, tokio::time::sleep(Duration::from_secs(150)))
            .await;

        assert_eq!(completed, 3);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn metrics_textfile_is_written_after_each_job() -> anyhow::Result<()> {
        let fixture = StagingFixture::new()?;
        fixture.stage("user1", "a.txt", b"abc")?;
        fixture.provision_user("user1")?;
        let job = job(&fixture, Some(fixture.import_root().to_path_buf()))?;
        let scratch = tempfile::tempdir()?;
        let metrics_file = scratch.path().join("intake.prom");
        let schedule = Schedule::new(Duration::from_secs(300), Some(metrics_file.clone()));

        let completed = schedule
            .run_until(&job, tokio::time::sleep(Duration::from_secs(100)))
            .await;

        assert_eq!(completed, 1);
        let exported = std::fs::read_to_string(&metrics_file)?;
        assert!(exported.contains("intake_files_moved_total 1"));
        assert_eq!(fixture.read_destination("user1", "a.txt")?, b"abc");
        Ok(())
    }
}
