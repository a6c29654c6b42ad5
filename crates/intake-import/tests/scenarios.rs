use std::fs;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use intake_import::{ImportJob, JobSettings, ManualClock, RunOutcome};
use intake_index::ScanReport;
use intake_telemetry::Metrics;
use intake_test_support::fixtures::StagingFixture;
use intake_test_support::mocks::{
    FakeIndexer, FakePreviewQueue, ProbeStep, ScriptedProbe, StaticUsers,
};

struct Scenario {
    fixture: StagingFixture,
    indexer: Arc<FakeIndexer>,
    queue: Arc<FakePreviewQueue>,
    probe: Arc<ScriptedProbe>,
    clock: Arc<ManualClock>,
    metrics: Metrics,
    max_polls: Option<u32>,
}

impl Scenario {
    fn new() -> Result<Self> {
        Ok(Self {
            fixture: StagingFixture::new()?,
            indexer: Arc::new(FakeIndexer::new()),
            queue: Arc::new(FakePreviewQueue::new()),
            probe: Arc::new(ScriptedProbe::new()),
            clock: Arc::new(ManualClock::new()),
            metrics: Metrics::new()?,
            max_polls: None,
        })
    }

    fn with_indexer(mut self, indexer: FakeIndexer) -> Self {
        self.indexer = Arc::new(indexer);
        self
    }

    fn with_queue(mut self, queue: FakePreviewQueue) -> Self {
        self.queue = Arc::new(queue);
        self
    }

    fn job(&self, users: &[&str]) -> ImportJob {
        let settings = JobSettings {
            import_root: Some(self.fixture.import_root().to_path_buf()),
            data_root: self.fixture.data_root().to_path_buf(),
            poll_interval: Duration::from_secs(5),
            max_polls: self.max_polls,
            dir_mode: 0o755,
            file_mode: 0o644,
        };
        ImportJob::new(
            settings,
            Arc::new(StaticUsers::new(users.iter().copied())),
            self.indexer.clone(),
            self.metrics.clone(),
        )
        .with_previews(self.queue.clone())
        .with_probe(self.probe.clone())
        .with_clock(self.clock.clone())
    }
}

#[cfg(unix)]
fn mode_of(path: &std::path::Path) -> Result<u32> {
    use std::os::unix::fs::PermissionsExt;
    Ok(fs::metadata(path)?.permissions().mode() & 0o7777)
}

#[tokio::test]
async fn stable_file_is_moved_normalised_and_scanned() -> Result<()> {
    let scenario = Scenario::new()?;
    let staged = scenario.fixture.stage("user1", "a.txt", b"0123456789")?;
    scenario.fixture.provision_user("user1")?;

    let summary = scenario.job(&["user1"]).run_once().await?;

    assert_eq!(summary.users[0].outcome, RunOutcome::Completed);
    assert_eq!(summary.users[0].polls, 1);
    assert!(!staged.exists());
    assert_eq!(
        scenario.fixture.read_destination("user1", "a.txt")?,
        b"0123456789"
    );
    #[cfg(unix)]
    assert_eq!(
        mode_of(&scenario.fixture.files_dir("user1").join("a.txt"))?,
        0o644
    );
    assert_eq!(scenario.indexer.scanned(), vec!["user1/files/a.txt"]);
    assert_eq!(scenario.clock.sleeps(), vec![Duration::from_secs(5)]);
    Ok(())
}

#[tokio::test]
async fn job_summary_serialises_with_snake_case_outcome() -> Result<()> {
    let scenario = Scenario::new()?;
    scenario.fixture.stage("user1", "a.txt", b"abc")?;
    scenario.fixture.provision_user("user1")?;

    let summary = scenario.job(&["user1"]).run_once().await?;
    let value = serde_json::to_value(&summary)?;

    assert_eq!(value["disabled"], serde_json::json!(false));
    assert_eq!(value["run_id"], serde_json::json!(summary.run_id.to_string()));
    let user = &value["users"][0];
    assert_eq!(user["user"], "user1");
    assert_eq!(user["outcome"], "completed");
    assert_eq!(user["moved"], 1);
    assert_eq!(user["unreadable_entries"], 0);
    Ok(())
}

#[tokio::test]
async fn growing_file_waits_for_one_stable_reading() -> Result<()> {
    let scenario = Scenario::new()?;
    let staged = scenario.fixture.stage("user1", "b.txt", b"xy")?;
    scenario.fixture.provision_user("user1")?;
    scenario.probe.grow(&staged, [5, 8, 8]);

    let summary = scenario.job(&["user1"]).run_once().await?;

    assert_eq!(summary.users[0].polls, 3);
    assert_eq!(summary.users[0].moved, 1);
    assert_eq!(scenario.probe.measurements(&staged), 3);
    assert_eq!(scenario.fixture.read_destination("user1", "b.txt")?.len(), 8);
    Ok(())
}

#[tokio::test]
async fn missing_staging_directory_skips_the_user() -> Result<()> {
    let scenario = Scenario::new()?;
    scenario.fixture.stage("user1", "a.txt", b"a")?;
    scenario.fixture.provision_user("user1")?;

    let summary = scenario.job(&["user1", "user2"]).run_once().await?;

    assert_eq!(summary.users[1].user, "user2");
    assert_eq!(summary.users[1].outcome, RunOutcome::StagingMissing);
    assert!(!scenario.fixture.data_root().join("user2").exists());
    assert!(!scenario.fixture.staging_dir("user2").exists());
    assert_eq!(scenario.indexer.scanned(), vec!["user1/files/a.txt"]);
    assert_eq!(scenario.metrics.fault_count("staging_missing"), 1);
    Ok(())
}

#[tokio::test]
async fn nested_file_gets_its_directory_created() -> Result<()> {
    let scenario = Scenario::new()?;
    scenario.fixture.stage("user1", "sub/c.txt", b"ccc")?;
    let files = scenario.fixture.provision_user("user1")?;
    assert!(!files.join("sub").exists());

    scenario.job(&["user1"]).run_once().await?;

    assert!(files.join("sub").is_dir());
    #[cfg(unix)]
    assert_eq!(mode_of(&files.join("sub"))?, 0o755);
    assert_eq!(fs::read(files.join("sub/c.txt"))?, b"ccc");
    assert_eq!(scenario.indexer.scanned(), vec!["user1/files/sub/c.txt"]);
    Ok(())
}

#[tokio::test]
async fn absent_preview_subsystem_only_scans() -> Result<()> {
    let scenario = Scenario::new()?
        .with_indexer(FakeIndexer::new().with_file_id("home::user1", "files/a.txt", 11))
        .with_queue(FakePreviewQueue::absent());
    scenario.fixture.stage("user1", "a.txt", b"a")?;
    scenario.fixture.provision_user("user1")?;

    let summary = scenario.job(&["user1"]).run_once().await?;

    assert_eq!(summary.users[0].moved, 1);
    assert_eq!(scenario.indexer.scanned(), vec!["user1/files/a.txt"]);
    assert!(scenario.indexer.lookups().is_empty());
    assert_eq!(scenario.queue.exists_calls(), 0);
    assert_eq!(scenario.queue.insert_calls(), 0);
    Ok(())
}

#[tokio::test]
async fn installed_preview_subsystem_gets_one_request_per_file() -> Result<()> {
    let scenario = Scenario::new()?
        .with_indexer(FakeIndexer::new().with_file_id("home::user1", "files/a.txt", 11));
    scenario.fixture.provision_user("user1")?;

    scenario.fixture.stage("user1", "a.txt", b"first")?;
    scenario.job(&["user1"]).run_once().await?;
    scenario.fixture.stage("user1", "a.txt", b"second")?;
    let second = scenario.job(&["user1"]).run_once().await?;

    assert_eq!(scenario.queue.entries(), vec![("user1".to_string(), 11)]);
    assert_eq!(second.users[0].previews_enqueued, 0);
    assert_eq!(second.users[0].replaced, 1);
    assert_eq!(scenario.fixture.read_destination("user1", "a.txt")?, b"second");
    Ok(())
}

#[tokio::test]
async fn non_directory_in_chain_leaves_source_untouched() -> Result<()> {
    let scenario = Scenario::new()?;
    let staged = scenario.fixture.stage("user1", "sub/c.txt", b"payload")?;
    scenario.fixture.stage("user1", "z.txt", b"z")?;
    scenario.fixture.provision_user("user1")?;
    let blocker = scenario.fixture.place("user1", "sub", b"i am a file")?;

    let summary = scenario.job(&["user1"]).run_once().await?;

    assert_eq!(summary.users[0].conflicts, 1);
    assert_eq!(summary.users[0].moved, 1);
    assert_eq!(fs::read(&staged)?, b"payload");
    assert_eq!(fs::read(&blocker)?, b"i am a file");
    assert_eq!(scenario.indexer.scanned(), vec!["user1/files/z.txt"]);
    assert_eq!(scenario.metrics.fault_count("path_conflict"), 1);
    Ok(())
}

#[tokio::test]
async fn directory_at_destination_is_a_conflict() -> Result<()> {
    let scenario = Scenario::new()?;
    let staged = scenario.fixture.stage("user1", "a.txt", b"a")?;
    let files = scenario.fixture.provision_user("user1")?;
    fs::create_dir(files.join("a.txt"))?;

    let summary = scenario.job(&["user1"]).run_once().await?;

    assert_eq!(summary.users[0].conflicts, 1);
    assert!(staged.exists());
    assert!(files.join("a.txt").is_dir());
    Ok(())
}

#[tokio::test]
async fn existing_destination_file_is_overwritten() -> Result<()> {
    let scenario = Scenario::new()?;
    scenario.fixture.stage("user1", "a.txt", b"new")?;
    scenario
        .fixture
        .place("user1", "a.txt", b"old content, much longer")?;

    let summary = scenario.job(&["user1"]).run_once().await?;

    assert_eq!(summary.users[0].replaced, 1);
    assert_eq!(scenario.fixture.read_destination("user1", "a.txt")?, b"new");
    assert_eq!(scenario.metrics.snapshot().files_replaced_total, 1);
    Ok(())
}

#[tokio::test]
async fn relocated_files_are_not_moved_again() -> Result<()> {
    let scenario = Scenario::new()?;
    scenario.fixture.stage("user1", "a.txt", b"a")?;
    scenario.fixture.provision_user("user1")?;

    let first = scenario.job(&["user1"]).run_once().await?;
    let second = scenario.job(&["user1"]).run_once().await?;

    assert_eq!(first.moved(), 1);
    assert_eq!(second.moved(), 0);
    assert_eq!(second.users[0].discovered, 0);
    assert_eq!(scenario.indexer.scanned().len(), 1);
    Ok(())
}

#[tokio::test]
async fn failed_scan_keeps_the_move_and_skips_previews() -> Result<()> {
    let scenario = Scenario::new()?.with_indexer(
        FakeIndexer::new()
            .with_file_id("home::user1", "files/a.txt", 3)
            .with_scan_report(
                "user1/files/a.txt",
                ScanReport {
                    exit_code: 1,
                    error_lines: Vec::new(),
                },
            ),
    );
    scenario.fixture.stage("user1", "a.txt", b"a")?;
    scenario.fixture.provision_user("user1")?;

    let summary = scenario.job(&["user1"]).run_once().await?;

    assert_eq!(summary.users[0].moved, 1);
    assert_eq!(summary.users[0].scan_failures, 1);
    assert_eq!(scenario.fixture.read_destination("user1", "a.txt")?, b"a");
    assert!(scenario.indexer.lookups().is_empty());
    assert_eq!(scenario.queue.exists_calls(), 0);
    assert_eq!(scenario.metrics.fault_count("scan_failed"), 1);
    Ok(())
}

#[tokio::test]
async fn vanished_candidate_is_dropped_quietly() -> Result<()> {
    let scenario = Scenario::new()?;
    let staged = scenario.fixture.stage("user1", "gone.txt", b"g")?;
    scenario.fixture.stage("user1", "kept.txt", b"k")?;
    scenario.fixture.provision_user("user1")?;
    scenario
        .probe
        .script(&staged, [ProbeStep::Fail(io::ErrorKind::NotFound)]);

    let summary = scenario.job(&["user1"]).run_once().await?;

    assert_eq!(summary.users[0].dropped, 1);
    assert_eq!(summary.users[0].moved, 1);
    assert_eq!(summary.users[0].outcome, RunOutcome::Completed);
    assert!(staged.exists());
    Ok(())
}

#[tokio::test]
async fn never_settling_file_is_abandoned_at_the_poll_bound() -> Result<()> {
    let mut scenario = Scenario::new()?;
    scenario.max_polls = Some(3);
    let staged = scenario.fixture.stage("user1", "stream.log", b"1")?;
    scenario.fixture.provision_user("user1")?;
    scenario.probe.grow(&staged, [2, 3, 4]);

    let summary = scenario.job(&["user1"]).run_once().await?;

    assert_eq!(summary.users[0].outcome, RunOutcome::Abandoned);
    assert_eq!(summary.users[0].abandoned, 1);
    assert_eq!(summary.users[0].polls, 3);
    assert!(staged.exists());
    assert!(scenario.indexer.scanned().is_empty());
    assert_eq!(scenario.metrics.fault_count("abandoned"), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn default_clock_sleeps_on_the_tokio_timer() -> Result<()> {
    let fixture = StagingFixture::new()?;
    fixture.stage("user1", "a.txt", b"a")?;
    fixture.provision_user("user1")?;
    let job = ImportJob::new(
        JobSettings {
            import_root: Some(fixture.import_root().to_path_buf()),
            data_root: fixture.data_root().to_path_buf(),
            poll_interval: Duration::from_secs(5),
            max_polls: None,
            dir_mode: 0o755,
            file_mode: 0o644,
        },
        Arc::new(StaticUsers::new(["user1"])),
        Arc::new(FakeIndexer::new()),
        Metrics::new()?,
    );

    let started = tokio::time::Instant::now();
    let summary = job.run_once().await?;

    assert_eq!(summary.moved(), 1);
    assert!(started.elapsed() >= Duration::from_secs(5));
    Ok(())
}
