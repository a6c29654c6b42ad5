//! Application bootstrap: environment, logging, and collaborator wiring.
//!
//! # Design
//! - Configuration loads before logging so the configured level and format apply.
//! - `DATABASE_URL` is required: users, file ids, and the preview queue live in
//!   the platform database.
//! - `run_app_with` takes injected dependencies and a shutdown future so tests
//!   can drive either mode without a database or signals.

use std::future::Future;
use std::io::{self, Write};
use std::sync::Arc;

use clap::Parser;
use intake_config::{ImportConfig, LogFormatSetting, TelemetrySettings, loader};
use intake_import::{ImportJob, JobSettings, JobSummary};
use intake_index::{CommandScanner, HostIndexer, Indexer, PgCatalog, PreviewQueue, UserDirectory};
use intake_telemetry::{GlobalContextGuard, LogFormat, LoggingConfig, Metrics};
use tracing::{info, warn};

use crate::cli::{Cli, Command};
use crate::error::{AppError, AppResult};
use crate::schedule::Schedule;

const BUILD_SHA: &str = match option_env!("INTAKE_BUILD_SHA") {
    Some(sha) => sha,
    None => "dev",
};

/// Dependencies required to run the import service.
pub(crate) struct BootstrapDependencies {
    job: ImportJob,
    schedule: Schedule,
}

impl BootstrapDependencies {
    /// Connect the production collaborators described by `config`.
    pub(crate) async fn from_config(config: &ImportConfig) -> AppResult<Self> {
        let database_url = config
            .database_url
            .as_ref()
            .ok_or(AppError::MissingEnv {
                name: loader::DATABASE_URL,
            })?;

        let catalog = Arc::new(
            PgCatalog::connect(
                database_url.expose(),
                &config.table_prefix,
                &config.preview_app,
            )
            .await
            .map_err(|err| AppError::index("catalog.connect", err))?,
        );
        let scanner: Arc<dyn Indexer> = Arc::new(
            CommandScanner::new(config.scan.program.clone(), config.scan.args.clone())
                .with_working_dir(config.scan.working_dir.clone()),
        );
        let lookup: Arc<dyn Indexer> = catalog.clone();
        let users: Arc<dyn UserDirectory> = catalog.clone();
        let previews: Arc<dyn PreviewQueue> = catalog;
        let indexer: Arc<dyn Indexer> = Arc::new(HostIndexer::new(scanner, lookup));

        let metrics =
            Metrics::new().map_err(|err| AppError::telemetry("telemetry.metrics", err))?;
        let job = ImportJob::new(JobSettings::from(config), users, indexer, metrics)
            .with_previews(previews);

        Ok(Self {
            job,
            schedule: schedule_for(config),
        })
    }
}

/// Entry point for the import service.
///
/// # Errors
///
/// Returns an error if configuration, logging, or the database connection
/// cannot be set up, or if a single job cannot enumerate its users.
pub async fn run_app() -> AppResult<()> {
    let command = Cli::parse().into_command();
    let config = intake_config::from_env().map_err(|err| AppError::config("config.from_env", err))?;
    intake_telemetry::init_logging(&logging_config(&config.telemetry))
        .map_err(|err| AppError::telemetry("telemetry.init", err))?;
    let _context = GlobalContextGuard::new(command.mode());

    info!(
        import_root = ?config.import_root(),
        data_root = %config.data_root.display(),
        "intake bootstrap starting"
    );
    let dependencies = BootstrapDependencies::from_config(&config).await?;
    run_app_with(command, dependencies, shutdown_signal()).await
}

/// Execute `command` against injected dependencies.
pub(crate) async fn run_app_with<F>(
    command: Command,
    dependencies: BootstrapDependencies,
    shutdown: F,
) -> AppResult<()>
where
    F: Future<Output = ()>,
{
    let BootstrapDependencies { job, schedule } = dependencies;
    match command {
        Command::Run => {
            let completed = schedule.run_until(&job, shutdown).await;
            schedule.export_metrics(job.metrics());
            info!(jobs = completed, "intake stopped");
            Ok(())
        }
        Command::Once(args) => {
            let summary = match args.user.as_deref() {
                Some(user) => job.run_for_user(user).await,
                None => job
                    .run_once()
                    .await
                    .map_err(|err| AppError::import("import.run_once", err))?,
            };
            schedule.export_metrics(job.metrics());
            if args.json {
                write_summary(&mut io::stdout().lock(), &summary)?;
            }
            Ok(())
        }
    }
}

fn schedule_for(config: &ImportConfig) -> Schedule {
    Schedule::new(config.run_interval, config.telemetry.metrics_file.clone())
}

fn logging_config(settings: &TelemetrySettings) -> LoggingConfig<'_> {
    let format = match settings.log_format {
        Some(LogFormatSetting::Json) => LogFormat::Json,
        Some(LogFormatSetting::Pretty) => LogFormat::Pretty,
        None => LogFormat::infer(),
    };
    LoggingConfig {
        level: &settings.log_level,
        format,
        build_sha: BUILD_SHA,
    }
}

fn write_summary(out: &mut impl Write, summary: &JobSummary) -> AppResult<()> {
    let rendered = serde_json::to_string_pretty(summary)
        .map_err(|err| AppError::serialize("summary.to_json", err))?;
    writeln!(out, "{rendered}").map_err(|err| AppError::output("summary.write", err))
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to install ctrl-c handler; running until terminated");
        std::future::pending::<()>().await;
    }
}
