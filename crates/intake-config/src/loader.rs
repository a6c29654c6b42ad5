//! Environment loading.
//!
//! # Design
//! - `from_lookup` takes the lookup function as a parameter so tests never touch
//!   the process environment.
//! - Empty values are treated exactly like unset ones.

use std::path::PathBuf;

use crate::error::ConfigResult;
use crate::model::{DatabaseUrl, ImportConfig};
use crate::validate::{
    parse_log_format, parse_max_polls, parse_octal_mode, parse_seconds, validate,
};

/// Staging root; empty or unset disables the job.
pub const IMPORT_ROOT: &str = "INTAKE_IMPORT_ROOT";
/// Base of managed user storage.
pub const DATA_ROOT: &str = "INTAKE_DATA_ROOT";
/// Stability debounce in seconds.
pub const POLL_INTERVAL_SECS: &str = "INTAKE_POLL_INTERVAL_SECS";
/// Polling bound per user run; `0` lifts the bound.
pub const MAX_POLLS: &str = "INTAKE_MAX_POLLS";
/// Schedule period in seconds.
pub const RUN_INTERVAL_SECS: &str = "INTAKE_RUN_INTERVAL_SECS";
/// Octal mode for created directories.
pub const DIR_MODE: &str = "INTAKE_DIR_MODE";
/// Octal mode for relocated files.
pub const FILE_MODE: &str = "INTAKE_FILE_MODE";
/// Platform database connection string.
pub const DATABASE_URL: &str = "DATABASE_URL";
/// Platform table prefix.
pub const TABLE_PREFIX: &str = "INTAKE_TABLE_PREFIX";
/// Preview generator application id.
pub const PREVIEW_APP: &str = "INTAKE_PREVIEW_APP";
/// Scan program.
pub const SCAN_PROGRAM: &str = "INTAKE_SCAN_PROGRAM";
/// Whitespace separated scan arguments.
pub const SCAN_ARGS: &str = "INTAKE_SCAN_ARGS";
/// Working directory of the scan program.
pub const SCAN_WORKDIR: &str = "INTAKE_SCAN_WORKDIR";
/// Default log level.
pub const LOG_LEVEL: &str = "INTAKE_LOG_LEVEL";
/// Log output format.
pub const LOG_FORMAT: &str = "INTAKE_LOG_FORMAT";
/// Prometheus textfile path.
pub const METRICS_FILE: &str = "INTAKE_METRICS_FILE";

/// Load configuration from the process environment.
///
/// # Errors
///
/// Returns a [`crate::ConfigError`] when a value fails to parse or validate.
pub fn from_env() -> ConfigResult<ImportConfig> {
    from_lookup(|key| std::env::var(key).ok())
}

/// Load configuration through an arbitrary key lookup.
///
/// # Errors
///
/// Returns a [`crate::ConfigError`] when a value fails to parse or validate.
pub fn from_lookup<F>(lookup: F) -> ConfigResult<ImportConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
    let mut config = ImportConfig::default();

    config.import_root = get(IMPORT_ROOT).map(PathBuf::from);
    if let Some(value) = get(DATA_ROOT) {
        config.data_root = PathBuf::from(value);
    }
    if let Some(value) = get(POLL_INTERVAL_SECS) {
        config.poll_interval = parse_seconds(POLL_INTERVAL_SECS, &value, 1)?;
    }
    if let Some(value) = get(MAX_POLLS) {
        config.max_polls = parse_max_polls(MAX_POLLS, &value)?;
    }
    if let Some(value) = get(RUN_INTERVAL_SECS) {
        config.run_interval = parse_seconds(RUN_INTERVAL_SECS, &value, 1)?;
    }
    if let Some(value) = get(DIR_MODE) {
        config.dir_mode = parse_octal_mode(DIR_MODE, &value)?;
    }
    if let Some(value) = get(FILE_MODE) {
        config.file_mode = parse_octal_mode(FILE_MODE, &value)?;
    }
    config.database_url = get(DATABASE_URL).map(DatabaseUrl::new);
    // An explicitly empty prefix is meaningful, so this one bypasses `get`.
    if let Some(value) = lookup(TABLE_PREFIX) {
        config.table_prefix = value.trim().to_string();
    }
    if let Some(value) = get(PREVIEW_APP) {
        config.preview_app = value.trim().to_string();
    }
    if let Some(value) = get(SCAN_PROGRAM) {
        config.scan.program = value.trim().to_string();
    }
    if let Some(value) = lookup(SCAN_ARGS) {
        config.scan.args = value.split_whitespace().map(str::to_string).collect();
    }
    config.scan.working_dir = get(SCAN_WORKDIR).map(PathBuf::from);
    if let Some(value) = get(LOG_LEVEL) {
        config.telemetry.log_level = value.trim().to_string();
    }
    if let Some(value) = get(LOG_FORMAT) {
        config.telemetry.log_format = Some(parse_log_format(LOG_FORMAT, &value)?);
    }
    config.telemetry.metrics_file = get(METRICS_FILE).map(PathBuf::from);

    validate(&config)?;
    Ok(config)
}
