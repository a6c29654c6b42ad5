//! Default values applied when a setting is absent.
//!
//! # Design
//! - Timings mirror the long-standing behaviour of the import job: a five second
//!   stability debounce and a five minute schedule.
//! - Modes are the conventional `0o755`/`0o644` pair for managed storage.

use std::time::Duration;

/// Delay between two size samples of the same candidate.
pub const POLL_INTERVAL: Duration = Duration::from_secs(5);
/// Smallest accepted debounce interval, in seconds.
pub const MIN_POLL_INTERVAL_SECS: u64 = 1;
/// Polling rounds allowed per user run before the remaining candidates are abandoned.
pub const MAX_POLLS: u32 = 720;
/// Delay between two scheduled import jobs.
pub const RUN_INTERVAL: Duration = Duration::from_secs(300);
/// Mode applied to directories created in managed storage.
pub const DIR_MODE: u32 = 0o755;
/// Mode applied to every relocated file.
pub const FILE_MODE: u32 = 0o644;
/// Table prefix of the platform database.
pub const TABLE_PREFIX: &str = "oc_";
/// Application id whose presence enables preview queueing.
pub const PREVIEW_APP: &str = "previewgenerator";
/// Program invoked to index a relocated file.
pub const SCAN_PROGRAM: &str = "php";
/// Arguments passed to the scan program ahead of `--path <path>`.
pub const SCAN_ARGS: &[&str] = &["occ", "files:scan", "-v"];
/// Log level used when neither the configuration nor `RUST_LOG` sets one.
pub const LOG_LEVEL: &str = "info";
