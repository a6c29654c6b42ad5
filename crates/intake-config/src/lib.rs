#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Environment-backed configuration for the staged file import service.
//!
//! Layout: `model.rs` (typed configuration), `defaults.rs` (default values),
//! `validate.rs` (parsing and validation helpers), `loader.rs` (environment loading).

pub mod defaults;
pub mod error;
pub mod loader;
pub mod model;
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::{from_env, from_lookup};
pub use model::{DatabaseUrl, ImportConfig, LogFormatSetting, ScanCommandConfig, TelemetrySettings};
