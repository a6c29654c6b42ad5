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

//! Staged file import service wiring.
//!
//! Layout: `cli.rs` (command line), `bootstrap.rs` (environment and collaborator
//! wiring), `schedule.rs` (periodic job loop), `error.rs` (`AppError`).

/// Application bootstrap and environment loading.
pub mod bootstrap;
/// Command-line surface.
pub mod cli;
/// Application-level errors.
pub mod error;
/// Periodic execution of the import job.
pub mod schedule;

pub use bootstrap::run_app;
pub use cli::{Cli, Command, OnceArgs};
pub use error::{AppError, AppResult};
pub use schedule::Schedule;
