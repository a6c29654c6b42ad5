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

//! Binary entrypoint for the staged file import service.

use intake_app::{AppResult, run_app};

/// Parses the command line, wires the collaborators, and runs until done.
#[tokio::main]
async fn main() -> AppResult<()> {
    run_app().await
}
