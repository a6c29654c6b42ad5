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

//! Per-user import of staged files into managed storage.
//!
//! An [`ImportJob`] walks every user; for each one an [`ImportRun`] discovers
//! staged files, waits until their size stops changing, moves them into the
//! user's storage tree, and tells the index about them. Faults are isolated to
//! the file (or user) that caused them.

pub mod clock;
pub mod error;
pub mod fault;
pub mod job;
pub mod notify;
pub mod run;
pub mod stability;

pub use clock::{Clock, ManualClock, TokioClock};
pub use error::{ImportError, ImportResult};
pub use fault::ImportFault;
pub use job::{ImportJob, JobSettings, JobSummary};
pub use notify::{NotifyOutcome, PostMoveNotifier, PreviewOutcome};
pub use run::{ImportRun, RelocationResult, RunContext, RunOutcome, RunState, RunSummary};
pub use stability::{Measurement, StabilityTracker};
