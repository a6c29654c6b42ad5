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

//! Filesystem primitives for moving staged files into managed user storage.
//!
//! Everything here is synchronous and operates on one path at a time; the
//! import run in `intake-import` decides ordering and fault isolation.

pub mod discover;
pub mod error;
pub mod layout;
mod mode;
pub mod probe;
pub mod relocate;
pub mod replicate;

pub use discover::{Candidate, Snapshot, discover};
pub use error::{FsOpsError, FsOpsResult};
pub use layout::{PathResolver, UserLayout, portable_path};
pub use probe::{LocalFs, SizeProbe};
pub use relocate::{Relocation, Relocator};
pub use replicate::TreeReplicator;
