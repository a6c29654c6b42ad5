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

//! Collaborators the import job talks to after a file has moved.
//!
//! Layout: `traits.rs` (capability seams), `scanner.rs` (external scan command),
//! `catalog.rs` (Postgres-backed lookups and preview queue), `host.rs` (combined
//! indexer), `error.rs`.

pub mod catalog;
pub mod error;
pub mod host;
pub mod scanner;
pub mod traits;

pub use catalog::{CatalogStatements, PgCatalog};
pub use error::{IndexError, IndexResult};
pub use host::HostIndexer;
pub use scanner::CommandScanner;
pub use traits::{Indexer, PreviewQueue, ScanReport, UserDirectory};
