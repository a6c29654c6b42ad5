//! One-shot discovery of staged files.
//!
//! # Design
//! - Walks the staging tree once per run without following symlinks.
//! - Only regular files become candidates; directories are traversed, links ignored.
//! - Unreadable entries are reported alongside the snapshot instead of aborting it.
//! - Files whose relative path is not UTF-8 are reported as skipped; they stay staged.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{FsOpsError, FsOpsResult};

/// A staged file awaiting a stable size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Absolute location inside the staging directory.
    pub source_path: PathBuf,
    /// Location relative to the staging directory.
    pub relative_path: PathBuf,
    /// Size recorded by the most recent observation.
    pub last_observed_size: u64,
}

/// Result of a discovery pass.
#[derive(Debug, Default)]
pub struct Snapshot {
    /// Regular files found, in traversal order.
    pub candidates: Vec<Candidate>,
    /// Entries that could not be read; they stay on disk for the next run.
    pub skipped: Vec<FsOpsError>,
}

/// Enumerate every regular file below `staging_root`.
///
/// Entries are visited in file-name order at each level so repeated runs see
/// the same sequence.
///
/// # Errors
///
/// Returns [`FsOpsError::StagingMissing`] when `staging_root` is not a directory.
pub fn discover(staging_root: &Path) -> FsOpsResult<Snapshot> {
    if !staging_root.is_dir() {
        return Err(FsOpsError::StagingMissing {
            path: staging_root.to_path_buf(),
        });
    }

    let mut snapshot = Snapshot::default();
    let walker = WalkDir::new(staging_root)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let path = err
                    .path()
                    .map_or_else(|| staging_root.to_path_buf(), Path::to_path_buf);
                snapshot
                    .skipped
                    .push(FsOpsError::walkdir("discover.walk", path, err));
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let size = match entry.metadata() {
            Ok(metadata) => metadata.len(),
            Err(err) => {
                snapshot
                    .skipped
                    .push(FsOpsError::walkdir("discover.metadata", entry.path(), err));
                continue;
            }
        };
        let Ok(relative) = entry.path().strip_prefix(staging_root) else {
            continue;
        };
        if relative.to_str().is_none() {
            snapshot.skipped.push(FsOpsError::NonUtf8Name {
                path: entry.path().to_path_buf(),
            });
            continue;
        }
        snapshot.candidates.push(Candidate {
            source_path: entry.path().to_path_buf(),
            relative_path: relative.to_path_buf(),
            last_observed_size: size,
        });
    }

    Ok(snapshot)
}
