//! Destination directory chain replication.
//!
//! # Design
//! - Mirrors the staging-relative directory chain below the user's files dir.
//! - Components are inspected without following links; anything that is not a
//!   real directory is a conflict and is never replaced.
//! - New directories get an exact mode after creation, independent of umask.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use tracing::debug;

use crate::error::{FsOpsError, FsOpsResult};
use crate::mode::apply_mode;

/// Creates missing destination directories with a fixed mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeReplicator {
    dir_mode: u32,
}

impl TreeReplicator {
    /// Replicator that creates directories with `dir_mode`.
    #[must_use]
    pub const fn new(dir_mode: u32) -> Self {
        Self { dir_mode }
    }

    /// Ensure every directory between `files_dir` and the parent of
    /// `relative` exists, returning the full destination path of the file.
    ///
    /// # Errors
    ///
    /// - [`FsOpsError::PathConflict`] when a component exists but is not a directory.
    /// - [`FsOpsError::InvalidInput`] when `relative` is empty or not a plain
    ///   relative path.
    /// - [`FsOpsError::Io`] when a directory cannot be inspected or created.
    pub fn ensure_parent_chain(&self, files_dir: &Path, relative: &Path) -> FsOpsResult<PathBuf> {
        let mut segments = Vec::new();
        for component in relative.components() {
            match component {
                Component::Normal(segment) => segments.push(segment),
                Component::CurDir => {}
                _ => {
                    return Err(FsOpsError::invalid(
                        "relative_path",
                        "non_normal_component",
                        &relative.display().to_string(),
                    ));
                }
            }
        }
        let Some(file_name) = segments.pop() else {
            return Err(FsOpsError::invalid(
                "relative_path",
                "empty",
                &relative.display().to_string(),
            ));
        };

        let mut current = files_dir.to_path_buf();
        for segment in segments {
            current.push(segment);
            match fs::symlink_metadata(&current) {
                Ok(metadata) if metadata.is_dir() => {}
                Ok(_) => return Err(FsOpsError::PathConflict { path: current }),
                Err(err) if err.kind() == io::ErrorKind::NotFound => self.create_dir(&current)?,
                Err(err) => {
                    return Err(FsOpsError::io("replicate.inspect", current, err));
                }
            }
        }

        current.push(file_name);
        Ok(current)
    }

    fn create_dir(&self, path: &Path) -> FsOpsResult<()> {
        match fs::create_dir(path) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists && path.is_dir() => {
                return Ok(());
            }
            Err(err) => return Err(FsOpsError::io("replicate.create_dir", path, err)),
        }
        apply_mode(path, self.dir_mode, "replicate.set_dir_mode")?;
        debug!(path = %path.display(), mode = format_args!("{:o}", self.dir_mode), "created directory");
        Ok(())
    }
}
