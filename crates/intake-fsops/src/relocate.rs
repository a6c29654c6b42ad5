//! Collision-aware atomic relocation.
//!
//! # Design
//! - Last write wins: an existing non-directory destination is removed first.
//! - A directory at the destination is a conflict and is left untouched.
//! - Moves are a single `rename`; crossing a filesystem boundary is an error,
//!   never a copy.
//! - Once the rename succeeds the move is reported as done; a failed chmod is
//!   logged and surfaced as `mode_applied: false`.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{error, info};

use crate::error::{FsOpsError, FsOpsResult};
use crate::mode::apply_mode;

/// Outcome of a successful relocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relocation {
    /// Final path of the moved file.
    pub destination: PathBuf,
    /// Whether an existing file was deleted to make room.
    pub replaced: bool,
    /// Whether the configured file mode was applied after the move.
    pub mode_applied: bool,
}

type ModeStep = fn(&Path, u32, &'static str) -> FsOpsResult<()>;

/// Moves staged files into place and normalises their mode.
#[derive(Clone, Copy)]
pub struct Relocator {
    file_mode: u32,
    set_mode: ModeStep,
}

impl fmt::Debug for Relocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Relocator")
            .field("file_mode", &format_args!("{:o}", self.file_mode))
            .finish_non_exhaustive()
    }
}

impl Relocator {
    /// Relocator that applies `file_mode` to moved files.
    #[must_use]
    pub const fn new(file_mode: u32) -> Self {
        Self {
            file_mode,
            set_mode: apply_mode,
        }
    }

    #[cfg(test)]
    const fn with_mode_step(mut self, step: ModeStep) -> Self {
        self.set_mode = step;
        self
    }

    /// Move `source` to `destination`.
    ///
    /// # Errors
    ///
    /// - [`FsOpsError::DestinationIsDirectory`] when a directory occupies the destination.
    /// - [`FsOpsError::CrossDevice`] when the rename would cross filesystems.
    /// - [`FsOpsError::Io`] for any other inspection, removal, or rename failure.
    ///
    /// A chmod failure after a successful rename is not an error.
    pub fn relocate(&self, source: &Path, destination: &Path) -> FsOpsResult<Relocation> {
        let replaced = match fs::symlink_metadata(destination) {
            Ok(metadata) if metadata.is_dir() => {
                return Err(FsOpsError::DestinationIsDirectory {
                    path: destination.to_path_buf(),
                });
            }
            Ok(_) => {
                fs::remove_file(destination)
                    .map_err(|err| FsOpsError::io("relocate.remove_existing", destination, err))?;
                info!(path = %destination.display(), "deleted existing destination file");
                true
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => false,
            Err(err) => return Err(FsOpsError::io("relocate.inspect", destination, err)),
        };

        fs::rename(source, destination).map_err(|err| {
            if err.kind() == io::ErrorKind::CrossesDevices {
                FsOpsError::CrossDevice {
                    source_path: source.to_path_buf(),
                    destination: destination.to_path_buf(),
                    source: err,
                }
            } else {
                FsOpsError::io("relocate.rename", destination, err)
            }
        })?;

        let mode_result = (self.set_mode)(destination, self.file_mode, "relocate.set_file_mode");
        if let Err(err) = &mode_result {
            error!(
                error = %err,
                path = %destination.display(),
                mode = format_args!("{:o}", self.file_mode),
                "file moved but its mode could not be set"
            );
        }

        Ok(Relocation {
            destination: destination.to_path_buf(),
            replaced,
            mode_applied: mode_result.is_ok(),
        })
    }
}
