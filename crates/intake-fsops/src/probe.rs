//! Size measurement seam used by the stability debounce.

use std::fs;
use std::io;
use std::path::Path;

/// Measures the current size of a staged file.
pub trait SizeProbe: Send + Sync {
    /// Current size in bytes of the regular file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error when the path vanished, cannot be read, or is no
    /// longer a regular file.
    fn size_of(&self, path: &Path) -> io::Result<u64>;
}

/// Probe backed by the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl SizeProbe for LocalFs {
    fn size_of(&self, path: &Path) -> io::Result<u64> {
        let metadata = fs::symlink_metadata(path)?;
        if metadata.is_file() {
            Ok(metadata.len())
        } else {
            Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "not a regular file",
            ))
        }
    }
}
