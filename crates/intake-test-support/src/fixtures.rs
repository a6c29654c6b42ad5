//! Temporary import and data roots.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::TempDir;

/// Import root and data root living in one temporary directory.
pub struct StagingFixture {
    _root: TempDir,
    import_root: PathBuf,
    data_root: PathBuf,
}

impl StagingFixture {
    /// Create empty `import` and `data` roots.
    ///
    /// # Errors
    ///
    /// Returns an error if the temporary directories cannot be created.
    pub fn new() -> Result<Self> {
        let root = tempfile::tempdir().context("failed to create fixture root")?;
        let import_root = root.path().join("import");
        let data_root = root.path().join("data");
        fs::create_dir(&import_root).context("failed to create import root")?;
        fs::create_dir(&data_root).context("failed to create data root")?;
        Ok(Self {
            _root: root,
            import_root,
            data_root,
        })
    }

    /// Root of all staging directories.
    #[must_use]
    pub fn import_root(&self) -> &Path {
        &self.import_root
    }

    /// Root of all managed storage.
    #[must_use]
    pub fn data_root(&self) -> &Path {
        &self.data_root
    }

    /// Staging directory of `user`.
    #[must_use]
    pub fn staging_dir(&self, user: &str) -> PathBuf {
        self.import_root.join(user)
    }

    /// Managed `files` directory of `user`.
    #[must_use]
    pub fn files_dir(&self, user: &str) -> PathBuf {
        self.data_root.join(user).join("files")
    }

    /// Create the managed `files` directory of `user`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn provision_user(&self, user: &str) -> Result<PathBuf> {
        let files = self.files_dir(user);
        fs::create_dir_all(&files)
            .with_context(|| format!("failed to create {}", files.display()))?;
        Ok(files)
    }

    /// Write `contents` to `<import_root>/<user>/<relative>`, creating parents.
    ///
    /// # Errors
    ///
    /// Returns an error if the file or its parents cannot be written.
    pub fn stage(&self, user: &str, relative: &str, contents: &[u8]) -> Result<PathBuf> {
        let path = self.staging_dir(user).join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        fs::write(&path, contents).with_context(|| format!("failed to write {}", path.display()))?;
        Ok(path)
    }

    /// Write `contents` to `<data_root>/<user>/files/<relative>`, creating parents.
    ///
    /// # Errors
    ///
    /// Returns an error if the file or its parents cannot be written.
    pub fn place(&self, user: &str, relative: &str, contents: &[u8]) -> Result<PathBuf> {
        let path = self.files_dir(user).join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        fs::write(&path, contents).with_context(|| format!("failed to write {}", path.display()))?;
        Ok(path)
    }

    /// Read a relocated file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub fn read_destination(&self, user: &str, relative: &str) -> Result<Vec<u8>> {
        let path = self.files_dir(user).join(relative);
        fs::read(&path).with_context(|| format!("failed to read {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_and_place_write_under_the_right_roots() -> Result<()> {
        let fixture = StagingFixture::new()?;
        let staged = fixture.stage("user1", "sub/c.txt", b"abc")?;
        assert!(staged.starts_with(fixture.import_root()));
        assert_eq!(fs::read(staged)?, b"abc");

        let files = fixture.provision_user("user1")?;
        assert!(files.is_dir());
        fixture.place("user1", "old.txt", b"old")?;
        assert_eq!(fixture.read_destination("user1", "old.txt")?, b"old");
        Ok(())
    }
}
