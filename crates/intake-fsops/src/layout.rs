//! Per-user path layout.
//!
//! # Design
//! - Staging lives at `<import_root>/<user>`; managed storage at `<data_root>/<user>/files`.
//! - Index-facing paths are rendered with `/` separators regardless of host.

use std::path::{Component, Path, PathBuf};

use crate::error::{FsOpsError, FsOpsResult};

const FILES_DIR: &str = "files";
const STORAGE_PREFIX: &str = "home::";

/// Resolves staging and managed-storage directories for users.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathResolver {
    import_root: PathBuf,
    data_root: PathBuf,
}

impl PathResolver {
    /// Build a resolver over the configured roots.
    #[must_use]
    pub fn new(import_root: impl Into<PathBuf>, data_root: impl Into<PathBuf>) -> Self {
        Self {
            import_root: import_root.into(),
            data_root: data_root.into(),
        }
    }

    /// Compute the layout for `user`.
    ///
    /// # Errors
    ///
    /// Returns [`FsOpsError::InvalidInput`] when the identifier is empty, is a
    /// relative path marker, or contains a separator, since the resulting paths
    /// would escape the configured roots.
    pub fn resolve(&self, user: &str) -> FsOpsResult<UserLayout> {
        validate_user(user)?;
        Ok(UserLayout {
            user: user.to_string(),
            staging_dir: self.import_root.join(user),
            files_dir: self.data_root.join(user).join(FILES_DIR),
        })
    }
}

fn validate_user(user: &str) -> FsOpsResult<()> {
    if user.is_empty() {
        return Err(FsOpsError::invalid("user", "empty", user));
    }
    if user == "." || user == ".." {
        return Err(FsOpsError::invalid("user", "reserved", user));
    }
    if user.contains('/') || user.contains('\\') || user.contains(std::path::MAIN_SEPARATOR) {
        return Err(FsOpsError::invalid("user", "separator", user));
    }
    if user.contains('\0') {
        return Err(FsOpsError::invalid("user", "nul_byte", user));
    }
    Ok(())
}

/// Staging and storage locations for a single user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserLayout {
    /// User identifier.
    pub user: String,
    /// Directory external producers drop files into.
    pub staging_dir: PathBuf,
    /// Root of the user's managed storage tree.
    pub files_dir: PathBuf,
}

impl UserLayout {
    /// Storage identifier the index uses for this user's home storage.
    #[must_use]
    pub fn storage_id(&self) -> String {
        format!("{STORAGE_PREFIX}{}", self.user)
    }

    /// Path handed to the indexing scan for a relocated file.
    #[must_use]
    pub fn scan_path(&self, relative: &Path) -> String {
        format!("{}/{FILES_DIR}/{}", self.user, portable_path(relative))
    }

    /// Path of a relocated file inside the user's storage, as recorded by the index.
    #[must_use]
    pub fn cache_path(&self, relative: &Path) -> String {
        format!("{FILES_DIR}/{}", portable_path(relative))
    }

    /// Final destination of a staged file.
    #[must_use]
    pub fn destination_for(&self, relative: &Path) -> PathBuf {
        self.files_dir.join(relative)
    }
}

/// Render the normal components of `relative` joined with `/`.
///
/// Non-UTF-8 segments are rendered lossily; discovery never hands such paths out.
#[must_use]
pub fn portable_path(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(segment) => Some(segment.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_builds_staging_and_files_dirs() -> FsOpsResult<()> {
        let resolver = PathResolver::new("/srv/import", "/srv/data");
        let layout = resolver.resolve("user1")?;
        assert_eq!(layout.staging_dir, PathBuf::from("/srv/import/user1"));
        assert_eq!(layout.files_dir, PathBuf::from("/srv/data/user1/files"));
        assert_eq!(
            layout.destination_for(Path::new("sub/c.txt")),
            PathBuf::from("/srv/data/user1/files/sub/c.txt")
        );
        Ok(())
    }

    #[test]
    fn index_paths_use_forward_slashes() -> FsOpsResult<()> {
        let layout = PathResolver::new("/i", "/d").resolve("user1")?;
        let relative: PathBuf = ["sub", "deeper", "c.txt"].iter().collect();
        assert_eq!(layout.storage_id(), "home::user1");
        assert_eq!(layout.scan_path(&relative), "user1/files/sub/deeper/c.txt");
        assert_eq!(layout.cache_path(&relative), "files/sub/deeper/c.txt");
        Ok(())
    }

    #[test]
    fn resolve_rejects_escaping_identifiers() {
        let resolver = PathResolver::new("/i", "/d");
        for (user, reason) in [
            ("", "empty"),
            (".", "reserved"),
            ("..", "reserved"),
            ("a/b", "separator"),
            ("a\\b", "separator"),
        ] {
            match resolver.resolve(user) {
                Err(FsOpsError::InvalidInput {
                    field: "user",
                    reason: actual,
                    ..
                }) => assert_eq!(actual, reason, "user {user:?}"),
                other => panic!("unexpected result for {user:?}: {other:?}"),
            }
        }
    }
}
