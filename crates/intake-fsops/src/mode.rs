//! Permission normalisation shared by directory creation and relocation.

use std::path::Path;

use crate::error::FsOpsResult;

#[cfg(unix)]
pub(crate) fn apply_mode(path: &Path, mode: u32, operation: &'static str) -> FsOpsResult<()> {
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    use crate::error::FsOpsError;

    fs::set_permissions(path, fs::Permissions::from_mode(mode))
        .map_err(|source| FsOpsError::io(operation, path, source))
}

#[cfg(not(unix))]
#[allow(clippy::unnecessary_wraps)]
pub(crate) fn apply_mode(path: &Path, mode: u32, operation: &'static str) -> FsOpsResult<()> {
    tracing::debug!(
        operation,
        path = %path.display(),
        mode = format_args!("{mode:o}"),
        "permission modes are not supported on this platform; skipping"
    );
    Ok(())
}
