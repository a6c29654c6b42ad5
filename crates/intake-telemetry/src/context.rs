//! Process-wide `app` span.

use tracing::span::EnteredSpan;

use crate::init::build_sha;

/// Keeps the `app` span (`mode`, `build_sha`) entered until dropped.
pub struct GlobalContextGuard {
    _span: EnteredSpan,
}

impl GlobalContextGuard {
    /// Enter the `app` span for `mode` (`daemon` or `once`).
    #[must_use]
    pub fn new(mode: &str) -> Self {
        let span = tracing::info_span!("app", mode = %mode, build_sha = %build_sha());
        Self {
            _span: span.entered(),
        }
    }
}
