//! Logging installation.
//!
//! # Design
//! - One subscriber per process: a `fmt` layer (pretty or JSON) under an `EnvFilter`.
//! - `RUST_LOG` wins over the configured level.
//! - The build identifier is stored once and read by the `app` span.

use once_cell::sync::OnceCell;
use tracing_subscriber::{
    EnvFilter, Layer, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::error::{Result, TelemetryError};

/// Level used when neither `RUST_LOG` nor configuration name one.
pub const DEFAULT_LOG_LEVEL: &str = "info";

static BUILD_SHA: OnceCell<String> = OnceCell::new();

/// Output format of the log stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per line, carrying the current span's fields.
    Json,
    /// Human-readable lines for terminals.
    Pretty,
}

impl LogFormat {
    /// Pretty in debug builds, JSON in release builds.
    #[must_use]
    pub const fn infer() -> Self {
        if cfg!(debug_assertions) {
            Self::Pretty
        } else {
            Self::Json
        }
    }

    fn layer(self) -> Box<dyn Layer<Registry> + Send + Sync> {
        match self {
            Self::Json => fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(false)
                .with_target(false)
                .boxed(),
            Self::Pretty => fmt::layer().with_target(false).boxed(),
        }
    }
}

/// Inputs for [`init_logging`].
#[derive(Debug, Clone)]
pub struct LoggingConfig<'a> {
    /// Filter directive used when `RUST_LOG` is unset, e.g. `info` or `intake_import=debug`.
    pub level: &'a str,
    /// Output format.
    pub format: LogFormat,
    /// Build identifier attached to the `app` span.
    pub build_sha: &'a str,
}

impl Default for LoggingConfig<'_> {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL,
            format: LogFormat::infer(),
            build_sha: "dev",
        }
    }
}

/// Install the process-wide subscriber.
///
/// # Errors
///
/// Returns [`TelemetryError::Subscriber`] when a global subscriber is already set.
pub fn init_logging(config: &LoggingConfig<'_>) -> Result<()> {
    let _ = BUILD_SHA.set(config.build_sha.to_string());
    tracing_subscriber::registry()
        .with(config.format.layer())
        .with(env_filter(config.level))
        .try_init()
        .map_err(|source| TelemetryError::Subscriber { source })
}

/// Build identifier recorded by [`init_logging`], `dev` before it runs.
#[must_use]
pub fn build_sha() -> &'static str {
    BUILD_SHA.get().map_or("dev", String::as_str)
}

fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_use_info_and_inferred_format() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, DEFAULT_LOG_LEVEL);
        assert_eq!(config.format, LogFormat::infer());
        assert_eq!(config.build_sha, "dev");
    }

    #[test]
    fn second_installation_is_rejected() {
        let config = LoggingConfig {
            level: "debug",
            format: LogFormat::Json,
            build_sha: "abc123",
        };
        let _ = init_logging(&config);
        assert!(matches!(
            init_logging(&config),
            Err(TelemetryError::Subscriber { .. })
        ));
        assert_eq!(build_sha(), "abc123");
    }
}
