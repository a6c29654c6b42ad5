//! Telemetry failures.
//!
//! `Display` is hand-written so messages stay constant; the metric name,
//! export path, and failing step travel as fields.

use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::io;
use std::path::PathBuf;
use std::string::FromUtf8Error;

use prometheus::Error as PrometheusError;
use tracing_subscriber::util::TryInitError;

/// Result alias for telemetry operations.
pub type Result<T> = std::result::Result<T, TelemetryError>;

/// Errors raised while installing logging or exporting metrics.
#[derive(Debug)]
pub enum TelemetryError {
    /// A global subscriber was already installed or could not be set.
    Subscriber {
        /// Underlying installation error.
        source: TryInitError,
    },
    /// A collector could not be built or registered.
    Collector {
        /// Step that failed (`metrics.build` or `metrics.register`).
        operation: &'static str,
        /// Metric family name.
        metric: &'static str,
        /// Underlying Prometheus error.
        source: PrometheusError,
    },
    /// The text exposition could not be encoded.
    Render {
        /// Underlying Prometheus error.
        source: PrometheusError,
    },
    /// The encoder produced bytes that are not UTF-8.
    RenderEncoding {
        /// Underlying conversion error.
        source: FromUtf8Error,
    },
    /// The textfile could not be written or moved into place.
    Export {
        /// Step that failed (`textfile.write` or `textfile.rename`).
        operation: &'static str,
        /// File the step targeted.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
}

impl TelemetryError {
    pub(crate) const fn collector(
        operation: &'static str,
        metric: &'static str,
        source: PrometheusError,
    ) -> Self {
        Self::Collector {
            operation,
            metric,
            source,
        }
    }

    pub(crate) const fn export(operation: &'static str, path: PathBuf, source: io::Error) -> Self {
        Self::Export {
            operation,
            path,
            source,
        }
    }
}

impl Display for TelemetryError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        let message = match self {
            Self::Subscriber { .. } => "logging setup failed",
            Self::Collector { .. } => "metrics collector setup failed",
            Self::Render { .. } => "metrics rendering failed",
            Self::RenderEncoding { .. } => "metrics rendering produced invalid utf-8",
            Self::Export { .. } => "metrics export failed",
        };
        formatter.write_str(message)
    }
}

impl Error for TelemetryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Subscriber { source } => Some(source),
            Self::Collector { source, .. } | Self::Render { source } => Some(source),
            Self::RenderEncoding { source } => Some(source),
            Self::Export { source, .. } => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_constant_and_sources_preserved() -> std::result::Result<(), Box<dyn Error>> {
        let Err(encoding) = String::from_utf8(vec![0xff, 0xfe]) else {
            return Err(io::Error::other("expected invalid utf-8").into());
        };
        let cases = [
            (
                TelemetryError::collector(
                    "metrics.register",
                    "intake_polls_total",
                    PrometheusError::AlreadyReg,
                ),
                "metrics collector setup failed",
            ),
            (
                TelemetryError::Render {
                    source: PrometheusError::Msg("encode".to_string()),
                },
                "metrics rendering failed",
            ),
            (
                TelemetryError::RenderEncoding { source: encoding },
                "metrics rendering produced invalid utf-8",
            ),
            (
                TelemetryError::export(
                    "textfile.rename",
                    PathBuf::from("/var/lib/node_exporter/intake.prom"),
                    io::Error::from(io::ErrorKind::PermissionDenied),
                ),
                "metrics export failed",
            ),
        ];

        for (err, message) in cases {
            assert_eq!(err.to_string(), message);
            assert!(err.source().is_some());
        }
        Ok(())
    }

    #[test]
    fn export_errors_keep_the_failing_step() {
        let err = TelemetryError::export(
            "textfile.write",
            PathBuf::from("intake.prom.tmp"),
            io::Error::other("disk full"),
        );
        assert!(matches!(
            err,
            TelemetryError::Export {
                operation: "textfile.write",
                ..
            }
        ));
    }
}
