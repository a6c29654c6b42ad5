//! Parsing and validation helpers for raw environment values.

use std::time::Duration;

use crate::defaults::MIN_POLL_INTERVAL_SECS;
use crate::error::{ConfigError, ConfigResult};
use crate::model::{ImportConfig, LogFormatSetting};

/// Largest permission mode accepted for `chmod`.
const MAX_MODE: u32 = 0o7777;

/// Parse an octal permission mode such as `755` or `0o644`.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] when the value is not octal or exceeds `0o7777`.
pub fn parse_octal_mode(field: &'static str, value: &str) -> ConfigResult<u32> {
    let trimmed = value.trim();
    let digits = trimmed.trim_start_matches("0o");
    let mode = u32::from_str_radix(digits, 8)
        .map_err(|_| ConfigError::invalid(field, "invalid_octal", value))?;
    if mode > MAX_MODE {
        return Err(ConfigError::invalid(field, "out_of_range", value));
    }
    Ok(mode)
}

/// Parse a whole number of seconds that must be at least `minimum`.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] for non-numeric input or values below `minimum`.
pub fn parse_seconds(field: &'static str, value: &str, minimum: u64) -> ConfigResult<Duration> {
    let secs = value
        .trim()
        .parse::<u64>()
        .map_err(|_| ConfigError::invalid(field, "not_an_integer", value))?;
    if secs < minimum {
        return Err(ConfigError::invalid(field, "below_minimum", value));
    }
    Ok(Duration::from_secs(secs))
}

/// Parse the polling bound; `0` lifts the bound.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] for non-numeric input.
pub fn parse_max_polls(field: &'static str, value: &str) -> ConfigResult<Option<u32>> {
    let polls = value
        .trim()
        .parse::<u32>()
        .map_err(|_| ConfigError::invalid(field, "not_an_integer", value))?;
    Ok((polls > 0).then_some(polls))
}

/// Parse a log format name.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] for anything other than `json` or `pretty`.
pub fn parse_log_format(field: &'static str, value: &str) -> ConfigResult<LogFormatSetting> {
    match value.trim().to_ascii_lowercase().as_str() {
        "json" => Ok(LogFormatSetting::Json),
        "pretty" => Ok(LogFormatSetting::Pretty),
        _ => Err(ConfigError::invalid(field, "unknown_format", value)),
    }
}

/// Ensure a table prefix only contains characters safe to splice into SQL.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] when the prefix contains anything other
/// than ASCII alphanumerics and underscores.
pub fn validate_table_prefix(field: &'static str, value: &str) -> ConfigResult<()> {
    if value
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
    {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, "invalid_identifier", value))
    }
}

/// Cross-field checks applied after every setting has been parsed.
///
/// # Errors
///
/// Returns the first violated constraint.
pub fn validate(config: &ImportConfig) -> ConfigResult<()> {
    if config.is_enabled() && config.data_root.as_os_str().is_empty() {
        return Err(ConfigError::MissingField {
            field: "INTAKE_DATA_ROOT",
        });
    }
    if config.poll_interval < Duration::from_secs(MIN_POLL_INTERVAL_SECS) {
        return Err(ConfigError::invalid(
            "INTAKE_POLL_INTERVAL_SECS",
            "below_minimum",
            &config.poll_interval.as_secs().to_string(),
        ));
    }
    validate_table_prefix("INTAKE_TABLE_PREFIX", &config.table_prefix)?;
    if config.preview_app.trim().is_empty() {
        return Err(ConfigError::invalid("INTAKE_PREVIEW_APP", "empty", ""));
    }
    if config.scan.program.trim().is_empty() {
        return Err(ConfigError::invalid("INTAKE_SCAN_PROGRAM", "empty", ""));
    }
    if config.telemetry.log_level.trim().is_empty() {
        return Err(ConfigError::invalid("INTAKE_LOG_LEVEL", "empty", ""));
    }
    Ok(())
}
