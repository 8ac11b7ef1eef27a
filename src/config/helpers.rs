use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

/// Read an env var, treating unset and blank values the same.
pub(crate) fn optional_env(key: &str) -> Result<Option<String>, ConfigError> {
    match std::env::var(key) {
        Ok(val) if val.trim().is_empty() => Ok(None),
        Ok(val) => Ok(Some(val.trim().to_string())),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("failed to read {key}: {e}"),
        }),
    }
}

/// Parse an optional env var with `FromStr`.
pub(crate) fn parse_optional_env<T>(key: &str, expected: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    optional_env(key)?
        .map(|s| s.parse::<T>())
        .transpose()
        .map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("must be {expected}: {e}"),
        })
}

/// Parse a boolean env var. Accepts true/false, 1/0, yes/no.
pub(crate) fn parse_bool_env(key: &str) -> Result<Option<bool>, ConfigError> {
    let Some(raw) = optional_env(key)? else {
        return Ok(None);
    };
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(Some(true)),
        "false" | "0" | "no" | "off" => Ok(Some(false)),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("must be true or false, got '{raw}'"),
        }),
    }
}

/// Resolve a millisecond timeout: env var > settings value. Zero is rejected.
pub(crate) fn timeout_from(key: &str, settings_ms: u64) -> Result<Duration, ConfigError> {
    let ms = parse_optional_env::<u64>(key, "a positive integer")?.unwrap_or(settings_ms);
    if ms == 0 {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: "must be > 0".to_string(),
        });
    }
    Ok(Duration::from_millis(ms))
}

/// Validate an http(s) base URL and strip any trailing slash.
pub(crate) fn validate_base_url(key: &str, raw: &str) -> Result<String, ConfigError> {
    let parsed = url::Url::parse(raw).map_err(|e| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("must be a valid URL: {e}"),
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("unsupported scheme '{}'", parsed.scheme()),
        });
    }
    Ok(raw.trim_end_matches('/').to_string())
}

/// Split a comma-separated list, dropping blanks.
pub(crate) fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
