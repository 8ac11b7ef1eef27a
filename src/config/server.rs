use std::net::SocketAddr;

use crate::config::helpers::{optional_env, parse_optional_env, split_list};
use crate::error::ConfigError;
use crate::settings::Settings;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    fn parse(value: &str, key: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("must be 'pretty' or 'json', got '{other}'"),
            }),
        }
    }

    /// Resolve from `GATEWAY_LOG_FORMAT` alone, for when the full config
    /// failed to load. Unknown values fall back to pretty output.
    pub fn from_env() -> Self {
        optional_env("GATEWAY_LOG_FORMAT")
            .ok()
            .flatten()
            .and_then(|v| Self::parse(&v, "GATEWAY_LOG_FORMAT").ok())
            .unwrap_or(Self::Pretty)
    }
}

/// HTTP listener configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub max_body_bytes: usize,
    pub log_format: LogFormat,
}

impl ServerConfig {
    pub(crate) fn resolve(settings: &Settings) -> Result<Self, ConfigError> {
        let host = optional_env("GATEWAY_HOST")?.unwrap_or_else(|| settings.gateway.host.clone());
        let port = parse_optional_env::<u16>("GATEWAY_PORT", "a valid port number")?
            .unwrap_or(settings.gateway.port);

        let cors_origins = optional_env("GATEWAY_CORS_ORIGINS")?
            .map(|raw| split_list(&raw))
            .unwrap_or_else(|| settings.gateway.cors_origins.clone());
        for origin in cors_origins.iter().filter(|o| o.as_str() != "*") {
            url::Url::parse(origin).map_err(|e| ConfigError::InvalidValue {
                key: "GATEWAY_CORS_ORIGINS".to_string(),
                message: format!("'{origin}' is not a valid origin: {e}"),
            })?;
        }

        let max_body_bytes =
            parse_optional_env::<usize>("GATEWAY_MAX_BODY_BYTES", "a positive integer")?
                .unwrap_or(settings.gateway.max_body_bytes);
        if max_body_bytes == 0 {
            return Err(ConfigError::InvalidValue {
                key: "GATEWAY_MAX_BODY_BYTES".to_string(),
                message: "must be > 0".to_string(),
            });
        }

        let log_format = LogFormat::parse(
            &optional_env("GATEWAY_LOG_FORMAT")?
                .unwrap_or_else(|| settings.gateway.log_format.clone()),
            "GATEWAY_LOG_FORMAT",
        )?;

        Ok(Self {
            host,
            port,
            cors_origins,
            max_body_bytes,
            log_format,
        })
    }

    /// Listener address built from host and port.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| ConfigError::InvalidValue {
                key: "GATEWAY_HOST".to_string(),
                message: format!("'{}' is not a valid listen address: {e}", self.host),
            })
    }
}
