//! Configuration for the gateway.
//!
//! Settings are loaded with priority: env var > TOML config file > default.
//! Upstream credentials usually live in `~/.ouf/.env` (loaded via dotenvy
//! early in startup).

pub(crate) mod helpers;
mod server;
mod upstream;

use std::path::Path;

use crate::error::ConfigError;
use crate::settings::Settings;

pub use self::server::{LogFormat, ServerConfig};
pub use self::upstream::{AuthConfig, ChatConfig, RegistryConfig};

/// Main configuration for the gateway.
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub registry: RegistryConfig,
    pub chat: ChatConfig,
    pub auth: AuthConfig,
}

impl Config {
    /// Load configuration from env files, env vars and the optional TOML file.
    ///
    /// Loads both `./.env` (standard, higher priority) and `~/.ouf/.env`
    /// (lower priority) via dotenvy, which never overwrites existing vars.
    pub fn from_env_with_toml(toml_path: Option<&Path>) -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        crate::bootstrap::load_ouf_env();
        let settings = Self::load_settings(toml_path)?;
        Self::build(&settings)
    }

    /// Load the TOML config file.
    ///
    /// If `explicit_path` is `Some`, loads from that path (errors are fatal).
    /// If `None`, tries the default path `~/.ouf/config.toml` (missing or
    /// broken default file falls back to defaults).
    fn load_settings(explicit_path: Option<&Path>) -> Result<Settings, ConfigError> {
        let path = explicit_path
            .map(Path::to_path_buf)
            .unwrap_or_else(Settings::default_toml_path);

        match Settings::load_toml(&path) {
            Ok(Some(settings)) => {
                tracing::debug!("Loaded TOML config from {}", path.display());
                Ok(settings)
            }
            Ok(None) => {
                if explicit_path.is_some() {
                    return Err(ConfigError::ParseError(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
                Ok(Settings::default())
            }
            Err(e) => {
                if explicit_path.is_some() {
                    return Err(ConfigError::ParseError(format!(
                        "Failed to load config file {}: {}",
                        path.display(),
                        e
                    )));
                }
                tracing::warn!("Failed to load default config file: {}", e);
                Ok(Settings::default())
            }
        }
    }

    /// Resolve every section against env vars, falling back to `settings`.
    pub fn build(settings: &Settings) -> Result<Self, ConfigError> {
        let registry = RegistryConfig::resolve(settings)?;
        Ok(Self {
            server: ServerConfig::resolve(settings)?,
            chat: ChatConfig::resolve(settings, &registry)?,
            auth: AuthConfig::resolve(settings)?,
            registry,
        })
    }
}
