//! File-backed gateway settings.
//!
//! Stored in `~/.ouf/config.toml` (or a path passed with `--config`).
//! Settings are resolved with env var > config.toml > default priority.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Settings loaded from the TOML config file.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Settings {
    #[serde(default)]
    pub gateway: GatewaySettings,

    #[serde(default)]
    pub registry: RegistrySettings,

    #[serde(default)]
    pub chat: ChatSettings,

    #[serde(default)]
    pub auth: AuthSettings,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GatewaySettings {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Allowed CORS origins. Empty means same-origin only.
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Request body limit in bytes (uploads included).
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// Log output format: "pretty" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_max_body_bytes() -> usize {
    5 * 1024 * 1024
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
            max_body_bytes: default_max_body_bytes(),
            log_format: default_log_format(),
        }
    }
}

/// Upstream assistant registry settings.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct RegistrySettings {
    #[serde(default)]
    pub base_url: Option<String>,

    /// Sent as `x-api-key`. `REGISTRY_API_KEY` takes precedence. Never
    /// written back out.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    #[serde(default = "default_registry_timeout_ms")]
    pub timeout_ms: u64,
}

impl std::fmt::Debug for RegistrySettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrySettings")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

fn default_registry_timeout_ms() -> u64 {
    30_000
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            timeout_ms: default_registry_timeout_ms(),
        }
    }
}

/// Conversation settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatSettings {
    /// AI service base URL. Falls back to the registry URL.
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default = "default_ask_timeout_ms")]
    pub timeout_ms: u64,

    /// When true, anonymous callers get the login prompt instead of an answer.
    #[serde(default = "default_true")]
    pub require_wallet: bool,

    #[serde(default)]
    pub login_prompt: Option<String>,

    #[serde(default)]
    pub fallback_answer: Option<String>,
}

fn default_ask_timeout_ms() -> u64 {
    120_000
}

fn default_true() -> bool {
    true
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_ms: default_ask_timeout_ms(),
            require_wallet: true,
            login_prompt: None,
            fallback_answer: None,
        }
    }
}

/// Wallet challenge settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct AuthSettings {
    /// Recover the signer locally before asking the registry to verify.
    #[serde(default)]
    pub local_signature_check: bool,
}

impl Settings {
    /// Default TOML config file path (~/.ouf/config.toml).
    pub fn default_toml_path() -> PathBuf {
        crate::bootstrap::ouf_dir().join("config.toml")
    }

    /// Load settings from a TOML file.
    ///
    /// Returns `None` if the file doesn't exist. Returns an error only
    /// if the file exists but can't be parsed.
    pub fn load_toml(path: &Path) -> Result<Option<Self>, String> {
        let data = match std::fs::read_to_string(path) {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(format!("failed to read {}: {}", path.display(), e)),
        };

        let settings: Self = toml::from_str(&data)
            .map_err(|e| format!("invalid TOML in {}: {}", path.display(), e))?;
        Ok(Some(settings))
    }
}
