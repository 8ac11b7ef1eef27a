use std::time::Duration;

use secrecy::SecretString;

use crate::config::helpers::{optional_env, parse_bool_env, timeout_from, validate_base_url};
use crate::conversation::{DEFAULT_FALLBACK_ANSWER, DEFAULT_LOGIN_PROMPT};
use crate::error::ConfigError;
use crate::settings::Settings;

/// Assistant registry connection.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub base_url: String,
    /// Sent as `x-api-key` when creating assistants.
    pub api_key: Option<SecretString>,
    pub timeout: Duration,
}

impl RegistryConfig {
    pub(crate) fn resolve(settings: &Settings) -> Result<Self, ConfigError> {
        let raw_url = optional_env("REGISTRY_API_URL")?
            .or_else(|| settings.registry.base_url.clone())
            .ok_or_else(|| ConfigError::MissingRequired {
                key: "REGISTRY_API_URL".to_string(),
                hint: "Set REGISTRY_API_URL or [registry].base_url in ~/.ouf/config.toml"
                    .to_string(),
            })?;

        Ok(Self {
            base_url: validate_base_url("REGISTRY_API_URL", &raw_url)?,
            api_key: optional_env("REGISTRY_API_KEY")?
                .or_else(|| {
                    settings
                        .registry
                        .api_key
                        .as_deref()
                        .map(str::trim)
                        .filter(|k| !k.is_empty())
                        .map(str::to_string)
                })
                .map(SecretString::from),
            timeout: timeout_from("REGISTRY_TIMEOUT_MS", settings.registry.timeout_ms)?,
        })
    }
}

/// AI question-answering service and chat policy.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub require_wallet: bool,
    pub login_prompt: String,
    pub fallback_answer: String,
}

impl ChatConfig {
    pub(crate) fn resolve(settings: &Settings, registry: &RegistryConfig) -> Result<Self, ConfigError> {
        let base_url = match optional_env("ASK_API_URL")?.or_else(|| settings.chat.base_url.clone())
        {
            Some(raw) => validate_base_url("ASK_API_URL", &raw)?,
            None => registry.base_url.clone(),
        };

        Ok(Self {
            base_url,
            timeout: timeout_from("ASK_TIMEOUT_MS", settings.chat.timeout_ms)?,
            require_wallet: parse_bool_env("CHAT_REQUIRE_WALLET")?
                .unwrap_or(settings.chat.require_wallet),
            login_prompt: optional_env("CHAT_LOGIN_PROMPT")?
                .or_else(|| settings.chat.login_prompt.clone())
                .unwrap_or_else(|| DEFAULT_LOGIN_PROMPT.to_string()),
            fallback_answer: optional_env("CHAT_FALLBACK_ANSWER")?
                .or_else(|| settings.chat.fallback_answer.clone())
                .unwrap_or_else(|| DEFAULT_FALLBACK_ANSWER.to_string()),
        })
    }
}

/// Wallet challenge options.
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    pub local_signature_check: bool,
}

impl AuthConfig {
    pub(crate) fn resolve(settings: &Settings) -> Result<Self, ConfigError> {
        Ok(Self {
            local_signature_check: parse_bool_env("AUTH_LOCAL_SIGNATURE_CHECK")?
                .unwrap_or(settings.auth.local_signature_check),
        })
    }
}
