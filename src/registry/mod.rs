//! Upstream assistant registry and AI question-answering service.
//!
//! The registry is the source of truth for assistants, challenge messages,
//! signature verification, and knowledge files. The gateway talks to it
//! through [`AssistantRegistry`] and to the AI service through
//! [`AskBackend`], so both can be swapped for in-memory fakes in tests.

mod http;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::RegistryError;
use crate::wallet::WalletAddress;

pub use http::{HttpAskBackend, HttpRegistry};

/// An assistant record as stored by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assistant {
    pub slug: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub intro_phrase: Option<String>,

    /// Opaque handle for the assistant's knowledge store.
    #[serde(default)]
    pub context_id: Option<String>,

    #[serde(default)]
    pub dao_address: Option<String>,

    #[serde(default)]
    pub dao_network: Option<String>,

    /// Raw admin address as the registry stores it. Compare through
    /// [`WalletAddress`] normalization, never as a plain string.
    #[serde(default)]
    pub admin_address: Option<String>,
}

impl Assistant {
    /// Display name, falling back to the slug with dashes as spaces.
    pub fn display_name(&self) -> String {
        non_blank(self.name.as_deref())
            .map(str::to_string)
            .unwrap_or_else(|| self.slug.replace('-', " "))
    }

    /// Greeting shown before the first message.
    pub fn intro_or_default(&self) -> String {
        non_blank(self.intro_phrase.as_deref())
            .map(str::to_string)
            .unwrap_or_else(|| format!("Hello! I'm {}. How can I help you today?", self.slug))
    }

    pub fn context_id(&self) -> Option<&str> {
        non_blank(self.context_id.as_deref())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Fields a caller supplies when creating an assistant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NewAssistant {
    pub slug: String,
    #[serde(default, alias = "assistantName", alias = "assistant_name")]
    pub name: Option<String>,
    #[serde(default, alias = "introPhrase")]
    pub intro_phrase: Option<String>,
    #[serde(default, alias = "daoAddress")]
    pub dao_address: Option<String>,
    #[serde(default, alias = "daoNetwork")]
    pub dao_network: Option<String>,
}

/// Registry create payload. The requesting wallet becomes the admin.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAssistantRequest {
    pub wallet_address: WalletAddress,
    pub slug: String,
    pub assistant_name: String,
    pub intro_phrase: String,
    pub dao_address: String,
    pub dao_network: String,
}

impl CreateAssistantRequest {
    pub fn new(admin: WalletAddress, fields: &NewAssistant) -> Self {
        Self {
            wallet_address: admin,
            slug: fields.slug.clone(),
            assistant_name: fields.name.clone().unwrap_or_default(),
            intro_phrase: fields.intro_phrase.clone().unwrap_or_default(),
            dao_address: fields.dao_address.clone().unwrap_or_default(),
            dao_network: fields.dao_network.clone().unwrap_or_default(),
        }
    }
}

/// Registry verdict on a signed challenge.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VerifyOutcome {
    pub verified: bool,
    /// Address the registry recovered, when it reports one.
    #[serde(default)]
    pub address: Option<String>,
}

/// A markdown document queued for upload to a context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub filename: String,
    pub content: Bytes,
}

/// Which credentials the AI service call carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AskCredentials {
    /// Wallet-scoped call: `x-wallet-address` plus `x-context-id`.
    Wallet {
        address: WalletAddress,
        context_id: Option<String>,
    },
    /// Unauthenticated variant: service API key only.
    ApiKey,
}

/// One question to the AI service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AskRequest {
    pub message: String,
    pub conversation_id: Option<String>,
    pub credentials: AskCredentials,
}

/// AI service answer.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AskResponse {
    pub answer: String,
    #[serde(default)]
    pub conversation_id: Option<String>,
    /// Usage/cost telemetry, passed through untouched.
    #[serde(default)]
    pub usage: Option<serde_json::Value>,
}

/// Remote assistant registry.
#[async_trait]
pub trait AssistantRegistry: Send + Sync {
    /// Full snapshot of every assistant.
    async fn list_assistants(&self) -> Result<Vec<Assistant>, RegistryError>;

    async fn create_assistant(&self, request: &CreateAssistantRequest) -> Result<(), RegistryError>;

    /// Challenge text the wallet must sign.
    async fn auth_message(&self, address: &WalletAddress) -> Result<String, RegistryError>;

    async fn auth_verify(
        &self,
        address: &WalletAddress,
        message: &str,
        signature: &str,
    ) -> Result<VerifyOutcome, RegistryError>;

    async fn list_files(
        &self,
        context_id: &str,
        caller: &WalletAddress,
    ) -> Result<Vec<String>, RegistryError>;

    async fn add_context(
        &self,
        context_id: &str,
        caller: &WalletAddress,
        file: &FileUpload,
    ) -> Result<(), RegistryError>;

    async fn delete_context(
        &self,
        context_id: &str,
        caller: &WalletAddress,
        filename: &str,
    ) -> Result<(), RegistryError>;
}

/// Remote AI question-answering service.
#[async_trait]
pub trait AskBackend: Send + Sync {
    async fn ask(&self, request: &AskRequest) -> Result<AskResponse, RegistryError>;
}
