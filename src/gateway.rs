//! Composition root tying the directory, auth, files and chat together
//! behind admin and session checks.

use std::sync::Arc;

use secrecy::SecretString;
use serde::Serialize;

use crate::auth::{AuthOutcome, WalletAuth};
use crate::config::Config;
use crate::conversation::{ChatPolicy, ChatTurn, ConversationSession, ConversationThread};
use crate::directory::AssistantDirectory;
use crate::error::{GatewayError, Result};
use crate::files::{ContextFile, ContextFileManager, ContextUpload};
use crate::registry::{
    AskBackend, Assistant, AssistantRegistry, HttpAskBackend, HttpRegistry, NewAssistant,
};
use crate::wallet::WalletAddress;

/// Per-request identity derived from the caller's wallet header.
///
/// The `x-wallet-address` header is trusted as sent. Nothing ties it to a
/// completed challenge/verify exchange, so any client can claim any address.
/// Verified sessions (a signed token issued by `complete_auth`) would be
/// checked where this value is built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    address: Option<WalletAddress>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with_address(address: WalletAddress) -> Self {
        Self {
            address: Some(address),
        }
    }

    /// Build from a raw header value. Missing or blank means anonymous;
    /// anything else must normalize.
    pub fn from_header(raw: Option<&str>) -> Result<Self> {
        match raw.map(str::trim).filter(|v| !v.is_empty()) {
            Some(value) => Ok(Self::with_address(WalletAddress::parse(value)?)),
            None => Ok(Self::anonymous()),
        }
    }

    pub fn address(&self) -> Option<&WalletAddress> {
        self.address.as_ref()
    }

    fn require_address(&self) -> Result<&WalletAddress> {
        self.address.as_ref().ok_or(GatewayError::Unauthenticated)
    }
}

/// True iff `caller` is present and equals the assistant's admin after
/// normalization. Unparseable or missing admin addresses match nobody.
pub fn is_admin(caller: Option<&WalletAddress>, assistant: &Assistant) -> bool {
    let Some(caller) = caller else {
        return false;
    };
    assistant
        .admin_address
        .as_deref()
        .and_then(|raw| WalletAddress::parse(raw).ok())
        .is_some_and(|admin| admin == *caller)
}

/// Presentation view of an assistant for one caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssistantView {
    pub slug: String,
    pub name: String,
    pub intro_phrase: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dao_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dao_network: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_address: Option<String>,
    pub is_admin: bool,
}

impl AssistantView {
    pub fn for_caller(assistant: &Assistant, caller: Option<&WalletAddress>) -> Self {
        let admin_address = assistant
            .admin_address
            .as_deref()
            .map(|raw| match WalletAddress::parse(raw) {
                Ok(addr) => addr.to_string(),
                Err(_) => raw.to_string(),
            });
        Self {
            slug: assistant.slug.clone(),
            name: assistant.display_name(),
            intro_phrase: assistant.intro_or_default(),
            context_id: assistant.context_id().map(str::to_string),
            dao_address: assistant.dao_address.clone(),
            dao_network: assistant.dao_network.clone(),
            admin_address,
            is_admin: is_admin(caller, assistant),
        }
    }
}

/// Options that shape gateway behavior beyond the upstream clients.
#[derive(Debug, Clone, Default)]
pub struct GatewayOptions {
    pub local_signature_check: bool,
    pub chat: ChatPolicy,
}

/// Every gateway operation. Holds no per-caller state.
#[derive(Clone)]
pub struct AssistantGateway {
    directory: AssistantDirectory,
    auth: WalletAuth,
    files: ContextFileManager,
    conversation: ConversationSession,
}

impl AssistantGateway {
    pub fn new(
        registry: Arc<dyn AssistantRegistry>,
        ask: Arc<dyn AskBackend>,
        options: GatewayOptions,
    ) -> Self {
        Self {
            directory: AssistantDirectory::new(registry.clone()),
            auth: WalletAuth::new(registry.clone(), options.local_signature_check),
            files: ContextFileManager::new(registry),
            conversation: ConversationSession::new(ask, options.chat),
        }
    }

    /// Wire the HTTP registry and AI clients from configuration.
    pub fn from_config(config: &Config) -> Self {
        let api_key: Option<SecretString> = config.registry.api_key.clone();
        let registry = Arc::new(HttpRegistry::new(&config.registry));
        let ask = Arc::new(HttpAskBackend::new(&config.chat, api_key));
        Self::new(
            registry,
            ask,
            GatewayOptions {
                local_signature_check: config.auth.local_signature_check,
                chat: ChatPolicy {
                    require_wallet: config.chat.require_wallet,
                    login_prompt: config.chat.login_prompt.clone(),
                },
            },
        )
    }

    pub async fn list_assistants(&self, session: &Session) -> Result<Vec<AssistantView>> {
        let assistants = self.directory.list_assistants().await?;
        Ok(assistants
            .iter()
            .map(|a| AssistantView::for_caller(a, session.address()))
            .collect())
    }

    pub async fn resolve_assistant(&self, slug: &str, session: &Session) -> Result<AssistantView> {
        let assistant = self.directory.resolve_by_slug(slug).await?;
        Ok(AssistantView::for_caller(&assistant, session.address()))
    }

    pub async fn create_assistant(
        &self,
        draft: &NewAssistant,
        session: &Session,
    ) -> Result<AssistantView> {
        let created = self
            .directory
            .create_assistant(draft, session.address())
            .await?;
        Ok(AssistantView::for_caller(&created, session.address()))
    }

    pub async fn begin_auth(&self, raw_address: &str) -> Result<String> {
        let address = WalletAddress::parse(raw_address)?;
        self.auth.begin_challenge(&address).await
    }

    pub async fn complete_auth(
        &self,
        raw_address: &str,
        message: &str,
        signature: &str,
    ) -> Result<AuthOutcome> {
        let address = WalletAddress::parse(raw_address)?;
        self.auth
            .complete_challenge(&address, message, signature)
            .await
    }

    /// Knowledge files for an assistant. Admin only.
    pub async fn list_files(&self, slug: &str, session: &Session) -> Result<Vec<ContextFile>> {
        let (assistant, caller) = self.authorize_admin(slug, session).await?;
        self.files
            .list_files(assistant.context_id(), Some(caller))
            .await
    }

    /// Upload a validated markdown file, then return the refreshed list.
    pub async fn upload_file(
        &self,
        slug: &str,
        session: &Session,
        upload: &ContextUpload,
    ) -> Result<Vec<ContextFile>> {
        let (assistant, caller) = self.authorize_admin(slug, session).await?;
        let context_id = require_context(&assistant)?;
        self.files.upload_file(context_id, caller, upload).await?;
        self.files.list_files(Some(context_id), Some(caller)).await
    }

    /// Delete a file by name, then return the refreshed list.
    pub async fn delete_file(
        &self,
        slug: &str,
        session: &Session,
        filename: &str,
    ) -> Result<Vec<ContextFile>> {
        let (assistant, caller) = self.authorize_admin(slug, session).await?;
        let context_id = require_context(&assistant)?;
        self.files.delete_file(context_id, caller, filename).await?;
        self.files.list_files(Some(context_id), Some(caller)).await
    }

    /// One chat turn with the assistant behind `slug`.
    pub async fn send_chat(
        &self,
        slug: &str,
        session: &Session,
        message: &str,
        conversation_id: Option<&str>,
    ) -> Result<ChatTurn> {
        if message.trim().is_empty() {
            return Err(GatewayError::EmptyMessage);
        }
        let assistant = self.directory.resolve_by_slug(slug).await?;
        let mut thread = ConversationThread::resume(conversation_id);
        thread
            .send(
                &self.conversation,
                message,
                session.address(),
                assistant.context_id(),
            )
            .await
    }

    /// Resolve the slug and require the session wallet to be its admin.
    /// Nothing downstream runs unless this succeeds.
    async fn authorize_admin<'s>(
        &self,
        slug: &str,
        session: &'s Session,
    ) -> Result<(Assistant, &'s WalletAddress)> {
        let caller = session.require_address()?;
        let assistant = self.directory.resolve_by_slug(slug).await?;
        if !is_admin(Some(caller), &assistant) {
            tracing::warn!(slug, caller = %caller, "Rejected non-admin file access");
            return Err(GatewayError::Unauthorized {
                slug: slug.to_string(),
                caller: caller.to_string(),
            });
        }
        Ok((assistant, caller))
    }
}

fn require_context(assistant: &Assistant) -> Result<&str> {
    assistant.context_id().ok_or_else(|| GatewayError::NotFound {
        entity: "context",
        id: assistant.slug.clone(),
    })
}
