//! Conversation turns against the AI service.

use std::sync::Arc;

use serde::Serialize;

use crate::error::{GatewayError, RegistryError, Result};
use crate::registry::{AskBackend, AskCredentials, AskRequest};
use crate::wallet::WalletAddress;

pub const DEFAULT_LOGIN_PROMPT: &str = "Please connect your wallet to chat with this assistant.";
pub const DEFAULT_FALLBACK_ANSWER: &str =
    "Sorry, I couldn't process your request right now. Please try again.";

/// Whether anonymous callers may chat, and what they see when they may not.
#[derive(Debug, Clone)]
pub struct ChatPolicy {
    pub require_wallet: bool,
    pub login_prompt: String,
}

impl Default for ChatPolicy {
    fn default() -> Self {
        Self {
            require_wallet: true,
            login_prompt: DEFAULT_LOGIN_PROMPT.to_string(),
        }
    }
}

/// One answered turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatTurn {
    pub answer: String,
    /// Thread id to send with the next message.
    pub conversation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<serde_json::Value>,
    /// False when the answer is the local login prompt.
    pub authenticated: bool,
}

/// Stateless sender: the conversation id travels with each call.
#[derive(Clone)]
pub struct ConversationSession {
    backend: Arc<dyn AskBackend>,
    policy: ChatPolicy,
}

impl ConversationSession {
    pub fn new(backend: Arc<dyn AskBackend>, policy: ChatPolicy) -> Self {
        Self { backend, policy }
    }

    /// Send one message.
    ///
    /// Anonymous callers under a wallet-required policy get the login prompt
    /// and the AI service is not contacted. A successful answer must carry a
    /// conversation id.
    #[tracing::instrument(skip_all, fields(continuing = conversation_id.is_some()))]
    pub async fn send(
        &self,
        message: &str,
        conversation_id: Option<&str>,
        caller: Option<&WalletAddress>,
        context_id: Option<&str>,
    ) -> Result<ChatTurn> {
        if message.trim().is_empty() {
            return Err(GatewayError::EmptyMessage);
        }
        let conversation_id = conversation_id
            .map(str::trim)
            .filter(|id| !id.is_empty());

        let credentials = match caller {
            Some(address) => AskCredentials::Wallet {
                address: address.clone(),
                context_id: context_id.map(str::to_string),
            },
            None if self.policy.require_wallet => {
                return Ok(ChatTurn {
                    answer: self.policy.login_prompt.clone(),
                    conversation_id: conversation_id.map(str::to_string),
                    usage: None,
                    authenticated: false,
                });
            }
            None => AskCredentials::ApiKey,
        };
        let authenticated = matches!(credentials, AskCredentials::Wallet { .. });

        let request = AskRequest {
            message: message.to_string(),
            conversation_id: conversation_id.map(str::to_string),
            credentials,
        };
        let response = self.backend.ask(&request).await.map_err(|e| match e {
            RegistryError::InvalidResponse { .. } => GatewayError::Internal(e.to_string()),
            other => GatewayError::UpstreamAskFailed {
                reason: other.to_string(),
            },
        })?;

        let returned_id = response
            .conversation_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| {
                GatewayError::Internal("AI service returned no conversation id".to_string())
            })?;
        if let Some(sent) = conversation_id
            && sent != returned_id
        {
            tracing::debug!(sent, returned = %returned_id, "AI service switched conversation id");
        }

        Ok(ChatTurn {
            answer: response.answer,
            conversation_id: Some(returned_id),
            usage: response.usage,
            authenticated,
        })
    }
}

/// Client-side thread state: remembers the latest conversation id and only
/// advances it on a successful answer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationThread {
    conversation_id: Option<String>,
}

impl ConversationThread {
    pub fn new() -> Self {
        Self::default()
    }

    /// Continue an existing thread. Blank ids start a new one.
    pub fn resume(conversation_id: Option<&str>) -> Self {
        Self {
            conversation_id: conversation_id
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string),
        }
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    pub async fn send(
        &mut self,
        session: &ConversationSession,
        message: &str,
        caller: Option<&WalletAddress>,
        context_id: Option<&str>,
    ) -> Result<ChatTurn> {
        let turn = session
            .send(message, self.conversation_id(), caller, context_id)
            .await?;
        if let Some(id) = &turn.conversation_id {
            self.conversation_id = Some(id.clone());
        }
        Ok(turn)
    }
}
