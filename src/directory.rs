//! Assistant discovery and creation.

use std::sync::Arc;

use crate::error::{GatewayError, Result};
use crate::registry::{Assistant, AssistantRegistry, CreateAssistantRequest, NewAssistant};
use crate::wallet::WalletAddress;

/// Read-through view of the registry's assistant list.
///
/// Every call fetches a fresh snapshot; nothing is cached across requests.
#[derive(Clone)]
pub struct AssistantDirectory {
    registry: Arc<dyn AssistantRegistry>,
}

impl AssistantDirectory {
    pub fn new(registry: Arc<dyn AssistantRegistry>) -> Self {
        Self { registry }
    }

    pub async fn list_assistants(&self) -> Result<Vec<Assistant>> {
        Ok(self.registry.list_assistants().await?)
    }

    /// Find the assistant with exactly this slug in a fresh snapshot.
    #[tracing::instrument(skip(self))]
    pub async fn resolve_by_slug(&self, slug: &str) -> Result<Assistant> {
        self.list_assistants()
            .await?
            .into_iter()
            .find(|a| a.slug == slug)
            .ok_or_else(|| GatewayError::NotFound {
                entity: "assistant",
                id: slug.to_string(),
            })
    }

    /// Create an assistant owned by `requester`.
    ///
    /// A taken slug is reported as `DuplicateSlug` whether or not a wallet is
    /// connected. No write happens unless both checks pass.
    ///
    /// The duplicate check runs against a snapshot, so two concurrent creates
    /// can both pass it; the registry stays authoritative for uniqueness.
    #[tracing::instrument(skip_all, fields(slug = %draft.slug))]
    pub async fn create_assistant(
        &self,
        draft: &NewAssistant,
        requester: Option<&WalletAddress>,
    ) -> Result<Assistant> {
        validate_slug(&draft.slug)?;

        let existing = self.list_assistants().await?;
        if existing.iter().any(|a| a.slug == draft.slug) {
            return Err(GatewayError::DuplicateSlug(draft.slug.clone()));
        }
        let requester = requester.ok_or(GatewayError::Unauthenticated)?;

        let request = CreateAssistantRequest::new(requester.clone(), draft);
        self.registry.create_assistant(&request).await?;
        tracing::info!(slug = %draft.slug, admin = %requester, "Assistant created");

        // Re-read so the caller sees the registry's record (context id included).
        match self.resolve_by_slug(&draft.slug).await {
            Ok(created) => Ok(created),
            Err(GatewayError::NotFound { .. }) => Ok(Assistant {
                slug: draft.slug.clone(),
                name: draft.name.clone(),
                intro_phrase: draft.intro_phrase.clone(),
                context_id: None,
                dao_address: draft.dao_address.clone(),
                dao_network: draft.dao_network.clone(),
                admin_address: Some(requester.to_string()),
            }),
            Err(e) => Err(e),
        }
    }
}

/// Slugs are non-empty lowercase ASCII letters, digits and single dashes.
pub fn validate_slug(slug: &str) -> Result<()> {
    let valid = !slug.is_empty()
        && slug.len() <= 64
        && slug
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
        && !slug.starts_with('-')
        && !slug.ends_with('-')
        && !slug.contains("--");
    if valid {
        Ok(())
    } else {
        Err(GatewayError::InvalidRequest(format!(
            "slug '{slug}' must be lowercase letters, digits and dashes"
        )))
    }
}
