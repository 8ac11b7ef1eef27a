//! Knowledge files attached to an assistant's context.

use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;

use crate::error::{GatewayError, Result};
use crate::registry::{AssistantRegistry, FileUpload};
use crate::wallet::WalletAddress;

/// A document stored in a context, identified by filename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ContextFile {
    pub filename: String,
}

/// A validated markdown upload.
///
/// The only way to build one is [`ContextUpload::new`], so anything that
/// reaches the registry has already passed the extension gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextUpload(FileUpload);

impl ContextUpload {
    pub fn new(filename: &str, content: Bytes) -> Result<Self> {
        let filename = base_name(filename);
        if filename.is_empty() {
            return Err(GatewayError::InvalidRequest(
                "uploaded file has no name".to_string(),
            ));
        }
        if !is_markdown_filename(filename) {
            return Err(GatewayError::InvalidFileType(filename.to_string()));
        }
        Ok(Self(FileUpload {
            filename: filename.to_string(),
            content,
        }))
    }

    pub fn filename(&self) -> &str {
        &self.0.filename
    }

    pub fn len(&self) -> usize {
        self.0.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.content.is_empty()
    }
}

/// `.md` extension, compared case-insensitively.
pub fn is_markdown_filename(filename: &str) -> bool {
    filename.to_ascii_lowercase().ends_with(".md") && filename.len() > 3
}

// Browsers may send a full client path; keep the last component only.
fn base_name(filename: &str) -> &str {
    filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename)
        .trim()
}

#[derive(Clone)]
pub struct ContextFileManager {
    registry: Arc<dyn AssistantRegistry>,
}

impl ContextFileManager {
    pub fn new(registry: Arc<dyn AssistantRegistry>) -> Self {
        Self { registry }
    }

    /// Filenames in a context. Without a context id or caller there is
    /// nothing to ask for, so the list is empty and no call is made.
    #[tracing::instrument(skip_all)]
    pub async fn list_files(
        &self,
        context_id: Option<&str>,
        caller: Option<&WalletAddress>,
    ) -> Result<Vec<ContextFile>> {
        let (Some(context_id), Some(caller)) = (context_id.filter(|c| !c.trim().is_empty()), caller)
        else {
            return Ok(Vec::new());
        };

        let files = self.registry.list_files(context_id, caller).await?;
        Ok(files
            .into_iter()
            .map(|filename| ContextFile { filename })
            .collect())
    }

    #[tracing::instrument(skip_all, fields(filename = %upload.filename(), bytes = upload.len()))]
    pub async fn upload_file(
        &self,
        context_id: &str,
        caller: &WalletAddress,
        upload: &ContextUpload,
    ) -> Result<()> {
        self.registry
            .add_context(context_id, caller, &upload.0)
            .await?;
        tracing::info!("Context file uploaded");
        Ok(())
    }

    /// Remove a file. Absent files are the registry's call to make.
    #[tracing::instrument(skip_all, fields(filename = %filename))]
    pub async fn delete_file(
        &self,
        context_id: &str,
        caller: &WalletAddress,
        filename: &str,
    ) -> Result<()> {
        if filename.trim().is_empty() {
            return Err(GatewayError::InvalidRequest(
                "filename is required".to_string(),
            ));
        }
        self.registry
            .delete_context(context_id, caller, filename)
            .await?;
        tracing::info!("Context file deleted");
        Ok(())
    }
}
