//! reqwest-backed registry and AI service clients.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::{
    Assistant, AskBackend, AskCredentials, AskRequest, AskResponse, AssistantRegistry,
    CreateAssistantRequest, FileUpload, VerifyOutcome,
};
use crate::config::{ChatConfig, RegistryConfig};
use crate::error::RegistryError;
use crate::wallet::WalletAddress;

const REGISTRY_SERVICE: &str = "registry";
const ASK_SERVICE: &str = "AI service";

const WALLET_HEADER: &str = "x-wallet-address";
const CONTEXT_HEADER: &str = "x-context-id";
const API_KEY_HEADER: &str = "x-api-key";

/// Max characters of an upstream error body kept for logs.
const LOG_BODY_LIMIT: usize = 512;

/// HTTP client for the assistant registry.
#[derive(Debug, Clone)]
pub struct HttpRegistry {
    client: Client,
    base_url: String,
    api_key: Option<SecretString>,
    timeout: Duration,
}

impl HttpRegistry {
    pub fn new(config: &RegistryConfig) -> Self {
        Self {
            client: build_client(config.timeout),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            timeout: config.timeout,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, RegistryError> {
        send_checked(REGISTRY_SERVICE, self.timeout, request).await
    }
}

#[derive(Deserialize)]
struct AuthMessageResponse {
    message: String,
}

#[derive(Deserialize)]
struct FileListResponse {
    #[serde(default)]
    files: Vec<String>,
}

#[async_trait]
impl AssistantRegistry for HttpRegistry {
    #[tracing::instrument(skip_all)]
    async fn list_assistants(&self) -> Result<Vec<Assistant>, RegistryError> {
        let response = self.send(self.client.get(self.url("/api-keys/details"))).await?;
        parse_json(REGISTRY_SERVICE, response).await
    }

    #[tracing::instrument(skip_all, fields(slug = %request.slug))]
    async fn create_assistant(&self, request: &CreateAssistantRequest) -> Result<(), RegistryError> {
        let mut builder = self.client.post(self.url("/api-keys")).json(request);
        if let Some(key) = &self.api_key {
            builder = builder.header(API_KEY_HEADER, key.expose_secret());
        }
        self.send(builder).await?;
        Ok(())
    }

    #[tracing::instrument(skip_all, fields(address = %address))]
    async fn auth_message(&self, address: &WalletAddress) -> Result<String, RegistryError> {
        let response = self
            .send(
                self.client
                    .post(self.url("/auth/message"))
                    .json(&serde_json::json!({ "address": address })),
            )
            .await?;
        let body: AuthMessageResponse = parse_json(REGISTRY_SERVICE, response).await?;
        Ok(body.message)
    }

    #[tracing::instrument(skip_all, fields(address = %address))]
    async fn auth_verify(
        &self,
        address: &WalletAddress,
        message: &str,
        signature: &str,
    ) -> Result<VerifyOutcome, RegistryError> {
        let response = self
            .send(self.client.post(self.url("/auth/verify")).json(&serde_json::json!({
                "message": message,
                "signature": signature,
                "address": address,
            })))
            .await?;
        parse_json(REGISTRY_SERVICE, response).await
    }

    #[tracing::instrument(skip_all, fields(caller = %caller, context_id = %context_id))]
    async fn list_files(
        &self,
        context_id: &str,
        caller: &WalletAddress,
    ) -> Result<Vec<String>, RegistryError> {
        let response = self
            .send(
                self.client
                    .post(self.url("/context-files/list-files"))
                    .header(WALLET_HEADER, caller.as_str())
                    .json(&serde_json::json!({
                        "id": context_id,
                        "walletAddress": caller,
                    })),
            )
            .await?;
        let body: FileListResponse = parse_json(REGISTRY_SERVICE, response).await?;
        Ok(body.files)
    }

    #[tracing::instrument(skip_all, fields(caller = %caller, filename = %file.filename))]
    async fn add_context(
        &self,
        context_id: &str,
        caller: &WalletAddress,
        file: &FileUpload,
    ) -> Result<(), RegistryError> {
        let part = Part::bytes(file.content.to_vec())
            .file_name(file.filename.clone())
            .mime_str("text/markdown")
            .map_err(|e| RegistryError::Transport {
                service: REGISTRY_SERVICE,
                reason: format!("failed to build upload: {e}"),
            })?;
        let form = Form::new().part("file", part);

        self.send(
            self.client
                .post(self.url("/context-files/add-context"))
                .header(WALLET_HEADER, caller.as_str())
                .header(CONTEXT_HEADER, context_id)
                .multipart(form),
        )
        .await?;
        Ok(())
    }

    #[tracing::instrument(skip_all, fields(caller = %caller, filename = %filename))]
    async fn delete_context(
        &self,
        context_id: &str,
        caller: &WalletAddress,
        filename: &str,
    ) -> Result<(), RegistryError> {
        self.send(
            self.client
                .delete(self.url("/context-files/delete-context"))
                .header(WALLET_HEADER, caller.as_str())
                .header(CONTEXT_HEADER, context_id)
                .json(&serde_json::json!({ "filename": filename })),
        )
        .await?;
        Ok(())
    }
}

/// HTTP client for the AI question-answering service.
#[derive(Debug, Clone)]
pub struct HttpAskBackend {
    client: Client,
    base_url: String,
    api_key: Option<SecretString>,
    timeout: Duration,
}

impl HttpAskBackend {
    pub fn new(config: &ChatConfig, api_key: Option<SecretString>) -> Self {
        Self {
            client: build_client(config.timeout),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            timeout: config.timeout,
        }
    }
}

#[async_trait]
impl AskBackend for HttpAskBackend {
    #[tracing::instrument(skip_all, fields(continuing = request.conversation_id.is_some()))]
    async fn ask(&self, request: &AskRequest) -> Result<AskResponse, RegistryError> {
        let mut form = Form::new().text("message", request.message.clone());
        if let Some(id) = &request.conversation_id {
            form = form.text("conversationId", id.clone());
        }

        let mut builder = self
            .client
            .post(format!("{}/ai/ask", self.base_url))
            .multipart(form);
        match &request.credentials {
            AskCredentials::Wallet {
                address,
                context_id,
            } => {
                builder = builder.header(WALLET_HEADER, address.as_str());
                if let Some(id) = context_id {
                    builder = builder.header(CONTEXT_HEADER, id.as_str());
                }
            }
            AskCredentials::ApiKey => {
                if let Some(key) = &self.api_key {
                    builder = builder.header(API_KEY_HEADER, key.expose_secret());
                }
            }
        }

        let response = send_checked(ASK_SERVICE, self.timeout, builder).await?;
        parse_json(ASK_SERVICE, response).await
    }
}

fn build_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// Send a request and turn transport failures and non-2xx statuses into
/// [`RegistryError`]. Upstream error bodies go to the log only, redacted.
async fn send_checked(
    service: &'static str,
    timeout: Duration,
    request: RequestBuilder,
) -> Result<Response, RegistryError> {
    let response = request.send().await.map_err(|e| {
        if e.is_timeout() {
            RegistryError::Timeout { service, timeout }
        } else {
            RegistryError::Transport {
                service,
                reason: redact_sensitive_detail(&e.to_string()),
            }
        }
    })?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let snippet: String = body.chars().take(LOG_BODY_LIMIT).collect();
    tracing::warn!(
        service,
        status = status.as_u16(),
        body = %redact_sensitive_detail(&snippet),
        "Upstream request failed"
    );
    Err(RegistryError::Status {
        service,
        status: status.as_u16(),
    })
}

async fn parse_json<T: DeserializeOwned>(
    service: &'static str,
    response: Response,
) -> Result<T, RegistryError> {
    let bytes = response.bytes().await.map_err(|e| RegistryError::Transport {
        service,
        reason: format!("failed to read response body: {e}"),
    })?;
    serde_json::from_slice(&bytes).map_err(|e| RegistryError::InvalidResponse {
        service,
        reason: e.to_string(),
    })
}

static REDACTIONS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"(?i)\b(bearer)\s+[a-z0-9._\-~+/]+=*", "$1 [REDACTED]"),
        (
            r"(?i)\b(token|api[_\-]?key|secret|password|signature)\b(\s*[:=]\s*)([^,\s]+)",
            "$1$2[REDACTED]",
        ),
        (r"(?i)\bsk-[a-z0-9\-]{10,}\b", "sk-[REDACTED]"),
    ]
    .into_iter()
    .filter_map(|(pattern, replacement)| Regex::new(pattern).ok().map(|re| (re, replacement)))
    .collect()
});

fn redact_sensitive_detail(raw: &str) -> String {
    REDACTIONS
        .iter()
        .fold(raw.to_string(), |value, (re, replacement)| {
            re.replace_all(&value, *replacement).to_string()
        })
}
