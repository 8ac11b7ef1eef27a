//! Request and response types for the gateway API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::files::ContextFile;
use crate::gateway::AssistantView;

// --- Health ---

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub started_at: DateTime<Utc>,
    pub uptime_secs: u64,
}

// --- Assistants ---

#[derive(Debug, Serialize)]
pub struct AssistantListResponse {
    pub assistants: Vec<AssistantView>,
}

// --- Auth ---

#[derive(Debug, Deserialize)]
pub struct ChallengeRequest {
    pub address: String,
}

#[derive(Debug, Serialize)]
pub struct ChallengeResponse {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub address: String,
    pub message: String,
    pub signature: String,
}

/// Single-endpoint auth form: `{"action": "getMessage" | "verify", ...}`.
#[derive(Debug, Deserialize)]
#[serde(tag = "action")]
pub enum LegacyAuthRequest {
    #[serde(rename = "getMessage")]
    GetMessage { address: String },
    #[serde(rename = "verify")]
    Verify {
        address: String,
        message: String,
        signature: String,
    },
}

// --- Files ---

#[derive(Debug, Serialize)]
pub struct FileListResponse {
    pub files: Vec<ContextFile>,
}

// --- Chat ---

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default, alias = "conversationId")]
    pub conversation_id: Option<String>,
}

// --- Errors ---

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
    pub message: String,
    pub retryable: bool,
    pub request_id: String,
    /// Substitute assistant message for a failed chat turn.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}
