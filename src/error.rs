//! Error types for the assistant gateway.

use std::time::Duration;

use serde::Serialize;

/// Transport-facing error taxonomy for every gateway operation.
///
/// Each variant is scoped to the single request that produced it; nothing
/// here is fatal to the process.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Invalid wallet address: {0}")]
    InvalidAddress(#[from] AddressError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("A connected wallet is required for this operation")]
    Unauthenticated,

    #[error("Wallet {caller} is not the admin of assistant '{slug}'")]
    Unauthorized { slug: String, caller: String },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("An assistant with slug '{0}' already exists")]
    DuplicateSlug(String),

    #[error("Only markdown (.md) files can be uploaded, got '{0}'")]
    InvalidFileType(String),

    #[error("Message is required")]
    EmptyMessage,

    #[error("{service} is unavailable: {reason}")]
    UpstreamUnavailable { service: &'static str, reason: String },

    #[error("AI service request failed: {reason}")]
    UpstreamAskFailed { reason: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Why a wallet address failed normalization.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("address must be 0x-prefixed")]
    MissingPrefix,

    #[error("address must contain 40 hex digits, got {0}")]
    InvalidLength(usize),

    #[error("address contains non-hex characters")]
    InvalidHex,

    #[error("address checksum does not match")]
    ChecksumMismatch,
}

/// Failures talking to an upstream service (registry or AI backend).
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("{service} request failed: {reason}")]
    Transport { service: &'static str, reason: String },

    #[error("{service} timed out after {timeout:?}")]
    Timeout {
        service: &'static str,
        timeout: Duration,
    },

    #[error("{service} returned HTTP {status}")]
    Status { service: &'static str, status: u16 },

    #[error("Invalid response from {service}: {reason}")]
    InvalidResponse { service: &'static str, reason: String },
}

impl From<RegistryError> for GatewayError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::InvalidResponse { .. } => Self::Internal(err.to_string()),
            RegistryError::Transport { service, .. }
            | RegistryError::Timeout { service, .. }
            | RegistryError::Status { service, .. } => Self::UpstreamUnavailable {
                service,
                reason: err.to_string(),
            },
        }
    }
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {key}. {hint}")]
    MissingRequired { key: String, hint: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// HTTP server lifecycle errors.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Gateway failed to start: {reason}")]
    StartupFailed { reason: String },
}

/// Structured error payload returned to gateway clients.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ErrorPayload {
    pub code: &'static str,
    pub retryable: bool,
    pub message: String,
}

impl ErrorPayload {
    fn new(code: &'static str, retryable: bool, message: impl Into<String>) -> Self {
        Self {
            code,
            retryable,
            message: message.into(),
        }
    }
}

impl GatewayError {
    /// Map into the stable client-facing payload.
    ///
    /// Upstream failures carry only the diagnostic summary built by the
    /// registry client, never the upstream response body.
    pub fn to_error_payload(&self) -> ErrorPayload {
        match self {
            Self::InvalidAddress(_) => {
                ErrorPayload::new("validation.invalid_address", false, self.to_string())
            }
            Self::InvalidRequest(_) => {
                ErrorPayload::new("validation.invalid_request", false, self.to_string())
            }
            Self::EmptyMessage => {
                ErrorPayload::new("validation.empty_message", false, self.to_string())
            }
            Self::InvalidFileType(_) => {
                ErrorPayload::new("validation.invalid_file_type", false, self.to_string())
            }
            Self::Unauthenticated => {
                ErrorPayload::new("auth.unauthenticated", false, self.to_string())
            }
            Self::Unauthorized { .. } => ErrorPayload::new(
                "auth.unauthorized",
                false,
                "You don't have permission to manage this assistant",
            ),
            Self::NotFound { .. } => ErrorPayload::new("not_found", false, self.to_string()),
            Self::DuplicateSlug(_) => {
                ErrorPayload::new("conflict.duplicate_slug", false, self.to_string())
            }
            Self::UpstreamUnavailable { .. } => {
                ErrorPayload::new("upstream.unavailable", true, self.to_string())
            }
            Self::UpstreamAskFailed { .. } => {
                ErrorPayload::new("upstream.ask_failed", true, self.to_string())
            }
            Self::Internal(_) => ErrorPayload::new("internal", false, "Internal server error"),
        }
    }

    /// Whether the failure came from (or after) an upstream call rather than
    /// local validation or authorization.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Self::UpstreamUnavailable { .. } | Self::UpstreamAskFailed { .. } | Self::Internal(_)
        )
    }
}

/// Result type alias for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;
