use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use uuid::Uuid;

use crate::error::GatewayError;
use crate::web::types::ErrorResponse;

/// Handler error: a gateway error plus, for chat, the substitute answer the
/// client should render in place of the failed turn.
#[derive(Debug)]
pub struct ApiError {
    error: GatewayError,
    fallback: Option<ChatFallback>,
}

#[derive(Debug)]
struct ChatFallback {
    answer: String,
    conversation_id: Option<String>,
}

impl ApiError {
    pub fn with_chat_fallback(
        error: GatewayError,
        answer: String,
        conversation_id: Option<String>,
    ) -> Self {
        Self {
            error,
            fallback: Some(ChatFallback {
                answer,
                conversation_id,
            }),
        }
    }
}

impl From<GatewayError> for ApiError {
    fn from(error: GatewayError) -> Self {
        Self {
            error,
            fallback: None,
        }
    }
}

/// HTTP status for each error kind.
pub fn status_for(error: &GatewayError) -> StatusCode {
    match error {
        GatewayError::InvalidAddress(_)
        | GatewayError::InvalidRequest(_)
        | GatewayError::EmptyMessage => StatusCode::BAD_REQUEST,
        GatewayError::InvalidFileType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        GatewayError::Unauthenticated => StatusCode::UNAUTHORIZED,
        GatewayError::Unauthorized { .. } => StatusCode::FORBIDDEN,
        GatewayError::NotFound { .. } => StatusCode::NOT_FOUND,
        GatewayError::DuplicateSlug(_) => StatusCode::CONFLICT,
        GatewayError::UpstreamUnavailable { .. } | GatewayError::UpstreamAskFailed { .. } => {
            StatusCode::BAD_GATEWAY
        }
        GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.error);
        let payload = self.error.to_error_payload();
        let request_id = Uuid::new_v4();

        if status.is_server_error() {
            tracing::warn!(%request_id, code = payload.code, error = %self.error, "Request failed");
        } else {
            tracing::debug!(%request_id, code = payload.code, error = %self.error, "Request rejected");
        }

        let (fallback_answer, conversation_id) = match self.fallback {
            Some(f) => (Some(f.answer), f.conversation_id),
            None => (None, None),
        };
        let body = ErrorResponse {
            error: payload.code,
            message: payload.message,
            retryable: payload.retryable,
            request_id: request_id.to_string(),
            fallback_answer,
            conversation_id,
        };
        (status, Json(body)).into_response()
    }
}
