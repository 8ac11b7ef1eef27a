use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::HeaderMap,
};

use crate::conversation::ChatTurn;
use crate::web::server::GatewayState;
use crate::web::types::ChatRequest;
use crate::web::{ApiError, json_body, session_from_headers};

/// One conversation turn. Upstream failures come back with a substitute
/// answer and the caller's unchanged conversation id.
pub async fn chat_handler(
    State(state): State<Arc<GatewayState>>,
    Path(slug): Path<String>,
    headers: HeaderMap,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatTurn>, ApiError> {
    let session = session_from_headers(&headers)?;
    let req = json_body(body)?;
    match state
        .gateway
        .send_chat(&slug, &session, &req.message, req.conversation_id.as_deref())
        .await
    {
        Ok(turn) => Ok(Json(turn)),
        Err(e) if e.is_upstream() => Err(ApiError::with_chat_fallback(
            e,
            state.fallback_answer.clone(),
            req.conversation_id,
        )),
        Err(e) => Err(e.into()),
    }
}
