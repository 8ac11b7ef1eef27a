use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
};

use crate::gateway::AssistantView;
use crate::registry::NewAssistant;
use crate::web::server::GatewayState;
use crate::web::types::AssistantListResponse;
use crate::web::{ApiError, json_body, session_from_headers};

pub async fn list_assistants_handler(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
) -> Result<Json<AssistantListResponse>, ApiError> {
    let session = session_from_headers(&headers)?;
    let assistants = state.gateway.list_assistants(&session).await?;
    Ok(Json(AssistantListResponse { assistants }))
}

pub async fn get_assistant_handler(
    State(state): State<Arc<GatewayState>>,
    Path(slug): Path<String>,
    headers: HeaderMap,
) -> Result<Json<AssistantView>, ApiError> {
    let session = session_from_headers(&headers)?;
    let view = state.gateway.resolve_assistant(&slug, &session).await?;
    Ok(Json(view))
}

pub async fn create_assistant_handler(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
    body: Result<Json<NewAssistant>, JsonRejection>,
) -> Result<(StatusCode, Json<AssistantView>), ApiError> {
    let session = session_from_headers(&headers)?;
    let draft = json_body(body)?;
    let view = state.gateway.create_assistant(&draft, &session).await?;
    Ok((StatusCode::CREATED, Json(view)))
}
