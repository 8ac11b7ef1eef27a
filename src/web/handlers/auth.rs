use std::sync::Arc;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    response::{IntoResponse, Response},
};

use crate::auth::AuthOutcome;
use crate::error::GatewayError;
use crate::web::{ApiError, json_body};
use crate::web::server::GatewayState;
use crate::web::types::{ChallengeRequest, ChallengeResponse, LegacyAuthRequest, VerifyRequest};

pub async fn challenge_handler(
    State(state): State<Arc<GatewayState>>,
    body: Result<Json<ChallengeRequest>, JsonRejection>,
) -> Result<Json<ChallengeResponse>, ApiError> {
    let req = json_body(body)?;
    let message = state.gateway.begin_auth(&req.address).await?;
    Ok(Json(ChallengeResponse { message }))
}

pub async fn verify_handler(
    State(state): State<Arc<GatewayState>>,
    body: Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<Json<AuthOutcome>, ApiError> {
    let req = json_body(body)?;
    let outcome = state
        .gateway
        .complete_auth(&req.address, &req.message, &req.signature)
        .await?;
    Ok(Json(outcome))
}

/// `POST /api/auth` with an `action` discriminator.
pub async fn legacy_auth_handler(
    State(state): State<Arc<GatewayState>>,
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    let req: LegacyAuthRequest = serde_json::from_value(json_body(body)?)
        .map_err(|_| GatewayError::InvalidRequest("Invalid action".to_string()))?;

    match req {
        LegacyAuthRequest::GetMessage { address } => {
            let message = state.gateway.begin_auth(&address).await?;
            Ok(Json(ChallengeResponse { message }).into_response())
        }
        LegacyAuthRequest::Verify {
            address,
            message,
            signature,
        } => {
            let outcome = state
                .gateway
                .complete_auth(&address, &message, &signature)
                .await?;
            Ok(Json(outcome).into_response())
        }
    }
}
