//! HTTP surface for the gateway.
//!
//! ```text
//! Browser ─── GET  /api/assistants/{slug} ─────────── resolve + isAdmin
//!         ─── POST /api/auth/challenge|verify ─────── wallet signature flow
//!         ─── GET|POST /api/assistants/{slug}/files ─ admin-gated files
//!         ─── DELETE /api/assistants/{slug}/files/{filename}
//!         ─── POST /api/assistants/{slug}/chat ────── one conversation turn
//! ```
//!
//! Caller identity comes from the `x-wallet-address` header and is
//! normalized before any check.

pub mod error;
pub mod handlers;
pub mod server;
pub mod types;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::HeaderMap;

use crate::error::{AddressError, GatewayError};
use crate::gateway::Session;

pub use error::ApiError;
pub use server::{GatewayState, RunningServer, ServerOptions, build_router, start_server};

/// Header carrying the caller's wallet address.
pub const WALLET_HEADER: &str = "x-wallet-address";

/// Session for this request. A header that is present but unreadable or
/// malformed is rejected rather than treated as anonymous.
pub(crate) fn session_from_headers(headers: &HeaderMap) -> Result<Session, GatewayError> {
    let raw = headers
        .get(WALLET_HEADER)
        .map(|v| {
            v.to_str()
                .map_err(|_| GatewayError::InvalidAddress(AddressError::InvalidHex))
        })
        .transpose()?;
    Session::from_header(raw)
}

/// Unwrap a JSON body, reporting malformed or incomplete bodies as
/// `InvalidRequest` so they carry the standard error payload.
pub(crate) fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, GatewayError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| GatewayError::InvalidRequest(rejection.body_text()))
}
