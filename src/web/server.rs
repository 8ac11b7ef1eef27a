//! Axum HTTP server for the gateway.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State},
    http::{HeaderName, HeaderValue, Method, header},
    routing::{delete, get, post},
};
use chrono::{DateTime, Utc};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::error::ServerError;
use crate::gateway::AssistantGateway;
use crate::web::handlers::{assistants, auth, chat, files};
use crate::web::types::HealthResponse;

/// Shared state for all handlers. Read-only after startup.
pub struct GatewayState {
    pub gateway: AssistantGateway,
    /// Shown in place of a chat answer when the AI service fails.
    pub fallback_answer: String,
    pub started_at: DateTime<Utc>,
}

impl GatewayState {
    pub fn new(gateway: AssistantGateway, fallback_answer: impl Into<String>) -> Self {
        Self {
            gateway,
            fallback_answer: fallback_answer.into(),
            started_at: Utc::now(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            AssistantGateway::from_config(config),
            config.chat.fallback_answer.clone(),
        )
    }
}

/// Listener-level options.
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Explicit CORS origins. Empty allows the bound address and localhost.
    pub cors_origins: Vec<String>,
    pub max_body_bytes: usize,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            cors_origins: Vec::new(),
            max_body_bytes: 5 * 1024 * 1024,
        }
    }
}

/// Handle to a running server.
pub struct RunningServer {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl RunningServer {
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stop accepting connections and wait for in-flight requests.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Err(e) = self.task.await {
            tracing::error!("Gateway server task failed: {}", e);
        }
    }
}

/// All gateway routes without the listener-specific layers.
pub fn build_router(state: Arc<GatewayState>) -> Router {
    Router::new()
        .route("/api/health", get(health_handler))
        .route(
            "/api/assistants",
            get(assistants::list_assistants_handler).post(assistants::create_assistant_handler),
        )
        .route("/api/assistants/{slug}", get(assistants::get_assistant_handler))
        .route(
            "/api/assistants/{slug}/files",
            get(files::list_files_handler).post(files::upload_file_handler),
        )
        .route(
            "/api/assistants/{slug}/files/{filename}",
            delete(files::delete_file_handler),
        )
        .route("/api/assistants/{slug}/chat", post(chat::chat_handler))
        .route("/api/auth", post(auth::legacy_auth_handler))
        .route("/api/auth/challenge", post(auth::challenge_handler))
        .route("/api/auth/verify", post(auth::verify_handler))
        .with_state(state)
}

/// Bind, then serve in a background task. Returns once the listener is up.
pub async fn start_server(
    addr: SocketAddr,
    state: Arc<GatewayState>,
    options: ServerOptions,
) -> Result<RunningServer, ServerError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::StartupFailed {
            reason: format!("Failed to bind to {}: {}", addr, e),
        })?;
    let bound_addr = listener
        .local_addr()
        .map_err(|e| ServerError::StartupFailed {
            reason: format!("Failed to get local addr: {}", e),
        })?;

    let app = build_router(state)
        .layer(cors_layer(&options.cors_origins, bound_addr))
        .layer(DefaultBodyLimit::max(options.max_body_bytes))
        .layer(TraceLayer::new_for_http());

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let task = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                tracing::info!("Gateway shutting down");
            })
            .await
        {
            tracing::error!("Gateway server error: {}", e);
        }
    });

    tracing::info!("Gateway listening on http://{}", bound_addr);
    Ok(RunningServer {
        addr: bound_addr,
        shutdown_tx: Some(shutdown_tx),
        task,
    })
}

fn cors_layer(origins: &[String], bound: SocketAddr) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers(AllowHeaders::list([
            header::CONTENT_TYPE,
            HeaderName::from_static("x-wallet-address"),
            HeaderName::from_static("x-api-key"),
        ]));
    if origins.iter().any(|o| o.trim() == "*") {
        return layer.allow_origin(AllowOrigin::any());
    }

    let candidates: Vec<String> = if origins.is_empty() {
        vec![
            format!("http://{}:{}", bound.ip(), bound.port()),
            format!("http://localhost:{}", bound.port()),
        ]
    } else {
        origins.to_vec()
    };
    let allowed: Vec<HeaderValue> = candidates
        .iter()
        .filter_map(|origin| match origin.trim_end_matches('/').parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    layer.allow_origin(AllowOrigin::list(allowed))
}

async fn health_handler(State(state): State<Arc<GatewayState>>) -> Json<HealthResponse> {
    let uptime = Utc::now().signed_duration_since(state.started_at);
    Json(HealthResponse {
        status: "healthy",
        service: "ouf-gateway",
        version: env!("CARGO_PKG_VERSION"),
        started_at: state.started_at,
        uptime_secs: uptime.num_seconds().max(0) as u64,
    })
}
