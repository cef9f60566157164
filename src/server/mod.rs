//! Webhook listener
//!
//! Sonarr posts series events to `/webhook`. Events that change the set of
//! monitored series start a pass on a separate task; the response does not
//! wait for it.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Bytes,
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::metrics;
use crate::sync::{SyncEngine, Trigger};

/// Sonarr events that start a pass
pub const SYNC_EVENTS: [&str; 3] = ["SeriesAdd", "SeriesDelete", "SeriesEdit"];

/// Server errors
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Engine shared with the scheduler
    pub engine: Arc<SyncEngine>,

    /// Server start time
    pub start_time: Instant,
}

impl AppState {
    pub fn new(engine: Arc<SyncEngine>) -> Self {
        Self {
            engine,
            start_time: Instant::now(),
        }
    }
}

/// Webhook acknowledgement
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub status: &'static str,
}

/// Error body for rejected requests
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub status: &'static str,
    pub error: String,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_secs: u64,
}

/// Create the router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health_check))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .route("/webhook", post(webhook))
        .with_state(state)
}

/// Router with request tracing and permissive CORS
pub fn build_router(state: AppState) -> Router {
    create_router(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Serve until `shutdown` resolves
pub async fn serve<F>(addr: SocketAddr, state: AppState, shutdown: F) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;

    info!(%addr, "Webhook listener started");
    info!("Point Sonarr's webhook connection at http://{addr}/webhook (POST, series add/delete/update)");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(ServerError::Serve)?;

    info!("Webhook listener stopped");
    Ok(())
}

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

async fn metrics_handler() -> impl IntoResponse {
    match metrics::encode_metrics() {
        Ok(text) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [(header::CONTENT_TYPE, "text/plain")],
            format!("Failed to encode metrics: {e}"),
        ),
    }
}

async fn webhook(State(state): State<AppState>, body: Bytes) -> impl IntoResponse {
    let payload: Value = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(error = %e, "Failed to parse webhook JSON");
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    status: "error",
                    error: format!("Invalid JSON: {e}"),
                }),
            )
                .into_response();
        }
    };

    let event_type = payload
        .get("eventType")
        .and_then(Value::as_str)
        .unwrap_or("Unknown");
    info!(event_type, "Received Sonarr webhook");

    if SYNC_EVENTS.contains(&event_type) {
        info!(event_type, "Webhook event triggers a sync pass");
        let engine = Arc::clone(&state.engine);
        tokio::spawn(async move {
            engine.run_pass(Trigger::Webhook).await;
        });
    } else if event_type == "Test" {
        info!("Webhook test received");
    } else {
        debug!(event_type, "No action for webhook event");
    }

    (StatusCode::OK, Json(WebhookResponse { status: "success" })).into_response()
}
