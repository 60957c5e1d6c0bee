//! Axum HTTP wrapper around the unfurl pipeline.
//!
//! The only contract with the pipeline is the `UnfurlOutcome` it returns:
//! - `Preview` → 200 with the preview as JSON
//! - `Blocked` → 403 `{error: "unsafe_content_blocked", url}`
//! - `Failed`  → 500 `{error: "failed_to_unfurl", message}`

mod handlers;

use handlers::{handle_health, handle_unfurl};

use crate::config::Config;
use crate::unfurl::Unfurler;
use anyhow::Result;
use axum::{
    Router,
    http::StatusCode,
    routing::{get, post},
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

/// Maximum request body size (16KB); the body carries a single URL
pub const MAX_BODY_SIZE: usize = 16_384;
/// Request timeout (30s), well above the unfurl deadline
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Shared state for all axum handlers
#[derive(Clone)]
pub struct AppState {
    pub unfurler: Arc<Unfurler>,
}

/// `POST /link/unfurl` request body
#[derive(Debug, serde::Deserialize)]
pub struct UnfurlBody {
    pub url: String,
}

pub async fn run_gateway(host: &str, port: u16, config: Config) -> Result<()> {
    let addr: SocketAddr = format!("{host}:{port}").parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    run_gateway_with_listener(listener, config).await
}

/// Run the HTTP gateway from a pre-bound listener.
pub async fn run_gateway_with_listener(
    listener: tokio::net::TcpListener,
    config: Config,
) -> Result<()> {
    let local = listener.local_addr()?;
    let unfurler = Unfurler::from_config(&config)?;
    let app = router(AppState {
        unfurler: Arc::new(unfurler),
    });

    tracing::info!("🔗 Unfurl gateway listening on http://{local}");
    axum::serve(listener, app).await?;

    Ok(())
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .route("/link/unfurl", post(handle_unfurl))
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(REQUEST_TIMEOUT_SECS),
        ))
}
