use std::{net::SocketAddr, sync::Arc};

use {
    axum::{
        Router,
        extract::State,
        http::StatusCode,
        response::{IntoResponse, Json},
        routing::{get, post},
    },
    tower_http::trace::TraceLayer,
    tracing::{error, info},
};

use crate::{setup_middleware::ensure_setup, state::GatewayState, webhook::webhook_handler};

pub const LIVENESS_TEXT: &str = "Hello, I am the DriveBot!";

/// Build the gateway router (shared between production startup and tests).
pub fn build_gateway_app(state: Arc<GatewayState>) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/setup", get(setup_handler))
        .route(&state.webhook_path, post(webhook_handler))
        .layer(axum::middleware::from_fn_with_state(
            Arc::clone(&state),
            ensure_setup,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until Ctrl-C.
pub async fn start_gateway(state: Arc<GatewayState>, bind: &str, port: u16) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    let webhook_path = state.webhook_path.clone();
    let app = build_gateway_app(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, webhook_path, "gateway listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

// ── Handlers ─────────────────────────────────────────────────────────────────

async fn root_handler() -> &'static str {
    LIVENESS_TEXT
}

async fn health_handler(State(state): State<Arc<GatewayState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": state.version,
        "setup": state.setup.state().as_str(),
    }))
}

/// Explicit setup trigger; joins the run-once sequence like any request.
async fn setup_handler(State(state): State<Arc<GatewayState>>) -> impl IntoResponse {
    match state.setup.ensure().await {
        Ok(()) => (StatusCode::OK, "Webhook setup finished!".to_string()),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Webhook setup failed: {e}"),
        ),
    }
}
