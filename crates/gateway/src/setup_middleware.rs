use std::sync::Arc;

use {
    axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response},
    tracing::error,
};

use crate::state::GatewayState;

/// Middleware that runs the one-time webhook setup before any route.
///
/// Setup failures are logged and the request proceeds: the guard stays
/// pending, so the next request retries.
pub async fn ensure_setup(
    State(state): State<Arc<GatewayState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if let Err(e) = state.setup.ensure().await {
        error!(error = %e, "webhook setup failed");
    }
    next.run(request).await
}
