use std::sync::Arc;

use {
    axum::{
        body::Bytes,
        extract::State,
        http::{HeaderMap, StatusCode},
        response::{IntoResponse, Json, Response},
    },
    secrecy::ExposeSecret,
    serde_json::json,
    teloxide::types::Update,
    tracing::{debug, error, warn},
};

use crate::state::GatewayState;

/// Header Telegram echoes the registration secret in.
pub const SECRET_TOKEN_HEADER: &str = "x-telegram-bot-api-secret-token";

/// Receive one push from Telegram.
///
/// Answers 200 whenever the payload parses, even if the relay itself failed:
/// those failures are reported in the chat or logged by the processor. Only
/// an undecodable payload is answered with a 500.
pub async fn webhook_handler(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Some(expected) = &state.secret_token {
        let given = headers
            .get(SECRET_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if !constant_time_eq(given, expected.expose_secret()) {
            warn!("webhook push with invalid secret token");
            return error_response(StatusCode::UNAUTHORIZED, "invalid secret token");
        }
    }

    let update: Update = match serde_json::from_slice(&body) {
        Ok(update) => update,
        Err(e) => {
            error!(error = %e, "failed to decode webhook payload");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string());
        },
    };
    debug!(update_id = update.id.0, "webhook update received");

    state.updates.process_update(update).await;
    Json(json!({ "status": "ok" })).into_response()
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "status": "error", "message": message }))).into_response()
}

/// Constant-time string comparison.
fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0, |acc, (x, y)| acc | (x ^ y))
        == 0
}
