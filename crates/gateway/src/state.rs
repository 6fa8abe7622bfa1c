use std::sync::Arc;

use {
    drivebot_telegram::{SetupGuard, UpdateHandler},
    secrecy::Secret,
};

/// Shared gateway state, wrapped in Arc for use across handlers.
pub struct GatewayState {
    /// Consumes decoded webhook pushes.
    pub updates: Arc<dyn UpdateHandler>,
    /// One-time webhook registration.
    pub setup: Arc<SetupGuard>,
    /// Path Telegram pushes to, always starting with `/`.
    pub webhook_path: String,
    /// Expected `X-Telegram-Bot-Api-Secret-Token`, when configured.
    pub secret_token: Option<Secret<String>>,
    pub version: String,
}

impl GatewayState {
    pub fn new(
        updates: Arc<dyn UpdateHandler>,
        setup: Arc<SetupGuard>,
        webhook_path: &str,
        secret_token: Option<Secret<String>>,
    ) -> Arc<Self> {
        let webhook_path = if webhook_path.starts_with('/') {
            webhook_path.to_string()
        } else {
            format!("/{webhook_path}")
        };
        Arc::new(Self {
            updates,
            setup,
            webhook_path,
            secret_token,
            version: env!("CARGO_PKG_VERSION").to_string(),
        })
    }
}
