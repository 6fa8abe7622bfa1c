//! Startup validation.
//!
//! Checks that everything the relay needs to do useful work is present and
//! well-formed, and reports problems as diagnostics rather than failing on
//! the first one.

use {secrecy::ExposeSecret, url::Url};

use crate::schema::{CredentialSource, RelayConfig};

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Category: "missing", "invalid", "file-ref"
    pub category: &'static str,
    /// Dotted path, e.g. "drive.folder_id"
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] {}: {}",
            self.severity, self.category, self.path, self.message
        )
    }
}

/// Result of validating a configuration.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Count diagnostics by severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    fn push(
        &mut self,
        severity: Severity,
        category: &'static str,
        path: &str,
        message: impl Into<String>,
    ) {
        self.diagnostics.push(Diagnostic {
            severity,
            category,
            path: path.to_string(),
            message: message.into(),
        });
    }
}

/// Routes the gateway serves itself; the webhook cannot share them.
const RESERVED_PATHS: &[&str] = &["/", "/health", "/setup"];

/// Validate a fully resolved config (file + environment overrides).
#[must_use]
pub fn validate(config: &RelayConfig) -> ValidationResult {
    let mut result = ValidationResult::default();

    if config.telegram.token.expose_secret().trim().is_empty() {
        result.push(
            Severity::Error,
            "missing",
            "telegram.token",
            "bot token is required (set TELEGRAM_TOKEN)",
        );
    }

    match config.telegram.webhook_url.as_deref() {
        None => result.push(
            Severity::Warning,
            "missing",
            "telegram.webhook_url",
            "no public URL (WEBHOOK_URL); the webhook will not be registered",
        ),
        Some(raw) => match Url::parse(raw) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {
                if url.scheme() == "http" {
                    result.push(
                        Severity::Warning,
                        "invalid",
                        "telegram.webhook_url",
                        "Telegram only delivers webhooks over HTTPS",
                    );
                }
            },
            Ok(url) => result.push(
                Severity::Error,
                "invalid",
                "telegram.webhook_url",
                format!("unsupported scheme \"{}\"", url.scheme()),
            ),
            Err(e) => result.push(
                Severity::Error,
                "invalid",
                "telegram.webhook_url",
                format!("not a valid URL: {e}"),
            ),
        },
    }

    if !config.telegram.webhook_path.starts_with('/') {
        result.push(
            Severity::Error,
            "invalid",
            "telegram.webhook_path",
            "must start with '/'",
        );
    } else if RESERVED_PATHS.contains(&config.telegram.webhook_path.as_str()) {
        result.push(
            Severity::Error,
            "invalid",
            "telegram.webhook_path",
            format!(
                "\"{}\" is already served by the gateway",
                config.telegram.webhook_path
            ),
        );
    }

    if let Some(api_url) = config.telegram.api_url.as_deref()
        && let Err(e) = Url::parse(api_url)
    {
        result.push(
            Severity::Error,
            "invalid",
            "telegram.api_url",
            format!("not a valid URL: {e}"),
        );
    }

    if config.telegram.max_download_mb == 0 {
        result.push(
            Severity::Error,
            "invalid",
            "telegram.max_download_mb",
            "must be greater than zero",
        );
    }

    if config.drive.folder_id.trim().is_empty() {
        result.push(
            Severity::Error,
            "missing",
            "drive.folder_id",
            "destination folder is required (set GOOGLE_DRIVE_FOLDER_ID)",
        );
    }

    if let CredentialSource::File(path) = config.drive.credential_source()
        && !path.is_file()
    {
        result.push(
            Severity::Error,
            "file-ref",
            "drive.credentials_file",
            format!("service account key not found at {}", path.display()),
        );
    }

    if let Err(e) = Url::parse(&config.drive.api_base_url) {
        result.push(
            Severity::Error,
            "invalid",
            "drive.api_base_url",
            format!("not a valid URL: {e}"),
        );
    }

    if config.server.port == 0 {
        result.push(Severity::Error, "invalid", "server.port", "must not be 0");
    }

    if config.transfers.max_concurrent == 0 {
        result.push(
            Severity::Error,
            "invalid",
            "transfers.max_concurrent",
            "must allow at least one transfer",
        );
    }

    if config.telegram.secret_token.is_none() && config.telegram.webhook_path == "/webhook" {
        result.push(
            Severity::Info,
            "missing",
            "telegram.secret_token",
            "webhook is on the default path without a secret token",
        );
    }

    result
}
