//! Config schema for the relay: Telegram, Google Drive, HTTP server and
//! transfer limits.
use std::path::PathBuf;

use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Service-account file used when neither a path nor inline JSON is configured.
pub const DEFAULT_CREDENTIALS_FILE: &str = "google_creds.json";

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub telegram: TelegramConfig,
    pub drive: DriveConfig,
    pub server: ServerConfig,
    pub transfers: TransferConfig,
}

/// Telegram bot settings.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Bot token from @BotFather.
    #[serde(serialize_with = "serialize_secret")]
    pub token: Secret<String>,

    /// Public base URL of this service, e.g. `https://drivebot.onrender.com`.
    /// The webhook is registered at `webhook_url + webhook_path`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,

    /// Path Telegram pushes updates to. Use a hard-to-guess value to keep
    /// the endpoint private.
    pub webhook_path: String,

    /// Value Telegram echoes in `X-Telegram-Bot-Api-Secret-Token`.
    #[serde(
        default,
        serialize_with = "serialize_option_secret",
        skip_serializing_if = "Option::is_none"
    )]
    pub secret_token: Option<Secret<String>>,

    /// Custom Bot API server (a self-hosted server lifts the download ceiling).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// Largest file the Bot API lets bots download, in megabytes.
    pub max_download_mb: u64,
}

impl TelegramConfig {
    #[must_use]
    pub fn max_download_bytes(&self) -> u64 {
        self.max_download_mb.saturating_mul(1024 * 1024)
    }
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("token", &"[REDACTED]")
            .field("webhook_url", &self.webhook_url)
            .field("webhook_path", &self.webhook_path)
            .field("api_url", &self.api_url)
            .field("max_download_mb", &self.max_download_mb)
            .finish_non_exhaustive()
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: Secret::new(String::new()),
            webhook_url: None,
            webhook_path: "/webhook".into(),
            secret_token: None,
            api_url: None,
            max_download_mb: 20,
        }
    }
}

/// Google Drive destination and service-account credentials.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    /// ID of the folder uploads land in. The folder must be shared with the
    /// service account's `client_email`.
    pub folder_id: String,

    /// Path to the service-account JSON key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials_file: Option<PathBuf>,

    /// Inline service-account JSON key. Takes precedence over the file.
    #[serde(
        default,
        serialize_with = "serialize_option_secret",
        skip_serializing_if = "Option::is_none"
    )]
    pub credentials_json: Option<Secret<String>>,

    /// Base URL of the Drive API.
    pub api_base_url: String,

    /// Per-request timeout for Drive and token calls, in seconds.
    pub request_timeout_secs: u64,
}

/// Where the service-account key comes from.
#[derive(Clone)]
pub enum CredentialSource {
    File(PathBuf),
    Inline(Secret<String>),
}

impl std::fmt::Debug for CredentialSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File(path) => f.debug_tuple("File").field(path).finish(),
            Self::Inline(_) => f.write_str("Inline([REDACTED])"),
        }
    }
}

impl DriveConfig {
    /// Resolve the credential source: inline JSON, then the configured file,
    /// then [`DEFAULT_CREDENTIALS_FILE`].
    #[must_use]
    pub fn credential_source(&self) -> CredentialSource {
        if let Some(json) = self
            .credentials_json
            .as_ref()
            .filter(|s| !s.expose_secret().trim().is_empty())
        {
            return CredentialSource::Inline(json.clone());
        }
        CredentialSource::File(
            self.credentials_file
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CREDENTIALS_FILE)),
        )
    }
}

impl std::fmt::Debug for DriveConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriveConfig")
            .field("folder_id", &self.folder_id)
            .field("credentials", &self.credential_source())
            .field("api_base_url", &self.api_base_url)
            .finish_non_exhaustive()
    }
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            folder_id: String::new(),
            credentials_file: None,
            credentials_json: None,
            api_base_url: "https://www.googleapis.com".into(),
            request_timeout_secs: 300,
        }
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to. Defaults to "0.0.0.0" so hosted platforms can reach it.
    pub bind: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".into(),
            port: 8080,
        }
    }
}

/// Limits on concurrently running transfers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Files fetched and uploaded at the same time. Every in-flight file is
    /// held fully in memory, so size this to memory / largest file.
    pub max_concurrent: usize,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self { max_concurrent: 4 }
    }
}

// ── Serde helpers for Secret<String> ────────────────────────────────────────

fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

fn serialize_option_secret<S: serde::Serializer>(
    secret: &Option<Secret<String>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match secret {
        Some(s) => serializer.serialize_some(s.expose_secret()),
        None => serializer.serialize_none(),
    }
}
