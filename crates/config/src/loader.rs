use std::path::{Path, PathBuf};

use {
    secrecy::Secret,
    tracing::{debug, warn},
};

use crate::{
    env_subst::substitute_env,
    error::{Context, Error, Result},
    schema::RelayConfig,
};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "drivebot.toml",
    "drivebot.yaml",
    "drivebot.yml",
    "drivebot.json",
];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> Result<RelayConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./drivebot.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/drivebot/drivebot.{toml,yaml,yml,json}` (user-global)
///
/// Returns `RelayConfig::default()` if no config file is found; hosted
/// deployments usually configure everything through the environment.
pub fn discover_and_load() -> RelayConfig {
    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }
    RelayConfig::default()
}

/// Find the first config file in standard locations.
fn find_config_file() -> Option<PathBuf> {
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    let config_dir = config_dir()?;
    CONFIG_FILENAMES
        .iter()
        .map(|name| config_dir.join(name))
        .find(|p| p.exists())
}

/// Returns the user-global config directory (`~/.config/drivebot/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "drivebot").map(|d| d.config_dir().to_path_buf())
}

/// Apply environment variable overrides on top of file-based config.
///
/// The environment always wins: hosted platforms inject secrets this way.
pub fn apply_env_overrides(config: RelayConfig) -> RelayConfig {
    apply_env_overrides_with(config, |name| std::env::var(name).ok())
}

pub(crate) fn apply_env_overrides_with(
    mut config: RelayConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> RelayConfig {
    let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(token) = var("TELEGRAM_TOKEN") {
        config.telegram.token = Secret::new(token);
    }
    if let Some(secret) = var("TELEGRAM_SECRET_TOKEN") {
        config.telegram.secret_token = Some(Secret::new(secret));
    }
    if let Some(api_url) = var("TELEGRAM_API_URL") {
        config.telegram.api_url = Some(api_url);
    }
    if let Some(url) = var("WEBHOOK_URL") {
        config.telegram.webhook_url = Some(url);
    }
    if let Some(path) = var("WEBHOOK_PATH") {
        config.telegram.webhook_path = path;
    }
    if let Some(mb) = parse_var(&var, "MAX_DOWNLOAD_MB") {
        config.telegram.max_download_mb = mb;
    }
    if let Some(folder) = var("GOOGLE_DRIVE_FOLDER_ID") {
        config.drive.folder_id = folder;
    }
    if let Some(path) = var("GOOGLE_APPLICATION_CREDENTIALS") {
        config.drive.credentials_file = Some(PathBuf::from(path));
    }
    if let Some(json) = var("GOOGLE_CREDENTIALS_JSON") {
        config.drive.credentials_json = Some(Secret::new(json));
    }
    if let Some(bind) = var("BIND") {
        config.server.bind = bind;
    }
    if let Some(port) = parse_var(&var, "PORT") {
        config.server.port = port;
    }
    if let Some(n) = parse_var(&var, "MAX_CONCURRENT_TRANSFERS") {
        config.transfers.max_concurrent = n;
    }

    config
}

fn parse_var<T: std::str::FromStr>(var: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T>
where
    T::Err: std::fmt::Display,
{
    let raw = var(name)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(var = name, value = %raw, error = %e, "ignoring unparseable environment override");
            None
        },
    }
}

fn parse_config(raw: &str, path: &Path) -> Result<RelayConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => toml::from_str(raw).context("invalid TOML config"),
        "yaml" | "yml" => serde_yaml::from_str(raw).context("invalid YAML config"),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => Err(Error::message(format!("unsupported config format: .{ext}"))),
    }
}
