//! Configuration loading, environment overrides and startup validation.
//!
//! Config files: `drivebot.toml`, `drivebot.yaml`, or `drivebot.json`,
//! searched in `./` then `~/.config/drivebot/`. Environment variables
//! override file values, and `${ENV_VAR}` placeholders are substituted in
//! file contents.

pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    loader::{apply_env_overrides, config_dir, discover_and_load, load_config},
    schema::{
        CredentialSource, DEFAULT_CREDENTIALS_FILE, DriveConfig, RelayConfig, ServerConfig,
        TelegramConfig, TransferConfig,
    },
    validate::{Diagnostic, Severity, ValidationResult, validate},
};
