mod check_command;

use std::{path::PathBuf, sync::Arc, time::Duration};

use {
    anyhow::Context,
    clap::{Parser, Subcommand},
    secrecy::ExposeSecret,
    tracing::{error, info, warn},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use {
    drivebot_config::{CredentialSource, RelayConfig, Severity},
    drivebot_drive::{DriveUploader, ServiceAccountCredentials, ServiceAccountKey},
    drivebot_gateway::{server::start_gateway, state::GatewayState},
    drivebot_telegram::{RelayPipeline, SetupGuard, TelegramSetup, UpdateProcessor, build_bot},
};

#[derive(Parser)]
#[command(name = "drivebot", about = "DriveBot: save Telegram files to Google Drive")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file (skips discovery of drivebot.{toml,yaml,json}).
    #[arg(long, global = true, env = "DRIVEBOT_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind to (overrides config value).
    #[arg(long, global = true)]
    bind: Option<String>,
    /// Port to listen on (overrides config value).
    #[arg(long, global = true)]
    port: Option<u16>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the webhook server (default when no subcommand is provided).
    Serve,
    /// Validate the configuration and report errors/warnings.
    Check {
        /// Show informational diagnostics in addition to errors and warnings.
        #[arg(long)]
        verbose: bool,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

/// File (explicit or discovered), then environment on top.
fn load_config(cli: &Cli) -> anyhow::Result<RelayConfig> {
    let config = match &cli.config {
        Some(path) => drivebot_config::load_config(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => drivebot_config::discover_and_load(),
    };
    Ok(drivebot_config::apply_env_overrides(config))
}

async fn serve(config: RelayConfig, bind: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    let report = drivebot_config::validate(&config);
    for d in &report.diagnostics {
        match d.severity {
            Severity::Error => error!(path = %d.path, "{}", d.message),
            Severity::Warning => warn!(path = %d.path, "{}", d.message),
            Severity::Info => info!(path = %d.path, "{}", d.message),
        }
    }
    if report.has_errors() {
        anyhow::bail!(
            "configuration has {} error(s); run `drivebot check` for details",
            report.count(Severity::Error)
        );
    }

    let bot = build_bot(&config.telegram)?;

    let timeout = Duration::from_secs(config.drive.request_timeout_secs);
    let key = match config.drive.credential_source() {
        CredentialSource::Inline(json) => ServiceAccountKey::from_json(json.expose_secret())?,
        CredentialSource::File(path) => ServiceAccountKey::from_file(&path)?,
    };
    let credentials = ServiceAccountCredentials::new(key, timeout);
    info!(
        client_email = credentials.client_email(),
        folder_id = %config.drive.folder_id,
        "drive service account loaded"
    );
    let uploader = DriveUploader::new(config.drive.api_base_url.clone(), timeout);

    let pipeline = Arc::new(RelayPipeline::new(
        bot.clone(),
        Arc::new(credentials),
        Arc::new(uploader),
        config.drive.folder_id.clone(),
        config.telegram.max_download_mb,
        config.transfers.max_concurrent,
    ));
    let processor = Arc::new(UpdateProcessor::new(bot.clone(), pipeline));

    let secret_token = config
        .telegram
        .secret_token
        .clone()
        .filter(|s| !s.expose_secret().trim().is_empty());
    let setup = Arc::new(SetupGuard::new(
        Arc::new(TelegramSetup::new(bot, secret_token.clone())),
        config.telegram.webhook_url.clone(),
        config.telegram.webhook_path.clone(),
    ));
    let state = GatewayState::new(
        processor,
        setup,
        &config.telegram.webhook_path,
        secret_token,
    );

    let bind = bind.unwrap_or(config.server.bind);
    let port = port.unwrap_or(config.server.port);
    start_gateway(state, &bind, port).await
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "drivebot starting");

    let config = load_config(&cli)?;
    match cli.command {
        None | Some(Commands::Serve) => serve(config, cli.bind, cli.port).await,
        Some(Commands::Check { verbose }) => check_command::check(&config, verbose),
    }
}
