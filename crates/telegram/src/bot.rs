use std::time::Duration;

use {
    async_trait::async_trait,
    secrecy::{ExposeSecret, Secret},
    teloxide::{
        payloads::SetWebhookSetters,
        prelude::*,
        types::{AllowedUpdate, BotCommand},
    },
    tracing::{info, warn},
    url::Url,
};

use drivebot_config::TelegramConfig;

use crate::{error::SetupError, setup::BotSetup};

/// Client timeout; downloads of files near the size ceiling share it.
const CLIENT_TIMEOUT: Duration = Duration::from_secs(120);

/// Build the Bot API client from config, honouring a custom API server.
pub fn build_bot(config: &TelegramConfig) -> Result<Bot, SetupError> {
    let client = teloxide::net::default_reqwest_settings()
        .timeout(CLIENT_TIMEOUT)
        .build()
        .map_err(|e| SetupError::Client(Box::new(e)))?;
    let bot = Bot::with_client(config.token.expose_secret(), client);
    match config.api_url.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
        Some(raw) => {
            let url = Url::parse(raw).map_err(|source| SetupError::InvalidApiUrl {
                url: raw.to_string(),
                source,
            })?;
            Ok(bot.set_api_url(url))
        },
        None => Ok(bot),
    }
}

/// The real setup steps against the Bot API.
pub struct TelegramSetup {
    bot: Bot,
    secret_token: Option<Secret<String>>,
}

impl TelegramSetup {
    #[must_use]
    pub fn new(bot: Bot, secret_token: Option<Secret<String>>) -> Self {
        Self { bot, secret_token }
    }
}

#[async_trait]
impl BotSetup for TelegramSetup {
    async fn initialize(&self) -> Result<(), SetupError> {
        let me = self.bot.get_me().await?;

        let commands = vec![BotCommand::new("start", "How to use this bot")];
        if let Err(e) = self.bot.set_my_commands(commands).await {
            warn!("failed to register bot commands: {e}");
        }

        info!(username = ?me.username, "telegram bot initialized");
        Ok(())
    }

    async fn register_webhook(&self, url: &Url) -> Result<(), SetupError> {
        let mut request = self
            .bot
            .set_webhook(url.clone())
            .allowed_updates(vec![AllowedUpdate::Message]);
        if let Some(secret) = &self.secret_token {
            request = request.secret_token(secret.expose_secret().clone());
        }
        request.await?;
        info!(%url, "telegram webhook registered");
        Ok(())
    }
}
