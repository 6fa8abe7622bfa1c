use std::sync::Arc;

use {
    async_trait::async_trait,
    teloxide::{
        payloads::SendMessageSetters,
        prelude::*,
        types::{ReplyParameters, Update, UpdateKind},
    },
    tracing::{debug, error, info},
};

use crate::{messages, pipeline::RelayPipeline};

/// Entry point for one decoded webhook push.
///
/// Infallible: whatever goes wrong while handling an update is logged here,
/// so a push is never answered with an error once it has been decoded.
#[async_trait]
pub trait UpdateHandler: Send + Sync {
    async fn process_update(&self, update: Update);
}

/// Routes updates: `/start` gets the greeting, every other message goes
/// through the relay pipeline, anything that is not a message is ignored.
pub struct UpdateProcessor {
    bot: Bot,
    pipeline: Arc<RelayPipeline>,
}

impl UpdateProcessor {
    #[must_use]
    pub fn new(bot: Bot, pipeline: Arc<RelayPipeline>) -> Self {
        Self { bot, pipeline }
    }

    async fn handle_message(&self, msg: Message) {
        if is_start_command(&msg) {
            debug!(chat_id = msg.chat.id.0, "start command");
            if let Err(e) = self
                .bot
                .send_message(msg.chat.id, messages::GREETING)
                .reply_parameters(ReplyParameters::new(msg.id))
                .await
            {
                error!(chat_id = msg.chat.id.0, error = %e, "failed to send greeting");
            }
            return;
        }

        let outcome = self.pipeline.relay(&msg).await;
        info!(chat_id = msg.chat.id.0, outcome = ?outcome, "relay finished");
    }
}

#[async_trait]
impl UpdateHandler for UpdateProcessor {
    async fn process_update(&self, update: Update) {
        match update.kind {
            UpdateKind::Message(msg) => self.handle_message(msg).await,
            _ => debug!(update_id = update.id.0, "ignoring non-message update"),
        }
    }
}

/// `/start`, optionally addressed as `/start@botname` or with a payload.
fn is_start_command(msg: &Message) -> bool {
    msg.text()
        .and_then(|t| t.split_whitespace().next())
        .and_then(|cmd| cmd.split('@').next())
        .is_some_and(|cmd| cmd == "/start")
}
