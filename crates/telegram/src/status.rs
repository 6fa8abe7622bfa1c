use {
    teloxide::{
        payloads::{EditMessageTextSetters, SendMessageSetters},
        prelude::*,
        types::{ChatId, LinkPreviewOptions, MessageId, ParseMode, ReplyParameters},
    },
    tracing::{debug, warn},
};

use crate::error::Result;

/// The single progress message of one relay, edited in place at each phase.
///
/// Not `Clone`: exactly one pipeline invocation owns it.
#[derive(Debug)]
pub struct StatusHandle {
    bot: Bot,
    chat_id: ChatId,
    message_id: MessageId,
}

impl StatusHandle {
    /// Send the first status text as a reply to `reply_to` and keep a handle
    /// on it.
    pub async fn send(bot: &Bot, chat_id: ChatId, reply_to: MessageId, text: &str) -> Result<Self> {
        let sent = bot
            .send_message(chat_id, text)
            .reply_parameters(ReplyParameters::new(reply_to))
            .await?;
        debug!(chat_id = chat_id.0, message_id = sent.id.0, "status message sent");
        Ok(Self {
            bot: bot.clone(),
            chat_id,
            message_id: sent.id,
        })
    }

    /// Replace the status text (plain text, so error details need no escaping).
    pub async fn update(&mut self, text: &str) -> Result<()> {
        self.bot
            .edit_message_text(self.chat_id, self.message_id, text)
            .await?;
        Ok(())
    }

    /// Replace the status text with HTML, link preview suppressed. Falls back
    /// to `plain` if Telegram refuses the markup.
    pub async fn finish_html(&mut self, html: &str, plain: &str) -> Result<()> {
        let rich = self
            .bot
            .edit_message_text(self.chat_id, self.message_id, html)
            .parse_mode(ParseMode::Html)
            .link_preview_options(no_link_preview())
            .await;
        match rich {
            Ok(_) => Ok(()),
            Err(e) => {
                warn!(
                    chat_id = self.chat_id.0,
                    error = %e,
                    "telegram HTML edit failed, retrying as plain text"
                );
                self.bot
                    .edit_message_text(self.chat_id, self.message_id, plain)
                    .link_preview_options(no_link_preview())
                    .await?;
                Ok(())
            },
        }
    }
}

fn no_link_preview() -> LinkPreviewOptions {
    LinkPreviewOptions {
        is_disabled: true,
        url: None,
        prefer_small_media: false,
        prefer_large_media: false,
        show_above_text: false,
    }
}
