//! Telegram side of the relay.
//!
//! Turns webhook updates into Drive uploads with teloxide: [`route`] picks
//! the attachment, [`RelayPipeline`] fetches and uploads it while editing a
//! single status message, and [`SetupGuard`] registers the webhook once on
//! first use.

pub mod bot;
pub mod error;
pub mod handlers;
pub mod messages;
pub mod pipeline;
pub mod router;
pub mod setup;
pub mod status;

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod test_support;

pub use {
    bot::{TelegramSetup, build_bot},
    error::{Error, Failure, Result, SetupError},
    handlers::{UpdateHandler, UpdateProcessor},
    pipeline::{RelayOutcome, RelayPipeline},
    router::{InboundFileRef, SourceKind, route},
    setup::{BotSetup, SetupGuard, SetupState},
    status::StatusHandle,
};
