//! HTTP front of the relay.
//!
//! Serves the Telegram webhook plus a few operational routes. Every request
//! first passes through the deferred setup guard, so the webhook gets
//! registered on the first hit of any route.

pub mod server;
pub mod setup_middleware;
pub mod state;
pub mod webhook;
