//! Shared error definitions used across the drivebot crates.

pub mod error;

pub use error::{Error, FromMessage, Result};
