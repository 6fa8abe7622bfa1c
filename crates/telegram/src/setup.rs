//! Deferred, run-once webhook setup.
//!
//! The sequence is: initialize the bot client, then register the public
//! webhook URL. It runs on the first request of any kind, never at process
//! start, and concurrent first requests all wait on the same attempt.

use std::sync::{
    Arc,
    atomic::{AtomicU8, Ordering},
};

use {
    async_trait::async_trait,
    tokio::sync::OnceCell,
    tracing::{debug, info},
    url::Url,
};

use crate::error::SetupError;

/// The two one-time steps. Each may be called again after it failed.
#[async_trait]
pub trait BotSetup: Send + Sync {
    async fn initialize(&self) -> Result<(), SetupError>;
    async fn register_webhook(&self, url: &Url) -> Result<(), SetupError>;
}

const PENDING: u8 = 0;
const IN_PROGRESS: u8 = 1;
const DONE: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupState {
    Pending,
    InProgress,
    Done,
}

impl SetupState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Done => "done",
        }
    }
}

pub struct SetupGuard {
    steps: Arc<dyn BotSetup>,
    webhook_url: Option<String>,
    webhook_path: String,
    initialized: OnceCell<()>,
    registered: OnceCell<()>,
    phase: AtomicU8,
}

impl SetupGuard {
    #[must_use]
    pub fn new(
        steps: Arc<dyn BotSetup>,
        webhook_url: Option<String>,
        webhook_path: impl Into<String>,
    ) -> Self {
        Self {
            steps,
            webhook_url,
            webhook_path: webhook_path.into(),
            initialized: OnceCell::new(),
            registered: OnceCell::new(),
            phase: AtomicU8::new(PENDING),
        }
    }

    #[must_use]
    pub fn state(&self) -> SetupState {
        match self.phase.load(Ordering::Acquire) {
            DONE => SetupState::Done,
            IN_PROGRESS => SetupState::InProgress,
            _ => SetupState::Pending,
        }
    }

    /// Full URL the webhook is registered at: the public base URL joined
    /// with the webhook path.
    pub fn registration_target(&self) -> Result<Url, SetupError> {
        let base = self
            .webhook_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or(SetupError::MissingWebhookUrl)?;
        let raw = format!(
            "{}/{}",
            base.trim_end_matches('/'),
            self.webhook_path.trim_start_matches('/')
        );
        Url::parse(&raw).map_err(|source| SetupError::InvalidWebhookUrl { url: raw, source })
    }

    /// Run the setup sequence unless it already completed.
    ///
    /// The webhook URL is checked before any platform call, so a missing or
    /// malformed URL fails without network traffic. Initialization runs at
    /// most once per process even if registration later fails. A failed
    /// attempt leaves the guard pending so the next request retries.
    pub async fn ensure(&self) -> Result<(), SetupError> {
        if self.registered.initialized() {
            return Ok(());
        }
        let target = self.registration_target()?;

        // Only the caller running a step moves the phase, so a failure can
        // never overwrite the state of an attempt another caller started.
        self.initialized
            .get_or_try_init(|| async {
                self.phase.store(IN_PROGRESS, Ordering::Release);
                debug!("initializing telegram client");
                self.steps
                    .initialize()
                    .await
                    .inspect_err(|_| self.phase.store(PENDING, Ordering::Release))
            })
            .await?;

        self.registered
            .get_or_try_init(|| async {
                self.phase.store(IN_PROGRESS, Ordering::Release);
                match self.steps.register_webhook(&target).await {
                    Ok(()) => {
                        self.phase.store(DONE, Ordering::Release);
                        info!(url = %target, "webhook setup finished");
                        Ok(())
                    },
                    Err(e) => {
                        self.phase.store(PENDING, Ordering::Release);
                        Err(e)
                    },
                }
            })
            .await?;
        Ok(())
    }
}
