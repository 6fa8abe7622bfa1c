//! The relay pipeline: one inbound file message in, one Drive link (or a
//! classified failure) out, reported through a single editable status message.

use std::sync::Arc;

use {
    teloxide::{net::Download, payloads::SendMessageSetters, prelude::*, types::ReplyParameters},
    tokio::sync::Semaphore,
    tracing::{debug, error, info, instrument, warn},
};

use drivebot_drive::{CredentialProvider, UploadExecutor, UploadResult};

use crate::{
    error::{Error, Failure, Result, is_file_too_big},
    messages,
    router::{InboundFileRef, route},
    status::StatusHandle,
};

/// What became of one relayed message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    /// Nothing relayable in the message; the user was told so.
    Unsupported,
    Uploaded { link: String },
    /// Drive accepted the call but produced no link.
    UploadFailed,
    Failed(Failure),
}

pub struct RelayPipeline {
    bot: Bot,
    credentials: Arc<dyn CredentialProvider>,
    uploader: Arc<dyn UploadExecutor>,
    folder_id: String,
    max_download_mb: u64,
    transfers: Semaphore,
}

impl RelayPipeline {
    #[must_use]
    pub fn new(
        bot: Bot,
        credentials: Arc<dyn CredentialProvider>,
        uploader: Arc<dyn UploadExecutor>,
        folder_id: impl Into<String>,
        max_download_mb: u64,
        max_concurrent: usize,
    ) -> Self {
        Self {
            bot,
            credentials,
            uploader,
            folder_id: folder_id.into(),
            max_download_mb,
            transfers: Semaphore::new(max_concurrent.max(1)),
        }
    }

    fn max_download_bytes(&self) -> u64 {
        self.max_download_mb.saturating_mul(1024 * 1024)
    }

    /// Relay the file carried by `msg`, if any.
    ///
    /// Never fails: transfer failures are reported to the user and returned
    /// as [`RelayOutcome::Failed`], and a chat that cannot be reached (status
    /// message not sent or not editable) is logged. A status message that
    /// cannot be created aborts the relay before anything is fetched.
    #[instrument(skip_all, fields(chat_id = msg.chat.id.0, message_id = msg.id.0))]
    pub async fn relay(&self, msg: &Message) -> RelayOutcome {
        let Some(file) = route(msg) else {
            debug!("message carries no supported attachment");
            if let Err(e) = self
                .bot
                .send_message(msg.chat.id, messages::UNSUPPORTED_FORMAT)
                .reply_parameters(ReplyParameters::new(msg.id))
                .await
            {
                error!(error = %e, "failed to send unsupported-format reply");
            }
            return RelayOutcome::Unsupported;
        };

        info!(
            kind = %file.kind,
            file_name = %file.suggested_name,
            declared_size = file.declared_size,
            "relaying file"
        );
        let mut status =
            match StatusHandle::send(&self.bot, msg.chat.id, msg.id, messages::FETCHING).await {
                Ok(status) => status,
                Err(e) => {
                    error!(error = %e, "failed to send status message, relay abandoned");
                    return RelayOutcome::Failed(e.classify());
                },
            };

        let (outcome, reported) = match self.transfer(&file, &mut status).await {
            Ok(UploadResult::Shared(link)) => {
                info!(file_name = %file.suggested_name, link = %link, "file uploaded");
                let reported = status
                    .finish_html(
                        &messages::uploaded(&link, &file.suggested_name),
                        &messages::uploaded_plain(&link, &file.suggested_name),
                    )
                    .await;
                (RelayOutcome::Uploaded { link }, reported)
            },
            Ok(UploadResult::Failed) => {
                let reported = status.update(messages::UPLOAD_FAILED).await;
                (RelayOutcome::UploadFailed, reported)
            },
            Err(e) => {
                let failure = e.classify();
                let text = match &failure {
                    Failure::Oversized { limit_mb } => {
                        warn!(file_name = %file.suggested_name, limit_mb, "file too large to fetch");
                        messages::too_large(*limit_mb)
                    },
                    Failure::Protocol(detail) => {
                        error!(file_name = %file.suggested_name, error = %detail, "telegram rejected the transfer");
                        messages::telegram_error(detail)
                    },
                    Failure::Unclassified(detail) => {
                        error!(file_name = %file.suggested_name, error = %detail, "relay failed");
                        messages::failed(detail)
                    },
                };
                let reported = status.update(&text).await;
                (RelayOutcome::Failed(failure), reported)
            },
        };
        if let Err(e) = reported {
            error!(error = %e, ?outcome, "failed to report relay outcome in chat");
        }
        outcome
    }

    /// Fetch then upload, holding one transfer permit for the whole time the
    /// file sits in memory.
    async fn transfer(&self, file: &InboundFileRef, status: &mut StatusHandle) -> Result<UploadResult> {
        let _permit = self
            .transfers
            .acquire()
            .await
            .map_err(|_| Error::message("transfer pool closed"))?;

        let bytes = self.fetch(file).await?;
        debug!(bytes = bytes.len(), "file fetched");
        if let Err(e) = status.update(messages::UPLOADING).await {
            error!(error = %e, "failed to update status message");
        }

        let credentials = Arc::clone(&self.credentials);
        let service = tokio::task::spawn_blocking(move || credentials.authorize()).await??;

        let uploader = Arc::clone(&self.uploader);
        let folder_id = self.folder_id.clone();
        let name = file.suggested_name.clone();
        let result = tokio::task::spawn_blocking(move || {
            uploader.upload(&service, bytes, &folder_id, &name)
        })
        .await?;
        Ok(result)
    }

    async fn fetch(&self, file: &InboundFileRef) -> Result<Vec<u8>> {
        let limit_mb = self.max_download_mb;
        if let Some(size) = file.declared_size
            && size > self.max_download_bytes()
        {
            return Err(Error::FileTooBig {
                size: Some(size),
                limit_mb,
            });
        }

        let remote = self.bot.get_file(file.file_id.clone()).await.map_err(|e| {
            if is_file_too_big(&e) {
                Error::FileTooBig {
                    size: file.declared_size,
                    limit_mb,
                }
            } else {
                Error::from(e)
            }
        })?;

        let capacity = usize::try_from(remote.meta.size).unwrap_or_default();
        let mut buf = Vec::with_capacity(capacity);
        self.bot.download_file(&remote.path, &mut buf).await?;
        Ok(buf)
    }
}
