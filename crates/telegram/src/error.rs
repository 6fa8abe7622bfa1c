use {
    teloxide::{DownloadError, RequestError},
    thiserror::Error,
};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Telegram(#[from] RequestError),

    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error(transparent)]
    Drive(#[from] drivebot_drive::Error),

    #[error("worker task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),

    /// The file is above what the Bot API lets bots download.
    #[error("file exceeds the {limit_mb} MB download limit")]
    FileTooBig { size: Option<u64>, limit_mb: u64 },

    #[error("{message}")]
    Message { message: String },
}

impl Error {
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }

    /// Map an error to the failure category reported to the user.
    #[must_use]
    pub fn classify(&self) -> Failure {
        match self {
            Self::FileTooBig { limit_mb, .. } => Failure::Oversized {
                limit_mb: *limit_mb,
            },
            Self::Telegram(
                e @ (RequestError::Api(_)
                | RequestError::RetryAfter(_)
                | RequestError::MigrateToChatId(_)
                | RequestError::InvalidJson { .. }),
            ) => Failure::Protocol(e.to_string()),
            other => Failure::Unclassified(other.to_string()),
        }
    }
}

/// How a failed relay is surfaced to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// Source payload above the platform's transfer ceiling. Never retried.
    Oversized { limit_mb: u64 },
    /// Error reported by the Bot API itself; carries its detail text.
    Protocol(String),
    /// Anything else: network faults, Drive credential errors, worker panics.
    Unclassified(String),
}

/// Whether the Bot API refused a download because of its size ceiling.
///
/// The Bot API reports this only as free text ("Bad Request: file is too
/// big"), so it is matched here and nowhere else.
pub(crate) fn is_file_too_big(err: &RequestError) -> bool {
    match err {
        RequestError::Api(api) => api
            .to_string()
            .to_ascii_lowercase()
            .contains("file is too big"),
        _ => false,
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Errors from the one-time webhook setup sequence.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("WEBHOOK_URL is not configured")]
    MissingWebhookUrl,

    #[error("invalid webhook URL {url}: {source}")]
    InvalidWebhookUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("invalid Bot API URL {url}: {source}")]
    InvalidApiUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// Boxed so the variant does not pin the HTTP client version the Bot API
    /// crate links against.
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error(transparent)]
    Telegram(#[from] RequestError),
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, teloxide::ApiError};

    #[test]
    fn oversized_is_classified_with_its_limit() {
        let err = Error::FileTooBig {
            size: Some(30 * 1024 * 1024),
            limit_mb: 20,
        };
        assert_eq!(err.classify(), Failure::Oversized { limit_mb: 20 });
    }

    #[test]
    fn api_errors_are_protocol_failures() {
        let err = Error::Telegram(RequestError::Api(ApiError::Unknown(
            "Bad Request: wrong file_id".into(),
        )));
        match err.classify() {
            Failure::Protocol(detail) => assert!(detail.contains("wrong file_id"), "{detail}"),
            other => panic!("expected protocol failure, got {other:?}"),
        }
    }

    #[test]
    fn drive_errors_are_unclassified() {
        let err = Error::Drive(drivebot_drive::Error::message("invalid_grant"));
        assert_eq!(err.classify(), Failure::Unclassified("invalid_grant".into()));
    }

    #[test]
    fn client_build_errors_keep_their_source() {
        let err = SetupError::Client(Box::new(std::io::Error::other("no TLS backend")));
        assert_eq!(err.to_string(), "failed to build HTTP client: no TLS backend");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn detects_file_too_big_text() {
        let err = RequestError::Api(ApiError::Unknown("Bad Request: file is too big".into()));
        assert!(is_file_too_big(&err));

        let other = RequestError::Api(ApiError::Unknown("Bad Request: chat not found".into()));
        assert!(!is_file_too_big(&other));
    }
}
