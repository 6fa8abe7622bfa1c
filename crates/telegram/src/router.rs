//! Classifies an inbound message into a relayable file or nothing.

use teloxide::types::{FileMeta, MediaKind, Message, MessageKind};

/// Attachment kinds the relay accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Document,
    Video,
    Photo,
    Audio,
}

impl SourceKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Video => "video",
            Self::Photo => "photo",
            Self::Audio => "audio",
        }
    }

    /// Extension used when the platform sends no file name.
    fn default_extension(self) -> Option<&'static str> {
        match self {
            Self::Document => None,
            Self::Video => Some("mp4"),
            Self::Photo => Some("jpg"),
            Self::Audio => Some("mp3"),
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file to relay, extracted from one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundFileRef {
    pub kind: SourceKind,
    pub file_id: String,
    /// Never empty.
    pub suggested_name: String,
    /// Size the platform declared for the file, when it declared one.
    pub declared_size: Option<u64>,
}

impl InboundFileRef {
    fn new(kind: SourceKind, file: &FileMeta, declared_name: Option<&str>) -> Self {
        let suggested_name = match declared_name.map(str::trim).filter(|n| !n.is_empty()) {
            Some(name) => name.to_string(),
            None => synthesize_name(kind, &file.unique_id),
        };
        Self {
            kind,
            file_id: file.id.clone(),
            suggested_name,
            declared_size: (file.size > 0).then_some(u64::from(file.size)),
        }
    }
}

fn synthesize_name(kind: SourceKind, unique_id: &str) -> String {
    match kind.default_extension() {
        Some(ext) => format!("{kind}_{unique_id}.{ext}"),
        // Documents always carry a name; if one ever arrives without, the
        // unique id alone still gives Drive a stable, non-empty name.
        None => unique_id.to_string(),
    }
}

/// Pick the file to relay from `msg`.
///
/// Precedence is document, video, photo, audio. For photos the last size
/// variant is taken: Telegram orders them smallest to largest.
#[must_use]
pub fn route(msg: &Message) -> Option<InboundFileRef> {
    let MessageKind::Common(common) = &msg.kind else {
        return None;
    };
    match &common.media_kind {
        MediaKind::Document(d) => Some(InboundFileRef::new(
            SourceKind::Document,
            &d.document.file,
            d.document.file_name.as_deref(),
        )),
        MediaKind::Video(v) => Some(InboundFileRef::new(
            SourceKind::Video,
            &v.video.file,
            v.video.file_name.as_deref(),
        )),
        MediaKind::Photo(p) => p
            .photo
            .last()
            .map(|largest| InboundFileRef::new(SourceKind::Photo, &largest.file, None)),
        MediaKind::Audio(a) => Some(InboundFileRef::new(
            SourceKind::Audio,
            &a.audio.file,
            a.audio.file_name.as_deref(),
        )),
        _ => None,
    }
}
