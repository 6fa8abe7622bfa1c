//! User-facing chat texts.

/// Reply to `/start`.
pub const GREETING: &str = "Hi! 👋\nSend me any file, photo, video or audio and I'll save it to Google Drive.";

pub const UNSUPPORTED_FORMAT: &str = "This file format is not supported.";

pub const FETCHING: &str = "Fetching the file from Telegram...";

pub const UPLOADING: &str = "Uploading to Google Drive... ☁️";

/// Upload finished without an error but Drive gave nothing usable back.
pub const UPLOAD_FAILED: &str = "❌ Something went wrong while uploading the file.";

/// Success text with the Drive link. Rendered as HTML.
#[must_use]
pub fn uploaded(link: &str, name: &str) -> String {
    format!(
        "✅ File uploaded successfully!\n\n<a href=\"{}\">{}</a>",
        escape_html_attr(link),
        escape_html(name)
    )
}

/// Plain-text variant of [`uploaded`], for when Telegram rejects the HTML.
#[must_use]
pub fn uploaded_plain(link: &str, name: &str) -> String {
    format!("✅ File uploaded successfully!\n\n{name}\n{link}")
}

#[must_use]
pub fn too_large(limit_mb: u64) -> String {
    format!("❌ The file is too large. Telegram bots can only download files up to {limit_mb} MB.")
}

#[must_use]
pub fn telegram_error(detail: &str) -> String {
    format!("⚠️ Telegram error: {detail}")
}

#[must_use]
pub fn failed(detail: &str) -> String {
    format!("Error: {detail}")
}

pub(crate) fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_html_attr(text: &str) -> String {
    escape_html(text).replace('"', "&quot;")
}
