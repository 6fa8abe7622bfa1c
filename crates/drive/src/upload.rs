use std::time::Duration;

use {
    reqwest::header::{CONTENT_TYPE, LOCATION},
    serde::{Deserialize, Serialize},
    tracing::{error, info, warn},
};

use crate::{
    credentials::ServiceHandle,
    error::{Context, Error, Result},
};

/// Every upload is stored as opaque binary; the type is never sniffed from
/// the name or the payload.
const OCTET_STREAM: &str = "application/octet-stream";

/// Outcome of one upload. Provider errors are logged and folded into
/// [`UploadResult::Failed`] instead of being returned as errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadResult {
    /// A user-facing view link for the new file.
    Shared(String),
    Failed,
}

/// Writes a fully buffered file into a Drive folder.
///
/// Implementations may block on network I/O.
pub trait UploadExecutor: Send + Sync {
    fn upload(
        &self,
        service: &ServiceHandle,
        bytes: Vec<u8>,
        folder_id: &str,
        name: &str,
    ) -> UploadResult;
}

#[derive(Serialize)]
struct FileMetadata<'a> {
    name: &'a str,
    parents: [&'a str; 1],
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatedFile {
    id: String,
    #[serde(default)]
    web_view_link: Option<String>,
}

/// Drive v3 client using the resumable upload protocol.
pub struct DriveUploader {
    api_base_url: String,
    timeout: Duration,
}

impl DriveUploader {
    #[must_use]
    pub fn new(api_base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            timeout,
        }
    }

    fn try_upload(
        &self,
        service: &ServiceHandle,
        bytes: Vec<u8>,
        folder_id: &str,
        name: &str,
    ) -> Result<Option<String>> {
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()?;

        let init_url = format!(
            "{}/upload/drive/v3/files",
            self.api_base_url.trim_end_matches('/')
        );
        let response = client
            .post(&init_url)
            .query(&[
                ("uploadType", "resumable"),
                ("supportsAllDrives", "true"),
                ("fields", "id,webViewLink"),
            ])
            .bearer_auth(service.bearer())
            .header("X-Upload-Content-Type", OCTET_STREAM)
            .header("X-Upload-Content-Length", bytes.len())
            .json(&FileMetadata {
                name,
                parents: [folder_id],
            })
            .send()?;
        let response = ensure_success("start resumable upload", response)?;

        let session_uri = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .context("resumable upload response had no Location header")?
            .to_string();

        let response = client
            .put(&session_uri)
            .header(CONTENT_TYPE, OCTET_STREAM)
            .body(bytes)
            .send()?;
        let created: CreatedFile = ensure_success("upload file content", response)?.json()?;

        info!(file_id = %created.id, name, "file uploaded to drive");
        Ok(created.web_view_link)
    }
}

impl UploadExecutor for DriveUploader {
    fn upload(
        &self,
        service: &ServiceHandle,
        bytes: Vec<u8>,
        folder_id: &str,
        name: &str,
    ) -> UploadResult {
        let size = bytes.len();
        match self.try_upload(service, bytes, folder_id, name) {
            Ok(Some(link)) if !link.is_empty() => UploadResult::Shared(link),
            Ok(_) => {
                warn!(name, size, "drive accepted the file but returned no view link");
                UploadResult::Failed
            },
            Err(e) => {
                error!(name, size, error = %e, "error uploading file to drive");
                UploadResult::Failed
            },
        }
    }
}

fn ensure_success(
    operation: &'static str,
    response: reqwest::blocking::Response,
) -> Result<reqwest::blocking::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    Err(Error::Api {
        operation,
        status: status.as_u16(),
        body: response.text().unwrap_or_default(),
    })
}
