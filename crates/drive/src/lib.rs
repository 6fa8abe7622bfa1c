//! Google Drive side of the relay.
//!
//! Two pieces, both deliberately blocking: [`ServiceAccountCredentials`]
//! exchanges a service-account key for a short-lived access token, and
//! [`DriveUploader`] writes a fully buffered file into a folder and returns
//! its view link. Callers on an async runtime must run them through
//! `tokio::task::spawn_blocking`.

pub mod credentials;
pub mod error;
pub mod upload;

pub use {
    credentials::{
        CredentialProvider, DRIVE_SCOPE, ServiceAccountCredentials, ServiceAccountKey,
        ServiceHandle,
    },
    error::{Error, Result},
    upload::{DriveUploader, UploadExecutor, UploadResult},
};
