//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Manifest error: {0}")]
    Manifest(#[from] snapkeep_models::ManifestError),

    #[error("Media error: {0}")]
    Media(#[from] snapkeep_media::MediaError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn download_failed(msg: impl Into<String>) -> Self {
        Self::DownloadFailed(msg.into())
    }
}
