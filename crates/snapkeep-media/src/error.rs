//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while extracting, compositing, or embedding.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("failed to extract archive {archive}: {reason}")]
    ExtractionFailed { archive: PathBuf, reason: String },

    #[error("no {role} payload found in {dir}")]
    MissingLayer { role: &'static str, dir: PathBuf },

    #[error("multiple {role} payloads found in {dir}")]
    AmbiguousLayer { role: &'static str, dir: PathBuf },

    #[error("EXIF write failed: {0}")]
    ExifWrite(String),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl MediaError {
    /// Create an FFmpeg failure error.
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Create an archive extraction error.
    pub fn extraction_failed(archive: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::ExtractionFailed {
            archive: archive.into(),
            reason: reason.into(),
        }
    }

    /// Create an EXIF write error.
    pub fn exif_write(message: impl Into<String>) -> Self {
        Self::ExifWrite(message.into())
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}
