//! Media asset download.
//!
//! Each manifest entry points at one downloadable asset (a bare media file
//! or a zip of layers). Fetching is behind a trait so the orchestrator can
//! be exercised without a network in tests.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info};
use url::Url;

use crate::error::{WorkerError, WorkerResult};

/// Fetches one media asset into the output directory.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Download `url` into `out_dir`, returning the saved file's path.
    async fn fetch(&self, url: &str, out_dir: &Path) -> WorkerResult<PathBuf>;
}

/// Derive a local filename from the URL's final path segment, falling back
/// to a generated name when the URL has no usable segment.
fn filename_for(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .unwrap_or_else(|| format!("media-{}", uuid::Uuid::new_v4()))
}

/// HTTP fetcher backed by a shared reqwest client.
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MediaFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, out_dir: &Path) -> WorkerResult<PathBuf> {
        let parsed = Url::parse(url)
            .map_err(|e| WorkerError::download_failed(format!("invalid URL {url}: {e}")))?;
        let dest = out_dir.join(filename_for(&parsed));

        debug!(url, dest = %dest.display(), "Downloading media asset");

        let response = self.client.get(parsed).send().await?.error_for_status()?;
        let body = response.bytes().await?;
        tokio::fs::write(&dest, &body).await?;

        info!(url, dest = %dest.display(), bytes = body.len(), "Saved media asset");
        Ok(dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_from_url_path() {
        let url = Url::parse("https://cdn.example.com/a/b/item-123.zip?sig=xyz").unwrap();
        assert_eq!(filename_for(&url), "item-123.zip");
    }

    #[test]
    fn filename_falls_back_when_path_is_bare() {
        let url = Url::parse("https://cdn.example.com/").unwrap();
        let name = filename_for(&url);
        assert!(name.starts_with("media-"));
    }
}
