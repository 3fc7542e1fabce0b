//! Merge orchestration.
//!
//! Drives one manifest entry at a time through download, layer merge,
//! metadata embedding, and the final timestamp rename. Entries are fully
//! isolated: any failure is logged against its entry and the batch moves on.
//! Outputs only reach their final (timestamp-prefixed) name after every
//! stage for the item has completed, so a partial output is never mistaken
//! for a finished one.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use snapkeep_media::{
    compose_image, compose_video, extract_archive, is_archive, locate_layers, move_file,
    Ffmpeg, LayerKind, MediaError,
};
use snapkeep_models::geo::GeoPoint;
use snapkeep_models::timestamp::CaptureTime;
use snapkeep_models::{Manifest, ManifestEntry};

use crate::config::WorkerConfig;
use crate::download::MediaFetcher;
use crate::error::WorkerResult;

/// Suffix marking per-item extraction scratch directories.
pub const SCRATCH_SUFFIX: &str = "_extracted";

/// Suffix of composited output stems.
pub const MERGED_SUFFIX: &str = "_merged";

/// Companion-overlay filename conventions probed for bare (non-archive)
/// downloads, in order.
const COMPANION_PATTERNS: &[&str] = &["-overlay.png", "_overlay.png", ".overlay.png"];

/// Per-run summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub processed: usize,
    pub merged: usize,
    pub passthrough: usize,
    pub skipped: usize,
    pub failed: usize,
}

enum EntryOutcome {
    Merged(PathBuf),
    Passthrough(PathBuf),
}

/// Sequential merge pipeline over one loaded manifest.
pub struct MergePipeline {
    config: WorkerConfig,
    ffmpeg: Ffmpeg,
    fetcher: Arc<dyn MediaFetcher>,
}

impl MergePipeline {
    pub fn new(config: WorkerConfig, ffmpeg: Ffmpeg, fetcher: Arc<dyn MediaFetcher>) -> Self {
        Self {
            config,
            ffmpeg,
            fetcher,
        }
    }

    /// Process every manifest entry start-to-finish, one at a time.
    pub async fn run(&self, manifest: &Manifest) -> WorkerResult<BatchReport> {
        tokio::fs::create_dir_all(&self.config.output_dir).await?;

        let mut report = BatchReport::default();
        for (index, entry) in manifest.entries().iter().enumerate() {
            report.processed += 1;

            let Some(url) = entry.media_url.as_deref() else {
                warn!(index, "Entry has no media URL, skipping");
                report.skipped += 1;
                continue;
            };

            match self.process_entry(entry, url).await {
                Ok(EntryOutcome::Merged(path)) => {
                    info!(index, output = %path.display(), "Entry merged");
                    report.merged += 1;
                }
                Ok(EntryOutcome::Passthrough(path)) => {
                    info!(index, output = %path.display(), "Entry passed through");
                    report.passthrough += 1;
                }
                Err(e) => {
                    error!(index, url, error = %e, "Entry failed, continuing batch");
                    report.failed += 1;
                }
            }
        }

        info!(
            processed = report.processed,
            merged = report.merged,
            passthrough = report.passthrough,
            skipped = report.skipped,
            failed = report.failed,
            "Batch complete"
        );
        Ok(report)
    }

    async fn process_entry(&self, entry: &ManifestEntry, url: &str) -> WorkerResult<EntryOutcome> {
        let saved = self.fetcher.fetch(url, &self.config.output_dir).await?;

        let (output, was_merged) = if is_archive(&saved) {
            (self.merge_archive(&saved).await?, true)
        } else if let Some(overlay) = find_companion_overlay(&saved) {
            debug!(overlay = %overlay.display(), "Found companion overlay");
            (self.merge_layers(&saved, &overlay).await?, true)
        } else {
            // Bare download with nothing to composite: keep as-is.
            (saved, false)
        };

        let finished = self.finalize(entry, output).await?;
        Ok(if was_merged {
            EntryOutcome::Merged(finished)
        } else {
            EntryOutcome::Passthrough(finished)
        })
    }

    /// Extract an archive and composite its layers.
    ///
    /// The archive file is deleted once extraction has run, success or not;
    /// from that point the scratch directory is the only copy of the layers,
    /// which is what the reconciliation sweep depends on after a crash. The
    /// scratch directory itself is deleted only when the merge succeeds.
    async fn merge_archive(&self, archive: &Path) -> WorkerResult<PathBuf> {
        let stem = file_stem(archive);
        let scratch = self
            .config
            .output_dir
            .join(format!("{stem}{SCRATCH_SUFFIX}"));

        let extracted = extract_archive(archive, &scratch);
        if let Err(e) = tokio::fs::remove_file(archive).await {
            warn!(archive = %archive.display(), error = %e, "Failed to delete consumed archive");
        }
        extracted?;

        let (main, overlay) = locate_layers(&scratch)?;
        let main = main.ok_or_else(|| MediaError::MissingLayer {
            role: "main",
            dir: scratch.clone(),
        })?;
        let overlay = overlay.ok_or_else(|| MediaError::MissingLayer {
            role: "overlay",
            dir: scratch.clone(),
        })?;

        let kind = LayerKind::of(&main);
        let out = self
            .config
            .output_dir
            .join(format!("{stem}{MERGED_SUFFIX}.{}", kind.merged_extension()));
        self.compose(kind, &main, &overlay, &out).await?;

        tokio::fs::remove_dir_all(&scratch).await?;
        Ok(out)
    }

    /// Composite a bare download with its side-by-side overlay.
    async fn merge_layers(&self, main: &Path, overlay: &Path) -> WorkerResult<PathBuf> {
        let kind = LayerKind::of(main);
        let out = self.config.output_dir.join(format!(
            "{}{MERGED_SUFFIX}.{}",
            file_stem(main),
            kind.merged_extension()
        ));
        self.compose(kind, main, overlay, &out).await?;
        Ok(out)
    }

    async fn compose(
        &self,
        kind: LayerKind,
        main: &Path,
        overlay: &Path,
        out: &Path,
    ) -> WorkerResult<()> {
        match kind {
            LayerKind::Image => compose_image(main, overlay, out)?,
            LayerKind::Video => compose_video(&self.ffmpeg, main, overlay, out).await?,
        }
        Ok(())
    }

    /// Embed metadata and apply the timestamp-prefix rename.
    async fn finalize(&self, entry: &ManifestEntry, output: PathBuf) -> WorkerResult<PathBuf> {
        let geo = entry.geo();
        let time = entry.capture_time();

        embed_metadata(&self.ffmpeg, &output, geo.as_ref(), time.as_ref()).await;

        let Some(time) = time else {
            // Nothing to prefix with; keep the working name as final.
            return Ok(output);
        };

        let name = output
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let renamed = output.with_file_name(format!("{}_{name}", time.filename_prefix()));
        move_file(&output, &renamed).await?;
        debug!(output = %renamed.display(), "Renamed output with timestamp prefix");
        Ok(renamed)
    }
}

/// Embed GPS/time metadata appropriate to the output's extension.
///
/// A missing or unparsable location is a silent no-op, and any embedding
/// failure is reported as a warning with the output kept as-is.
pub(crate) async fn embed_metadata(
    ffmpeg: &Ffmpeg,
    path: &Path,
    geo: Option<&GeoPoint>,
    time: Option<&CaptureTime>,
) {
    let Some(geo) = geo else {
        debug!(path = %path.display(), "No parsable location, skipping metadata embed");
        return;
    };

    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    let result = match ext.as_str() {
        "jpg" | "jpeg" => snapkeep_media::embed_image_gps(path, geo, time),
        "mp4" => snapkeep_media::embed_video_gps(ffmpeg, path, geo, time).await,
        _ => return,
    };

    if let Err(e) = result {
        warn!(
            path = %path.display(),
            error = %e,
            "Failed to embed metadata, keeping output without it"
        );
    }
}

/// Probe the filename conventions a companion overlay may use.
fn find_companion_overlay(main: &Path) -> Option<PathBuf> {
    let stem = file_stem(main);
    COMPANION_PATTERNS
        .iter()
        .map(|pattern| main.with_file_name(format!("{stem}{pattern}")))
        .find(|candidate| candidate.exists())
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}
