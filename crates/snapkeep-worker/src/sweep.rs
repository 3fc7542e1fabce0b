//! Reconciliation sweep for interrupted runs.
//!
//! A crash between extraction and merge leaves a `*_extracted` scratch
//! directory in the output dir and no finished output; the consumed archive
//! cannot be re-downloaded into place, so the scratch members are the only
//! copy of the layers. This sweep runs once after a batch, re-drives the
//! compose and embed steps for each leftover, and looks the owning manifest
//! entry back up by substring match (the export schema has no stable id to
//! do an exact lookup with).

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use snapkeep_media::{compose_image, compose_video, locate_layers, Ffmpeg, LayerKind};
use snapkeep_models::Manifest;

use crate::error::WorkerResult;
use crate::processor::{embed_metadata, MERGED_SUFFIX, SCRATCH_SUFFIX};

/// Sweep summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Leftover scratch directories found
    pub leftovers: usize,
    /// Leftovers merged into a finished output
    pub recovered: usize,
    /// Leftovers skipped (missing payloads)
    pub skipped: usize,
    /// Leftovers that failed during recovery
    pub failed: usize,
}

/// List leftover extraction scratch directories, sorted for determinism.
pub fn find_leftover_scratch(out_dir: &Path) -> WorkerResult<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    if !out_dir.exists() {
        return Ok(dirs);
    }

    for entry in std::fs::read_dir(out_dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir()
            && entry
                .file_name()
                .to_string_lossy()
                .ends_with(SCRATCH_SUFFIX)
        {
            dirs.push(path);
        }
    }

    dirs.sort();
    Ok(dirs)
}

/// Recover every leftover scratch directory in `out_dir`.
///
/// `delete_scratch` controls whether recovered scratch directories are
/// removed afterwards; the top-level run preserves them so a human can
/// inspect what was recovered.
pub async fn reconcile_leftovers(
    ffmpeg: &Ffmpeg,
    manifest: &Manifest,
    out_dir: &Path,
    delete_scratch: bool,
) -> WorkerResult<SweepReport> {
    let leftovers = find_leftover_scratch(out_dir)?;
    let mut report = SweepReport {
        leftovers: leftovers.len(),
        ..SweepReport::default()
    };
    info!(
        count = leftovers.len(),
        out_dir = %out_dir.display(),
        "Scanning for leftover extraction directories"
    );

    for scratch in leftovers {
        match reconcile_one(ffmpeg, manifest, out_dir, &scratch, delete_scratch).await {
            Ok(Some(output)) => {
                info!(
                    scratch = %scratch.display(),
                    output = %output.display(),
                    "Recovered leftover merge"
                );
                report.recovered += 1;
            }
            Ok(None) => report.skipped += 1,
            Err(e) => {
                warn!(scratch = %scratch.display(), error = %e, "Failed to recover leftover");
                report.failed += 1;
            }
        }
    }

    Ok(report)
}

/// Re-drive compose + embed for one leftover scratch directory.
///
/// Returns `Ok(None)` when a payload is missing and the directory is skipped.
async fn reconcile_one(
    ffmpeg: &Ffmpeg,
    manifest: &Manifest,
    out_dir: &Path,
    scratch: &Path,
    delete_scratch: bool,
) -> WorkerResult<Option<PathBuf>> {
    let (main, overlay) = locate_layers(scratch)?;
    let (Some(main), Some(overlay)) = (main, overlay) else {
        warn!(scratch = %scratch.display(), "Leftover is missing a payload, skipping");
        return Ok(None);
    };

    let base = scratch
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .and_then(|n| n.strip_suffix(SCRATCH_SUFFIX).map(ToString::to_string))
        .unwrap_or_default();

    let kind = LayerKind::of(&main);
    let output = out_dir.join(format!("{base}{MERGED_SUFFIX}.{}", kind.merged_extension()));
    match kind {
        LayerKind::Image => compose_image(&main, &overlay, &output)?,
        LayerKind::Video => compose_video(ffmpeg, &main, &overlay, &output).await?,
    }

    match manifest.find_matching(&base) {
        Some(entry) => {
            embed_metadata(
                ffmpeg,
                &output,
                entry.geo().as_ref(),
                entry.capture_time().as_ref(),
            )
            .await;
        }
        None => {
            warn!(base, "No manifest entry matches leftover, skipping metadata embed");
        }
    }

    if delete_scratch {
        tokio::fs::remove_dir_all(scratch).await?;
    }

    Ok(Some(output))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use tempfile::TempDir;

    fn seed_scratch(out_dir: &Path, base: &str) -> PathBuf {
        let scratch = out_dir.join(format!("{base}{SCRATCH_SUFFIX}"));
        std::fs::create_dir_all(&scratch).unwrap();
        RgbaImage::from_pixel(5, 5, Rgba([120, 0, 0, 255]))
            .save(scratch.join(format!("{base}-main.png")))
            .unwrap();
        RgbaImage::from_pixel(5, 5, Rgba([0, 120, 0, 255]))
            .save(scratch.join(format!("{base}-overlay.png")))
            .unwrap();
        scratch
    }

    fn manifest_for(base: &str) -> Manifest {
        Manifest::from_json(&format!(
            r#"{{"Saved Media": [
                {{"media_url": "https://cdn/{base}.zip",
                  "Location": "40.712800, -74.006000",
                  "Date": "2021-10-06 23:09:21 UTC"}}
            ]}}"#
        ))
        .unwrap()
    }

    #[tokio::test]
    async fn recovers_leftover_and_preserves_scratch_by_default_policy() {
        let dir = TempDir::new().unwrap();
        let scratch = seed_scratch(dir.path(), "item123");
        let manifest = manifest_for("item123");

        let report =
            reconcile_leftovers(&Ffmpeg::new("ffmpeg"), &manifest, dir.path(), false)
                .await
                .unwrap();

        assert_eq!(report.leftovers, 1);
        assert_eq!(report.recovered, 1);
        assert!(dir.path().join("item123_merged.jpg").exists());
        assert!(scratch.exists(), "sweep configured to preserve scratch");
    }

    #[tokio::test]
    async fn deleting_sweep_is_idempotent_once_clean() {
        let dir = TempDir::new().unwrap();
        seed_scratch(dir.path(), "item9");
        let manifest = manifest_for("item9");
        let ffmpeg = Ffmpeg::new("ffmpeg");

        let first = reconcile_leftovers(&ffmpeg, &manifest, dir.path(), true)
            .await
            .unwrap();
        assert_eq!(first.recovered, 1);
        assert!(!dir.path().join(format!("item9{SCRATCH_SUFFIX}")).exists());

        // Second pass over a clean directory is a no-op.
        let second = reconcile_leftovers(&ffmpeg, &manifest, dir.path(), true)
            .await
            .unwrap();
        assert_eq!(second, SweepReport::default());
    }

    #[tokio::test]
    async fn leftover_missing_overlay_is_skipped_not_failed() {
        let dir = TempDir::new().unwrap();
        let scratch = dir.path().join(format!("nolayer{SCRATCH_SUFFIX}"));
        std::fs::create_dir_all(&scratch).unwrap();
        RgbaImage::from_pixel(3, 3, Rgba([1, 1, 1, 255]))
            .save(scratch.join("nolayer-main.png"))
            .unwrap();

        let report = reconcile_leftovers(
            &Ffmpeg::new("ffmpeg"),
            &manifest_for("nolayer"),
            dir.path(),
            true,
        )
        .await
        .unwrap();

        assert_eq!(report.skipped, 1);
        assert_eq!(report.recovered, 0);
        assert!(scratch.exists(), "skipped leftovers are never deleted");
    }

    #[tokio::test]
    async fn unmatched_leftover_still_merges_without_metadata() {
        let dir = TempDir::new().unwrap();
        seed_scratch(dir.path(), "orphan");
        let manifest = Manifest::from_json(
            r#"{"Saved Media": [{"media_url": "https://cdn/unrelated.zip"}]}"#,
        )
        .unwrap();

        let report =
            reconcile_leftovers(&Ffmpeg::new("ffmpeg"), &manifest, dir.path(), false)
                .await
                .unwrap();

        assert_eq!(report.recovered, 1);
        assert!(dir.path().join("orphan_merged.jpg").exists());
    }

    #[tokio::test]
    async fn empty_output_dir_finds_nothing() {
        let dir = TempDir::new().unwrap();
        assert!(find_leftover_scratch(dir.path()).unwrap().is_empty());
        assert!(find_leftover_scratch(&dir.path().join("missing"))
            .unwrap()
            .is_empty());
    }
}
