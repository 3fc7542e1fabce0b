//! Overlay repair.
//!
//! Some exports ship overlays that decode fine but trip FFmpeg's PNG reader
//! (missing alpha, truncated ancillary chunks). Repair re-decodes the file,
//! forces RGBA, and re-encodes a canonical PNG next to the original. The
//! input is never touched; the repaired copy is only ever used as retry
//! input by the video compositor.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::MediaResult;

/// Suffix marker inserted before the extension of a repaired overlay.
const REPAIR_MARKER: &str = "_fixed";

/// Path the repaired copy of `overlay` will be written to.
pub fn repaired_path(overlay: &Path) -> PathBuf {
    let stem = overlay
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    overlay.with_file_name(format!("{stem}{REPAIR_MARKER}.png"))
}

/// Re-encode the overlay as a canonical RGBA PNG.
///
/// Returns the path of the new file; the original is left as-is.
pub fn repair_overlay(overlay: &Path) -> MediaResult<PathBuf> {
    let rgba = image::open(overlay)?.to_rgba8();

    let fixed = repaired_path(overlay);
    rgba.save(&fixed)?;

    info!(
        overlay = %overlay.display(),
        fixed = %fixed.display(),
        "Re-encoded overlay as RGBA PNG"
    );
    Ok(fixed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use tempfile::TempDir;

    #[test]
    fn repaired_path_inserts_marker() {
        assert_eq!(
            repaired_path(Path::new("/tmp/a-overlay.png")),
            Path::new("/tmp/a-overlay_fixed.png")
        );
        // Repairing an already-repaired file stacks the marker.
        assert_eq!(
            repaired_path(Path::new("/tmp/a-overlay_fixed.png")),
            Path::new("/tmp/a-overlay_fixed_fixed.png")
        );
    }

    #[test]
    fn repair_forces_alpha_channel_and_preserves_input() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("x-overlay.png");

        // An opaque RGB source: repair must still produce RGBA output.
        let rgb = RgbImage::from_pixel(4, 4, Rgb([10, 20, 30]));
        rgb.save(&src).unwrap();
        let before = std::fs::read(&src).unwrap();

        let fixed = repair_overlay(&src).unwrap();
        assert_eq!(fixed, dir.path().join("x-overlay_fixed.png"));

        let decoded = image::open(&fixed).unwrap();
        assert_eq!(decoded.color(), image::ColorType::Rgba8);
        assert_eq!(std::fs::read(&src).unwrap(), before, "input must not change");
    }

    #[test]
    fn repair_fails_on_undecodable_input() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("bad-overlay.png");
        std::fs::write(&src, b"not a png at all").unwrap();

        assert!(repair_overlay(&src).is_err());
    }
}
