//! Image compositing.
//!
//! Alpha-composites the overlay onto the main image entirely in-process with
//! the `image` crate. The overlay is stretched to the main image's exact
//! pixel dimensions first (aspect distortion is accepted; the layers were
//! captured at the same aspect ratio). Output is a flattened opaque JPEG.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::DynamicImage;
use tracing::debug;

use crate::error::MediaResult;

/// JPEG quality for merged output.
const JPEG_QUALITY: u8 = 95;

/// Composite `overlay` over `main` and write a flattened JPEG to `out`.
///
/// No retry path here: a decode or encode failure is fatal for the item.
pub fn compose_image(main: &Path, overlay: &Path, out: &Path) -> MediaResult<()> {
    let mut base = image::open(main)?.to_rgba8();
    let overlay_rgba = image::open(overlay)?.to_rgba8();

    let resized = if overlay_rgba.dimensions() == base.dimensions() {
        overlay_rgba
    } else {
        imageops::resize(
            &overlay_rgba,
            base.width(),
            base.height(),
            FilterType::Triangle,
        )
    };

    imageops::overlay(&mut base, &resized, 0, 0);

    let flattened = DynamicImage::ImageRgba8(base).to_rgb8();
    let writer = BufWriter::new(File::create(out)?);
    let mut encoder = JpegEncoder::new_with_quality(writer, JPEG_QUALITY);
    encoder.encode_image(&flattened)?;

    debug!(
        main = %main.display(),
        overlay = %overlay.display(),
        out = %out.display(),
        "Composited image layers"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use tempfile::TempDir;

    fn solid(dir: &Path, name: &str, w: u32, h: u32, px: Rgba<u8>) -> std::path::PathBuf {
        let path = dir.join(name);
        RgbaImage::from_pixel(w, h, px).save(&path).unwrap();
        path
    }

    #[test]
    fn opaque_overlay_wins_and_output_is_main_sized() {
        let dir = TempDir::new().unwrap();
        let main = solid(dir.path(), "a-main.png", 8, 6, Rgba([200, 0, 0, 255]));
        // Differently-sized opaque green overlay: stretched over the base.
        let overlay = solid(dir.path(), "a-overlay.png", 4, 3, Rgba([0, 200, 0, 255]));
        let out = dir.path().join("a_merged.jpg");

        compose_image(&main, &overlay, &out).unwrap();

        let merged = image::open(&out).unwrap().to_rgb8();
        assert_eq!(merged.dimensions(), (8, 6));
        let px = merged.get_pixel(4, 3);
        // JPEG is lossy; just require the overlay colour to dominate.
        assert!(px[1] > 150 && px[0] < 60, "expected green, got {px:?}");
    }

    #[test]
    fn transparent_overlay_leaves_main_visible() {
        let dir = TempDir::new().unwrap();
        let main = solid(dir.path(), "b-main.png", 8, 8, Rgba([0, 0, 200, 255]));
        let overlay = solid(dir.path(), "b-overlay.png", 8, 8, Rgba([255, 255, 255, 0]));
        let out = dir.path().join("b_merged.jpg");

        compose_image(&main, &overlay, &out).unwrap();

        let px = *image::open(&out).unwrap().to_rgb8().get_pixel(4, 4);
        assert!(px[2] > 150 && px[0] < 60, "expected blue, got {px:?}");
    }

    #[test]
    fn compositing_is_deterministic_at_pixel_level() {
        let dir = TempDir::new().unwrap();
        let main = solid(dir.path(), "c-main.png", 10, 10, Rgba([90, 60, 30, 255]));
        let overlay = solid(dir.path(), "c-overlay.png", 5, 5, Rgba([30, 60, 90, 128]));

        let out1 = dir.path().join("c1.jpg");
        let out2 = dir.path().join("c2.jpg");
        compose_image(&main, &overlay, &out1).unwrap();
        compose_image(&main, &overlay, &out2).unwrap();

        let px1 = image::open(&out1).unwrap().to_rgb8();
        let px2 = image::open(&out2).unwrap().to_rgb8();
        assert_eq!(px1.as_raw(), px2.as_raw());
    }

    #[test]
    fn undecodable_main_is_fatal() {
        let dir = TempDir::new().unwrap();
        let main = dir.path().join("bad-main.jpg");
        std::fs::write(&main, b"garbage").unwrap();
        let overlay = solid(dir.path(), "ok-overlay.png", 2, 2, Rgba([0, 0, 0, 255]));

        assert!(compose_image(&main, &overlay, &dir.path().join("out.jpg")).is_err());
    }
}
