//! Archive extraction and layer discovery.
//!
//! Composited items arrive as a zip holding two members named by suffix
//! convention: one `-main.*` base payload (image or video) and one
//! `-overlay.png` transparent stamp. Exactly one of each is expected per
//! archive; duplicate matches are a validation error rather than an
//! iteration-order lottery.

use std::fs::File;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use zip::ZipArchive;

use crate::error::{MediaError, MediaResult};

/// Main-payload suffixes treated as images.
pub const IMAGE_MAIN_SUFFIXES: &[&str] =
    &["-main.jpg", "-main.jpeg", "-main.png", "-main.webp"];

/// Main-payload suffixes treated as videos.
pub const VIDEO_MAIN_SUFFIXES: &[&str] =
    &["-main.mp4", "-main.mov", "-main.mkv", "-main.webm"];

/// Overlay payload suffix.
pub const OVERLAY_SUFFIX: &str = "-overlay.png";

/// Image extensions for companion/main classification.
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

/// Kind of main payload, selecting the compositor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    Image,
    Video,
}

impl LayerKind {
    /// Classify a main payload by extension. Anything that is not a known
    /// image extension is assumed to be a video.
    pub fn of(path: &Path) -> Self {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Self::Image
        } else {
            Self::Video
        }
    }

    /// Extension of the merged output for this kind.
    pub fn merged_extension(self) -> &'static str {
        match self {
            Self::Image => "jpg",
            Self::Video => "mp4",
        }
    }
}

/// Check whether a downloaded file is a zip archive, by magic bytes or by
/// the `.zip` suffix.
pub fn is_archive(path: &Path) -> bool {
    if path
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("zip"))
    {
        return true;
    }

    let mut magic = [0u8; 4];
    match File::open(path).and_then(|mut f| std::io::Read::read_exact(&mut f, &mut magic)) {
        Ok(()) => magic == [b'P', b'K', 0x03, 0x04],
        Err(_) => false,
    }
}

/// Extract every member of `archive` into `dest`.
///
/// `dest` is created (and emptied first, if a previous run left it behind).
/// The archive file itself is left in place; deleting it afterwards is the
/// caller's responsibility.
pub fn extract_archive(archive: &Path, dest: &Path) -> MediaResult<()> {
    if dest.exists() {
        std::fs::remove_dir_all(dest)?;
    }
    std::fs::create_dir_all(dest)?;

    let file = File::open(archive)?;
    let mut zip = ZipArchive::new(file)
        .map_err(|e| MediaError::extraction_failed(archive, e.to_string()))?;
    zip.extract(dest)
        .map_err(|e| MediaError::extraction_failed(archive, e.to_string()))?;

    debug!(archive = %archive.display(), dest = %dest.display(), "Extracted archive");
    Ok(())
}

/// Scan the immediate children of `dir` for the main and overlay payloads.
///
/// Classification is a case-insensitive suffix match. A missing payload is
/// reported as `None` (callers decide whether that is fatal); more than one
/// match for a role is a hard [`MediaError::AmbiguousLayer`] error.
pub fn locate_layers(dir: &Path) -> MediaResult<(Option<PathBuf>, Option<PathBuf>)> {
    let mut main: Option<PathBuf> = None;
    let mut overlay: Option<PathBuf> = None;

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_lowercase();

        if IMAGE_MAIN_SUFFIXES
            .iter()
            .chain(VIDEO_MAIN_SUFFIXES)
            .any(|s| name.ends_with(s))
        {
            if main.is_some() {
                return Err(MediaError::AmbiguousLayer {
                    role: "main",
                    dir: dir.to_path_buf(),
                });
            }
            main = Some(path);
        } else if name.ends_with(OVERLAY_SUFFIX) {
            if overlay.is_some() {
                return Err(MediaError::AmbiguousLayer {
                    role: "overlay",
                    dir: dir.to_path_buf(),
                });
            }
            overlay = Some(path);
        }
    }

    if main.is_none() || overlay.is_none() {
        warn!(
            dir = %dir.display(),
            has_main = main.is_some(),
            has_overlay = overlay.is_some(),
            "Extraction directory is missing a payload"
        );
    }

    Ok((main, overlay))
}
