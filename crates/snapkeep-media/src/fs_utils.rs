//! Filesystem helpers.
//!
//! The final timestamp-prefix rename may cross filesystems when the output
//! directory is mounted separately, so the move falls back to copy+delete on
//! EXDEV instead of failing.

use std::path::Path;
use tokio::fs;

use crate::error::{MediaError, MediaResult};

/// Move a file, handling cross-device moves.
///
/// Tries a fast rename first; on EXDEV it copies to a temp file next to the
/// destination and renames that into place, so the destination is never
/// observed half-written.
pub async fn move_file(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> MediaResult<()> {
    let src = src.as_ref();
    let dst = dst.as_ref();

    if let Some(parent) = dst.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent).await?;
        }
    }

    match fs::rename(src, dst).await {
        Ok(()) => Ok(()),
        Err(e) if is_cross_device_error(&e) => {
            tracing::debug!(
                src = %src.display(),
                dst = %dst.display(),
                "Cross-device rename, falling back to copy+delete"
            );
            copy_and_delete(src, dst).await
        }
        Err(e) => Err(MediaError::from(e)),
    }
}

/// Check if an IO error is EXDEV (cross-device link), code 18 on Linux/macOS.
fn is_cross_device_error(e: &std::io::Error) -> bool {
    e.raw_os_error() == Some(18)
}

async fn copy_and_delete(src: &Path, dst: &Path) -> MediaResult<()> {
    let tmp_dst = dst.with_extension("tmp");

    fs::copy(src, &tmp_dst).await?;

    if let Err(e) = fs::rename(&tmp_dst, dst).await {
        let _ = std::fs::remove_file(&tmp_dst);
        return Err(MediaError::from(e));
    }

    // Best effort: the move already succeeded from the destination's view.
    if let Err(e) = fs::remove_file(src).await {
        tracing::warn!(src = %src.display(), error = %e, "Failed to remove moved source file");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn moves_within_one_filesystem() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("2021-10-06_23-09-21_item_merged.jpg");
        let dst = dir.path().join("renamed.jpg");

        fs::write(&src, b"jpeg bytes").await.unwrap();
        move_file(&src, &dst).await.unwrap();

        assert!(!src.exists());
        assert_eq!(fs::read(&dst).await.unwrap(), b"jpeg bytes");
    }

    #[tokio::test]
    async fn creates_missing_destination_directory() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("a.jpg");
        let dst = dir.path().join("nested").join("a.jpg");

        fs::write(&src, b"x").await.unwrap();
        move_file(&src, &dst).await.unwrap();

        assert!(dst.exists());
    }

    #[tokio::test]
    async fn overwrites_existing_destination() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("new.jpg");
        let dst = dir.path().join("old.jpg");

        fs::write(&src, b"new").await.unwrap();
        fs::write(&dst, b"old").await.unwrap();
        move_file(&src, &dst).await.unwrap();

        assert_eq!(fs::read(&dst).await.unwrap(), b"new");
    }

    #[test]
    fn detects_exdev() {
        assert!(is_cross_device_error(&std::io::Error::from_raw_os_error(18)));
        assert!(!is_cross_device_error(&std::io::Error::from_raw_os_error(2)));
    }
}
