//! Video compositing.
//!
//! Overlays the PNG onto every frame via FFmpeg. `scale2ref` sizes the
//! overlay against the video's frame (preserving the overlay's own aspect
//! ratio) before placing it at the origin; video is re-encoded with libx264
//! while the audio track is copied verbatim.
//!
//! Malformed overlays are the common failure here, so each failed attempt
//! re-encodes the overlay through [`crate::overlay::repair_overlay`] and
//! retries with the repaired file, up to a bounded attempt count.

use std::future::Future;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::command::{Ffmpeg, FfmpegCommand};
use crate::error::{MediaError, MediaResult};
use crate::overlay::repair_overlay;

/// Maximum compose attempts per item (initial try included).
pub const MAX_COMPOSE_ATTEMPTS: u32 = 3;

/// Scale the overlay relative to the video frame, then stamp it at (0,0).
const OVERLAY_FILTER: &str = "[1:v][0:v]scale2ref=w=iw:h=ih[ovr][base];[base][ovr]overlay=0:0";

/// Composite `overlay` onto `main` and write the re-encoded video to `out`.
///
/// After [`MAX_COMPOSE_ATTEMPTS`] failures the last error is returned; the
/// caller treats that as item-fatal, never batch-fatal.
pub async fn compose_video(
    ffmpeg: &Ffmpeg,
    main: &Path,
    overlay: &Path,
    out: &Path,
) -> MediaResult<()> {
    let runner = ffmpeg.clone();
    let main_path = main.to_path_buf();
    let out_path = out.to_path_buf();

    compose_with_repair(overlay, MAX_COMPOSE_ATTEMPTS, move |overlay_path| {
        let runner = runner.clone();
        let main_path = main_path.clone();
        let out_path = out_path.clone();
        async move {
            let cmd = FfmpegCommand::new(&out_path)
                .input(&main_path)
                .input(&overlay_path)
                .filter_complex(OVERLAY_FILTER)
                .video_codec("libx264")
                .crf(18)
                .preset("veryfast")
                .audio_codec("copy");
            runner.run(&cmd).await
        }
    })
    .await?;

    info!(
        main = %main.display(),
        out = %out.display(),
        "Composited video layers"
    );
    Ok(())
}

/// Bounded compose-repair-retry loop.
///
/// Runs `attempt` with the current overlay path; on failure the overlay is
/// repaired and the repaired path substituted for the next attempt. Repair
/// runs between attempts only, so `max_attempts` failures invoke repair
/// `max_attempts - 1` times. The last attempt's error is surfaced.
pub(crate) async fn compose_with_repair<F, Fut>(
    overlay: &Path,
    max_attempts: u32,
    mut attempt: F,
) -> MediaResult<()>
where
    F: FnMut(PathBuf) -> Fut,
    Fut: Future<Output = MediaResult<()>>,
{
    let mut current = overlay.to_path_buf();
    let mut last_error: Option<MediaError> = None;

    for attempt_no in 1..=max_attempts {
        match attempt(current.clone()).await {
            Ok(()) => return Ok(()),
            Err(e) => {
                warn!(
                    attempt = attempt_no,
                    max_attempts,
                    overlay = %current.display(),
                    error = %e,
                    "Video compose attempt failed"
                );
                last_error = Some(e);

                if attempt_no < max_attempts {
                    match repair_overlay(&current) {
                        Ok(fixed) => current = fixed,
                        Err(repair_err) => {
                            warn!(
                                overlay = %current.display(),
                                error = %repair_err,
                                "Overlay repair failed, retrying with the unrepaired file"
                            );
                        }
                    }
                }
            }
        }
    }

    Err(last_error
        .unwrap_or_else(|| MediaError::internal("compose retry loop ended without an error")))
}
