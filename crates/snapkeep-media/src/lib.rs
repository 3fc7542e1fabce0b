#![deny(unreachable_patterns)]
//! FFmpeg and image compositing engine for the Snapkeep export pipeline.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building against an explicitly configured binary
//! - Zip archive extraction and main/overlay payload discovery
//! - In-process image compositing and FFmpeg-backed video compositing
//! - Overlay repair (canonical RGBA PNG re-encode) for the video retry path
//! - GPS/capture-time embedding for JPEG (EXIF) and MP4 (container remux)

pub mod archive;
pub mod command;
pub mod compose_image;
pub mod compose_video;
pub mod error;
pub mod fs_utils;
pub mod metadata;
pub mod overlay;

pub use archive::{extract_archive, is_archive, locate_layers, LayerKind, OVERLAY_SUFFIX};
pub use command::{Ffmpeg, FfmpegCommand};
pub use compose_image::compose_image;
pub use compose_video::{compose_video, MAX_COMPOSE_ATTEMPTS};
pub use error::{MediaError, MediaResult};
pub use fs_utils::move_file;
pub use metadata::{embed_image_gps, embed_video_gps};
pub use overlay::{repair_overlay, repaired_path};
