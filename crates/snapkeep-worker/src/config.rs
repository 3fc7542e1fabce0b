//! Worker configuration.

use std::path::PathBuf;

/// Batch run configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Path to the export manifest JSON
    pub manifest_path: PathBuf,
    /// Directory receiving downloads, scratch dirs, and final outputs
    pub output_dir: PathBuf,
    /// Explicit FFmpeg binary path; `None` resolves from PATH
    pub ffmpeg_path: Option<PathBuf>,
    /// Whether the post-batch reconciliation sweep preserves scratch
    /// directories instead of deleting them after recovery
    pub keep_scratch_on_sweep: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            manifest_path: PathBuf::from("snap_data.json"),
            output_dir: PathBuf::from("downloaded_media"),
            ffmpeg_path: None,
            keep_scratch_on_sweep: true,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            manifest_path: std::env::var("SNAPKEEP_MANIFEST")
                .map(PathBuf::from)
                .unwrap_or(defaults.manifest_path),
            output_dir: std::env::var("SNAPKEEP_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            ffmpeg_path: std::env::var("SNAPKEEP_FFMPEG").ok().map(PathBuf::from),
            keep_scratch_on_sweep: std::env::var("SNAPKEEP_KEEP_SCRATCH")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.keep_scratch_on_sweep),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_preserve_scratch() {
        let config = WorkerConfig::default();
        assert!(config.keep_scratch_on_sweep);
        assert_eq!(config.manifest_path, PathBuf::from("snap_data.json"));
        assert_eq!(config.output_dir, PathBuf::from("downloaded_media"));
        assert!(config.ffmpeg_path.is_none());
    }
}
