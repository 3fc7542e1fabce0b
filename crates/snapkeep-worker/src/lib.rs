//! Batch merge orchestrator for saved-media exports.
//!
//! Loads an export manifest, downloads each entry's asset, reconstructs
//! composited photo/video output from main+overlay layers, embeds
//! geolocation/capture-time metadata, and finishes with a reconciliation
//! sweep over scratch directories left by interrupted runs.

pub mod config;
pub mod download;
pub mod error;
pub mod processor;
pub mod sweep;

pub use config::WorkerConfig;
pub use download::{HttpFetcher, MediaFetcher};
pub use error::{WorkerError, WorkerResult};
pub use processor::{BatchReport, MergePipeline, MERGED_SUFFIX, SCRATCH_SUFFIX};
pub use sweep::{find_leftover_scratch, reconcile_leftovers, SweepReport};
