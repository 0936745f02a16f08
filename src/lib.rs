//! firecast: training-sample assembly for sequence-to-sequence wildfire
//! spread prediction
//!
//! The pipeline turns a CSV index of per-timestep raster references (5 ERA5
//! atmospheric variables, VIIRS fire detections, elevation, land cover) into
//! class-balanced batches of spatiotemporal tensors:
//!
//! 1. [`SceneTable`] reads the index table and deduplicates raster paths.
//! 2. [`RasterCache`] decodes every referenced raster once, in parallel, and
//!    is then shared read-only for the rest of the run.
//! 3. [`BalancedSampler`] scans all valid sequence windows, classifies each
//!    by fire content in its prediction horizon, draws a stratified shuffled
//!    subset honoring the configured fire ratio, and lazily builds samples
//!    through [`SampleBuilder`].
//! 4. [`BatchStream`] groups samples into fixed-size batches, with optional
//!    windowed re-shuffling and prefetch, for the external model consumer.
//!
//! Every emitted sample has x of shape (seq_len, patch, patch, 7) and y of
//! shape (horizons, patch, patch); all shapes come from an explicit
//! [`PipelineConfig`] validated at construction.

pub mod core;
pub mod io;
pub mod types;

// Re-export main types and functions for easier access
pub use types::{
    Batch, FireError, FireResult, PipelineConfig, RasterArray, Sample, CHANNELS,
};

pub use io::{CacheLoadReport, RasterCache, SceneRow, SceneTable};

pub use crate::core::{
    extract_patch, safe_center, BalancedSampler, BatchStream, PrefetchedBatches, SampleBuilder,
    SamplerStats,
};
