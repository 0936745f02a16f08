//! Core sample-construction modules

pub mod batch;
pub mod patch;
pub mod sample;
pub mod sampler;

// Re-export main types
pub use batch::{BatchStream, PrefetchedBatches};
pub use patch::{extract_patch, safe_center};
pub use sample::SampleBuilder;
pub use sampler::{BalancedSampler, SamplerStats, NO_FIRE_FALLBACK_CAP};
