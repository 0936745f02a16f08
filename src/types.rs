use ndarray::{Array2, Array3, Array4, Array5, ArrayView2};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Raster cell value type used throughout the pipeline
pub type RasterValue = f32;

/// 2D single-band raster grid (row x col)
pub type RasterPlane = Array2<RasterValue>;

/// 3D multi-band raster stack (band x row x col)
pub type RasterStack = Array3<RasterValue>;

/// Fixed input channel count: 5 atmospheric variables + elevation + land cover
pub const CHANNELS: usize = 7;

/// A decoded raster held by the cache.
///
/// Sources with exactly one band are reduced to a 2D plane at load time;
/// everything else stays band-major 3D.
#[derive(Debug, Clone)]
pub enum RasterArray {
    Plane(RasterPlane),
    Stack(RasterStack),
}

impl RasterArray {
    /// Number of bands in the source raster
    pub fn band_count(&self) -> usize {
        match self {
            RasterArray::Plane(_) => 1,
            RasterArray::Stack(stack) => stack.dim().0,
        }
    }

    /// Spatial dimensions (height, width)
    pub fn spatial_dim(&self) -> (usize, usize) {
        match self {
            RasterArray::Plane(plane) => plane.dim(),
            RasterArray::Stack(stack) => {
                let (_, h, w) = stack.dim();
                (h, w)
            }
        }
    }

    /// 2D view of the raster: the plane itself, or band 0 of a stack
    pub fn primary_plane(&self) -> ArrayView2<'_, RasterValue> {
        match self {
            RasterArray::Plane(plane) => plane.view(),
            RasterArray::Stack(stack) => stack.index_axis(ndarray::Axis(0), 0),
        }
    }

    /// 2D view of a specific band (0-based index into the band axis)
    pub fn band_plane(&self, band: usize) -> FireResult<ArrayView2<'_, RasterValue>> {
        match self {
            RasterArray::Plane(plane) if band == 0 => Ok(plane.view()),
            RasterArray::Plane(_) => Err(FireError::Shape(format!(
                "band index {} requested from single-band raster",
                band + 1
            ))),
            RasterArray::Stack(stack) => {
                let bands = stack.dim().0;
                if band >= bands {
                    return Err(FireError::Shape(format!(
                        "band index {} out of range for {}-band raster",
                        band + 1,
                        bands
                    )));
                }
                Ok(stack.index_axis(ndarray::Axis(0), band))
            }
        }
    }

    /// True if any cell in any band is strictly positive
    pub fn has_positive(&self) -> bool {
        match self {
            RasterArray::Plane(plane) => plane.iter().any(|&v| v > 0.0),
            RasterArray::Stack(stack) => stack.iter().any(|&v| v > 0.0),
        }
    }
}

/// One assembled training sample.
///
/// `x` has shape (seq_len, patch, patch, channels), `y` has shape
/// (horizons, patch, patch).
#[derive(Debug, Clone)]
pub struct Sample {
    pub x: Array4<f32>,
    pub y: Array3<f32>,
}

/// A group of samples stacked along a leading batch axis
#[derive(Debug, Clone)]
pub struct Batch {
    pub x: Array5<f32>,
    pub y: Array4<f32>,
}

impl Batch {
    /// Number of samples in the batch
    pub fn len(&self) -> usize {
        self.x.dim().0
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Pipeline configuration, passed explicitly to every component.
///
/// A single config value describes one pipeline; multiple pipelines with
/// different shapes can coexist in one process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Input sequence length in timesteps
    pub seq_len: usize,
    /// Prediction horizon length in timesteps
    pub horizons: usize,
    /// Spatial patch edge length (must be odd)
    pub patch_size: usize,
    /// Input channel count (fixed raster schema: always 7)
    pub channels: usize,
    /// Target fraction of emitted samples whose horizon contains a fire event
    pub fire_ratio: f64,
    /// Samples per emitted batch
    pub batch_size: usize,
    /// Emit or drop a final partial batch
    pub drop_remainder: bool,
    /// Bounded shuffle window applied before batching (0 or 1 disables)
    pub shuffle_buffer: usize,
    /// Worker threads for parallel cache population
    pub cache_workers: usize,
    /// Per-load timeout for cache population, in seconds
    pub load_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            seq_len: 6,
            horizons: 3,
            patch_size: 13,
            channels: CHANNELS,
            fire_ratio: 0.5,
            batch_size: 16,
            drop_remainder: false,
            shuffle_buffer: 256,
            cache_workers: 8,
            load_timeout_secs: 30,
        }
    }
}

impl PipelineConfig {
    /// Validate the configuration; called by every component constructor so
    /// bad values surface at pipeline construction, not at first use.
    pub fn validate(&self) -> FireResult<()> {
        if self.seq_len == 0 {
            return Err(FireError::InvalidConfig("seq_len must be >= 1".into()));
        }
        if self.horizons == 0 {
            return Err(FireError::InvalidConfig("horizons must be >= 1".into()));
        }
        if self.patch_size == 0 || self.patch_size % 2 == 0 {
            return Err(FireError::InvalidConfig(format!(
                "patch_size must be odd and >= 1, got {}",
                self.patch_size
            )));
        }
        if self.channels != CHANNELS {
            return Err(FireError::InvalidConfig(format!(
                "channels is fixed by the raster schema to {}, got {}",
                CHANNELS, self.channels
            )));
        }
        if !(self.fire_ratio > 0.0 && self.fire_ratio <= 1.0) {
            return Err(FireError::InvalidConfig(format!(
                "fire_ratio must be in (0, 1], got {}",
                self.fire_ratio
            )));
        }
        if self.batch_size == 0 {
            return Err(FireError::InvalidConfig("batch_size must be >= 1".into()));
        }
        if self.cache_workers == 0 {
            return Err(FireError::InvalidConfig("cache_workers must be >= 1".into()));
        }
        if self.load_timeout_secs == 0 {
            return Err(FireError::InvalidConfig(
                "load_timeout_secs must be > 0".into(),
            ));
        }
        Ok(())
    }

    /// Half patch width: patch_size / 2
    pub fn half(&self) -> usize {
        self.patch_size / 2
    }

    /// Total rows covered by one window (sequence plus horizon)
    pub fn window_len(&self) -> usize {
        self.seq_len + self.horizons
    }

    /// Per-load timeout for cache population
    pub fn load_timeout(&self) -> Duration {
        Duration::from_secs(self.load_timeout_secs)
    }
}

/// Error types for the sample pipeline
#[derive(Debug, thiserror::Error)]
pub enum FireError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to load raster {path}: {reason}")]
    RasterLoad { path: String, reason: String },

    #[error("raster not present in cache: {0}")]
    MissingRaster(String),

    #[error("malformed target band index list: {0}")]
    MalformedIndexList(String),

    #[error("missing required column: {0}")]
    MissingColumn(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("shape error: {0}")]
    Shape(String),
}

/// Result type for pipeline operations
pub type FireResult<T> = Result<T, FireError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_configs_rejected() {
        let mut cfg = PipelineConfig::default();
        cfg.patch_size = 12;
        assert!(matches!(
            cfg.validate(),
            Err(FireError::InvalidConfig(_))
        ));

        let mut cfg = PipelineConfig::default();
        cfg.fire_ratio = 0.0;
        assert!(cfg.validate().is_err());

        let mut cfg = PipelineConfig::default();
        cfg.fire_ratio = 1.5;
        assert!(cfg.validate().is_err());

        let mut cfg = PipelineConfig::default();
        cfg.seq_len = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = PipelineConfig::default();
        cfg.channels = 5;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_raster_array_band_access() {
        let plane = RasterArray::Plane(Array2::zeros((4, 5)));
        assert_eq!(plane.band_count(), 1);
        assert_eq!(plane.spatial_dim(), (4, 5));
        assert!(plane.band_plane(0).is_ok());
        assert!(plane.band_plane(1).is_err());

        let mut data = Array3::zeros((3, 4, 5));
        data[[2, 1, 1]] = 7.0;
        let stack = RasterArray::Stack(data);
        assert_eq!(stack.band_count(), 3);
        assert_eq!(stack.spatial_dim(), (4, 5));
        assert!(stack.band_plane(2).is_ok());
        assert!(stack.band_plane(3).is_err());
        assert!(stack.has_positive());
        assert_eq!(stack.band_plane(2).unwrap()[[1, 1]], 7.0);
        assert_eq!(stack.band_plane(0).unwrap()[[1, 1]], 0.0);
    }

    #[test]
    fn test_has_positive_ignores_negative_values() {
        let mut data = Array2::zeros((3, 3));
        data[[0, 0]] = -1.0;
        assert!(!RasterArray::Plane(data).has_positive());
    }
}
