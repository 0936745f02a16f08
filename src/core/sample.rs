use crate::core::patch::{extract_patch, safe_center};
use crate::io::cache::RasterCache;
use crate::io::table::SceneRow;
use crate::types::{FireError, FireResult, PipelineConfig, Sample};
use ndarray::{s, Array3, Array4};
use rand::seq::SliceRandom;
use rand::Rng;

/// Assembles one (x, y) sample from a window of scene rows.
///
/// x stacks, per sequence timestep, one patch from each of the 7 input
/// channels (5 atmospheric variables, elevation, land cover). y stacks one
/// target patch per horizon timestep, taken from the band of the
/// fire-detection raster named by the row's target band index list.
pub struct SampleBuilder {
    config: PipelineConfig,
}

impl SampleBuilder {
    pub fn new(config: &PipelineConfig) -> FireResult<Self> {
        config.validate()?;
        Ok(Self {
            config: config.clone(),
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Build a sample from one window.
    ///
    /// Every referenced raster must be present in the cache; an absent path
    /// is a MissingRaster error, never a silent zero substitute. When
    /// `force_positive` is set and a horizon band contains positive cells,
    /// the target patch is centered on a uniformly drawn positive cell
    /// instead of the raster midpoint.
    pub fn build<R: Rng>(
        &self,
        seq_rows: &[SceneRow],
        horizon_rows: &[SceneRow],
        cache: &RasterCache,
        force_positive: bool,
        rng: &mut R,
    ) -> FireResult<Sample> {
        let patch = self.config.patch_size;

        if seq_rows.len() != self.config.seq_len {
            return Err(FireError::Shape(format!(
                "expected {} sequence rows, got {}",
                self.config.seq_len,
                seq_rows.len()
            )));
        }
        if horizon_rows.len() != self.config.horizons {
            return Err(FireError::Shape(format!(
                "expected {} horizon rows, got {}",
                self.config.horizons,
                horizon_rows.len()
            )));
        }

        let mut x = Array4::zeros((self.config.seq_len, patch, patch, self.config.channels));
        for (t, row) in seq_rows.iter().enumerate() {
            for (channel, path) in row.channel_paths().iter().enumerate() {
                let raster = cache.fetch(path)?;
                let plane = raster.primary_plane();
                let (height, width) = plane.dim();
                let (center_row, center_col) = safe_center(height, width, patch);
                let extracted = extract_patch(plane, center_row, center_col, patch);
                x.slice_mut(s![t, .., .., channel]).assign(&extracted);
            }
        }

        let mut y = Array3::zeros((self.config.horizons, patch, patch));
        for (k, row) in horizon_rows.iter().enumerate() {
            let raster = cache.fetch(&row.viirs_file)?;
            let band_indices = row.target_band_indices()?;
            // the parser guarantees at least one 1-based index
            let band = raster.band_plane(band_indices[0] - 1)?;

            let (height, width) = band.dim();
            let (mut center_row, mut center_col) = safe_center(height, width, patch);

            if force_positive {
                let positives: Vec<(usize, usize)> = band
                    .indexed_iter()
                    .filter(|&(_, &value)| value > 0.0)
                    .map(|(index, _)| index)
                    .collect();
                if let Some(&(fire_row, fire_col)) = positives.choose(rng) {
                    center_row = fire_row;
                    center_col = fire_col;
                }
            }

            let extracted = extract_patch(band, center_row, center_col, patch);
            y.slice_mut(s![k, .., ..]).assign(&extracted);
        }

        Ok(Sample { x, y })
    }
}
