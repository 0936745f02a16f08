use crate::core::sample::SampleBuilder;
use crate::io::cache::RasterCache;
use crate::io::table::{SceneRow, SceneTable};
use crate::types::{FireResult, PipelineConfig, Sample};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::sync::Arc;

/// Cap on non-fire windows when the table contains no fire events at all
pub const NO_FIRE_FALLBACK_CAP: usize = 1000;

/// Counts gathered during the classification scan and index selection
#[derive(Debug, Clone, Default)]
pub struct SamplerStats {
    /// All valid window start positions in the table
    pub valid_windows: usize,
    /// Windows whose horizon contains a fire event
    pub fire_windows: usize,
    /// Non-fire windows available for selection
    pub non_fire_candidates: usize,
    /// Non-fire windows actually selected
    pub non_fire_selected: usize,
    /// True when no fire events were found and the capped fallback was used
    pub no_fire_fallback: bool,
}

/// Lazy, finite stream of class-balanced samples.
///
/// Construction scans every valid window, classifies it as fire or non-fire
/// by whether any horizon row's fire-detection raster contains a strictly
/// positive value anywhere (the whole raster, not just the eventual patch
/// region), then draws a stratified subset honoring the configured
/// fire ratio and shuffles it once.
///
/// The iterator is single-pass: it is not restartable and the emission order
/// is fixed at construction. Build a fresh sampler (with the same seed, if
/// reproducibility matters) to iterate again.
pub struct BalancedSampler {
    rows: Vec<SceneRow>,
    cache: Arc<RasterCache>,
    builder: SampleBuilder,
    seq_len: usize,
    window_len: usize,
    order: Vec<usize>,
    cursor: usize,
    rng: StdRng,
    stats: SamplerStats,
}

impl BalancedSampler {
    /// Construct with a nondeterministic seed
    pub fn new(
        table: &SceneTable,
        cache: Arc<RasterCache>,
        config: &PipelineConfig,
    ) -> FireResult<Self> {
        Self::with_rng(table, cache, config, StdRng::from_entropy())
    }

    /// Construct with a fixed seed; identical seeds over identical inputs
    /// reproduce the emission order exactly
    pub fn with_seed(
        table: &SceneTable,
        cache: Arc<RasterCache>,
        config: &PipelineConfig,
        seed: u64,
    ) -> FireResult<Self> {
        Self::with_rng(table, cache, config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(
        table: &SceneTable,
        cache: Arc<RasterCache>,
        config: &PipelineConfig,
        mut rng: StdRng,
    ) -> FireResult<Self> {
        config.validate()?;
        let builder = SampleBuilder::new(config)?;
        let valid_windows = table.valid_window_starts(config.seq_len, config.horizons);

        log::info!("Scanning {} candidate windows for fire events", valid_windows);
        let mut fire_starts = Vec::new();
        let mut non_fire_starts = Vec::new();
        for start in 0..valid_windows {
            let (_, horizon_rows) = table.window(start, config.seq_len, config.horizons);
            let mut has_fire = false;
            for row in horizon_rows {
                if cache.fetch(&row.viirs_file)?.has_positive() {
                    has_fire = true;
                    break;
                }
            }
            if has_fire {
                fire_starts.push(start);
            } else {
                non_fire_starts.push(start);
            }
        }

        let mut stats = SamplerStats {
            valid_windows,
            fire_windows: fire_starts.len(),
            non_fire_candidates: non_fire_starts.len(),
            ..Default::default()
        };

        let non_fire_selected: Vec<usize> = if fire_starts.is_empty() {
            if valid_windows > 0 {
                log::warn!(
                    "No fire events found in the table; using at most {} non-fire windows",
                    NO_FIRE_FALLBACK_CAP
                );
                stats.no_fire_fallback = true;
            }
            let count = non_fire_starts.len().min(NO_FIRE_FALLBACK_CAP);
            non_fire_starts
                .choose_multiple(&mut rng, count)
                .copied()
                .collect()
        } else {
            let fire_count = fire_starts.len() as f64;
            let wanted = (fire_count / config.fire_ratio - fire_count).round();
            let count = if wanted <= 0.0 {
                0
            } else {
                (wanted as usize).min(non_fire_starts.len())
            };
            non_fire_starts
                .choose_multiple(&mut rng, count)
                .copied()
                .collect()
        };
        stats.non_fire_selected = non_fire_selected.len();

        let mut order: Vec<usize> = fire_starts;
        order.extend(non_fire_selected);
        order.shuffle(&mut rng);

        log::info!(
            "Sampler initialized: {} fire and {} non-fire windows ({} candidates scanned)",
            stats.fire_windows,
            stats.non_fire_selected,
            stats.valid_windows
        );

        Ok(Self {
            rows: table.rows().to_vec(),
            cache,
            builder,
            seq_len: config.seq_len,
            window_len: config.window_len(),
            order,
            cursor: 0,
            rng,
            stats,
        })
    }

    pub fn stats(&self) -> &SamplerStats {
        &self.stats
    }

    /// Samples not yet emitted
    pub fn remaining(&self) -> usize {
        self.order.len() - self.cursor
    }
}

impl Iterator for BalancedSampler {
    type Item = FireResult<Sample>;

    fn next(&mut self) -> Option<Self::Item> {
        let start = *self.order.get(self.cursor)?;
        self.cursor += 1;

        let split = start + self.seq_len;
        let seq_rows = &self.rows[start..split];
        let horizon_rows = &self.rows[split..start + self.window_len];
        Some(
            self.builder
                .build(seq_rows, horizon_rows, &self.cache, false, &mut self.rng),
        )
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining();
        (remaining, Some(remaining))
    }
}
