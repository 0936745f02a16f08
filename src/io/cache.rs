use crate::io::raster::read_raster;
use crate::types::{FireError, FireResult, RasterArray};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::mpsc;
use std::time::Duration;

/// Outcome of a cache population pass.
///
/// Load failures are non-fatal here: a failed or timed-out path is simply
/// absent from the cache and surfaces as a MissingRaster error only when a
/// sample actually references it.
#[derive(Debug, Default)]
pub struct CacheLoadReport {
    /// Unique paths requested
    pub requested: usize,
    /// Paths that failed to decode, with the failure reason
    pub failed: Vec<(String, String)>,
    /// Paths abandoned because loading stalled past the per-load timeout
    pub timed_out: Vec<String>,
}

impl CacheLoadReport {
    /// Paths actually loaded
    pub fn loaded(&self) -> usize {
        self.requested - self.failed.len() - self.timed_out.len()
    }
}

/// Read-only mapping from raster path to decoded array.
///
/// Populated exactly once, then shared read-only (typically behind an Arc)
/// for the remainder of the pipeline's lifetime. There is no eviction; the
/// cache lives for a single training or inference run.
#[derive(Debug, Default)]
pub struct RasterCache {
    rasters: HashMap<String, RasterArray>,
}

impl RasterCache {
    /// Build a cache from already-decoded arrays
    pub fn from_entries<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, RasterArray)>,
        K: Into<String>,
    {
        Self {
            rasters: entries
                .into_iter()
                .map(|(path, array)| (path.into(), array))
                .collect(),
        }
    }

    /// Load every requested raster with a bounded worker pool.
    ///
    /// Paths are deduplicated before loading and each file is read exactly
    /// once. Results are merged by key, so completion order does not matter.
    /// The call joins all loads before returning; if no result arrives within
    /// `load_timeout` the remaining loads are abandoned and recorded in the
    /// report rather than stalling the pipeline forever.
    pub fn load<I, K>(
        paths: I,
        workers: usize,
        load_timeout: Duration,
    ) -> FireResult<(Self, CacheLoadReport)>
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        let unique: BTreeSet<String> = paths.into_iter().map(Into::into).collect();
        let mut report = CacheLoadReport {
            requested: unique.len(),
            ..Default::default()
        };

        if unique.is_empty() {
            return Ok((Self::default(), report));
        }

        log::info!(
            "Populating raster cache: {} unique paths, {} workers",
            unique.len(),
            workers
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .build()
            .map_err(|e| FireError::InvalidConfig(format!("cache worker pool: {}", e)))?;

        let (tx, rx) = mpsc::channel();
        for path in &unique {
            let tx = tx.clone();
            let path = path.clone();
            pool.spawn(move || {
                let result = read_raster(&path);
                let _ = tx.send((path, result));
            });
        }
        drop(tx);

        let mut pending: HashSet<String> = unique.into_iter().collect();
        let mut rasters = HashMap::new();
        let mut stalled = false;

        while !pending.is_empty() {
            match rx.recv_timeout(load_timeout) {
                Ok((path, Ok(array))) => {
                    pending.remove(&path);
                    rasters.insert(path, array);
                }
                Ok((path, Err(err))) => {
                    pending.remove(&path);
                    log::warn!("Failed to load raster {}: {}", path, err);
                    report.failed.push((path, err.to_string()));
                }
                Err(mpsc::RecvTimeoutError::Timeout) => {
                    log::warn!(
                        "Raster loading stalled past {:?}; abandoning {} pending loads",
                        load_timeout,
                        pending.len()
                    );
                    report.timed_out.extend(pending.drain());
                    stalled = true;
                    break;
                }
                Err(mpsc::RecvTimeoutError::Disconnected) => break,
            }
        }

        if stalled {
            // Dropping the pool would block on the stuck loads; hand it to a
            // reaper thread so the stragglers finish in the background.
            std::thread::spawn(move || drop(pool));
        }

        log::info!(
            "Raster cache populated: {} of {} paths loaded ({} failed, {} timed out)",
            rasters.len(),
            report.requested,
            report.failed.len(),
            report.timed_out.len()
        );
        Ok((Self { rasters }, report))
    }

    pub fn get(&self, path: &str) -> Option<&RasterArray> {
        self.rasters.get(path)
    }

    /// Like `get`, but a missing path is an error. Sample construction goes
    /// through this so an absent raster fails fast instead of being silently
    /// replaced by zeros.
    pub fn fetch(&self, path: &str) -> FireResult<&RasterArray> {
        self.rasters
            .get(path)
            .ok_or_else(|| FireError::MissingRaster(path.to_string()))
    }

    pub fn contains(&self, path: &str) -> bool {
        self.rasters.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.rasters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rasters.is_empty()
    }
}
