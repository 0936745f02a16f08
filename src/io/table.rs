use crate::types::{FireError, FireResult};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::io::Read;
use std::path::Path;

/// Atmospheric raster columns, in fixed channel order
pub const ATMOSPHERIC_COLUMNS: [&str; 5] = [
    "era5_t2m_file",
    "era5_d2m_file",
    "era5_tp_file",
    "era5_u10_file",
    "era5_v10_file",
];

/// Every column the index table must provide
pub const REQUIRED_COLUMNS: [&str; 9] = [
    "era5_t2m_file",
    "era5_d2m_file",
    "era5_tp_file",
    "era5_u10_file",
    "era5_v10_file",
    "viirs_file",
    "dem_file",
    "lulc_file",
    "target_band_idxs",
];

/// One timestep record of the scene index table.
///
/// Rows are time-ordered by position in the table; there is no timestamp
/// column, the row order carries the temporal sequence semantics.
#[derive(Debug, Clone, Deserialize)]
pub struct SceneRow {
    pub era5_t2m_file: String,
    pub era5_d2m_file: String,
    pub era5_tp_file: String,
    pub era5_u10_file: String,
    pub era5_v10_file: String,
    pub viirs_file: String,
    pub dem_file: String,
    pub lulc_file: String,
    /// Textual integer-list literal, e.g. "[3]"; first element is the
    /// 1-based band index into the fire-detection raster
    pub target_band_idxs: String,
}

impl SceneRow {
    /// The 5 atmospheric raster paths, in fixed channel order
    pub fn atmospheric_paths(&self) -> [&str; 5] {
        [
            &self.era5_t2m_file,
            &self.era5_d2m_file,
            &self.era5_tp_file,
            &self.era5_u10_file,
            &self.era5_v10_file,
        ]
    }

    /// All 7 input channel paths in stacking order: atmospheric, dem, lulc
    pub fn channel_paths(&self) -> [&str; 7] {
        [
            &self.era5_t2m_file,
            &self.era5_d2m_file,
            &self.era5_tp_file,
            &self.era5_u10_file,
            &self.era5_v10_file,
            &self.dem_file,
            &self.lulc_file,
        ]
    }

    /// Every raster path this row references
    pub fn raster_paths(&self) -> [&str; 8] {
        [
            &self.era5_t2m_file,
            &self.era5_d2m_file,
            &self.era5_tp_file,
            &self.era5_u10_file,
            &self.era5_v10_file,
            &self.viirs_file,
            &self.dem_file,
            &self.lulc_file,
        ]
    }

    /// Parse the target band index list for this row
    pub fn target_band_indices(&self) -> FireResult<Vec<usize>> {
        parse_band_index_list(&self.target_band_idxs)
    }
}

/// Strict parser for the target-band-index column.
///
/// Accepts a comma-separated list of base-10 integers, optionally wrapped in
/// a matched pair of square brackets: "[3]", "3", "[1, 2]". Indices are
/// 1-based, so 0 is rejected, as is anything that is not a plain integer
/// list. This deliberately replaces the original's evaluate-as-code decoding.
pub fn parse_band_index_list(raw: &str) -> FireResult<Vec<usize>> {
    let trimmed = raw.trim();
    let malformed = || FireError::MalformedIndexList(raw.to_string());

    let inner = match (trimmed.starts_with('['), trimmed.ends_with(']')) {
        (true, true) => &trimmed[1..trimmed.len() - 1],
        (false, false) => trimmed,
        _ => return Err(malformed()),
    };

    if inner.trim().is_empty() {
        return Err(malformed());
    }

    let mut indices = Vec::new();
    for part in inner.split(',') {
        let value: usize = part.trim().parse().map_err(|_| malformed())?;
        if value == 0 {
            return Err(malformed());
        }
        indices.push(value);
    }
    Ok(indices)
}

/// The full scene index table: one row per timestep, time-ordered.
#[derive(Debug, Clone, Default)]
pub struct SceneTable {
    rows: Vec<SceneRow>,
}

impl SceneTable {
    /// Build a table from already-decoded rows
    pub fn from_rows(rows: Vec<SceneRow>) -> Self {
        Self { rows }
    }

    /// Read the table from a CSV file
    pub fn from_csv_path<P: AsRef<Path>>(path: P) -> FireResult<Self> {
        log::info!("Reading scene index table: {}", path.as_ref().display());
        let file = std::fs::File::open(path.as_ref())?;
        Self::from_reader(file)
    }

    /// Read the table from any CSV source
    pub fn from_reader<R: Read>(reader: R) -> FireResult<Self> {
        let mut csv_reader = csv::Reader::from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        for column in REQUIRED_COLUMNS {
            if !headers.iter().any(|h| h == column) {
                return Err(FireError::MissingColumn(column.to_string()));
            }
        }

        let mut rows = Vec::new();
        for record in csv_reader.deserialize() {
            let row: SceneRow = record?;
            rows.push(row);
        }
        log::info!("Scene index table loaded: {} timesteps", rows.len());
        Ok(Self { rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[SceneRow] {
        &self.rows
    }

    /// Deduplicated set of every raster path referenced by any row
    pub fn unique_raster_paths(&self) -> BTreeSet<String> {
        let mut paths = BTreeSet::new();
        for row in &self.rows {
            for path in row.raster_paths() {
                paths.insert(path.to_string());
            }
        }
        paths
    }

    /// Number of valid window start positions for the given shape:
    /// max(0, len - seq_len - horizons + 1)
    pub fn valid_window_starts(&self, seq_len: usize, horizons: usize) -> usize {
        (self.rows.len() + 1).saturating_sub(seq_len + horizons)
    }

    /// Slice one window into its sequence and horizon row spans.
    ///
    /// Callers must keep `start` below `valid_window_starts`.
    pub fn window(&self, start: usize, seq_len: usize, horizons: usize) -> (&[SceneRow], &[SceneRow]) {
        let split = start + seq_len;
        (
            &self.rows[start..split],
            &self.rows[split..split + horizons],
        )
    }
}
