//! Input handling: scene index table, raster decoding, raster cache

pub mod cache;
pub mod raster;
pub mod table;

// Re-export main types
pub use cache::{CacheLoadReport, RasterCache};
pub use raster::read_raster;
pub use table::{parse_band_index_list, SceneRow, SceneTable, ATMOSPHERIC_COLUMNS, REQUIRED_COLUMNS};
