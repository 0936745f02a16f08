use crate::types::{FireError, FireResult, RasterArray};
use gdal::Dataset;
use ndarray::{s, Array2, Array3};
use std::path::Path;

/// Read a raster file into memory.
///
/// Every band is decoded as f32. Sources with exactly one band are reduced
/// to a 2D plane; multi-band sources stay band-major 3D.
pub fn read_raster<P: AsRef<Path>>(path: P) -> FireResult<RasterArray> {
    let path = path.as_ref();
    log::debug!("Reading raster: {}", path.display());

    let dataset = Dataset::open(path)?;
    let (width, height) = dataset.raster_size();
    let band_count = dataset.raster_count();

    if band_count < 1 {
        return Err(FireError::RasterLoad {
            path: path.display().to_string(),
            reason: "raster has no bands".to_string(),
        });
    }

    if band_count == 1 {
        let plane = read_band_plane(&dataset, 1, width, height)?;
        return Ok(RasterArray::Plane(plane));
    }

    let mut stack = Array3::zeros((band_count as usize, height, width));
    for band in 0..band_count as usize {
        let plane = read_band_plane(&dataset, (band + 1) as isize, width, height)?;
        stack.slice_mut(s![band, .., ..]).assign(&plane);
    }
    Ok(RasterArray::Stack(stack))
}

fn read_band_plane(
    dataset: &Dataset,
    band: isize,
    width: usize,
    height: usize,
) -> FireResult<Array2<f32>> {
    let rasterband = dataset.rasterband(band)?;
    let buffer = rasterband.read_as::<f32>((0, 0), (width, height), (width, height), None)?;
    Array2::from_shape_vec((height, width), buffer.data)
        .map_err(|e| FireError::Shape(format!("failed to reshape band {}: {}", band, e)))
}
