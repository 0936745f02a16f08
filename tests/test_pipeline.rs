use approx::assert_relative_eq;
use firecast::{
    BalancedSampler, BatchStream, PipelineConfig, RasterArray, RasterCache, SceneRow, SceneTable,
};
use ndarray::{Array2, Array3};
use std::sync::Arc;

fn scene_row(viirs: &str) -> SceneRow {
    SceneRow {
        era5_t2m_file: "t2m.tif".to_string(),
        era5_d2m_file: "d2m.tif".to_string(),
        era5_tp_file: "tp.tif".to_string(),
        era5_u10_file: "u10.tif".to_string(),
        era5_v10_file: "v10.tif".to_string(),
        viirs_file: viirs.to_string(),
        dem_file: "dem.tif".to_string(),
        lulc_file: "lulc.tif".to_string(),
        target_band_idxs: "[1]".to_string(),
    }
}

fn in_memory_cache() -> Arc<RasterCache> {
    let mut entries: Vec<(String, RasterArray)> = Vec::new();
    for (i, name) in ["t2m.tif", "d2m.tif", "tp.tif", "u10.tif", "v10.tif", "dem.tif", "lulc.tif"]
        .iter()
        .enumerate()
    {
        entries.push((
            name.to_string(),
            RasterArray::Plane(Array2::from_elem((16, 16), (i + 1) as f32)),
        ));
    }
    let mut fire = Array3::zeros((2, 16, 16));
    fire[[0, 8, 8]] = 1.0;
    entries.push(("viirs_fire.tif".to_string(), RasterArray::Stack(fire)));
    entries.push((
        "viirs_clear.tif".to_string(),
        RasterArray::Stack(Array3::zeros((2, 16, 16))),
    ));
    Arc::new(RasterCache::from_entries(entries))
}

/// 38 rows with fire detections on rows 14..=21: 30 valid windows, 10 fire.
fn scene_table() -> SceneTable {
    SceneTable::from_rows(
        (0..38)
            .map(|i| {
                if (14..=21).contains(&i) {
                    scene_row("viirs_fire.tif")
                } else {
                    scene_row("viirs_clear.tif")
                }
            })
            .collect(),
    )
}

fn pipeline_config() -> PipelineConfig {
    PipelineConfig {
        patch_size: 5,
        batch_size: 8,
        shuffle_buffer: 16,
        ..PipelineConfig::default()
    }
}

#[test]
fn test_end_to_end_sample_assembly() {
    let _ = env_logger::builder().is_test(true).try_init();

    let config = pipeline_config();
    let cache = in_memory_cache();
    let table = scene_table();

    let sampler = BalancedSampler::with_seed(&table, cache, &config, 7).unwrap();
    assert_eq!(sampler.stats().fire_windows, 10);
    assert_eq!(sampler.stats().non_fire_selected, 10);

    let stream = BatchStream::with_seed(sampler, &config, 7).unwrap();
    let batches: Vec<_> = stream.map(|b| b.unwrap()).collect();

    // 20 samples at batch_size 8: two full batches plus a partial of 4
    assert_eq!(batches.len(), 3);
    assert_eq!(batches[0].len(), 8);
    assert_eq!(batches[1].len(), 8);
    assert_eq!(batches[2].len(), 4);

    for batch in &batches {
        let n = batch.len();
        assert_eq!(batch.x.dim(), (n, 6, 5, 5, 7));
        assert_eq!(batch.y.dim(), (n, 3, 5, 5));
        // input channels carry their per-raster fill values
        assert_relative_eq!(batch.x[[0, 0, 2, 2, 0]], 1.0);
        assert_relative_eq!(batch.x[[0, 0, 2, 2, 6]], 7.0);
    }

    // exactly the fire-window samples carry a positive target cell
    let positive_samples: usize = batches
        .iter()
        .map(|batch| {
            (0..batch.len())
                .filter(|&n| {
                    batch
                        .y
                        .index_axis(ndarray::Axis(0), n)
                        .iter()
                        .any(|&v| v > 0.0)
                })
                .count()
        })
        .sum();
    assert_eq!(positive_samples, 10);
}

#[test]
fn test_end_to_end_with_prefetch() {
    let config = pipeline_config();
    let sampler = BalancedSampler::with_seed(&scene_table(), in_memory_cache(), &config, 7).unwrap();
    let prefetched = BatchStream::with_seed(sampler, &config, 7).unwrap().prefetch(2);

    let total: usize = prefetched.map(|b| b.unwrap().len()).sum();
    assert_eq!(total, 20);
}

#[test]
fn test_end_to_end_drop_remainder() {
    let config = PipelineConfig {
        drop_remainder: true,
        ..pipeline_config()
    };
    let sampler = BalancedSampler::with_seed(&scene_table(), in_memory_cache(), &config, 7).unwrap();
    let stream = BatchStream::with_seed(sampler, &config, 7).unwrap();
    let batches: Vec<_> = stream.map(|b| b.unwrap()).collect();
    assert_eq!(batches.len(), 2);
    assert!(batches.iter().all(|b| b.len() == 8));
}

#[test]
fn test_sampler_stream_is_single_pass() {
    let config = pipeline_config();
    let mut sampler =
        BalancedSampler::with_seed(&scene_table(), in_memory_cache(), &config, 7).unwrap();
    let total = sampler.remaining();
    for _ in 0..total {
        assert!(sampler.next().is_some());
    }
    // exhausted for good
    assert!(sampler.next().is_none());
    assert!(sampler.next().is_none());
    assert_eq!(sampler.remaining(), 0);
}

#[test]
fn test_table_from_csv_feeds_pipeline() {
    let mut csv_data = String::from(
        "era5_t2m_file,era5_d2m_file,era5_tp_file,era5_u10_file,era5_v10_file,viirs_file,dem_file,lulc_file,target_band_idxs\n",
    );
    for i in 0..12 {
        let viirs = if i == 9 { "viirs_fire.tif" } else { "viirs_clear.tif" };
        csv_data.push_str(&format!(
            "t2m.tif,d2m.tif,tp.tif,u10.tif,v10.tif,{},dem.tif,lulc.tif,\"[1]\"\n",
            viirs
        ));
    }
    let table = SceneTable::from_reader(csv_data.as_bytes()).unwrap();
    assert_eq!(table.len(), 12);
    assert_eq!(table.valid_window_starts(6, 3), 4);

    let config = pipeline_config();
    let sampler = BalancedSampler::with_seed(&table, in_memory_cache(), &config, 3).unwrap();
    // fire row 9 is in the horizon of windows 1..=3
    assert_eq!(sampler.stats().fire_windows, 3);
    let samples: Vec<_> = sampler.collect();
    assert!(samples.iter().all(|s| s.is_ok()));
}
