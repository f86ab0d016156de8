//! Per-scene preparation and composite recipes for the three exported products.
use tracing::info;

use crate::core::params::{OpticalParams, RadarParams};
use crate::core::processing::calibrate::to_reflectance;
use crate::core::processing::composite::Composite;
use crate::core::processing::edge::mask_edges;
use crate::core::processing::executor::Executor;
use crate::core::processing::indices::add_indices;
use crate::core::processing::masking::cloud_and_shadow_mask;
use crate::core::raster::{Collection, Geometry, Scene};
use crate::error::Result;
use crate::types::{CompositeKind, SpectralIndex, Statistic};

/// Export band order of the index composite
pub const INDEX_BANDS: [&str; 6] = ["NDBI_p90", "NDVI_p90", "NDWI_p90", "NDBI_p50", "NDVI_p50", "NDWI_p50"];

/// Export band order of the radar composite
pub const RADAR_BANDS: [&str; 8] = [
    "VV_p95", "VV_p50", "VV_p5", "VH_p95", "VH_p50", "VH_p5", "VV_stdDev", "VH_stdDev",
];

/// Reflectance bands reduced into the median composite
pub const REFLECTANCE_SOURCE_BANDS: [&str; 10] = [
    "blue", "green", "red", "B5", "red2", "B7", "B8", "red4", "swir1", "swir2",
];

/// Export band order of the reflectance composite
pub const REFLECTANCE_BANDS: [&str; 10] = [
    "blue_p50", "green_p50", "red_p50", "B5_p50", "red2_p50", "B7_p50", "B8_p50", "red4_p50", "swir1_p50",
    "swir2_p50",
];

/// Raw Sentinel-2 scene -> reflectance + NDBI/NDVI/NDWI, cloud and shadow masked
pub fn mask_optical_scene(scene: &Scene, params: &OpticalParams) -> Result<Scene> {
    let toa = to_reflectance(scene, &params.calibration)?;
    let indexed = add_indices(&toa, &SpectralIndex::ALL)?;
    cloud_and_shadow_mask(&indexed, &params.masking)
}

/// Sentinel-1 scene with border noise masked
pub fn denoise_radar_scene(scene: &Scene, params: &RadarParams) -> Result<Scene> {
    mask_edges(scene, &params.edge)
}

/// 90th and 50th percentile of each index
pub fn indices_composite(exec: &Executor, masked: &Collection, region: &Geometry) -> Result<Composite> {
    let requests: Vec<(String, Statistic)> = [90.0, 50.0]
        .iter()
        .flat_map(|&p| {
            SpectralIndex::ALL
                .into_iter()
                .map(move |index| (index.name().to_string(), Statistic::percentile(p)))
        })
        .collect();
    let raster = exec.reduce_many(masked, &requests)?;
    Composite::assemble(CompositeKind::Indices.export_name(), &[raster], region)?.select(&INDEX_BANDS)
}

/// VV/VH 95th, 50th and 5th percentiles plus standard deviations
pub fn radar_composite(exec: &Executor, denoised: &Collection, region: &Geometry) -> Result<Composite> {
    let percentiles = Statistic::Percentile(vec![95.0, 50.0, 5.0]);
    let requests: Vec<(String, Statistic)> = ["VV", "VH"]
        .iter()
        .flat_map(|band| {
            [
                (band.to_string(), percentiles.clone()),
                (band.to_string(), Statistic::StdDev),
            ]
        })
        .collect();
    let raster = exec.reduce_many(denoised, &requests)?;
    Composite::assemble(CompositeKind::Radar.export_name(), &[raster], region)?.select(&RADAR_BANDS)
}

/// Per-band median reflectance
pub fn reflectance_composite(exec: &Executor, masked: &Collection, region: &Geometry) -> Result<Composite> {
    let requests: Vec<(String, Statistic)> = REFLECTANCE_SOURCE_BANDS
        .iter()
        .map(|band| (band.to_string(), Statistic::percentile(50.0)))
        .collect();
    let raster = exec.reduce_many(masked, &requests)?;
    Composite::assemble(CompositeKind::Reflectance.export_name(), &[raster], region)?.select(&REFLECTANCE_BANDS)
}

/// Builds `kind` from an already prepared (masked or denoised) collection
pub fn build_composite(
    kind: CompositeKind,
    exec: &Executor,
    prepared: &Collection,
    region: &Geometry,
) -> Result<Composite> {
    info!("Building {} composite from {} scenes", kind, prepared.len());
    match kind {
        CompositeKind::Indices => indices_composite(exec, prepared, region),
        CompositeKind::Radar => radar_composite(exec, prepared, region),
        CompositeKind::Reflectance => reflectance_composite(exec, prepared, region),
    }
}
