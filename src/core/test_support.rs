//! Synthetic grids and scenes shared by unit tests.
use chrono::{TimeZone, Utc};
use ndarray::Array2;

use crate::core::raster::{GeoTransform, Grid, Scene, SceneMetadata};
use crate::types::{OrbitPass, Polarization, Sensor};

pub fn grid(rows: usize, cols: usize) -> Grid {
    Grid::new(
        rows,
        cols,
        GeoTransform {
            origin_x: 0.0,
            origin_y: rows as f64 * 20.0,
            pixel_size: 20.0,
        },
        "EPSG:25831",
    )
}

/// Calibrated optical scene with uniform reflectances and a clear QA band
pub fn reflectance_scene(id: &str, rows: usize, cols: usize) -> Scene {
    let metadata = SceneMetadata {
        solar_azimuth: Some(160.0),
        solar_zenith: Some(40.0),
        ..SceneMetadata::default()
    };
    let bands = [
        ("green", 0.08),
        ("red", 0.06),
        ("red4", 0.30),
        ("swir1", 0.20),
        ("swir2", 0.12),
        ("QA60", 0.0),
    ];
    let mut scene = Scene::new(
        id,
        Sensor::Optical,
        Utc.with_ymd_and_hms(2017, 6, 1, 10, 30, 0).unwrap(),
        grid(rows, cols),
        metadata,
    );
    for (name, value) in bands {
        scene = scene
            .with_band(name, Array2::from_elem((rows, cols), value))
            .unwrap();
    }
    scene
}

/// Dual-polarization radar scene in dB
pub fn radar_scene(id: &str, vv: Array2<f32>, vh: Array2<f32>) -> Scene {
    let (rows, cols) = vv.dim();
    let metadata = SceneMetadata {
        orbit_pass: Some(OrbitPass::Descending),
        polarizations: vec![Polarization::Vv, Polarization::Vh],
        instrument_mode: Some("IW".to_string()),
        relative_orbit: Some(37),
        ..SceneMetadata::default()
    };
    Scene::new(
        id,
        Sensor::Radar,
        Utc.with_ymd_and_hms(2017, 6, 2, 17, 0, 0).unwrap(),
        grid(rows, cols),
        metadata,
    )
    .with_band("VV", vv)
    .unwrap()
    .with_band("VH", vh)
    .unwrap()
}
