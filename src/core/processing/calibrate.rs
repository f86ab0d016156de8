use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::raster::{Band, Scene};
use crate::error::{Error, Result};

/// Sentinel-2 MSI band identifiers and the names used downstream
pub const SENTINEL2_BANDS: [(&str, &str); 13] = [
    ("B1", "aerosol"),
    ("B2", "blue"),
    ("B3", "green"),
    ("B4", "red"),
    ("B5", "B5"),
    ("B6", "red2"),
    ("B7", "B7"),
    ("B8", "B8"),
    ("B8A", "red4"),
    ("B9", "h2o"),
    ("B10", "cirrus"),
    ("B11", "swir1"),
    ("B12", "swir2"),
];

/// Digital number to top-of-atmosphere reflectance conversion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationParams {
    /// Reflectance = DN / scale_factor
    pub scale_factor: f32,
    /// Quality bitmask band, carried through unscaled
    pub qa_band: String,
}

impl Default for CalibrationParams {
    fn default() -> Self {
        Self {
            scale_factor: 10000.0,
            qa_band: "QA60".to_string(),
        }
    }
}

/// Converts a raw Sentinel-2 scene to reflectance with the downstream band
/// names, followed by the unscaled QA band. Solar angles and any active mask
/// are kept.
pub fn to_reflectance(scene: &Scene, params: &CalibrationParams) -> Result<Scene> {
    if !(params.scale_factor.is_finite() && params.scale_factor > 0.0) {
        return Err(Error::InvalidArgument {
            arg: "scale_factor",
            value: params.scale_factor.to_string(),
        });
    }
    let inv = 1.0 / params.scale_factor;

    let mut bands = Vec::with_capacity(SENTINEL2_BANDS.len() + 1);
    for (source, target) in SENTINEL2_BANDS {
        let dn = scene.band_data(source)?;
        bands.push(Band::new(target, dn.mapv(|v| v * inv)));
    }
    bands.push(scene.band(&params.qa_band)?.clone());

    debug!("{}: calibrated {} bands to reflectance", scene.id, bands.len() - 1);
    scene.with_bands(bands)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::test_support::grid;
    use crate::types::Sensor;
    use crate::core::raster::SceneMetadata;
    use approx::assert_relative_eq;
    use chrono::Utc;
    use ndarray::Array2;

    fn raw_scene() -> Scene {
        let mut scene = Scene::new("raw", Sensor::Optical, Utc::now(), grid(2, 2), SceneMetadata::default());
        for (i, (source, _)) in SENTINEL2_BANDS.iter().enumerate() {
            scene = scene
                .with_band(*source, Array2::from_elem((2, 2), 1000.0 * (i + 1) as f32))
                .unwrap();
        }
        scene.with_band("QA60", Array2::from_elem((2, 2), 1024.0)).unwrap()
    }

    #[test]
    fn test_renames_and_scales() {
        let toa = to_reflectance(&raw_scene(), &CalibrationParams::default()).unwrap();
        assert_eq!(toa.band_names()[..4], ["aerosol", "blue", "green", "red"]);
        assert_eq!(toa.band_names().len(), 14);
        assert_relative_eq!(toa.value("red4", 0, 0).unwrap().unwrap(), 0.9, epsilon = 1e-6);
        assert_eq!(toa.value("QA60", 1, 1).unwrap(), Some(1024.0));
    }

    #[test]
    fn test_missing_source_band() {
        let scene = raw_scene().select(&["B2", "B3", "QA60"]).unwrap();
        let err = to_reflectance(&scene, &CalibrationParams::default()).unwrap_err();
        assert!(matches!(err, Error::MissingBand { ref band, .. } if band == "B1"));
    }
}
