use ndarray::Zip;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::processing::cloud::{CloudMaskParams, decode_cloud_mask};
use crate::core::processing::shadow::{ShadowParams, project_shadows};
use crate::core::raster::{Mask, Scene};
use crate::error::Result;

/// Cloud and shadow detection settings for optical scenes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaskingParams {
    pub cloud: CloudMaskParams,
    pub shadow: ShadowParams,
}

/// cloud OR shadow
pub fn invalid_mask(cloud: &Mask, shadow: &Mask) -> Mask {
    Zip::from(cloud).and(shadow).map_collect(|&c, &s| c || s)
}

/// NOT (cloud OR shadow)
pub fn valid_mask(cloud: &Mask, shadow: &Mask) -> Mask {
    Zip::from(cloud).and(shadow).map_collect(|&c, &s| !(c || s))
}

/// Detects clouds and their shadows on a calibrated (and optionally indexed)
/// scene and returns the scene with every cloudy or shadowed pixel masked.
pub fn cloud_and_shadow_mask(scene: &Scene, params: &MaskingParams) -> Result<Scene> {
    let cloud = decode_cloud_mask(scene, &params.cloud)?;
    let shadow = project_shadows(scene, &cloud, &params.shadow)?;
    let valid = valid_mask(&cloud, &shadow);

    let total = valid.len().max(1) as f64;
    debug!(
        "{}: cloud={:.1}% shadow={:.1}% valid={:.1}%",
        scene.id,
        100.0 * cloud.iter().filter(|v| **v).count() as f64 / total,
        100.0 * shadow.iter().filter(|v| **v).count() as f64 / total,
        100.0 * valid.iter().filter(|v| **v).count() as f64 / total,
    );

    scene.update_mask(&valid)
}
