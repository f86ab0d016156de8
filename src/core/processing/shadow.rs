//! Cloud shadow projection.
//!
//! The cloud mask is translated along the solar azimuth by the horizontal
//! displacement `h * tan(zenith)` for a ladder of candidate cloud heights `h`.
//! The union of those footprints, minus the clouds themselves, is the potential
//! shadow; a dark-pixel test over ND(green, SWIR2) removes bright ground.
use std::f64::consts::FRAC_PI_2;

use ndarray::Zip;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::processing::indices::normalized_difference_bands;
use crate::core::raster::{Mask, Scene};
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadowParams {
    /// Lowest candidate cloud-base height, metres
    pub min_cloud_height: f64,
    /// Upper limit for candidate heights (inclusive if reached by the step)
    pub max_cloud_height: f64,
    pub height_step: f64,
    /// ND(green, dark_ir_band) above this marks a dark pixel
    pub dark_threshold: f32,
    pub green_band: String,
    pub dark_ir_band: String,
}

impl Default for ShadowParams {
    fn default() -> Self {
        Self {
            min_cloud_height: 200.0,
            max_cloud_height: 10000.0,
            height_step: 500.0,
            dark_threshold: 0.25,
            green_band: "green".to_string(),
            dark_ir_band: "swir2".to_string(),
        }
    }
}

impl ShadowParams {
    fn validate(&self) -> Result<()> {
        if !(self.height_step > 0.0) {
            return Err(Error::InvalidArgument {
                arg: "height_step",
                value: self.height_step.to_string(),
            });
        }
        if !(self.min_cloud_height >= 0.0 && self.min_cloud_height <= self.max_cloud_height) {
            return Err(Error::InvalidArgument {
                arg: "min_cloud_height",
                value: self.min_cloud_height.to_string(),
            });
        }
        Ok(())
    }

    /// min, min + step, ... up to and including max when reached
    pub fn cloud_heights(&self) -> Vec<f64> {
        let count = ((self.max_cloud_height - self.min_cloud_height) / self.height_step).floor() as usize + 1;
        (0..count)
            .map(|i| self.min_cloud_height + i as f64 * self.height_step)
            .collect()
    }
}

/// Pixel offsets (dx, dy) of the shadow for each candidate height, duplicates removed.
/// +dx is east (increasing column), +dy is south (increasing row), so the
/// shadow always points away from the sun.
pub fn shadow_offsets(
    azimuth_deg: f64,
    zenith_deg: f64,
    pixel_size: f64,
    heights: &[f64],
) -> Vec<(isize, isize)> {
    let azimuth = azimuth_deg.to_radians() + FRAC_PI_2;
    let zenith = zenith_deg.to_radians();

    let mut offsets: Vec<(isize, isize)> = Vec::with_capacity(heights.len());
    for &height in heights {
        let displacement = height * zenith.tan();
        let dx = (azimuth.cos() * displacement / pixel_size).round() as isize;
        let dy = (azimuth.sin() * displacement / pixel_size).round() as isize;
        if !offsets.contains(&(dx, dy)) {
            offsets.push((dx, dy));
        }
    }
    offsets
}

/// Mask translated by (dx, dy); pixels shifted in from outside the grid are `false`.
pub fn translate_mask(mask: &Mask, dx: isize, dy: isize) -> Mask {
    let mut out = Mask::from_elem(mask.dim(), false);
    for ((r, c), _) in mask.indexed_iter().filter(|(_, v)| **v) {
        if let Some(idx) = shifted(r, c, dx, dy, mask.dim()) {
            out[idx] = true;
        }
    }
    out
}

#[inline]
fn shifted(r: usize, c: usize, dx: isize, dy: isize, (rows, cols): (usize, usize)) -> Option<(usize, usize)> {
    let nr = (r as isize).checked_add(dy)?;
    let nc = (c as isize).checked_add(dx)?;
    if nr < 0 || nc < 0 || nr >= rows as isize || nc >= cols as isize {
        None
    } else {
        Some((nr as usize, nc as usize))
    }
}

/// Union of the cloud mask translated by every offset (clouds not yet excluded)
pub fn potential_shadow(cloud: &Mask, offsets: &[(isize, isize)]) -> Mask {
    offsets
        .iter()
        .fold(Mask::from_elem(cloud.dim(), false), |mut acc, &(dx, dy)| {
            Zip::from(&mut acc)
                .and(&translate_mask(cloud, dx, dy))
                .for_each(|a, &t| *a |= t);
            acc
        })
}

/// Dark, non-water, non-vegetation surfaces: ND(green, dark_ir_band) > threshold.
/// No-data never counts as dark.
pub fn dark_pixels(scene: &Scene, params: &ShadowParams) -> Result<Mask> {
    let nd = normalized_difference_bands(scene, &params.green_band, &params.dark_ir_band)?;
    Ok(nd.mapv(|v| v > params.dark_threshold))
}

/// Shadow mask (`true` = shadow) for `scene` given its cloud mask
pub fn project_shadows(scene: &Scene, cloud: &Mask, params: &ShadowParams) -> Result<Mask> {
    params.validate()?;
    scene.grid.check_shape(cloud)?;
    let (azimuth, zenith) = scene.solar_angles()?;

    let offsets = shadow_offsets(azimuth, zenith, scene.grid.pixel_size(), &params.cloud_heights());
    debug!(
        "{}: azimuth={:.2} zenith={:.2}, {} distinct shadow offsets",
        scene.id,
        azimuth,
        zenith,
        offsets.len()
    );

    let potential = potential_shadow(cloud, &offsets);
    let dark = dark_pixels(scene, params)?;

    Ok(Zip::from(&potential)
        .and(cloud)
        .and(&dark)
        .map_collect(|&p, &c, &d| p && !c && d))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::raster::Band;
    use crate::core::test_support::reflectance_scene;
    use ndarray::{Array2, s};

    #[test]
    fn test_cloud_heights() {
        let heights = ShadowParams::default().cloud_heights();
        assert_eq!(heights.len(), 20);
        assert_eq!(heights[0], 200.0);
        assert_eq!(heights[19], 9700.0);
    }

    #[test]
    fn test_zero_zenith_collapses_offsets() {
        let heights = ShadowParams::default().cloud_heights();
        let offsets = shadow_offsets(135.0, 0.0, 20.0, &heights);
        assert_eq!(offsets, vec![(0, 0)]);

        let mut cloud = Mask::from_elem((3, 3), false);
        cloud[[0, 0]] = true;
        let potential = potential_shadow(&cloud, &offsets);
        assert_eq!(potential, cloud);
    }

    #[test]
    fn test_offsets_follow_azimuth() {
        // sun due north: shadows fall south, towards increasing rows
        let offsets = shadow_offsets(0.0, 45.0, 20.0, &[200.0, 700.0]);
        assert_eq!(offsets, vec![(0, 10), (0, 35)]);
        // sun due south: shadows fall north
        let offsets = shadow_offsets(180.0, 45.0, 20.0, &[200.0, 700.0]);
        assert_eq!(offsets, vec![(0, -10), (0, -35)]);
        // sun due east: shadows fall west
        let offsets = shadow_offsets(90.0, 45.0, 20.0, &[200.0]);
        assert_eq!(offsets, vec![(-10, 0)]);
    }

    #[test]
    fn test_translate_mask_drops_out_of_grid() {
        let mut mask = Mask::from_elem((3, 3), false);
        mask[[1, 1]] = true;
        let moved = translate_mask(&mask, 1, 1);
        assert!(moved[[2, 2]]);
        assert_eq!(moved.iter().filter(|v| **v).count(), 1);
        let gone = translate_mask(&mask, 5, 0);
        assert!(gone.iter().all(|v| !*v));
    }

    fn dark_scene(rows: usize, cols: usize, azimuth: f64, zenith: f64) -> Scene {
        let mut scene = reflectance_scene("shadow", rows, cols)
            .select(&["green", "QA60"])
            .unwrap();
        scene.metadata.solar_azimuth = Some(azimuth);
        scene.metadata.solar_zenith = Some(zenith);
        // ND(green=0.08, swir2=0.02) = 0.6 > 0.25 everywhere except column 0
        let mut swir2 = Array2::from_elem((rows, cols), 0.02);
        swir2.column_mut(0).fill(0.30);
        scene.add_band(Band::new("swir2", swir2)).unwrap()
    }

    #[test]
    fn test_project_shadows_excludes_clouds_and_bright_ground() {
        // sun in the south, so shadows land north of the clouds
        let scene = dark_scene(60, 3, 180.0, 45.0);
        let mut cloud = Mask::from_elem((60, 3), false);
        cloud[[50, 1]] = true;
        cloud[[50, 0]] = true;
        // a cloud sitting where a shadow would fall is still cloud, not shadow
        cloud[[40, 1]] = true;

        let shadow = project_shadows(&scene, &cloud, &ShadowParams::default()).unwrap();
        assert!(!shadow[[40, 1]]);
        assert!(shadow[[15, 1]]);
        assert!(shadow[[30, 1]]);
        // column 0 is bright ground
        assert!(!shadow[[15, 0]]);
        assert!(!shadow[[50, 1]]);
    }

    #[test]
    fn test_shadows_fall_away_from_the_sun() {
        let scene = dark_scene(80, 3, 180.0, 45.0);
        let mut cloud = Mask::from_elem((80, 3), false);
        cloud[[40, 1]] = true;

        let shadow = project_shadows(&scene, &cloud, &ShadowParams::default()).unwrap();
        let north = shadow.slice(s![..40, ..]).iter().filter(|v| **v).count();
        let south = shadow.slice(s![41.., ..]).iter().filter(|v| **v).count();
        assert_eq!(north, 2);
        assert_eq!(south, 0);
        assert!(shadow[[30, 1]] && shadow[[5, 1]]);

        // the same cloud under a northern sun shades the rows below it
        let scene = dark_scene(80, 3, 0.0, 45.0);
        let shadow = project_shadows(&scene, &cloud, &ShadowParams::default()).unwrap();
        assert!(shadow[[50, 1]] && shadow[[75, 1]]);
        assert!(!shadow[[30, 1]]);
    }

    #[test]
    fn test_potential_shadow_is_union_of_translations() {
        let mut cloud = Mask::from_elem((5, 5), false);
        cloud[[2, 2]] = true;
        let potential = potential_shadow(&cloud, &[(1, 0), (0, -2)]);
        let expected = Zip::from(&translate_mask(&cloud, 1, 0))
            .and(&translate_mask(&cloud, 0, -2))
            .map_collect(|&a, &b| a || b);
        assert_eq!(potential, expected);
        assert!(potential[[2, 3]] && potential[[0, 2]]);
        assert_eq!(potential.iter().filter(|v| **v).count(), 2);
    }

    #[test]
    fn test_missing_solar_angles() {
        let mut scene = dark_scene(4, 4, 0.0, 30.0);
        scene.metadata.solar_zenith = None;
        let cloud = Mask::from_elem((4, 4), false);
        let err = project_shadows(&scene, &cloud, &ShadowParams::default()).unwrap_err();
        assert!(matches!(err, Error::MissingMetadata { field: "solar_zenith", .. }));
    }
}
