use ndarray::{Array2, Zip};
use tracing::debug;

use crate::core::raster::{Band, Scene};
use crate::error::Result;
use crate::types::SpectralIndex;

/// Normalized difference: (a - b) / (a + b).
/// No-data where either input is no-data or where a + b == 0.
pub fn normalized_difference(a: &Array2<f32>, b: &Array2<f32>) -> Array2<f32> {
    Zip::from(a).and(b).par_map_collect(|&a_val, &b_val| {
        let sum = a_val + b_val;
        if !a_val.is_finite() || !b_val.is_finite() || sum == 0.0 {
            f32::NAN
        } else {
            (a_val - b_val) / sum
        }
    })
}

/// Normalized difference of two named bands of `scene`
pub fn normalized_difference_bands(scene: &Scene, a: &str, b: &str) -> Result<Array2<f32>> {
    let a_data = scene.band_data(a)?;
    let b_data = scene.band_data(b)?;
    Ok(normalized_difference(a_data, b_data))
}

/// New scene with `index` appended as a band named after the index
pub fn add_index(scene: &Scene, index: SpectralIndex) -> Result<Scene> {
    let (a, b) = index.bands();
    let data = normalized_difference_bands(scene, a, b)?;
    debug!("{}: added {} = ND({}, {})", scene.id, index, a, b);
    scene.add_band(Band::new(index.name(), data))
}

/// Appends each of `indices` in order
pub fn add_indices(scene: &Scene, indices: &[SpectralIndex]) -> Result<Scene> {
    indices
        .iter()
        .try_fold(scene.clone(), |acc, &index| add_index(&acc, index))
}
