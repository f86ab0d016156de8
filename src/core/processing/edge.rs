//! Border-noise removal for radar scenes.
//!
//! The reference band is unit-scaled from a dB window to a byte; non-zero
//! valid pixels form the foreground, which is split into 8-connected
//! components. Components smaller than `min_component_size` are masked,
//! as is the background. An optional inner buffer additionally masks a strip
//! along the footprint border.
use std::collections::VecDeque;

use ndarray::{Array2, Zip};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::raster::{Mask, Scene};
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeMaskParams {
    /// Band used to find the footprint; the first band when `None`
    pub reference_band: Option<String>,
    /// dB mapped to byte 0
    pub low_db: f32,
    /// dB mapped to byte 255
    pub high_db: f32,
    /// Components with fewer pixels are masked
    pub min_component_size: usize,
    /// Strip along the footprint border to mask, in CRS units
    pub inner_buffer: Option<f64>,
}

impl Default for EdgeMaskParams {
    fn default() -> Self {
        Self {
            reference_band: None,
            low_db: -25.0,
            high_db: 10.0,
            min_component_size: 100,
            inner_buffer: None,
        }
    }
}

impl EdgeMaskParams {
    fn validate(&self) -> Result<()> {
        if !(self.low_db < self.high_db) {
            return Err(Error::InvalidArgument {
                arg: "low_db",
                value: format!("{} (high_db {})", self.low_db, self.high_db),
            });
        }
        if let Some(buffer) = self.inner_buffer {
            if !(buffer.is_finite() && buffer >= 0.0) {
                return Err(Error::InvalidArgument {
                    arg: "inner_buffer",
                    value: buffer.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Linear map of [low, high] onto 0..=255, clamped and truncated. No-data maps to 0.
#[inline]
pub fn unit_scale_to_byte(value: f32, low: f32, high: f32) -> u8 {
    if !value.is_finite() {
        return 0;
    }
    let scaled = (value - low) / (high - low) * 255.0;
    scaled.clamp(0.0, 255.0) as u8
}

/// Valid pixels whose scaled byte is non-zero
pub fn foreground(data: &Array2<f32>, valid: &Mask, low: f32, high: f32) -> Mask {
    Zip::from(data)
        .and(valid)
        .map_collect(|&v, &ok| ok && unit_scale_to_byte(v, low, high) > 0)
}

/// 8-connected labelling of `mask`. Label 0 is background; component `k`
/// (1-based) has `sizes[k - 1]` pixels.
pub fn label_components(mask: &Mask) -> (Array2<u32>, Vec<usize>) {
    let (rows, cols) = mask.dim();
    let mut labels = Array2::<u32>::zeros((rows, cols));
    let mut sizes = Vec::new();
    let mut queue = VecDeque::new();

    for r in 0..rows {
        for c in 0..cols {
            if !mask[[r, c]] || labels[[r, c]] != 0 {
                continue;
            }
            let label = sizes.len() as u32 + 1;
            let mut size = 0usize;
            labels[[r, c]] = label;
            queue.push_back((r, c));

            while let Some((cr, cc)) = queue.pop_front() {
                size += 1;
                for nr in cr.saturating_sub(1)..=(cr + 1).min(rows - 1) {
                    for nc in cc.saturating_sub(1)..=(cc + 1).min(cols - 1) {
                        if mask[[nr, nc]] && labels[[nr, nc]] == 0 {
                            labels[[nr, nc]] = label;
                            queue.push_back((nr, nc));
                        }
                    }
                }
            }
            sizes.push(size);
        }
    }
    (labels, sizes)
}

/// Foreground pixels belonging to components of at least `min_size` pixels
pub fn remove_small_components(mask: &Mask, min_size: usize) -> Mask {
    let (labels, sizes) = label_components(mask);
    labels.mapv(|label| label != 0 && sizes[label as usize - 1] >= min_size)
}

/// Chebyshev distance, in pixels, from each pixel to the nearest invalid
/// pixel. Everything outside the grid counts as invalid.
fn border_distance(valid: &Mask) -> Array2<u32> {
    let (rows, cols) = valid.dim();
    let mut dist = valid.mapv(|v| if v { u32::MAX } else { 0 });
    let at = |d: &Array2<u32>, r: isize, c: isize| -> u32 {
        if r < 0 || c < 0 || r >= rows as isize || c >= cols as isize {
            0
        } else {
            d[[r as usize, c as usize]]
        }
    };

    for r in 0..rows as isize {
        for c in 0..cols as isize {
            let here = dist[[r as usize, c as usize]];
            if here == 0 {
                continue;
            }
            let nearest = [(-1, -1), (-1, 0), (-1, 1), (0, -1)]
                .iter()
                .map(|&(dr, dc)| at(&dist, r + dr, c + dc))
                .min()
                .unwrap_or(0);
            dist[[r as usize, c as usize]] = here.min(nearest.saturating_add(1));
        }
    }
    for r in (0..rows as isize).rev() {
        for c in (0..cols as isize).rev() {
            let here = dist[[r as usize, c as usize]];
            if here == 0 {
                continue;
            }
            let nearest = [(1, 1), (1, 0), (1, -1), (0, 1)]
                .iter()
                .map(|&(dr, dc)| at(&dist, r + dr, c + dc))
                .min()
                .unwrap_or(0);
            dist[[r as usize, c as usize]] = here.min(nearest.saturating_add(1));
        }
    }
    dist
}

/// `valid` shrunk by `width` pixels from every invalid pixel and the grid edge
pub fn inner_buffer_mask(valid: &Mask, width: u32) -> Mask {
    if width == 0 {
        return valid.clone();
    }
    border_distance(valid).mapv(|d| d > width)
}

/// Masks border noise on every band of a radar scene.
pub fn mask_edges(scene: &Scene, params: &EdgeMaskParams) -> Result<Scene> {
    params.validate()?;
    let reference = match &params.reference_band {
        Some(name) => scene.band(name)?,
        None => scene.bands().first().ok_or_else(|| Error::MissingBand {
            scene: scene.id.clone(),
            band: "<first band>".to_string(),
        })?,
    };

    let fg = foreground(&reference.data, &scene.valid_mask(), params.low_db, params.high_db);
    let mut keep = remove_small_components(&fg, params.min_component_size);

    if let Some(buffer) = params.inner_buffer {
        let width = (buffer / scene.grid.pixel_size()).round() as u32;
        keep = inner_buffer_mask(&keep, width);
    }

    debug!(
        "{}: edge mask on {} keeps {} of {} foreground pixels",
        scene.id,
        reference.name,
        keep.iter().filter(|v| **v).count(),
        fg.iter().filter(|v| **v).count()
    );
    scene.update_mask(&keep)
}
