//! Per-pixel temporal statistics over the valid observations of a time series.
use std::ops::Range;

use ndarray::{Array2, Array3};

use crate::core::raster::Mask;
use crate::types::Statistic;

/// One scene's contribution to a reduction: band values and optional mask
#[derive(Clone, Copy)]
pub struct Observation<'a> {
    pub data: &'a Array2<f32>,
    pub mask: Option<&'a Mask>,
}

impl Observation<'_> {
    #[inline]
    fn get(&self, row: usize, col: usize) -> Option<f32> {
        if self.mask.is_some_and(|m| !m[[row, col]]) {
            return None;
        }
        let v = self.data[[row, col]];
        v.is_finite().then_some(v)
    }
}

/// Linear interpolation between order statistics, `pos = p/100 * (n - 1)`.
/// `sorted` must be ascending; `None` when empty. `p` outside [0, 100] is
/// clamped to the minimum or maximum.
#[inline]
pub fn percentile_linear(sorted: &[f64], p: f64) -> Option<f64> {
    let n = sorted.len();
    match n {
        0 => None,
        1 => Some(sorted[0]),
        _ => {
            let pos = (p / 100.0).clamp(0.0, 1.0) * (n - 1) as f64;
            let lo = pos.floor() as usize;
            let hi = (lo + 1).min(n - 1);
            let t = pos - lo as f64;
            Some(sorted[lo] * (1.0 - t) + sorted[hi] * t)
        }
    }
}

/// Population standard deviation (divisor N), two-pass
#[inline]
pub fn population_std(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
    Some(var.sqrt())
}

/// Reduces rows `rows` of every observation into `statistic.width()` output
/// planes of shape (rows.len(), cols). Pixels without observations are `NaN`.
pub fn reduce_tile(
    observations: &[Observation<'_>],
    rows: Range<usize>,
    cols: usize,
    statistic: &Statistic,
) -> Array3<f32> {
    let width = statistic.width();
    let mut out = Array3::from_elem((width, rows.len(), cols), f32::NAN);
    let mut values: Vec<f64> = Vec::with_capacity(observations.len());

    for (tr, r) in rows.enumerate() {
        for c in 0..cols {
            values.clear();
            values.extend(observations.iter().filter_map(|o| o.get(r, c)).map(f64::from));
            if values.is_empty() {
                continue;
            }
            match statistic {
                Statistic::Percentile(ps) => {
                    values.sort_by(f64::total_cmp);
                    for (k, &p) in ps.iter().enumerate() {
                        if let Some(v) = percentile_linear(&values, p) {
                            out[[k, tr, c]] = v as f32;
                        }
                    }
                }
                Statistic::StdDev => {
                    if let Some(v) = population_std(&values) {
                        out[[0, tr, c]] = v as f32;
                    }
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_percentiles_of_three() {
        let v = [1.0, 2.0, 3.0];
        assert_relative_eq!(percentile_linear(&v, 50.0).unwrap(), 2.0);
        assert_relative_eq!(percentile_linear(&v, 5.0).unwrap(), 1.1, epsilon = 1e-12);
        assert_relative_eq!(percentile_linear(&v, 0.0).unwrap(), 1.0);
        assert_relative_eq!(percentile_linear(&v, 100.0).unwrap(), 3.0);
        assert_eq!(percentile_linear(&[], 50.0), None);
        assert_eq!(percentile_linear(&[4.0], 90.0), Some(4.0));
    }

    #[test]
    fn test_out_of_range_percentiles_clamp() {
        let v = [1.0, 2.0, 3.0];
        assert_eq!(percentile_linear(&v, 150.0), Some(3.0));
        assert_eq!(percentile_linear(&v, -5.0), Some(1.0));

        let data = Array2::from_shape_vec((1, 2), vec![1.0, 4.0]).unwrap();
        let obs = [Observation { data: &data, mask: None }];
        let out = reduce_tile(&obs, 0..1, 2, &Statistic::Percentile(vec![250.0]));
        assert_eq!(out[[0, 0, 1]], 4.0);
    }

    #[test]
    fn test_population_std() {
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_eq!(population_std(&v), Some(2.0));
        assert_eq!(population_std(&[3.0]), Some(0.0));
        assert_eq!(population_std(&[]), None);
    }

    #[test]
    fn test_reduce_tile_skips_masked_and_nodata() {
        let a = Array2::from_shape_vec((1, 3), vec![1.0, 5.0, f32::NAN]).unwrap();
        let b = Array2::from_shape_vec((1, 3), vec![3.0, 7.0, f32::NAN]).unwrap();
        let c = Array2::from_shape_vec((1, 3), vec![2.0, 100.0, 1.0]).unwrap();
        let c_mask = Mask::from_shape_vec((1, 3), vec![true, false, false]).unwrap();
        let obs = [
            Observation { data: &a, mask: None },
            Observation { data: &b, mask: None },
            Observation { data: &c, mask: Some(&c_mask) },
        ];

        let out = reduce_tile(&obs, 0..1, 3, &Statistic::Percentile(vec![50.0, 5.0]));
        assert_eq!(out.dim(), (2, 1, 3));
        assert_relative_eq!(out[[0, 0, 0]], 2.0);
        assert_relative_eq!(out[[1, 0, 0]], 1.1, epsilon = 1e-6);
        assert_relative_eq!(out[[0, 0, 1]], 6.0);
        // zero valid observations: no-data, not zero
        assert!(out[[0, 0, 2]].is_nan());
        assert!(out[[1, 0, 2]].is_nan());

        let sd = reduce_tile(&obs, 0..1, 3, &Statistic::StdDev);
        assert_relative_eq!(sd[[0, 0, 1]], 1.0);
        assert!(sd[[0, 0, 2]].is_nan());
    }

    #[test]
    fn test_order_insensitive() {
        let planes: Vec<Array2<f32>> = [4.0, 1.0, 3.0, 2.0]
            .iter()
            .map(|&v| Array2::from_elem((2, 2), v))
            .collect();
        let forward: Vec<Observation> = planes.iter().map(|d| Observation { data: d, mask: None }).collect();
        let backward: Vec<Observation> = forward.iter().rev().copied().collect();
        let stat = Statistic::Percentile(vec![90.0, 50.0]);
        assert_eq!(
            reduce_tile(&forward, 0..2, 2, &stat),
            reduce_tile(&backward, 0..2, 2, &stat)
        );
    }
}
