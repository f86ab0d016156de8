//! Eager, tile-parallel execution of per-scene transforms and temporal reductions.
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use ndarray::{Array3, Axis, concatenate};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::core::processing::reduce::{Observation, reduce_tile};
use crate::core::raster::{Band, Collection, Raster, Scene};
use crate::error::{Error, Result};
use crate::types::Statistic;

/// Cooperative cancellation shared between a caller and running work.
/// Once raised, no new scene or tile is started.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[derive(Debug, Clone)]
pub struct Executor {
    tile_rows: usize,
    cancel: CancelFlag,
}

impl Default for Executor {
    fn default() -> Self {
        Self {
            tile_rows: 256,
            cancel: CancelFlag::new(),
        }
    }
}

impl Executor {
    pub fn new(tile_rows: usize) -> Result<Self> {
        if tile_rows == 0 {
            return Err(Error::InvalidArgument {
                arg: "tile_rows",
                value: tile_rows.to_string(),
            });
        }
        Ok(Self {
            tile_rows,
            cancel: CancelFlag::new(),
        })
    }

    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_flag(&self) -> &CancelFlag {
        &self.cancel
    }

    pub fn tile_rows(&self) -> usize {
        self.tile_rows
    }

    /// Applies `f` to every scene in parallel; the result has the same size.
    pub fn map<F>(&self, collection: &Collection, f: F) -> Result<Collection>
    where
        F: Fn(&Scene) -> Result<Scene> + Sync + Send,
    {
        let scenes = collection
            .scenes()
            .par_iter()
            .map(|scene| {
                self.cancel.check()?;
                f(scene)
            })
            .collect::<Result<Vec<_>>>()?;
        Collection::new(scenes)
    }

    /// Reduces `band` over the collection, one output band per statistic value.
    pub fn reduce(&self, collection: &Collection, band: &str, statistic: &Statistic) -> Result<Raster> {
        validate_statistic(statistic)?;
        let grid = collection
            .grid()
            .ok_or_else(|| Error::EmptyCollection(format!("no scenes to reduce `{}`", band)))?;
        let (rows, cols) = grid.shape();

        let observations = collection
            .iter()
            .map(|scene| {
                Ok(Observation {
                    data: scene.band_data(band)?,
                    mask: scene.mask(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let tiles: Vec<_> = (0..rows)
            .step_by(self.tile_rows)
            .map(|start| start..(start + self.tile_rows).min(rows))
            .collect();
        debug!(
            "Reducing {} with {} over {} scenes in {} tiles",
            band,
            statistic,
            observations.len(),
            tiles.len()
        );

        let parts = tiles
            .into_par_iter()
            .map(|range| {
                self.cancel.check()?;
                Ok(reduce_tile(&observations, range, cols, statistic))
            })
            .collect::<Result<Vec<Array3<f32>>>>()?;

        let stacked = if parts.is_empty() {
            Array3::from_elem((statistic.width(), 0, cols), f32::NAN)
        } else {
            let views: Vec<_> = parts.iter().map(|p| p.view()).collect();
            concatenate(Axis(1), &views).map_err(Error::external)?
        };

        let bands = statistic
            .output_names(band)
            .into_iter()
            .zip(stacked.axis_iter(Axis(0)))
            .map(|(name, plane)| Band::new(name, plane.to_owned()))
            .collect();
        Raster::from_bands(grid.clone(), bands)
    }

    /// Reduces several (band, statistic) pairs in parallel and stacks the
    /// outputs in request order.
    pub fn reduce_many(&self, collection: &Collection, requests: &[(String, Statistic)]) -> Result<Raster> {
        let grid = collection
            .grid()
            .ok_or_else(|| Error::EmptyCollection("no scenes to reduce".to_string()))?;
        let parts = requests
            .par_iter()
            .map(|(band, statistic)| self.reduce(collection, band, statistic))
            .collect::<Result<Vec<_>>>()?;

        let bands: Vec<Band> = parts.iter().flat_map(|r| r.bands().iter().cloned()).collect();
        info!("Reduced {} scenes into {} bands", collection.len(), bands.len());
        Raster::from_bands(grid.clone(), bands)
    }
}

fn validate_statistic(statistic: &Statistic) -> Result<()> {
    if let Statistic::Percentile(ps) = statistic {
        if ps.is_empty() {
            return Err(Error::InvalidArgument {
                arg: "percentiles",
                value: "[]".to_string(),
            });
        }
        if let Some(p) = ps.iter().find(|p| !(0.0..=100.0).contains(*p)) {
            return Err(Error::InvalidArgument {
                arg: "percentile",
                value: p.to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::raster::Mask;
    use crate::core::test_support::radar_scene;
    use approx::assert_relative_eq;
    use ndarray::Array2;

    fn series(values: &[f32]) -> Collection {
        let scenes = values
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                let vv = Array2::from_elem((5, 3), v);
                radar_scene(&format!("s{}", i), vv.clone(), vv - 6.0)
            })
            .collect();
        Collection::new(scenes).unwrap()
    }

    #[test]
    fn test_tiling_does_not_change_result() {
        let collection = series(&[-12.0, -8.0, -10.0]);
        let stat = Statistic::Percentile(vec![95.0, 50.0, 5.0]);
        let whole = Executor::new(64).unwrap().reduce(&collection, "VV", &stat).unwrap();
        let tiled = Executor::new(2).unwrap().reduce(&collection, "VV", &stat).unwrap();

        assert_eq!(whole.band_names(), vec!["VV_p95", "VV_p50", "VV_p5"]);
        for (a, b) in whole.bands().iter().zip(tiled.bands()) {
            assert_eq!(a.data, b.data);
        }
        assert_relative_eq!(tiled.value("VV_p50", 4, 2).unwrap(), -10.0);
        assert_relative_eq!(tiled.value("VV_p5", 0, 0).unwrap(), -11.8, epsilon = 1e-5);
    }

    #[test]
    fn test_map_preserves_size_and_applies_masks() {
        let collection = series(&[-12.0, -8.0]);
        let mut half = Mask::from_elem((5, 3), true);
        half.row_mut(0).fill(false);
        let masked = Executor::default()
            .map(&collection, |s| s.update_mask(&half))
            .unwrap();
        assert_eq!(masked.len(), 2);

        let sd = Executor::default().reduce(&masked, "VV", &Statistic::StdDev).unwrap();
        assert_eq!(sd.value("VV_stdDev", 0, 1), None);
        assert_relative_eq!(sd.value("VV_stdDev", 1, 1).unwrap(), 2.0);
    }

    #[test]
    fn test_reduce_many_stacks_in_order() {
        let collection = series(&[-12.0, -8.0, -10.0]);
        let requests = vec![
            ("VV".to_string(), Statistic::Percentile(vec![95.0, 50.0, 5.0])),
            ("VH".to_string(), Statistic::Percentile(vec![95.0, 50.0, 5.0])),
            ("VV".to_string(), Statistic::StdDev),
            ("VH".to_string(), Statistic::StdDev),
        ];
        let raster = Executor::default().reduce_many(&collection, &requests).unwrap();
        assert_eq!(
            raster.band_names(),
            vec!["VV_p95", "VV_p50", "VV_p5", "VH_p95", "VH_p50", "VH_p5", "VV_stdDev", "VH_stdDev"]
        );

        let duplicate = vec![
            ("VV".to_string(), Statistic::StdDev),
            ("VV".to_string(), Statistic::StdDev),
        ];
        assert!(matches!(
            Executor::default().reduce_many(&collection, &duplicate),
            Err(Error::BandCollision { .. })
        ));
    }

    #[test]
    fn test_invalid_requests() {
        let collection = series(&[1.0]);
        let exec = Executor::default();
        assert!(matches!(
            exec.reduce(&collection, "VV", &Statistic::percentile(101.0)),
            Err(Error::InvalidArgument { .. })
        ));
        assert!(matches!(
            exec.reduce(&collection, "HH", &Statistic::StdDev),
            Err(Error::MissingBand { .. })
        ));
        assert!(matches!(
            exec.reduce(&Collection::default(), "VV", &Statistic::StdDev),
            Err(Error::EmptyCollection(_))
        ));
        assert!(Executor::new(0).is_err());
    }

    #[test]
    fn test_cancelled_executor_starts_no_work() {
        let collection = series(&[1.0, 2.0]);
        let exec = Executor::default();
        exec.cancel_flag().cancel();
        assert!(matches!(exec.map(&collection, |s| Ok(s.clone())), Err(Error::Cancelled)));
        assert!(matches!(
            exec.reduce(&collection, "VV", &Statistic::StdDev),
            Err(Error::Cancelled)
        ));
    }
}
