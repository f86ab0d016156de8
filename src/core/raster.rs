//! Raster data model shared by every stage: grids and geometry, bands,
//! scenes with their validity mask, scene collections and reduction rasters.
//!
//! No-data is `NaN` in band data. A scene additionally carries at most one
//! active boolean mask (`true` = valid); masking never rewrites band values.
use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use ndarray::{Array2, Zip};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{OrbitPass, Polarization, Sensor};

/// Per-pixel validity, `true` = valid
pub type Mask = Array2<bool>;

/// North-up affine transform: upper-left corner and square pixel size in CRS units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub origin_y: f64,
    pub pixel_size: f64,
}

impl GeoTransform {
    /// GDAL-ordered coefficients
    pub fn to_gdal(&self) -> [f64; 6] {
        [self.origin_x, self.pixel_size, 0.0, self.origin_y, 0.0, -self.pixel_size]
    }
}

/// Axis-aligned bounds in CRS units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn intersects(&self, other: &Bounds) -> bool {
        self.min_x < other.max_x
            && other.min_x < self.max_x
            && self.min_y < other.max_y
            && other.min_y < self.max_y
    }
}

/// Simple polygon (exterior ring only) used for clipping and export regions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    pub exterior: Vec<[f64; 2]>,
}

impl Geometry {
    pub fn rectangle(bounds: Bounds) -> Self {
        Self {
            exterior: vec![
                [bounds.min_x, bounds.min_y],
                [bounds.max_x, bounds.min_y],
                [bounds.max_x, bounds.max_y],
                [bounds.min_x, bounds.max_y],
            ],
        }
    }

    pub fn bounds(&self) -> Bounds {
        let mut b = Bounds {
            min_x: f64::INFINITY,
            min_y: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            max_y: f64::NEG_INFINITY,
        };
        for &[x, y] in &self.exterior {
            b.min_x = b.min_x.min(x);
            b.min_y = b.min_y.min(y);
            b.max_x = b.max_x.max(x);
            b.max_y = b.max_y.max(y);
        }
        b
    }

    /// Even-odd point-in-polygon test
    pub fn contains(&self, x: f64, y: f64) -> bool {
        let ring = &self.exterior;
        let n = ring.len();
        if n < 3 {
            return false;
        }
        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let [xi, yi] = ring[i];
            let [xj, yj] = ring[j];
            if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
                inside = !inside;
            }
            j = i;
        }
        inside
    }
}

/// Pixel grid shared by co-registered bands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    pub rows: usize,
    pub cols: usize,
    pub transform: GeoTransform,
    pub crs: String,
}

impl Grid {
    pub fn new(rows: usize, cols: usize, transform: GeoTransform, crs: impl Into<String>) -> Self {
        Self {
            rows,
            cols,
            transform,
            crs: crs.into(),
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Ground sampling distance in CRS units
    pub fn pixel_size(&self) -> f64 {
        self.transform.pixel_size
    }

    /// Map coordinates of the pixel centre
    pub fn pixel_center(&self, row: usize, col: usize) -> (f64, f64) {
        let t = &self.transform;
        (
            t.origin_x + (col as f64 + 0.5) * t.pixel_size,
            t.origin_y - (row as f64 + 0.5) * t.pixel_size,
        )
    }

    pub fn bounds(&self) -> Bounds {
        let t = &self.transform;
        Bounds {
            min_x: t.origin_x,
            min_y: t.origin_y - self.rows as f64 * t.pixel_size,
            max_x: t.origin_x + self.cols as f64 * t.pixel_size,
            max_y: t.origin_y,
        }
    }

    pub fn check_shape<T>(&self, data: &Array2<T>) -> Result<()> {
        let (rows, cols) = data.dim();
        if (rows, cols) != self.shape() {
            return Err(Error::GridMismatch {
                expected_rows: self.rows,
                expected_cols: self.cols,
                rows,
                cols,
            });
        }
        Ok(())
    }

    pub fn check_same(&self, other: &Grid) -> Result<()> {
        if self.shape() != other.shape() || self.transform != other.transform {
            return Err(Error::GridMismatch {
                expected_rows: self.rows,
                expected_cols: self.cols,
                rows: other.rows,
                cols: other.cols,
            });
        }
        Ok(())
    }
}

/// Named band. Data is shared between derived scenes and never mutated.
#[derive(Debug, Clone)]
pub struct Band {
    pub name: String,
    pub data: Arc<Array2<f32>>,
}

impl Band {
    pub fn new(name: impl Into<String>, data: Array2<f32>) -> Self {
        Self {
            name: name.into(),
            data: Arc::new(data),
        }
    }

    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: Arc::clone(&self.data),
        }
    }
}

/// Scalar scene metadata relevant to masking and catalog filtering
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneMetadata {
    /// Mean solar azimuth angle, degrees
    pub solar_azimuth: Option<f64>,
    /// Mean solar zenith angle, degrees
    pub solar_zenith: Option<f64>,
    pub orbit_pass: Option<OrbitPass>,
    pub polarizations: Vec<Polarization>,
    pub instrument_mode: Option<String>,
    pub relative_orbit: Option<u32>,
}

/// One timestamped capture: co-registered bands plus an optional validity mask
#[derive(Debug, Clone)]
pub struct Scene {
    pub id: String,
    pub sensor: Sensor,
    pub acquired: DateTime<Utc>,
    pub grid: Grid,
    pub metadata: SceneMetadata,
    bands: Vec<Band>,
    mask: Option<Arc<Mask>>,
}

impl Scene {
    pub fn new(
        id: impl Into<String>,
        sensor: Sensor,
        acquired: DateTime<Utc>,
        grid: Grid,
        metadata: SceneMetadata,
    ) -> Self {
        Self {
            id: id.into(),
            sensor,
            acquired,
            grid,
            metadata,
            bands: Vec::new(),
            mask: None,
        }
    }

    /// Builder-style band insertion used at ingestion time
    pub fn with_band(mut self, name: impl Into<String>, data: Array2<f32>) -> Result<Self> {
        self.push_band(Band::new(name, data))?;
        Ok(self)
    }

    fn push_band(&mut self, band: Band) -> Result<()> {
        self.grid.check_shape(&band.data)?;
        if self.has_band(&band.name) {
            return Err(Error::BandCollision { band: band.name });
        }
        self.bands.push(band);
        Ok(())
    }

    pub fn bands(&self) -> &[Band] {
        &self.bands
    }

    pub fn band_names(&self) -> Vec<&str> {
        self.bands.iter().map(|b| b.name.as_str()).collect()
    }

    pub fn has_band(&self, name: &str) -> bool {
        self.bands.iter().any(|b| b.name == name)
    }

    pub fn band(&self, name: &str) -> Result<&Band> {
        self.bands
            .iter()
            .find(|b| b.name == name)
            .ok_or_else(|| Error::MissingBand {
                scene: self.id.clone(),
                band: name.to_string(),
            })
    }

    pub fn band_data(&self, name: &str) -> Result<&Array2<f32>> {
        Ok(self.band(name)?.data.as_ref())
    }

    /// New scene with `band` appended; this scene is left untouched.
    pub fn add_band(&self, band: Band) -> Result<Scene> {
        let mut out = self.clone();
        out.push_band(band)?;
        Ok(out)
    }

    /// New scene holding only `names`, in that order. The mask is kept.
    pub fn select(&self, names: &[&str]) -> Result<Scene> {
        let mut out = Scene {
            bands: Vec::with_capacity(names.len()),
            ..self.clone()
        };
        for name in names {
            out.push_band(self.band(name)?.clone())?;
        }
        Ok(out)
    }

    /// Same scene with a new band list, e.g. after renaming or rescaling
    pub fn with_bands(&self, bands: Vec<Band>) -> Result<Scene> {
        let mut out = Scene {
            bands: Vec::with_capacity(bands.len()),
            ..self.clone()
        };
        for band in bands {
            out.push_band(band)?;
        }
        Ok(out)
    }

    pub fn mask(&self) -> Option<&Mask> {
        self.mask.as_deref()
    }

    /// Active mask, or an all-valid mask when none was applied
    pub fn valid_mask(&self) -> Mask {
        match &self.mask {
            Some(m) => m.as_ref().clone(),
            None => Mask::from_elem(self.grid.shape(), true),
        }
    }

    /// New scene whose mask is the conjunction of the current mask and `mask`.
    pub fn update_mask(&self, mask: &Mask) -> Result<Scene> {
        self.grid.check_shape(mask)?;
        let combined = match &self.mask {
            Some(current) => Zip::from(current.as_ref())
                .and(mask)
                .map_collect(|&a, &b| a && b),
            None => mask.clone(),
        };
        Ok(Scene {
            mask: Some(Arc::new(combined)),
            ..self.clone()
        })
    }

    /// Value of `name` at (row, col), or `None` where masked or no-data
    pub fn value(&self, name: &str, row: usize, col: usize) -> Result<Option<f32>> {
        let data = self.band_data(name)?;
        let v = data[[row, col]];
        let masked = self.mask.as_ref().is_some_and(|m| !m[[row, col]]);
        Ok(if masked || !v.is_finite() { None } else { Some(v) })
    }

    /// (azimuth, zenith) in degrees
    pub fn solar_angles(&self) -> Result<(f64, f64)> {
        let azimuth = self.metadata.solar_azimuth.ok_or_else(|| Error::MissingMetadata {
            scene: self.id.clone(),
            field: "solar_azimuth",
        })?;
        let zenith = self.metadata.solar_zenith.ok_or_else(|| Error::MissingMetadata {
            scene: self.id.clone(),
            field: "solar_zenith",
        })?;
        Ok((azimuth, zenith))
    }
}

/// Order-irrelevant set of scenes sharing one grid
#[derive(Debug, Clone, Default)]
pub struct Collection {
    scenes: Vec<Scene>,
}

impl Collection {
    pub fn new(scenes: Vec<Scene>) -> Result<Self> {
        if let Some(first) = scenes.first() {
            for scene in &scenes[1..] {
                first.grid.check_same(&scene.grid)?;
            }
        }
        Ok(Self { scenes })
    }

    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }

    pub fn scenes(&self) -> &[Scene] {
        &self.scenes
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Scene> {
        self.scenes.iter()
    }

    pub fn grid(&self) -> Option<&Grid> {
        self.scenes.first().map(|s| &s.grid)
    }

    pub fn filter<P>(&self, predicate: P) -> Collection
    where
        P: Fn(&Scene) -> bool,
    {
        Collection {
            scenes: self.scenes.iter().filter(|s| predicate(s)).cloned().collect(),
        }
    }

    pub fn into_scenes(self) -> Vec<Scene> {
        self.scenes
    }
}

/// Multi-band raster produced by reductions. `NaN` marks no-data.
#[derive(Debug, Clone)]
pub struct Raster {
    pub grid: Grid,
    bands: Vec<Band>,
}

impl Raster {
    pub fn from_bands(grid: Grid, bands: Vec<Band>) -> Result<Self> {
        let mut seen = HashSet::new();
        for band in &bands {
            grid.check_shape(&band.data)?;
            if !seen.insert(band.name.as_str()) {
                return Err(Error::BandCollision {
                    band: band.name.clone(),
                });
            }
        }
        Ok(Self { grid, bands })
    }

    pub fn bands(&self) -> &[Band] {
        &self.bands
    }

    pub fn band_names(&self) -> Vec<&str> {
        self.bands.iter().map(|b| b.name.as_str()).collect()
    }

    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    pub fn band(&self, name: &str) -> Option<&Band> {
        self.bands.iter().find(|b| b.name == name)
    }

    /// Value of `name` at (row, col); `None` for no-data or an unknown band
    pub fn value(&self, name: &str, row: usize, col: usize) -> Option<f32> {
        let v = self.band(name)?.data[[row, col]];
        v.is_finite().then_some(v)
    }
}
