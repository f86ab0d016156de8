//! Scene catalogs: enumerate the scenes matching spatio-temporal and
//! acquisition filters and hand them out as a `Collection`.
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::core::params::DateRange;
use crate::core::raster::{Bounds, Collection, Grid, Scene, SceneMetadata};
use crate::error::{Error, Result};
use crate::io::reader::read_band;
use crate::types::{OrbitPass, Polarization, Sensor};

/// Conjunctive scene filter; `None` / empty fields match everything
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneFilter {
    pub sensor: Option<Sensor>,
    /// Scene footprint must intersect these bounds
    pub bounds: Option<Bounds>,
    pub dates: Option<DateRange>,
    /// Scene must carry every listed polarization
    pub polarizations: Vec<Polarization>,
    pub instrument_mode: Option<String>,
    pub orbit_pass: Option<OrbitPass>,
    pub relative_orbit: Option<u32>,
}

impl SceneFilter {
    pub fn matches(&self, scene: &Scene) -> bool {
        self.matches_header(scene.sensor, &scene.acquired, &scene.grid, &scene.metadata)
    }

    /// Same test on scene attributes alone, before any band is loaded
    pub fn matches_header(
        &self,
        sensor: Sensor,
        acquired: &DateTime<Utc>,
        grid: &Grid,
        metadata: &SceneMetadata,
    ) -> bool {
        if self.sensor.is_some_and(|s| s != sensor) {
            return false;
        }
        if self.bounds.is_some_and(|b| !b.intersects(&grid.bounds())) {
            return false;
        }
        if self.dates.is_some_and(|d| !d.contains(acquired)) {
            return false;
        }
        if !self.polarizations.iter().all(|p| metadata.polarizations.contains(p)) {
            return false;
        }
        if let Some(mode) = &self.instrument_mode {
            if metadata.instrument_mode.as_deref() != Some(mode.as_str()) {
                return false;
            }
        }
        if self.orbit_pass.is_some() && metadata.orbit_pass != self.orbit_pass {
            return false;
        }
        if self.relative_orbit.is_some() && metadata.relative_orbit != self.relative_orbit {
            return false;
        }
        true
    }
}

/// Source of scenes for a pipeline run
pub trait SceneCatalog {
    fn fetch_collection(&self, filter: &SceneFilter) -> Result<Collection>;
}

/// Catalog over scenes already held in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    scenes: Vec<Scene>,
}

impl InMemoryCatalog {
    pub fn new(scenes: Vec<Scene>) -> Self {
        Self { scenes }
    }

    pub fn push(&mut self, scene: Scene) {
        self.scenes.push(scene);
    }

    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }
}

impl SceneCatalog for InMemoryCatalog {
    fn fetch_collection(&self, filter: &SceneFilter) -> Result<Collection> {
        let scenes: Vec<Scene> = self.scenes.iter().filter(|s| filter.matches(s)).cloned().collect();
        debug!("In-memory catalog: {} of {} scenes match", scenes.len(), self.scenes.len());
        Collection::new(scenes)
    }
}

/// One band raster of a manifest scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandEntry {
    pub name: String,
    /// Raster path, relative to the manifest directory unless absolute
    pub path: PathBuf,
    /// 1-based band index within the raster
    #[serde(default = "first_band")]
    pub band: usize,
}

fn first_band() -> usize {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub id: String,
    pub sensor: Sensor,
    pub acquired: DateTime<Utc>,
    pub grid: Grid,
    #[serde(default)]
    pub metadata: SceneMetadata,
    pub bands: Vec<BandEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub scenes: Vec<ManifestEntry>,
}

/// Catalog backed by a JSON manifest listing scenes and their band rasters.
/// Rasters are only read for scenes that pass the filter.
#[derive(Debug, Clone)]
pub struct ManifestCatalog {
    root: PathBuf,
    manifest: Manifest,
}

impl ManifestCatalog {
    pub fn new(root: impl Into<PathBuf>, manifest: Manifest) -> Self {
        Self {
            root: root.into(),
            manifest,
        }
    }

    pub fn open(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let manifest: Manifest = serde_json::from_reader(reader)
            .map_err(|e| Error::Catalog(format!("{}: {}", path.display(), e)))?;
        let root = path.parent().map(Path::to_path_buf).unwrap_or_default();
        info!("Opened manifest {:?} with {} scenes", path, manifest.scenes.len());
        Ok(Self::new(root, manifest))
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    fn load(&self, entry: &ManifestEntry) -> Result<Scene> {
        let mut scene = Scene::new(
            entry.id.clone(),
            entry.sensor,
            entry.acquired,
            entry.grid.clone(),
            entry.metadata.clone(),
        );
        for band in &entry.bands {
            let path = if band.path.is_absolute() {
                band.path.clone()
            } else {
                self.root.join(&band.path)
            };
            let data = read_band(&path, band.band)?;
            scene = scene.with_band(band.name.clone(), data)?;
        }
        Ok(scene)
    }
}

impl SceneCatalog for ManifestCatalog {
    fn fetch_collection(&self, filter: &SceneFilter) -> Result<Collection> {
        let selected: Vec<&ManifestEntry> = self
            .manifest
            .scenes
            .iter()
            .filter(|e| filter.matches_header(e.sensor, &e.acquired, &e.grid, &e.metadata))
            .collect();
        if selected.is_empty() {
            warn!("Manifest catalog: no scene matches {:?}", filter);
        }
        let scenes = selected
            .par_iter()
            .map(|entry| self.load(entry))
            .collect::<Result<Vec<_>>>()?;
        info!(
            "Manifest catalog: loaded {} of {} scenes",
            scenes.len(),
            self.manifest.scenes.len()
        );
        Collection::new(scenes)
    }
}
