//! Run configuration: study area, date window, masking/denoising parameters,
//! export and execution settings. Deserializable from JSON config files.
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core::processing::calibrate::CalibrationParams;
use crate::core::processing::edge::EdgeMaskParams;
use crate::core::processing::masking::MaskingParams;
use crate::core::raster::Geometry;
use crate::error::{Error, Result};
use crate::io::catalog::SceneFilter;
use crate::types::{OrbitPass, Polarization, Sensor};

const fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    match NaiveDate::from_ymd_opt(year, month, day) {
        Some(date) => date,
        None => panic!("invalid calendar date"),
    }
}

const DEFAULT_START: NaiveDate = ymd(2016, 6, 1);
const DEFAULT_END: NaiveDate = ymd(2018, 6, 1);

/// Acquisition window, start inclusive, end exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Default for DateRange {
    fn default() -> Self {
        Self {
            start: DEFAULT_START,
            end: DEFAULT_END,
        }
    }
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        let range = Self { start, end };
        range.validate()?;
        Ok(range)
    }

    fn validate(&self) -> Result<()> {
        if self.start >= self.end {
            return Err(Error::InvalidArgument {
                arg: "dates",
                value: format!("{}..{}", self.start, self.end),
            });
        }
        Ok(())
    }

    pub fn contains(&self, t: &DateTime<Utc>) -> bool {
        let day = t.date_naive();
        day >= self.start && day < self.end
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpticalParams {
    pub calibration: CalibrationParams,
    pub masking: MaskingParams,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RadarParams {
    /// Every scene must carry all of these
    pub polarizations: Vec<Polarization>,
    pub instrument_mode: Option<String>,
    pub orbit_pass: Option<OrbitPass>,
    /// Single relative orbit to keep; other tracks leave seams over the site
    pub relative_orbit: Option<u32>,
    pub edge: EdgeMaskParams,
}

impl Default for RadarParams {
    fn default() -> Self {
        Self {
            polarizations: vec![Polarization::Vv, Polarization::Vh],
            instrument_mode: Some("IW".to_string()),
            orbit_pass: Some(OrbitPass::Descending),
            relative_orbit: Some(37),
            edge: EdgeMaskParams::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportParams {
    /// Output pixel size in CRS units
    pub scale: f64,
    pub crs: String,
    pub max_pixels: u64,
    /// Write a JSON metadata sidecar next to every export
    pub write_sidecar: bool,
}

impl Default for ExportParams {
    fn default() -> Self {
        Self {
            scale: 20.0,
            crs: "EPSG:25831".to_string(),
            max_pixels: 6_000_000_000,
            write_sidecar: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionParams {
    /// Rows per reduction tile
    pub tile_rows: usize,
}

impl Default for ExecutionParams {
    fn default() -> Self {
        Self { tile_rows: 256 }
    }
}

/// Immutable configuration passed to every pipeline entry point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Suffix appended to export descriptions
    #[serde(default = "default_site")]
    pub site: String,
    /// Study geometry in the grid CRS; composites are clipped to it
    pub study_area: Geometry,
    #[serde(default)]
    pub dates: DateRange,
    #[serde(default)]
    pub optical: OpticalParams,
    #[serde(default)]
    pub radar: RadarParams,
    #[serde(default)]
    pub export: ExportParams,
    #[serde(default)]
    pub execution: ExecutionParams,
}

fn default_site() -> String {
    "wadden".to_string()
}

impl PipelineConfig {
    /// Default run over `study_area`
    pub fn new(study_area: Geometry) -> Self {
        Self {
            site: default_site(),
            study_area,
            dates: DateRange::default(),
            optical: OpticalParams::default(),
            radar: RadarParams::default(),
            export: ExportParams::default(),
            execution: ExecutionParams::default(),
        }
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let config: PipelineConfig = serde_json::from_reader(reader)?;
        config.validate()?;
        info!("Loaded configuration for site '{}' from {:?}", config.site, path);
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.study_area.exterior.len() < 3 {
            return Err(Error::InvalidArgument {
                arg: "study_area",
                value: format!("{} vertices", self.study_area.exterior.len()),
            });
        }
        self.dates.validate()?;
        if !(self.export.scale.is_finite() && self.export.scale > 0.0) {
            return Err(Error::InvalidArgument {
                arg: "export.scale",
                value: self.export.scale.to_string(),
            });
        }
        if self.export.max_pixels == 0 {
            return Err(Error::InvalidArgument {
                arg: "export.max_pixels",
                value: "0".to_string(),
            });
        }
        if self.execution.tile_rows == 0 {
            return Err(Error::InvalidArgument {
                arg: "execution.tile_rows",
                value: "0".to_string(),
            });
        }
        if self.radar.polarizations.is_empty() {
            return Err(Error::InvalidArgument {
                arg: "radar.polarizations",
                value: "[]".to_string(),
            });
        }
        Ok(())
    }

    /// Sentinel-2 scenes over the study area within the date window
    pub fn optical_filter(&self) -> SceneFilter {
        SceneFilter {
            sensor: Some(Sensor::Optical),
            bounds: Some(self.study_area.bounds()),
            dates: Some(self.dates),
            ..SceneFilter::default()
        }
    }

    /// Sentinel-1 scenes over the study area matching the acquisition constraints
    pub fn radar_filter(&self) -> SceneFilter {
        SceneFilter {
            sensor: Some(Sensor::Radar),
            bounds: Some(self.study_area.bounds()),
            dates: Some(self.dates),
            polarizations: self.radar.polarizations.clone(),
            instrument_mode: self.radar.instrument_mode.clone(),
            orbit_pass: self.radar.orbit_pass,
            relative_orbit: self.radar.relative_orbit,
        }
    }
}
