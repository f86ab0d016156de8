//! High-level library API: fetch and prepare the optical and radar
//! collections, build the requested composites and export them. Prefer these
//! entry points over the processing modules when integrating cloudless.
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use tracing::{info, warn};

use crate::core::params::PipelineConfig;
use crate::core::processing::composite::Composite;
use crate::core::processing::executor::Executor;
use crate::core::processing::pipeline::{build_composite, denoise_radar_scene, mask_optical_scene};
use crate::core::raster::Collection;
use crate::error::{Error, Result};
use crate::io::catalog::SceneCatalog;
use crate::io::export::{ExportRequest, Exporter};
use crate::types::{CompositeKind, Sensor};

/// Executor configured from `config.execution`
pub fn executor_for(config: &PipelineConfig) -> Result<Executor> {
    Executor::new(config.execution.tile_rows)
}

/// Fetches the scenes of `sensor` for this run and applies the per-scene
/// preparation: calibration, indices and cloud/shadow masking for optical
/// scenes, edge denoising for radar scenes.
pub fn prepare_collection(
    catalog: &dyn SceneCatalog,
    config: &PipelineConfig,
    sensor: Sensor,
    exec: &Executor,
) -> Result<Collection> {
    let filter = match sensor {
        Sensor::Optical => config.optical_filter(),
        Sensor::Radar => config.radar_filter(),
    };
    let raw = catalog.fetch_collection(&filter)?;
    if raw.is_empty() {
        return Err(Error::EmptyCollection(format!(
            "no {} scenes between {} and {}",
            sensor, config.dates.start, config.dates.end
        )));
    }
    info!("Preparing {} {} scenes", raw.len(), sensor);

    match sensor {
        Sensor::Optical => exec.map(&raw, |scene| mask_optical_scene(scene, &config.optical)),
        Sensor::Radar => exec.map(&raw, |scene| denoise_radar_scene(scene, &config.radar)),
    }
}

/// Builds each of `kinds` (duplicates ignored). Only the sensors the
/// requested composites need are fetched.
pub fn build_composites(
    catalog: &dyn SceneCatalog,
    config: &PipelineConfig,
    kinds: &[CompositeKind],
    exec: &Executor,
) -> Result<BTreeMap<CompositeKind, Composite>> {
    config.validate()?;

    let mut prepared: HashMap<Sensor, Collection> = HashMap::new();
    let mut composites = BTreeMap::new();
    for &kind in kinds {
        if composites.contains_key(&kind) {
            continue;
        }
        let collection = match prepared.entry(kind.sensor()) {
            Entry::Occupied(e) => e.into_mut(),
            Entry::Vacant(e) => e.insert(prepare_collection(catalog, config, kind.sensor(), exec)?),
        };
        let composite = build_composite(kind, exec, collection, &config.study_area)?;
        composites.insert(kind, composite);
    }
    Ok(composites)
}

/// Export request for `kind`: `<export name>_<site>` over the study-area bounds
pub fn export_request(kind: CompositeKind, config: &PipelineConfig) -> ExportRequest {
    ExportRequest::new(
        format!("{}_{}", kind.export_name(), config.site),
        config.study_area.bounds(),
        &config.export,
    )
}

/// Outcome of an export run
#[derive(Debug, Clone, Default)]
pub struct ExportReport {
    pub exported: Vec<(CompositeKind, PathBuf)>,
    pub failed: Vec<(CompositeKind, String)>,
}

/// Exports every composite. With `continue_on_error` a failed export is
/// recorded and the remaining ones are still attempted.
pub fn export_composites(
    composites: &BTreeMap<CompositeKind, Composite>,
    exporter: &dyn Exporter,
    config: &PipelineConfig,
    continue_on_error: bool,
) -> Result<ExportReport> {
    let mut report = ExportReport::default();
    for (&kind, composite) in composites {
        let request = export_request(kind, config);
        match exporter.export(composite, &request) {
            Ok(path) => report.exported.push((kind, path)),
            Err(e) if continue_on_error => {
                warn!("Export of {} failed: {}", request.description, e);
                report.failed.push((kind, e.to_string()));
            }
            Err(e) => return Err(e),
        }
    }
    info!(
        "Export complete: {} written, {} failed",
        report.exported.len(),
        report.failed.len()
    );
    Ok(report)
}

/// Fetch, prepare, reduce and export in one call
pub fn run_pipeline(
    catalog: &dyn SceneCatalog,
    exporter: &dyn Exporter,
    config: &PipelineConfig,
    kinds: &[CompositeKind],
    exec: &Executor,
) -> Result<ExportReport> {
    let composites = build_composites(catalog, config, kinds, exec)?;
    export_composites(&composites, exporter, config, false)
}
