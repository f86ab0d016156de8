#![doc = r#"
cloudless — cloud- and shadow-free multitemporal Sentinel-1/Sentinel-2 composites.

The crate turns a time series of Sentinel-2 (optical) and Sentinel-1 (radar)
scenes over a study area into per-pixel statistical composites for land-cover
classification:

- optical scenes are calibrated to reflectance, indexed (NDBI/NDVI/NDWI) and
  masked for clouds (QA bitmask) and cloud shadows (solar-geometry projection
  intersected with a dark-pixel test);
- radar scenes have their swath-edge noise removed by connected-component
  filtering;
- masked series are reduced per pixel into percentiles and standard deviations
  and stacked into three named composites, clipped to the study area.

No-data is `NaN` throughout; a pixel with no valid observation is never zero.

Quick start: build and export every composite
---------------------------------------------
```rust,no_run
use std::path::Path;
use cloudless::{
    api, CompositeKind, GeoTiffExporter, ManifestCatalog, PipelineConfig,
};

fn main() -> cloudless::Result<()> {
    let config = PipelineConfig::from_json_file(Path::new("wadden.json"))?;
    let catalog = ManifestCatalog::open(Path::new("/data/scenes/manifest.json"))?;
    let exporter = GeoTiffExporter::new("/out");
    let exec = api::executor_for(&config)?;

    let report = api::run_pipeline(&catalog, &exporter, &config, &CompositeKind::ALL, &exec)?;
    for (kind, path) in &report.exported {
        println!("{kind}: {}", path.display());
    }
    Ok(())
}
```

Working with scenes directly
----------------------------
```rust,no_run
use cloudless::core::processing::pipeline::mask_optical_scene;
use cloudless::core::processing::executor::Executor;
use cloudless::{Collection, OpticalParams, Statistic};

fn median_ndvi(raw: &Collection) -> cloudless::Result<()> {
    let exec = Executor::default();
    let masked = exec.map(raw, |s| mask_optical_scene(s, &OpticalParams::default()))?;
    let ndvi = exec.reduce(&masked, "NDVI", &Statistic::percentile(50.0))?;
    println!("{:?}", ndvi.band_names()); // ["NDVI_p50"]
    Ok(())
}
```

Error handling
--------------
All public functions return `cloudless::Result<T>`. `Error::is_input_error`
separates bad inputs or configuration (missing bands or solar angles, grid
mismatches, band-name collisions) from collaborator failures (catalog, GDAL
and export I/O, pixel ceiling).

Useful modules
--------------
- [`api`] — high-level entry points.
- [`core`] — raster model, parameters and the processing stages.
- [`io`] — scene catalogs, GDAL reader and GeoTIFF export.
- [`types`] — shared enums (`Sensor`, `Polarization`, `Statistic`, `CompositeKind`, ...).
- [`error`] — crate-level `Error` and `Result`.
"#]

pub mod api;
pub mod core;
pub mod error;
pub mod io;
pub mod types;

// Curated public API surface
pub use crate::core::params::{DateRange, ExecutionParams, ExportParams, OpticalParams, PipelineConfig, RadarParams};
pub use crate::core::processing::composite::Composite;
pub use crate::core::processing::executor::{CancelFlag, Executor};
pub use crate::core::raster::{Band, Bounds, Collection, GeoTransform, Geometry, Grid, Mask, Raster, Scene, SceneMetadata};
pub use crate::error::{Error, Result};
pub use crate::types::{CompositeKind, OrbitPass, Polarization, Sensor, SpectralIndex, Statistic};

pub use crate::io::catalog::{InMemoryCatalog, Manifest, ManifestCatalog, SceneCatalog, SceneFilter};
pub use crate::io::export::{ExportRequest, Exporter, GeoTiffExporter};
pub use crate::io::reader::{read_band, read_raster};

pub use crate::api::{ExportReport, build_composites, export_composites, run_pipeline};
