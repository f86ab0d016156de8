//! I/O layer: scene catalogs (in-memory and JSON manifest over band rasters),
//! the GDAL band `reader`, composite `export`, and `writers` for float
//! GeoTIFF output and metadata embedding/sidecars.
pub mod catalog;
pub use catalog::{InMemoryCatalog, Manifest, ManifestCatalog, SceneCatalog, SceneFilter};

pub mod export;
pub use export::{ExportRequest, Exporter, GeoTiffExporter};

pub mod reader;

pub mod writers;
