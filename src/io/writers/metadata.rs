use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde_json::{Number, Value};
use tracing::info;

use crate::core::processing::composite::Composite;
use crate::core::raster::Grid;
use crate::error::Result;

/// Flat key/value description of an exported composite
pub fn export_metadata_fields(composite: &Composite, description: &str, grid: &Grid) -> BTreeMap<String, String> {
    let mut metadata = BTreeMap::new();

    metadata.insert("DESCRIPTION".to_string(), description.to_string());
    metadata.insert("COMPOSITE".to_string(), composite.name().to_string());
    metadata.insert("BAND_COUNT".to_string(), composite.raster().band_count().to_string());
    metadata.insert("BANDS".to_string(), composite.band_names().join(","));

    metadata.insert("CRS".to_string(), grid.crs.clone());
    metadata.insert("SCALE".to_string(), grid.pixel_size().to_string());
    metadata.insert("ROWS".to_string(), grid.rows.to_string());
    metadata.insert("COLS".to_string(), grid.cols.to_string());
    metadata.insert("NODATA".to_string(), "NaN".to_string());

    metadata.insert("CONVERSION_TOOL".to_string(), env!("CARGO_PKG_NAME").to_string());
    metadata.insert("CONVERSION_VERSION".to_string(), env!("CARGO_PKG_VERSION").to_string());
    metadata.insert("CONVERSION_TIMESTAMP".to_string(), Utc::now().to_rfc3339());

    metadata
}

/// Lowercased keys, numeric values as JSON numbers
pub fn convert_metadata_to_json(metadata: &BTreeMap<String, String>) -> BTreeMap<String, Value> {
    let mut json_metadata = BTreeMap::new();

    for (key, value) in metadata {
        let json_key = key.to_lowercase();
        let json_value = if let Ok(num) = value.parse::<u64>() {
            Value::Number(Number::from(num))
        } else if let Some(num) = value.parse::<f64>().ok().and_then(Number::from_f64) {
            Value::Number(num)
        } else {
            Value::String(value.clone())
        };
        json_metadata.insert(json_key, json_value);
    }

    json_metadata
}

/// Array-valued fields that do not fit the flat string map
pub fn add_special_json_fields(json_metadata: &mut BTreeMap<String, Value>, composite: &Composite, grid: &Grid) {
    json_metadata.insert(
        "bands".to_string(),
        Value::Array(
            composite
                .band_names()
                .into_iter()
                .map(|b| Value::String(b.to_string()))
                .collect(),
        ),
    );
    json_metadata.insert(
        "geotransform".to_string(),
        Value::Array(
            grid.transform
                .to_gdal()
                .iter()
                .map(|&v| Number::from_f64(v).map_or(Value::Null, Value::Number))
                .collect(),
        ),
    );
}

/// Writes `<output>.json` next to the raster and returns its path
pub fn write_metadata_sidecar(
    output_path: &Path,
    metadata: &BTreeMap<String, String>,
    composite: &Composite,
    grid: &Grid,
) -> Result<PathBuf> {
    let mut json_metadata = convert_metadata_to_json(metadata);
    add_special_json_fields(&mut json_metadata, composite, grid);

    let sidecar_path = output_path.with_extension("json");
    let json_string = serde_json::to_string_pretty(&json_metadata)?;
    std::fs::write(&sidecar_path, json_string)?;

    info!("Created metadata sidecar: {:?}", sidecar_path);
    Ok(sidecar_path)
}
