//! Crate-level error type and `Result` alias.
//! Separates fatal input/configuration errors from collaborator failures;
//! per-pixel no-data is never an error and never reaches this type.
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Scene {scene}: missing band `{band}`")]
    MissingBand { scene: String, band: String },

    #[error("Scene {scene}: missing metadata `{field}`")]
    MissingMetadata { scene: String, field: &'static str },

    #[error("Scene {scene}: malformed bitmask in band `{band}` (value {value})")]
    MalformedBitmask {
        scene: String,
        band: String,
        value: f32,
    },

    #[error("Grid mismatch: expected {expected_rows}x{expected_cols}, got {rows}x{cols}")]
    GridMismatch {
        expected_rows: usize,
        expected_cols: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Band name collision: `{band}` appears more than once")]
    BandCollision { band: String },

    #[error("Invalid argument: {arg}={value}")]
    InvalidArgument { arg: &'static str, value: String },

    #[error("Empty collection: {0}")]
    EmptyCollection(String),

    #[error("Export of {pixels} pixels exceeds the ceiling of {max_pixels}")]
    PixelCeiling { pixels: u64, max_pixels: u64 },

    #[error("Unsupported CRS: requested {requested}, grid is {grid}")]
    UnsupportedCrs { requested: String, grid: String },

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("External error: {0}")]
    External(String),
}

impl Error {
    pub fn external<E: std::fmt::Display>(e: E) -> Self {
        Error::External(e.to_string())
    }

    /// True for errors caused by the inputs or configuration of a run,
    /// as opposed to catalog/export collaborator failures.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Error::MissingBand { .. }
                | Error::MissingMetadata { .. }
                | Error::MalformedBitmask { .. }
                | Error::GridMismatch { .. }
                | Error::BandCollision { .. }
                | Error::InvalidArgument { .. }
                | Error::EmptyCollection(_)
        )
    }
}
