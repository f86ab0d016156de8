use thiserror::Error;

/// Application-specific errors for the CLI
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Tile rows must be greater than 0, got: {rows}")]
    ZeroTileRows { rows: usize },

    #[error("{failed} of {total} exports failed")]
    ExportsFailed { failed: usize, total: usize },

    #[error(transparent)]
    Pipeline(#[from] cloudless::Error),
}
