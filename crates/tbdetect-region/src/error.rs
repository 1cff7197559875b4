//! Error types for tbdetect-region

use thiserror::Error;

/// Errors that can occur during region processing operations
#[derive(Debug, Error)]
pub enum RegionError {
    /// Core library error (includes malformed masks)
    #[error("core error: {0}")]
    Core(#[from] tbdetect_core::Error),

    /// Invalid parameters
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    /// Tiles cannot be reassembled into a uniform grid
    #[error("tile shape mismatch: {0}")]
    TileShapeMismatch(String),
}

/// Result type for region operations
pub type RegionResult<T> = Result<T, RegionError>;
