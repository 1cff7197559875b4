//! Error types for tbdetect-recog

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during candidate extraction and classification
#[derive(Debug, Error)]
pub enum RecogError {
    /// Core library error
    #[error("core error: {0}")]
    Core(#[from] tbdetect_core::Error),

    /// Region library error
    #[error("region error: {0}")]
    Region(#[from] tbdetect_region::RegionError),

    /// Too few foreground components to classify
    #[error("insufficient candidates: need at least 2 components, found {found}")]
    InsufficientCandidates { found: usize },

    /// Input shape does not match what a model or stage expects
    #[error("shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    /// A model artifact is missing or malformed
    #[error("failed to load model from {path}: {message}")]
    ModelLoad { path: PathBuf, message: String },

    /// Candidate centroid too close to the image border
    #[error("candidate centroid ({x}, {y}) too close to the image border")]
    OutOfBoundsCandidate { x: i32, y: i32 },

    /// Invalid parameter provided
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Result type for recognition operations
pub type RecogResult<T> = Result<T, RecogError>;
