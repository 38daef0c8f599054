//! Error types for reseg-geom

use thiserror::Error;

/// Errors that can occur during polygon operations
#[derive(Debug, Error)]
pub enum GeomError {
    /// Core library error
    #[error("core error: {0}")]
    Core(#[from] reseg_core::Error),

    /// Geometry that cannot be turned into a valid polygon
    #[error("degenerate geometry: {0}")]
    Degenerate(String),

    /// Operation on an empty set of geometries
    #[error("empty geometry")]
    Empty,

    /// Invalid parameters
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),
}

/// Result type for geometry operations
pub type GeomResult<T> = Result<T, GeomError>;
