//! Error types for reseg-lines

use crate::detector::DetectorError;
use thiserror::Error;

/// Errors that can occur during line re-segmentation
#[derive(Debug, Error)]
pub enum ResegError {
    /// Core library error
    #[error("core error: {0}")]
    Core(#[from] reseg_core::Error),

    /// Label algorithm error
    #[error("region error: {0}")]
    Region(#[from] reseg_region::RegionError),

    /// Polygon operation error
    #[error("geometry error: {0}")]
    Geom(#[from] reseg_geom::GeomError),

    /// Line detector failure
    #[error("detector error: {0}")]
    Detector(#[from] DetectorError),

    /// Invalid parameter provided
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Malformed configuration or page description
    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for re-segmentation operations
pub type ResegResult<T> = Result<T, ResegError>;
