//! Error types for the test framework

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while writing or comparing regression output
#[derive(Debug, Error)]
pub enum TestError {
    #[error("cannot write raster {}: {source}", .path.display())]
    RasterWrite {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for test operations
pub type TestResult<T> = Result<T, TestError>;
