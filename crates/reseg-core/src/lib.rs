//! Reseg Core - Raster containers for text-line re-segmentation
//!
//! This crate provides the fundamental data structures shared by the
//! re-segmentation crates:
//!
//! - [`Mask`] - Binary raster (ink, rasterized polygons, ignore areas)
//! - [`LabelMap`] - Integer label raster (components, line labels)
//! - [`FPix`] - Floating-point raster (distance transforms)
//! - [`Box`] - Rectangle regions

pub mod box_;
pub mod error;
pub mod fpix;
pub mod labels;
pub mod mask;

pub use box_::Box;
pub use error::{Error, Result};
pub use fpix::FPix;
pub use labels::LabelMap;
pub use mask::{Mask, check_dimensions};
