//! Reseg - Text-line re-segmentation for document images
//!
//! Given a binarized page image and an existing line segmentation, reseg
//! recomputes the outline of every text line so that it holds the line's
//! ink and little else.
//!
//! # Overview
//!
//! - Masks, label rasters and rectangles
//! - Connected components, distance transform and label spreading
//! - Polygon repair, intersection, rasterization and joining
//! - Line detection, overlap matching and reconciliation
//!
//! # Example
//!
//! ```
//! use reseg::{Mask, Page, Resegmenter, ResegmentOptions};
//!
//! let binary = Mask::new(640, 480).unwrap();
//! let mut page = Page::new("p1", 640, 480);
//!
//! let resegmenter = Resegmenter::new(ResegmentOptions::new()).unwrap();
//! let report = resegmenter.process_page(&mut page, &binary, 300.0);
//! assert_eq!(report.modified_count(), 0);
//! ```

// Re-export core types (primary data structures used everywhere)
pub use reseg_core::*;

// Re-export the re-segmentation entry points
pub use reseg_lines::{
    Level, LineDecision, Method, NonTextKind, NonTextRegion, Page, PageReport, Resegmenter,
    ResegmentOptions, TextLine, TextRegion,
};

// Re-export domain crates as modules to avoid name conflicts
pub use reseg_geom as geom;
pub use reseg_lines as lines;
pub use reseg_region as region;
