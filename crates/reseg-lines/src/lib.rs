//! reseg-lines - Text-line re-segmentation
//!
//! This crate re-derives text-line outlines from a binarized page image
//! and an existing, possibly coarse line segmentation:
//!
//! - **Page model**: Regions, lines, baselines and non-text regions
//! - **Candidates**: Line rasters, ignore masks, glyph scale, seeds
//! - **Line detection**: Pluggable detector with a projection-based default
//! - **Matching**: Overlap ratios and greedy assignment of detected lines
//! - **Reconciliation**: Joined outlines written back, neighbours trimmed
//!
//! # Quick Start
//!
//! ```no_run
//! use reseg_lines::{Method, Page, Resegmenter, ResegmentOptions};
//! use reseg_core::Mask;
//!
//! let json = std::fs::read_to_string("page.json").unwrap();
//! let mut page = Page::from_json(&json).unwrap();
//! let image = image::open("page.png").unwrap().to_luma8();
//! let binary = Mask::from_luma(&image).unwrap();
//!
//! let options = ResegmentOptions::new().with_method(Method::CComps);
//! let report = Resegmenter::new(options).unwrap().process_page(&mut page, &binary, 300.0);
//! println!("{} lines modified", report.modified_count());
//! ```
//!
//! # Modules
//!
//! - [`resegment`]: Page and region scopes, the full pipeline
//! - [`matcher`]: Overlap matrices and greedy assignment
//! - [`reconcile`]: Writing outlines back
//! - [`detector`]: Line detector trait and projection detector

pub mod candidates;
pub mod check;
pub mod config;
pub mod debug;
pub mod detector;
mod error;
pub mod matcher;
pub mod page;
pub mod reconcile;
pub mod resegment;

pub use error::{ResegError, ResegResult};

// Re-export commonly used types
pub use config::{Level, MatchThresholds, Method, ResegmentOptions};
pub use detector::{
    DetectorError, DetectorInput, DetectorOutput, LineDetector, ProjectionLineDetector,
    ProjectionOptions,
};
pub use matcher::{GreedyAssigner, OverlapMatrix, Overlaps, Rejection, Step};
pub use page::{NonTextKind, NonTextRegion, Page, TextLine, TextRegion};
pub use reconcile::LineDecision;
pub use resegment::{LineReport, PageReport, ParentScope, Resegmenter, ScopeReport};

// Re-export lower layers for convenience
pub use reseg_core;
pub use reseg_geom;
pub use reseg_region;
