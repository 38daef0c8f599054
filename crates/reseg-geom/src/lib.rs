//! reseg-geom - Polygon utilities for text-line re-segmentation
//!
//! Line and region outlines are `geo` polygons in pixel coordinates. This
//! crate provides the operations the re-segmentation needs on top of
//! `geo`'s boolean operations:
//!
//! - **Repair** - Turning traced or rounded rings into valid polygons
//! - **Overlap** - Single-polygon intersection, difference and clipping
//! - **Rasterization** - Filling polygons into masks and label maps
//! - **Baselines** - Bands on the glyph side, clipping, joining
//! - **Joining** - Connecting fragments into one concave outline
//!
//! # Examples
//!
//! ```
//! use geo::Area;
//! use reseg_geom::{intersect_polygons, rect_polygon};
//!
//! let a = rect_polygon(0.0, 0.0, 10.0, 10.0);
//! let b = rect_polygon(5.0, 0.0, 15.0, 10.0);
//! let overlap = intersect_polygons(&a, &b).unwrap();
//! assert!((overlap.unsigned_area() - 50.0).abs() < 1e-9);
//! ```

pub mod baseline;
pub mod error;
pub mod hull;
pub mod polygon;
pub mod raster;

// Re-export core and geometry types
pub use geo;
pub use reseg_core;

// Re-export error types
pub use error::{GeomError, GeomResult};

// Re-export polygon functions
pub use polygon::{
    DEFAULT_JOIN_SCALE, coords_from_points, difference_polygon, exterior_coords,
    intersect_polygons, intersection_area, is_simple, points_from_coords, points_from_polygon,
    polygon_for_parent, rect_polygon, repair_polygon, ring_area, round_polygon,
    translate_polygon,
};

// Re-export baseline functions
pub use baseline::{buffer_baseline, clip_baseline, is_left_to_right, join_baselines};

// Re-export hull and raster functions
pub use hull::join_polygons;
pub use raster::{paint_polygon, rasterize};
