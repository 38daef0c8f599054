//! reseg-region - Label algorithms for text-line re-segmentation
//!
//! This crate provides the raster algorithms that turn seed labels into
//! line assignments:
//!
//! - **Connected component analysis** - Finding and labeling connected regions
//! - **Distance transforms** - Exact Euclidean distances and nearest sites
//! - **Label propagation** - Majority labels per component, with conflicts
//! - **Watershed growth** - Splitting contested components between seeds
//! - **Label spreading** - Growing labels into nearby background
//! - **Border tracing** - Outer contours of components
//!
//! # Examples
//!
//! ```
//! use reseg_core::{LabelMap, Mask};
//! use reseg_region::{ConnectivityType, grow_labels, label_connected_components};
//!
//! let mask = Mask::from_fn(20, 5, |x, y| y == 2 && x != 10).unwrap();
//! let (_, count) = label_connected_components(&mask, ConnectivityType::EightWay).unwrap();
//! assert_eq!(count, 2);
//!
//! let mut seeds = LabelMap::new(20, 5).unwrap();
//! seeds.set_pixel(0, 2, 1).unwrap();
//! seeds.set_pixel(19, 2, 2).unwrap();
//! let grown = grow_labels(&seeds, &mask, 2.0).unwrap();
//! assert_eq!(grown.get_pixel(9, 2), Some(1));
//! assert_eq!(grown.get_pixel(11, 2), Some(2));
//! ```

pub mod conncomp;
pub mod contour;
pub mod distance;
pub mod error;
pub mod propagate;
pub mod spread;
pub mod watershed;

// Re-export core types
pub use reseg_core;

// Re-export error types
pub use error::{RegionError, RegionResult};

// Re-export conncomp types and functions
pub use conncomp::{
    ConnectivityType, component_sizes, filter_components_by_size, label_connected_components,
};

// Re-export contour types and functions
pub use contour::{
    Border, BorderPoint, Direction, from_chain_code, to_chain_code, trace_outer_borders,
};

// Re-export distance functions
pub use distance::{distance_transform, label_distance_transform};

// Re-export growth functions
pub use propagate::propagate_labels;
pub use spread::{grow_labels, spread_labels};
pub use watershed::{WatershedOptions, watershed_grow, watershed_grow_with};
