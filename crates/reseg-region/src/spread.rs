//! Label spreading
//!
//! Unlabeled cells take the label of the nearest labeled cell within a
//! maximum Euclidean distance. Combined with propagation and watershed
//! growth this assigns ink and nearby background to competing lines.

use crate::distance::{NO_SITE, feature_transform};
use crate::error::{RegionError, RegionResult};
use crate::propagate::propagate_labels;
use crate::watershed::watershed_grow;
use reseg_core::{LabelMap, Mask};

/// Spread labels into unlabeled cells closer than `max_distance`
///
/// Labeled cells keep their label. An unlabeled cell takes the label of its
/// nearest labeled cell if the Euclidean distance is strictly less than
/// `max_distance`, and stays 0 otherwise.
///
/// # Errors
///
/// Returns `RegionError::InvalidParameters` if `max_distance` is negative or
/// not a number.
pub fn spread_labels(labels: &LabelMap, max_distance: f32) -> RegionResult<LabelMap> {
    if max_distance.is_nan() || max_distance < 0.0 {
        return Err(RegionError::InvalidParameters(format!(
            "max_distance must be non-negative: {}",
            max_distance
        )));
    }
    let (width, height) = labels.dimensions();
    let data = labels.data();
    let ft = feature_transform(width, height, |idx| data[idx] != 0);
    let limit = (max_distance as f64) * (max_distance as f64);

    let mut spread = labels.clone();
    for (idx, l) in spread.data_mut().iter_mut().enumerate() {
        if *l != 0 {
            continue;
        }
        let site = ft.nearest[idx];
        if site != NO_SITE && ft.sq_dist[idx] < limit {
            *l = data[site];
        }
    }
    Ok(spread)
}

/// One propagate, watershed, spread cycle
///
/// Seeds are propagated to the components of `mask` (contested components
/// get 0), contested components are split by watershed growth from the
/// seeds, and the result is spread up to `max_distance` into the
/// background.
///
/// # Errors
///
/// Returns an error if the rasters differ in size or `max_distance` is
/// invalid.
pub fn grow_labels(seeds: &LabelMap, mask: &Mask, max_distance: f32) -> RegionResult<LabelMap> {
    let propagated = propagate_labels(mask, seeds, 0)?;
    let grown = watershed_grow(&propagated, seeds, mask)?;
    spread_labels(&grown, max_distance)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spread_respects_max_distance() {
        let labels = LabelMap::from_data(7, 1, vec![0, 0, 0, 4, 0, 0, 0]).unwrap();
        let spread = spread_labels(&labels, 2.5).unwrap();
        assert_eq!(spread.data(), &[0, 4, 4, 4, 4, 4, 0]);
        // strict comparison: distance 2 is not below 2
        let spread = spread_labels(&labels, 2.0).unwrap();
        assert_eq!(spread.data(), &[0, 0, 4, 4, 4, 0, 0]);
    }

    #[test]
    fn test_spread_takes_nearest_label() {
        let labels = LabelMap::from_data(6, 1, vec![1, 0, 0, 0, 0, 2]).unwrap();
        let spread = spread_labels(&labels, 10.0).unwrap();
        assert_eq!(spread.data(), &[1, 1, 1, 2, 2, 2]);
    }

    #[test]
    fn test_spread_without_labels() {
        let labels = LabelMap::new(3, 3).unwrap();
        assert_eq!(spread_labels(&labels, 5.0).unwrap(), labels);
        assert!(spread_labels(&labels, -1.0).is_err());
    }

    #[test]
    fn test_grow_labels_splits_shared_component() {
        // one long component seeded at both ends by two lines
        let mask = Mask::from_fn(12, 3, |_, y| y == 1).unwrap();
        let mut seeds = LabelMap::new(12, 3).unwrap();
        seeds.set_pixel(0, 1, 1).unwrap();
        seeds.set_pixel(1, 1, 1).unwrap();
        seeds.set_pixel(10, 1, 2).unwrap();
        seeds.set_pixel(11, 1, 2).unwrap();
        let grown = grow_labels(&seeds, &mask, 1.5).unwrap();
        assert_eq!(grown.get_pixel(4, 1), Some(1));
        assert_eq!(grown.get_pixel(7, 1), Some(2));
        // spread one row up and down
        assert_eq!(grown.get_pixel(0, 0), Some(1));
        assert_eq!(grown.get_pixel(11, 2), Some(2));
    }
}
