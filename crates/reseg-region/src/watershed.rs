//! Marker-controlled watershed growth
//!
//! Labels are flooded inside a mask from two kinds of sources: cells whose
//! component already received a label by propagation, and raw seeds inside
//! contested components. Flooding proceeds in order of chamfer distance from
//! the sources, so two seeds competing for one component meet along the
//! midline between them.

use crate::conncomp::ConnectivityType;
use crate::error::RegionResult;
use reseg_core::{LabelMap, Mask, check_dimensions};
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Chamfer step cost for orthogonal moves
const ORTHOGONAL_COST: u32 = 2;
/// Chamfer step cost for diagonal moves
const DIAGONAL_COST: u32 = 3;

/// Options for watershed growth
#[derive(Debug, Clone)]
pub struct WatershedOptions {
    /// Connectivity type for finding neighbors
    pub connectivity: ConnectivityType,
}

impl Default for WatershedOptions {
    fn default() -> Self {
        Self {
            connectivity: ConnectivityType::EightWay,
        }
    }
}

impl WatershedOptions {
    /// Create new options with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set connectivity type
    pub fn with_connectivity(mut self, connectivity: ConnectivityType) -> Self {
        self.connectivity = connectivity;
        self
    }
}

/// Flood labels inside `mask` from propagated components and seeds
///
/// Uses 8-way connectivity. See [`watershed_grow_with`].
pub fn watershed_grow(
    propagated: &LabelMap,
    seeds: &LabelMap,
    mask: &Mask,
) -> RegionResult<LabelMap> {
    watershed_grow_with(propagated, seeds, mask, &WatershedOptions::default())
}

/// Flood labels inside `mask` from propagated components and seeds
///
/// Every ON cell of `mask` with a nonzero `propagated` label is a source for
/// that label; every other ON cell with a nonzero `seeds` label is a source
/// for the seed label. Remaining ON cells take the label of the source with
/// the smallest chamfer distance, first come first served on ties. Cells
/// outside `mask`, and ON cells not connected to any source, stay 0.
///
/// # Errors
///
/// Returns an error if the three rasters differ in size.
pub fn watershed_grow_with(
    propagated: &LabelMap,
    seeds: &LabelMap,
    mask: &Mask,
    options: &WatershedOptions,
) -> RegionResult<LabelMap> {
    check_dimensions(mask.dimensions(), propagated.dimensions())?;
    check_dimensions(mask.dimensions(), seeds.dimensions())?;
    let (width, height) = mask.dimensions();
    let w = width as usize;
    let inside = mask.data();

    let mut out = LabelMap::new(width, height)?;
    let mut cost = vec![u32::MAX; inside.len()];
    // (cost, insertion order, cell)
    let mut heap: BinaryHeap<Reverse<(u32, u64, usize)>> = BinaryHeap::new();
    let mut order = 0u64;

    {
        let labels = out.data_mut();
        for (idx, (&p, &s)) in propagated.data().iter().zip(seeds.data()).enumerate() {
            if !inside[idx] {
                continue;
            }
            let source = if p != 0 { p } else { s };
            if source != 0 {
                labels[idx] = source;
                cost[idx] = 0;
                heap.push(Reverse((0, order, idx)));
                order += 1;
            }
        }
    }

    let labels = out.data_mut();
    while let Some(Reverse((c, _, idx))) = heap.pop() {
        if c > cost[idx] {
            continue;
        }
        let x = (idx % w) as i32;
        let y = (idx / w) as i32;
        for &(dx, dy) in options.connectivity.offsets() {
            let nx = x + dx;
            let ny = y + dy;
            if nx < 0 || ny < 0 || nx >= width as i32 || ny >= height as i32 {
                continue;
            }
            let nidx = ny as usize * w + nx as usize;
            if !inside[nidx] {
                continue;
            }
            let step = if dx != 0 && dy != 0 {
                DIAGONAL_COST
            } else {
                ORTHOGONAL_COST
            };
            let next = c + step;
            if next < cost[nidx] {
                cost[nidx] = next;
                labels[nidx] = labels[idx];
                heap.push(Reverse((next, order, nidx)));
                order += 1;
            }
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeds_meet_in_the_middle() {
        let mask = Mask::new_with_value(10, 1, true).unwrap();
        let propagated = LabelMap::new(10, 1).unwrap();
        let mut seeds = LabelMap::new(10, 1).unwrap();
        seeds.set_pixel(0, 0, 1).unwrap();
        seeds.set_pixel(9, 0, 2).unwrap();
        let grown = watershed_grow(&propagated, &seeds, &mask).unwrap();
        assert_eq!(grown.data(), &[1, 1, 1, 1, 1, 2, 2, 2, 2, 2]);
    }

    #[test]
    fn test_propagated_label_takes_precedence() {
        let mask = Mask::new_with_value(4, 1, true).unwrap();
        let propagated = LabelMap::from_data(4, 1, vec![5, 5, 5, 5]).unwrap();
        let seeds = LabelMap::from_data(4, 1, vec![0, 0, 7, 0]).unwrap();
        let grown = watershed_grow(&propagated, &seeds, &mask).unwrap();
        assert_eq!(grown.data(), &[5, 5, 5, 5]);
    }

    #[test]
    fn test_stays_inside_mask() {
        // seed outside the mask is ignored, the gap is not crossed
        let mask = Mask::from_data(5, 1, vec![true, true, false, true, true]).unwrap();
        let propagated = LabelMap::new(5, 1).unwrap();
        let seeds = LabelMap::from_data(5, 1, vec![1, 0, 2, 0, 0]).unwrap();
        let grown = watershed_grow(&propagated, &seeds, &mask).unwrap();
        assert_eq!(grown.data(), &[1, 1, 0, 0, 0]);
    }
}
