//! Connected component analysis
//!
//! This module provides functions for finding and labeling connected components
//! in binary masks. It uses a Union-Find (disjoint set) data structure for
//! efficient labeling.

use crate::error::RegionResult;
use reseg_core::{LabelMap, Mask};

/// Connectivity type for component analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectivityType {
    /// 4-way connectivity (up, down, left, right)
    #[default]
    FourWay,
    /// 8-way connectivity (includes diagonals)
    EightWay,
}

const FOUR_WAY: [(i32, i32); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];
const EIGHT_WAY: [(i32, i32); 8] = [
    (-1, 0),
    (1, 0),
    (0, -1),
    (0, 1),
    (-1, -1),
    (1, -1),
    (-1, 1),
    (1, 1),
];

impl ConnectivityType {
    /// Neighbour offsets, orthogonal ones first
    pub fn offsets(self) -> &'static [(i32, i32)] {
        match self {
            ConnectivityType::FourWay => &FOUR_WAY,
            ConnectivityType::EightWay => &EIGHT_WAY,
        }
    }
}

/// Disjoint set over provisional labels (index 0 unused)
struct UnionFind {
    parent: Vec<u32>,
}

impl UnionFind {
    fn new() -> Self {
        Self { parent: vec![0] }
    }

    fn make_set(&mut self) -> u32 {
        let label = self.parent.len() as u32;
        self.parent.push(label);
        label
    }

    fn find(&mut self, mut label: u32) -> u32 {
        while self.parent[label as usize] != label {
            // path halving
            let grandparent = self.parent[self.parent[label as usize] as usize];
            self.parent[label as usize] = grandparent;
            label = grandparent;
        }
        label
    }

    fn union(&mut self, a: u32, b: u32) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra != rb {
            let (lo, hi) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent[hi as usize] = lo;
        }
    }
}

/// Label all connected components in a binary mask
///
/// Labels are numbered from 1 in row-major first-touch order: the component
/// containing the first ON pixel in raster order gets label 1, and so on.
///
/// Returns the label map and the number of components.
pub fn label_connected_components(
    mask: &Mask,
    connectivity: ConnectivityType,
) -> RegionResult<(LabelMap, u32)> {
    let (width, height) = mask.dimensions();
    let w = width as usize;
    let mut provisional = vec![0u32; w * height as usize];
    let mut sets = UnionFind::new();

    // Already-visited neighbours in raster order
    let backward: &[(i32, i32)] = match connectivity {
        ConnectivityType::FourWay => &[(-1, 0), (0, -1)],
        ConnectivityType::EightWay => &[(-1, 0), (-1, -1), (0, -1), (1, -1)],
    };

    for y in 0..height {
        for x in 0..width {
            if !mask.get_pixel_unchecked(x, y) {
                continue;
            }
            let idx = y as usize * w + x as usize;
            let mut current = 0u32;
            for &(dx, dy) in backward {
                let nx = x as i32 + dx;
                let ny = y as i32 + dy;
                if nx < 0 || ny < 0 || nx >= width as i32 {
                    continue;
                }
                let neighbour = provisional[ny as usize * w + nx as usize];
                if neighbour == 0 {
                    continue;
                }
                if current == 0 {
                    current = neighbour;
                } else {
                    sets.union(current, neighbour);
                }
            }
            provisional[idx] = if current == 0 {
                sets.make_set()
            } else {
                current
            };
        }
    }

    // Resolve roots and renumber by first touch
    let mut table = vec![0u32; sets.parent.len()];
    let mut count = 0u32;
    for label in provisional.iter_mut() {
        if *label == 0 {
            continue;
        }
        let root = sets.find(*label) as usize;
        if table[root] == 0 {
            count += 1;
            table[root] = count;
        }
        *label = table[root];
    }

    Ok((LabelMap::from_data(width, height, provisional)?, count))
}

/// Pixel count of each component, indexed by label
///
/// Index 0 holds the number of unlabeled pixels. The vector has
/// `count + 1` entries even when trailing labels are absent.
pub fn component_sizes(labels: &LabelMap, count: u32) -> Vec<usize> {
    let mut sizes = labels.histogram();
    sizes.resize(count as usize + 1, 0);
    sizes
}

/// Keep only components whose size lies in `min_size..=max_size`
///
/// Kept components are renumbered densely in their original order.
/// Returns the filtered label map and the new component count.
pub fn filter_components_by_size(
    labels: &LabelMap,
    count: u32,
    min_size: usize,
    max_size: usize,
) -> RegionResult<(LabelMap, u32)> {
    let sizes = component_sizes(labels, count);
    let mut table = vec![0u32; sizes.len()];
    let mut kept = 0u32;
    for (label, &size) in sizes.iter().enumerate().skip(1) {
        if size >= min_size && size <= max_size {
            kept += 1;
            table[label] = kept;
        }
    }
    let mut filtered = labels.clone();
    filtered.relabel(&table);
    Ok((filtered, kept))
}
