//! Label propagation into connected components
//!
//! Each connected component of a target mask inherits the seed label that
//! dominates it. Components claimed by two comparably strong labels are
//! marked as conflicts, to be split later by watershed growth.

use crate::conncomp::{ConnectivityType, label_connected_components};
use crate::error::RegionResult;
use reseg_core::{LabelMap, Mask, check_dimensions};
use std::collections::HashMap;

/// Runner-up share of the winner's pixel count that makes a component contested
const CONFLICT_RATIO: f64 = 0.5;

/// Propagate seed labels to the 8-connected components of `mask`
///
/// Each component takes the label with the most seed pixels inside it (ties
/// go to the lower label). When the second strongest label covers at least
/// half as many pixels as the winner, the component gets `conflict` instead.
/// Components without any seed pixel stay 0, as does everything outside
/// `mask`.
///
/// # Errors
///
/// Returns an error if `mask` and `seeds` differ in size.
pub fn propagate_labels(mask: &Mask, seeds: &LabelMap, conflict: u32) -> RegionResult<LabelMap> {
    check_dimensions(mask.dimensions(), seeds.dimensions())?;
    let (components, count) = label_connected_components(mask, ConnectivityType::EightWay)?;

    let mut votes: Vec<HashMap<u32, usize>> = vec![HashMap::new(); count as usize + 1];
    for (&component, &seed) in components.data().iter().zip(seeds.data()) {
        if component != 0 && seed != 0 {
            *votes[component as usize].entry(seed).or_insert(0) += 1;
        }
    }

    let table: Vec<u32> = votes
        .iter()
        .map(|tally| {
            let mut ranked: Vec<(u32, usize)> = tally.iter().map(|(&l, &n)| (l, n)).collect();
            ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
            match ranked.as_slice() {
                [] => 0,
                [(label, _)] => *label,
                [(label, winner), (_, runner_up), ..] => {
                    if *runner_up as f64 >= CONFLICT_RATIO * *winner as f64 {
                        conflict
                    } else {
                        *label
                    }
                }
            }
        })
        .collect();

    let mut propagated = components;
    propagated.relabel(&table);
    Ok(propagated)
}
