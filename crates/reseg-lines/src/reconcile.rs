//! Writing new outlines back to existing lines
//!
//! Two ways lead to new outlines:
//!
//! - **Matching**: the candidates assigned to a line are joined into one
//!   polygon, which replaces the line's outline. Neighbours that the
//!   candidates also overlap lose the newly claimed area.
//! - **Spreading**: seed labels are grown over the glyph components and
//!   the ink, and each line's new label region is traced into a polygon.
//!
//! Work happens in scope coordinates; results are shifted back by the
//! scope offset, clipped to the parent region and rounded to integer page
//! points before they are written.

use crate::candidates::{Candidate, region_parts};
use crate::error::ResegResult;
use crate::matcher::GreedyAssigner;
use crate::page::TextLine;
use geo::{LineString, Polygon};
use reseg_core::{LabelMap, Mask};
use reseg_geom::{
    clip_baseline, difference_polygon, join_baselines, join_polygons, points_from_coords,
    points_from_polygon, polygon_for_parent, round_polygon, translate_polygon,
};
use reseg_region::grow_labels;
use serde::Serialize;
use tracing::{debug, warn};

/// What happened to an existing line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum LineDecision {
    /// Outline (and possibly baseline) replaced
    Updated,
    /// Outline shrunk because a neighbour claimed part of it
    Trimmed,
    /// Nothing to do
    Unchanged,
    /// Not enough evidence for a new outline
    Rejected(String),
    /// Line cannot be processed
    Skipped(String),
}

impl LineDecision {
    /// Whether the line's outline was rewritten
    pub fn is_modified(&self) -> bool {
        matches!(self, LineDecision::Updated | LineDecision::Trimmed)
    }

    /// Record a failure unless something already happened to the line
    fn settle(&mut self, outcome: LineDecision) {
        if *self == LineDecision::Unchanged {
            *self = outcome;
        }
    }
}

/// An existing line of one scope
#[derive(Debug)]
pub struct ScopeLine<'a> {
    /// The line in the page model
    pub line: &'a mut TextLine,
    /// Outline of the line's region in page coordinates
    pub parent: Option<Polygon<f64>>,
}

/// Scope-wide reconciliation parameters
#[derive(Debug, Clone, Copy)]
pub struct ReconcileParams {
    /// Scope origin in page coordinates
    pub offset: (i32, i32),
    /// Share of the old line the new one must cover
    pub min_fraction: f64,
    /// Roughness scale for joining fragments
    pub scale: f64,
}

impl ReconcileParams {
    /// Shift a scope polygon to the page, clip it to `parent` and round it
    fn to_page(&self, polygon: &Polygon<f64>, parent: Option<&Polygon<f64>>) -> Option<Polygon<f64>> {
        let moved = translate_polygon(polygon, self.offset.0 as f64, self.offset.1 as f64);
        let clipped = match parent {
            Some(parent) => polygon_for_parent(&moved, parent)?,
            None => moved,
        };
        round_polygon(&clipped).ok()
    }

    /// Shift a scope baseline to integer page points
    fn baseline_to_page(&self, baseline: &LineString<f64>) -> Option<Vec<(i32, i32)>> {
        let mut points = points_from_coords(&baseline.0);
        for p in &mut points {
            p.0 += self.offset.0;
            p.1 += self.offset.1;
        }
        points.dedup();
        (points.len() >= 2).then_some(points)
    }
}

/// Replace lines by the candidates assigned to them
///
/// `polygons` holds the lines' current outlines in scope coordinates and
/// is updated as outlines change. Lines whose decision is already
/// `Skipped` are left alone.
pub fn reconcile_matches(
    lines: &mut [ScopeLine<'_>],
    polygons: &mut [Option<Polygon<f64>>],
    candidates: &[Candidate],
    assigner: &GreedyAssigner<'_>,
    params: &ReconcileParams,
    decisions: &mut [LineDecision],
) {
    let overlaps = assigner.overlaps();
    let overlap = assigner.thresholds().overlap;

    for j in 0..lines.len() {
        if matches!(decisions[j], LineDecision::Skipped(_)) {
            continue;
        }
        let id = lines[j].line.id.clone();
        let assigned = match assigner.validate(j, params.min_fraction) {
            Ok(assigned) => assigned,
            Err(rejection) => {
                debug!("line '{}': {}", id, rejection);
                decisions[j].settle(LineDecision::Rejected(rejection.to_string()));
                continue;
            }
        };

        if assigned.len() > 1 {
            debug!("joining {} new line polygons for '{}'", assigned.len(), id);
        }
        let parts: Vec<Polygon<f64>> = assigned
            .iter()
            .map(|&i| candidates[i].polygon.clone())
            .collect();
        let new_polygon = match join_polygons(&parts, params.scale) {
            Ok(polygon) => polygon,
            Err(e) => {
                warn!("line '{}': cannot join new polygons: {}", id, e);
                decisions[j].settle(LineDecision::Skipped(e.to_string()));
                continue;
            }
        };
        let pieces: Vec<LineString<f64>> = assigned
            .iter()
            .filter_map(|&i| candidates[i].baseline.as_ref())
            .filter_map(|b| clip_baseline(&new_polygon, b))
            .collect();
        let new_baseline = join_baselines(&pieces);

        let Some(page_polygon) = params.to_page(&new_polygon, lines[j].parent.as_ref()) else {
            warn!("ignoring extant new polygon for line '{}'", id);
            decisions[j].settle(LineDecision::Skipped(
                "new polygon outside parent region".to_string(),
            ));
            continue;
        };
        let target = &mut lines[j].line;
        target.coords = points_from_polygon(&page_polygon);
        if let Some(points) = new_baseline.as_ref().and_then(|b| params.baseline_to_page(b)) {
            target.baseline = Some(points);
        }
        polygons[j] = Some(new_polygon.clone());
        decisions[j] = LineDecision::Updated;

        // keep neighbours off the newly claimed area
        for &i in &assigned {
            for k in 0..lines.len() {
                if k == j || overlaps.fits_fg.get(i, k) <= overlap {
                    continue;
                }
                let Some(other) = polygons[k].as_ref() else {
                    continue;
                };
                debug!("subtracting new '{}' from overlapping '{}'", id, lines[k].line.id);
                let Some(rest) = difference_polygon(other, &new_polygon) else {
                    continue;
                };
                let Some(page_rest) = params.to_page(&rest, lines[k].parent.as_ref()) else {
                    warn!("ignoring extant new polygon for line '{}'", lines[k].line.id);
                    continue;
                };
                lines[k].line.coords = points_from_polygon(&page_rest);
                polygons[k] = Some(rest);
                if decisions[k] != LineDecision::Updated {
                    decisions[k] = LineDecision::Trimmed;
                }
            }
        }
    }
}

/// Grow seed labels over glyph components, then over all ink
///
/// The second pass catches small components such as punctuation and
/// spreads only a quarter as far.
pub fn spread_line_labels(
    seeds: &LabelMap,
    components: &Mask,
    binary: &Mask,
    max_dist: f64,
) -> ResegResult<LabelMap> {
    let grown = grow_labels(seeds, components, max_dist as f32)?;
    Ok(grow_labels(&grown, binary, (max_dist / 4.0) as f32)?)
}

/// Replace lines by their spread label regions
///
/// Line `j` owns label `j + 1` in `labels` and the rasterized old outline
/// `old[j]`. Lines whose decision is already `Skipped` are left alone.
pub fn reconcile_spread(
    lines: &mut [ScopeLine<'_>],
    old: &[Mask],
    labels: &LabelMap,
    binary: &Mask,
    params: &ReconcileParams,
    decisions: &mut [LineDecision],
) -> ResegResult<()> {
    let threshold = params.min_fraction;
    for (j, (scope_line, old_label)) in lines.iter_mut().zip(old).enumerate() {
        if matches!(decisions[j], LineDecision::Skipped(_)) {
            continue;
        }
        let id = scope_line.line.id.clone();
        let new_label = labels.mask_of(j as u32 + 1);
        if new_label == *old_label {
            continue;
        }

        let old_area = old_label.count();
        if old_area == 0 {
            warn!("skipping zero-area line '{}'", id);
            decisions[j] = LineDecision::Skipped("zero area".to_string());
            continue;
        }
        let covers = new_label.count() as f64 / old_area as f64;
        if covers < threshold / 3.0 {
            debug!("new line for '{}' only covers {:.1}% bg", id, covers * 100.0);
            decisions[j] = LineDecision::Rejected(format!(
                "new line only covers {:.1}% bg",
                covers * 100.0
            ));
            continue;
        }
        let old_ink = old_label.count_and(binary)?;
        if old_ink == 0 {
            warn!("skipping binary-empty line '{}'", id);
            decisions[j] = LineDecision::Skipped("no ink".to_string());
            continue;
        }
        let covers = new_label.count_and(binary)? as f64 / old_ink as f64;
        if covers < threshold {
            debug!("new line for '{}' only covers {:.1}% fg", id, covers * 100.0);
            decisions[j] = LineDecision::Rejected(format!(
                "new line only covers {:.1}% fg",
                covers * 100.0
            ));
            continue;
        }
        debug!(
            "black pixels before/after resegment of line '{}': {}/{}",
            id,
            old_ink,
            (covers * old_ink as f64).round()
        );

        let parts = region_parts(&new_label)?;
        if parts.is_empty() {
            warn!("no contours for '{}', keeping", id);
            decisions[j] = LineDecision::Skipped("no contours".to_string());
            continue;
        }
        let polygon = match join_polygons(&parts, params.scale) {
            Ok(polygon) => polygon,
            Err(e) => {
                warn!("line '{}': cannot join contours: {}", id, e);
                decisions[j] = LineDecision::Skipped(e.to_string());
                continue;
            }
        };
        let Some(page_polygon) = params.to_page(&polygon, scope_line.parent.as_ref()) else {
            warn!("ignoring extant line for '{}'", id);
            decisions[j] = LineDecision::Skipped("new polygon outside parent region".to_string());
            continue;
        };
        scope_line.line.coords = points_from_polygon(&page_polygon);
        decisions[j] = LineDecision::Updated;
    }
    Ok(())
}
