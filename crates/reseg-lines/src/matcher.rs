//! Matching detected lines to existing lines
//!
//! Every pair of candidate `i` and existing line `j` gets four overlap
//! ratios: how much of the candidate's area and ink lies in the line
//! (`fits_*`), and how much of the line's area and ink the candidate
//! covers (`covers_*`). Candidates are then assigned greedily, best
//! coverage first, to lines they fit into. An existing line may receive
//! several candidates; a candidate goes to at most one line.

use crate::candidates::Candidate;
use crate::config::MatchThresholds;
use crate::error::ResegResult;
use geo::{Area, Polygon};
use reseg_core::{LabelMap, Mask, check_dimensions};
use reseg_geom::intersection_area;
use thiserror::Error;

/// Dense candidate x line matrix of ratios
#[derive(Debug, Clone, PartialEq)]
pub struct OverlapMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl OverlapMatrix {
    /// Create a zero matrix
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    /// Number of candidates
    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of existing lines
    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Ratio for candidate `i` and line `j`
    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[i * self.cols + j]
    }

    /// Set the ratio for candidate `i` and line `j`
    #[inline]
    pub fn set(&mut self, i: usize, j: usize, value: f64) {
        self.data[i * self.cols + j] = value;
    }

    /// Ratios of candidate `i` against all lines
    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }
}

/// The four overlap ratios for all candidate/line pairs
#[derive(Debug, Clone, PartialEq)]
pub struct Overlaps {
    /// Intersection area over candidate area
    pub fits_bg: OverlapMatrix,
    /// Shared ink over candidate ink
    pub fits_fg: OverlapMatrix,
    /// Intersection area over line area
    pub covers_bg: OverlapMatrix,
    /// Shared ink over line ink
    pub covers_fg: OverlapMatrix,
}

/// Compute overlap ratios between candidates and existing lines
///
/// `candidate_labels` holds candidate `i` as label `i + 1`; `layers` holds
/// the rasterized existing lines. A pair gets all zeros when the polygons
/// do not overlap with positive area, or when the candidate, the line or
/// their intersection holds no ink. Lines without a polygon get zeros.
pub fn compute_overlaps(
    candidates: &[Candidate],
    candidate_labels: &LabelMap,
    lines: &[Option<Polygon<f64>>],
    layers: &[Mask],
    binary: &Mask,
) -> ResegResult<Overlaps> {
    check_dimensions(binary.dimensions(), candidate_labels.dimensions())?;
    let (n, m) = (candidates.len(), lines.len());
    let mut overlaps = Overlaps {
        fits_bg: OverlapMatrix::new(n, m),
        fits_fg: OverlapMatrix::new(n, m),
        covers_bg: OverlapMatrix::new(n, m),
        covers_fg: OverlapMatrix::new(n, m),
    };

    // ink per candidate label
    let mut candidate_ink = vec![0usize; n + 1];
    for (&l, &on) in candidate_labels.data().iter().zip(binary.data()) {
        if on && (l as usize) <= n {
            candidate_ink[l as usize] += 1;
        }
    }

    for (j, (line, layer)) in lines.iter().zip(layers).enumerate() {
        let Some(line) = line else {
            continue;
        };
        check_dimensions(binary.dimensions(), layer.dimensions())?;
        // shared ink per candidate label within this line
        let mut shared = vec![0usize; n + 1];
        let mut line_ink = 0usize;
        for ((&l, &on), &inside) in candidate_labels
            .data()
            .iter()
            .zip(binary.data())
            .zip(layer.data())
        {
            if on && inside {
                line_ink += 1;
                if (l as usize) <= n {
                    shared[l as usize] += 1;
                }
            }
        }
        let line_area = line.unsigned_area();

        for (i, candidate) in candidates.iter().enumerate() {
            let label = i + 1;
            if shared[label] == 0 || candidate_ink[label] == 0 || line_ink == 0 {
                continue;
            }
            let inter = intersection_area(&candidate.polygon, line);
            let candidate_area = candidate.polygon.unsigned_area();
            if inter <= 0.0 || candidate_area <= 0.0 || line_area <= 0.0 {
                continue;
            }
            overlaps.fits_bg.set(i, j, inter / candidate_area);
            overlaps.covers_bg.set(i, j, inter / line_area);
            overlaps
                .fits_fg
                .set(i, j, shared[label] as f64 / candidate_ink[label] as f64);
            overlaps
                .covers_fg
                .set(i, j, shared[label] as f64 / line_ink as f64);
        }
    }
    Ok(overlaps)
}

/// Outcome of one greedy step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Candidate assigned to line
    Accepted { candidate: usize, line: usize },
    /// Best pair did not fit; its coverage is zeroed for the next step
    Refused { candidate: usize, line: usize },
    /// Nothing left to assign
    Done,
}

/// Why an existing line keeps its old outline
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Rejection {
    #[error("no new lines match or fit")]
    NoCandidates,

    #[error("new lines only cover {:.1}% bg", .0 * 100.0)]
    LowBackground(f64),

    #[error("new lines only cover {:.1}% fg", .0 * 100.0)]
    LowForeground(f64),

    #[error("new lines would lose {count} non-matching segments totalling {:.1}% bg", .cover * 100.0)]
    LosesSegments { count: usize, cover: f64 },
}

/// Greedy one-to-many assignment of candidates to lines
///
/// Works on a copy of the coverage matrices. Each [`step`](Self::step)
/// looks at the eligible pair with the highest `covers_fg * covers_bg`
/// (lowest candidate, then lowest line on ties). If the candidate fits
/// into the line it is assigned and leaves the pool; otherwise the pair's
/// coverage is zeroed and the next step tries the runner-up.
#[derive(Debug, Clone)]
pub struct GreedyAssigner<'a> {
    overlaps: &'a Overlaps,
    thresholds: MatchThresholds,
    covers_bg: OverlapMatrix,
    covers_fg: OverlapMatrix,
    eligible_candidates: Vec<bool>,
    eligible_lines: Vec<bool>,
    assignments: Vec<Option<usize>>,
}

impl<'a> GreedyAssigner<'a> {
    /// Start an assignment with all candidates and lines eligible
    pub fn new(overlaps: &'a Overlaps, thresholds: MatchThresholds) -> Self {
        let (n, m) = (overlaps.fits_bg.rows(), overlaps.fits_bg.cols());
        Self {
            overlaps,
            thresholds,
            covers_bg: overlaps.covers_bg.clone(),
            covers_fg: overlaps.covers_fg.clone(),
            eligible_candidates: vec![true; n],
            eligible_lines: vec![true; m],
            assignments: vec![None; n],
        }
    }

    /// Exclude a line from receiving candidates
    pub fn exclude_line(&mut self, line: usize) {
        if let Some(e) = self.eligible_lines.get_mut(line) {
            *e = false;
        }
    }

    /// The unmodified overlap ratios
    pub fn overlaps(&self) -> &'a Overlaps {
        self.overlaps
    }

    /// Thresholds in use
    pub fn thresholds(&self) -> MatchThresholds {
        self.thresholds
    }

    /// Candidates still available
    pub fn eligible_candidates(&self) -> &[bool] {
        &self.eligible_candidates
    }

    /// Lines still accepting candidates
    pub fn eligible_lines(&self) -> &[bool] {
        &self.eligible_lines
    }

    /// Working copy of the area coverage
    pub fn covers_bg(&self) -> &OverlapMatrix {
        &self.covers_bg
    }

    /// Working copy of the ink coverage
    pub fn covers_fg(&self) -> &OverlapMatrix {
        &self.covers_fg
    }

    /// Line assigned to each candidate so far
    pub fn assignments(&self) -> &[Option<usize>] {
        &self.assignments
    }

    /// Perform one greedy step
    pub fn step(&mut self) -> Step {
        let mut best: Option<(f64, usize, usize)> = None;
        for (i, _) in self.eligible_candidates.iter().enumerate().filter(|(_, e)| **e) {
            for (j, _) in self.eligible_lines.iter().enumerate().filter(|(_, e)| **e) {
                let priority = self.covers_fg.get(i, j) * self.covers_bg.get(i, j);
                if best.is_none_or(|(p, _, _)| priority > p) {
                    best = Some((priority, i, j));
                }
            }
        }
        let Some((priority, i, j)) = best else {
            return Step::Done;
        };
        if priority <= 0.0 {
            return Step::Done;
        }
        if self.overlaps.fits_bg.get(i, j) > self.thresholds.fit_bg
            && self.overlaps.fits_fg.get(i, j) > self.thresholds.fit_fg
        {
            self.assignments[i] = Some(j);
            self.eligible_candidates[i] = false;
            Step::Accepted {
                candidate: i,
                line: j,
            }
        } else {
            self.covers_bg.set(i, j, 0.0);
            self.covers_fg.set(i, j, 0.0);
            Step::Refused {
                candidate: i,
                line: j,
            }
        }
    }

    /// Step until done
    pub fn run(&mut self) {
        while self.step() != Step::Done {}
    }

    /// Check that the candidates assigned to line `j` may replace it
    ///
    /// In order: some candidate is assigned; together they cover at least
    /// `min_fraction / 3` of the line's area and `min_fraction` of its ink;
    /// no unassigned candidate covers more than the overlap threshold of
    /// the line's area. Returns the assigned candidates.
    pub fn validate(&self, j: usize, min_fraction: f64) -> Result<Vec<usize>, Rejection> {
        let assigned: Vec<usize> = self
            .assignments
            .iter()
            .enumerate()
            .filter(|(_, a)| **a == Some(j))
            .map(|(i, _)| i)
            .collect();
        if assigned.is_empty() {
            return Err(Rejection::NoCandidates);
        }
        let bg: f64 = assigned.iter().map(|&i| self.covers_bg.get(i, j)).sum();
        if bg < min_fraction / 3.0 {
            return Err(Rejection::LowBackground(bg));
        }
        let fg: f64 = assigned.iter().map(|&i| self.covers_fg.get(i, j)).sum();
        if fg < min_fraction {
            return Err(Rejection::LowForeground(fg));
        }
        let lost: Vec<usize> = (0..self.assignments.len())
            .filter(|&i| self.assignments[i].is_none() && self.covers_bg.get(i, j) > self.thresholds.overlap)
            .collect();
        if !lost.is_empty() {
            return Err(Rejection::LosesSegments {
                count: lost.len(),
                cover: lost.iter().map(|&i| self.covers_bg.get(i, j)).sum(),
            });
        }
        Ok(assigned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(rows: &[&[f64]]) -> OverlapMatrix {
        let mut m = OverlapMatrix::new(rows.len(), rows[0].len());
        for (i, row) in rows.iter().enumerate() {
            for (j, &v) in row.iter().enumerate() {
                m.set(i, j, v);
            }
        }
        m
    }

    fn overlaps(fits: &[&[f64]], covers: &[&[f64]]) -> Overlaps {
        Overlaps {
            fits_bg: matrix(fits),
            fits_fg: matrix(fits),
            covers_bg: matrix(covers),
            covers_fg: matrix(covers),
        }
    }

    #[test]
    fn test_assigns_best_pairs_first() {
        let o = overlaps(&[&[0.9, 0.0], &[0.0, 0.95]], &[&[0.8, 0.0], &[0.0, 0.9]]);
        let mut assigner = GreedyAssigner::new(&o, MatchThresholds::default());
        assert_eq!(
            assigner.step(),
            Step::Accepted {
                candidate: 1,
                line: 1
            }
        );
        assert_eq!(assigner.eligible_candidates(), &[true, false]);
        assigner.run();
        assert_eq!(assigner.assignments(), &[Some(0), Some(1)]);
        assert_eq!(assigner.validate(0, 0.5), Ok(vec![0]));
    }

    #[test]
    fn test_refused_pair_falls_back_to_runner_up() {
        // candidate 0 covers line 0 well but only half of it fits
        let o = Overlaps {
            fits_bg: matrix(&[&[0.5, 0.9]]),
            fits_fg: matrix(&[&[0.5, 0.9]]),
            covers_bg: matrix(&[&[0.9, 0.3]]),
            covers_fg: matrix(&[&[0.9, 0.3]]),
        };
        let mut assigner = GreedyAssigner::new(&o, MatchThresholds::default());
        assert_eq!(
            assigner.step(),
            Step::Refused {
                candidate: 0,
                line: 0
            }
        );
        assert_eq!(assigner.covers_bg().get(0, 0), 0.0);
        assert_eq!(o.covers_bg.get(0, 0), 0.9);
        assert_eq!(
            assigner.step(),
            Step::Accepted {
                candidate: 0,
                line: 1
            }
        );
        assert_eq!(assigner.step(), Step::Done);
    }

    #[test]
    fn test_ties_prefer_lowest_indices() {
        let o = overlaps(&[&[0.9, 0.9], &[0.9, 0.9]], &[&[0.5, 0.5], &[0.5, 0.5]]);
        let mut assigner = GreedyAssigner::new(&o, MatchThresholds::default());
        assert_eq!(
            assigner.step(),
            Step::Accepted {
                candidate: 0,
                line: 0
            }
        );
        assert_eq!(
            assigner.step(),
            Step::Accepted {
                candidate: 1,
                line: 0
            }
        );
    }

    #[test]
    fn test_excluded_line_gets_nothing() {
        let o = overlaps(&[&[0.9]], &[&[0.9]]);
        let mut assigner = GreedyAssigner::new(&o, MatchThresholds::default());
        assigner.exclude_line(0);
        assert_eq!(assigner.step(), Step::Done);
        assert_eq!(assigner.validate(0, 0.9), Err(Rejection::NoCandidates));
    }

    #[test]
    fn test_validation_order() {
        // low area coverage
        let o = overlaps(&[&[0.9]], &[&[0.2]]);
        let mut assigner = GreedyAssigner::new(&o, MatchThresholds::default());
        assigner.run();
        assert_eq!(assigner.validate(0, 0.9), Err(Rejection::LowBackground(0.2)));

        // enough area, too little ink
        let o = Overlaps {
            fits_bg: matrix(&[&[0.9]]),
            fits_fg: matrix(&[&[0.9]]),
            covers_bg: matrix(&[&[0.5]]),
            covers_fg: matrix(&[&[0.8]]),
        };
        let mut assigner = GreedyAssigner::new(&o, MatchThresholds::default());
        assigner.run();
        assert_eq!(assigner.validate(0, 0.9), Err(Rejection::LowForeground(0.8)));
    }

    #[test]
    fn test_unassigned_overlap_blocks_line() {
        // candidate 1 fits line 0 poorly but still covers a fifth of it
        let o = Overlaps {
            fits_bg: matrix(&[&[0.9], &[0.3]]),
            fits_fg: matrix(&[&[0.9], &[0.3]]),
            covers_bg: matrix(&[&[0.8], &[0.2]]),
            covers_fg: matrix(&[&[0.95], &[0.05]]),
        };
        let mut assigner = GreedyAssigner::new(&o, MatchThresholds::default());
        assigner.run();
        assert_eq!(assigner.assignments(), &[Some(0), None]);
        // the refused pair was zeroed and no longer counts as lost
        assert_eq!(assigner.validate(0, 0.9), Ok(vec![0]));

        // a candidate never considered for line 0 does count
        let mut assigner = GreedyAssigner::new(&o, MatchThresholds::default());
        assigner.step();
        assert!(matches!(
            assigner.validate(0, 0.9),
            Err(Rejection::LosesSegments { count: 1, .. })
        ));
    }

    #[test]
    fn test_compute_overlaps() {
        use reseg_geom::{rasterize, rect_polygon};

        let binary = Mask::from_fn(40, 20, |x, y| (5..35).contains(&x) && (5..10).contains(&y))
            .unwrap();
        let candidate = Candidate {
            label: 1,
            polygon: rect_polygon(5.0, 5.0, 34.0, 9.0),
            baseline: None,
        };
        let mut labels = LabelMap::new(40, 20).unwrap();
        for y in 5..10 {
            for x in 5..35 {
                labels.set_pixel(x, y, 1).unwrap();
            }
        }
        let line = rect_polygon(0.0, 0.0, 39.0, 19.0);
        let far = rect_polygon(0.0, 15.0, 39.0, 19.0);
        let layers = vec![rasterize(&line, 40, 20).unwrap(), rasterize(&far, 40, 20).unwrap()];
        let o = compute_overlaps(&[candidate], &labels, &[Some(line), Some(far)], &layers, &binary)
            .unwrap();
        assert!((o.fits_bg.get(0, 0) - 1.0).abs() < 1e-9);
        assert!((o.fits_fg.get(0, 0) - 1.0).abs() < 1e-9);
        assert!((o.covers_fg.get(0, 0) - 1.0).abs() < 1e-9);
        assert!((o.covers_bg.get(0, 0) - 29.0 * 4.0 / (39.0 * 19.0)).abs() < 1e-9);
        // no ink in the second line
        assert_eq!(o.fits_bg.get(0, 1), 0.0);
        assert_eq!(o.covers_fg.row(0), &[1.0, 0.0]);
    }
}
