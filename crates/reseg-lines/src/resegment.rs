//! Page re-segmentation
//!
//! [`Resegmenter`] rewrites the outlines of the existing text lines of a
//! page so that they follow the ink of the binarized page image.
//!
//! # Algorithm Overview
//!
//! 1. **Scopes**: the whole page, or one scope per text region cropped to
//!    the region's bounding box (regions run in parallel)
//! 2. **Sanity check**: skip scopes that do not look like a binarized page
//!    or region at the assumed resolution
//! 3. **Existing lines**: rasterize outlines (or baseline bands), skip
//!    lines without geometry or ink
//! 4. **Ignore mask**: everything outside text regions and inside non-text
//!    regions
//! 5. **New segmentation**: either spread seeds from the existing lines
//!    over the glyph components (`ccomps`, `baseline`), or run a line
//!    detector and match its lines to the existing ones (`lineest`)
//! 6. **Write-back**: accepted outlines go back to the page model in page
//!    coordinates, clipped to their region
//!
//! # Example
//!
//! ```
//! use reseg_lines::{Page, Resegmenter, ResegmentOptions, TextLine, TextRegion};
//! use reseg_core::Mask;
//!
//! let mut page = Page::new("p", 120, 60).with_region(
//!     TextRegion::new("r", vec![(0, 0), (119, 0), (119, 59), (0, 59)])
//!         .with_line(TextLine::new("l", vec![(5, 5), (115, 5), (115, 50), (5, 50)])),
//! );
//! let binary = Mask::new(120, 60).unwrap();
//! let options = ResegmentOptions::new().with_check_images(false);
//! let report = Resegmenter::new(options).unwrap().process_page(&mut page, &binary, 300.0);
//! // no ink: the line is skipped and left alone
//! assert!(!report.lines().any(|l| l.decision.is_modified()));
//! ```

use crate::candidates::{
    LineShape, baseline_seeds, flattened_seeds, glyph_components, ignore_mask, line_layers,
    polygonize_candidates,
};
use crate::check::{check_page, check_region};
use crate::config::{Level, Method, ResegmentOptions, determine_zoom, spread_distance};
use crate::debug::DebugSink;
use crate::detector::{DetectorInput, LineDetector, ProjectionLineDetector};
use crate::error::ResegResult;
use crate::matcher::{GreedyAssigner, compute_overlaps};
use crate::page::{Page, TextLine, TextRegion};
use crate::reconcile::{
    LineDecision, ReconcileParams, ScopeLine, reconcile_matches, reconcile_spread,
    spread_line_labels,
};
use geo::{Coord, LineString, Polygon};
use rayon::prelude::*;
use reseg_core::{LabelMap, Mask};
use reseg_geom::translate_polygon;
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};

/// Where a scope lies within the page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentScope {
    /// The full page image
    Page,
    /// A text region, cropped to its bounding box
    Region {
        /// Crop rectangle in page coordinates
        bounds: reseg_core::Box,
    },
}

impl ParentScope {
    /// Scope origin in page coordinates
    pub fn offset(&self) -> (i32, i32) {
        match self {
            ParentScope::Page => (0, 0),
            ParentScope::Region { bounds } => (bounds.x, bounds.y),
        }
    }

    /// Whether the scope is a full page
    pub fn is_page(&self) -> bool {
        matches!(self, ParentScope::Page)
    }

    fn kind(&self) -> &'static str {
        match self {
            ParentScope::Page => "page",
            ParentScope::Region { .. } => "region",
        }
    }
}

/// Decision for one line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineReport {
    /// Line identifier
    pub id: String,
    /// What happened to the line
    pub decision: LineDecision,
}

/// Outcome of one scope
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScopeReport {
    /// Page or region identifier
    pub id: String,
    /// Reason the whole scope was skipped
    pub skipped: Option<String>,
    /// One entry per line of the scope, unless skipped
    pub lines: Vec<LineReport>,
}

impl ScopeReport {
    fn skipped(id: &str, reason: impl Into<String>) -> Self {
        Self {
            id: id.to_string(),
            skipped: Some(reason.into()),
            lines: Vec::new(),
        }
    }
}

/// Outcome of one page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageReport {
    /// Page identifier
    pub page_id: String,
    /// Zoom factor used
    pub zoom: f64,
    /// Reason the whole page was skipped
    pub skipped: Option<String>,
    /// Processed scopes
    pub scopes: Vec<ScopeReport>,
}

impl PageReport {
    /// All line decisions
    pub fn lines(&self) -> impl Iterator<Item = &LineReport> {
        self.scopes.iter().flat_map(|s| s.lines.iter())
    }

    /// Decision for a line, if its scope was processed
    pub fn decision(&self, line_id: &str) -> Option<&LineDecision> {
        self.lines().find(|l| l.id == line_id).map(|l| &l.decision)
    }

    /// Number of lines whose outline changed
    pub fn modified_count(&self) -> usize {
        self.lines().filter(|l| l.decision.is_modified()).count()
    }
}

/// Everything a scope needs besides its lines
struct Scope<'a> {
    id: &'a str,
    parent: ParentScope,
    /// Scope image
    binary: &'a Mask,
    /// Text region outlines in scope coordinates
    text: Vec<Polygon<f64>>,
    /// Non-text region outlines in scope coordinates
    non_text: Vec<Polygon<f64>>,
}

enum ScopeOutcome {
    Done(Vec<LineDecision>),
    Skipped(String),
}

/// Text-line re-segmentation engine
///
/// # See also
///
/// [`ResegmentOptions`] for the configuration.
pub struct Resegmenter {
    options: ResegmentOptions,
    detector: Box<dyn LineDetector>,
}

impl Resegmenter {
    /// Create an engine with the projection line detector
    ///
    /// # Errors
    ///
    /// Returns `ResegError::InvalidParameter` if the options are invalid.
    pub fn new(options: ResegmentOptions) -> ResegResult<Self> {
        options.validate()?;
        Ok(Self {
            options,
            detector: Box::new(ProjectionLineDetector::new()),
        })
    }

    /// Use another line detector for the `lineest` method
    pub fn with_detector(mut self, detector: impl LineDetector + 'static) -> Self {
        self.detector = Box::new(detector);
        self
    }

    /// Options in use
    pub fn options(&self) -> &ResegmentOptions {
        &self.options
    }

    /// Re-segment the lines of a page in place
    ///
    /// `binary` is the binarized page image (ink is `true`) and must match
    /// the page size. `image_dpi` is the image's pixel density, 0 if
    /// unknown. Problems with single lines or scopes are logged and
    /// reported; lines that are not updated keep their outline.
    pub fn process_page(&self, page: &mut Page, binary: &Mask, image_dpi: f64) -> PageReport {
        let zoom = determine_zoom(self.options.dpi, image_dpi);
        let page_id = page.id.clone();
        let mut report = PageReport {
            page_id: page_id.clone(),
            zoom,
            skipped: None,
            scopes: Vec::new(),
        };

        if binary.dimensions() != (page.width, page.height) {
            let reason = format!(
                "image size {}x{} does not match page size {}x{}",
                binary.width(),
                binary.height(),
                page.width,
                page.height
            );
            warn!("page '{}': {}", page_id, reason);
            report.skipped = Some(reason);
            return report;
        }
        if page.regions.is_empty() {
            warn!("page '{}' contains no text regions", page_id);
            report.skipped = Some("no text regions".to_string());
            return report;
        }
        let non_text: Vec<Polygon<f64>> = page
            .non_text
            .iter()
            .filter_map(|region| match region.polygon() {
                Ok(polygon) => Some(polygon),
                Err(e) => {
                    warn!("ignoring invalid non-text region '{}': {}", region.id, e);
                    None
                }
            })
            .collect();

        match self.options.level {
            Level::Page => {
                if page.line_count() == 0 {
                    warn!("page '{}' contains no text regions with lines", page_id);
                    report.skipped = Some("no text lines".to_string());
                    return report;
                }
                let text: Vec<Polygon<f64>> = page
                    .regions
                    .iter()
                    .filter(|region| !region.lines.is_empty())
                    .filter_map(|region| {
                        debug!("unmasking area of text region '{}'", region.id);
                        region.polygon().ok()
                    })
                    .collect();
                let lines: Vec<ScopeLine<'_>> = page
                    .regions
                    .iter_mut()
                    .flat_map(|region| {
                        let parent = region.polygon().ok();
                        region.lines.iter_mut().map(move |line| ScopeLine {
                            line,
                            parent: parent.clone(),
                        })
                    })
                    .collect();
                let scope = Scope {
                    id: &page_id,
                    parent: ParentScope::Page,
                    binary,
                    text,
                    non_text,
                };
                report.scopes.push(self.process_scope(scope, lines, zoom));
            }
            Level::Region => {
                report.scopes = page
                    .regions
                    .par_iter_mut()
                    .map(|region| self.process_region(&page_id, region, binary, &non_text, zoom))
                    .collect();
            }
        }
        report
    }

    fn process_region(
        &self,
        page_id: &str,
        region: &mut TextRegion,
        binary: &Mask,
        non_text: &[Polygon<f64>],
        zoom: f64,
    ) -> ScopeReport {
        let id = region.id.clone();
        if region.lines.is_empty() {
            warn!("page '{}' region '{}' contains no text lines", page_id, id);
            return ScopeReport::skipped(&id, "no text lines");
        }
        let parent = match region.polygon() {
            Ok(polygon) => polygon,
            Err(e) => {
                warn!("region '{}' has an invalid outline: {}", id, e);
                return ScopeReport::skipped(&id, format!("invalid outline: {}", e));
            }
        };
        let Some(bounds) = region
            .bounding_box()
            .and_then(|b| b.clip(binary.width(), binary.height()))
        else {
            warn!("region '{}' lies outside the page image", id);
            return ScopeReport::skipped(&id, "outside page image");
        };
        let image = match binary.crop(&bounds) {
            Ok(image) => image,
            Err(e) => {
                warn!("cannot crop region '{}': {}", id, e);
                return ScopeReport::skipped(&id, e.to_string());
            }
        };

        let (dx, dy) = (-bounds.x as f64, -bounds.y as f64);
        let scope = Scope {
            id: &id,
            parent: ParentScope::Region { bounds },
            binary: &image,
            text: vec![translate_polygon(&parent, dx, dy)],
            non_text: non_text
                .iter()
                .map(|p| translate_polygon(p, dx, dy))
                .collect(),
        };
        let lines = region
            .lines
            .iter_mut()
            .map(|line| ScopeLine {
                line,
                parent: Some(parent.clone()),
            })
            .collect();
        self.process_scope(scope, lines, zoom)
    }

    #[instrument(skip_all, fields(scope = %scope.id))]
    fn process_scope(&self, scope: Scope<'_>, mut lines: Vec<ScopeLine<'_>>, zoom: f64) -> ScopeReport {
        let ids: Vec<String> = lines.iter().map(|l| l.line.id.clone()).collect();
        let outcome = match self.resegment_scope(&scope, &mut lines, zoom) {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("cannot resegment {} '{}': {}", scope.parent.kind(), scope.id, e);
                ScopeOutcome::Skipped(e.to_string())
            }
        };
        match outcome {
            ScopeOutcome::Skipped(reason) => ScopeReport::skipped(scope.id, reason),
            ScopeOutcome::Done(decisions) => {
                let lines: Vec<LineReport> = ids
                    .into_iter()
                    .zip(decisions)
                    .map(|(id, decision)| LineReport { id, decision })
                    .collect();
                debug!(
                    "{} of {} lines modified",
                    lines.iter().filter(|l| l.decision.is_modified()).count(),
                    lines.len()
                );
                ScopeReport {
                    id: scope.id.to_string(),
                    skipped: None,
                    lines,
                }
            }
        }
    }

    fn resegment_scope(
        &self,
        scope: &Scope<'_>,
        lines: &mut [ScopeLine<'_>],
        zoom: f64,
    ) -> ResegResult<ScopeOutcome> {
        let options = &self.options;
        let binary = scope.binary;
        let (width, height) = binary.dimensions();
        let kind = scope.parent.kind();

        if options.check_images {
            let problem = if scope.parent.is_page() {
                check_page(binary, zoom)?
            } else {
                check_region(binary, zoom)?
            };
            if let Some(reason) = problem {
                warn!("invalid {} '{}': {}", kind, scope.id, reason);
                return Ok(ScopeOutcome::Skipped(reason));
            }
        }

        let offset = scope.parent.offset();
        let shapes: Vec<LineShape> = lines.iter().map(|l| line_shape(l.line, offset)).collect();
        let layers = line_layers(&shapes, width, height, options.baseline_only, zoom)?;
        let mut decisions = Vec::with_capacity(shapes.len());
        for (shape, (polygon, mask)) in shapes
            .iter()
            .zip(layers.polygons.iter().zip(&layers.masks))
        {
            let decision = if polygon.is_none() {
                LineDecision::Skipped("invalid geometry".to_string())
            } else if !mask.any() {
                warn!("skipping zero-area line '{}'", shape.id);
                LineDecision::Skipped("zero area".to_string())
            } else if mask.count_and(binary)? == 0 {
                warn!("skipping binary-empty line '{}'", shape.id);
                LineDecision::Skipped("no ink".to_string())
            } else {
                LineDecision::Unchanged
            };
            decisions.push(decision);
        }

        let ignore = ignore_mask(width, height, &scope.text, &scope.non_text)?;
        let sink = DebugSink::new(options.debug_dir.as_deref(), scope.id);
        sink.mask("ignore", &ignore);
        if sink.is_enabled() {
            sink.labels("line-labels", &flatten_layers(&layers.masks, width, height)?);
        }

        let components = glyph_components(binary, &ignore, zoom)?;
        let spread = spread_distance(options.spread, zoom);
        let max_dist = if spread > 0.0 {
            spread
        } else {
            components.scale / 2.0
        };
        let params = ReconcileParams {
            offset,
            min_fraction: options.min_fraction,
            scale: max_dist,
        };

        if options.method.spreads_labels() {
            let seeds = if options.method == Method::Baseline {
                baseline_seeds(&shapes, &layers, max_dist)?
            } else {
                flattened_seeds(&ignore, &layers.masks)?
            };
            debug!("spreading line seeds of {} '{}' by {:.1} px", kind, scope.id, max_dist);
            sink.labels("seeds", &seeds);
            let labels = spread_line_labels(&seeds, &components.mask, binary, max_dist)?;
            sink.labels("spread", &labels);
            reconcile_spread(lines, &layers.masks, &labels, binary, &params, &mut decisions)?;
            return Ok(ScopeOutcome::Done(decisions));
        }

        let input = DetectorInput {
            binary,
            separators: &ignore,
            zoom,
            spread_distance: max_dist,
            full_page: scope.parent.is_page(),
        };
        let output = match self.detector.detect(&input) {
            Ok(output) => output,
            Err(e) => {
                error!("cannot line-segment {} '{}': {}", kind, scope.id, e);
                return Ok(ScopeOutcome::Skipped(e.to_string()));
            }
        };
        info!(
            "found {} new line labels for {} existing lines on {} '{}'",
            output.labels.max_label(),
            lines.len(),
            kind,
            scope.id
        );

        let (candidates, candidate_labels) =
            polygonize_candidates(&output, binary, 640.0 / (zoom * zoom))?;
        sink.labels("new-line-labels", &candidate_labels);
        let overlaps = compute_overlaps(
            &candidates,
            &candidate_labels,
            &layers.polygons,
            &layers.masks,
            binary,
        )?;
        let mut assigner = GreedyAssigner::new(&overlaps, options.thresholds);
        for (j, decision) in decisions.iter().enumerate() {
            if matches!(decision, LineDecision::Skipped(_)) {
                assigner.exclude_line(j);
            }
        }
        assigner.run();

        let mut polygons = layers.polygons.clone();
        let params = ReconcileParams {
            scale: output.scale,
            ..params
        };
        reconcile_matches(
            lines,
            &mut polygons,
            &candidates,
            &assigner,
            &params,
            &mut decisions,
        );
        Ok(ScopeOutcome::Done(decisions))
    }
}

/// Geometry of a line in scope coordinates
fn line_shape(line: &TextLine, (x, y): (i32, i32)) -> LineShape {
    let (dx, dy) = (-x as f64, -y as f64);
    let outline = match line.polygon() {
        Ok(polygon) => Some(translate_polygon(&polygon, dx, dy)),
        Err(e) => {
            warn!("line '{}' has an invalid outline: {}", line.id, e);
            None
        }
    };
    let baseline = line.baseline_string().map(|b| {
        LineString::new(
            b.0.iter()
                .map(|c| Coord {
                    x: c.x + dx,
                    y: c.y + dy,
                })
                .collect(),
        )
    });
    LineShape {
        id: line.id.clone(),
        outline,
        baseline,
    }
}

/// Existing lines as one label raster, later lines on top
fn flatten_layers(masks: &[Mask], width: u32, height: u32) -> ResegResult<LabelMap> {
    let mut labels = LabelMap::new(width, height)?;
    for (i, mask) in masks.iter().enumerate() {
        for (l, &on) in labels.data_mut().iter_mut().zip(mask.data()) {
            if on {
                *l = i as u32 + 1;
            }
        }
    }
    Ok(labels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::{DetectorError, DetectorOutput};
    use crate::page::{NonTextKind, NonTextRegion};

    struct FailingDetector;

    impl LineDetector for FailingDetector {
        fn detect(&self, _input: &DetectorInput<'_>) -> Result<DetectorOutput, DetectorError> {
            Err(DetectorError::Failed("no model".to_string()))
        }
    }

    fn rect(x0: i32, y0: i32, x1: i32, y1: i32) -> Vec<(i32, i32)> {
        vec![(x0, y0), (x1, y0), (x1, y1), (x0, y1)]
    }

    fn word_page() -> (Page, Mask) {
        let page = Page::new("p", 200, 100).with_region(
            TextRegion::new("r", rect(0, 0, 199, 99))
                .with_line(TextLine::new("l", rect(10, 10, 190, 50))),
        );
        let binary = Mask::from_fn(200, 100, |x, y| {
            (30..170).contains(&x) && (20..40).contains(&y) && (x / 5) % 2 == 0
        })
        .unwrap();
        (page, binary)
    }

    fn options() -> ResegmentOptions {
        ResegmentOptions::new().with_check_images(false)
    }

    #[test]
    fn test_parent_scope_offset() {
        let bounds = reseg_core::Box::new(5, 7, 10, 10).unwrap();
        assert_eq!(ParentScope::Page.offset(), (0, 0));
        assert_eq!(ParentScope::Region { bounds }.offset(), (5, 7));
        assert!(!ParentScope::Region { bounds }.is_page());
    }

    #[test]
    fn test_invalid_options_are_refused() {
        assert!(Resegmenter::new(ResegmentOptions::new().with_min_fraction(2.0)).is_err());
    }

    #[test]
    fn test_size_mismatch_skips_page() {
        let (mut page, _) = word_page();
        let report = Resegmenter::new(options())
            .unwrap()
            .process_page(&mut page, &Mask::new(10, 10).unwrap(), 0.0);
        assert!(report.skipped.unwrap().contains("does not match"));
    }

    #[test]
    fn test_page_without_regions() {
        let mut page = Page::new("p", 50, 50);
        let report = Resegmenter::new(options())
            .unwrap()
            .process_page(&mut page, &Mask::new(50, 50).unwrap(), 0.0);
        assert_eq!(report.skipped.as_deref(), Some("no text regions"));
    }

    #[test]
    fn test_detector_failure_keeps_lines() {
        let (mut page, binary) = word_page();
        let before = page.clone();
        let report = Resegmenter::new(options())
            .unwrap()
            .with_detector(FailingDetector)
            .process_page(&mut page, &binary, 300.0);
        assert!(report.scopes[0].skipped.as_ref().unwrap().contains("no model"));
        assert_eq!(page, before);
    }

    #[test]
    fn test_check_images_skips_implausible_scope() {
        let (mut page, binary) = word_page();
        let before = page.clone();
        let report = Resegmenter::new(ResegmentOptions::new())
            .unwrap()
            .process_page(&mut page, &binary, 300.0);
        // a 200x100 image is far too small for a page
        assert!(report.scopes[0].skipped.is_some());
        assert_eq!(page, before);
    }

    #[test]
    fn test_lineest_tightens_word() {
        let (mut page, binary) = word_page();
        let report = Resegmenter::new(options())
            .unwrap()
            .process_page(&mut page, &binary, 300.0);
        assert_eq!(report.decision("l"), Some(&LineDecision::Updated));
        let line = page.line("l").unwrap();
        // detected ink rectangle plus its margin
        assert!(
            line.coords
                .iter()
                .all(|&(x, y)| (29..=165).contains(&x) && (19..=40).contains(&y))
        );
        assert!(line.baseline.is_some());
    }

    #[test]
    fn test_non_text_is_masked() {
        let (page, binary) = word_page();
        let mut page = page.with_non_text(NonTextRegion::new(
            "img",
            NonTextKind::Image,
            rect(0, 0, 199, 99),
        ));
        let report = Resegmenter::new(options())
            .unwrap()
            .with_detector(ProjectionLineDetector::new())
            .process_page(&mut page, &binary, 300.0);
        // nothing left to detect: no candidate matches
        assert!(matches!(report.decision("l"), Some(LineDecision::Rejected(_))));
    }

    #[test]
    fn test_region_level() {
        let (mut page, binary) = word_page();
        let options = options().with_level(Level::Region);
        let report = Resegmenter::new(options)
            .unwrap()
            .process_page(&mut page, &binary, 300.0);
        assert_eq!(report.scopes.len(), 1);
        assert_eq!(report.modified_count(), 1);
    }
}
