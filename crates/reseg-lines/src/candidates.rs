//! Candidate segmentations
//!
//! Everything the matching and spreading paths start from: the rasterized
//! existing lines, the ignore mask, the glyph components and their scale,
//! seed labels for spreading, and polygons for the lines a detector found.

use crate::detector::DetectorOutput;
use crate::error::{ResegError, ResegResult};
use geo::{Area, LineString, Polygon};
use reseg_core::{LabelMap, Mask};
use reseg_geom::{
    buffer_baseline, clip_baseline, coords_from_points, join_polygons, paint_polygon, rasterize,
    repair_polygon,
};
use reseg_region::{
    ConnectivityType, component_sizes, distance_transform, label_connected_components,
    trace_outer_borders,
};
use tracing::{debug, warn};

/// Glyph scale assumed when no component has a plausible size
pub const FALLBACK_SCALE: f64 = 43.0;

/// Width of the band around a baseline that stands in for the outline, at 300 DPI
pub const BASELINE_BAND: f64 = 30.0;

/// Share of a label's area that keeps a small part alive
const MIN_PART_SHARE: f64 = 0.1;

/// Geometry of an existing line in scope coordinates
#[derive(Debug, Clone)]
pub struct LineShape {
    /// Line identifier
    pub id: String,
    /// Repaired outline, if the line has a valid one
    pub outline: Option<Polygon<f64>>,
    /// Baseline, if present
    pub baseline: Option<LineString<f64>>,
}

/// Existing lines as polygons and rasters
#[derive(Debug, Clone)]
pub struct LineLayers {
    /// Polygon used for matching, `None` if the line has no valid geometry
    pub polygons: Vec<Option<Polygon<f64>>>,
    /// Rasterized polygon per line (empty without geometry)
    pub masks: Vec<Mask>,
}

/// A line found by the detector
#[derive(Debug, Clone)]
pub struct Candidate {
    /// Label in the renumbered candidate raster
    pub label: u32,
    /// Outline of the labelled region
    pub polygon: Polygon<f64>,
    /// Detector baseline clipped to the outline
    pub baseline: Option<LineString<f64>>,
}

/// Glyph components of a scope and their typical size
#[derive(Debug, Clone)]
pub struct GlyphComponents {
    /// Components large enough to be glyphs
    pub mask: Mask,
    /// Estimated glyph scale in pixels
    pub scale: f64,
}

/// Rasterize the existing lines
///
/// With `baseline_only`, lines with a baseline are represented by a band of
/// width `30 / zoom` on the glyph side of the baseline instead of their
/// outline.
pub fn line_layers(
    shapes: &[LineShape],
    width: u32,
    height: u32,
    baseline_only: bool,
    zoom: f64,
) -> ResegResult<LineLayers> {
    let mut polygons = Vec::with_capacity(shapes.len());
    let mut masks = Vec::with_capacity(shapes.len());
    for shape in shapes {
        let band = match (&shape.baseline, baseline_only) {
            (Some(baseline), true) => match buffer_baseline(baseline, BASELINE_BAND / zoom) {
                Ok(band) => Some(band),
                Err(e) => {
                    warn!("line '{}': cannot use baseline: {}", shape.id, e);
                    None
                }
            },
            _ => None,
        };
        let polygon = band.or_else(|| shape.outline.clone());
        let mask = match &polygon {
            Some(p) => rasterize(p, width, height)?,
            None => Mask::new(width, height)?,
        };
        polygons.push(polygon);
        masks.push(mask);
    }
    Ok(LineLayers { polygons, masks })
}

/// Build the mask of pixels that must not be attributed to any line
///
/// Everything starts ignored; the `text` polygons are then released and
/// the `non_text` polygons masked again.
pub fn ignore_mask(
    width: u32,
    height: u32,
    text: &[Polygon<f64>],
    non_text: &[Polygon<f64>],
) -> ResegResult<Mask> {
    let mut ignore = Mask::new_with_value(width, height, true)?;
    for polygon in text {
        ignore.set_masked(&rasterize(polygon, width, height)?, false)?;
    }
    for polygon in non_text {
        ignore.set_masked(&rasterize(polygon, width, height)?, true)?;
    }
    Ok(ignore)
}

/// Find glyph components and estimate the glyph scale
///
/// The scale is the median of `sqrt(3 * size)` over 8-connected ink
/// components with `5/zoom < sqrt(3 * size) < 100/zoom`, or 43 if none
/// qualifies. Components with `sqrt(3 * size) <= 15/zoom` (punctuation,
/// specks) are left out of the returned mask.
pub fn glyph_components(binary: &Mask, ignore: &Mask, zoom: f64) -> ResegResult<GlyphComponents> {
    let ink = binary.and_not(ignore)?;
    let (labels, count) = label_connected_components(&ink, ConnectivityType::EightWay)?;
    let roots: Vec<f64> = component_sizes(&labels, count)
        .iter()
        .map(|&size| (3.0 * size as f64).sqrt())
        .collect();

    let mut plausible: Vec<f64> = roots
        .iter()
        .skip(1)
        .copied()
        .filter(|&r| 5.0 / zoom < r && r < 100.0 / zoom)
        .collect();
    plausible.sort_by(f64::total_cmp);
    let scale = match plausible.len() {
        0 => FALLBACK_SCALE,
        n if n % 2 == 1 => plausible[n / 2].floor(),
        n => ((plausible[n / 2 - 1] + plausible[n / 2]) / 2.0).floor(),
    };
    debug!("estimated scale: {}", scale);

    let table: Vec<u32> = roots
        .iter()
        .enumerate()
        .map(|(label, &r)| if label > 0 && r > 15.0 / zoom { 1 } else { 0 })
        .collect();
    let mut kept = labels;
    kept.relabel(&table);
    Ok(GlyphComponents {
        mask: kept.nonzero_mask(),
        scale,
    })
}

/// Seed labels from distance-flattened line layers
///
/// Each layer (the ignore mask first, then one per line) gets its distance
/// transform normalized to 0..=255. Every pixel takes the index of the
/// deepest layer, the first one on ties; layer 0 (ignored) yields label 0.
pub fn flattened_seeds(ignore: &Mask, layers: &[Mask]) -> ResegResult<LabelMap> {
    let (width, height) = ignore.dimensions();
    let mut seeds = LabelMap::new(width, height)?;
    let mut best = normalized_depth(ignore)?;
    for (i, layer) in layers.iter().enumerate() {
        let depth = normalized_depth(layer)?;
        for ((b, &d), s) in best.iter_mut().zip(&depth).zip(seeds.data_mut()) {
            if d > *b {
                *b = d;
                *s = i as u32 + 1;
            }
        }
    }
    Ok(seeds)
}

/// Distance transform scaled so that the deepest pixel is 255
fn normalized_depth(layer: &Mask) -> ResegResult<Vec<u8>> {
    let mut dist = distance_transform(layer)?;
    let max = dist.max_value();
    if max > 0.0 {
        dist.mul_constant(255.0 / max);
    }
    Ok(dist.data().iter().map(|&d| d.clamp(0.0, 255.0) as u8).collect())
}

/// Seed labels from bands along the baselines
///
/// Line `i` paints label `i + 1` over a band of width `band` on the glyph
/// side of its baseline, later lines over earlier ones. Lines without a
/// baseline paint their outline layer instead.
pub fn baseline_seeds(shapes: &[LineShape], layers: &LineLayers, band: f64) -> ResegResult<LabelMap> {
    let Some(first) = layers.masks.first() else {
        return Err(ResegError::InvalidParameter("no lines in scope".to_string()));
    };
    let (width, height) = first.dimensions();
    let mut seeds = LabelMap::new(width, height)?;
    for (i, (shape, layer)) in shapes.iter().zip(&layers.masks).enumerate() {
        let label = i as u32 + 1;
        let polygon = match &shape.baseline {
            Some(baseline) => buffer_baseline(baseline, band).ok(),
            None => {
                warn!("line '{}' has no baseline, seeding from its outline", shape.id);
                None
            }
        };
        match polygon {
            Some(polygon) => paint_polygon(&mut seeds, &polygon, label),
            None => {
                for (s, &on) in seeds.data_mut().iter_mut().zip(layer.data()) {
                    if on {
                        *s = label;
                    }
                }
            }
        }
    }
    Ok(seeds)
}

/// Polygon outlines of the parts of one label region
pub(crate) fn region_parts(region: &Mask) -> ResegResult<Vec<Polygon<f64>>> {
    let mut parts = Vec::new();
    for border in trace_outer_borders(region)? {
        for ring in border.split_loops() {
            let points: Vec<(i32, i32)> = ring.iter().map(|p| (p.x, p.y)).collect();
            if let Ok(polygon) = repair_polygon(&coords_from_points(&points)) {
                parts.push(polygon);
            }
        }
    }
    Ok(parts)
}

/// Turn detector labels into candidate polygons
///
/// Labels without ink are dropped. Of each label region, parts smaller
/// than `min_area` are dropped unless they hold at least a tenth of the
/// region's area, as are parts with fewer than 4 vertices; several
/// remaining parts are joined into one polygon. Surviving candidates are
/// renumbered densely, and the returned label raster uses the new numbers.
pub fn polygonize_candidates(
    output: &DetectorOutput,
    binary: &Mask,
    min_area: f64,
) -> ResegResult<(Vec<Candidate>, LabelMap)> {
    let max_label = output.labels.max_label();
    let mut table = vec![0u32; max_label as usize + 1];
    let mut candidates = Vec::new();

    for label in 1..=max_label {
        let region = output.labels.mask_of(label);
        if region.count_and(binary)? == 0 {
            debug!("dropping detected line {} without ink", label);
            continue;
        }
        let parts = region_parts(&region)?;
        let total: f64 = parts.iter().map(|p| p.unsigned_area()).sum();
        let parts: Vec<Polygon<f64>> = parts
            .into_iter()
            .filter(|p| {
                let area = p.unsigned_area();
                (area >= min_area || area >= MIN_PART_SHARE * total)
                    // closed ring: 4 vertices plus the closing point
                    && p.exterior().0.len() >= 5
            })
            .collect();
        let polygon = match parts.len() {
            0 => {
                debug!("dropping detected line {} without usable outline", label);
                continue;
            }
            1 => parts.into_iter().next(),
            _ => join_polygons(&parts, output.scale).ok(),
        };
        let Some(polygon) = polygon else {
            continue;
        };
        let baseline = output
            .baselines
            .get(label as usize - 1)
            .and_then(|b| b.as_ref())
            .and_then(|b| clip_baseline(&polygon, b));
        let new_label = candidates.len() as u32 + 1;
        table[label as usize] = new_label;
        candidates.push(Candidate {
            label: new_label,
            polygon,
            baseline,
        });
    }

    let mut labels = output.labels.clone();
    labels.relabel(&table);
    Ok((candidates, labels))
}

#[cfg(test)]
mod tests {
    use super::*;
    use reseg_geom::rect_polygon;

    fn shape(id: &str, outline: Polygon<f64>) -> LineShape {
        LineShape {
            id: id.to_string(),
            outline: Some(outline),
            baseline: None,
        }
    }

    #[test]
    fn test_ignore_mask() {
        let ignore = ignore_mask(
            20,
            10,
            &[rect_polygon(0.0, 0.0, 9.0, 9.0)],
            &[rect_polygon(5.0, 0.0, 9.0, 9.0)],
        )
        .unwrap();
        assert_eq!(ignore.get_pixel(2, 2), Some(false));
        assert_eq!(ignore.get_pixel(6, 2), Some(true));
        assert_eq!(ignore.get_pixel(15, 2), Some(true));
        assert_eq!(ignore.count(), 200 - 50);
    }

    #[test]
    fn test_line_layers_baseline_band() {
        let mut line = shape("l", rect_polygon(0.0, 0.0, 5.0, 5.0));
        line.baseline = Some(LineString::from(vec![(10.0, 40.0), (50.0, 40.0)]));
        let layers = line_layers(std::slice::from_ref(&line), 60, 60, true, 1.0).unwrap();
        // band from y = 10 to y = 40 over x 10..=50
        assert_eq!(layers.masks[0].count(), 41 * 31);
        let layers = line_layers(&[line], 60, 60, false, 1.0).unwrap();
        assert_eq!(layers.masks[0].count(), 36);
    }

    #[test]
    fn test_glyph_components() {
        // ten 10x10 glyphs and a speck
        let binary = Mask::from_fn(200, 30, |x, y| {
            ((x % 20) < 10 && (5..15).contains(&y)) || (x == 5 && y == 25)
        })
        .unwrap();
        let ignore = Mask::new(200, 30).unwrap();
        let comps = glyph_components(&binary, &ignore, 1.0).unwrap();
        assert_eq!(comps.scale, (300.0f64).sqrt().floor());
        assert_eq!(comps.mask.count(), 1000);
    }

    #[test]
    fn test_glyph_components_fallback() {
        let binary = Mask::new(50, 50).unwrap();
        let comps = glyph_components(&binary, &binary, 1.0).unwrap();
        assert_eq!(comps.scale, FALLBACK_SCALE);
        assert_eq!(comps.mask.count(), 0);
    }

    #[test]
    fn test_flattened_seeds_prefers_deeper_layer() {
        // two overlapping lines: rows 0..=9 and rows 6..=19
        let ignore = Mask::new(10, 20).unwrap();
        let a = Mask::from_fn(10, 20, |_, y| y <= 9).unwrap();
        let b = Mask::from_fn(10, 20, |_, y| y >= 6).unwrap();
        let seeds = flattened_seeds(&ignore, &[a, b]).unwrap();
        assert_eq!(seeds.get_pixel(5, 2), Some(1));
        assert_eq!(seeds.get_pixel(5, 15), Some(2));
        // shallow edge of line 1 goes to line 2's interior
        assert_eq!(seeds.get_pixel(5, 9), Some(2));
    }

    #[test]
    fn test_flattened_seeds_ignore_wins_ties() {
        let full = Mask::new_with_value(10, 10, true).unwrap();
        let seeds = flattened_seeds(&full, std::slice::from_ref(&full)).unwrap();
        assert_eq!(seeds.max_label(), 0);
    }

    #[test]
    fn test_baseline_seeds() {
        let mut with = shape("a", rect_polygon(0.0, 0.0, 59.0, 19.0));
        with.baseline = Some(LineString::from(vec![(0.0, 18.0), (59.0, 18.0)]));
        let without = shape("b", rect_polygon(0.0, 30.0, 59.0, 49.0));
        let shapes = [with, without];
        let layers = line_layers(&shapes, 60, 50, false, 1.0).unwrap();
        let seeds = baseline_seeds(&shapes, &layers, 5.0).unwrap();
        assert_eq!(seeds.get_pixel(10, 15), Some(1));
        assert_eq!(seeds.get_pixel(10, 5), Some(0));
        assert_eq!(seeds.get_pixel(10, 40), Some(2));
        assert_eq!(seeds.count(1), 60 * 6);
    }

    #[test]
    fn test_polygonize_candidates() {
        let mut labels = LabelMap::new(100, 60).unwrap();
        for y in 10..30 {
            for x in 10..90 {
                labels.set_pixel(x, y, 1).unwrap();
            }
        }
        // label 2 has no ink
        for y in 40..50 {
            for x in 10..90 {
                labels.set_pixel(x, y, 2).unwrap();
            }
        }
        // label 3 is a small box with ink
        for y in 52..56 {
            for x in 10..20 {
                labels.set_pixel(x, y, 3).unwrap();
            }
        }
        let binary = Mask::from_fn(100, 60, |x, y| {
            ((20..80).contains(&x) && (15..25).contains(&y)) || (y == 53 && x < 20)
        })
        .unwrap();
        let output = DetectorOutput {
            labels,
            baselines: vec![
                Some(LineString::from(vec![(0.0, 24.0), (99.0, 24.0)])),
                None,
                None,
            ],
            scale: 20.0,
        };
        let (candidates, relabeled) = polygonize_candidates(&output, &binary, 640.0).unwrap();
        assert_eq!(candidates.len(), 2);
        assert!((candidates[0].polygon.unsigned_area() - 79.0 * 19.0).abs() < 1e-9);
        let baseline = candidates[0].baseline.as_ref().unwrap();
        assert_eq!(baseline.0.first().unwrap().x, 10.0);
        assert_eq!(baseline.0.last().unwrap().x, 89.0);
        // small box is its label's only part, so it survives
        assert_eq!(candidates[1].label, 2);
        assert_eq!(relabeled.get_pixel(15, 53), Some(2));
        assert_eq!(relabeled.get_pixel(15, 45), Some(0));
    }
}
