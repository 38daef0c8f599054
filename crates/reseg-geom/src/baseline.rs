//! Baseline polylines
//!
//! A baseline runs along the foot of a text line. Its band extends to the
//! left of the direction of travel for left-to-right baselines and to the
//! right for right-to-left ones. For horizontal text both end up above the
//! baseline (towards smaller y), where the glyph bodies sit.

use crate::error::{GeomError, GeomResult};
use crate::hull::join_polygons;
use crate::polygon::{exterior_coords, repair_polygon, significant_parts};
use geo::{BooleanOps, Coord, LineString, MultiLineString, MultiPolygon, Polygon};

/// Drop consecutive duplicate points of a polyline
fn dedupe_line(coords: &[Coord<f64>]) -> Vec<Coord<f64>> {
    let mut out: Vec<Coord<f64>> = Vec::with_capacity(coords.len());
    for &c in coords {
        if out.last() != Some(&c) {
            out.push(c);
        }
    }
    out
}

/// Whether the polyline runs left to right (first point left of the last)
pub fn is_left_to_right(baseline: &LineString<f64>) -> bool {
    match (baseline.0.first(), baseline.0.last()) {
        (Some(first), Some(last)) => first.x < last.x,
        _ => true,
    }
}

fn quad(points: [Coord<f64>; 4]) -> Polygon<f64> {
    Polygon::new(LineString::new(points.to_vec()), vec![])
}

/// Band of the given width on the glyph side of a baseline
///
/// Each segment is extruded along its normal, and the gaps at convex
/// bends are closed with wedges. A horizontal baseline gets its band above
/// it (towards smaller y) whichever way it runs.
///
/// # Errors
///
/// Returns `GeomError::InvalidParameters` for a non-positive width and
/// `GeomError::Degenerate` if the baseline has fewer than 2 distinct points.
pub fn buffer_baseline(baseline: &LineString<f64>, width: f64) -> GeomResult<Polygon<f64>> {
    if !(width > 0.0 && width.is_finite()) {
        return Err(GeomError::InvalidParameters(format!(
            "band width must be positive: {}",
            width
        )));
    }
    let coords = dedupe_line(&baseline.0);
    if coords.len() < 2 {
        return Err(GeomError::Degenerate(format!(
            "baseline with {} distinct points",
            coords.len()
        )));
    }
    // flipped side and reversed travel cancel out: horizontal bands stay above
    let side = if is_left_to_right(baseline) { 1.0 } else { -1.0 };
    let normal = |a: Coord<f64>, b: Coord<f64>| {
        let (dx, dy) = (b.x - a.x, b.y - a.y);
        let len = dx.hypot(dy);
        Coord {
            x: side * dy / len * width,
            y: -side * dx / len * width,
        }
    };

    let normals: Vec<Coord<f64>> = coords.windows(2).map(|s| normal(s[0], s[1])).collect();
    let mut pieces: Vec<Polygon<f64>> = Vec::with_capacity(normals.len() * 2);
    for (s, n) in coords.windows(2).zip(&normals) {
        let (a, b) = (s[0], s[1]);
        pieces.push(quad([a, b, b + *n, a + *n]));
    }
    for (i, pair) in normals.windows(2).enumerate() {
        let p = coords[i + 1];
        let wedge = [p, p + pair[0], p + pair[1]];
        if repair_polygon(&wedge).is_ok() {
            pieces.push(Polygon::new(LineString::new(wedge.to_vec()), vec![]));
        }
    }

    let mut merged = MultiPolygon::new(vec![pieces[0].clone()]);
    for piece in &pieces[1..] {
        merged = merged.union(&MultiPolygon::new(vec![piece.clone()]));
    }
    let parts = significant_parts(merged);
    match parts.as_slice() {
        [] => Err(GeomError::Degenerate("empty baseline band".to_string())),
        [single] => repair_polygon(&exterior_coords(single)),
        _ => join_polygons(&parts, width),
    }
}

/// Part of a baseline inside a polygon, as one polyline
///
/// Returns `None` if less than one segment remains.
pub fn clip_baseline(polygon: &Polygon<f64>, baseline: &LineString<f64>) -> Option<LineString<f64>> {
    let inside = polygon.clip(&MultiLineString::new(vec![baseline.clone()]), false);
    join_baselines(&inside.0)
}

/// Concatenate baseline pieces into one polyline
///
/// Pieces are oriented along the dominant reading direction and chained
/// in order of their start points. Returns `None` if nothing with at least
/// two distinct points remains.
pub fn join_baselines(lines: &[LineString<f64>]) -> Option<LineString<f64>> {
    let mut pieces: Vec<Vec<Coord<f64>>> = lines
        .iter()
        .map(|l| dedupe_line(&l.0))
        .filter(|c| c.len() >= 2)
        .collect();
    if pieces.is_empty() {
        return None;
    }
    let run: f64 = pieces
        .iter()
        .map(|c| c[c.len() - 1].x - c[0].x)
        .sum();
    let ltr = run >= 0.0;
    for piece in &mut pieces {
        let forward = piece[piece.len() - 1].x >= piece[0].x;
        if forward != ltr {
            piece.reverse();
        }
    }
    pieces.sort_by(|a, b| {
        if ltr {
            a[0].x.total_cmp(&b[0].x)
        } else {
            b[0].x.total_cmp(&a[0].x)
        }
    });
    let joined = dedupe_line(&pieces.concat());
    (joined.len() >= 2).then(|| LineString::new(joined))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::polygon::{bounds, rect_polygon};
    use geo::Area;

    fn line(points: &[(f64, f64)]) -> LineString<f64> {
        LineString::new(points.iter().map(|&(x, y)| Coord { x, y }).collect())
    }

    #[test]
    fn test_band_above_left_to_right() {
        let band = buffer_baseline(&line(&[(0.0, 50.0), (100.0, 50.0)]), 20.0).unwrap();
        let (x0, y0, x1, y1) = bounds(&band);
        assert_eq!((x0, y0, x1, y1), (0.0, 30.0, 100.0, 50.0));
        assert!((band.unsigned_area() - 2000.0).abs() < 1e-6);
    }

    #[test]
    fn test_band_above_right_to_left() {
        let band = buffer_baseline(&line(&[(100.0, 50.0), (0.0, 50.0)]), 20.0).unwrap();
        let (x0, y0, x1, y1) = bounds(&band);
        assert_eq!((x0, y0, x1, y1), (0.0, 30.0, 100.0, 50.0));
    }

    #[test]
    fn test_band_with_bend() {
        let band =
            buffer_baseline(&line(&[(0.0, 50.0), (50.0, 50.0), (100.0, 40.0)]), 10.0).unwrap();
        assert!(band.unsigned_area() > 900.0);
        assert_eq!(band.interiors().len(), 0);
    }

    #[test]
    fn test_band_errors() {
        assert!(matches!(
            buffer_baseline(&line(&[(1.0, 1.0), (1.0, 1.0)]), 5.0),
            Err(GeomError::Degenerate(_))
        ));
        assert!(matches!(
            buffer_baseline(&line(&[(0.0, 0.0), (9.0, 0.0)]), 0.0),
            Err(GeomError::InvalidParameters(_))
        ));
    }

    #[test]
    fn test_clip_baseline() {
        let region = rect_polygon(10.0, 0.0, 60.0, 100.0);
        let clipped = clip_baseline(&region, &line(&[(0.0, 50.0), (100.0, 50.0)])).unwrap();
        let xs: Vec<f64> = clipped.0.iter().map(|c| c.x).collect();
        assert_eq!(xs.first(), Some(&10.0));
        assert_eq!(xs.last(), Some(&60.0));

        let outside = rect_polygon(200.0, 0.0, 300.0, 100.0);
        assert!(clip_baseline(&outside, &line(&[(0.0, 50.0), (100.0, 50.0)])).is_none());
    }

    #[test]
    fn test_join_baselines_orders_pieces() {
        let joined = join_baselines(&[
            line(&[(50.0, 10.0), (80.0, 10.0)]),
            line(&[(30.0, 10.0), (0.0, 10.0)]),
        ])
        .unwrap();
        let xs: Vec<f64> = joined.0.iter().map(|c| c.x).collect();
        assert_eq!(xs, vec![0.0, 30.0, 50.0, 80.0]);
        assert!(join_baselines(&[line(&[(1.0, 1.0)])]).is_none());
    }
}
