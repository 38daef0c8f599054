//! Polygon validity, overlap and subtraction
//!
//! Polygons are `geo::Polygon<f64>` in pixel coordinates (x right, y down),
//! with pixel centres at integer positions. Only exterior rings carry
//! meaning here: text lines and regions have no holes, so operations that
//! would produce holes keep the exterior.

use crate::error::{GeomError, GeomResult};
use crate::hull::join_polygons;
use geo::{Area, BooleanOps, ConvexHull, Coord, LineString, MultiPolygon, Polygon};

/// Parts below this area are numerical noise
pub(crate) const AREA_EPSILON: f64 = 1e-6;

/// Tolerance on the sine of the turning angle for collinear vertices
const COLLINEAR_EPSILON: f64 = 1e-9;

/// Tolerance on cross products in intersection tests
const CROSS_EPSILON: f64 = 1e-9;

/// Roughness scale used when an intersection falls apart into pieces
pub const DEFAULT_JOIN_SCALE: f64 = 20.0;

/// Exterior ring without the closing coordinate
pub fn exterior_coords(polygon: &Polygon<f64>) -> Vec<Coord<f64>> {
    let mut coords = polygon.exterior().0.clone();
    if coords.len() > 1 && coords.first() == coords.last() {
        coords.pop();
    }
    coords
}

/// Convert integer page points to coordinates
pub fn coords_from_points(points: &[(i32, i32)]) -> Vec<Coord<f64>> {
    points
        .iter()
        .map(|&(x, y)| Coord {
            x: x as f64,
            y: y as f64,
        })
        .collect()
}

/// Round coordinates to integer points
pub fn points_from_coords(coords: &[Coord<f64>]) -> Vec<(i32, i32)> {
    coords
        .iter()
        .map(|c| (c.x.round() as i32, c.y.round() as i32))
        .collect()
}

/// Rounded exterior ring of a polygon as open integer points
pub fn points_from_polygon(polygon: &Polygon<f64>) -> Vec<(i32, i32)> {
    points_from_coords(&exterior_coords(polygon))
}

/// Axis-aligned rectangle through the given corner pixel centres
pub fn rect_polygon(x0: f64, y0: f64, x1: f64, y1: f64) -> Polygon<f64> {
    Polygon::new(
        LineString::new(vec![
            Coord { x: x0, y: y0 },
            Coord { x: x1, y: y0 },
            Coord { x: x1, y: y1 },
            Coord { x: x0, y: y1 },
        ]),
        vec![],
    )
}

/// Shift a polygon's exterior by `(dx, dy)`
pub fn translate_polygon(polygon: &Polygon<f64>, dx: f64, dy: f64) -> Polygon<f64> {
    let coords = exterior_coords(polygon)
        .into_iter()
        .map(|c| Coord {
            x: c.x + dx,
            y: c.y + dy,
        })
        .collect::<Vec<_>>();
    Polygon::new(LineString::new(coords), vec![])
}

/// Twice the signed shoelace area (negative for clockwise rings, y up)
pub(crate) fn signed_area2(ring: &[Coord<f64>]) -> f64 {
    let n = ring.len();
    (0..n)
        .map(|i| {
            let a = ring[i];
            let b = ring[(i + 1) % n];
            a.x * b.y - b.x * a.y
        })
        .sum()
}

/// Unsigned area of an open ring
pub fn ring_area(ring: &[Coord<f64>]) -> f64 {
    signed_area2(ring).abs() / 2.0
}

/// Cross product of `a - o` and `b - o`
#[inline]
pub(crate) fn cross(o: Coord<f64>, a: Coord<f64>, b: Coord<f64>) -> f64 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

#[inline]
fn on_segment(p: Coord<f64>, a: Coord<f64>, b: Coord<f64>) -> bool {
    p.x >= a.x.min(b.x) - CROSS_EPSILON
        && p.x <= a.x.max(b.x) + CROSS_EPSILON
        && p.y >= a.y.min(b.y) - CROSS_EPSILON
        && p.y <= a.y.max(b.y) + CROSS_EPSILON
}

/// Whether segments `ab` and `cd` share at least one point
pub(crate) fn segments_intersect(
    a: Coord<f64>,
    b: Coord<f64>,
    c: Coord<f64>,
    d: Coord<f64>,
) -> bool {
    let d1 = cross(c, d, a);
    let d2 = cross(c, d, b);
    let d3 = cross(a, b, c);
    let d4 = cross(a, b, d);
    if ((d1 > CROSS_EPSILON && d2 < -CROSS_EPSILON) || (d1 < -CROSS_EPSILON && d2 > CROSS_EPSILON))
        && ((d3 > CROSS_EPSILON && d4 < -CROSS_EPSILON)
            || (d3 < -CROSS_EPSILON && d4 > CROSS_EPSILON))
    {
        return true;
    }
    (d1.abs() <= CROSS_EPSILON && on_segment(a, c, d))
        || (d2.abs() <= CROSS_EPSILON && on_segment(b, c, d))
        || (d3.abs() <= CROSS_EPSILON && on_segment(c, a, b))
        || (d4.abs() <= CROSS_EPSILON && on_segment(d, a, b))
}

/// Whether the path `a -> b -> c` turns straight back onto itself
fn folds_back(a: Coord<f64>, b: Coord<f64>, c: Coord<f64>) -> bool {
    let dot = (b.x - a.x) * (c.x - b.x) + (b.y - a.y) * (c.y - b.y);
    cross(a, b, c).abs() <= CROSS_EPSILON && dot < 0.0
}

/// Whether an open ring is a simple polygon boundary
///
/// Requires at least 3 vertices, non-zero area, no repeated vertex, and no
/// two edges touching except consecutive edges at their shared vertex.
pub fn is_simple(ring: &[Coord<f64>]) -> bool {
    let n = ring.len();
    if n < 3 || ring_area(ring) <= AREA_EPSILON {
        return false;
    }
    for i in 0..n {
        let (a, b) = (ring[i], ring[(i + 1) % n]);
        if a == b {
            return false;
        }
        for j in i + 1..n {
            let (c, d) = (ring[j], ring[(j + 1) % n]);
            if j == i + 1 {
                if folds_back(a, b, d) {
                    return false;
                }
            } else if i == 0 && j == n - 1 {
                if folds_back(c, a, b) {
                    return false;
                }
            } else if segments_intersect(a, b, c, d) {
                return false;
            }
        }
    }
    true
}

/// Drop consecutive duplicates, including a closing coordinate
fn dedupe_ring(points: &[Coord<f64>]) -> Vec<Coord<f64>> {
    let mut ring: Vec<Coord<f64>> = Vec::with_capacity(points.len());
    for &p in points {
        if ring.last() != Some(&p) {
            ring.push(p);
        }
    }
    while ring.len() > 1 && ring.first() == ring.last() {
        ring.pop();
    }
    ring
}

/// Drop vertices on a straight run and tips of zero-width spikes
fn drop_collinear(mut ring: Vec<Coord<f64>>) -> Vec<Coord<f64>> {
    let mut start = 0;
    'scan: loop {
        let n = ring.len();
        if n < 3 {
            return ring;
        }
        for k in 0..n {
            let i = (start + k) % n;
            let a = ring[(i + n - 1) % n];
            let b = ring[i];
            let c = ring[(i + 1) % n];
            let l1 = (b.x - a.x).hypot(b.y - a.y);
            let l2 = (c.x - b.x).hypot(c.y - b.y);
            if l1 == 0.0 || l2 == 0.0 || cross(a, b, c).abs() <= COLLINEAR_EPSILON * l1 * l2 {
                ring.remove(i);
                start = i.saturating_sub(1);
                continue 'scan;
            }
        }
        return ring;
    }
}

/// Turn a ring of points into a valid simple polygon
///
/// Repeated vertices, vertices on straight runs and zero-width spikes are
/// dropped. If the ring still intersects itself, its convex hull is used.
///
/// # Errors
///
/// Returns `GeomError::Degenerate` if fewer than 3 distinct vertices or
/// zero area remain.
pub fn repair_polygon(points: &[Coord<f64>]) -> GeomResult<Polygon<f64>> {
    let mut ring = drop_collinear(dedupe_ring(points));
    if ring.len() < 3 {
        return Err(GeomError::Degenerate(format!(
            "{} distinct vertices",
            ring.len()
        )));
    }
    if !is_simple(&ring) {
        let hull = Polygon::new(LineString::new(ring), vec![]).convex_hull();
        ring = drop_collinear(dedupe_ring(&hull.exterior().0));
    }
    if ring.len() < 3 || ring_area(&ring) <= AREA_EPSILON {
        return Err(GeomError::Degenerate("zero area".to_string()));
    }
    Ok(Polygon::new(LineString::new(ring), vec![]))
}

/// Round a polygon to integer coordinates and repair the result
///
/// # Errors
///
/// Returns `GeomError::Degenerate` if nothing valid survives rounding.
pub fn round_polygon(polygon: &Polygon<f64>) -> GeomResult<Polygon<f64>> {
    let rounded: Vec<Coord<f64>> = exterior_coords(polygon)
        .into_iter()
        .map(|c| Coord {
            x: c.x.round(),
            y: c.y.round(),
        })
        .collect();
    repair_polygon(&rounded)
}

/// Bounding rectangle `(min_x, min_y, max_x, max_y)` of a polygon
pub(crate) fn bounds(polygon: &Polygon<f64>) -> (f64, f64, f64, f64) {
    polygon.exterior().0.iter().fold(
        (
            f64::INFINITY,
            f64::INFINITY,
            f64::NEG_INFINITY,
            f64::NEG_INFINITY,
        ),
        |(x0, y0, x1, y1), c| (x0.min(c.x), y0.min(c.y), x1.max(c.x), y1.max(c.y)),
    )
}

fn bounds_overlap(a: &Polygon<f64>, b: &Polygon<f64>) -> bool {
    let (ax0, ay0, ax1, ay1) = bounds(a);
    let (bx0, by0, bx1, by1) = bounds(b);
    ax0 < bx1 && bx0 < ax1 && ay0 < by1 && by0 < ay1
}

/// Parts with a meaningful area, exteriors only
pub(crate) fn significant_parts(parts: MultiPolygon<f64>) -> Vec<Polygon<f64>> {
    parts
        .0
        .into_iter()
        .filter(|p| p.unsigned_area() > AREA_EPSILON)
        .map(|p| Polygon::new(p.exterior().clone(), vec![]))
        .collect()
}

/// Intersection of two polygons as a single polygon
///
/// Returns `None` when the overlap has no area (disjoint polygons, or
/// polygons touching only along their boundaries). An intersection that
/// falls apart into several pieces is joined into one concave hull.
pub fn intersect_polygons(a: &Polygon<f64>, b: &Polygon<f64>) -> Option<Polygon<f64>> {
    if !bounds_overlap(a, b) {
        return None;
    }
    let parts = significant_parts(a.intersection(b));
    match parts.as_slice() {
        [] => None,
        [single] => repair_polygon(&exterior_coords(single)).ok(),
        _ => join_polygons(&parts, DEFAULT_JOIN_SCALE).ok(),
    }
}

/// Exact area of the (possibly multi-part) intersection of two polygons
pub fn intersection_area(a: &Polygon<f64>, b: &Polygon<f64>) -> f64 {
    if !bounds_overlap(a, b) {
        return 0.0;
    }
    a.intersection(b).unsigned_area()
}

/// Part of `a` not covered by `b`
///
/// When the difference falls apart into several pieces, the largest piece
/// is kept so the subtracted area is never covered again. Holes are
/// dropped. Returns `None` when nothing with area remains.
pub fn difference_polygon(a: &Polygon<f64>, b: &Polygon<f64>) -> Option<Polygon<f64>> {
    if !bounds_overlap(a, b) {
        return repair_polygon(&exterior_coords(a)).ok();
    }
    let parts = significant_parts(a.difference(b));
    let largest = parts
        .into_iter()
        .max_by(|p, q| p.unsigned_area().total_cmp(&q.unsigned_area()))?;
    repair_polygon(&exterior_coords(&largest)).ok()
}

/// Clip a line polygon to its parent region
///
/// A polygon lying within the parent is returned unchanged; otherwise the
/// intersection with the parent. Returns `None` if nothing remains.
pub fn polygon_for_parent(polygon: &Polygon<f64>, parent: &Polygon<f64>) -> Option<Polygon<f64>> {
    let area = polygon.unsigned_area();
    if area <= AREA_EPSILON {
        return None;
    }
    let inside = intersection_area(polygon, parent);
    if area - inside <= AREA_EPSILON.max(area * 1e-9) {
        return Some(polygon.clone());
    }
    intersect_polygons(polygon, parent)
}
