//! Joining polygon fragments into one outline
//!
//! Fragments are connected along a minimum spanning tree of their pairwise
//! distances. Each tree edge becomes a thin bridge between the nearest
//! points of the two fragments, and the union of fragments and bridges is
//! the joined outline.

use crate::error::{GeomError, GeomResult};
use crate::polygon::{
    AREA_EPSILON, cross, exterior_coords, intersection_area, repair_polygon, round_polygon,
    segments_intersect, significant_parts,
};
use geo::{Area, BooleanOps, ConvexHull, Coord, LineString, MultiPoint, MultiPolygon, Point, Polygon};

/// Distance assigned to touching fragments so that they are joined first
const TOUCH_DISTANCE: f64 = 1e-5;

/// Closest point to `p` on segment `ab`
fn closest_on_segment(p: Coord<f64>, a: Coord<f64>, b: Coord<f64>) -> Coord<f64> {
    let d = b - a;
    let len2 = d.x * d.x + d.y * d.y;
    if len2 == 0.0 {
        return a;
    }
    let t = (((p.x - a.x) * d.x + (p.y - a.y) * d.y) / len2).clamp(0.0, 1.0);
    Coord {
        x: a.x + t * d.x,
        y: a.y + t * d.y,
    }
}

fn distance(a: Coord<f64>, b: Coord<f64>) -> f64 {
    (b.x - a.x).hypot(b.y - a.y)
}

/// Nearest points between segments `ab` and `cd`
fn segment_nearest(
    a: Coord<f64>,
    b: Coord<f64>,
    c: Coord<f64>,
    d: Coord<f64>,
) -> (f64, Coord<f64>, Coord<f64>) {
    if segments_intersect(a, b, c, d) {
        let denom = cross(Coord { x: 0.0, y: 0.0 }, b - a, d - c);
        if denom.abs() > 1e-12 {
            let t = cross(Coord { x: 0.0, y: 0.0 }, c - a, d - c) / denom;
            let p = Coord {
                x: a.x + t * (b.x - a.x),
                y: a.y + t * (b.y - a.y),
            };
            return (0.0, p, p);
        }
    }
    let candidates = [
        (a, closest_on_segment(a, c, d)),
        (b, closest_on_segment(b, c, d)),
        (closest_on_segment(c, a, b), c),
        (closest_on_segment(d, a, b), d),
    ];
    candidates
        .into_iter()
        .map(|(p, q)| (distance(p, q), p, q))
        .fold((f64::INFINITY, a, c), |best, cand| {
            if cand.0 < best.0 { cand } else { best }
        })
}

/// Nearest points between the boundaries of two rings
fn ring_nearest(r1: &[Coord<f64>], r2: &[Coord<f64>]) -> (f64, Coord<f64>, Coord<f64>) {
    let mut best = (f64::INFINITY, r1[0], r2[0]);
    for i in 0..r1.len() {
        let (a, b) = (r1[i], r1[(i + 1) % r1.len()]);
        for j in 0..r2.len() {
            let (c, d) = (r2[j], r2[(j + 1) % r2.len()]);
            let cand = segment_nearest(a, b, c, d);
            if cand.0 < best.0 {
                best = cand;
            }
        }
    }
    best
}

/// Edges of a minimum spanning tree over a dense distance matrix (Prim)
fn minimum_spanning_tree(dist: &[Vec<f64>]) -> Vec<(usize, usize)> {
    let n = dist.len();
    let mut in_tree = vec![false; n];
    let mut best = vec![f64::INFINITY; n];
    let mut parent = vec![usize::MAX; n];
    let mut edges = Vec::with_capacity(n.saturating_sub(1));
    if n == 0 {
        return edges;
    }
    best[0] = 0.0;
    for _ in 0..n {
        let mut u = usize::MAX;
        for v in 0..n {
            if !in_tree[v] && (u == usize::MAX || best[v] < best[u]) {
                u = v;
            }
        }
        in_tree[u] = true;
        if parent[u] != usize::MAX {
            edges.push((parent[u], u));
        }
        for v in 0..n {
            if !in_tree[v] && dist[u][v] < best[v] {
                best[v] = dist[u][v];
                parent[v] = u;
            }
        }
    }
    edges
}

/// Rectangle of half-width `half` around segment `pq`, extended past both ends
fn bridge(p: Coord<f64>, q: Coord<f64>, half: f64) -> Polygon<f64> {
    let len = distance(p, q);
    let ring = if len < 1e-9 {
        vec![
            Coord { x: p.x - half, y: p.y - half },
            Coord { x: p.x + half, y: p.y - half },
            Coord { x: p.x + half, y: p.y + half },
            Coord { x: p.x - half, y: p.y + half },
        ]
    } else {
        let d = Coord {
            x: (q.x - p.x) / len * half,
            y: (q.y - p.y) / len * half,
        };
        let n = Coord { x: -d.y, y: d.x };
        vec![p - d + n, q + d + n, q + d - n, p - d - n]
    };
    Polygon::new(LineString::new(ring), vec![])
}

/// Join polygon fragments into a single polygon
///
/// Fragments are connected along the minimum spanning tree of their
/// boundary distances by bridges of half-width `max(1, scale / 5)`, and the
/// union is rounded to integer coordinates. Should the union still fall
/// apart, the convex hull of all fragments is used.
///
/// # Errors
///
/// Returns `GeomError::Empty` if no fragment has any area.
pub fn join_polygons(polygons: &[Polygon<f64>], scale: f64) -> GeomResult<Polygon<f64>> {
    let parts: Vec<Polygon<f64>> = polygons
        .iter()
        .filter(|p| p.unsigned_area() > AREA_EPSILON)
        .map(|p| Polygon::new(p.exterior().clone(), vec![]))
        .collect();
    match parts.as_slice() {
        [] => return Err(GeomError::Empty),
        [single] => return round_polygon(single),
        _ => {}
    }

    let rings: Vec<Vec<Coord<f64>>> = parts.iter().map(exterior_coords).collect();
    let n = parts.len();
    let mut dist = vec![vec![0.0; n]; n];
    let mut nearest = vec![vec![(Coord { x: 0.0, y: 0.0 }, Coord { x: 0.0, y: 0.0 }); n]; n];
    for i in 0..n {
        for j in i + 1..n {
            let (d, p, q) = ring_nearest(&rings[i], &rings[j]);
            dist[i][j] = d.max(TOUCH_DISTANCE);
            dist[j][i] = dist[i][j];
            nearest[i][j] = (p, q);
            nearest[j][i] = (q, p);
        }
    }

    let half = (scale / 5.0).max(1.0);
    let mut pieces = parts.clone();
    for (i, j) in minimum_spanning_tree(&dist) {
        if intersection_area(&parts[i], &parts[j]) > AREA_EPSILON {
            continue;
        }
        let (p, q) = nearest[i][j];
        pieces.push(bridge(p, q, half));
    }

    let mut merged = MultiPolygon::new(vec![pieces[0].clone()]);
    for piece in &pieces[1..] {
        merged = merged.union(&MultiPolygon::new(vec![piece.clone()]));
    }
    let joined = significant_parts(merged);
    let outline = match joined.as_slice() {
        [single] => exterior_coords(single),
        _ => {
            let points: Vec<Point<f64>> = rings.iter().flatten().map(|&c| Point::from(c)).collect();
            exterior_coords(&MultiPoint::new(points).convex_hull())
        }
    };
    let rounded: Vec<Coord<f64>> = outline
        .into_iter()
        .map(|c| Coord {
            x: c.x.round(),
            y: c.y.round(),
        })
        .collect();
    repair_polygon(&rounded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::polygon::rect_polygon;

    #[test]
    fn test_join_disjoint_squares() {
        let a = rect_polygon(0.0, 0.0, 10.0, 10.0);
        let b = rect_polygon(20.0, 0.0, 30.0, 10.0);
        let joined = join_polygons(&[a.clone(), b.clone()], 20.0).unwrap();
        // both squares plus a bridge over the 10px gap
        assert!(joined.unsigned_area() > 240.0);
        assert!((intersection_area(&joined, &a) - 100.0).abs() < 1e-6);
        assert!((intersection_area(&joined, &b) - 100.0).abs() < 1e-6);
        assert_eq!(joined.interiors().len(), 0);
    }

    #[test]
    fn test_join_single_and_empty() {
        let a = rect_polygon(0.0, 0.0, 10.0, 10.0);
        let joined = join_polygons(std::slice::from_ref(&a), 20.0).unwrap();
        assert!((joined.unsigned_area() - 100.0).abs() < 1e-9);
        assert!(matches!(join_polygons(&[], 20.0), Err(GeomError::Empty)));
    }

    #[test]
    fn test_join_overlapping() {
        let a = rect_polygon(0.0, 0.0, 10.0, 10.0);
        let b = rect_polygon(5.0, 5.0, 15.0, 15.0);
        let joined = join_polygons(&[a, b], 20.0).unwrap();
        assert!((joined.unsigned_area() - 175.0).abs() < 1e-6);
    }

    #[test]
    fn test_minimum_spanning_tree() {
        let dist = vec![
            vec![0.0, 1.0, 5.0],
            vec![1.0, 0.0, 2.0],
            vec![5.0, 2.0, 0.0],
        ];
        assert_eq!(minimum_spanning_tree(&dist), vec![(0, 1), (1, 2)]);
    }

    #[test]
    fn test_segment_nearest() {
        let (d, p, q) = segment_nearest(
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 10.0, y: 0.0 },
            Coord { x: 5.0, y: 3.0 },
            Coord { x: 5.0, y: 8.0 },
        );
        assert!((d - 3.0).abs() < 1e-12);
        assert_eq!(p, Coord { x: 5.0, y: 0.0 });
        assert_eq!(q, Coord { x: 5.0, y: 3.0 });
    }
}
