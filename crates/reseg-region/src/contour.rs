//! Border tracing for connected components
//!
//! This module traces the outer border of every 8-connected component of a
//! binary mask with Moore neighbour tracing. Borders run through the centres
//! of the boundary pixels in clockwise order (image coordinates, y down) and
//! can be compressed to the pixels where the direction changes, which gives
//! the vertices of an outline polygon.

use crate::conncomp::{ConnectivityType, label_connected_components};
use crate::error::RegionResult;
use reseg_core::{Box, Mask};
use std::collections::HashMap;

/// Direction for border traversal (8-connected, clockwise from West)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// West (-1, 0)
    West = 0,
    /// Northwest (-1, -1)
    NorthWest = 1,
    /// North (0, -1)
    North = 2,
    /// Northeast (1, -1)
    NorthEast = 3,
    /// East (1, 0)
    East = 4,
    /// Southeast (1, 1)
    SouthEast = 5,
    /// South (0, 1)
    South = 6,
    /// Southwest (-1, 1)
    SouthWest = 7,
}

impl Direction {
    /// Get the x offset for this direction
    #[inline]
    pub fn dx(self) -> i32 {
        XPOSTAB[self as usize]
    }

    /// Get the y offset for this direction
    #[inline]
    pub fn dy(self) -> i32 {
        YPOSTAB[self as usize]
    }

    /// Get direction from x,y offsets
    pub fn from_offset(dx: i32, dy: i32) -> Option<Self> {
        if dx.abs() > 1 || dy.abs() > 1 || (dx == 0 && dy == 0) {
            return None;
        }
        let idx = DIRTAB[(1 + dy) as usize][(1 + dx) as usize];
        if idx < 0 {
            None
        } else {
            Some(Self::from_index(idx as usize))
        }
    }

    /// Direction `steps` eighth-turns clockwise from this one
    #[inline]
    pub fn rotated(self, steps: usize) -> Self {
        Self::from_index(self as usize + steps)
    }

    /// Create direction from index (taken modulo 8)
    #[inline]
    fn from_index(idx: usize) -> Self {
        match idx % 8 {
            0 => Direction::West,
            1 => Direction::NorthWest,
            2 => Direction::North,
            3 => Direction::NorthEast,
            4 => Direction::East,
            5 => Direction::SouthEast,
            6 => Direction::South,
            _ => Direction::SouthWest,
        }
    }
}

/// X offset for each direction
const XPOSTAB: [i32; 8] = [-1, -1, 0, 1, 1, 1, 0, -1];

/// Y offset for each direction
const YPOSTAB: [i32; 8] = [0, -1, -1, -1, 0, 1, 1, 1];

/// Direction lookup table: DIRTAB[1+dy][1+dx] gives direction index
const DIRTAB: [[i32; 3]; 3] = [[1, 2, 3], [0, -1, 4], [7, 6, 5]];

/// A point on a border
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BorderPoint {
    /// X coordinate
    pub x: i32,
    /// Y coordinate
    pub y: i32,
}

impl BorderPoint {
    /// Create a new border point
    #[inline]
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Move in the given direction
    #[inline]
    pub fn moved(self, dir: Direction) -> Self {
        Self {
            x: self.x + dir.dx(),
            y: self.y + dir.dy(),
        }
    }
}

impl From<(i32, i32)> for BorderPoint {
    fn from((x, y): (i32, i32)) -> Self {
        Self::new(x, y)
    }
}

/// The outer border of one connected component
#[derive(Debug, Clone, Default)]
pub struct Border {
    /// Component label (1-based, first-touch order)
    pub label: u32,
    /// Boundary pixels in clockwise traversal order, starting at the
    /// component's first pixel in raster order; the ring closes implicitly
    pub points: Vec<BorderPoint>,
}

impl Border {
    /// Get the number of points in this border
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the border is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Chain code of the closed ring
    pub fn to_chain_code(&self) -> Vec<Direction> {
        to_chain_code(&self.points)
    }

    /// Keep only the points where the traversal direction changes
    pub fn to_vertices(&self) -> Vec<BorderPoint> {
        compress_ring(&self.points)
    }

    /// Split the ring at revisited pixels into simple loops
    ///
    /// A border revisits a pixel where the component is one pixel thin (a
    /// spur or a bridge between two blobs). Each loop is compressed to its
    /// direction changes; loops with fewer than 3 vertices or zero area are
    /// dropped. Loops keep the clockwise orientation of the border.
    pub fn split_loops(&self) -> Vec<Vec<BorderPoint>> {
        let mut path: Vec<BorderPoint> = Vec::with_capacity(self.points.len());
        let mut position: HashMap<BorderPoint, usize> = HashMap::new();
        let mut loops = Vec::new();

        for &p in &self.points {
            if let Some(&i) = position.get(&p) {
                let tail: Vec<BorderPoint> = path.drain(i + 1..).collect();
                for q in &tail {
                    position.remove(q);
                }
                let mut cycle = Vec::with_capacity(tail.len() + 1);
                cycle.push(p);
                cycle.extend(tail);
                loops.push(cycle);
            } else {
                position.insert(p, path.len());
                path.push(p);
            }
        }
        loops.push(path);

        loops
            .into_iter()
            .map(|cycle| compress_ring(&cycle))
            .filter(|ring| ring.len() >= 3 && ring_area2(ring) != 0)
            .collect()
    }

    /// Get bounding box of this border
    pub fn bounding_box(&self) -> Option<Box> {
        let points: Vec<(i32, i32)> = self.points.iter().map(|p| (p.x, p.y)).collect();
        Box::from_points(&points)
    }
}

/// Twice the signed shoelace area of a closed ring
fn ring_area2(ring: &[BorderPoint]) -> i64 {
    let n = ring.len();
    (0..n)
        .map(|i| {
            let a = ring[i];
            let b = ring[(i + 1) % n];
            a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64
        })
        .sum()
}

/// Drop ring points lying on a straight run
fn compress_ring(points: &[BorderPoint]) -> Vec<BorderPoint> {
    let n = points.len();
    if n < 3 {
        return points.to_vec();
    }
    (0..n)
        .filter(|&i| {
            let prev = points[(i + n - 1) % n];
            let cur = points[i];
            let next = points[(i + 1) % n];
            (cur.x - prev.x, cur.y - prev.y) != (next.x - cur.x, next.y - cur.y)
        })
        .map(|i| points[i])
        .collect()
}

/// Moore neighbour tracing of the component containing `start`
///
/// `start` must be the component's first pixel in raster order, so its
/// western neighbour is background.
fn trace_component(
    is_fg: impl Fn(BorderPoint) -> bool,
    start: BorderPoint,
    max_steps: usize,
) -> Vec<BorderPoint> {
    let mut points = vec![start];
    let mut cur = start;
    // direction from `cur` to a background neighbour
    let mut back = Direction::West;
    let mut first_move: Option<Direction> = None;

    for _ in 0..max_steps {
        let found = (1..8)
            .map(|k| back.rotated(k))
            .find(|&d| is_fg(cur.moved(d)));
        let Some(dir) = found else {
            // isolated pixel
            break;
        };
        match first_move {
            None => first_move = Some(dir),
            Some(first) if cur == start && dir == first => {
                // the trace is about to repeat itself
                points.pop();
                break;
            }
            Some(_) => {}
        }
        let next = cur.moved(dir);
        // the last background pixel checked before `next`
        let bg = cur.moved(dir.rotated(7));
        let Some(new_back) = Direction::from_offset(bg.x - next.x, bg.y - next.y) else {
            break;
        };
        back = new_back;
        cur = next;
        points.push(cur);
    }

    points
}

/// Trace the outer border of every 8-connected component
///
/// Borders are returned in component label order (row-major first touch).
pub fn trace_outer_borders(mask: &Mask) -> RegionResult<Vec<Border>> {
    let (labels, count) = label_connected_components(mask, ConnectivityType::EightWay)?;
    let (width, height) = mask.dimensions();

    let mut starts: Vec<Option<BorderPoint>> = vec![None; count as usize + 1];
    let mut sizes = vec![0usize; count as usize + 1];
    for y in 0..height {
        for x in 0..width {
            let label = labels.get_pixel_unchecked(x, y) as usize;
            if label == 0 {
                continue;
            }
            sizes[label] += 1;
            if starts[label].is_none() {
                starts[label] = Some(BorderPoint::new(x as i32, y as i32));
            }
        }
    }

    let is_fg = |p: BorderPoint| {
        p.x >= 0
            && p.y >= 0
            && (p.x as u32) < width
            && (p.y as u32) < height
            && mask.get_pixel_unchecked(p.x as u32, p.y as u32)
    };

    Ok(starts
        .iter()
        .enumerate()
        .filter_map(|(label, start)| {
            start.map(|start| Border {
                label: label as u32,
                points: trace_component(is_fg, start, 8 * sizes[label] + 8),
            })
        })
        .collect())
}

/// Convert a closed ring of points to its chain code
///
/// The code has one direction per point, the last one leading back to the
/// first point. Non-adjacent consecutive points are skipped.
pub fn to_chain_code(points: &[BorderPoint]) -> Vec<Direction> {
    let n = points.len();
    if n < 2 {
        return Vec::new();
    }
    (0..n)
        .filter_map(|i| {
            let a = points[i];
            let b = points[(i + 1) % n];
            Direction::from_offset(b.x - a.x, b.y - a.y)
        })
        .collect()
}

/// Reconstruct border points from chain code
///
/// The final move of a closed chain returns to `start` and is not repeated.
pub fn from_chain_code(start: BorderPoint, chain: &[Direction]) -> Vec<BorderPoint> {
    let mut points = Vec::with_capacity(chain.len());
    let mut cur = start;
    points.push(cur);
    for &dir in chain.iter().take(chain.len().saturating_sub(1)) {
        cur = cur.moved(dir);
        points.push(cur);
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask_from_rows(rows: &[&str]) -> Mask {
        let height = rows.len() as u32;
        let width = rows[0].len() as u32;
        Mask::from_fn(width, height, |x, y| {
            rows[y as usize].as_bytes()[x as usize] == b'#'
        })
        .unwrap()
    }

    fn pts(v: &[(i32, i32)]) -> Vec<BorderPoint> {
        v.iter().map(|&p| BorderPoint::from(p)).collect()
    }

    #[test]
    fn test_direction_offsets() {
        for k in 0..8 {
            let d = Direction::West.rotated(k);
            assert_eq!(Direction::from_offset(d.dx(), d.dy()), Some(d));
        }
        assert_eq!(Direction::from_offset(0, 0), None);
        assert_eq!(Direction::East.rotated(7), Direction::NorthEast);
    }

    #[test]
    fn test_trace_block() {
        let mask = mask_from_rows(&["....", ".##.", ".##.", "...."]);
        let borders = trace_outer_borders(&mask).unwrap();
        assert_eq!(borders.len(), 1);
        assert_eq!(borders[0].points, pts(&[(1, 1), (2, 1), (2, 2), (1, 2)]));
    }

    #[test]
    fn test_trace_rectangle_vertices() {
        let mask = mask_from_rows(&["#####", "#####", "#####"]);
        let borders = trace_outer_borders(&mask).unwrap();
        assert_eq!(borders[0].len(), 12);
        assert_eq!(
            borders[0].to_vertices(),
            pts(&[(0, 0), (4, 0), (4, 2), (0, 2)])
        );
    }

    #[test]
    fn test_trace_isolated_pixel_and_domino() {
        let mask = mask_from_rows(&["#....", "...##"]);
        let borders = trace_outer_borders(&mask).unwrap();
        assert_eq!(borders.len(), 2);
        assert_eq!(borders[0].points, pts(&[(0, 0)]));
        assert_eq!(borders[1].points, pts(&[(3, 1), (4, 1)]));
        assert!(borders[1].split_loops().is_empty());
    }

    #[test]
    fn test_split_loops_at_bridge() {
        // two blocks joined by a one pixel bridge
        let mask = mask_from_rows(&["###.###", "###.###", "###.###", "...#...", "......."]);
        let borders = trace_outer_borders(&mask).unwrap();
        assert_eq!(borders.len(), 1);
        let loops = borders[0].split_loops();
        assert_eq!(loops.len(), 2);
        for ring in &loops {
            assert!(ring.len() >= 3);
        }
    }

    #[test]
    fn test_chain_code_roundtrip() {
        let mask = mask_from_rows(&[".###", "####", "##.."]);
        let borders = trace_outer_borders(&mask).unwrap();
        let chain = borders[0].to_chain_code();
        assert_eq!(chain.len(), borders[0].len());
        let rebuilt = from_chain_code(borders[0].points[0], &chain);
        assert_eq!(rebuilt, borders[0].points);
    }
}
