//! Polygon rasterization
//!
//! A pixel `(x, y)` belongs to a polygon when its centre, at integer
//! coordinates, lies inside or on the boundary. Boundary pixels are always
//! included, so a polygon traced through pixel centres covers exactly the
//! pixels it was traced from.

use crate::error::GeomResult;
use crate::polygon::{bounds, exterior_coords};
use geo::{Coord, Polygon};
use reseg_core::{LabelMap, Mask};

const EPS: f64 = 1e-9;

/// Call `f(x, y)` for every raster pixel covered by `polygon`
fn for_each_pixel(polygon: &Polygon<f64>, width: u32, height: u32, mut f: impl FnMut(u32, u32)) {
    let ring: Vec<Coord<f64>> = exterior_coords(polygon);
    let n = ring.len();
    if n == 0 || width == 0 || height == 0 {
        return;
    }
    let (min_x, min_y, max_x, max_y) = bounds(polygon);
    if max_x < -EPS || max_y < -EPS {
        return;
    }
    let y_start = (min_y - EPS).ceil().max(0.0) as i64;
    let y_end = ((max_y + EPS).floor() as i64).min(height as i64 - 1);
    if min_x > width as f64 - 1.0 + EPS || y_start > y_end {
        return;
    }

    let mut crossings: Vec<f64> = Vec::new();
    let mut spans: Vec<(f64, f64)> = Vec::new();
    for y in y_start..=y_end {
        let yf = y as f64;
        crossings.clear();
        spans.clear();

        for i in 0..n {
            let a = ring[i];
            let b = ring[(i + 1) % n];
            if (a.y - b.y).abs() < EPS {
                // horizontal edge lying on this row
                if (a.y - yf).abs() < EPS {
                    spans.push((a.x.min(b.x), a.x.max(b.x)));
                }
                continue;
            }
            let (lo, hi) = if a.y < b.y { (a, b) } else { (b, a) };
            if yf < lo.y - EPS || yf > hi.y + EPS {
                continue;
            }
            let x = lo.x + (yf - lo.y) * (hi.x - lo.x) / (hi.y - lo.y);
            // the edge point itself is on the boundary
            spans.push((x, x));
            // half-open rule so shared vertices count once
            if yf >= lo.y && yf < hi.y {
                crossings.push(x);
            }
        }

        crossings.sort_by(|a, b| a.total_cmp(b));
        spans.extend(
            crossings
                .chunks_exact(2)
                .map(|pair| (pair[0], pair[1])),
        );

        for &(x0, x1) in &spans {
            let xa = (x0 - EPS).ceil().max(0.0) as i64;
            let xb = ((x1 + EPS).floor() as i64).min(width as i64 - 1);
            for x in xa..=xb {
                f(x as u32, y as u32);
            }
        }
    }
}

/// Rasterize a polygon into a new mask of the given size
///
/// Parts of the polygon outside the raster are clipped.
///
/// # Errors
///
/// Returns an error if the dimensions are invalid.
///
/// # Examples
///
/// ```
/// use reseg_geom::{rasterize, rect_polygon};
///
/// let square = rect_polygon(2.0, 2.0, 5.0, 5.0);
/// let mask = rasterize(&square, 10, 10).unwrap();
/// assert_eq!(mask.count(), 16);
/// ```
pub fn rasterize(polygon: &Polygon<f64>, width: u32, height: u32) -> GeomResult<Mask> {
    let mut mask = Mask::new(width, height)?;
    let w = width as usize;
    let data = mask.data_mut();
    for_each_pixel(polygon, width, height, |x, y| {
        data[y as usize * w + x as usize] = true;
    });
    Ok(mask)
}

/// Paint `label` into every pixel of `labels` covered by `polygon`
///
/// Earlier labels are overwritten.
pub fn paint_polygon(labels: &mut LabelMap, polygon: &Polygon<f64>, label: u32) {
    let (width, height) = labels.dimensions();
    let w = width as usize;
    let data = labels.data_mut();
    for_each_pixel(polygon, width, height, |x, y| {
        data[y as usize * w + x as usize] = label;
    });
}
