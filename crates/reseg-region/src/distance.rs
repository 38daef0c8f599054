//! Euclidean distance transforms
//!
//! Exact Euclidean distances are computed with the separable lower-envelope
//! algorithm of Felzenszwalb and Huttenlocher, which also yields the index of
//! the nearest site (the feature transform). The feature transform drives
//! label spreading; the plain distances drive the normalized per-line depth
//! maps used to flatten overlapping lines.

use crate::error::RegionResult;
use reseg_core::{FPix, LabelMap, Mask};

/// Marker for cells without any reachable site
pub(crate) const NO_SITE: usize = usize::MAX;

/// Squared distance and nearest site for every cell of a raster
pub(crate) struct FeatureTransform {
    /// Squared Euclidean distance to the nearest site (`f64::INFINITY` if none)
    pub sq_dist: Vec<f64>,
    /// Row-major index of the nearest site (`NO_SITE` if none)
    pub nearest: Vec<usize>,
}

/// One-dimensional squared distance transform of a sampled function
///
/// `f[q]` is 0 at sites and infinite elsewhere (or an intermediate squared
/// distance on the second pass). Writes the minimum of `(q - p)^2 + f[p]`
/// and the minimizing `p` for each `q`.
fn transform_1d(f: &[f64], dist: &mut [f64], arg: &mut [usize]) {
    let n = f.len();
    // parabola apexes and the left boundary of each one's region
    let mut apex: Vec<usize> = Vec::with_capacity(n);
    let mut bound: Vec<f64> = Vec::with_capacity(n);

    for q in 0..n {
        if !f[q].is_finite() {
            continue;
        }
        let fq = f[q] + (q * q) as f64;
        loop {
            let Some(&p) = apex.last() else {
                apex.push(q);
                bound.push(f64::NEG_INFINITY);
                break;
            };
            let fp = f[p] + (p * p) as f64;
            let s = (fq - fp) / (2.0 * (q as f64 - p as f64));
            if s <= bound[bound.len() - 1] {
                apex.pop();
                bound.pop();
                continue;
            }
            apex.push(q);
            bound.push(s);
            break;
        }
    }

    if apex.is_empty() {
        dist.fill(f64::INFINITY);
        arg.fill(NO_SITE);
        return;
    }

    let mut k = 0;
    for q in 0..n {
        while k + 1 < apex.len() && bound[k + 1] < q as f64 {
            k += 1;
        }
        let p = apex[k];
        let d = q as f64 - p as f64;
        dist[q] = d * d + f[p];
        arg[q] = p;
    }
}

/// Compute the feature transform for the cells where `is_site` holds
pub(crate) fn feature_transform(
    width: u32,
    height: u32,
    is_site: impl Fn(usize) -> bool,
) -> FeatureTransform {
    let w = width as usize;
    let h = height as usize;
    let n = w * h;

    // columns
    let mut col_dist = vec![f64::INFINITY; n];
    let mut col_row = vec![NO_SITE; n];
    let mut f = vec![0.0; h];
    let mut d = vec![0.0; h];
    let mut a = vec![0usize; h];
    for x in 0..w {
        for y in 0..h {
            f[y] = if is_site(y * w + x) { 0.0 } else { f64::INFINITY };
        }
        transform_1d(&f, &mut d, &mut a);
        for y in 0..h {
            col_dist[y * w + x] = d[y];
            col_row[y * w + x] = a[y];
        }
    }

    // rows
    let mut sq_dist = vec![f64::INFINITY; n];
    let mut nearest = vec![NO_SITE; n];
    let mut d = vec![0.0; w];
    let mut a = vec![0usize; w];
    for y in 0..h {
        let row = &col_dist[y * w..(y + 1) * w];
        transform_1d(row, &mut d, &mut a);
        for x in 0..w {
            let idx = y * w + x;
            sq_dist[idx] = d[x];
            if a[x] != NO_SITE {
                let sx = a[x];
                nearest[idx] = col_row[y * w + sx] * w + sx;
            }
        }
    }

    FeatureTransform { sq_dist, nearest }
}

/// Distance from every cell to the nearest site, with a raster-edge fallback
///
/// When no site exists at all, every cell gets its distance to the outside
/// of the raster instead.
fn distance_to_sites(width: u32, height: u32, is_site: impl Fn(usize) -> bool) -> Vec<f32> {
    let ft = feature_transform(width, height, is_site);
    if ft.nearest.first().is_some_and(|&s| s == NO_SITE) {
        let w = width as usize;
        return (0..ft.sq_dist.len())
            .map(|idx| {
                let (x, y) = ((idx % w) as u32, (idx / w) as u32);
                (x + 1).min(width - x).min(y + 1).min(height - y) as f32
            })
            .collect();
    }
    ft.sq_dist.iter().map(|&d| d.sqrt() as f32).collect()
}

/// Euclidean distance of every ON pixel to the nearest OFF pixel
///
/// OFF pixels get 0. A mask without any OFF pixel measures the distance to
/// the outside of the raster.
pub fn distance_transform(mask: &Mask) -> RegionResult<FPix> {
    let (width, height) = mask.dimensions();
    let data = mask.data();
    let dist = distance_to_sites(width, height, |idx| !data[idx]);
    let values = dist
        .into_iter()
        .zip(data)
        .map(|(d, &on)| if on { d } else { 0.0 })
        .collect();
    Ok(FPix::from_data(width, height, values)?)
}

/// Distance of every labeled pixel to the nearest pixel with another label
///
/// Unlabeled pixels get 0. For a map holding a single label this equals
/// [`distance_transform`] of that label's mask.
pub fn label_distance_transform(labels: &LabelMap) -> RegionResult<FPix> {
    let (width, height) = labels.dimensions();
    let data = labels.data();
    let mut out = FPix::new(width, height)?;
    let present = labels.histogram();
    for (label, &count) in present.iter().enumerate().skip(1) {
        if count == 0 {
            continue;
        }
        let label = label as u32;
        let dist = distance_to_sites(width, height, |idx| data[idx] != label);
        for ((dst, &l), d) in out.data_mut().iter_mut().zip(data).zip(dist) {
            if l == label {
                *dst = d;
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform_1d() {
        let inf = f64::INFINITY;
        let f = [inf, 0.0, inf, inf, inf, 0.0];
        let mut d = [0.0; 6];
        let mut a = [0usize; 6];
        transform_1d(&f, &mut d, &mut a);
        assert_eq!(d, [1.0, 0.0, 1.0, 4.0, 1.0, 0.0]);
        assert_eq!(a[0], 1);
        assert_eq!(a[4], 5);
    }

    #[test]
    fn test_distance_of_square() {
        // 5x5 block inside a 7x7 mask: centre is 3 steps from background
        let mask = Mask::from_fn(7, 7, |x, y| (1..6).contains(&x) && (1..6).contains(&y)).unwrap();
        let dist = distance_transform(&mask).unwrap();
        assert_eq!(dist.get_pixel(0, 0), Some(0.0));
        assert_eq!(dist.get_pixel(1, 1), Some(1.0));
        assert_eq!(dist.get_pixel(3, 3), Some(3.0));
        assert_eq!(dist.get_pixel(2, 3), Some(2.0));
    }

    #[test]
    fn test_diagonal_distance_is_euclidean() {
        let mut mask = Mask::new_with_value(5, 5, true).unwrap();
        mask.set_pixel(0, 0, false).unwrap();
        let dist = distance_transform(&mask).unwrap();
        let d = dist.get_pixel(3, 4).unwrap();
        assert!((d - 5.0).abs() < 1e-5);
    }

    #[test]
    fn test_full_mask_measures_to_edge() {
        let mask = Mask::new_with_value(5, 3, true).unwrap();
        let dist = distance_transform(&mask).unwrap();
        assert_eq!(dist.get_pixel(0, 0), Some(1.0));
        assert_eq!(dist.get_pixel(2, 1), Some(2.0));
    }

    #[test]
    fn test_label_distance_separates_touching_labels() {
        let labels = LabelMap::from_data(6, 1, vec![1, 1, 1, 2, 2, 2]).unwrap();
        let dist = label_distance_transform(&labels).unwrap();
        // each label measures to the other, not to itself
        assert_eq!(dist.data(), &[3.0, 2.0, 1.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_feature_transform_nearest_site() {
        let ft = feature_transform(4, 1, |idx| idx == 0 || idx == 3);
        assert_eq!(ft.nearest, vec![0, 0, 3, 3]);
    }
}
