//! Sanity checks on scope images
//!
//! Re-segmentation assumes a binarized image at a plausible resolution.
//! These checks catch inverted images, wrong pixel densities and images
//! that are mostly noise before any line gets rewritten.

use crate::error::ResegResult;
use reseg_core::Mask;
use reseg_region::{ConnectivityType, label_connected_components};

/// Pixel area of one expected glyph slot at 300 DPI
const SLOT_AREA: f64 = 30.0 * 30.0;

/// Size and component limits for one kind of scope
struct Limits {
    kind: &'static str,
    min_height: f64,
    max_height: f64,
    min_width: f64,
    max_width: f64,
    min_components: u32,
}

const PAGE_LIMITS: Limits = Limits {
    kind: "page",
    min_height: 600.0,
    max_height: 10000.0,
    min_width: 600.0,
    max_width: 10000.0,
    min_components: 10,
};

const REGION_LIMITS: Limits = Limits {
    kind: "region",
    min_height: 45.0,
    max_height: 5000.0,
    min_width: 100.0,
    max_width: 5000.0,
    min_components: 5,
};

fn check(binary: &Mask, zoom: f64, limits: &Limits) -> ResegResult<Option<String>> {
    let (w, h) = binary.dimensions();
    if binary.count() * 2 > binary.data().len() {
        return Ok(Some("image may be inverted".to_string()));
    }
    let (wf, hf) = (w as f64, h as f64);
    if hf < limits.min_height / zoom {
        return Ok(Some(format!(
            "image not tall enough for a {} image ({}x{})",
            limits.kind, w, h
        )));
    }
    if hf > limits.max_height / zoom {
        return Ok(Some(format!(
            "image too tall for a {} image ({}x{})",
            limits.kind, w, h
        )));
    }
    if wf < limits.min_width / zoom {
        return Ok(Some(format!(
            "image too narrow for a {} image ({}x{})",
            limits.kind, w, h
        )));
    }
    if wf > limits.max_width / zoom {
        return Ok(Some(format!(
            "image too wide for a {} image ({}x{})",
            limits.kind, w, h
        )));
    }
    let slots = (wf * hf / SLOT_AREA * zoom * zoom) as u32;
    let (_, count) = label_connected_components(binary, ConnectivityType::FourWay)?;
    if count < limits.min_components {
        return Ok(Some(format!(
            "too few connected components for a {} image (got {})",
            limits.kind, count
        )));
    }
    if count > slots && count > 10 {
        return Ok(Some(format!(
            "too many connected components for a {} image ({} > {})",
            limits.kind, count, slots
        )));
    }
    Ok(None)
}

/// Check a full page image; returns the reason it looks wrong, if any
pub fn check_page(binary: &Mask, zoom: f64) -> ResegResult<Option<String>> {
    check(binary, zoom, &PAGE_LIMITS)
}

/// Check a region image; returns the reason it looks wrong, if any
pub fn check_region(binary: &Mask, zoom: f64) -> ResegResult<Option<String>> {
    check(binary, zoom, &REGION_LIMITS)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Region-sized image with a grid of small glyph blocks
    fn glyphs(width: u32, height: u32, step: u32) -> Mask {
        Mask::from_fn(width, height, |x, y| {
            x % step >= 2 && x % step < 8 && y % step >= 2 && y % step < 8
        })
        .unwrap()
    }

    #[test]
    fn test_plausible_region() {
        let binary = glyphs(300, 60, 30);
        assert_eq!(check_region(&binary, 1.0).unwrap(), None);
    }

    #[test]
    fn test_inverted() {
        let binary = glyphs(300, 60, 30).invert();
        let reason = check_region(&binary, 1.0).unwrap().unwrap();
        assert!(reason.contains("inverted"));
    }

    #[test]
    fn test_size_limits_scale_with_zoom() {
        let binary = glyphs(300, 40, 30);
        assert!(check_region(&binary, 1.0).unwrap().unwrap().contains("tall"));
        // at 600 DPI the same pixel size is half as tall in print
        assert!(check_region(&glyphs(300, 60, 30), 0.5).unwrap().is_some());
    }

    #[test]
    fn test_component_counts() {
        let blank = Mask::new(300, 60).unwrap();
        assert!(check_region(&blank, 1.0).unwrap().unwrap().contains("too few"));
        // isolated dots everywhere
        let noise = glyphs(300, 60, 3);
        assert!(check_region(&noise, 1.0).unwrap().is_some());
        assert!(check_page(&glyphs(300, 60, 30), 1.0).unwrap().is_some());
    }
}
