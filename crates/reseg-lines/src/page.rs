//! In-memory page model
//!
//! Regions and lines carry their outlines as integer page coordinates, the
//! way a page description stores them. Re-segmentation rewrites the
//! outlines and baselines of existing lines in place; it never adds or
//! removes lines.

use crate::error::ResegResult;
use geo::{LineString, Polygon};
use reseg_core::Box;
use reseg_geom::{GeomResult, coords_from_points, repair_polygon};
use serde::{Deserialize, Serialize};

/// A text line with outline and optional baseline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextLine {
    /// Line identifier
    pub id: String,
    /// Outline polygon points
    pub coords: Vec<(i32, i32)>,
    /// Baseline polyline points, in reading order
    #[serde(default)]
    pub baseline: Option<Vec<(i32, i32)>>,
}

impl TextLine {
    /// Create a line without baseline
    pub fn new(id: impl Into<String>, coords: Vec<(i32, i32)>) -> Self {
        Self {
            id: id.into(),
            coords,
            baseline: None,
        }
    }

    /// Attach a baseline
    pub fn with_baseline(mut self, baseline: Vec<(i32, i32)>) -> Self {
        self.baseline = Some(baseline);
        self
    }

    /// Outline as a valid polygon
    pub fn polygon(&self) -> GeomResult<Polygon<f64>> {
        repair_polygon(&coords_from_points(&self.coords))
    }

    /// Baseline as a polyline, if it has at least two points
    pub fn baseline_string(&self) -> Option<LineString<f64>> {
        self.baseline
            .as_ref()
            .filter(|points| points.len() >= 2)
            .map(|points| LineString::new(coords_from_points(points)))
    }
}

/// A text region and its lines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRegion {
    /// Region identifier
    pub id: String,
    /// Outline polygon points
    pub coords: Vec<(i32, i32)>,
    /// Lines in reading order
    #[serde(default)]
    pub lines: Vec<TextLine>,
}

impl TextRegion {
    /// Create a region without lines
    pub fn new(id: impl Into<String>, coords: Vec<(i32, i32)>) -> Self {
        Self {
            id: id.into(),
            coords,
            lines: Vec::new(),
        }
    }

    /// Add a line
    pub fn with_line(mut self, line: TextLine) -> Self {
        self.lines.push(line);
        self
    }

    /// Outline as a valid polygon
    pub fn polygon(&self) -> GeomResult<Polygon<f64>> {
        repair_polygon(&coords_from_points(&self.coords))
    }

    /// Pixel bounding box of the outline
    pub fn bounding_box(&self) -> Option<Box> {
        Box::from_points(&self.coords)
    }
}

/// Kind of a region that cannot contain text lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NonTextKind {
    Image,
    LineDrawing,
    Graphic,
    Chart,
    Map,
    Maths,
    Chem,
    Music,
    Advert,
    Noise,
    Separator,
    Unknown,
    Custom,
}

/// A region whose area is never attributed to a line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NonTextRegion {
    /// Region identifier
    pub id: String,
    /// Region type
    pub kind: NonTextKind,
    /// Outline polygon points
    pub coords: Vec<(i32, i32)>,
}

impl NonTextRegion {
    /// Create a non-text region
    pub fn new(id: impl Into<String>, kind: NonTextKind, coords: Vec<(i32, i32)>) -> Self {
        Self {
            id: id.into(),
            kind,
            coords,
        }
    }

    /// Outline as a valid polygon
    pub fn polygon(&self) -> GeomResult<Polygon<f64>> {
        repair_polygon(&coords_from_points(&self.coords))
    }
}

/// A page with its regions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// Page identifier
    pub id: String,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Text regions in reading order
    #[serde(default)]
    pub regions: Vec<TextRegion>,
    /// Regions masked out of every scope
    #[serde(default)]
    pub non_text: Vec<NonTextRegion>,
}

impl Page {
    /// Create an empty page
    pub fn new(id: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            id: id.into(),
            width,
            height,
            regions: Vec::new(),
            non_text: Vec::new(),
        }
    }

    /// Add a text region
    pub fn with_region(mut self, region: TextRegion) -> Self {
        self.regions.push(region);
        self
    }

    /// Add a non-text region
    pub fn with_non_text(mut self, region: NonTextRegion) -> Self {
        self.non_text.push(region);
        self
    }

    /// Total number of text lines
    pub fn line_count(&self) -> usize {
        self.regions.iter().map(|r| r.lines.len()).sum()
    }

    /// Find a line by id
    pub fn line(&self, id: &str) -> Option<&TextLine> {
        self.regions
            .iter()
            .flat_map(|r| r.lines.iter())
            .find(|l| l.id == id)
    }

    /// Parse a page from JSON
    pub fn from_json(json: &str) -> ResegResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize the page to JSON
    pub fn to_json(&self) -> ResegResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Area;

    fn sample_page() -> Page {
        Page::new("p1", 200, 100)
            .with_region(
                TextRegion::new("r1", vec![(0, 0), (199, 0), (199, 99), (0, 99)]).with_line(
                    TextLine::new("l1", vec![(10, 10), (190, 10), (190, 30), (10, 30)])
                        .with_baseline(vec![(10, 28), (190, 28)]),
                ),
            )
            .with_non_text(NonTextRegion::new(
                "img",
                NonTextKind::Image,
                vec![(150, 50), (190, 50), (190, 90), (150, 90)],
            ))
    }

    #[test]
    fn test_line_geometry() {
        let page = sample_page();
        let line = page.line("l1").unwrap();
        assert!((line.polygon().unwrap().unsigned_area() - 3600.0).abs() < 1e-9);
        assert_eq!(line.baseline_string().unwrap().0.len(), 2);
        assert!(TextLine::new("x", vec![(0, 0), (1, 1)]).polygon().is_err());
        assert_eq!(page.line_count(), 1);
        assert!(page.line("missing").is_none());
    }

    #[test]
    fn test_json_roundtrip() {
        let page = sample_page();
        let json = page.to_json().unwrap();
        assert!(json.contains("\"kind\": \"image\""));
        assert_eq!(Page::from_json(&json).unwrap(), page);
    }

    #[test]
    fn test_region_bounding_box() {
        let region = TextRegion::new("r", vec![(5, 5), (14, 5), (14, 9), (5, 9)]);
        let b = region.bounding_box().unwrap();
        assert_eq!((b.x, b.y, b.w, b.h), (5, 5, 10, 5));
    }
}
