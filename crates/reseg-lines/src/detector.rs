//! Line detection
//!
//! The matching path needs an independent line segmentation of the scope
//! image. Any detector can be plugged in through [`LineDetector`]; the
//! built-in [`ProjectionLineDetector`] finds horizontal text lines from the
//! row projection profile.
//!
//! # Algorithm Overview (projection detector)
//!
//! 1. **Horizontal Projection**: Count ink pixels per row
//! 2. **Line Bands**: Runs of rows with ink become line bands
//! 3. **Line Labels**: Each band labels the rectangle spanned by its ink,
//!    padded by one pixel
//! 4. **Baselines**: The row with the steepest projection drop in each band

use geo::{Coord, LineString};
use reseg_core::{LabelMap, Mask, check_dimensions};
use thiserror::Error;

/// Errors reported by line detectors
#[derive(Debug, Error)]
pub enum DetectorError {
    /// Input rasters cannot be processed
    #[error("invalid detector input: {0}")]
    InvalidInput(String),

    /// Line detection failed
    #[error("line detection failed: {0}")]
    Failed(String),
}

/// Everything a detector gets to see of one scope
#[derive(Debug, Clone, Copy)]
pub struct DetectorInput<'a> {
    /// Binarized scope image
    pub binary: &'a Mask,
    /// Separators and other areas that must not be attributed to lines
    pub separators: &'a Mask,
    /// Zoom factor relative to 300 DPI
    pub zoom: f64,
    /// Distance in pixels up to which line labels may spread
    pub spread_distance: f64,
    /// Whether the scope is a full page (as opposed to a single region)
    pub full_page: bool,
}

/// Result of a line detection
#[derive(Debug, Clone)]
pub struct DetectorOutput {
    /// Line labels, 1-based, same size as the input
    pub labels: LabelMap,
    /// Baseline for each label (index `label - 1`)
    pub baselines: Vec<Option<LineString<f64>>>,
    /// Estimated glyph scale in pixels
    pub scale: f64,
}

/// A text-line detector
pub trait LineDetector: Send + Sync {
    /// Detect text lines in one scope
    fn detect(&self, input: &DetectorInput<'_>) -> Result<DetectorOutput, DetectorError>;
}

/// Options for the projection line detector
#[derive(Debug, Clone)]
pub struct ProjectionOptions {
    /// Rows with fewer ink pixels count as empty (default: 1)
    pub min_row_ink: u32,
    /// Minimum band height at 300 DPI (default: 4)
    /// Lower bands are dropped as noise
    pub min_line_height: u32,
}

impl Default for ProjectionOptions {
    fn default() -> Self {
        Self {
            min_row_ink: 1,
            min_line_height: 4,
        }
    }
}

impl ProjectionOptions {
    /// Create new options with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the minimum ink count of a text row
    pub fn with_min_row_ink(mut self, count: u32) -> Self {
        self.min_row_ink = count;
        self
    }

    /// Set the minimum band height
    pub fn with_min_line_height(mut self, height: u32) -> Self {
        self.min_line_height = height;
        self
    }

    fn validate(&self) -> Result<(), DetectorError> {
        if self.min_row_ink == 0 {
            return Err(DetectorError::InvalidInput(
                "min_row_ink must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Line detector based on the horizontal projection profile
///
/// Suited to deskewed, single-column scopes. Each run of text rows becomes
/// one line labelled over the rectangle spanned by its ink plus a one pixel
/// margin, with a horizontal baseline on its lowest heavy row.
#[derive(Debug, Clone, Default)]
pub struct ProjectionLineDetector {
    options: ProjectionOptions,
}

/// Glyph scale reported when no band is found
const FALLBACK_SCALE: f64 = 43.0;

impl ProjectionLineDetector {
    /// Create a detector with default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a detector with the given options
    pub fn with_options(options: ProjectionOptions) -> Self {
        Self { options }
    }
}

impl LineDetector for ProjectionLineDetector {
    fn detect(&self, input: &DetectorInput<'_>) -> Result<DetectorOutput, DetectorError> {
        self.options.validate()?;
        check_dimensions(input.binary.dimensions(), input.separators.dimensions())
            .map_err(|e| DetectorError::InvalidInput(e.to_string()))?;
        if !(input.zoom > 0.0) {
            return Err(DetectorError::InvalidInput(format!(
                "zoom must be positive: {}",
                input.zoom
            )));
        }
        let ink = input
            .binary
            .and_not(input.separators)
            .map_err(|e| DetectorError::InvalidInput(e.to_string()))?;
        let (width, height) = ink.dimensions();

        // Step 1: horizontal projection
        let row_sums = compute_row_sums(&ink);

        // Step 2: bands of text rows
        let min_height = ((self.options.min_line_height as f64 / input.zoom).round() as u32).max(1);
        let bands = find_bands(&row_sums, self.options.min_row_ink, min_height);

        // Steps 3 and 4: labels and baselines
        let mut labels = LabelMap::new(width, height)
            .map_err(|e| DetectorError::InvalidInput(e.to_string()))?;
        let mut baselines = Vec::with_capacity(bands.len());
        let mut heights = Vec::with_capacity(bands.len());
        let w = width as usize;
        for (y0, y1) in bands {
            let Some((x0, x1)) = ink_columns(&ink, y0, y1) else {
                continue;
            };
            let label = baselines.len() as u32 + 1;
            // one pixel of background around the ink
            let (left, right) = (x0.saturating_sub(1), (x1 + 1).min(width - 1));
            let (top, bottom) = (y0.saturating_sub(1), (y1 + 1).min(height - 1));
            let data = labels.data_mut();
            for y in top..=bottom {
                data[y as usize * w + left as usize..=y as usize * w + right as usize].fill(label);
            }
            let y = steepest_drop(&row_sums, y0, y1);
            baselines.push((x1 > x0).then(|| {
                LineString::new(vec![
                    Coord {
                        x: x0 as f64,
                        y: y as f64,
                    },
                    Coord {
                        x: x1 as f64,
                        y: y as f64,
                    },
                ])
            }));
            heights.push(y1 - y0 + 1);
        }

        heights.sort_unstable();
        let scale = if heights.is_empty() {
            FALLBACK_SCALE
        } else {
            heights[heights.len() / 2] as f64
        };

        Ok(DetectorOutput {
            labels,
            baselines,
            scale,
        })
    }
}

// ============================================================================
// Internal functions
// ============================================================================

/// Compute row sums (horizontal projection)
fn compute_row_sums(mask: &Mask) -> Vec<u32> {
    let w = mask.width() as usize;
    mask.data()
        .chunks(w.max(1))
        .map(|row| row.iter().filter(|&&v| v).count() as u32)
        .collect()
}

/// Maximal runs of rows with at least `min_ink` pixels, at least `min_height` tall
fn find_bands(row_sums: &[u32], min_ink: u32, min_height: u32) -> Vec<(u32, u32)> {
    let mut bands = Vec::new();
    let mut start: Option<usize> = None;
    for (y, &sum) in row_sums.iter().chain(std::iter::once(&0)).enumerate() {
        match (start, sum >= min_ink) {
            (None, true) => start = Some(y),
            (Some(y0), false) => {
                if (y - y0) as u32 >= min_height {
                    bands.push((y0 as u32, y as u32 - 1));
                }
                start = None;
            }
            _ => {}
        }
    }
    bands
}

/// Leftmost and rightmost ink column within rows `y0..=y1`
fn ink_columns(mask: &Mask, y0: u32, y1: u32) -> Option<(u32, u32)> {
    let mut range: Option<(u32, u32)> = None;
    for y in y0..=y1 {
        for x in 0..mask.width() {
            if mask.get_pixel_unchecked(x, y) {
                range = Some(match range {
                    None => (x, x),
                    Some((l, r)) => (l.min(x), r.max(x)),
                });
            }
        }
    }
    range
}

/// Row within `y0..=y1` after which the projection drops the most
fn steepest_drop(row_sums: &[u32], y0: u32, y1: u32) -> u32 {
    let mut best = (i64::MIN, y1);
    for y in y0..=y1 {
        let here = row_sums[y as usize] as i64;
        let below = row_sums.get(y as usize + 1).copied().unwrap_or(0) as i64;
        let drop = if y == y1 { here } else { here - below };
        if drop > best.0 {
            best = (drop, y);
        }
    }
    best.1
}
