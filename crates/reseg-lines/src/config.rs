//! Re-segmentation options
//!
//! Options deserialize from JSON with the same keys as the processor
//! parameters (`level-of-operation`, `method`, `min_fraction`, `spread`,
//! `baseline_only`, `dpi`). Missing keys take their defaults.

use crate::error::{ResegError, ResegResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Hierarchy level at which lines are re-segmented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// All lines of the page in one scope
    #[default]
    Page,
    /// One scope per text region, cropped to the region
    Region,
}

/// Source of the new line segmentation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Method {
    /// Run a line detector and match its lines geometrically
    #[default]
    #[serde(rename = "lineest")]
    LineEst,
    /// Spread distance-flattened existing lines over connected components
    #[serde(rename = "ccomps")]
    CComps,
    /// Spread bands around the existing baselines
    #[serde(rename = "baseline")]
    Baseline,
}

impl Method {
    /// Whether the method reconciles by label spreading instead of matching
    pub fn spreads_labels(self) -> bool {
        !matches!(self, Method::LineEst)
    }
}

/// Overlap ratios used when matching candidates to existing lines
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchThresholds {
    /// Share of the candidate's area that must lie in the line (default: 0.6)
    pub fit_bg: f64,
    /// Share of the candidate's ink that must lie in the line (default: 0.7)
    pub fit_fg: f64,
    /// Overlap above which an unassigned candidate counts as lost, and a
    /// neighbour gets trimmed (default: 0.1)
    pub overlap: f64,
}

impl MatchThresholds {
    /// Default minimum area fit
    pub const FIT_BG: f64 = 0.6;
    /// Default minimum ink fit
    pub const FIT_FG: f64 = 0.7;
    /// Default overlap ratio for lost segments and neighbours
    pub const OVERLAP: f64 = 0.1;
}

impl Default for MatchThresholds {
    fn default() -> Self {
        Self {
            fit_bg: Self::FIT_BG,
            fit_fg: Self::FIT_FG,
            overlap: Self::OVERLAP,
        }
    }
}

/// Options for [`crate::Resegmenter`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResegmentOptions {
    /// Scope of one re-segmentation pass (default: page)
    #[serde(rename = "level-of-operation")]
    pub level: Level,

    /// Segmentation method (default: lineest)
    pub method: Method,

    /// Share of the old line that the new line must still cover (default: 0.9)
    pub min_fraction: f64,

    /// Distance in points up to which labels spread into the background
    /// (default: 2.4)
    pub spread: f64,

    /// Use a band around the baseline instead of the outline, when a
    /// baseline is present (default: false)
    pub baseline_only: bool,

    /// Pixel density override; 0 takes the image's own (default: 0)
    pub dpi: f64,

    /// Skip scopes that do not look like a binarized page or region
    /// (default: true)
    pub check_images: bool,

    /// Directory for intermediate raster dumps (default: none)
    pub debug_dir: Option<PathBuf>,

    /// Matching thresholds
    pub thresholds: MatchThresholds,
}

impl Default for ResegmentOptions {
    fn default() -> Self {
        Self {
            level: Level::Page,
            method: Method::LineEst,
            min_fraction: 0.9,
            spread: 2.4,
            baseline_only: false,
            dpi: 0.0,
            check_images: true,
            debug_dir: None,
            thresholds: MatchThresholds::default(),
        }
    }
}

impl ResegmentOptions {
    /// Create new options with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the level of operation
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Set the segmentation method
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Set the minimum coverage fraction
    pub fn with_min_fraction(mut self, fraction: f64) -> Self {
        self.min_fraction = fraction;
        self
    }

    /// Set the spread distance in points
    pub fn with_spread(mut self, spread: f64) -> Self {
        self.spread = spread;
        self
    }

    /// Use baseline bands instead of outlines
    pub fn with_baseline_only(mut self, baseline_only: bool) -> Self {
        self.baseline_only = baseline_only;
        self
    }

    /// Override the pixel density
    pub fn with_dpi(mut self, dpi: f64) -> Self {
        self.dpi = dpi;
        self
    }

    /// Enable or disable scope sanity checks
    pub fn with_check_images(mut self, check: bool) -> Self {
        self.check_images = check;
        self
    }

    /// Write intermediate rasters to the given directory
    pub fn with_debug_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.debug_dir = Some(dir.into());
        self
    }

    /// Set the matching thresholds
    pub fn with_thresholds(mut self, thresholds: MatchThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Parse options from a JSON object
    pub fn from_json(json: &str) -> ResegResult<Self> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    /// Read options from a JSON file
    pub fn from_path(path: impl AsRef<Path>) -> ResegResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Validate options
    pub fn validate(&self) -> ResegResult<()> {
        if !(0.0..=1.0).contains(&self.min_fraction) {
            return Err(ResegError::InvalidParameter(format!(
                "min_fraction must be between 0 and 1, got {}",
                self.min_fraction
            )));
        }
        if !(self.spread >= 0.0 && self.spread.is_finite()) {
            return Err(ResegError::InvalidParameter(format!(
                "spread must be non-negative, got {}",
                self.spread
            )));
        }
        if !(self.dpi >= 0.0 && self.dpi.is_finite()) {
            return Err(ResegError::InvalidParameter(format!(
                "dpi must be non-negative, got {}",
                self.dpi
            )));
        }
        let t = &self.thresholds;
        for (name, value) in [("fit_bg", t.fit_bg), ("fit_fg", t.fit_fg), ("overlap", t.overlap)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ResegError::InvalidParameter(format!(
                    "{} must be between 0 and 1, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// Zoom factor relative to 300 DPI
///
/// A configured `dpi` wins; otherwise the image density is used when it is
/// plausible (at least 70 DPI); otherwise 1.
pub fn determine_zoom(dpi: f64, image_dpi: f64) -> f64 {
    if dpi > 0.0 {
        300.0 / dpi
    } else if image_dpi >= 70.0 {
        300.0 / image_dpi
    } else {
        1.0
    }
}

/// Spread distance in pixels for a spread in points
pub fn spread_distance(spread: f64, zoom: f64) -> f64 {
    spread / zoom * 300.0 / 72.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ResegmentOptions::default();
        assert_eq!(options.level, Level::Page);
        assert_eq!(options.method, Method::LineEst);
        assert_eq!(options.min_fraction, 0.9);
        assert_eq!(options.spread, 2.4);
        assert!(!options.baseline_only);
        assert!(options.check_images);
        assert_eq!(options.thresholds.fit_bg, 0.6);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_from_json() {
        let options = ResegmentOptions::from_json(
            r#"{"level-of-operation": "region", "method": "ccomps", "min_fraction": 0.75,
                "thresholds": {"fit_fg": 0.8}}"#,
        )
        .unwrap();
        assert_eq!(options.level, Level::Region);
        assert_eq!(options.method, Method::CComps);
        assert_eq!(options.min_fraction, 0.75);
        assert_eq!(options.spread, 2.4);
        assert_eq!(options.thresholds.fit_fg, 0.8);
        assert_eq!(options.thresholds.fit_bg, 0.6);
    }

    #[test]
    fn test_json_roundtrip_keeps_processor_keys() {
        let options = ResegmentOptions::new().with_method(Method::Baseline);
        let json = serde_json::to_string(&options).unwrap();
        assert!(json.contains("\"level-of-operation\":\"page\""));
        assert!(json.contains("\"method\":\"baseline\""));
        let back: ResegmentOptions = serde_json::from_str(&json).unwrap();
        assert_eq!(back, options);
    }

    #[test]
    fn test_invalid_options() {
        assert!(ResegmentOptions::from_json(r#"{"min_fraction": 1.5}"#).is_err());
        assert!(ResegmentOptions::from_json(r#"{"method": "watershed"}"#).is_err());
        assert!(ResegmentOptions::new().with_spread(-1.0).validate().is_err());
    }

    #[test]
    fn test_zoom() {
        assert_eq!(determine_zoom(150.0, 600.0), 2.0);
        assert_eq!(determine_zoom(0.0, 600.0), 0.5);
        assert_eq!(determine_zoom(0.0, 1.0), 1.0);
        assert!((spread_distance(2.4, 1.0) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_spreading_methods() {
        assert!(!Method::LineEst.spreads_labels());
        assert!(Method::CComps.spreads_labels());
        assert!(Method::Baseline.spreads_labels());
    }
}
