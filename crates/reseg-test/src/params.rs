//! Regression test state and checks

use crate::error::{TestError, TestResult};
use crate::{golden_dir, regout_dir};
use image::GrayImage;
use reseg_core::{LabelMap, Mask};
use std::fs;
use std::path::Path;

/// How raster output is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegTestMode {
    /// Store rasters as golden files
    Generate,
    /// Check rasters against golden files
    #[default]
    Compare,
    /// Only write rasters for inspection
    Display,
}

impl RegTestMode {
    /// Mode from `REGTEST_MODE`; anything unknown means compare
    pub fn from_env() -> Self {
        let value = std::env::var("REGTEST_MODE").unwrap_or_default();
        match value.to_ascii_lowercase().as_str() {
            "generate" => Self::Generate,
            "display" => Self::Display,
            _ => Self::Compare,
        }
    }
}

/// State of one regression test
///
/// Checks are numbered in the order they run; the number shows up in
/// failure messages and in raster file names. Failures are collected, not
/// raised, so one run reports all of them at [`cleanup`](Self::cleanup).
pub struct RegParams {
    /// Name of the test, without the `_reg` suffix
    pub test_name: String,
    /// Raster mode
    pub mode: RegTestMode,
    index: usize,
    failures: Vec<String>,
}

impl RegParams {
    /// Start a test; the mode is read from the environment
    pub fn new(test_name: &str) -> Self {
        let mode = RegTestMode::from_env();
        if mode != RegTestMode::Compare {
            let _ = fs::create_dir_all(regout_dir());
        }
        if mode == RegTestMode::Generate {
            let _ = fs::create_dir_all(golden_dir());
        }
        eprintln!("=== {}_reg ({:?}) ===", test_name, mode);
        Self {
            test_name: test_name.to_string(),
            mode,
            index: 0,
            failures: Vec::new(),
        }
    }

    /// Number of the last check
    pub fn index(&self) -> usize {
        self.index
    }

    /// Whether rasters are only written for inspection
    pub fn display(&self) -> bool {
        self.mode == RegTestMode::Display
    }

    /// Check that `actual` lies within `delta` of `expected`
    pub fn compare_values(&mut self, expected: f64, actual: f64, delta: f64) -> bool {
        self.index += 1;
        let diff = (expected - actual).abs();
        // NaN never passes
        if diff <= delta {
            return true;
        }
        self.fail(format!(
            "expected {}, got {} (off by {}, allowed {})",
            expected, actual, diff, delta
        ));
        false
    }

    /// Check that two masks are identical
    ///
    /// On mismatch the number of differing pixels and the first one in
    /// row-major order are reported.
    pub fn compare_masks(&mut self, expected: &Mask, actual: &Mask) -> bool {
        self.index += 1;
        if expected.dimensions() != actual.dimensions() {
            self.fail(format!(
                "mask size {:?} differs from expected {:?}",
                actual.dimensions(),
                expected.dimensions()
            ));
            return false;
        }
        let width = expected.width() as usize;
        let mut differing = expected
            .data()
            .iter()
            .zip(actual.data())
            .enumerate()
            .filter(|(_, (a, b))| a != b)
            .map(|(i, _)| i);
        let Some(first) = differing.next() else {
            return true;
        };
        let count = 1 + differing.count();
        self.fail(format!(
            "{} mask pixels differ, first at ({}, {})",
            count,
            first % width,
            first / width
        ));
        false
    }

    /// Write a mask and check it against its golden file
    pub fn write_mask_and_check(&mut self, mask: &Mask) -> TestResult<()> {
        self.write_and_check(mask.to_luma())
    }

    /// Write a label raster and check it against its golden file
    pub fn write_labels_and_check(&mut self, labels: &LabelMap) -> TestResult<()> {
        self.write_and_check(labels.to_luma())
    }

    fn write_and_check(&mut self, raster: GrayImage) -> TestResult<()> {
        self.index += 1;
        let name = format!("{}.{:02}.png", self.test_name, self.index);
        let local = regout_dir().join(&name);
        fs::create_dir_all(regout_dir())?;
        raster.save(&local).map_err(|source| TestError::RasterWrite {
            path: local.clone(),
            source,
        })?;

        let golden = golden_dir().join(format!("{}_golden.{:02}.png", self.test_name, self.index));
        match self.mode {
            RegTestMode::Display => {}
            RegTestMode::Generate => {
                fs::create_dir_all(golden_dir())?;
                fs::copy(&local, &golden)?;
                eprintln!("generated {}", golden.display());
            }
            RegTestMode::Compare => {
                if !golden.exists() {
                    self.fail(format!("no golden file {}", golden.display()));
                } else if !same_raster(&local, &golden)? {
                    self.fail(format!("{} differs from {}", local.display(), golden.display()));
                }
            }
        }
        Ok(())
    }

    fn fail(&mut self, reason: String) {
        let msg = format!("{}_reg check {}: {}", self.test_name, self.index, reason);
        eprintln!("{}", msg);
        self.failures.push(msg);
    }

    /// Report the outcome; `true` when every check passed
    pub fn cleanup(self) -> bool {
        if self.failures.is_empty() {
            eprintln!("SUCCESS: {}_reg, {} checks", self.test_name, self.index);
            return true;
        }
        eprintln!(
            "FAILURE: {}_reg, {} of {} checks failed",
            self.test_name,
            self.failures.len(),
            self.index
        );
        for failure in &self.failures {
            eprintln!("  {}", failure);
        }
        false
    }

    /// Whether every check so far passed
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Failure messages so far
    pub fn failures(&self) -> &[String] {
        &self.failures
    }
}

/// Same bytes, or same grayscale pixels after decoding
fn same_raster(a: &Path, b: &Path) -> TestResult<bool> {
    if fs::read(a)? == fs::read(b)? {
        return Ok(true);
    }
    let decode = |p: &Path| image::open(p).ok().map(|img| img.to_luma8());
    Ok(matches!((decode(a), decode(b)), (Some(x), Some(y)) if x == y))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_within_delta_pass() {
        let mut rp = RegParams::new("params");
        assert!(rp.compare_values(100.0, 100.5, 1.0));
        assert!(rp.compare_values(2.0, 2.0, 0.0));
        assert!(rp.is_success());
        assert_eq!(rp.index(), 2);
    }

    #[test]
    fn test_failures_are_collected() {
        let mut rp = RegParams::new("params");
        assert!(!rp.compare_values(100.0, 200.0, 0.0));
        assert!(!rp.compare_values(0.0, f64::NAN, 1.0));
        assert!(rp.compare_values(1.0, 1.0, 0.0));
        assert_eq!(rp.failures().len(), 2);
        assert!(rp.failures()[0].contains("check 1"));
        assert!(!rp.cleanup());
    }

    #[test]
    fn test_compare_masks_counts_differences() {
        let mut rp = RegParams::new("params");
        let a = Mask::from_fn(4, 4, |x, y| x == y).unwrap();
        let mut b = a.clone();
        assert!(rp.compare_masks(&a, &b));
        b.set_pixel(0, 3, true).unwrap();
        b.set_pixel(1, 1, false).unwrap();
        assert!(!rp.compare_masks(&a, &b));
        assert!(rp.failures()[0].contains("2 mask pixels differ, first at (1, 1)"));
        assert!(!rp.compare_masks(&a, &Mask::new(3, 4).unwrap()));
    }
}
