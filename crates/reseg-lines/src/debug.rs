//! Intermediate raster dumps
//!
//! With a debug directory configured, the rasters of every scope (seeds,
//! grown labels, existing and detected line labels) are written as PNG
//! files named `<scope>-<stage>.png`. Failing writes are logged and never
//! interrupt processing.

use image::GrayImage;
use reseg_core::{LabelMap, Mask};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Writes debug rasters for one scope
#[derive(Debug, Clone)]
pub struct DebugSink {
    dir: Option<PathBuf>,
    scope: String,
}

impl DebugSink {
    /// Create a sink; without a directory nothing is written
    pub fn new(dir: Option<&Path>, scope: &str) -> Self {
        let scope = scope
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        Self {
            dir: dir.map(Path::to_path_buf),
            scope,
        }
    }

    /// Whether dumps are written
    pub fn is_enabled(&self) -> bool {
        self.dir.is_some()
    }

    /// Path a stage is written to
    pub fn path_for(&self, stage: &str) -> Option<PathBuf> {
        self.dir
            .as_ref()
            .map(|dir| dir.join(format!("{}-{}.png", self.scope, stage)))
    }

    /// Dump a label raster
    pub fn labels(&self, stage: &str, labels: &LabelMap) {
        if self.is_enabled() {
            self.write(stage, labels.to_luma());
        }
    }

    /// Dump a mask
    pub fn mask(&self, stage: &str, mask: &Mask) {
        if self.is_enabled() {
            self.write(stage, mask.to_luma());
        }
    }

    fn write(&self, stage: &str, image: GrayImage) {
        let Some(path) = self.path_for(stage) else {
            return;
        };
        if let Some(dir) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(dir) {
                warn!("cannot create debug directory {}: {}", dir.display(), e);
                return;
            }
        }
        match image.save(&path) {
            Ok(()) => debug!("wrote {}", path.display()),
            Err(e) => warn!("cannot write {}: {}", path.display(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_sink_writes_nothing() {
        let sink = DebugSink::new(None, "page");
        assert!(!sink.is_enabled());
        assert!(sink.path_for("seeds").is_none());
        sink.mask("seeds", &Mask::new(4, 4).unwrap());
    }

    #[test]
    fn test_scope_names_are_sanitized() {
        let sink = DebugSink::new(Some(Path::new("/tmp/dbg")), "r 1/a");
        assert_eq!(
            sink.path_for("spread").unwrap(),
            PathBuf::from("/tmp/dbg/r_1_a-spread.png")
        );
    }

    #[test]
    fn test_writes_png() {
        let dir = std::env::temp_dir().join("reseg-debug-sink-test");
        let sink = DebugSink::new(Some(&dir), "scope");
        let mask = Mask::from_fn(8, 8, |x, y| x == y).unwrap();
        sink.mask("diag", &mask);
        let path = sink.path_for("diag").unwrap();
        assert!(path.exists());
        let _ = std::fs::remove_file(path);
    }
}
