//! reseg-test - Regression test harness for the reseg crates
//!
//! Every `tests/*_reg.rs` file drives one [`RegParams`]: numbered checks of
//! values and masks, plus optional raster output compared against golden
//! PNG files. The mode comes from `REGTEST_MODE`:
//!
//! - **compare** (default): check rasters against `tests/golden`
//! - **generate**: store rasters as the new golden files
//! - **display**: write rasters to `tests/regout` only
//!
//! # Usage
//!
//! ```ignore
//! use reseg_test::RegParams;
//!
//! let mut rp = RegParams::new("conncomp");
//! rp.compare_values(3.0, count as f64, 0.0);
//! assert!(rp.cleanup(), "conncomp regression test failed");
//! ```

mod error;
mod params;

pub use error::{TestError, TestResult};
pub use params::{RegParams, RegTestMode};

use std::path::PathBuf;

/// Workspace root, two levels above this crate
fn workspace_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("..").join("..")
}

/// Directory of golden rasters
pub fn golden_dir() -> PathBuf {
    workspace_root().join("tests").join("golden")
}

/// Directory of rasters written by the current run
pub fn regout_dir() -> PathBuf {
    workspace_root().join("tests").join("regout")
}
