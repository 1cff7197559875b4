//! tbdetect-test - Regression test helpers for tbdetect
//!
//! This crate provides the small regression framework used by the
//! `tests/*_reg.rs` files of the other crates, plus synthetic fixtures:
//!
//! - [`RegParams`]: indexed value / mask comparisons with a final report
//! - [`mask_from_rows`], [`random_mask`], [`fill_rect`]: mask fixtures
//! - [`smear_from_mask`], [`ramp_image`]: source image fixtures
//!
//! # Usage
//!
//! ```ignore
//! use tbdetect_test::RegParams;
//!
//! let mut rp = RegParams::new("clean");
//! rp.compare_values(3.0, count as f64, 0.0);
//! assert!(rp.cleanup());
//! ```

mod error;
mod fixtures;
mod params;

pub use error::{TestError, TestResult};
pub use fixtures::{fill_rect, mask_from_rows, ramp_image, random_mask, smear_from_mask};
pub use params::RegParams;
