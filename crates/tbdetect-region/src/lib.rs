//! tbdetect-region - Region processing for thresholded smear masks
//!
//! This crate provides the stages between thresholding and candidate
//! extraction:
//!
//! - **Connected component analysis** - Labelling and per-component statistics
//! - **Mask cleaning** - Speck removal and one-pixel gap bridging
//! - **Tile filtering** - Erasing mostly-background tiles of split-Otsu masks
//! - **Morphology** - 2x2 opening and closing for adaptive-threshold masks
//! - **Postprocess dispatch** - Picking the cleanup for a thresholding algorithm
//!
//! # Examples
//!
//! ## Finding connected components
//!
//! ```
//! use tbdetect_core::{FOREGROUND, Mask};
//! use tbdetect_region::{ConnectivityType, extract_components};
//!
//! let mut mask = Mask::new(100, 100).unwrap();
//! mask.set_pixel(10, 10, FOREGROUND).unwrap();
//! mask.set_pixel(11, 10, FOREGROUND).unwrap();
//! mask.set_pixel(50, 50, FOREGROUND).unwrap();
//!
//! let stats = extract_components(&mask, ConnectivityType::EightWay).unwrap();
//! assert_eq!(stats.len(), 2);
//! assert_eq!(stats.foreground()[0].area, 2);
//! ```
//!
//! ## Cleaning a mask
//!
//! ```
//! use tbdetect_core::{FOREGROUND, Mask};
//! use tbdetect_region::{CleanOptions, clean_mask};
//!
//! let mut mask = Mask::new(10, 10).unwrap();
//! mask.set_pixel(0, 0, FOREGROUND).unwrap();
//! for x in 2..5 {
//!     mask.set_pixel(x, 5, FOREGROUND).unwrap();
//! }
//!
//! let report = clean_mask(&mut mask, &CleanOptions::default()).unwrap();
//! assert_eq!(report.specks_removed, 1);
//! assert_eq!(report.components_after, 1);
//! ```

pub mod clean;
pub mod conncomp;
pub mod error;
pub mod morph;
pub mod postprocess;
pub mod tile;

pub use clean::{
    BridgeMode, CleanOptions, CleanReport, DEFAULT_SPECK_MIN_AREA, bridge_gaps, clean_mask,
    cleaned, erase_small_components, remove_specks,
};
pub use conncomp::{
    ComponentStat, ComponentStats, ConnectivityType, count_components, extract_components,
};
pub use error::{RegionError, RegionResult};
pub use morph::{close_brick, dilate_brick, erode_brick, open_brick, remove_noise};
pub use postprocess::{PostprocessOptions, PostprocessResult, ThresholdAlgorithm, postprocess};
pub use tile::{
    DEFAULT_BLACK_PIXEL_THRESHOLD, DEFAULT_TILE_SIZE, Tile, TileFilterOptions, TileFilterReport,
    filter_tiles, reconstruct, split_into_tiles,
};
