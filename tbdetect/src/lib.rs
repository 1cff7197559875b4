//! tbdetect - Bacillus candidate detection for sputum smear microscopy
//!
//! Takes a thresholded segmentation mask of a smear image together with the
//! source image it came from and reports which connected components look
//! like bacilli.
//!
//! # Overview
//!
//! - Mask cleanup (tile filtering, speck removal, gap bridging, morphology)
//! - Connected component statistics
//! - Fixed-size candidate patches cut from the source image
//! - Classification by shape rule, trained SVM, or a small convolutional
//!   network
//! - Annotation boxes for an overlay viewer
//!
//! # Example
//!
//! ```
//! use tbdetect::{Mask, GrayImage};
//! use tbdetect::region::{ConnectivityType, extract_components};
//!
//! let mut mask = Mask::new(64, 64).unwrap();
//! mask.set_pixel(10, 10, 255).unwrap();
//! mask.set_pixel(40, 40, 255).unwrap();
//!
//! let stats = extract_components(&mask, ConnectivityType::EightWay).unwrap();
//! assert_eq!(stats.len(), 2);
//!
//! let source = GrayImage::new(64, 64).unwrap();
//! assert_eq!(source.dimensions(), mask.dimensions());
//! ```

// Re-export core types (primary data structures used everywhere)
pub use tbdetect_core::*;

// Re-export stage crates as modules to avoid name conflicts
pub use tbdetect_recog as recog;
pub use tbdetect_region as region;

pub use tbdetect_recog::{DetectionReport, Detector, DetectorConfig, Label};
