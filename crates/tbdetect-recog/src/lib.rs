//! tbdetect-recog - Bacillus candidate extraction and classification
//!
//! This crate turns a cleaned segmentation mask into labelled detections:
//!
//! - **Candidate extraction**: Fixed-size source patches around every component
//! - **Shape moments**: Hu invariants of the mask under a component box
//! - **Classification**: Shape rule, trained SVM, or convolutional scorer
//! - **Annotation**: Margin-grown boxes split into positive and negative
//! - **Pipeline**: [`Detector`] runs cleanup through annotation
//!
//! # Quick Start
//!
//! ```no_run
//! use tbdetect_core::{GrayImage, Mask};
//! use tbdetect_recog::{Detector, DetectorConfig};
//!
//! let config = DetectorConfig::load("tbdetect.json").unwrap();
//! let detector = Detector::new(config).unwrap();
//!
//! let source = GrayImage::new(2048, 2048).unwrap();
//! let mask = Mask::new(2048, 2048).unwrap();
//! let report = detector.detect(&mask, &source).unwrap();
//! println!("{} bacilli among {} components", report.positives(), report.num_components);
//! ```
//!
//! # Features
//!
//! - `parallel`: classify candidates on the rayon thread pool

pub mod annotate;
pub mod candidate;
pub mod classify;
pub mod config;
mod error;
pub mod moments;
pub mod pipeline;

pub use error::{RecogError, RecogResult};

// Re-export commonly used types
pub use annotate::{
    AnnotationBuilder, Annotations, BOX_MARGIN, Corners, Detection, draw_component_boxes,
};
pub use candidate::{
    Candidate, CandidateExtractor, CandidateOptions, CandidateSet, Centroid, EdgePolicy,
    PATCH_SIZE, remove_blank,
};
pub use classify::{
    Classifier, ClassifierStrategy, ClassifyInput, Label, LearnedScorer, ShapeRule, TrainedModel,
    build_classifier,
};
pub use config::DetectorConfig;
pub use moments::{Moments, hu_moments};
pub use pipeline::{DetectionReport, Detector};

// Re-export core for convenience
pub use tbdetect_core;
