//! End-to-end detection on one thresholded smear tile

use crate::annotate::{AnnotationBuilder, Annotations, Detection};
use crate::candidate::CandidateExtractor;
use crate::classify::{Classifier, ClassifyInput, Label, build_classifier};
use crate::config::DetectorConfig;
use crate::error::RecogResult;
use log::info;
use tbdetect_core::{Error as CoreError, GrayImage, Mask};
use tbdetect_region::postprocess;

/// Result of [`Detector::detect`]
#[derive(Debug, Clone)]
pub struct DetectionReport {
    /// Mask after cleaning
    pub cleaned_mask: Mask,
    /// Foreground components in the cleaned mask
    pub num_components: usize,
    /// One label per classified candidate
    pub labels: Vec<Label>,
    /// Boxes in image coordinates
    pub detections: Vec<Detection>,
    /// Boxes for the overlay viewer
    pub annotations: Annotations,
    /// Components dropped by the edge policy
    pub skipped_candidates: usize,
}

impl DetectionReport {
    /// Number of bacillus detections
    pub fn positives(&self) -> usize {
        self.labels.iter().filter(|l| l.is_bacillus()).count()
    }
}

/// Mask cleanup, candidate extraction, classification and annotation
pub struct Detector {
    config: DetectorConfig,
    classifier: Box<dyn Classifier>,
}

impl Detector {
    /// Create a detector, loading the configured classifier
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or a model
    /// artifact cannot be loaded.
    pub fn new(config: DetectorConfig) -> RecogResult<Self> {
        config.validate()?;
        let classifier = build_classifier(&config)?;
        Ok(Self { config, classifier })
    }

    /// Create a detector around an existing classifier
    pub fn with_classifier(config: DetectorConfig, classifier: Box<dyn Classifier>) -> Self {
        Self { config, classifier }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Run the pipeline on a mask and the source image it was thresholded
    /// from.
    ///
    /// # Errors
    ///
    /// Fails on mismatched dimensions, on fewer than two components after
    /// cleaning, and on classifier errors.
    pub fn detect(&self, mask: &Mask, source: &GrayImage) -> RecogResult<DetectionReport> {
        if mask.dimensions() != source.dimensions() {
            return Err(CoreError::DimensionMismatch {
                expected: source.dimensions(),
                actual: mask.dimensions(),
            }
            .into());
        }

        let cleaned = postprocess(mask, &self.config.postprocess_options())?;
        let extractor = CandidateExtractor::new(source, self.config.candidate_options())?;
        let set = extractor.extract(&cleaned.stats)?;

        let input = ClassifyInput::new(&cleaned.cleaned, &set.candidates);
        let labels = self.classifier.classify(&input)?;

        let stats = set.stats();
        let builder = AnnotationBuilder::new();
        let annotations = builder.build(&stats, &labels)?;
        let detections = builder.detections(&stats, &labels)?;

        let report = DetectionReport {
            cleaned_mask: cleaned.cleaned,
            num_components: cleaned.num_components,
            labels,
            detections,
            annotations,
            skipped_candidates: set.skipped,
        };
        info!(
            "detect: {} components, {} candidates, {} positive ({} skipped) using {}",
            report.num_components,
            report.labels.len(),
            report.positives(),
            report.skipped_candidates,
            self.classifier.name()
        );
        Ok(report)
    }
}
