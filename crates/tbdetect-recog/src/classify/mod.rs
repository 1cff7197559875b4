//! Candidate classification
//!
//! Three interchangeable strategies label each candidate as bacillus or
//! background:
//!
//! 1. [`ShapeRule`] - third Hu invariant of the mask under the component
//!    box, with an area veto
//! 2. [`TrainedModel`] - a trained model over `[w, h, area]`
//! 3. [`LearnedScorer`] - a small convolutional network over the
//!    normalized patch
//!
//! Candidates are classified independently, so a classifier fans out over
//! them. With the `parallel` feature the fan-out runs on the rayon pool;
//! labels keep the candidate order either way.
//!
//! # Example
//!
//! ```
//! use tbdetect_recog::classify::{Label, ShapeRule};
//!
//! let rule = ShapeRule::default();
//! assert_eq!(rule.decide(6e-12, 50), Label::Bacillus);
//! assert_eq!(rule.decide(6e-12, 250), Label::Background);
//! ```

mod convnet;
mod shape;
mod svm;

pub use convnet::{
    ConvNet, ConvNetWeights, ConvWeights, DENSE_THRESHOLD, DenseWeights, LearnedScorer,
    PatchScorer, normalize_patch,
};
pub use shape::{HU_THRESHOLD, MAX_BACILLUS_AREA, ShapeRule};
pub use svm::{FeatureModel, Kernel, Scaler, SvmArtifact, SvmModel, TrainedModel, stat_features};

use crate::candidate::Candidate;
use crate::config::DetectorConfig;
use crate::error::{RecogError, RecogResult};
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tbdetect_core::Mask;

/// Binary decision for one candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Label {
    Background = 0,
    Bacillus = 1,
}

impl Label {
    /// Whether this is a positive detection
    pub fn is_bacillus(self) -> bool {
        self == Label::Bacillus
    }
}

impl From<bool> for Label {
    fn from(positive: bool) -> Self {
        if positive {
            Label::Bacillus
        } else {
            Label::Background
        }
    }
}

impl From<Label> for u8 {
    fn from(label: Label) -> Self {
        label as u8
    }
}

/// Everything a classifier may look at
#[derive(Debug, Clone, Copy)]
pub struct ClassifyInput<'a> {
    /// Cleaned mask the candidates were labelled on
    pub mask: &'a Mask,
    /// Candidates, each carrying its stats row
    pub candidates: &'a [Candidate],
}

impl<'a> ClassifyInput<'a> {
    pub fn new(mask: &'a Mask, candidates: &'a [Candidate]) -> Self {
        Self { mask, candidates }
    }

    /// Number of candidates
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// Whether there is nothing to classify
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

/// A per-candidate labelling strategy
pub trait Classifier: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Label one candidate
    fn classify_one(&self, mask: &Mask, candidate: &Candidate) -> RecogResult<Label>;

    /// Label every candidate, preserving order.
    fn classify(&self, input: &ClassifyInput<'_>) -> RecogResult<Vec<Label>> {
        let labels = classify_each(input.candidates, |c| self.classify_one(input.mask, c))?;
        debug!(
            "{}: {} of {} candidates positive",
            self.name(),
            labels.iter().filter(|l| l.is_bacillus()).count(),
            labels.len()
        );
        Ok(labels)
    }
}

#[cfg(feature = "parallel")]
fn classify_each<F>(candidates: &[Candidate], f: F) -> RecogResult<Vec<Label>>
where
    F: Fn(&Candidate) -> RecogResult<Label> + Send + Sync,
{
    use rayon::prelude::*;
    candidates.par_iter().map(f).collect()
}

#[cfg(not(feature = "parallel"))]
fn classify_each<F>(candidates: &[Candidate], f: F) -> RecogResult<Vec<Label>>
where
    F: Fn(&Candidate) -> RecogResult<Label> + Send + Sync,
{
    candidates.iter().map(f).collect()
}

/// Which classifier the detector uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierStrategy {
    #[default]
    ShapeRule,
    TrainedModel,
    LearnedScorer,
}

fn require_path<'a>(path: Option<&'a Path>, key: &str) -> RecogResult<&'a Path> {
    path.ok_or_else(|| {
        RecogError::InvalidParameter(format!("{} must be set for the selected classifier", key))
    })
}

/// Build the classifier selected by `config`, loading its model artifact.
///
/// # Errors
///
/// Returns [`RecogError::ModelLoad`] if the artifact is missing or
/// malformed, and [`RecogError::InvalidParameter`] if no path is configured.
pub fn build_classifier(config: &DetectorConfig) -> RecogResult<Box<dyn Classifier>> {
    let classifier: Box<dyn Classifier> = match config.classifier_strategy {
        ClassifierStrategy::ShapeRule => Box::new(ShapeRule::default()),
        ClassifierStrategy::TrainedModel => {
            let path = require_path(config.svm_model_path.as_deref(), "svm_model_path")?;
            Box::new(TrainedModel::new(Box::new(SvmModel::load(path)?)))
        }
        ClassifierStrategy::LearnedScorer => {
            let path = require_path(config.scorer_model_path.as_deref(), "scorer_model_path")?;
            Box::new(LearnedScorer::new(Box::new(ConvNet::load(path)?)))
        }
    };
    debug!("using {} classifier", classifier.name());
    Ok(classifier)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_values() {
        assert_eq!(u8::from(Label::Background), 0);
        assert_eq!(u8::from(Label::Bacillus), 1);
        assert_eq!(Label::from(true), Label::Bacillus);
        assert!(!Label::from(false).is_bacillus());
    }

    #[test]
    fn test_build_default_is_shape_rule() {
        let classifier = build_classifier(&DetectorConfig::default()).unwrap();
        assert_eq!(classifier.name(), "shape_rule");
    }

    #[test]
    fn test_build_requires_model_path() {
        let config = DetectorConfig {
            classifier_strategy: ClassifierStrategy::TrainedModel,
            ..DetectorConfig::default()
        };
        assert!(matches!(
            build_classifier(&config),
            Err(RecogError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_build_missing_artifact() {
        let config = DetectorConfig {
            classifier_strategy: ClassifierStrategy::LearnedScorer,
            scorer_model_path: Some("/nonexistent/scorer.json".into()),
            ..DetectorConfig::default()
        };
        assert!(matches!(
            build_classifier(&config),
            Err(RecogError::ModelLoad { .. })
        ));
    }

    #[test]
    fn test_strategy_serde_names() {
        let s: ClassifierStrategy = serde_json::from_str("\"learned_scorer\"").unwrap();
        assert_eq!(s, ClassifierStrategy::LearnedScorer);
    }
}
