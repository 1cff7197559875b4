//! Trained model over component statistics
//!
//! Positions are stripped from each stats row; the model sees
//! `[w, h, area]` only. The shipped model is a kernel SVM read from a JSON
//! artifact exported from the training environment:
//!
//! ```json
//! {
//!   "kernel": { "type": "rbf", "gamma": 0.01 },
//!   "support_vectors": [[12.0, 3.0, 30.0], [40.0, 38.0, 900.0]],
//!   "dual_coef": [1.0, -1.0],
//!   "intercept": 0.0,
//!   "scaler": { "mean": [10.0, 10.0, 60.0], "scale": [5.0, 5.0, 80.0] }
//! }
//! ```
//!
//! A positive decision value is a bacillus.

use super::{Classifier, Label};
use crate::candidate::Candidate;
use crate::error::{RecogError, RecogResult};
use ndarray::{Array1, Array2, ArrayView2};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tbdetect_core::Mask;
use tbdetect_region::ComponentStat;

/// Feature vector of a stats row: `[w, h, area]`
pub fn stat_features(stat: &ComponentStat) -> [f64; 3] {
    [stat.w as f64, stat.h as f64, stat.area as f64]
}

/// A model that scores a fixed-length feature vector
pub trait FeatureModel: Send + Sync {
    /// Expected feature vector length
    fn n_features(&self) -> usize;

    /// Signed decision value; positive means bacillus
    fn decision_function(&self, features: &[f64]) -> RecogResult<f64>;
}

/// SVM kernel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Kernel {
    Linear,
    Rbf { gamma: f64 },
    Poly { gamma: f64, coef0: f64, degree: i32 },
}

impl Kernel {
    /// Kernel value of every support vector (row of `vectors`) against `x`
    fn eval(&self, vectors: ArrayView2<'_, f64>, x: &Array1<f64>) -> Array1<f64> {
        match *self {
            Kernel::Linear => vectors.dot(x),
            Kernel::Rbf { gamma } => vectors
                .rows()
                .into_iter()
                .map(|sv| {
                    let d = &sv - x;
                    (-gamma * d.dot(&d)).exp()
                })
                .collect(),
            Kernel::Poly {
                gamma,
                coef0,
                degree,
            } => vectors.dot(x).mapv(|v| (gamma * v + coef0).powi(degree)),
        }
    }
}

/// Per-feature standardization applied before the kernel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

/// Serialized kernel SVM, as exported from the training environment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SvmArtifact {
    pub kernel: Kernel,
    pub support_vectors: Vec<Vec<f64>>,
    pub dual_coef: Vec<f64>,
    pub intercept: f64,
    #[serde(default)]
    pub scaler: Option<Scaler>,
}

/// Kernel support vector machine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SvmArtifact", into = "SvmArtifact")]
pub struct SvmModel {
    kernel: Kernel,
    /// One support vector per row
    support_vectors: Array2<f64>,
    dual_coef: Array1<f64>,
    intercept: f64,
    /// `(mean, scale)`; zero scales are stored as 1
    scaler: Option<(Array1<f64>, Array1<f64>)>,
}

impl TryFrom<SvmArtifact> for SvmModel {
    type Error = String;

    fn try_from(artifact: SvmArtifact) -> Result<Self, String> {
        let rows = artifact.support_vectors.len();
        let n = artifact.support_vectors.first().map_or(0, Vec::len);
        if rows == 0 || n == 0 {
            return Err("model has no support vectors".to_string());
        }
        if artifact.support_vectors.iter().any(|sv| sv.len() != n) {
            return Err("support vectors differ in length".to_string());
        }
        if artifact.dual_coef.len() != rows {
            return Err(format!(
                "{} dual coefficients for {} support vectors",
                artifact.dual_coef.len(),
                rows
            ));
        }
        if let Some(scaler) = &artifact.scaler
            && (scaler.mean.len() != n || scaler.scale.len() != n)
        {
            return Err(format!("scaler does not have {} features", n));
        }

        let flat: Vec<f64> = artifact.support_vectors.into_iter().flatten().collect();
        let support_vectors =
            Array2::from_shape_vec((rows, n), flat).map_err(|e| e.to_string())?;
        let scaler = artifact.scaler.map(|s| {
            let scale = Array1::from(s.scale).mapv(|v| if v == 0.0 { 1.0 } else { v });
            (Array1::from(s.mean), scale)
        });
        Ok(SvmModel {
            kernel: artifact.kernel,
            support_vectors,
            dual_coef: Array1::from(artifact.dual_coef),
            intercept: artifact.intercept,
            scaler,
        })
    }
}

impl From<SvmModel> for SvmArtifact {
    fn from(model: SvmModel) -> Self {
        SvmArtifact {
            kernel: model.kernel,
            support_vectors: model
                .support_vectors
                .rows()
                .into_iter()
                .map(|row| row.to_vec())
                .collect(),
            dual_coef: model.dual_coef.to_vec(),
            intercept: model.intercept,
            scaler: model.scaler.map(|(mean, scale)| Scaler {
                mean: mean.to_vec(),
                scale: scale.to_vec(),
            }),
        }
    }
}

impl SvmModel {
    /// Parse and check a model from JSON text
    pub fn from_json_str(json: &str) -> Result<Self, String> {
        serde_json::from_str(json).map_err(|e| e.to_string())
    }

    /// Load a model artifact
    ///
    /// # Errors
    ///
    /// Returns [`RecogError::ModelLoad`] if the file cannot be read or does
    /// not describe a consistent model.
    pub fn load(path: impl AsRef<Path>) -> RecogResult<Self> {
        let path = path.as_ref();
        let load_err = |message: String| RecogError::ModelLoad {
            path: path.to_path_buf(),
            message,
        };
        let text = fs::read_to_string(path).map_err(|e| load_err(e.to_string()))?;
        Self::from_json_str(&text).map_err(load_err)
    }
}

impl FeatureModel for SvmModel {
    fn n_features(&self) -> usize {
        self.support_vectors.ncols()
    }

    fn decision_function(&self, features: &[f64]) -> RecogResult<f64> {
        if features.len() != self.n_features() {
            return Err(RecogError::ShapeMismatch {
                expected: format!("{} features", self.n_features()),
                actual: format!("{} features", features.len()),
            });
        }
        let mut x = Array1::from(features.to_vec());
        if let Some((mean, scale)) = &self.scaler {
            x = (x - mean) / scale;
        }
        let k = self.kernel.eval(self.support_vectors.view(), &x);
        Ok(self.dual_coef.dot(&k) + self.intercept)
    }
}

/// Classifier over `[w, h, area]`
pub struct TrainedModel {
    model: Box<dyn FeatureModel>,
}

impl TrainedModel {
    pub fn new(model: Box<dyn FeatureModel>) -> Self {
        Self { model }
    }
}

impl Classifier for TrainedModel {
    fn name(&self) -> &'static str {
        "trained_model"
    }

    fn classify_one(&self, _mask: &Mask, candidate: &Candidate) -> RecogResult<Label> {
        let features = stat_features(&candidate.stat);
        let decision = self.model.decision_function(&features)?;
        Ok(Label::from(decision > 0.0))
    }
}
