//! Convolutional patch scorer
//!
//! Inference-only forward pass of the patch network:
//!
//! ```text
//! patch 1xSxS -> conv3x3 -> ReLU -> maxpool2 -> conv3x3 -> ReLU -> maxpool2
//!             -> flatten -> fc -> ReLU -> fc -> sigmoid
//! ```
//!
//! Weights come from a JSON artifact ([`ConvNetWeights`]) with `conv1`,
//! `conv2`, `fc1` and `fc2` layers. Convolution weights are laid out
//! `[out][in][ky][kx]` and dense weights `[out][in]`, both row-major.
//! A [`ConvNet`] only exists once every layer width has been checked
//! against its neighbours.

use super::{Classifier, Label};
use crate::candidate::{Candidate, PATCH_SIZE};
use crate::error::{RecogError, RecogResult};
use ndarray::{Array, Array1, Array2, Array3, Array4, Axis, Dimension, s};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tbdetect_core::{FPix, Mask};

/// Scores above this are bacilli
pub const DENSE_THRESHOLD: f32 = 0.5;

/// Rescale a patch to `[-0.5, 0.5]`.
///
/// `(p - min) / (max - min) - 0.5`; a constant patch is returned unchanged.
pub fn normalize_patch(patch: &FPix) -> FPix {
    match (patch.min_value(), patch.max_value()) {
        (Some(min), Some(max)) if max != min => {
            let scale = 1.0 / (max - min);
            patch.linear_combination(scale, -min * scale - 0.5)
        }
        _ => patch.clone(),
    }
}

/// Something that maps a normalized patch to a probability
pub trait PatchScorer: Send + Sync {
    /// Expected patch edge length
    fn input_size(&self) -> u32;

    /// Probability that the patch shows a bacillus
    fn score(&self, patch: &FPix) -> RecogResult<f32>;
}

fn default_padding() -> usize {
    1
}

fn default_input_size() -> u32 {
    PATCH_SIZE
}

/// Serialized 2D convolution layer, stride 1
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvWeights {
    pub in_channels: usize,
    pub out_channels: usize,
    pub kernel_size: usize,
    #[serde(default = "default_padding")]
    pub padding: usize,
    pub weight: Vec<f32>,
    pub bias: Vec<f32>,
}

/// Serialized fully connected layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseWeights {
    pub in_features: usize,
    pub out_features: usize,
    pub weight: Vec<f32>,
    pub bias: Vec<f32>,
}

/// Weights artifact of a [`ConvNet`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvNetWeights {
    #[serde(default = "default_input_size")]
    pub input_size: u32,
    pub conv1: ConvWeights,
    pub conv2: ConvWeights,
    pub fc1: DenseWeights,
    pub fc2: DenseWeights,
}

fn relu<D: Dimension>(mut x: Array<f32, D>) -> Array<f32, D> {
    x.mapv_inplace(|v| v.max(0.0));
    x
}

/// 2x2 max pooling with stride 2; odd trailing rows and columns are dropped
fn max_pool2(input: &Array3<f32>) -> Array3<f32> {
    let (c, h, w) = input.dim();
    Array3::from_shape_fn((c, h / 2, w / 2), |(ch, y, x)| {
        input
            .slice(s![ch, 2 * y..2 * y + 2, 2 * x..2 * x + 2])
            .fold(f32::NEG_INFINITY, |m, &v| m.max(v))
    })
}

#[derive(Debug, Clone, PartialEq)]
struct Conv2d {
    /// `(out, in, ky, kx)`
    weight: Array4<f32>,
    bias: Array1<f32>,
    padding: usize,
}

impl Conv2d {
    fn new(layer: ConvWeights, name: &str) -> Result<Self, String> {
        let (o, i, k) = (layer.out_channels, layer.in_channels, layer.kernel_size);
        if k == 0 || o == 0 || i == 0 {
            return Err(format!("{}: empty layer", name));
        }
        if layer.bias.len() != o {
            return Err(format!("{}: {} biases, expected {}", name, layer.bias.len(), o));
        }
        let n = layer.weight.len();
        let weight = Array4::from_shape_vec((o, i, k, k), layer.weight)
            .map_err(|_| format!("{}: {} weights, expected {}", name, n, o * i * k * k))?;
        Ok(Self {
            weight,
            bias: Array1::from(layer.bias),
            padding: layer.padding,
        })
    }

    fn out_channels(&self) -> usize {
        self.weight.dim().0
    }

    fn in_channels(&self) -> usize {
        self.weight.dim().1
    }

    fn kernel_size(&self) -> usize {
        self.weight.dim().2
    }

    /// Output edge length for an input edge length
    fn output_size(&self, size: usize) -> usize {
        (size + 2 * self.padding + 1).saturating_sub(self.kernel_size())
    }

    fn forward(&self, input: &Array3<f32>) -> Array3<f32> {
        let (_, h, w) = input.dim();
        let (k, p) = (self.kernel_size(), self.padding);
        let mut padded = Array3::<f32>::zeros((self.in_channels(), h + 2 * p, w + 2 * p));
        padded.slice_mut(s![.., p..p + h, p..p + w]).assign(input);

        let (oh, ow) = (self.output_size(h), self.output_size(w));
        let mut out = Array3::<f32>::zeros((self.out_channels(), oh, ow));
        for (o, mut plane) in out.axis_iter_mut(Axis(0)).enumerate() {
            plane.fill(self.bias[o]);
            for i in 0..self.in_channels() {
                for ky in 0..k {
                    for kx in 0..k {
                        let window = padded.slice(s![i, ky..ky + oh, kx..kx + ow]);
                        plane.scaled_add(self.weight[[o, i, ky, kx]], &window);
                    }
                }
            }
        }
        out
    }

    fn to_weights(&self) -> ConvWeights {
        let (out_channels, in_channels, kernel_size, _) = self.weight.dim();
        ConvWeights {
            in_channels,
            out_channels,
            kernel_size,
            padding: self.padding,
            weight: self.weight.iter().copied().collect(),
            bias: self.bias.to_vec(),
        }
    }
}


#[derive(Debug, Clone, PartialEq)]
struct Dense {
    /// `(out, in)`
    weight: Array2<f32>,
    bias: Array1<f32>,
}

impl Dense {
    fn new(layer: DenseWeights, name: &str) -> Result<Self, String> {
        let (o, i) = (layer.out_features, layer.in_features);
        if i == 0 || o == 0 {
            return Err(format!("{}: empty layer", name));
        }
        if layer.bias.len() != o {
            return Err(format!("{}: {} biases, expected {}", name, layer.bias.len(), o));
        }
        let n = layer.weight.len();
        let weight = Array2::from_shape_vec((o, i), layer.weight)
            .map_err(|_| format!("{}: {} weights, expected {}x{}", name, n, o, i))?;
        Ok(Self {
            weight,
            bias: Array1::from(layer.bias),
        })
    }

    fn in_features(&self) -> usize {
        self.weight.ncols()
    }

    fn out_features(&self) -> usize {
        self.weight.nrows()
    }

    fn forward(&self, input: &Array1<f32>) -> Array1<f32> {
        self.weight.dot(input) + &self.bias
    }

    fn to_weights(&self) -> DenseWeights {
        DenseWeights {
            in_features: self.in_features(),
            out_features: self.out_features(),
            weight: self.weight.iter().copied().collect(),
            bias: self.bias.to_vec(),
        }
    }
}


/// Two convolution blocks followed by two dense layers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ConvNetWeights", into = "ConvNetWeights")]
pub struct ConvNet {
    input_size: u32,
    conv1: Conv2d,
    conv2: Conv2d,
    fc1: Dense,
    fc2: Dense,
}

impl TryFrom<ConvNetWeights> for ConvNet {
    type Error = String;

    fn try_from(weights: ConvNetWeights) -> Result<Self, String> {
        let net = ConvNet {
            input_size: weights.input_size,
            conv1: Conv2d::new(weights.conv1, "conv1")?,
            conv2: Conv2d::new(weights.conv2, "conv2")?,
            fc1: Dense::new(weights.fc1, "fc1")?,
            fc2: Dense::new(weights.fc2, "fc2")?,
        };

        if net.conv1.in_channels() != 1 {
            return Err("conv1 must take a single channel".to_string());
        }
        if net.conv2.in_channels() != net.conv1.out_channels() {
            return Err(format!(
                "conv2 takes {} channels, conv1 produces {}",
                net.conv2.in_channels(),
                net.conv1.out_channels()
            ));
        }
        if net.conv1.output_size(net.input_size as usize) < 2 {
            return Err(format!("conv1 kernel too large for {} px input", net.input_size));
        }
        let s = net.feature_size();
        let flat = net.conv2.out_channels() * s * s;
        if s == 0 || net.fc1.in_features() != flat {
            return Err(format!(
                "fc1 takes {} features, conv stack produces {}",
                net.fc1.in_features(),
                flat
            ));
        }
        if net.fc2.in_features() != net.fc1.out_features() || net.fc2.out_features() != 1 {
            return Err(format!("fc2 must map {} features to 1", net.fc1.out_features()));
        }
        Ok(net)
    }
}

impl From<ConvNet> for ConvNetWeights {
    fn from(net: ConvNet) -> Self {
        ConvNetWeights {
            input_size: net.input_size,
            conv1: net.conv1.to_weights(),
            conv2: net.conv2.to_weights(),
            fc1: net.fc1.to_weights(),
            fc2: net.fc2.to_weights(),
        }
    }
}

impl ConvNet {
    /// Build a network from in-memory weights
    ///
    /// # Errors
    ///
    /// Returns [`RecogError::InvalidParameter`] if the layer widths do not
    /// chain.
    pub fn from_weights(weights: ConvNetWeights) -> RecogResult<Self> {
        Self::try_from(weights).map_err(RecogError::InvalidParameter)
    }

    /// Parse and check a network from JSON text
    pub fn from_json_str(json: &str) -> Result<Self, String> {
        serde_json::from_str(json).map_err(|e| e.to_string())
    }

    /// Load a weights artifact
    ///
    /// # Errors
    ///
    /// Returns [`RecogError::ModelLoad`] if the file cannot be read or the
    /// layer widths do not chain.
    pub fn load(path: impl AsRef<Path>) -> RecogResult<Self> {
        let path = path.as_ref();
        let load_err = |message: String| RecogError::ModelLoad {
            path: path.to_path_buf(),
            message,
        };
        let text = fs::read_to_string(path).map_err(|e| load_err(e.to_string()))?;
        Self::from_json_str(&text).map_err(load_err)
    }

    /// Edge length of the last feature map
    fn feature_size(&self) -> usize {
        let s = self.conv1.output_size(self.input_size as usize) / 2;
        self.conv2.output_size(s) / 2
    }

    /// Raw logit for one patch of `input_size` squared pixels
    fn logit(&self, patch: &FPix) -> f32 {
        let n = self.input_size as usize;
        let x = Array3::from_shape_fn((1, n, n), |(_, y, x)| {
            patch.get_pixel_unchecked(x as u32, y as u32)
        });
        let x = max_pool2(&relu(self.conv1.forward(&x)));
        let x = max_pool2(&relu(self.conv2.forward(&x)));
        let flat: Array1<f32> = x.iter().copied().collect();
        let hidden = relu(self.fc1.forward(&flat));
        self.fc2.forward(&hidden)[0]
    }
}

impl PatchScorer for ConvNet {
    fn input_size(&self) -> u32 {
        self.input_size
    }

    fn score(&self, patch: &FPix) -> RecogResult<f32> {
        let n = self.input_size;
        if patch.dimensions() != (n, n) {
            return Err(RecogError::ShapeMismatch {
                expected: format!("{}x{} patch", n, n),
                actual: format!("{}x{} patch", patch.width(), patch.height()),
            });
        }
        let z = self.logit(patch);
        Ok(1.0 / (1.0 + (-z).exp()))
    }
}

/// Classifier over normalized patches
pub struct LearnedScorer {
    scorer: Box<dyn PatchScorer>,
}

impl LearnedScorer {
    pub fn new(scorer: Box<dyn PatchScorer>) -> Self {
        Self { scorer }
    }
}

impl Classifier for LearnedScorer {
    fn name(&self) -> &'static str {
        "learned_scorer"
    }

    fn classify_one(&self, _mask: &Mask, candidate: &Candidate) -> RecogResult<Label> {
        let p = self.scorer.score(&normalize_patch(&candidate.patch))?;
        Ok(Label::from(p > DENSE_THRESHOLD))
    }
}
