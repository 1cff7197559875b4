//! Detector configuration
//!
//! Every field has a default, so a JSON object only needs the keys it
//! changes. Unknown keys are rejected:
//!
//! ```json
//! { "threshold_algorithm": "adaptive_gaussian", "classifier_strategy": "trained_model",
//!   "svm_model_path": "models/svm.json" }
//! ```

use crate::candidate::{CandidateOptions, EdgePolicy, PATCH_SIZE};
use crate::classify::ClassifierStrategy;
use crate::error::{RecogError, RecogResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tbdetect_region::{
    BridgeMode, CleanOptions, ConnectivityType, DEFAULT_BLACK_PIXEL_THRESHOLD,
    DEFAULT_SPECK_MIN_AREA, DEFAULT_TILE_SIZE, PostprocessOptions, ThresholdAlgorithm,
    TileFilterOptions,
};

/// Settings of a [`crate::Detector`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DetectorConfig {
    /// Connectivity for component labelling (4 or 8)
    pub connectivity: ConnectivityType,
    /// Components smaller than this are erased as specks
    pub speck_min_area: u32,
    /// Tile edge length for split-Otsu masks
    pub tile_size: u32,
    /// Tiles with more background pixels than this are erased; a kept tile
    /// holds at least `tile_size^2 - black_pixel_threshold` foreground pixels
    pub black_pixel_threshold: u32,
    /// Candidate patch edge length
    pub patch_size: u32,
    pub classifier_strategy: ClassifierStrategy,
    /// Algorithm that produced the input masks
    pub threshold_algorithm: ThresholdAlgorithm,
    pub bridge_gaps: bool,
    pub bridge_mode: BridgeMode,
    pub edge_policy: EdgePolicy,
    /// SVM artifact for [`ClassifierStrategy::TrainedModel`]
    pub svm_model_path: Option<PathBuf>,
    /// Network weights for [`ClassifierStrategy::LearnedScorer`]
    pub scorer_model_path: Option<PathBuf>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            connectivity: ConnectivityType::EightWay,
            speck_min_area: DEFAULT_SPECK_MIN_AREA,
            tile_size: DEFAULT_TILE_SIZE,
            black_pixel_threshold: DEFAULT_BLACK_PIXEL_THRESHOLD,
            patch_size: PATCH_SIZE,
            classifier_strategy: ClassifierStrategy::ShapeRule,
            threshold_algorithm: ThresholdAlgorithm::Otsu,
            bridge_gaps: true,
            bridge_mode: BridgeMode::RasterOrder,
            edge_policy: EdgePolicy::PadTopLeft,
            svm_model_path: None,
            scorer_model_path: None,
        }
    }
}

impl DetectorConfig {
    /// Parse a configuration from JSON text
    ///
    /// # Errors
    ///
    /// Returns [`RecogError::InvalidParameter`] on malformed JSON or
    /// out-of-range values.
    pub fn from_json_str(json: &str) -> RecogResult<Self> {
        let invalid = |e: serde_json::Error| RecogError::InvalidParameter(format!("config: {}", e));
        let value: serde_json::Value = serde_json::from_str(json).map_err(invalid)?;
        if !value.is_object() {
            return Err(RecogError::InvalidParameter(
                "config: expected a JSON object".to_string(),
            ));
        }
        let config: DetectorConfig = serde_json::from_value(value).map_err(invalid)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a configuration file
    pub fn load(path: impl AsRef<Path>) -> RecogResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            RecogError::InvalidParameter(format!("config {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&text)
    }

    /// Serialize to pretty JSON
    pub fn to_json_string(&self) -> RecogResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| RecogError::InvalidParameter(format!("config: {}", e)))
    }

    /// Check value ranges
    pub fn validate(&self) -> RecogResult<()> {
        if self.tile_size == 0 {
            return Err(RecogError::InvalidParameter("tile_size must be > 0".to_string()));
        }
        if self.patch_size == 0 {
            return Err(RecogError::InvalidParameter("patch_size must be > 0".to_string()));
        }
        Ok(())
    }

    /// Cleaning options derived from this configuration
    pub fn postprocess_options(&self) -> PostprocessOptions {
        PostprocessOptions {
            algorithm: self.threshold_algorithm,
            clean: CleanOptions {
                connectivity: self.connectivity,
                speck_min_area: self.speck_min_area,
                bridge_gaps: self.bridge_gaps,
                bridge_mode: self.bridge_mode,
            },
            tile: TileFilterOptions::default()
                .with_tile_size(self.tile_size)
                .with_black_pixel_threshold(self.black_pixel_threshold),
        }
    }

    /// Candidate extraction options derived from this configuration
    pub fn candidate_options(&self) -> CandidateOptions {
        CandidateOptions::default()
            .with_patch_size(self.patch_size)
            .with_edge_policy(self.edge_policy)
    }
}
