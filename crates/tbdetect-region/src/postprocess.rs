//! Post-thresholding cleanup, selected by thresholding algorithm
//!
//! | algorithm | cleaning |
//! |---|---|
//! | split Otsu | tile filter, then speck removal and gap bridging |
//! | adaptive Gaussian / mean | 2x2 opening then closing |
//! | hard | none |

use crate::clean::{CleanOptions, CleanReport, clean_mask};
use crate::conncomp::{ComponentStats, extract_components};
use crate::error::RegionResult;
use crate::morph::remove_noise;
use crate::tile::{TileFilterOptions, filter_tiles};
use log::debug;
use serde::{Deserialize, Serialize};
use tbdetect_core::Mask;

/// Algorithm that produced a binary mask
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdAlgorithm {
    /// Otsu threshold computed per image tile
    #[default]
    Otsu,
    /// Adaptive threshold with a Gaussian-weighted neighbourhood
    AdaptiveGaussian,
    /// Adaptive threshold with a mean neighbourhood
    AdaptiveMean,
    /// Single global threshold
    Hard,
}

/// Options for [`postprocess`]
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PostprocessOptions {
    /// Algorithm that produced the mask
    pub algorithm: ThresholdAlgorithm,
    /// Speck removal and gap bridging
    pub clean: CleanOptions,
    /// Tile filtering
    pub tile: TileFilterOptions,
}

impl PostprocessOptions {
    /// Set the thresholding algorithm
    pub fn with_algorithm(mut self, algorithm: ThresholdAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Set the cleaning options
    pub fn with_clean(mut self, clean: CleanOptions) -> Self {
        self.clean = clean;
        self
    }

    /// Set the tile filter options
    pub fn with_tile(mut self, tile: TileFilterOptions) -> Self {
        self.tile = tile;
        self
    }
}

/// Outcome of [`postprocess`]
#[derive(Debug, Clone)]
pub struct PostprocessResult {
    /// Input mask, untouched
    pub uncleaned: Mask,
    /// Mask after cleaning
    pub cleaned: Mask,
    /// Labelling of `cleaned`
    pub stats: ComponentStats,
    /// Foreground components in `cleaned`
    pub num_components: usize,
    /// Speck removal and bridging counts; present for Otsu only
    pub clean_report: Option<CleanReport>,
}

/// Clean a thresholded mask the way its algorithm requires.
///
/// # Errors
///
/// Propagates [`crate::RegionError`] from tile filtering, morphology or
/// labelling.
pub fn postprocess(mask: &Mask, options: &PostprocessOptions) -> RegionResult<PostprocessResult> {
    let (cleaned, stats, clean_report) = match options.algorithm {
        ThresholdAlgorithm::Otsu => {
            let (mut filtered, _) = filter_tiles(mask, &options.tile)?;
            let report = clean_mask(&mut filtered, &options.clean)?;
            let stats = report.stats.clone();
            (filtered, stats, Some(report))
        }
        ThresholdAlgorithm::AdaptiveGaussian | ThresholdAlgorithm::AdaptiveMean => {
            let denoised = remove_noise(mask)?;
            let stats = extract_components(&denoised, options.clean.connectivity)?;
            (denoised, stats, None)
        }
        ThresholdAlgorithm::Hard => {
            let stats = extract_components(mask, options.clean.connectivity)?;
            (mask.clone(), stats, None)
        }
    };

    let num_components = stats.len();
    debug!(
        "postprocess({:?}): {} components",
        options.algorithm, num_components
    );

    Ok(PostprocessResult {
        uncleaned: mask.clone(),
        cleaned,
        stats,
        num_components,
        clean_report,
    })
}
