//! Candidate patch extraction
//!
//! Every foreground component of the cleaned mask becomes a candidate: a
//! square window of the source image centred on the component's bounding
//! box center. Windows clipped by the image border are copied into the
//! top-left corner of a zero patch, so the bacillus is not centred in
//! border patches.

use crate::error::{RecogError, RecogResult};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use tbdetect_core::{Error as CoreError, FPix, GrayImage, Rect};
use tbdetect_region::{ComponentStat, ComponentStats};

/// Edge length of a candidate patch
pub const PATCH_SIZE: u32 = 50;

/// Integer center of a component's bounding box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Centroid {
    pub x: i32,
    pub y: i32,
}

impl From<&ComponentStat> for Centroid {
    fn from(stat: &ComponentStat) -> Self {
        let (x, y) = stat.centroid();
        Centroid { x, y }
    }
}

/// One component together with its image patch
#[derive(Debug, Clone)]
pub struct Candidate {
    /// Stats row of the component
    pub stat: ComponentStat,
    /// Center of the crop window
    pub centroid: Centroid,
    /// Source intensities around the centroid
    pub patch: FPix,
}

impl Candidate {
    /// Component label
    pub fn label(&self) -> u32 {
        self.stat.label
    }

    /// Whether the patch holds no signal at all
    pub fn is_blank(&self) -> bool {
        self.patch.max_value().is_none_or(|m| m == 0.0)
    }
}

/// Split off candidates whose patch is entirely zero.
///
/// Returns the kept candidates and the number removed.
pub fn remove_blank(candidates: Vec<Candidate>) -> (Vec<Candidate>, usize) {
    let before = candidates.len();
    let kept: Vec<Candidate> = candidates.into_iter().filter(|c| !c.is_blank()).collect();
    let removed = before - kept.len();
    (kept, removed)
}

/// Handling of candidates whose window crosses the image border
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgePolicy {
    /// Keep the candidate; the clipped window is zero padded on the
    /// bottom and right
    #[default]
    PadTopLeft,
    /// Skip the candidate
    Drop,
}

/// Options for [`CandidateExtractor`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CandidateOptions {
    /// Patch edge length
    pub patch_size: u32,
    /// Border handling
    pub edge_policy: EdgePolicy,
}

impl Default for CandidateOptions {
    fn default() -> Self {
        Self {
            patch_size: PATCH_SIZE,
            edge_policy: EdgePolicy::PadTopLeft,
        }
    }
}

impl CandidateOptions {
    /// Set the patch size
    pub fn with_patch_size(mut self, patch_size: u32) -> Self {
        self.patch_size = patch_size;
        self
    }

    /// Set the border policy
    pub fn with_edge_policy(mut self, policy: EdgePolicy) -> Self {
        self.edge_policy = policy;
        self
    }
}

/// Candidates extracted from one mask
#[derive(Debug, Clone, Default)]
pub struct CandidateSet {
    /// Candidates in label order
    pub candidates: Vec<Candidate>,
    /// Components skipped by the edge policy
    pub skipped: usize,
}

impl CandidateSet {
    /// Number of candidates
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// Whether there are no candidates
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Stats rows aligned with the candidates
    pub fn stats(&self) -> Vec<ComponentStat> {
        self.candidates.iter().map(|c| c.stat).collect()
    }
}

/// Cuts candidate patches out of a source image
pub struct CandidateExtractor<'a> {
    source: &'a GrayImage,
    options: CandidateOptions,
}

impl<'a> CandidateExtractor<'a> {
    /// Create an extractor over `source`
    ///
    /// # Errors
    ///
    /// Returns [`RecogError::InvalidParameter`] if `patch_size` is 0.
    pub fn new(source: &'a GrayImage, options: CandidateOptions) -> RecogResult<Self> {
        if options.patch_size == 0 {
            return Err(RecogError::InvalidParameter(
                "patch_size must be > 0".to_string(),
            ));
        }
        Ok(Self { source, options })
    }

    /// The options in use
    pub fn options(&self) -> &CandidateOptions {
        &self.options
    }

    /// Crop window for a centroid, before clipping
    pub fn window(&self, centroid: Centroid) -> Rect {
        let size = self.options.patch_size as i32;
        let half = size / 2;
        Rect::new_unchecked(centroid.x - half, centroid.y - half, size, size)
    }

    /// Crop the patch around `centroid`.
    ///
    /// # Errors
    ///
    /// With [`EdgePolicy::Drop`], returns [`RecogError::OutOfBoundsCandidate`]
    /// if the window does not fit inside the image.
    pub fn crop(&self, centroid: Centroid) -> RecogResult<FPix> {
        let size = self.options.patch_size;
        let window = self.window(centroid);
        let (width, height) = self.source.dimensions();
        let bounds = Rect::new_unchecked(0, 0, width as i32, height as i32);
        let mut patch = FPix::new(size, size)?;

        let valid = match window.intersect(&bounds) {
            Some(v) => v,
            None => {
                return match self.options.edge_policy {
                    EdgePolicy::PadTopLeft => Ok(patch),
                    EdgePolicy::Drop => Err(RecogError::OutOfBoundsCandidate {
                        x: centroid.x,
                        y: centroid.y,
                    }),
                };
            }
        };
        if valid != window && self.options.edge_policy == EdgePolicy::Drop {
            return Err(RecogError::OutOfBoundsCandidate {
                x: centroid.x,
                y: centroid.y,
            });
        }

        let row_len = valid.w as usize;
        for dy in 0..valid.h as u32 {
            let src = &self.source.row(valid.y as u32 + dy)[valid.x as usize..valid.x as usize + row_len];
            let dst = &mut patch.row_mut(dy)[..row_len];
            for (d, &s) in dst.iter_mut().zip(src) {
                *d = s as f32;
            }
        }
        Ok(patch)
    }

    /// Build the candidate for one component
    pub fn candidate(&self, stat: &ComponentStat) -> RecogResult<Candidate> {
        let centroid = Centroid::from(stat);
        Ok(Candidate {
            stat: *stat,
            centroid,
            patch: self.crop(centroid)?,
        })
    }

    /// Candidates for every foreground component, produced on demand
    pub fn candidates<'s>(
        &'s self,
        stats: &'s ComponentStats,
    ) -> impl Iterator<Item = RecogResult<Candidate>> + 's {
        stats.foreground().iter().map(move |stat| self.candidate(stat))
    }

    /// Extract every candidate, skipping those rejected by the edge policy.
    ///
    /// # Errors
    ///
    /// Returns [`RecogError::InsufficientCandidates`] if fewer than two
    /// foreground components exist, and a dimension mismatch if `stats`
    /// was not computed on an image of the source's size.
    pub fn extract(&self, stats: &ComponentStats) -> RecogResult<CandidateSet> {
        if stats.dimensions() != self.source.dimensions() {
            return Err(CoreError::DimensionMismatch {
                expected: self.source.dimensions(),
                actual: stats.dimensions(),
            }
            .into());
        }
        if stats.len() < 2 {
            return Err(RecogError::InsufficientCandidates { found: stats.len() });
        }

        let mut set = CandidateSet::default();
        for result in self.candidates(stats) {
            match result {
                Ok(candidate) => set.candidates.push(candidate),
                Err(RecogError::OutOfBoundsCandidate { x, y }) => {
                    warn!("skipping candidate at ({}, {}): window leaves the image", x, y);
                    set.skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }
        debug!(
            "extract: {} candidates, {} skipped",
            set.candidates.len(),
            set.skipped
        );
        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tbdetect_core::{FOREGROUND, Mask};
    use tbdetect_region::{ConnectivityType, extract_components};

    fn source(width: u32, height: u32) -> GrayImage {
        GrayImage::from_fn(width, height, |x, y| (y * 500 + x) as u16 + 1).unwrap()
    }

    fn stats_for(width: u32, height: u32, blocks: &[(u32, u32, u32, u32)]) -> ComponentStats {
        let mut mask = Mask::new(width, height).unwrap();
        for &(x0, y0, w, h) in blocks {
            for y in y0..y0 + h {
                for x in x0..x0 + w {
                    mask.set_pixel_unchecked(x, y, FOREGROUND);
                }
            }
        }
        extract_components(&mask, ConnectivityType::EightWay).unwrap()
    }

    #[test]
    fn test_interior_patch_is_centred() {
        let img = source(100, 100);
        let ex = CandidateExtractor::new(&img, CandidateOptions::default()).unwrap();
        let patch = ex.crop(Centroid { x: 50, y: 60 }).unwrap();
        assert_eq!(patch.dimensions(), (50, 50));
        // top-left of the window is (25, 35)
        assert_eq!(patch.get_pixel(0, 0).unwrap(), (35 * 500 + 25 + 1) as f32);
        assert_eq!(patch.get_pixel(49, 49).unwrap(), (84 * 500 + 74 + 1) as f32);
    }

    #[test]
    fn test_border_patch_padded_top_left() {
        let img = source(100, 100);
        let ex = CandidateExtractor::new(&img, CandidateOptions::default()).unwrap();
        let patch = ex.crop(Centroid { x: 2, y: 2 }).unwrap();
        // valid region is rows/cols 0..27, placed at the top-left
        assert_eq!(patch.get_pixel(0, 0).unwrap(), 1.0);
        assert_eq!(patch.get_pixel(26, 26).unwrap(), (26 * 500 + 26 + 1) as f32);
        assert_eq!(patch.get_pixel(27, 0).unwrap(), 0.0);
        assert_eq!(patch.get_pixel(0, 27).unwrap(), 0.0);
        assert_eq!(patch.get_pixel(49, 49).unwrap(), 0.0);
    }

    #[test]
    fn test_drop_policy_rejects_border() {
        let img = source(100, 100);
        let opts = CandidateOptions::default().with_edge_policy(EdgePolicy::Drop);
        let ex = CandidateExtractor::new(&img, opts).unwrap();
        assert!(matches!(
            ex.crop(Centroid { x: 2, y: 2 }),
            Err(RecogError::OutOfBoundsCandidate { x: 2, y: 2 })
        ));
        assert!(ex.crop(Centroid { x: 25, y: 75 }).is_ok());
        assert!(ex.crop(Centroid { x: 76, y: 50 }).is_err());
    }

    #[test]
    fn test_extract_counts_skipped() {
        let img = source(100, 100);
        let stats = stats_for(100, 100, &[(0, 0, 4, 4), (40, 40, 6, 2), (60, 50, 2, 6)]);
        let opts = CandidateOptions::default().with_edge_policy(EdgePolicy::Drop);
        let set = CandidateExtractor::new(&img, opts).unwrap().extract(&stats).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.skipped, 1);
        assert_eq!(set.candidates[0].centroid, Centroid { x: 43, y: 41 });
        assert_eq!(set.stats()[1].label, 3);
    }

    #[test]
    fn test_extract_needs_two_components() {
        let img = source(60, 60);
        let stats = stats_for(60, 60, &[(10, 10, 3, 3)]);
        let ex = CandidateExtractor::new(&img, CandidateOptions::default()).unwrap();
        assert!(matches!(
            ex.extract(&stats),
            Err(RecogError::InsufficientCandidates { found: 1 })
        ));
    }

    #[test]
    fn test_extract_dimension_mismatch() {
        let img = source(60, 60);
        let stats = stats_for(50, 60, &[(10, 10, 3, 3), (30, 30, 3, 3)]);
        let ex = CandidateExtractor::new(&img, CandidateOptions::default()).unwrap();
        assert!(matches!(ex.extract(&stats), Err(RecogError::Core(_))));
    }

    #[test]
    fn test_remove_blank() {
        let img = GrayImage::new(80, 80).unwrap();
        let stats = stats_for(80, 80, &[(10, 10, 3, 3), (50, 50, 3, 3)]);
        let ex = CandidateExtractor::new(&img, CandidateOptions::default()).unwrap();
        let set = ex.extract(&stats).unwrap();
        assert!(set.candidates.iter().all(Candidate::is_blank));
        let (kept, removed) = remove_blank(set.candidates);
        assert!(kept.is_empty());
        assert_eq!(removed, 2);
    }
}
