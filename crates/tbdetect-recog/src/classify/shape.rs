//! Shape-statistics rule

use super::{Classifier, Label};
use crate::candidate::Candidate;
use crate::error::RecogResult;
use crate::moments::hu_moments;
use tbdetect_core::Mask;

/// Minimum third Hu invariant of a bacillus
pub const HU_THRESHOLD: f64 = 5e-12;

/// Components larger than this are never bacilli
pub const MAX_BACILLUS_AREA: u32 = 200;

/// Labels a candidate from the third Hu invariant of the mask under its
/// bounding box, vetoed by area.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeRule {
    /// `hu[2]` at or above this is a bacillus
    pub hu_threshold: f64,
    /// Area above this is background regardless of shape
    pub max_area: u32,
}

impl Default for ShapeRule {
    fn default() -> Self {
        Self {
            hu_threshold: HU_THRESHOLD,
            max_area: MAX_BACILLUS_AREA,
        }
    }
}

impl ShapeRule {
    /// The rule itself. The area veto wins over the moment test.
    pub fn decide(&self, hu: f64, area: u32) -> Label {
        Label::from(hu >= self.hu_threshold && area <= self.max_area)
    }
}

impl Classifier for ShapeRule {
    fn name(&self) -> &'static str {
        "shape_rule"
    }

    fn classify_one(&self, mask: &Mask, candidate: &Candidate) -> RecogResult<Label> {
        let hu = hu_moments(mask, &candidate.stat.bounds());
        Ok(self.decide(hu[2], candidate.stat.area))
    }
}
