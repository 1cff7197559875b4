//! Detection boxes and overlay annotations
//!
//! [`Annotations`] is what the overlay viewer consumes. Its corner pairs
//! use swapped axes: the first coordinate is the row and the second the
//! column. [`Detection`] carries the same boxes in ordinary `(x, y)`
//! image coordinates.

use crate::classify::Label;
use crate::error::{RecogError, RecogResult};
use serde::{Deserialize, Serialize};
use tbdetect_core::{GrayImage, Rect};
use tbdetect_region::ComponentStat;

/// Margin added around every component box
pub const BOX_MARGIN: i32 = 5;

/// Opposite corners of an annotation box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Corners {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

/// Annotation boxes split by label
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotations {
    pub negative: Vec<Corners>,
    pub positive: Vec<Corners>,
}

impl Annotations {
    /// Total number of boxes
    pub fn len(&self) -> usize {
        self.negative.len() + self.positive.len()
    }

    /// Whether there are no boxes at all
    pub fn is_empty(&self) -> bool {
        self.negative.is_empty() && self.positive.is_empty()
    }
}

/// One classified component in image coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Detection {
    /// Component box grown by the margin on every side
    pub bbox: Rect,
    pub label: Label,
}

/// Turns classified components into boxes
#[derive(Debug, Clone, Copy)]
pub struct AnnotationBuilder {
    margin: i32,
}

impl Default for AnnotationBuilder {
    fn default() -> Self {
        Self { margin: BOX_MARGIN }
    }
}

impl AnnotationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn check_lengths(stats: &[ComponentStat], labels: &[Label]) -> RecogResult<()> {
        if stats.len() != labels.len() {
            return Err(RecogError::ShapeMismatch {
                expected: format!("{} labels", stats.len()),
                actual: format!("{} labels", labels.len()),
            });
        }
        Ok(())
    }

    /// Corners of one component in the viewer's swapped-axis convention
    pub fn corners(&self, stat: &ComponentStat) -> Corners {
        let m = self.margin;
        let x = stat.y - m;
        let y = stat.x - m;
        Corners {
            x1: x,
            y1: y,
            x2: x + stat.h + 2 * m,
            y2: y + stat.w + 2 * m,
        }
    }

    /// Split the boxes of `stats` by their label.
    ///
    /// # Errors
    ///
    /// Returns [`RecogError::ShapeMismatch`] if `stats` and `labels`
    /// differ in length.
    pub fn build(&self, stats: &[ComponentStat], labels: &[Label]) -> RecogResult<Annotations> {
        Self::check_lengths(stats, labels)?;
        let mut annotations = Annotations::default();
        for (stat, label) in stats.iter().zip(labels) {
            let corners = self.corners(stat);
            match label {
                Label::Bacillus => annotations.positive.push(corners),
                Label::Background => annotations.negative.push(corners),
            }
        }
        Ok(annotations)
    }

    /// Labelled boxes in image coordinates.
    pub fn detections(&self, stats: &[ComponentStat], labels: &[Label]) -> RecogResult<Vec<Detection>> {
        Self::check_lengths(stats, labels)?;
        Ok(stats
            .iter()
            .zip(labels)
            .map(|(stat, &label)| Detection {
                bbox: stat.bounds().expand(self.margin),
                label,
            })
            .collect())
    }
}

/// Draw a one pixel outline around every component, grown by
/// [`BOX_MARGIN`], into a copy of `image`. Outlines are clipped to the
/// image.
pub fn draw_component_boxes(image: &GrayImage, stats: &[ComponentStat], value: u16) -> GrayImage {
    let mut out = image.clone();
    let (width, height) = (image.width() as i32, image.height() as i32);
    let mut plot = |x: i32, y: i32| {
        if x >= 0 && y >= 0 && x < width && y < height {
            out.set_pixel_unchecked(x as u32, y as u32, value);
        }
    };

    for stat in stats {
        let b = stat.bounds().expand(BOX_MARGIN);
        let (x0, y0, x1, y1) = (b.x, b.y, b.right() - 1, b.bottom() - 1);
        for x in x0..=x1 {
            plot(x, y0);
            plot(x, y1);
        }
        for y in y0..=y1 {
            plot(x0, y);
            plot(x1, y);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stat(label: u32, x: i32, y: i32, w: i32, h: i32) -> ComponentStat {
        ComponentStat {
            label,
            x,
            y,
            w,
            h,
            area: (w * h) as u32,
        }
    }

    #[test]
    fn test_corners_swap_axes() {
        let s = stat(1, 10, 20, 6, 3);
        let c = AnnotationBuilder::new().corners(&s);
        assert_eq!(c, Corners { x1: 15, y1: 5, x2: 28, y2: 21 });
    }

    #[test]
    fn test_build_splits_by_label() {
        let stats = [stat(1, 0, 0, 2, 2), stat(2, 10, 10, 3, 3), stat(3, 30, 5, 4, 1)];
        let labels = [Label::Background, Label::Bacillus, Label::Background];
        let ann = AnnotationBuilder::new().build(&stats, &labels).unwrap();
        assert_eq!(ann.negative.len(), 2);
        assert_eq!(ann.positive.len(), 1);
        assert_eq!(ann.positive[0].x1, 5);
    }

    #[test]
    fn test_zero_positives() {
        let stats = [stat(1, 0, 0, 2, 2), stat(2, 10, 10, 3, 3)];
        let labels = [Label::Background; 2];
        let ann = AnnotationBuilder::new().build(&stats, &labels).unwrap();
        assert!(ann.positive.is_empty());
        assert_eq!(ann.negative.len(), 2);
    }

    #[test]
    fn test_length_mismatch() {
        let stats = [stat(1, 0, 0, 2, 2)];
        assert!(matches!(
            AnnotationBuilder::new().build(&stats, &[]),
            Err(RecogError::ShapeMismatch { .. })
        ));
        assert!(AnnotationBuilder::new().detections(&stats, &[]).is_err());
    }

    #[test]
    fn test_detections_conventional_axes() {
        let stats = [stat(1, 10, 20, 6, 3)];
        let det = AnnotationBuilder::new()
            .detections(&stats, &[Label::Bacillus])
            .unwrap();
        assert_eq!(det[0].bbox, Rect::new_unchecked(5, 15, 16, 13));
        assert!(det[0].label.is_bacillus());
    }

    #[test]
    fn test_draw_component_boxes() {
        let image = GrayImage::new(30, 30).unwrap();
        let out = draw_component_boxes(&image, &[stat(1, 10, 10, 2, 2)], 9);
        // box spans 5..=16 on both axes
        assert_eq!(out.get_pixel(5, 5), Some(9));
        assert_eq!(out.get_pixel(16, 10), Some(9));
        assert_eq!(out.get_pixel(10, 10), Some(0));
        assert_eq!(out.get_pixel(17, 17), Some(0));

        // clipped at the border without panicking
        let out = draw_component_boxes(&image, &[stat(1, 0, 0, 1, 1)], 9);
        assert_eq!(out.get_pixel(0, 5), Some(9));
    }
}
