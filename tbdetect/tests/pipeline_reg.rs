//! End-to-end regression test through the umbrella crate
//!
//! Run with:
//! ```
//! cargo test -p tbdetect --test pipeline_reg
//! cargo test -p tbdetect --features parallel --test pipeline_reg
//! ```

use tbdetect::region::ThresholdAlgorithm;
use tbdetect::{Detector, DetectorConfig, Label, Mask};
use tbdetect_test::{RegParams, fill_rect, smear_from_mask};

const GRID: u32 = 4;
const PITCH: u32 = 40;

/// L shapes and 8x2 rods on a checkerboard, L where `row + col` is even
fn grid_scene() -> Mask {
    let mut mask = Mask::new(180, 180).unwrap();
    for row in 0..GRID {
        for col in 0..GRID {
            let (x, y) = (20 + PITCH * col, 20 + PITCH * row);
            if (row + col) % 2 == 0 {
                fill_rect(&mut mask, x, y, 1, 8);
                fill_rect(&mut mask, x + 1, y + 7, 4, 1);
            } else {
                fill_rect(&mut mask, x, y, 8, 2);
            }
        }
    }
    mask
}

fn hard_detector() -> Detector {
    let config = DetectorConfig {
        threshold_algorithm: ThresholdAlgorithm::Hard,
        ..DetectorConfig::default()
    };
    Detector::new(config).unwrap()
}

#[test]
fn pipeline_reg() {
    let mut rp = RegParams::new("pipeline");

    let mask = grid_scene();
    let source = smear_from_mask(&mask, 11).unwrap();
    let report = hard_detector().detect(&mask, &source).unwrap();

    let n = (GRID * GRID) as usize;
    rp.compare_values(n as f64, report.num_components as f64, 0.0);
    rp.compare_values(n as f64, report.labels.len() as f64, 0.0);
    rp.compare_values((n / 2) as f64, report.positives() as f64, 0.0);
    rp.compare_values(0.0, report.skipped_candidates as f64, 0.0);

    // labels and boxes follow raster order of the components
    let expected: Vec<Label> = (0..GRID)
        .flat_map(|row| (0..GRID).map(move |col| Label::from((row + col) % 2 == 0)))
        .collect();
    rp.check(report.labels == expected, "checkerboard labels in order");
    for (i, det) in report.detections.iter().enumerate() {
        let (row, col) = (i as u32 / GRID, i as u32 % GRID);
        rp.compare_values((15 + PITCH * col) as f64, det.bbox.x as f64, 0.0);
        rp.compare_values((15 + PITCH * row) as f64, det.bbox.y as f64, 0.0);
        rp.check(det.label == expected[i], "detection carries its label");
    }
    rp.compare_values(
        (n / 2) as f64,
        report.annotations.positive.len() as f64,
        0.0,
    );

    assert!(rp.cleanup());
}

#[cfg(feature = "parallel")]
#[test]
fn parallel_classification_is_stable() {
    let mut rp = RegParams::new("pipeline_parallel");

    let mask = grid_scene();
    let source = smear_from_mask(&mask, 11).unwrap();
    let detector = hard_detector();
    let first = detector.detect(&mask, &source).unwrap();
    for _ in 0..8 {
        let again = detector.detect(&mask, &source).unwrap();
        rp.check(again.labels == first.labels, "labels repeat");
        rp.check(again.detections == first.detections, "detections repeat");
    }

    assert!(rp.cleanup());
}
