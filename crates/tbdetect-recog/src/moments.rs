//! Image moments and Hu invariants
//!
//! Moments are taken over mask intensities (0 or 255), not over a 0/1
//! indicator, so normalized moments of order `p + q` carry a factor of
//! `255^(-(p + q) / 2)`. Shape thresholds are calibrated against that scale.

use tbdetect_core::{Mask, Rect};

/// Spatial and central moments up to third order
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Moments {
    pub m00: f64,
    pub m10: f64,
    pub m01: f64,
    pub mu20: f64,
    pub mu11: f64,
    pub mu02: f64,
    pub mu30: f64,
    pub mu21: f64,
    pub mu12: f64,
    pub mu03: f64,
}

impl Moments {
    /// Moments of the part of `mask` under `rect`, in coordinates local to
    /// the rectangle. The rectangle is clipped to the mask.
    pub fn of_region(mask: &Mask, rect: &Rect) -> Self {
        let bounds = Rect::new_unchecked(0, 0, mask.width() as i32, mask.height() as i32);
        let Some(r) = rect.intersect(&bounds) else {
            return Self::default();
        };

        let pixels = || {
            (0..r.h).flat_map(move |j| {
                (0..r.w).filter_map(move |i| {
                    let v = mask.get_pixel_unchecked((r.x + i) as u32, (r.y + j) as u32);
                    (v != 0).then_some((i as f64, j as f64, v as f64))
                })
            })
        };

        let mut m = Self::default();
        for (x, y, v) in pixels() {
            m.m00 += v;
            m.m10 += x * v;
            m.m01 += y * v;
        }
        if m.m00 == 0.0 {
            return m;
        }

        let cx = m.m10 / m.m00;
        let cy = m.m01 / m.m00;
        for (x, y, v) in pixels() {
            let dx = x - cx;
            let dy = y - cy;
            m.mu20 += dx * dx * v;
            m.mu11 += dx * dy * v;
            m.mu02 += dy * dy * v;
            m.mu30 += dx * dx * dx * v;
            m.mu21 += dx * dx * dy * v;
            m.mu12 += dx * dy * dy * v;
            m.mu03 += dy * dy * dy * v;
        }
        m
    }

    /// Scale-normalized central moment `mu / m00^(1 + order / 2)`
    fn nu(&self, mu: f64, order: u32) -> f64 {
        if self.m00 == 0.0 {
            return 0.0;
        }
        mu / self.m00.powf(1.0 + order as f64 / 2.0)
    }

    /// The seven Hu invariants
    pub fn hu(&self) -> [f64; 7] {
        let n20 = self.nu(self.mu20, 2);
        let n11 = self.nu(self.mu11, 2);
        let n02 = self.nu(self.mu02, 2);
        let n30 = self.nu(self.mu30, 3);
        let n21 = self.nu(self.mu21, 3);
        let n12 = self.nu(self.mu12, 3);
        let n03 = self.nu(self.mu03, 3);

        let a = n30 + n12;
        let b = n21 + n03;
        let c = n30 - 3.0 * n12;
        let d = 3.0 * n21 - n03;

        [
            n20 + n02,
            (n20 - n02).powi(2) + 4.0 * n11 * n11,
            c * c + d * d,
            a * a + b * b,
            c * a * (a * a - 3.0 * b * b) + d * b * (3.0 * a * a - b * b),
            (n20 - n02) * (a * a - b * b) + 4.0 * n11 * a * b,
            d * a * (a * a - 3.0 * b * b) - c * b * (3.0 * a * a - b * b),
        ]
    }
}

/// Hu invariants of the mask region under `rect`
pub fn hu_moments(mask: &Mask, rect: &Rect) -> [f64; 7] {
    Moments::of_region(mask, rect).hu()
}
