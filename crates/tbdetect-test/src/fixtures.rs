//! Synthetic masks and smear images
//!
//! Regression tests build their inputs here instead of loading smear
//! tiles from disk, so every test is self-contained and deterministic.

use crate::error::{TestError, TestResult};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tbdetect_core::{FOREGROUND, GrayImage, Mask};

/// Build a mask from ASCII art.
///
/// `#` is foreground, `.` is background. All rows must have the same length.
///
/// ```
/// use tbdetect_test::mask_from_rows;
///
/// let mask = mask_from_rows(&["#.#", "...", "..."]).unwrap();
/// assert_eq!(mask.count_foreground(), 2);
/// ```
pub fn mask_from_rows(rows: &[&str]) -> TestResult<Mask> {
    let height = rows.len();
    let width = rows.first().map_or(0, |r| r.chars().count());
    let mut data = Vec::with_capacity(width * height);

    for (row, line) in rows.iter().enumerate() {
        let n = line.chars().count();
        if n != width {
            return Err(TestError::RaggedFixture {
                row,
                expected: width,
                actual: n,
            });
        }
        for c in line.chars() {
            data.push(match c {
                '#' => FOREGROUND,
                '.' => 0,
                other => return Err(TestError::UnknownGlyph(other)),
            });
        }
    }

    Ok(Mask::from_data(width as u32, height as u32, data)?)
}

/// Fill the rectangle `[x0, x0 + w) x [y0, y0 + h)` with foreground.
///
/// Pixels outside the mask are ignored.
pub fn fill_rect(mask: &mut Mask, x0: u32, y0: u32, w: u32, h: u32) {
    for y in y0..(y0 + h).min(mask.height()) {
        for x in x0..(x0 + w).min(mask.width()) {
            mask.set_pixel_unchecked(x, y, FOREGROUND);
        }
    }
}

/// Random mask where each pixel is foreground with probability `density`.
pub fn random_mask(width: u32, height: u32, density: f64, seed: u64) -> TestResult<Mask> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut mask = Mask::new(width, height)?;
    for y in 0..height {
        for x in 0..width {
            if rng.random_bool(density) {
                mask.set_pixel_unchecked(x, y, FOREGROUND);
            }
        }
    }
    Ok(mask)
}

/// Smear-like source image: noisy dark background with bright pixels
/// wherever `mask` is foreground.
pub fn smear_from_mask(mask: &Mask, seed: u64) -> TestResult<GrayImage> {
    let mut rng = StdRng::seed_from_u64(seed);
    Ok(GrayImage::from_fn(mask.width(), mask.height(), |x, y| {
        let noise: u16 = rng.random_range(0..400);
        if mask.is_foreground(x, y) {
            12000 + noise
        } else {
            1500 + noise
        }
    })?)
}

/// Horizontal intensity ramp, `value = x * step + y`.
pub fn ramp_image(width: u32, height: u32, step: u16) -> TestResult<GrayImage> {
    Ok(GrayImage::from_fn(width, height, |x, y| {
        (x as u16).wrapping_mul(step).wrapping_add(y as u16)
    })?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_from_rows() {
        let mask = mask_from_rows(&["#..", ".#.", "..#"]).unwrap();
        assert_eq!(mask.dimensions(), (3, 3));
        assert!(mask.is_foreground(2, 2));
        assert!(!mask.is_foreground(1, 0));
    }

    #[test]
    fn test_mask_from_rows_errors() {
        assert!(matches!(
            mask_from_rows(&["##", "#"]),
            Err(TestError::RaggedFixture { row: 1, .. })
        ));
        assert!(matches!(
            mask_from_rows(&["#x"]),
            Err(TestError::UnknownGlyph('x'))
        ));
    }

    #[test]
    fn test_random_mask_is_deterministic() {
        let a = random_mask(32, 32, 0.3, 7).unwrap();
        let b = random_mask(32, 32, 0.3, 7).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_fill_rect_clips() {
        let mut mask = Mask::new(4, 4).unwrap();
        fill_rect(&mut mask, 2, 2, 10, 10);
        assert_eq!(mask.count_foreground(), 4);
    }
}
