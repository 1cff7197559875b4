//! Binary morphology with rectangular bricks
//!
//! Masks produced by adaptive thresholding are cleaned with an opening
//! followed by a closing using a 2x2 brick.
//!
//! A brick of size `w x h` has its origin at `(w / 2, h / 2)`. Erosion reads
//! the brick offsets as given, dilation reads them reflected, so that
//! opening never adds foreground and closing never removes it. Pixels
//! outside the mask never constrain the result: they count as foreground
//! for erosion and as background for dilation.

use crate::error::{RegionError, RegionResult};
use tbdetect_core::{BACKGROUND, FOREGROUND, Mask};

/// Brick size used by [`remove_noise`]
pub const NOISE_BRICK_SIZE: u32 = 2;

/// Offsets `(dx, dy)` of every hit in a `w x h` brick
fn brick_offsets(w: u32, h: u32) -> RegionResult<Vec<(i32, i32)>> {
    if w == 0 || h == 0 {
        return Err(RegionError::InvalidParameters(format!(
            "brick must be at least 1x1, got {}x{}",
            w, h
        )));
    }
    let (cx, cy) = ((w / 2) as i32, (h / 2) as i32);
    Ok((0..h as i32)
        .flat_map(|j| (0..w as i32).map(move |i| (i - cx, j - cy)))
        .collect())
}

/// Apply one pass. `all` selects erosion (every in-bounds hit must be set)
/// versus dilation (any in-bounds hit set).
fn apply(mask: &Mask, offsets: &[(i32, i32)], all: bool) -> Mask {
    let (width, height) = mask.dimensions();
    let mut out = mask.clone();
    for y in 0..height {
        for x in 0..width {
            let mut hits = offsets.iter().filter_map(|&(dx, dy)| {
                let sx = x as i32 + dx;
                let sy = y as i32 + dy;
                if sx < 0 || sy < 0 || sx >= width as i32 || sy >= height as i32 {
                    None
                } else {
                    Some(mask.get_pixel_unchecked(sx as u32, sy as u32) == FOREGROUND)
                }
            });
            let on = if all {
                hits.all(|v| v)
            } else {
                hits.any(|v| v)
            };
            out.set_pixel_unchecked(x, y, if on { FOREGROUND } else { BACKGROUND });
        }
    }
    out
}

/// Erode a mask with a `w x h` brick
///
/// # Errors
///
/// Returns [`RegionError::InvalidParameters`] if either brick side is 0.
pub fn erode_brick(mask: &Mask, w: u32, h: u32) -> RegionResult<Mask> {
    let offsets = brick_offsets(w, h)?;
    Ok(apply(mask, &offsets, true))
}

/// Dilate a mask with a `w x h` brick
///
/// # Errors
///
/// Returns [`RegionError::InvalidParameters`] if either brick side is 0.
pub fn dilate_brick(mask: &Mask, w: u32, h: u32) -> RegionResult<Mask> {
    let reflected: Vec<(i32, i32)> = brick_offsets(w, h)?
        .into_iter()
        .map(|(dx, dy)| (-dx, -dy))
        .collect();
    Ok(apply(mask, &reflected, false))
}

/// Open a mask with a `w x h` brick
///
/// Opening = Erosion followed by Dilation.
/// Removes foreground smaller than the brick.
pub fn open_brick(mask: &Mask, w: u32, h: u32) -> RegionResult<Mask> {
    let eroded = erode_brick(mask, w, h)?;
    dilate_brick(&eroded, w, h)
}

/// Close a mask with a `w x h` brick
///
/// Closing = Dilation followed by Erosion.
/// Fills holes smaller than the brick.
pub fn close_brick(mask: &Mask, w: u32, h: u32) -> RegionResult<Mask> {
    let dilated = dilate_brick(mask, w, h)?;
    erode_brick(&dilated, w, h)
}

/// Open then close with a 2x2 brick.
pub fn remove_noise(mask: &Mask) -> RegionResult<Mask> {
    let opened = open_brick(mask, NOISE_BRICK_SIZE, NOISE_BRICK_SIZE)?;
    close_brick(&opened, NOISE_BRICK_SIZE, NOISE_BRICK_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask_with(width: u32, height: u32, pixels: &[(u32, u32)]) -> Mask {
        let mut mask = Mask::new(width, height).unwrap();
        for &(x, y) in pixels {
            mask.set_pixel_unchecked(x, y, FOREGROUND);
        }
        mask
    }

    fn is_subset(a: &Mask, b: &Mask) -> bool {
        a.data().iter().zip(b.data()).all(|(&p, &q)| p == BACKGROUND || q == FOREGROUND)
    }

    #[test]
    fn test_zero_brick_rejected() {
        let mask = Mask::new(4, 4).unwrap();
        assert!(erode_brick(&mask, 0, 2).is_err());
        assert!(dilate_brick(&mask, 2, 0).is_err());
    }

    #[test]
    fn test_identity_brick() {
        let mask = mask_with(5, 5, &[(1, 1), (3, 4)]);
        assert_eq!(erode_brick(&mask, 1, 1).unwrap(), mask);
        assert_eq!(dilate_brick(&mask, 1, 1).unwrap(), mask);
    }

    #[test]
    fn test_open_removes_isolated_pixel() {
        let mut mask = mask_with(8, 8, &[(0, 7)]);
        for y in 2..5 {
            for x in 2..6 {
                mask.set_pixel_unchecked(x, y, FOREGROUND);
            }
        }
        let opened = open_brick(&mask, 2, 2).unwrap();
        assert!(!opened.is_foreground(0, 7));
        assert_eq!(opened.count_foreground(), 12);
        assert!(is_subset(&opened, &mask));
    }

    #[test]
    fn test_close_fills_hole() {
        let mut mask = Mask::new(6, 6).unwrap();
        for y in 1..5 {
            for x in 1..5 {
                mask.set_pixel_unchecked(x, y, FOREGROUND);
            }
        }
        mask.set_pixel_unchecked(2, 2, BACKGROUND);
        let closed = close_brick(&mask, 2, 2).unwrap();
        assert!(closed.is_foreground(2, 2));
        assert!(is_subset(&mask, &closed));
    }

    #[test]
    fn test_dilate_grows_toward_origin() {
        // origin (1, 1) of a 2x2 brick: reflected hits reach right and down
        let mask = mask_with(4, 4, &[(1, 1)]);
        let dilated = dilate_brick(&mask, 2, 2).unwrap();
        assert_eq!(dilated.count_foreground(), 4);
        assert!(dilated.is_foreground(0, 0));
        assert!(!dilated.is_foreground(2, 2));
    }

    #[test]
    fn test_remove_noise_is_stable() {
        let mut mask = Mask::new(10, 10).unwrap();
        for y in 3..7 {
            for x in 2..8 {
                mask.set_pixel_unchecked(x, y, FOREGROUND);
            }
        }
        assert_eq!(remove_noise(&mask).unwrap(), mask);
    }
}
