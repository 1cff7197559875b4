//! Mask - Binary segmentation image
//!
//! A `Mask` is the output of the thresholding collaborator: one byte per
//! pixel, foreground stored as 255 and background as 0.
//!
//! # Pixel layout
//!
//! - Data is stored row-major with no padding
//! - The pixel at (x, y) is at index `y * width + x`
//! - Any non-zero input value is normalized to [`FOREGROUND`] on the way in,
//!   so a constructed `Mask` is always strictly binary
//!
//! # Examples
//!
//! ```
//! use tbdetect_core::Mask;
//!
//! let mut mask = Mask::new(4, 3).unwrap();
//! mask.set_pixel(1, 2, 7).unwrap();
//! assert_eq!(mask.get_pixel(1, 2), Some(255));
//! assert_eq!(mask.count_foreground(), 1);
//! ```

use crate::error::{Error, Result};
use crate::rect::Rect;

/// Value of a foreground pixel
pub const FOREGROUND: u8 = 255;

/// Value of a background pixel
pub const BACKGROUND: u8 = 0;

#[inline]
fn normalize(value: u8) -> u8 {
    if value == BACKGROUND {
        BACKGROUND
    } else {
        FOREGROUND
    }
}

/// Binary mask image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    /// Width in pixels
    width: u32,
    /// Height in pixels
    height: u32,
    /// Pixel data (row-major, values 0 or 255)
    data: Vec<u8>,
}

impl Mask {
    /// Create a new all-background mask.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDimension`] if width or height is 0.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidDimension { width, height });
        }

        Ok(Mask {
            width,
            height,
            data: vec![BACKGROUND; width as usize * height as usize],
        })
    }

    /// Create a mask from raw row-major bytes.
    ///
    /// Non-zero bytes are normalized to 255.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidMask`] if the mask is empty or the data
    /// length does not match `width * height`.
    pub fn from_data(width: u32, height: u32, mut data: Vec<u8>) -> Result<Self> {
        if width == 0 || height == 0 || data.is_empty() {
            return Err(Error::InvalidMask(format!(
                "empty mask ({}x{}, {} bytes)",
                width,
                height,
                data.len()
            )));
        }

        let expected = width as usize * height as usize;
        if data.len() != expected {
            return Err(Error::InvalidMask(format!(
                "data length {} doesn't match {}x{} = {}",
                data.len(),
                width,
                height,
                expected
            )));
        }

        for v in data.iter_mut() {
            *v = normalize(*v);
        }

        Ok(Mask {
            width,
            height,
            data,
        })
    }

    /// Get the mask width in pixels
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Get the mask height in pixels
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Get the mask dimensions as (width, height)
    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Get the raw pixel data
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// Get the pixel value at (x, y), or `None` when out of bounds.
    #[inline]
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.data[self.index(x, y)])
    }

    /// Get the pixel value without bounds checking.
    ///
    /// # Panics
    ///
    /// Panics if `x >= width` or `y >= height`.
    #[inline]
    pub fn get_pixel_unchecked(&self, x: u32, y: u32) -> u8 {
        self.data[self.index(x, y)]
    }

    /// Whether (x, y) is a foreground pixel. Out-of-bounds reads are background.
    #[inline]
    pub fn is_foreground(&self, x: u32, y: u32) -> bool {
        self.get_pixel(x, y) == Some(FOREGROUND)
    }

    /// Set the pixel at (x, y). Non-zero values are stored as 255.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfBounds`] if coordinates are out of range.
    pub fn set_pixel(&mut self, x: u32, y: u32, value: u8) -> Result<()> {
        if x >= self.width || y >= self.height {
            return Err(Error::IndexOutOfBounds {
                index: y as usize * self.width as usize + x as usize,
                len: self.data.len(),
            });
        }
        let idx = self.index(x, y);
        self.data[idx] = normalize(value);
        Ok(())
    }

    /// Set the pixel without bounds checking.
    ///
    /// # Panics
    ///
    /// Panics if `x >= width` or `y >= height`.
    #[inline]
    pub fn set_pixel_unchecked(&mut self, x: u32, y: u32, value: u8) {
        let idx = self.index(x, y);
        self.data[idx] = normalize(value);
    }

    /// Set every pixel to background
    pub fn clear(&mut self) {
        self.data.fill(BACKGROUND);
    }

    /// Count foreground pixels
    pub fn count_foreground(&self) -> usize {
        self.data.iter().filter(|&&v| v == FOREGROUND).count()
    }

    /// Count background pixels
    pub fn count_background(&self) -> usize {
        self.data.len() - self.count_foreground()
    }

    /// Whether the mask has no foreground at all
    pub fn is_blank(&self) -> bool {
        self.data.iter().all(|&v| v == BACKGROUND)
    }

    /// Copy the region `rect` into a new mask.
    ///
    /// The region is clipped to the mask bounds.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if the clipped region is empty.
    pub fn clip(&self, rect: &Rect) -> Result<Mask> {
        let bounds = Rect::new_unchecked(0, 0, self.width as i32, self.height as i32);
        let r = rect.intersect(&bounds).ok_or_else(|| {
            Error::InvalidParameter(format!(
                "clip region {:?} lies outside {}x{} mask",
                rect, self.width, self.height
            ))
        })?;

        let mut out = Mask::new(r.w as u32, r.h as u32)?;
        let src_w = self.width as usize;
        let row_len = r.w as usize;
        for dy in 0..r.h as usize {
            let src_start = (r.y as usize + dy) * src_w + r.x as usize;
            let dst_start = dy * row_len;
            out.data[dst_start..dst_start + row_len]
                .copy_from_slice(&self.data[src_start..src_start + row_len]);
        }
        Ok(out)
    }

    /// Copy `src` into this mask with its top-left corner at (x, y).
    ///
    /// Pixels falling outside this mask are dropped.
    pub fn paste(&mut self, src: &Mask, x: u32, y: u32) {
        if x >= self.width || y >= self.height {
            return;
        }
        let w = src.width.min(self.width - x) as usize;
        let h = src.height.min(self.height - y);
        for dy in 0..h {
            let dst_start = self.index(x, y + dy);
            let src_start = src.index(0, dy);
            self.data[dst_start..dst_start + w].copy_from_slice(&src.data[src_start..src_start + w]);
        }
    }

    /// Return a copy padded with background on the right and bottom so
    /// that both dimensions are multiples of `multiple`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if `multiple` is 0.
    pub fn pad_to_multiple(&self, multiple: u32) -> Result<Mask> {
        if multiple == 0 {
            return Err(Error::InvalidParameter(
                "padding multiple must be > 0".to_string(),
            ));
        }
        let width = self.width.div_ceil(multiple) * multiple;
        let height = self.height.div_ceil(multiple) * multiple;
        if (width, height) == self.dimensions() {
            return Ok(self.clone());
        }

        let mut out = Mask::new(width, height)?;
        out.paste(self, 0, 0);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_data_normalizes() {
        let mask = Mask::from_data(3, 1, vec![0, 1, 200]).unwrap();
        assert_eq!(mask.data(), &[0, 255, 255]);
    }

    #[test]
    fn test_from_data_rejects_empty() {
        assert!(matches!(
            Mask::from_data(0, 0, vec![]),
            Err(Error::InvalidMask(_))
        ));
        assert!(matches!(
            Mask::from_data(2, 2, vec![0; 3]),
            Err(Error::InvalidMask(_))
        ));
    }

    #[test]
    fn test_set_get() {
        let mut mask = Mask::new(5, 5).unwrap();
        mask.set_pixel(4, 4, 1).unwrap();
        assert!(mask.is_foreground(4, 4));
        assert!(!mask.is_foreground(5, 4));
        assert!(mask.set_pixel(5, 0, 255).is_err());
        assert_eq!(mask.count_foreground(), 1);
        assert_eq!(mask.count_background(), 24);
    }

    #[test]
    fn test_clip_and_paste() {
        let mut mask = Mask::new(6, 4).unwrap();
        mask.set_pixel(2, 1, 255).unwrap();
        mask.set_pixel(3, 2, 255).unwrap();

        let sub = mask.clip(&Rect::new_unchecked(2, 1, 2, 2)).unwrap();
        assert_eq!(sub.dimensions(), (2, 2));
        assert_eq!(sub.data(), &[255, 0, 0, 255]);

        let mut dst = Mask::new(3, 3).unwrap();
        dst.paste(&sub, 1, 1);
        assert!(dst.is_foreground(1, 1));
        assert!(dst.is_foreground(2, 2));
        assert_eq!(dst.count_foreground(), 2);
    }

    #[test]
    fn test_clip_is_clamped() {
        let mask = Mask::new(4, 4).unwrap();
        let sub = mask.clip(&Rect::new_unchecked(2, 2, 10, 10)).unwrap();
        assert_eq!(sub.dimensions(), (2, 2));
        assert!(mask.clip(&Rect::new_unchecked(10, 10, 2, 2)).is_err());
    }

    #[test]
    fn test_pad_to_multiple() {
        let mut mask = Mask::new(5, 3).unwrap();
        mask.set_pixel(4, 2, 255).unwrap();
        let padded = mask.pad_to_multiple(4).unwrap();
        assert_eq!(padded.dimensions(), (8, 4));
        assert!(padded.is_foreground(4, 2));
        assert_eq!(padded.count_foreground(), 1);
    }
}
