//! GrayImage - Single-channel source image
//!
//! The smear image paired with a [`Mask`](crate::Mask). Microscopy tiles are
//! 16-bit, with useful intensities up to roughly 16000, so samples are
//! stored as `u16`.

use crate::error::{Error, Result};

/// 16-bit grayscale image
///
/// Data is stored row-major with no padding. The pixel at (x, y) is at
/// index `y * width + x`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrayImage {
    width: u32,
    height: u32,
    data: Vec<u16>,
}

impl GrayImage {
    /// Create a new image with all pixels set to zero
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDimension`] if width or height is 0.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidDimension { width, height });
        }
        Ok(GrayImage {
            width,
            height,
            data: vec![0; width as usize * height as usize],
        })
    }

    /// Create an image from row-major samples
    ///
    /// # Errors
    ///
    /// Returns an error if dimensions are invalid or data length doesn't match.
    pub fn from_data(width: u32, height: u32, data: Vec<u16>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidDimension { width, height });
        }
        let expected = width as usize * height as usize;
        if data.len() != expected {
            return Err(Error::InvalidParameter(format!(
                "data length {} doesn't match {}x{} = {}",
                data.len(),
                width,
                height,
                expected
            )));
        }
        Ok(GrayImage {
            width,
            height,
            data,
        })
    }

    /// Create an image by evaluating `f(x, y)` for every pixel
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> u16) -> Result<Self> {
        let mut img = Self::new(width, height)?;
        for y in 0..height {
            for x in 0..width {
                img.set_pixel_unchecked(x, y, f(x, y));
            }
        }
        Ok(img)
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[inline]
    pub fn data(&self) -> &[u16] {
        &self.data
    }

    /// Get a row of samples
    ///
    /// # Panics
    ///
    /// Panics if `y >= height`.
    #[inline]
    pub fn row(&self, y: u32) -> &[u16] {
        let start = y as usize * self.width as usize;
        &self.data[start..start + self.width as usize]
    }

    /// Get the sample at (x, y), or `None` when out of bounds
    #[inline]
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<u16> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.data[y as usize * self.width as usize + x as usize])
    }

    /// Get the sample without bounds checking
    #[inline]
    pub fn get_pixel_unchecked(&self, x: u32, y: u32) -> u16 {
        self.data[y as usize * self.width as usize + x as usize]
    }

    /// Set the sample at (x, y)
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfBounds`] if coordinates are out of range.
    pub fn set_pixel(&mut self, x: u32, y: u32, value: u16) -> Result<()> {
        if x >= self.width || y >= self.height {
            return Err(Error::IndexOutOfBounds {
                index: y as usize * self.width as usize + x as usize,
                len: self.data.len(),
            });
        }
        self.set_pixel_unchecked(x, y, value);
        Ok(())
    }

    /// Set the sample without bounds checking
    #[inline]
    pub fn set_pixel_unchecked(&mut self, x: u32, y: u32, value: u16) {
        let idx = y as usize * self.width as usize + x as usize;
        self.data[idx] = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_fn() {
        let img = GrayImage::from_fn(4, 3, |x, y| (y * 10 + x) as u16).unwrap();
        assert_eq!(img.get_pixel(3, 2), Some(23));
        assert_eq!(img.row(1), &[10, 11, 12, 13]);
        assert_eq!(img.get_pixel(4, 0), None);
    }

    #[test]
    fn test_from_data_length_mismatch() {
        assert!(GrayImage::from_data(2, 2, vec![0; 5]).is_err());
        assert!(GrayImage::new(0, 2).is_err());
    }
}
