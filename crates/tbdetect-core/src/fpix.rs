//! FPix - Floating-point image
//!
//! `FPix` is a 2D array of `f32` values. Candidate patches are carried as
//! `FPix` so that normalization and scoring can work without re-quantizing.
//!
//! # Examples
//!
//! ```
//! use tbdetect_core::FPix;
//!
//! let mut fpix = FPix::new(50, 50).unwrap();
//! fpix.set_pixel(10, 20, 0.5).unwrap();
//! assert_eq!(fpix.get_pixel(10, 20).unwrap(), 0.5);
//! assert_eq!(fpix.max_value(), Some(0.5));
//! ```

use crate::error::{Error, Result};

/// Floating-point image
///
/// # Memory Layout
///
/// Data is stored in row-major order with no padding. The pixel at (x, y)
/// is at index `y * width + x`.
#[derive(Debug, Clone, PartialEq)]
pub struct FPix {
    /// Width in pixels
    width: u32,
    /// Height in pixels
    height: u32,
    /// Pixel data (row-major, no padding)
    data: Vec<f32>,
}

impl FPix {
    /// Create a new FPix with all pixels set to zero
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidDimension` if width or height is 0.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        Self::new_with_value(width, height, 0.0)
    }

    /// Create a new FPix with all pixels set to the specified value
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidDimension` if width or height is 0.
    pub fn new_with_value(width: u32, height: u32, value: f32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidDimension { width, height });
        }

        Ok(FPix {
            width,
            height,
            data: vec![value; width as usize * height as usize],
        })
    }

    /// Create a FPix from raw data
    ///
    /// # Errors
    ///
    /// Returns an error if dimensions are invalid or data length doesn't match.
    pub fn from_data(width: u32, height: u32, data: Vec<f32>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidDimension { width, height });
        }

        let expected_size = width as usize * height as usize;
        if data.len() != expected_size {
            return Err(Error::InvalidParameter(format!(
                "data length {} doesn't match {}x{} = {}",
                data.len(),
                width,
                height,
                expected_size
            )));
        }

        Ok(FPix {
            width,
            height,
            data,
        })
    }

    /// Get the image width in pixels
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Get the image height in pixels
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Get the image dimensions as (width, height)
    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Get the pixel value at (x, y)
    ///
    /// # Errors
    ///
    /// Returns `Error::IndexOutOfBounds` if coordinates are out of range.
    #[inline]
    pub fn get_pixel(&self, x: u32, y: u32) -> Result<f32> {
        if x >= self.width || y >= self.height {
            return Err(Error::IndexOutOfBounds {
                index: (y as usize) * (self.width as usize) + (x as usize),
                len: self.data.len(),
            });
        }
        Ok(self.get_pixel_unchecked(x, y))
    }

    /// Set the pixel value at (x, y)
    ///
    /// # Errors
    ///
    /// Returns `Error::IndexOutOfBounds` if coordinates are out of range.
    #[inline]
    pub fn set_pixel(&mut self, x: u32, y: u32, value: f32) -> Result<()> {
        if x >= self.width || y >= self.height {
            return Err(Error::IndexOutOfBounds {
                index: (y as usize) * (self.width as usize) + (x as usize),
                len: self.data.len(),
            });
        }
        self.set_pixel_unchecked(x, y, value);
        Ok(())
    }

    /// Get the pixel value without bounds checking
    #[inline]
    pub fn get_pixel_unchecked(&self, x: u32, y: u32) -> f32 {
        self.data[(y as usize) * (self.width as usize) + (x as usize)]
    }

    /// Set the pixel value without bounds checking
    #[inline]
    pub fn set_pixel_unchecked(&mut self, x: u32, y: u32, value: f32) {
        let idx = (y as usize) * (self.width as usize) + (x as usize);
        self.data[idx] = value;
    }

    /// Get the raw pixel data
    #[inline]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Get a row of pixel data
    ///
    /// # Panics
    ///
    /// Panics if `y >= height`.
    #[inline]
    pub fn row(&self, y: u32) -> &[f32] {
        let start = (y as usize) * (self.width as usize);
        &self.data[start..start + self.width as usize]
    }

    /// Get a mutable row of pixel data
    #[inline]
    pub fn row_mut(&mut self, y: u32) -> &mut [f32] {
        let start = (y as usize) * (self.width as usize);
        let w = self.width as usize;
        &mut self.data[start..start + w]
    }

    /// Minimum pixel value
    pub fn min_value(&self) -> Option<f32> {
        self.data.iter().copied().reduce(f32::min)
    }

    /// Maximum pixel value
    pub fn max_value(&self) -> Option<f32> {
        self.data.iter().copied().reduce(f32::max)
    }

    /// Compute `multiplier * pixel + addend` for every pixel
    pub fn linear_combination(&self, multiplier: f32, addend: f32) -> FPix {
        FPix {
            width: self.width,
            height: self.height,
            data: self.data.iter().map(|&v| multiplier * v + addend).collect(),
        }
    }
}
