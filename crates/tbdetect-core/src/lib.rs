//! tbdetect-core - Basic image containers for smear analysis
//!
//! This crate provides the data structures shared by every stage of the
//! bacillus detection pipeline:
//!
//! - [`Mask`] - Binary segmentation mask (0 / 255)
//! - [`GrayImage`] - 16-bit single-channel source image
//! - [`FPix`] - Floating-point image, used for candidate patches
//! - [`Rect`] - Axis-aligned rectangle regions

pub mod error;
pub mod fpix;
pub mod gray;
pub mod mask;
pub mod rect;

pub use error::{Error, Result};
pub use fpix::FPix;
pub use gray::GrayImage;
pub use mask::{BACKGROUND, FOREGROUND, Mask};
pub use rect::Rect;
