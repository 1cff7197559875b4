//! Tile-based background filtering
//!
//! Split-Otsu masks contain large flat regions where the local threshold
//! picked up texture instead of bacilli. The mask is cut into square tiles
//! and every tile that is mostly background is erased outright.
//!
//! A tile is background when it has more than `black_pixel_threshold`
//! zero pixels, so a kept tile holds at least
//! `tile_size * tile_size - black_pixel_threshold` foreground pixels.
//! The default keeps every 16x16 tile with three or more foreground pixels,
//! which leaves isolated bacilli alone and clears scattered specks.

use crate::error::{RegionError, RegionResult};
use log::debug;
use serde::{Deserialize, Serialize};
use tbdetect_core::{Mask, Rect};

/// Default tile edge length in pixels
pub const DEFAULT_TILE_SIZE: u32 = 16;

/// Default number of background pixels above which a tile is erased
pub const DEFAULT_BLACK_PIXEL_THRESHOLD: u32 = 253;

/// A square piece of a mask, tagged with its origin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tile {
    /// Left edge in the source mask
    pub x: u32,
    /// Top edge in the source mask
    pub y: u32,
    /// Tile pixels
    pub mask: Mask,
}

impl Tile {
    /// Tile width
    pub fn width(&self) -> u32 {
        self.mask.width()
    }

    /// Tile height
    pub fn height(&self) -> u32 {
        self.mask.height()
    }

    /// Number of background pixels in the tile
    pub fn count_background(&self) -> usize {
        self.mask.count_background()
    }

    /// Whether the tile holds more than `threshold` background pixels
    pub fn is_background(&self, threshold: u32) -> bool {
        self.count_background() > threshold as usize
    }

    /// Set every pixel of the tile to background
    pub fn erase(&mut self) {
        self.mask.clear();
    }
}

/// Split a mask into `tile_size` x `tile_size` tiles in row-major order.
///
/// Tiles on the right and bottom edges are smaller when the mask
/// dimensions are not multiples of `tile_size`.
///
/// # Errors
///
/// Returns [`RegionError::InvalidParameters`] if `tile_size` is 0.
pub fn split_into_tiles(mask: &Mask, tile_size: u32) -> RegionResult<Vec<Tile>> {
    if tile_size == 0 {
        return Err(RegionError::InvalidParameters(
            "tile_size must be > 0".to_string(),
        ));
    }

    let (width, height) = mask.dimensions();
    let mut tiles = Vec::with_capacity((width.div_ceil(tile_size) * height.div_ceil(tile_size)) as usize);
    for y in (0..height).step_by(tile_size as usize) {
        for x in (0..width).step_by(tile_size as usize) {
            let rect = Rect::new_unchecked(x as i32, y as i32, tile_size as i32, tile_size as i32);
            tiles.push(Tile {
                x,
                y,
                mask: mask.clip(&rect)?,
            });
        }
    }
    Ok(tiles)
}

/// Reassemble row-major tiles into one mask.
///
/// `x_tiles` is the number of tiles along x (columns) and `y_tiles` along
/// y (rows). Every tile must have the size of the first one.
///
/// # Errors
///
/// Returns [`RegionError::TileShapeMismatch`] if the tile count does not
/// equal `x_tiles * y_tiles` or the tiles are not all the same size.
pub fn reconstruct(tiles: &[Tile], x_tiles: u32, y_tiles: u32) -> RegionResult<Mask> {
    let expected = x_tiles as usize * y_tiles as usize;
    if tiles.len() != expected || expected == 0 {
        return Err(RegionError::TileShapeMismatch(format!(
            "expected {}x{} = {} tiles, got {}",
            x_tiles,
            y_tiles,
            expected,
            tiles.len()
        )));
    }

    let (tw, th) = tiles[0].mask.dimensions();
    if let Some(bad) = tiles.iter().find(|t| t.mask.dimensions() != (tw, th)) {
        return Err(RegionError::TileShapeMismatch(format!(
            "tile at ({}, {}) is {}x{}, expected {}x{}",
            bad.x,
            bad.y,
            bad.width(),
            bad.height(),
            tw,
            th
        )));
    }

    let mut out = Mask::new(tw * x_tiles, th * y_tiles)?;
    for (i, tile) in tiles.iter().enumerate() {
        let col = i as u32 % x_tiles;
        let row = i as u32 / x_tiles;
        out.paste(&tile.mask, col * tw, row * th);
    }
    Ok(out)
}

/// Options for [`filter_tiles`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TileFilterOptions {
    /// Tile edge length
    pub tile_size: u32,
    /// Tiles with more background pixels than this are erased
    pub black_pixel_threshold: u32,
    /// Pad the mask to a multiple of `tile_size` before splitting
    pub pad_to_multiple: bool,
}

impl Default for TileFilterOptions {
    fn default() -> Self {
        Self {
            tile_size: DEFAULT_TILE_SIZE,
            black_pixel_threshold: DEFAULT_BLACK_PIXEL_THRESHOLD,
            pad_to_multiple: true,
        }
    }
}

impl TileFilterOptions {
    /// Set the tile size
    pub fn with_tile_size(mut self, tile_size: u32) -> Self {
        self.tile_size = tile_size;
        self
    }

    /// Set the background pixel threshold
    pub fn with_black_pixel_threshold(mut self, threshold: u32) -> Self {
        self.black_pixel_threshold = threshold;
        self
    }

    /// Enable or disable padding
    pub fn with_pad_to_multiple(mut self, pad: bool) -> Self {
        self.pad_to_multiple = pad;
        self
    }
}

/// Outcome of [`filter_tiles`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TileFilterReport {
    /// Tiles examined
    pub tiles_total: usize,
    /// Tiles erased as background
    pub tiles_erased: usize,
    /// Tile columns
    pub x_tiles: u32,
    /// Tile rows
    pub y_tiles: u32,
}

/// Erase every mostly-background tile of `mask`.
///
/// The returned mask has the dimensions of the input. Component statistics
/// of the input are stale afterwards and must be recomputed.
///
/// # Errors
///
/// Returns [`RegionError::InvalidParameters`] if `tile_size` is 0.
pub fn filter_tiles(mask: &Mask, options: &TileFilterOptions) -> RegionResult<(Mask, TileFilterReport)> {
    let tile_size = options.tile_size;
    if tile_size == 0 {
        return Err(RegionError::InvalidParameters(
            "tile_size must be > 0".to_string(),
        ));
    }

    let (width, height) = mask.dimensions();
    let padded = if options.pad_to_multiple {
        mask.pad_to_multiple(tile_size)?
    } else {
        mask.clone()
    };

    let mut tiles = split_into_tiles(&padded, tile_size)?;
    let mut tiles_erased = 0;
    for tile in tiles.iter_mut() {
        if tile.is_background(options.black_pixel_threshold) {
            tile.erase();
            tiles_erased += 1;
        }
    }

    let x_tiles = padded.width().div_ceil(tile_size);
    let y_tiles = padded.height().div_ceil(tile_size);
    let rebuilt = if options.pad_to_multiple {
        reconstruct(&tiles, x_tiles, y_tiles)?
    } else {
        // Ragged edge tiles: write each one back at its origin.
        let mut out = padded;
        for tile in &tiles {
            out.paste(&tile.mask, tile.x, tile.y);
        }
        out
    };

    let filtered = if rebuilt.dimensions() == (width, height) {
        rebuilt
    } else {
        rebuilt.clip(&Rect::new_unchecked(0, 0, width as i32, height as i32))?
    };

    let report = TileFilterReport {
        tiles_total: tiles.len(),
        tiles_erased,
        x_tiles,
        y_tiles,
    };
    debug!(
        "filter_tiles: {} of {} tiles erased ({}x{} grid, tile size {})",
        report.tiles_erased, report.tiles_total, x_tiles, y_tiles, tile_size
    );
    Ok((filtered, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tbdetect_core::{BACKGROUND, FOREGROUND};

    fn filled(width: u32, height: u32, rect: (u32, u32, u32, u32)) -> Mask {
        let mut mask = Mask::new(width, height).unwrap();
        let (x0, y0, w, h) = rect;
        for y in y0..y0 + h {
            for x in x0..x0 + w {
                mask.set_pixel_unchecked(x, y, FOREGROUND);
            }
        }
        mask
    }

    #[test]
    fn test_split_row_major() {
        let mask = Mask::new(40, 20).unwrap();
        let tiles = split_into_tiles(&mask, 16).unwrap();
        assert_eq!(tiles.len(), 6);
        let origins: Vec<(u32, u32)> = tiles.iter().map(|t| (t.x, t.y)).collect();
        assert_eq!(origins, vec![(0, 0), (16, 0), (32, 0), (0, 16), (16, 16), (32, 16)]);
        // edge tiles are smaller
        assert_eq!(tiles[2].mask.dimensions(), (8, 16));
        assert_eq!(tiles[5].mask.dimensions(), (8, 4));
    }

    #[test]
    fn test_split_zero_tile_size() {
        let mask = Mask::new(4, 4).unwrap();
        assert!(matches!(
            split_into_tiles(&mask, 0),
            Err(RegionError::InvalidParameters(_))
        ));
    }

    #[test]
    fn test_reconstruct_non_square_grid() {
        let mask = filled(48, 32, (20, 3, 10, 20));
        let tiles = split_into_tiles(&mask, 16).unwrap();
        let rebuilt = reconstruct(&tiles, 3, 2).unwrap();
        assert_eq!(rebuilt, mask);
    }

    #[test]
    fn test_reconstruct_rejects_bad_shapes() {
        let mask = Mask::new(40, 32).unwrap();
        let tiles = split_into_tiles(&mask, 16).unwrap();
        assert!(matches!(
            reconstruct(&tiles, 3, 2),
            Err(RegionError::TileShapeMismatch(_))
        ));
        assert!(matches!(
            reconstruct(&tiles[..4], 3, 2),
            Err(RegionError::TileShapeMismatch(_))
        ));
    }

    #[test]
    fn test_background_threshold_is_strict() {
        // 16x16 tile with 41 foreground pixels: 215 background, not > 215
        let mut tile = Tile {
            x: 0,
            y: 0,
            mask: filled(16, 16, (0, 0, 16, 2)),
        };
        for x in 0..9 {
            tile.mask.set_pixel_unchecked(x, 2, FOREGROUND);
        }
        assert_eq!(tile.count_background(), 215);
        assert!(!tile.is_background(215));

        tile.mask.set_pixel_unchecked(8, 2, BACKGROUND);
        assert!(tile.is_background(215));
        tile.erase();
        assert!(tile.mask.is_blank());
    }

    #[test]
    fn test_filter_tiles_erases_sparse_tiles() {
        // tile (0,0) is dense, tile (16,0) holds two stray pixels,
        // tile (32,0) a single thin rod
        let mut mask = filled(48, 16, (0, 0, 16, 10));
        mask.set_pixel_unchecked(20, 5, FOREGROUND);
        mask.set_pixel_unchecked(25, 9, FOREGROUND);
        for x in 36..40 {
            mask.set_pixel_unchecked(x, 5, FOREGROUND);
        }
        let (out, report) = filter_tiles(&mask, &TileFilterOptions::default()).unwrap();
        assert_eq!(report.tiles_total, 3);
        assert_eq!(report.tiles_erased, 1);
        assert_eq!((report.x_tiles, report.y_tiles), (3, 1));
        assert_eq!(out.count_foreground(), 164);
        assert!(!out.is_foreground(20, 5));
        assert!(out.is_foreground(37, 5));

        // a stricter threshold also drops the rod
        let opts = TileFilterOptions::default().with_black_pixel_threshold(215);
        let (out, report) = filter_tiles(&mask, &opts).unwrap();
        assert_eq!(report.tiles_erased, 2);
        assert_eq!(out.count_foreground(), 160);
    }

    #[test]
    fn test_filter_tiles_keeps_dimensions() {
        let mask = filled(37, 21, (0, 0, 37, 21));
        let (out, report) = filter_tiles(&mask, &TileFilterOptions::default()).unwrap();
        assert_eq!(out.dimensions(), (37, 21));
        assert_eq!((report.x_tiles, report.y_tiles), (3, 2));

        let opts = TileFilterOptions::default().with_pad_to_multiple(false);
        let (out2, report2) = filter_tiles(&mask, &opts).unwrap();
        assert_eq!(out2.dimensions(), (37, 21));
        assert_eq!(report2.tiles_total, 6);
    }
}
