//! Tile split / reconstruct regression test
//!
//! Run with:
//! ```
//! cargo test -p tbdetect-region --test tile_reg
//! ```

use tbdetect_core::Mask;
use tbdetect_region::{
    PostprocessOptions, TileFilterOptions, filter_tiles, postprocess, reconstruct,
    split_into_tiles,
};
use tbdetect_test::{RegParams, fill_rect, random_mask};

#[test]
fn tile_reg() {
    let mut rp = RegParams::new("tile");

    // -----------------------------------------------------------
    // Split and reconstruct is pixel identical
    // -----------------------------------------------------------
    for &(w, h, size) in &[(64, 64, 16), (96, 32, 16), (30, 45, 15), (40, 24, 8)] {
        let mask = random_mask(w, h, 0.4, (w + h) as u64).unwrap();
        let tiles = split_into_tiles(&mask, size).unwrap();
        let rebuilt = reconstruct(&tiles, w / size, h / size).unwrap();
        rp.compare_masks(&mask, &rebuilt);
    }

    // -----------------------------------------------------------
    // Filtering erases sparse tiles and keeps dense ones
    // -----------------------------------------------------------
    let mut mask = random_mask(64, 64, 0.02, 99).unwrap();
    fill_rect(&mut mask, 16, 16, 16, 16);
    // tiles need at least 41 foreground pixels to survive
    let strict = TileFilterOptions::default().with_black_pixel_threshold(215);
    let (out, report) = filter_tiles(&mask, &strict).unwrap();
    rp.compare_values(16.0, report.tiles_total as f64, 0.0);
    rp.compare_values(15.0, report.tiles_erased as f64, 0.0);
    rp.compare_values(256.0, out.count_foreground() as f64, 0.0);

    // threshold above the tile area never erases anything
    let opts = strict.with_black_pixel_threshold(256);
    let (out, report) = filter_tiles(&mask, &opts).unwrap();
    rp.compare_values(0.0, report.tiles_erased as f64, 0.0);
    rp.compare_masks(&mask, &out);

    // -----------------------------------------------------------
    // Default threshold keeps a lone bacillus, drops stray pixels
    // -----------------------------------------------------------
    let mut sparse = Mask::new(64, 64).unwrap();
    fill_rect(&mut sparse, 20, 20, 1, 6);
    fill_rect(&mut sparse, 50, 50, 2, 1);
    let (out, report) = filter_tiles(&sparse, &TileFilterOptions::default()).unwrap();
    rp.compare_values(15.0, report.tiles_erased as f64, 0.0);
    rp.compare_values(6.0, out.count_foreground() as f64, 0.0);
    rp.check(out.is_foreground(20, 25), "rod kept");

    // -----------------------------------------------------------
    // Otsu postprocess: stats describe the cleaned mask
    // -----------------------------------------------------------
    let opts = PostprocessOptions::default().with_tile(strict);
    let result = postprocess(&mask, &opts).unwrap();
    rp.compare_values(1.0, result.num_components as f64, 0.0);
    rp.compare_masks(&mask, &result.uncleaned);
    rp.check(
        result.stats.foreground_area() == result.cleaned.count_foreground() as u64,
        "stats match cleaned mask",
    );

    assert!(rp.cleanup());
}
