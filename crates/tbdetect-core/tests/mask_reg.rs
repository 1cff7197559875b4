//! Mask and rectangle regression test
//!
//! Tests clipping, pasting and padding of masks, and rectangle
//! growth and intersection.

use tbdetect_core::{FOREGROUND, GrayImage, Mask, Rect};
use tbdetect_test::{RegParams, fill_rect, mask_from_rows};

#[test]
fn mask_reg() {
    let mut rp = RegParams::new("mask");

    // --- Test 1: Clip a region ---
    let mask = mask_from_rows(&[
        "#....", //
        ".##..",
        ".##..",
        "....#",
    ])
    .expect("mask");
    let clipped = mask.clip(&Rect::new_unchecked(1, 1, 2, 2)).expect("clip");
    rp.compare_values(4.0, clipped.count_foreground() as f64, 0.0);

    // clip regions hanging off the edge are cut back
    let corner = mask.clip(&Rect::new_unchecked(3, 2, 10, 10)).expect("clip");
    rp.check(corner.dimensions() == (2, 2), "clipped to the mask");
    rp.check(corner.is_foreground(1, 1), "bottom right pixel kept");
    rp.check(
        mask.clip(&Rect::new_unchecked(20, 20, 2, 2)).is_err(),
        "disjoint clip fails",
    );

    // --- Test 2: Paste back ---
    let mut canvas = Mask::new(5, 4).expect("canvas");
    canvas.paste(&clipped, 1, 1);
    canvas.paste(&corner, 3, 2);
    canvas.set_pixel(0, 0, FOREGROUND).expect("set");
    rp.compare_masks(&mask, &canvas);

    // pasting past the edge drops what does not fit
    let mut small = Mask::new(3, 3).expect("small");
    let mut block = Mask::new(4, 4).expect("block");
    fill_rect(&mut block, 0, 0, 4, 4);
    small.paste(&block, 2, 2);
    rp.compare_values(1.0, small.count_foreground() as f64, 0.0);

    // --- Test 3: Pad to a tile multiple ---
    let padded = mask.pad_to_multiple(4).expect("pad");
    rp.check(padded.dimensions() == (8, 4), "padded dimensions");
    rp.compare_values(
        mask.count_foreground() as f64,
        padded.count_foreground() as f64,
        0.0,
    );
    let same = padded.pad_to_multiple(4).expect("pad");
    rp.compare_masks(&padded, &same);
    rp.check(mask.pad_to_multiple(0).is_err(), "zero multiple");

    // --- Test 4: Rectangles ---
    let r = Rect::new_unchecked(10, 20, 6, 3);
    let grown = r.expand(5);
    rp.compare_values(5.0, grown.x as f64, 0.0);
    rp.compare_values(15.0, grown.y as f64, 0.0);
    rp.compare_values(16.0, grown.w as f64, 0.0);
    rp.compare_values(13.0, grown.h as f64, 0.0);
    let overlap = grown.intersect(&Rect::new_unchecked(0, 0, 10, 20));
    rp.check(
        overlap == Some(Rect::new_unchecked(5, 15, 5, 5)),
        "intersection",
    );
    rp.check(
        r.intersect(&Rect::new_unchecked(0, 0, 5, 5)).is_none(),
        "disjoint rectangles",
    );

    // --- Test 5: Source image shape checks ---
    let image = GrayImage::from_fn(4, 3, |x, y| (y * 4 + x) as u16).expect("image");
    rp.check(image.get_pixel(3, 2) == Some(11), "row-major fill");
    rp.check(image.get_pixel(4, 0).is_none(), "out of bounds read");
    rp.check(GrayImage::from_data(4, 3, vec![0; 11]).is_err(), "short buffer");

    assert!(rp.cleanup(), "mask regression test failed");
}
