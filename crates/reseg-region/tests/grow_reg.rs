//! Label growth regression test
//!
//! 距離変換、ラベル伝播、分水嶺成長、ラベル拡張の組み合わせをテスト。
//!
//! Run with:
//! ```
//! cargo test -p reseg-region --test grow_reg
//! ```

use reseg_core::{LabelMap, Mask};
use reseg_region::{
    distance_transform, grow_labels, label_distance_transform, propagate_labels, spread_labels,
    watershed_grow,
};
use reseg_test::RegParams;

/// Two text lines of glyph blocks; one glyph is a tall ascender that
/// reaches into the second line's band and merges with it.
fn create_two_line_mask() -> Mask {
    let mut mask = Mask::new(80, 40).unwrap();
    let mut fill = |x0: u32, y0: u32, w: u32, h: u32| {
        for y in y0..y0 + h {
            for x in x0..x0 + w {
                mask.set_pixel(x, y, true).unwrap();
            }
        }
    };
    for i in 0..6 {
        fill(5 + i * 12, 5, 8, 10);
        fill(5 + i * 12, 24, 8, 10);
    }
    // bridge between the first glyphs of both lines
    fill(7, 15, 2, 9);
    mask
}

/// Seed bands: line 1 over rows 5..15, line 2 over rows 24..34
fn create_seeds() -> LabelMap {
    let mut seeds = LabelMap::new(80, 40).unwrap();
    for x in 0..80 {
        for y in 6..14 {
            seeds.set_pixel(x, y, 1).unwrap();
        }
        for y in 25..33 {
            seeds.set_pixel(x, y, 2).unwrap();
        }
    }
    seeds
}

#[test]
fn grow_reg() {
    let mut rp = RegParams::new("grow");
    let mask = create_two_line_mask();
    let seeds = create_seeds();

    // --- distance transform ---
    let dist = distance_transform(&mask).unwrap();
    // glyph centre of an 8x10 block is 4 px from its side
    rp.compare_values(4.0, dist.get_pixel(20, 10).unwrap() as f64, 1e-5);
    rp.compare_values(0.0, dist.get_pixel(0, 0).unwrap() as f64, 0.0);

    let per_label = label_distance_transform(&seeds).unwrap();
    rp.compare_values(4.0, per_label.get_pixel(40, 9).unwrap() as f64, 1e-5);

    // --- propagation: bridged glyph pair is contested ---
    let propagated = propagate_labels(&mask, &seeds, 0).unwrap();
    rp.compare_values(0.0, propagated.get_pixel(8, 10).unwrap() as f64, 0.0);
    rp.compare_values(1.0, propagated.get_pixel(20, 10).unwrap() as f64, 0.0);
    rp.compare_values(2.0, propagated.get_pixel(20, 30).unwrap() as f64, 0.0);

    // --- watershed splits the contested pair ---
    let grown = watershed_grow(&propagated, &seeds, &mask).unwrap();
    rp.compare_values(1.0, grown.get_pixel(8, 10).unwrap() as f64, 0.0);
    rp.compare_values(2.0, grown.get_pixel(8, 30).unwrap() as f64, 0.0);
    rp.compare_values(1.0, grown.get_pixel(8, 16).unwrap() as f64, 0.0);
    rp.compare_values(2.0, grown.get_pixel(8, 22).unwrap() as f64, 0.0);
    // every ink pixel is claimed, nothing outside the ink
    rp.compare_values(mask.count() as f64, grown.nonzero_mask().count() as f64, 0.0);

    // --- spreading ---
    let spread = spread_labels(&grown, 3.0).unwrap();
    rp.compare_values(1.0, spread.get_pixel(14, 10).unwrap() as f64, 0.0);
    rp.compare_values(0.0, spread.get_pixel(40, 19).unwrap() as f64, 0.0);

    // --- full cycle equals the manual chain ---
    let cycle = grow_labels(&seeds, &mask, 3.0).unwrap();
    rp.compare_values(1.0, if cycle == spread { 1.0 } else { 0.0 }, 0.0);

    if rp.display() {
        let _ = rp.write_labels_and_check(&cycle);
    }

    assert!(rp.cleanup(), "grow regression test failed");
}
