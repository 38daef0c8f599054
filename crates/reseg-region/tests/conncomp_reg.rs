//! Connected component regression test
//!
//! 連結成分のラベル付け、サイズ計測、サイズによるフィルタリングをテスト。
//!
//! Run with:
//! ```
//! cargo test -p reseg-region --test conncomp_reg
//! ```

use reseg_core::Mask;
use reseg_region::{
    ConnectivityType, component_sizes, filter_components_by_size, label_connected_components,
};
use reseg_test::RegParams;

/// A page-like mask: three "words" of glyph blocks plus specks of noise
fn create_word_mask() -> Mask {
    let mut mask = Mask::new(120, 40).unwrap();
    // three words of four 6x10 glyphs each, 2px letter spacing
    for word in 0..3u32 {
        for glyph in 0..4u32 {
            let x0 = 4 + word * 38 + glyph * 8;
            for y in 10..20 {
                for x in x0..x0 + 6 {
                    mask.set_pixel(x, y, true).unwrap();
                }
            }
        }
    }
    // specks
    mask.set_pixel(2, 35, true).unwrap();
    mask.set_pixel(60, 30, true).unwrap();
    mask.set_pixel(61, 31, true).unwrap();
    mask
}

#[test]
fn conncomp_reg() {
    let mut rp = RegParams::new("conncomp");
    let mask = create_word_mask();

    // --- 8-way: diagonal specks merge ---
    let (labels8, count8) = label_connected_components(&mask, ConnectivityType::EightWay).unwrap();
    rp.compare_values(14.0, count8 as f64, 0.0);
    // --- 4-way: diagonal specks stay apart ---
    let (_, count4) = label_connected_components(&mask, ConnectivityType::FourWay).unwrap();
    rp.compare_values(15.0, count4 as f64, 0.0);

    // first glyph touched in raster order is label 1
    rp.compare_values(1.0, labels8.get_pixel(4, 10).unwrap() as f64, 0.0);
    rp.compare_values(12.0, labels8.get_pixel(118 - 4 - 6, 19).unwrap() as f64, 0.0);

    let sizes = component_sizes(&labels8, count8);
    rp.compare_values(15.0, sizes.len() as f64, 0.0);
    rp.compare_values(60.0, sizes[1] as f64, 0.0);
    let ink: usize = sizes.iter().skip(1).sum();
    rp.compare_values(mask.count() as f64, ink as f64, 0.0);

    // --- drop specks ---
    let (filtered, kept) = filter_components_by_size(&labels8, count8, 3, usize::MAX).unwrap();
    rp.compare_values(12.0, kept as f64, 0.0);
    rp.compare_values(0.0, filtered.get_pixel(2, 35).unwrap() as f64, 0.0);
    rp.compare_values(720.0, filtered.nonzero_mask().count() as f64, 0.0);

    assert!(rp.cleanup(), "conncomp regression test failed");
}
