use std::sync::Arc;

use loomkit_core::EventBus;
use loomkit_engine::compositor::{decode_normal, encode_normal, normal_from_heights};
use loomkit_engine::{Compositor, SurfaceKey, SurfacePool, NEUTRAL_HEIGHT};
use proptest::prelude::*;

fn length(n: [f32; 3]) -> f32 {
    (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt()
}

#[test]
fn test_flat_map_points_up() {
    let mut pool = SurfacePool::new(8, 8, 0).unwrap();
    let mut compositor = Compositor::new(Arc::new(EventBus::new()));
    pool.displacement().unwrap().fill_scalar(NEUTRAL_HEIGHT).unwrap();
    compositor.derive_normal(&mut pool).unwrap();

    let normal = pool.get(&SurfaceKey::Normal).unwrap();
    assert_eq!(normal.pixel_rgba(3, 3), Some([128, 128, 255, 255]));
}

#[test]
fn test_slope_tilts_against_gradient() {
    // height rising to the right tilts the normal toward -x
    let n = normal_from_heights(0, 255, 100, 100);
    assert!(n[0] < 0.0);
    assert!(n[1].abs() < 1e-6);
    assert!(n[2] > 0.0);
}

proptest! {
    #[test]
    fn prop_normal_is_unit(l in any::<u8>(), r in any::<u8>(), u in any::<u8>(), d in any::<u8>()) {
        let n = normal_from_heights(l, r, u, d);
        prop_assert!((length(n) - 1.0).abs() < 1e-4);
        prop_assert!(n[2] > 0.0);
    }

    #[test]
    fn prop_encoded_normals_decode_to_unit(
        heights in prop::collection::vec(any::<u8>(), 36),
    ) {
        let mut pool = SurfacePool::new(6, 6, 0).unwrap();
        let mut compositor = Compositor::new(Arc::new(EventBus::new()));
        {
            let gray = pool.displacement().unwrap().gray_mut().unwrap();
            for (i, h) in heights.iter().enumerate() {
                gray.put_pixel(i as u32 % 6, i as u32 / 6, image::Luma([*h]));
            }
        }
        compositor.derive_normal(&mut pool).unwrap();

        let normal = pool.get(&SurfaceKey::Normal).unwrap();
        for y in 0..6 {
            for x in 0..6 {
                let [r, g, b, a] = normal.pixel_rgba(x, y).unwrap();
                prop_assert_eq!(a, 255);
                let decoded = decode_normal([r, g, b]);
                prop_assert!((length(decoded) - 1.0).abs() < 0.01);
            }
        }
    }

    #[test]
    fn prop_encode_decode_is_close(l in any::<u8>(), r in any::<u8>(), u in any::<u8>(), d in any::<u8>()) {
        let n = normal_from_heights(l, r, u, d);
        let back = decode_normal(encode_normal(n));
        for i in 0..3 {
            prop_assert!((back[i] - n[i]).abs() <= 1.0 / 255.0 + 1e-6);
        }
    }
}
