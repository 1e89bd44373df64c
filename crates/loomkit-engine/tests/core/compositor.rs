use std::sync::Arc;

use loomkit_core::{EventBus, Point, ThreadColor};
use loomkit_engine::{
    BlendMode, CompositingSession, Compositor, LayerKind, LayerStore, StitchPath, Surface,
    SurfaceFormat, SurfaceKey, SurfacePool,
};
use loomkit_settings::EngineConfig;
use tiny_skia::Color;

fn fill(store: &mut LayerStore, pool: &mut SurfacePool, id: loomkit_core::LayerId, rgb: [u8; 3]) {
    store
        .paint(id, pool, |_, surface| {
            surface
                .pixmap_mut()?
                .fill(Color::from_rgba8(rgb[0], rgb[1], rgb[2], 255));
            Ok(())
        })
        .unwrap();
}

fn setup(size: u32) -> (LayerStore, SurfacePool, Compositor) {
    let bus = Arc::new(EventBus::new());
    (
        LayerStore::with_bus(size, size, bus.clone()),
        SurfacePool::new(size, size, 0).unwrap(),
        Compositor::new(bus),
    )
}

fn composed(pool: &SurfacePool) -> &Surface {
    pool.get(&SurfaceKey::Composed).unwrap()
}

#[test]
fn test_half_opacity_layer_blends_evenly() {
    let (mut store, mut pool, mut compositor) = setup(16);
    let a = store.create(LayerKind::Raster, Some("A"), &mut pool).unwrap().id;
    let b = store.create(LayerKind::Raster, Some("B"), &mut pool).unwrap().id;
    fill(&mut store, &mut pool, a, [200, 40, 0]);
    fill(&mut store, &mut pool, b, [0, 60, 220]);
    store.set_opacity(b, 0.5).unwrap();

    let stats = compositor.compose(&store, &mut pool).unwrap();
    assert_eq!(stats.drawn, 2);

    let out = composed(&pool);
    for y in 0..16 {
        for x in 0..16 {
            let [r, g, b, a] = out.pixel_rgba(x, y).unwrap();
            assert!((i32::from(r) - 100).abs() <= 2, "r = {}", r);
            assert!((i32::from(g) - 50).abs() <= 2, "g = {}", g);
            assert!((i32::from(b) - 110).abs() <= 2, "b = {}", b);
            assert_eq!(a, 255);
        }
    }
}

#[test]
fn test_compose_is_idempotent() {
    let mut session = CompositingSession::new(EngineConfig::with_canvas(64, 64)).unwrap();
    session.on_tool_activated("cross-stitch", None).unwrap();
    session
        .on_path_completed(StitchPath::new(vec![
            Point::new(4.0, 4.0),
            Point::new(60.0, 30.0),
            Point::new(10.0, 60.0),
        ]))
        .unwrap();
    session.on_tool_activated("puff", None).unwrap();
    session
        .on_path_completed(StitchPath::new(vec![Point::new(20.0, 20.0), Point::new(40.0, 40.0)]))
        .unwrap();

    session.recompose().unwrap();
    let first = session.composed_surface().unwrap().data().to_vec();
    session.recompose().unwrap();
    let second = session.composed_surface().unwrap().data().to_vec();
    assert_eq!(first, second);
}

#[test]
fn test_deleting_only_layer_leaves_clear_output() {
    let mut session = CompositingSession::new(EngineConfig::with_canvas(32, 32)).unwrap();
    session.on_tool_activated("satin", None).unwrap();
    let commit = session
        .on_path_completed(StitchPath::new(vec![Point::new(2.0, 16.0), Point::new(30.0, 16.0)]))
        .unwrap()
        .unwrap();
    session.frame().unwrap();
    assert!(!session.composed_surface().unwrap().is_clear());

    session.delete_layer(commit.layer).unwrap();
    assert_eq!(session.store().active_id(), None);
    session.frame().unwrap();

    let fresh = Surface::new(32, 32, SurfaceFormat::Rgba8).unwrap();
    assert_eq!(session.composed_surface().unwrap().data(), fresh.data());
}

#[test]
fn test_hidden_group_hides_members() {
    let (mut store, mut pool, mut compositor) = setup(8);
    let a = store.create(LayerKind::Raster, None, &mut pool).unwrap().id;
    fill(&mut store, &mut pool, a, [10, 200, 10]);
    let group = store.create_group("trim", &[a]).unwrap();

    store.set_group_visible(group, false).unwrap();
    compositor.compose(&store, &mut pool).unwrap();
    assert!(composed(&pool).is_clear());

    store.set_group_visible(group, true).unwrap();
    store.set_group_opacity(group, 0.0).unwrap();
    compositor.compose(&store, &mut pool).unwrap();
    assert!(composed(&pool).is_clear());
}

#[test]
fn test_multiply_blend() {
    let (mut store, mut pool, mut compositor) = setup(8);
    let base = store.create(LayerKind::Raster, None, &mut pool).unwrap().id;
    let top = store.create(LayerKind::Raster, None, &mut pool).unwrap().id;
    fill(&mut store, &mut pool, base, [255, 255, 255]);
    fill(&mut store, &mut pool, top, [120, 30, 200]);
    store.set_blend_mode(top, BlendMode::Multiply).unwrap();

    compositor.compose(&store, &mut pool).unwrap();
    let [r, g, b, _] = composed(&pool).pixel_rgba(4, 4).unwrap();
    assert!((i32::from(r) - 120).abs() <= 1);
    assert!((i32::from(g) - 30).abs() <= 1);
    assert!((i32::from(b) - 200).abs() <= 1);
}

#[test]
fn test_mismatched_layer_is_skipped() {
    let (mut store, mut pool, mut compositor) = setup(8);
    let a = store.create(LayerKind::Raster, None, &mut pool).unwrap().id;
    let b = store.create(LayerKind::Raster, None, &mut pool).unwrap().id;
    fill(&mut store, &mut pool, a, [1, 2, 3]);
    // simulate a surface that lost its binding
    pool.release(&SurfaceKey::Layer(b));

    let stats = compositor.compose(&store, &mut pool).unwrap();
    assert_eq!(stats.drawn, 1);
    assert_eq!(stats.skipped, 1);
    assert_eq!(composed(&pool).pixel_rgba(0, 0), Some([1, 2, 3, 255]));
}

#[test]
fn test_frame_skips_unchanged_store() {
    let (mut store, mut pool, mut compositor) = setup(8);
    store.create(LayerKind::Raster, None, &mut pool).unwrap();
    assert!(compositor.compose_if_dirty(&store, &mut pool).unwrap().is_some());
    assert!(compositor.compose_if_dirty(&store, &mut pool).unwrap().is_none());

    let id = store.active_id().unwrap();
    fill(&mut store, &mut pool, id, [9, 9, 9]);
    assert!(compositor.compose_if_dirty(&store, &mut pool).unwrap().is_some());
}

#[test]
fn test_puff_color_uses_intensity_alpha() {
    let mut config = EngineConfig::with_canvas(32, 32);
    config.patterns.default_color = ThreadColor::new(255, 0, 0);
    config.patterns.puff_intensity = 0.5;
    let mut session = CompositingSession::new(config).unwrap();
    session.on_tool_activated("puff", None).unwrap();
    session
        .on_path_completed(StitchPath::new(vec![Point::new(16.0, 16.0), Point::new(16.5, 16.0)]))
        .unwrap();
    session.frame().unwrap();

    let [r, _, _, a] = session.composed_surface().unwrap().pixel_rgba(16, 16).unwrap();
    assert!(r >= 250, "red {}", r);
    // two overlapping half-alpha stamps
    assert!(a > 128 && a < 255, "alpha {}", a);
    assert!(session.displacement_surface().unwrap().scalar(16, 16).unwrap() > 128);
}
