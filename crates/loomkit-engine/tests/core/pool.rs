use loomkit_core::{EngineError, LayerId, Point};
use loomkit_engine::surface::estimate_bytes;
use loomkit_engine::{CompositingSession, LayerKind, StitchPath, SurfaceKey, SurfacePool};
use loomkit_settings::EngineConfig;

#[test]
fn test_third_acquire_over_ceiling_fails_cleanly() {
    let ceiling = 2 * estimate_bytes(16, 16);
    let mut pool = SurfacePool::new(16, 16, ceiling).unwrap();
    let a = SurfaceKey::Layer(LayerId::new());
    let b = SurfaceKey::Layer(LayerId::new());
    let c = SurfaceKey::Layer(LayerId::new());
    pool.acquire_canonical(a).unwrap();
    pool.acquire_canonical(b).unwrap();
    let before = pool.stats();

    let err = pool.acquire_canonical(c).unwrap_err();
    match err.as_engine() {
        Some(EngineError::ResourceExhaustion { ceiling_bytes, .. }) => {
            assert_eq!(*ceiling_bytes, ceiling)
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(pool.stats(), before);

    // freeing one makes room again
    pool.release(&a);
    assert!(pool.acquire_canonical(c).unwrap().is_clear());
    assert_eq!(pool.stats().active, 2);
}

#[test]
fn test_session_layer_creation_respects_ceiling() {
    let mut config = EngineConfig::with_canvas(16, 16);
    config.pool.memory_ceiling_bytes = 2 * estimate_bytes(16, 16);
    let mut session = CompositingSession::new(config).unwrap();

    session.create_layer(LayerKind::Raster, None).unwrap();
    session.create_layer(LayerKind::Raster, None).unwrap();
    let err = session.create_layer(LayerKind::Raster, None).unwrap_err();
    assert!(err.is_resource_exhaustion());
    assert_eq!(session.store().len(), 2);
}

#[test]
fn test_resize_keeps_layer_content() {
    let mut session = CompositingSession::new(EngineConfig::with_canvas(40, 40)).unwrap();
    session.on_tool_activated("satin", None).unwrap();
    session
        .on_path_completed(StitchPath::new(vec![Point::new(5.0, 20.0), Point::new(35.0, 20.0)]))
        .unwrap();
    session.frame().unwrap();

    session.resize(80, 60).unwrap();
    session.frame().unwrap();

    let composed = session.composed_surface().unwrap();
    assert_eq!(composed.dimensions(), (80, 60));
    assert!(!composed.is_clear());
    assert_eq!(session.store().dimensions(), (80, 60));
    let ids = session.store().ids();
    let (_, pool) = session.layers_mut();
    for id in ids {
        let surface = pool.get(&SurfaceKey::Layer(id)).unwrap();
        assert_eq!(surface.dimensions(), (80, 60));
    }
}
