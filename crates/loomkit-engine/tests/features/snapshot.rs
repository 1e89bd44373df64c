use loomkit_core::{EngineError, Error, Point, SnapshotError};
use loomkit_engine::surface::estimate_bytes;
use loomkit_engine::{CompositingSession, LayerKind, LayerSnapshot, StitchPath, SurfaceKey};
use loomkit_settings::EngineConfig;
use tempfile::TempDir;

fn drawn_session() -> CompositingSession {
    let mut session = CompositingSession::new(EngineConfig::with_canvas(64, 64)).unwrap();
    session.set_name("sampler");

    session.on_tool_activated("cross-stitch", None).unwrap();
    session
        .on_path_completed(StitchPath::new(vec![
            Point::new(4.0, 8.0),
            Point::new(60.0, 8.0),
            Point::new(60.0, 40.0),
        ]))
        .unwrap();

    session.on_tool_activated("puff", None).unwrap();
    session
        .on_path_completed(StitchPath::new(vec![Point::new(20.0, 30.0), Point::new(44.0, 50.0)]))
        .unwrap();

    session.on_tool_activated("brush", None).unwrap();
    let brush = session
        .on_path_completed(StitchPath::new(vec![Point::new(2.0, 60.0), Point::new(62.0, 58.0)]))
        .unwrap()
        .unwrap();

    session.on_tool_activated("satin", Some("ripple")).unwrap();
    session
        .on_path_completed(StitchPath::new(vec![Point::new(10.0, 20.0), Point::new(50.0, 24.0)]))
        .unwrap();

    let ids = session.store().ids();
    let (store, _) = session.layers_mut();
    store.set_opacity(brush.layer, 0.4).unwrap();
    store.create_group("top", &ids[2..]).unwrap();
    session.frame().unwrap();
    session
}

#[test]
fn test_round_trip_is_pixel_identical() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("sampler.json");

    let original = drawn_session();
    original.save_snapshot(&file).unwrap();
    let composed = original.composed_surface().unwrap().data().to_vec();
    let displacement = original.displacement_surface().unwrap().data().to_vec();

    let mut restored = CompositingSession::new(EngineConfig::with_canvas(64, 64)).unwrap();
    restored.load_snapshot(&file).unwrap();
    restored.frame().unwrap();

    assert_eq!(restored.store().ids(), original.store().ids());
    assert_eq!(restored.store().active_id(), original.store().active_id());
    assert_eq!(restored.composed_surface().unwrap().data(), composed.as_slice());
    assert_eq!(
        restored.displacement_surface().unwrap().data(),
        displacement.as_slice()
    );
}

#[test]
fn test_groups_and_metadata_survive() {
    let original = drawn_session();
    let json = original.snapshot().to_json().unwrap();
    let snapshot = LayerSnapshot::from_json(&json).unwrap();
    assert_eq!(snapshot.metadata.name, "sampler");
    assert_eq!(snapshot.groups.len(), 1);
    assert_eq!(snapshot.groups[0].members.len(), 2);

    let mut restored = CompositingSession::new(EngineConfig::with_canvas(64, 64)).unwrap();
    restored.restore(snapshot).unwrap();
    let group = &restored.store().groups()[0];
    assert_eq!(group.name, "top");
    for id in &original.store().ids()[2..] {
        assert!(group.members.contains(id));
    }
    let brush = restored
        .store()
        .layers()
        .iter()
        .find(|l| l.tool.as_deref() == Some("brush"))
        .unwrap();
    assert!((brush.opacity - 0.4).abs() < 1e-6);
}

#[test]
fn test_restore_adopts_snapshot_dimensions() {
    let snapshot = drawn_session().snapshot();
    let mut restored = CompositingSession::new(EngineConfig::with_canvas(32, 32)).unwrap();
    restored.restore(snapshot).unwrap();
    restored.frame().unwrap();
    assert_eq!(restored.dimensions(), (64, 64));
    assert_eq!(restored.composed_surface().unwrap().dimensions(), (64, 64));
}

#[test]
fn test_other_version_is_rejected_without_changes() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("future.json");
    let mut snapshot = drawn_session().snapshot();
    snapshot.version = "2.0".to_string();
    std::fs::write(&file, serde_json::to_string(&snapshot).unwrap()).unwrap();

    let mut session = CompositingSession::new(EngineConfig::with_canvas(64, 64)).unwrap();
    session.on_tool_activated("satin", None).unwrap();
    session
        .on_path_completed(StitchPath::new(vec![Point::new(1.0, 1.0), Point::new(9.0, 9.0)]))
        .unwrap();
    let before = session.store().ids();

    let err = session.load_snapshot(&file).unwrap_err();
    assert!(matches!(
        err,
        Error::Snapshot(SnapshotError::UnsupportedVersion { .. })
    ));
    assert_eq!(session.store().ids(), before);
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = TempDir::new().unwrap();
    let mut session = CompositingSession::new(EngineConfig::with_canvas(8, 8)).unwrap();
    let err = session.load_snapshot(&dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}

#[test]
fn test_restore_over_ceiling_keeps_existing_layers() {
    let mut source = CompositingSession::new(EngineConfig::with_canvas(16, 16)).unwrap();
    for _ in 0..6 {
        source.create_layer(LayerKind::Raster, None).unwrap();
    }
    let snapshot = source.snapshot();

    let mut config = EngineConfig::with_canvas(16, 16);
    config.pool.memory_ceiling_bytes = 4 * estimate_bytes(16, 16);
    let mut session = CompositingSession::new(config).unwrap();
    session.on_tool_activated("satin", None).unwrap();
    let commit = session
        .on_path_completed(StitchPath::new(vec![Point::new(2.0, 8.0), Point::new(14.0, 8.0)]))
        .unwrap()
        .unwrap();
    let ids = session.store().ids();
    let stats = session.pool_stats();

    let err = session.restore(snapshot).unwrap_err();
    assert!(matches!(
        err.as_engine(),
        Some(EngineError::ResourceExhaustion { .. })
    ));
    assert_eq!(session.store().ids(), ids);
    assert_eq!(session.pool_stats(), stats);
    assert_eq!(session.dimensions(), (16, 16));
    let (_, pool) = session.layers_mut();
    assert!(!pool.get(&SurfaceKey::Layer(commit.layer)).unwrap().is_clear());
}
