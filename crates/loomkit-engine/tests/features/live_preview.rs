use std::time::{Duration, Instant};

use loomkit_core::Point;
use loomkit_engine::{CompositingSession, StitchPath};
use loomkit_settings::EngineConfig;

fn session(window_ms: u64) -> CompositingSession {
    let mut config = EngineConfig::with_canvas(64, 64);
    config.render.throttle_window_ms = window_ms;
    CompositingSession::new(config).unwrap()
}

fn wave(n: usize) -> Vec<Point> {
    (0..n)
        .map(|i| Point::new(2.0 + i as f32, 32.0 + (i as f32 * 0.3).sin() * 10.0))
        .collect()
}

#[test]
fn test_burst_renders_once_and_drops_superseded() {
    let mut session = session(50);
    session.on_tool_activated("satin", None).unwrap();
    let now = Instant::now();
    let points = wave(10);
    for p in &points {
        session.on_point_added(*p, now).unwrap();
    }

    assert_eq!(session.preview_renders(), 1);
    assert_eq!(session.dropped_previews(), points.len() as u64 - 2);
    assert_eq!(session.in_progress().len(), points.len());

    assert!(!session.tick(now + Duration::from_millis(10)).unwrap());
    assert!(session.tick(now + Duration::from_millis(50)).unwrap());
    assert_eq!(session.preview_renders(), 2);
    assert!(!session.tick(now + Duration::from_millis(200)).unwrap());
}

#[test]
fn test_spaced_points_each_render() {
    let mut session = session(8);
    session.on_tool_activated("chain", None).unwrap();
    let start = Instant::now();
    for (i, p) in wave(5).into_iter().enumerate() {
        session
            .on_point_added(p, start + Duration::from_millis(10 * i as u64))
            .unwrap();
    }
    assert_eq!(session.preview_renders(), 5);
    assert_eq!(session.dropped_previews(), 0);
}

#[test]
fn test_preview_is_subsampled_but_commit_is_not() {
    let mut config = EngineConfig::with_canvas(64, 64);
    config.render.preview_max_points = 10;
    let mut session = CompositingSession::new(config).unwrap();
    session.on_tool_activated("satin", None).unwrap();

    let points = wave(50);
    let now = Instant::now();
    for p in &points {
        session.on_point_added(*p, now).unwrap();
    }
    let preview = session.preview_path();
    assert!(preview.len() <= 10, "preview has {} points", preview.len());
    assert_eq!(preview.points.first(), points.first());
    assert_eq!(preview.points.last(), points.last());

    let commit = session
        .on_path_completed(StitchPath::new(points.clone()))
        .unwrap()
        .unwrap();
    assert_eq!(commit.points, 50);
    assert_eq!(commit.units, 50);
    assert!(session.in_progress().is_empty());
}

#[test]
fn test_overlay_never_reaches_composed() {
    let mut session = session(8);
    session.on_tool_activated("satin", None).unwrap();
    let now = Instant::now();
    for p in wave(20) {
        session.on_point_added(p, now).unwrap();
    }
    session.flush_preview().unwrap();
    session.frame().unwrap();

    assert!(!session.overlay_surface().unwrap().is_clear());
    assert!(session.composed_surface().unwrap().is_clear());
    assert!(session.store().is_empty());
}

#[test]
fn test_mode_exit_commits_and_clears_overlay() {
    let mut session = session(8);
    session.on_tool_activated("satin", None).unwrap();
    let now = Instant::now();
    for p in wave(20) {
        session.on_point_added(p, now).unwrap();
    }
    session.flush_preview().unwrap();
    assert!(!session.overlay_surface().unwrap().is_clear());

    let commit = session.on_mode_exited().unwrap().unwrap();
    assert_eq!(commit.points, 20);
    assert!(session.overlay_surface().unwrap().is_clear());

    session.frame().unwrap();
    assert!(!session.composed_surface().unwrap().is_clear());
    assert!(session.overlay_surface().unwrap().is_clear());
}

#[test]
fn test_completion_cancels_pending_preview() {
    let mut session = session(50);
    session.on_tool_activated("satin", None).unwrap();
    let now = Instant::now();
    for p in wave(4) {
        session.on_point_added(p, now).unwrap();
    }
    session
        .on_path_completed(StitchPath::new(wave(4)))
        .unwrap();
    let renders = session.preview_renders();

    assert!(!session.tick(now + Duration::from_millis(100)).unwrap());
    assert_eq!(session.preview_renders(), renders);
}

#[test]
fn test_resize_during_drawing_keeps_committed_content() {
    let mut session = session(8);
    session.on_tool_activated("cross-stitch", None).unwrap();
    session
        .on_path_completed(StitchPath::new(wave(40)))
        .unwrap();
    session.on_point_added(Point::new(5.0, 5.0), Instant::now()).unwrap();

    session.resize(96, 48).unwrap();
    session.frame().unwrap();

    assert_eq!(session.composed_surface().unwrap().dimensions(), (96, 48));
    assert!(!session.composed_surface().unwrap().is_clear());
    assert_eq!(session.in_progress().len(), 1);
}
