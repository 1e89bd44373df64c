use loomkit_core::{DiagnosticEvent, Point, SessionEvent};
use loomkit_engine::{CompositingSession, LayerKind, PatternConfig, StitchPath, VectorPath};
use loomkit_settings::EngineConfig;

fn path() -> StitchPath {
    StitchPath::new(vec![
        Point::new(4.0, 30.0),
        Point::new(30.0, 6.0),
        Point::new(56.0, 30.0),
    ])
}

fn session_with_default(default: &str) -> CompositingSession {
    let mut config = EngineConfig::with_canvas(64, 64);
    config.patterns.default_pattern = default.to_string();
    config.events.enable_history = true;
    CompositingSession::new(config).unwrap()
}

fn committed_pattern(session: &mut CompositingSession, tool: &str, over: Option<&str>) -> String {
    session.on_tool_activated(tool, over).unwrap();
    session.on_path_completed(path()).unwrap().unwrap().pattern_type
}

#[test]
fn test_override_beats_concrete_tool() {
    let mut session = session_with_default("satin");
    assert_eq!(committed_pattern(&mut session, "cross-stitch", Some("chain")), "chain");
}

#[test]
fn test_concrete_tool_beats_default() {
    let mut session = session_with_default("satin");
    assert_eq!(committed_pattern(&mut session, "zigzag", None), "zigzag");
}

#[test]
fn test_generic_tool_uses_default() {
    let mut session = session_with_default("chain");
    assert_eq!(committed_pattern(&mut session, "embroidery", None), "chain");
    assert_eq!(committed_pattern(&mut session, "Stitch", None), "chain");
}

#[test]
fn test_blank_override_is_ignored() {
    let mut session = session_with_default("satin");
    assert_eq!(committed_pattern(&mut session, "meander", Some("  ")), "meander");
    assert_eq!(committed_pattern(&mut session, "embroidery", Some("")), "satin");
}

#[test]
fn test_path_without_tool_uses_default() {
    let mut session = session_with_default("outline");
    let commit = session.on_path_completed(path()).unwrap().unwrap();
    assert_eq!(commit.pattern_type, "outline");
}

#[test]
fn test_unknown_tool_falls_back_with_diagnostic() {
    let mut session = session_with_default("satin");
    let commit = {
        session.on_tool_activated("basketweave", None).unwrap();
        session.on_path_completed(path()).unwrap().unwrap()
    };
    assert_eq!(commit.pattern_type, "basketweave");
    assert!(commit.units > 0);

    let history = session.bus().history(None);
    assert!(history.iter().any(|e| matches!(
        e,
        SessionEvent::Diagnostic(DiagnosticEvent::PatternFallback { pattern_type })
            if pattern_type == "basketweave"
    )));
}

#[test]
fn test_vector_paths_follow_same_order() {
    let mut session = session_with_default("satin");
    let style = PatternConfig::new("satin").with_thickness(4.0);
    let points = path().points;

    let by_default = session
        .add_vector_path(None, VectorPath::new(points.clone(), "pen", style.clone()))
        .unwrap();
    assert_eq!(by_default.pattern_type, "satin");

    let by_tool = session
        .add_vector_path(None, VectorPath::new(points.clone(), "ripple", style.clone()))
        .unwrap();
    assert_eq!(by_tool.pattern_type, "ripple");

    let by_override = session
        .add_vector_path(
            None,
            VectorPath::new(points, "ripple", style).with_override("chain"),
        )
        .unwrap();
    assert_eq!(by_override.pattern_type, "chain");

    // all three share the vector layer
    assert_eq!(by_default.layer, by_override.layer);
    assert_eq!(session.store().layer(by_default.layer).unwrap().kind, LayerKind::Vector);
}

#[test]
fn test_vector_tool_activation_carries_override() {
    let mut session = session_with_default("satin");
    assert_eq!(committed_pattern(&mut session, "pen", Some("double-satin")), "double-satin");
    assert_eq!(committed_pattern(&mut session, "pen", None), "satin");
}
