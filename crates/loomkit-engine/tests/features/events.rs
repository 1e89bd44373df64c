use std::sync::{Arc, Mutex};

use loomkit_core::{
    CompositionEvent, EventCategory, EventFilter, LayerEvent, Point, SessionEvent, ToolEvent,
};
use loomkit_engine::{CompositingSession, LayerKind, StitchPath};
use loomkit_settings::EngineConfig;

#[tokio::test]
async fn test_async_receiver_sees_layer_creation() {
    let mut session = CompositingSession::new(EngineConfig::with_canvas(16, 16)).unwrap();
    let mut rx = session.bus().receiver();

    let id = session.create_layer(LayerKind::Raster, Some("base")).unwrap();

    match rx.recv().await.unwrap() {
        SessionEvent::Layer(LayerEvent::Created { id: got, name }) => {
            assert_eq!(got, id);
            assert_eq!(name, "base");
        }
        other => panic!("unexpected event {:?}", other),
    }
    assert_eq!(
        rx.recv().await.unwrap(),
        SessionEvent::Layer(LayerEvent::ActiveChanged { id: Some(id) })
    );
}

#[test]
fn test_commit_and_frame_events_in_order() {
    let mut session = CompositingSession::new(EngineConfig::with_canvas(32, 32)).unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    session.bus().subscribe(
        EventFilter::Categories(vec![EventCategory::Tool, EventCategory::Composition]),
        move |event| sink.lock().unwrap().push(event),
    );

    session.on_tool_activated("chain", None).unwrap();
    session
        .on_path_completed(StitchPath::new(vec![Point::new(2.0, 2.0), Point::new(30.0, 30.0)]))
        .unwrap();
    session.frame().unwrap();

    let events = seen.lock().unwrap();
    assert!(matches!(
        events.first(),
        Some(SessionEvent::Tool(ToolEvent::Activated { tool, .. })) if tool == "chain"
    ));
    let completed = events
        .iter()
        .position(|e| matches!(e, SessionEvent::Tool(ToolEvent::PathCompleted { .. })))
        .unwrap();
    let composed = events
        .iter()
        .position(|e| matches!(e, SessionEvent::Composition(CompositionEvent::Composed { .. })))
        .unwrap();
    let ready = events
        .iter()
        .position(|e| matches!(e, SessionEvent::Composition(CompositionEvent::FrameReady { .. })))
        .unwrap();
    assert!(completed < composed && composed < ready);
    // no layer events pass the filter
    assert!(events.iter().all(|e| e.category() != EventCategory::Layer));
}

#[test]
fn test_mode_exit_is_announced() {
    let mut session = CompositingSession::new(EngineConfig::with_canvas(16, 16)).unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    session
        .bus()
        .subscribe(EventFilter::All, move |event| sink.lock().unwrap().push(event));

    session.on_tool_activated("satin", None).unwrap();
    session.on_mode_exited().unwrap();
    assert!(session.active_tool().is_none());
    assert_eq!(
        seen.lock().unwrap().last(),
        Some(&SessionEvent::Tool(ToolEvent::ModeExited))
    );
}
