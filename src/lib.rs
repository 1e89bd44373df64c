//! # Loomkit
//!
//! Layered, non-destructive surface decoration for garment textures.
//! Embroidery stitches, procedural prints and vector patterns are drawn into
//! layers and composited into three outputs:
//! - a color surface
//! - a displacement (height) surface
//! - a normal surface derived from the displacement
//!
//! ## Architecture
//!
//! Loomkit is organized as a workspace with multiple crates:
//!
//! 1. **loomkit-core** - Errors, ids, geometry, thread colors, event bus
//! 2. **loomkit-settings** - Engine configuration and persistence
//! 3. **loomkit-engine** - Surfaces, layers, pattern renderers, compositor, session
//! 4. **loomkit** - Logging setup and the headless renderer binary

pub use loomkit_core::{
    CompositionEvent, DiagnosticEvent, EngineError, Error, EventBus, EventFilter, LayerEvent,
    LayerId, Point, Result, SessionEvent, ThreadColor, ToolEvent,
};
pub use loomkit_engine::{
    BlendMode, CompositingSession, LayerKind, LayerSnapshot, PatternConfig, PatternRegistry,
    PatternRenderer, StitchPath, Surface, VectorPath,
};
pub use loomkit_settings::EngineConfig;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging with the default configuration
///
/// Sets up structured logging with:
/// - Console output with pretty formatting
/// - RUST_LOG environment variable support
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .pretty();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {}", e))?;

    Ok(())
}

/// Draw a small sampler into `session`: one path per built-in family, a
/// puff print and a brush stroke.
pub fn draw_demo(session: &mut CompositingSession) -> Result<()> {
    let (w, h) = session.dimensions();
    let (w, h) = (w as f32, h as f32);
    let ids: Vec<&'static str> = session.registry().pattern_ids();
    let rows = ids.len() as f32 + 2.0;

    for (i, id) in ids.iter().enumerate() {
        let y = h * (i as f32 + 1.0) / rows;
        let points = (0..=24)
            .map(|k| {
                let t = k as f32 / 24.0;
                Point::new(w * (0.08 + 0.84 * t), y + (t * 9.0).sin() * h / rows * 0.3)
            })
            .collect();
        session.on_tool_activated(id, None)?;
        session.on_path_completed(StitchPath::new(points))?;
    }

    let y = h * (rows - 1.0) / rows;
    session.on_tool_activated("puff", None)?;
    session.on_path_completed(StitchPath::new(vec![
        Point::new(w * 0.1, y),
        Point::new(w * 0.5, y - h * 0.05),
        Point::new(w * 0.9, y),
    ]))?;
    session.on_tool_activated("brush", None)?;
    session.on_path_completed(StitchPath::new(vec![
        Point::new(w * 0.1, h * 0.97),
        Point::new(w * 0.9, h * 0.97),
    ]))?;
    session.on_mode_exited()?;
    Ok(())
}
