//! # Loomkit Engine
//!
//! Layer compositing and procedural pattern synthesis.
//!
//! ## Core Components
//!
//! - **Surfaces**: RGBA color rasters and single-channel height maps
//! - **Surface Pool**: keyed surface ownership with reuse and a memory ceiling
//! - **Layer Store**: ordered layers with visibility, opacity, blend mode,
//!   locking, tool payloads and groups
//! - **Pattern Renderers**: one per stitch or print family, resolved through
//!   a registry with an outline fallback
//! - **Compositor**: composed color, displacement and normal outputs
//! - **Session**: input callbacks, throttled live preview, two-phase frames
//!   and snapshots
//!
//! ## Typical use
//!
//! ```
//! use loomkit_core::Point;
//! use loomkit_engine::{CompositingSession, StitchPath};
//! use loomkit_settings::EngineConfig;
//!
//! let mut session = CompositingSession::new(EngineConfig::with_canvas(128, 128)).unwrap();
//! session.on_tool_activated("cross-stitch", None).unwrap();
//! session
//!     .on_path_completed(StitchPath::new(vec![Point::new(8.0, 64.0), Point::new(120.0, 64.0)]))
//!     .unwrap();
//! session.frame().unwrap();
//! assert!(!session.composed_surface().unwrap().is_clear());
//! ```

pub mod classify;
pub mod compositor;
pub mod layer;
pub mod painter;
pub mod path;
pub mod patterns;
pub mod pool;
pub mod session;
pub mod snapshot;
pub mod surface;
pub mod throttle;

pub use classify::{resolve_pattern, ToolClassifier, ToolKind};
pub use compositor::{ComposeStats, Compositor, NEUTRAL_HEIGHT};
pub use layer::{
    BlendMode, BrushSample, BrushStroke, EmbroideryStroke, Layer, LayerGroup, LayerKind,
    LayerStore, PuffSample, ToolPayload, VectorPath,
};
pub use painter::{PaintReport, Painter};
pub use path::{StitchPath, StitchPoint};
pub use patterns::{PatternConfig, PatternRegistry, PatternRenderer, RenderOptions, RenderOutcome};
pub use pool::{PoolStats, SurfaceKey, SurfacePool};
pub use session::{CompositingSession, PathCommit};
pub use snapshot::{LayerSnapshot, SnapshotMetadata, SNAPSHOT_VERSION};
pub use surface::{Surface, SurfaceFormat};
pub use throttle::{RenderThrottle, ThrottleDecision};
