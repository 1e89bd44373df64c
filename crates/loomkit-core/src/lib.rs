//! # Loomkit Core
//!
//! Core types and utilities shared by every Loomkit crate:
//! error taxonomy, typed ids, geometry utilities, thread colors,
//! reproducible per-stitch randomness and the session event bus.

pub mod color;
pub mod error;
pub mod event_bus;
pub mod geometry;
pub mod ids;
pub mod prng;

pub use color::{adjust_brightness, clamp_channel, ThreadColor};
pub use error::{EngineError, Error, Result, SnapshotError};
pub use event_bus::{
    CompositionEvent, DiagnosticEvent, EventBus, EventBusConfig, EventCategory, EventFilter,
    LayerEvent, SessionEvent, SubscriptionId, ToolEvent,
};
pub use geometry::Point;
pub use ids::{GroupId, LayerId};
pub use prng::StitchJitter;
