//! Event type definitions for the session event bus.
//!
//! Events are cloneable and serializable so they can be logged or replayed.

use serde::{Deserialize, Serialize};

use crate::ids::{GroupId, LayerId};

/// Root event enum for everything a compositing session announces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SessionEvent {
    /// Layer store changes
    Layer(LayerEvent),
    /// Composition and derived-output updates
    Composition(CompositionEvent),
    /// Tool and path lifecycle
    Tool(ToolEvent),
    /// Recovered failures worth surfacing
    Diagnostic(DiagnosticEvent),
}

impl SessionEvent {
    /// Get the category of this event
    pub fn category(&self) -> EventCategory {
        match self {
            SessionEvent::Layer(_) => EventCategory::Layer,
            SessionEvent::Composition(_) => EventCategory::Composition,
            SessionEvent::Tool(_) => EventCategory::Tool,
            SessionEvent::Diagnostic(_) => EventCategory::Diagnostic,
        }
    }

    /// Get a short description of this event for logging
    pub fn description(&self) -> String {
        match self {
            SessionEvent::Layer(e) => e.description(),
            SessionEvent::Composition(e) => e.description(),
            SessionEvent::Tool(e) => e.description(),
            SessionEvent::Diagnostic(e) => e.description(),
        }
    }
}

/// Event category for filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventCategory {
    /// Layer store events.
    Layer,
    /// Composition events.
    Composition,
    /// Tool events.
    Tool,
    /// Diagnostic events.
    Diagnostic,
}

impl std::fmt::Display for EventCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventCategory::Layer => write!(f, "Layer"),
            EventCategory::Composition => write!(f, "Composition"),
            EventCategory::Tool => write!(f, "Tool"),
            EventCategory::Diagnostic => write!(f, "Diagnostic"),
        }
    }
}

/// Layer store events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LayerEvent {
    /// A layer was created (or duplicated)
    Created { id: LayerId, name: String },
    /// A layer was deleted and its surface released
    Deleted { id: LayerId },
    /// Layer pixels or payload changed; recomposition needed
    Dirty { id: LayerId },
    /// Visibility, opacity, blend mode or lock changed
    MetadataChanged { id: LayerId },
    /// Layer order changed
    Reordered,
    /// The active layer changed
    ActiveChanged { id: Option<LayerId> },
    /// A group was created, changed or deleted
    GroupChanged { id: GroupId },
}

impl LayerEvent {
    /// Get a short description of this event
    pub fn description(&self) -> String {
        match self {
            LayerEvent::Created { id, name } => format!("Layer created: {} '{}'", id, name),
            LayerEvent::Deleted { id } => format!("Layer deleted: {}", id),
            LayerEvent::Dirty { id } => format!("Layer dirty: {}", id),
            LayerEvent::MetadataChanged { id } => format!("Layer metadata changed: {}", id),
            LayerEvent::Reordered => "Layers reordered".to_string(),
            LayerEvent::ActiveChanged { id: Some(id) } => format!("Active layer: {}", id),
            LayerEvent::ActiveChanged { id: None } => "No active layer".to_string(),
            LayerEvent::GroupChanged { id } => format!("Group changed: {}", id),
        }
    }
}

/// Composition events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CompositionEvent {
    /// The composed surface was regenerated
    Composed { drawn: usize, skipped: usize },
    /// The displacement surface was regenerated
    DisplacementUpdated { samples: usize },
    /// The normal surface was regenerated
    NormalUpdated,
    /// Canonical dimensions changed
    Resized { width: u32, height: u32 },
    /// Persistent content and overlay are both up to date
    FrameReady { frame: u64 },
}

impl CompositionEvent {
    /// Get a short description of this event
    pub fn description(&self) -> String {
        match self {
            CompositionEvent::Composed { drawn, skipped } => {
                format!("Composed {} layers ({} skipped)", drawn, skipped)
            }
            CompositionEvent::DisplacementUpdated { samples } => {
                format!("Displacement updated from {} samples", samples)
            }
            CompositionEvent::NormalUpdated => "Normal map updated".to_string(),
            CompositionEvent::Resized { width, height } => {
                format!("Resized to {}x{}", width, height)
            }
            CompositionEvent::FrameReady { frame } => format!("Frame {} ready", frame),
        }
    }
}

/// Tool and path lifecycle events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ToolEvent {
    /// A tool became active
    Activated {
        tool: String,
        pattern_type: Option<String>,
    },
    /// A path was converted into its final pattern
    PathCompleted {
        layer: LayerId,
        pattern_type: String,
        points: usize,
        stitches: usize,
    },
    /// A pending live preview was superseded and dropped
    PreviewDropped,
    /// The pattern drawing mode was exited
    ModeExited,
}

impl ToolEvent {
    /// Get a short description of this event
    pub fn description(&self) -> String {
        match self {
            ToolEvent::Activated {
                tool,
                pattern_type: Some(p),
            } => format!("Tool activated: {} ({})", tool, p),
            ToolEvent::Activated { tool, .. } => format!("Tool activated: {}", tool),
            ToolEvent::PathCompleted {
                pattern_type,
                points,
                stitches,
                ..
            } => format!(
                "Path completed: {} points as {} ({} stitches)",
                points, pattern_type, stitches
            ),
            ToolEvent::PreviewDropped => "Preview dropped".to_string(),
            ToolEvent::ModeExited => "Pattern mode exited".to_string(),
        }
    }
}

/// Recovered failures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DiagnosticEvent {
    /// A layer was left transparent in the composed output
    LayerSkipped { id: LayerId, reason: String },
    /// A pattern type fell back to the outline renderer
    PatternFallback { pattern_type: String },
}

impl DiagnosticEvent {
    /// Get a short description of this event
    pub fn description(&self) -> String {
        match self {
            DiagnosticEvent::LayerSkipped { id, reason } => {
                format!("Layer {} skipped: {}", id, reason)
            }
            DiagnosticEvent::PatternFallback { pattern_type } => {
                format!("Pattern '{}' fell back to outline", pattern_type)
            }
        }
    }
}
