//! Error handling for Loomkit
//!
//! Provides the error types for every layer of the engine:
//! - Engine errors (surfaces, layers, renderers)
//! - Snapshot errors (export/import of the layer store)
//!
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Engine error type
///
/// Covers the failure taxonomy of the compositing engine. Some variants are
/// recovered locally (colors, unknown pattern types) and only travel through
/// this type so they can be logged uniformly.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// Malformed or out-of-range color input
    #[error("Invalid color '{value}': {reason}")]
    InvalidColor {
        /// The offending input, as text.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Reorder request that is not a permutation of the current layer ids
    #[error("Invalid layer order: {reason}")]
    InvalidOrder {
        /// What was wrong with the requested order.
        reason: String,
    },

    /// No renderer declares this pattern type
    #[error("Unknown pattern type: {pattern_type}")]
    UnknownPatternType {
        /// The unresolved pattern type.
        pattern_type: String,
    },

    /// A renderer rejected the configuration it was given
    #[error("Renderer '{pattern_type}' rejected config: {reason}")]
    RendererValidationFailed {
        /// The pattern type of the rejecting renderer.
        pattern_type: String,
        /// The validation failure.
        reason: String,
    },

    /// The surface pool cannot satisfy an acquire
    #[error("Surface pool exhausted: {requested_bytes} bytes requested, {in_use_bytes} in use, ceiling {ceiling_bytes}")]
    ResourceExhaustion {
        /// Size of the surface that was requested.
        requested_bytes: usize,
        /// Bytes held by bound surfaces at the time of the request.
        in_use_bytes: usize,
        /// The configured ceiling.
        ceiling_bytes: usize,
    },

    /// Zero or otherwise unusable surface dimensions
    #[error("Invalid surface dimensions {width}x{height}")]
    InvalidDimensions {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
    },

    /// Layer id not present in the store
    #[error("Layer not found: {id}")]
    LayerNotFound {
        /// The missing id.
        id: String,
    },

    /// Group id not present in the store
    #[error("Group not found: {id}")]
    GroupNotFound {
        /// The missing id.
        id: String,
    },

    /// Attempt to create an entry whose id already exists
    #[error("Duplicate id: {id}")]
    DuplicateId {
        /// The colliding id.
        id: String,
    },

    /// Pixel write into a locked layer
    #[error("Layer {id} is locked")]
    LayerLocked {
        /// The locked layer.
        id: String,
    },

    /// Payload of a different tool family appended to a layer
    #[error("Layer {id} holds {found} payload, cannot append {expected}")]
    PayloadMismatch {
        /// The target layer.
        id: String,
        /// The payload family being appended.
        expected: String,
        /// The payload family already stored.
        found: String,
    },

    /// Operation requires a different pixel format
    #[error("Operation '{operation}' is not supported on {format} surfaces")]
    UnsupportedSurfaceFormat {
        /// The attempted operation.
        operation: String,
        /// The format of the target surface.
        format: String,
    },
}

impl EngineError {
    /// Build an `InvalidOrder` error from a message
    pub fn invalid_order(reason: impl Into<String>) -> Self {
        EngineError::InvalidOrder {
            reason: reason.into(),
        }
    }

    /// Build an `InvalidColor` error from the offending value and a reason
    pub fn invalid_color(value: impl Into<String>, reason: impl Into<String>) -> Self {
        EngineError::InvalidColor {
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Whether the failure is recovered locally and must never abort a render
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            EngineError::InvalidColor { .. }
                | EngineError::UnknownPatternType { .. }
                | EngineError::RendererValidationFailed { .. }
        )
    }
}

/// Snapshot error type
///
/// Represents failures while exporting or importing a layer store snapshot.
#[derive(Error, Debug)]
pub enum SnapshotError {
    /// Snapshot written by an incompatible format version
    #[error("Unsupported snapshot version {found} (expected {expected})")]
    UnsupportedVersion {
        /// The version found in the file.
        found: String,
        /// The version this build writes.
        expected: String,
    },

    /// JSON encoding or decoding failed
    #[error("Snapshot JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The snapshot content violates a store invariant
    #[error("Corrupted snapshot: {0}")]
    Corrupted(String),
}

/// Main error type for Loomkit
///
/// A unified error type that can represent any error from all layers.
/// This is the primary error type used in public APIs.
#[derive(Error, Debug)]
pub enum Error {
    /// Engine error
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Snapshot error
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Check if this is an engine error
    pub fn is_engine_error(&self) -> bool {
        matches!(self, Error::Engine(_))
    }

    /// Check if this is a resource exhaustion failure
    pub fn is_resource_exhaustion(&self) -> bool {
        matches!(self, Error::Engine(EngineError::ResourceExhaustion { .. }))
    }

    /// Borrow the engine error, if this is one
    pub fn as_engine(&self) -> Option<&EngineError> {
        match self {
            Error::Engine(e) => Some(e),
            _ => None,
        }
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;
