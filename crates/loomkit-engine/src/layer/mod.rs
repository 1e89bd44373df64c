//! Layers, groups and the store that orders them.

pub mod group;
pub mod model;
pub mod store;

pub use group::LayerGroup;
pub use model::{
    BlendMode, BrushSample, BrushStroke, EmbroideryStroke, Layer, LayerKind, PuffSample,
    ToolPayload, VectorPath,
};
pub use store::LayerStore;
