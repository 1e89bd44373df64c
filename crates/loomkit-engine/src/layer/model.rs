//! Layer data model.

use chrono::{DateTime, Utc};
use loomkit_core::{EngineError, LayerId, Point, ThreadColor};
use serde::{Deserialize, Serialize};

use crate::path::StitchPath;
use crate::patterns::{PatternConfig, RenderOptions};

/// Raster layers hold pixels drawn by tools; vector layers hold editable
/// paths that are rasterized on every change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerKind {
    Raster,
    Vector,
}

/// Per-pixel combination used when compositing a layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlendMode {
    #[default]
    Normal,
    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
    ColorDodge,
    ColorBurn,
    HardLight,
    SoftLight,
    Difference,
    Exclusion,
    /// Plus-lighter
    Additive,
}

impl BlendMode {
    pub const ALL: [BlendMode; 13] = [
        BlendMode::Normal,
        BlendMode::Multiply,
        BlendMode::Screen,
        BlendMode::Overlay,
        BlendMode::Darken,
        BlendMode::Lighten,
        BlendMode::ColorDodge,
        BlendMode::ColorBurn,
        BlendMode::HardLight,
        BlendMode::SoftLight,
        BlendMode::Difference,
        BlendMode::Exclusion,
        BlendMode::Additive,
    ];

    pub fn to_skia(self) -> tiny_skia::BlendMode {
        use tiny_skia::BlendMode as Sk;
        match self {
            BlendMode::Normal => Sk::SourceOver,
            BlendMode::Multiply => Sk::Multiply,
            BlendMode::Screen => Sk::Screen,
            BlendMode::Overlay => Sk::Overlay,
            BlendMode::Darken => Sk::Darken,
            BlendMode::Lighten => Sk::Lighten,
            BlendMode::ColorDodge => Sk::ColorDodge,
            BlendMode::ColorBurn => Sk::ColorBurn,
            BlendMode::HardLight => Sk::HardLight,
            BlendMode::SoftLight => Sk::SoftLight,
            BlendMode::Difference => Sk::Difference,
            BlendMode::Exclusion => Sk::Exclusion,
            BlendMode::Additive => Sk::Plus,
        }
    }
}

/// One brush sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BrushSample {
    pub position: Point,
    pub color: ThreadColor,
    pub width: f32,
}

/// An ordered run of brush samples
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BrushStroke {
    pub samples: Vec<BrushSample>,
}

/// A path converted to stitches of one pattern type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbroideryStroke {
    pub pattern_type: String,
    pub path: StitchPath,
    pub config: PatternConfig,
    #[serde(default)]
    pub options: RenderOptions,
}

/// One raised (or sunken) spot of a puff print
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PuffSample {
    pub position: Point,
    pub radius: f32,
    /// In [-1, 1]; 0 is flat
    pub intensity: f32,
}

/// An editable vector path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorPath {
    pub points: Vec<Point>,
    #[serde(default)]
    pub closed: bool,
    /// Tool that drew the path (a concrete pattern or a generic tool)
    pub tool: String,
    /// Explicit stitch type chosen for this path
    #[serde(default)]
    pub stitch_type_override: Option<String>,
    /// Treat points as B-spline control points
    #[serde(default)]
    pub smooth: bool,
    pub style: PatternConfig,
}

impl VectorPath {
    pub fn new(points: Vec<Point>, tool: impl Into<String>, style: PatternConfig) -> Self {
        Self {
            points,
            closed: false,
            tool: tool.into(),
            stitch_type_override: None,
            smooth: false,
            style,
        }
    }

    pub fn with_override(mut self, pattern_type: impl Into<String>) -> Self {
        self.stitch_type_override = Some(pattern_type.into());
        self
    }

    pub fn smoothed(mut self) -> Self {
        self.smooth = true;
        self
    }

    /// The path handed to the renderer.
    pub fn stitch_path(&self) -> StitchPath {
        let path = StitchPath {
            points: self.points.clone(),
            closed: self.closed,
        };
        if self.smooth {
            path.smoothed(crate::path::SMOOTHING_TOLERANCE)
        } else {
            path
        }
    }
}

/// Tool-specific content of a layer
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ToolPayload {
    #[default]
    Empty,
    BrushStrokes {
        strokes: Vec<BrushStroke>,
    },
    Embroidery {
        stitches: Vec<EmbroideryStroke>,
    },
    Puff {
        color: ThreadColor,
        samples: Vec<PuffSample>,
    },
    Vector {
        paths: Vec<VectorPath>,
    },
}

impl ToolPayload {
    pub fn family(&self) -> &'static str {
        match self {
            ToolPayload::Empty => "empty",
            ToolPayload::BrushStrokes { .. } => "brush",
            ToolPayload::Embroidery { .. } => "embroidery",
            ToolPayload::Puff { .. } => "puff",
            ToolPayload::Vector { .. } => "vector",
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            ToolPayload::Empty => true,
            ToolPayload::BrushStrokes { strokes } => strokes.is_empty(),
            ToolPayload::Embroidery { stitches } => stitches.is_empty(),
            ToolPayload::Puff { samples, .. } => samples.is_empty(),
            ToolPayload::Vector { paths } => paths.is_empty(),
        }
    }

    /// Whether this payload feeds the displacement channel.
    pub fn is_displacement(&self) -> bool {
        matches!(self, ToolPayload::Puff { .. })
    }

    /// Whether [`append`](Self::append) would take `other`.
    pub fn accepts(&self, other: &ToolPayload) -> bool {
        matches!(self, ToolPayload::Empty)
            || matches!(other, ToolPayload::Empty)
            || std::mem::discriminant(self) == std::mem::discriminant(other)
    }

    /// Merge `other` into this payload. Appending to an empty payload
    /// adopts the other family; mixing families is refused.
    pub fn append(&mut self, other: ToolPayload, layer: LayerId) -> Result<(), EngineError> {
        if matches!(other, ToolPayload::Empty) {
            return Ok(());
        }
        if matches!(self, ToolPayload::Empty) {
            *self = other;
            return Ok(());
        }
        match (self, other) {
            (ToolPayload::BrushStrokes { strokes }, ToolPayload::BrushStrokes { strokes: more }) => {
                strokes.extend(more);
                Ok(())
            }
            (ToolPayload::Embroidery { stitches }, ToolPayload::Embroidery { stitches: more }) => {
                stitches.extend(more);
                Ok(())
            }
            // the layer keeps its first puff color
            (ToolPayload::Puff { samples, .. }, ToolPayload::Puff { samples: more, .. }) => {
                samples.extend(more);
                Ok(())
            }
            (ToolPayload::Vector { paths }, ToolPayload::Vector { paths: more }) => {
                paths.extend(more);
                Ok(())
            }
            (current, other) => Err(EngineError::PayloadMismatch {
                id: layer.to_string(),
                expected: other.family().to_string(),
                found: current.family().to_string(),
            }),
        }
    }
}

/// One entry of the layer store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub id: LayerId,
    pub kind: LayerKind,
    pub name: String,
    pub visible: bool,
    pub opacity: f32,
    pub blend_mode: BlendMode,
    /// Dense position, 0 is the bottom
    pub order: usize,
    pub locked: bool,
    /// Tool this layer collects output for
    #[serde(default)]
    pub tool: Option<String>,
    #[serde(default)]
    pub payload: ToolPayload,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl Layer {
    pub fn new(kind: LayerKind, name: impl Into<String>, order: usize) -> Self {
        let now = Utc::now();
        Self {
            id: LayerId::new(),
            kind,
            name: name.into(),
            visible: true,
            opacity: 1.0,
            blend_mode: BlendMode::Normal,
            order,
            locked: false,
            tool: None,
            payload: ToolPayload::Empty,
            created_at: now,
            modified_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.modified_at = Utc::now();
    }

    pub fn is_bound_to(&self, tool: &str) -> bool {
        self.tool.as_deref() == Some(tool)
    }
}
