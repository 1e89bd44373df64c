//! Tool classification
//!
//! Maps tool names reported by the input side onto the family of payload
//! they produce. A generic embroidery tool carries no pattern of its own;
//! a concrete one (e.g. `zigzag`) names the pattern it stitches.

use std::collections::BTreeSet;

use crate::patterns::{normalize_pattern_name, PatternRegistry};

/// What a tool draws
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolKind {
    Brush,
    Puff,
    Vector,
    /// `pattern_type` is `None` for the generic embroidery tool
    Embroidery { pattern_type: Option<String> },
}

impl ToolKind {
    /// Concrete pattern carried by the tool, if any.
    pub fn pattern_type(&self) -> Option<&str> {
        match self {
            ToolKind::Embroidery { pattern_type } => pattern_type.as_deref(),
            _ => None,
        }
    }
}

const BRUSH_TOOLS: &[&str] = &["brush", "paint", "paintbrush"];
const PUFF_TOOLS: &[&str] = &["puff", "puffprint"];
const VECTOR_TOOLS: &[&str] = &["vector", "pen", "vectorpen"];
const GENERIC_EMBROIDERY: &[&str] = &["embroidery", "stitch", "embroiderytool"];

/// Known pattern-type identifiers, normalized
#[derive(Debug, Clone, Default)]
pub struct ToolClassifier {
    pattern_types: BTreeSet<String>,
}

impl ToolClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classifier knowing every identifier declared in `registry`.
    pub fn from_registry(registry: &PatternRegistry) -> Self {
        let mut classifier = Self::new();
        for id in registry.pattern_ids() {
            classifier.register_pattern_type(id);
        }
        for name in registry.declared_types() {
            classifier.register_pattern_type(name);
        }
        classifier
    }

    /// Add an identifier consulted when classifying tool names.
    pub fn register_pattern_type(&mut self, name: &str) {
        self.pattern_types.insert(normalize_pattern_name(name));
    }

    pub fn is_pattern_type(&self, name: &str) -> bool {
        self.pattern_types.contains(&normalize_pattern_name(name))
    }

    pub fn classify(&self, tool: &str) -> ToolKind {
        let key = normalize_pattern_name(tool);
        if BRUSH_TOOLS.contains(&key.as_str()) {
            ToolKind::Brush
        } else if PUFF_TOOLS.contains(&key.as_str()) {
            ToolKind::Puff
        } else if VECTOR_TOOLS.contains(&key.as_str()) {
            ToolKind::Vector
        } else if GENERIC_EMBROIDERY.contains(&key.as_str()) {
            ToolKind::Embroidery { pattern_type: None }
        } else {
            if !self.is_pattern_type(tool) {
                tracing::debug!("Tool '{}' is not a known pattern type", tool);
            }
            // unknown names still stitch; the registry falls back to outline
            ToolKind::Embroidery {
                pattern_type: Some(tool.to_string()),
            }
        }
    }
}

/// Pattern type used for a stroke.
///
/// An explicit per-shape override wins over the concrete pattern of the
/// active tool, which wins over the configured default.
pub fn resolve_pattern<'a>(
    explicit: Option<&'a str>,
    tool_pattern: Option<&'a str>,
    default: &'a str,
) -> &'a str {
    explicit
        .filter(|s| !s.trim().is_empty())
        .or(tool_pattern.filter(|s| !s.trim().is_empty()))
        .unwrap_or(default)
}
