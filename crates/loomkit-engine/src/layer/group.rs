//! Layer groups: organizational aggregates without a surface of their own.

use std::collections::BTreeSet;

use loomkit_core::{GroupId, LayerId};
use serde::{Deserialize, Serialize};

use super::model::BlendMode;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerGroup {
    pub id: GroupId,
    pub name: String,
    pub members: BTreeSet<LayerId>,
    /// Hides every member when false
    pub visible: bool,
    /// Multiplied into every member's opacity
    pub opacity: f32,
    /// Recorded for export; members composite with their own blend mode
    pub blend_mode: BlendMode,
    /// Dense position among groups
    pub order: usize,
}

impl LayerGroup {
    pub fn new(name: impl Into<String>, order: usize) -> Self {
        Self {
            id: GroupId::new(),
            name: name.into(),
            members: BTreeSet::new(),
            visible: true,
            opacity: 1.0,
            blend_mode: BlendMode::Normal,
            order,
        }
    }

    pub fn contains(&self, layer: &LayerId) -> bool {
        self.members.contains(layer)
    }
}
