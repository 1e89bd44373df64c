//! Layer store snapshots
//!
//! JSON export of layer metadata, payloads and groups. Pixels are not
//! stored; restoring replays every payload through the renderers.

use std::path::Path;

use chrono::{DateTime, Utc};
use loomkit_core::{LayerId, Result, SnapshotError};
use serde::{Deserialize, Serialize};

use crate::layer::{Layer, LayerGroup, LayerStore};

/// Format version written by this build.
pub const SNAPSHOT_VERSION: &str = "1.0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    pub name: String,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

impl SnapshotMetadata {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            created: now,
            modified: now,
        }
    }
}

/// Serializable state of a [`LayerStore`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSnapshot {
    pub version: String,
    pub metadata: SnapshotMetadata,
    pub width: u32,
    pub height: u32,
    pub layers: Vec<Layer>,
    #[serde(default)]
    pub groups: Vec<LayerGroup>,
    #[serde(default)]
    pub active: Option<LayerId>,
}

impl LayerSnapshot {
    pub fn capture(store: &LayerStore, metadata: SnapshotMetadata) -> Self {
        let (width, height) = store.dimensions();
        Self {
            version: SNAPSHOT_VERSION.to_string(),
            metadata,
            width,
            height,
            layers: store.layers().to_vec(),
            groups: store.groups().to_vec(),
            active: store.active_id(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self).map_err(SnapshotError::from)?)
    }

    /// Parse and check the version header.
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: LayerSnapshot = serde_json::from_str(json).map_err(SnapshotError::from)?;
        snapshot.check()?;
        Ok(snapshot)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        tracing::info!("Saved snapshot '{}' to {}", self.metadata.name, path.display());
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let snapshot = Self::from_json(&json)?;
        tracing::info!(
            "Loaded snapshot '{}' ({} layers) from {}",
            snapshot.metadata.name,
            snapshot.layers.len(),
            path.display()
        );
        Ok(snapshot)
    }

    fn check(&self) -> std::result::Result<(), SnapshotError> {
        if self.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion {
                found: self.version.clone(),
                expected: SNAPSHOT_VERSION.to_string(),
            });
        }
        if self.width == 0 || self.height == 0 {
            return Err(SnapshotError::Corrupted(format!(
                "canvas is {}x{}",
                self.width, self.height
            )));
        }
        Ok(())
    }
}
