//! Engine configuration
//!
//! Provides configuration file handling and validation for a compositing
//! session. Supports JSON and TOML file formats; the default file lives in
//! the platform config directory.
//!
//! Configuration is organized into logical sections:
//! - Canvas (canonical texture dimensions)
//! - Pool (surface memory ceiling)
//! - Render (live-preview throttling, thread variation)
//! - Patterns (defaults for new pattern configs)
//! - Events (session event bus history)

use loomkit_core::{EventBusConfig, ThreadColor};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, SettingsError, SettingsResult};

/// Canonical texture dimensions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanvasSettings {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Default for CanvasSettings {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 1024,
        }
    }
}

/// Surface pool limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolSettings {
    /// Upper bound on bytes held by bound surfaces; 0 disables the check
    pub memory_ceiling_bytes: usize,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            memory_ceiling_bytes: 512 * 1024 * 1024,
        }
    }
}

/// Live rendering behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderSettings {
    /// Point-add events closer together than this are coalesced
    pub throttle_window_ms: u64,
    /// Live previews of longer paths are subsampled to about this many points
    pub preview_max_points: usize,
    /// Per-stitch brightness jitter amplitude in channel units (0 disables)
    pub thread_variation: f64,
    /// Seed for the per-stitch jitter streams
    pub jitter_seed: u64,
    /// Cross-stitch restarts its step on every segment
    pub connect_all_points: bool,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            throttle_window_ms: 8,
            preview_max_points: 200,
            thread_variation: 0.0,
            jitter_seed: 0x5eed,
            connect_all_points: false,
        }
    }
}

/// Defaults used when a tool activation does not carry its own style
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternSettings {
    /// Pattern used when a generic embroidery tool is activated
    pub default_pattern: String,
    /// Thread color
    pub default_color: ThreadColor,
    /// Stitch thickness in pixels
    pub default_thickness: f32,
    /// Opacity in [0, 1]
    pub default_opacity: f32,
    /// Stitch density multiplier
    pub default_density: f32,
    /// Intensity of puff samples in [-1, 1]
    pub puff_intensity: f32,
}

impl Default for PatternSettings {
    fn default() -> Self {
        Self {
            default_pattern: "satin".to_string(),
            default_color: ThreadColor::new(0xff, 0x69, 0xb4),
            default_thickness: 3.0,
            default_opacity: 1.0,
            default_density: 1.0,
            puff_intensity: 0.6,
        }
    }
}

/// Session event bus options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventSettings {
    /// Keep a bounded history of published events
    pub enable_history: bool,
    /// Maximum number of retained events
    pub max_history_size: usize,
}

impl Default for EventSettings {
    fn default() -> Self {
        Self {
            enable_history: false,
            max_history_size: 500,
        }
    }
}

/// Complete engine configuration
///
/// Aggregates all settings sections and provides file I/O operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EngineConfig {
    /// Canonical surface size
    #[serde(default)]
    pub canvas: CanvasSettings,
    /// Surface pool limits
    #[serde(default)]
    pub pool: PoolSettings,
    /// Live rendering
    #[serde(default)]
    pub render: RenderSettings,
    /// Pattern defaults
    #[serde(default)]
    pub patterns: PatternSettings,
    /// Event bus
    #[serde(default)]
    pub events: EventSettings,
}

impl EngineConfig {
    /// Create new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Config with a custom canvas size and defaults elsewhere
    pub fn with_canvas(width: u32, height: u32) -> Self {
        Self {
            canvas: CanvasSettings { width, height },
            ..Self::default()
        }
    }

    /// `<config dir>/loomkit/engine.toml`
    pub fn default_config_path() -> SettingsResult<PathBuf> {
        let base = dirs::config_dir().ok_or_else(|| {
            ConfigError::UnsupportedPlatform(std::env::consts::OS.to_string())
        })?;
        Ok(base.join("loomkit").join("engine.toml"))
    }

    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let content = std::fs::read_to_string(path)?;

        let config: Self = match extension(path).as_deref() {
            Some("json") => serde_json::from_str(&content)?,
            Some("toml") => toml::from_str(&content)?,
            other => {
                return Err(ConfigError::UnsupportedFormat(
                    other.unwrap_or("<none>").to_string(),
                )
                .into())
            }
        };

        config.validate()?;
        tracing::debug!("Loaded engine config from {}", path.display());
        Ok(config)
    }

    /// Load from `path` when it exists, defaults otherwise
    pub fn load_or_default(path: &Path) -> SettingsResult<Self> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            tracing::info!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Save config to file (JSON or TOML)
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        self.validate()?;

        let content = match extension(path).as_deref() {
            Some("json") => serde_json::to_string_pretty(self)?,
            Some("toml") => toml::to_string_pretty(self)?,
            other => {
                return Err(ConfigError::UnsupportedFormat(
                    other.unwrap_or("<none>").to_string(),
                )
                .into())
            }
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| SettingsError::ConfigDirectory(e.to_string()))?;
            }
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> SettingsResult<()> {
        if self.canvas.width == 0 || self.canvas.height == 0 {
            return Err(SettingsError::invalid("canvas", "dimensions must be > 0"));
        }

        let surface_bytes = self.canvas.width as usize * self.canvas.height as usize * 4;
        if self.pool.memory_ceiling_bytes != 0 && self.pool.memory_ceiling_bytes < surface_bytes {
            return Err(SettingsError::invalid(
                "pool.memory_ceiling_bytes",
                format!("must hold at least one {} byte surface", surface_bytes),
            ));
        }

        if self.render.preview_max_points < 2 {
            return Err(SettingsError::invalid(
                "render.preview_max_points",
                "must be >= 2",
            ));
        }

        if !self.render.thread_variation.is_finite() || self.render.thread_variation < 0.0 {
            return Err(SettingsError::invalid(
                "render.thread_variation",
                "must be a finite value >= 0",
            ));
        }

        let p = &self.patterns;
        if p.default_pattern.trim().is_empty() {
            return Err(SettingsError::invalid(
                "patterns.default_pattern",
                "must not be empty",
            ));
        }
        if !(p.default_thickness > 0.0) || !p.default_thickness.is_finite() {
            return Err(SettingsError::invalid(
                "patterns.default_thickness",
                "must be > 0",
            ));
        }
        if !(0.0..=1.0).contains(&p.default_opacity) {
            return Err(SettingsError::invalid(
                "patterns.default_opacity",
                "must be within [0, 1]",
            ));
        }
        if !(p.default_density > 0.0) || !p.default_density.is_finite() {
            return Err(SettingsError::invalid(
                "patterns.default_density",
                "must be > 0",
            ));
        }
        if !(-1.0..=1.0).contains(&p.puff_intensity) {
            return Err(SettingsError::invalid(
                "patterns.puff_intensity",
                "must be within [-1, 1]",
            ));
        }

        Ok(())
    }

    /// Coalescing window for live point-add renders
    pub fn throttle_window(&self) -> Duration {
        Duration::from_millis(self.render.throttle_window_ms)
    }

    /// Event bus configuration derived from the events section
    pub fn event_bus_config(&self) -> EventBusConfig {
        EventBusConfig {
            enable_history: self.events.enable_history,
            max_history_size: self.events.max_history_size,
            ..EventBusConfig::default()
        }
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}
