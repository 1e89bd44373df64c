//! Loomkit Settings Crate
//!
//! Handles engine configuration: canvas dimensions, surface pool limits,
//! live-render throttling and pattern defaults.

pub mod config;
pub mod error;

pub use config::{
    CanvasSettings, EngineConfig, EventSettings, PatternSettings, PoolSettings, RenderSettings,
};
pub use error::{ConfigError, SettingsError, SettingsResult};
