//! Pattern renderers
//!
//! Each stitch or print family implements [`PatternRenderer`]: it turns a
//! [`StitchPath`] plus a [`PatternConfig`] into geometry drawn onto a
//! color surface. Renderers are looked up through the
//! [`PatternRegistry`](registry::PatternRegistry) by pattern type.
//!
//! Adding a family from outside the crate:
//!
//! ```
//! use loomkit_engine::patterns::{PatternConfig, PatternRenderer, RenderOptions, RenderOutcome};
//! use loomkit_engine::{StitchPath, Surface};
//!
//! struct Dots;
//!
//! impl PatternRenderer for Dots {
//!     fn id(&self) -> &'static str {
//!         "dots"
//!     }
//!
//!     fn render(
//!         &self,
//!         _surface: &mut Surface,
//!         path: &StitchPath,
//!         _config: &PatternConfig,
//!         _options: &RenderOptions,
//!     ) -> loomkit_core::Result<RenderOutcome> {
//!         Ok(RenderOutcome { units: path.len() })
//!     }
//! }
//! ```

pub mod chain;
pub mod cross_stitch;
pub(crate) mod draw;
pub mod fill;
pub mod offset;
pub mod outline;
pub mod registry;
pub mod satin;

use loomkit_core::geometry::resample_polyline;
use loomkit_core::{EngineError, Result, ThreadColor};
use serde::{Deserialize, Serialize};

use crate::path::{StitchPath, StitchPoint};
use crate::surface::Surface;

pub use chain::ChainRenderer;
pub use cross_stitch::CrossStitchRenderer;
pub use fill::FillRenderer;
pub use offset::{OffsetRenderer, OffsetStrategy};
pub use outline::OutlineRenderer;
pub use registry::PatternRegistry;
pub use satin::SatinRenderer;

/// Style of one render call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternConfig {
    pub pattern_type: String,
    pub color: ThreadColor,
    /// Stitch thickness in pixels, > 0
    pub thickness: f32,
    /// In [0, 1]
    pub opacity: f32,
    /// Stitch density multiplier, > 0
    pub density: f32,
}

impl PatternConfig {
    pub fn new(pattern_type: impl Into<String>) -> Self {
        Self {
            pattern_type: pattern_type.into(),
            color: ThreadColor::BLACK,
            thickness: 3.0,
            opacity: 1.0,
            density: 1.0,
        }
    }

    pub fn with_color(mut self, color: ThreadColor) -> Self {
        self.color = color;
        self
    }

    pub fn with_thickness(mut self, thickness: f32) -> Self {
        self.thickness = thickness;
        self
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity;
        self
    }

    pub fn with_density(mut self, density: f32) -> Self {
        self.density = density;
        self
    }

    /// Checks shared by every renderer.
    pub fn validate(&self) -> std::result::Result<(), EngineError> {
        let fail = |reason: &str| EngineError::RendererValidationFailed {
            pattern_type: self.pattern_type.clone(),
            reason: reason.to_string(),
        };
        if self.pattern_type.trim().is_empty() {
            return Err(fail("pattern type is empty"));
        }
        if !self.thickness.is_finite() || self.thickness <= 0.0 {
            return Err(fail("thickness must be > 0"));
        }
        if !(0.0..=1.0).contains(&self.opacity) {
            return Err(fail("opacity must be within [0, 1]"));
        }
        if !self.density.is_finite() || self.density <= 0.0 {
            return Err(fail("density must be > 0"));
        }
        Ok(())
    }

    /// Stitch length used by resampling renderers.
    pub fn stitch_spacing(&self) -> f32 {
        (self.thickness * 1.5 / self.density.max(0.25)).max(1.0)
    }
}

/// Per-call options that are not part of the style
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RenderOptions {
    /// Restart stepping on every segment (cross-stitch)
    #[serde(default)]
    pub connect_all_points: bool,
    /// Per-stitch brightness jitter amplitude, 0 disables
    #[serde(default)]
    pub thread_variation: f64,
    /// Seed of the jitter streams
    #[serde(default)]
    pub seed: u64,
    /// Live preview pass
    #[serde(skip)]
    pub preview: bool,
}

/// What a render call produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderOutcome {
    /// Number of stitch units (X marks, loops, needle points) drawn
    pub units: usize,
}

impl RenderOutcome {
    pub const NOTHING: RenderOutcome = RenderOutcome { units: 0 };
}

/// A stitch or print family
pub trait PatternRenderer: Send + Sync {
    /// Canonical pattern type identifier
    fn id(&self) -> &'static str;

    /// Alternate spellings resolving to this renderer
    fn aliases(&self) -> &[&'static str] {
        &[]
    }

    /// All identifiers this renderer declares
    fn pattern_types(&self) -> Vec<&'static str> {
        let mut types = vec![self.id()];
        types.extend_from_slice(self.aliases());
        types
    }

    /// Whether this renderer draws `name`. Matching is separator and case
    /// insensitive.
    fn can_handle(&self, name: &str, _config: Option<&PatternConfig>) -> bool {
        let wanted = normalize_pattern_name(name);
        self.pattern_types()
            .iter()
            .any(|t| normalize_pattern_name(t) == wanted)
    }

    fn default_config(&self) -> PatternConfig {
        PatternConfig::new(self.id())
    }

    fn validate_config(&self, config: &PatternConfig) -> std::result::Result<(), EngineError> {
        config.validate()
    }

    /// Needle positions the renderer would sew.
    fn stitch_plan(
        &self,
        path: &StitchPath,
        config: &PatternConfig,
        _options: &RenderOptions,
    ) -> Vec<StitchPoint> {
        let pts = path.cleaned();
        if pts.len() < 2 {
            return Vec::new();
        }
        resample_polyline(&pts, config.stitch_spacing())
            .into_iter()
            .map(StitchPoint::new)
            .collect()
    }

    /// Draw onto a color surface. Paths with fewer than two points draw
    /// nothing and succeed.
    fn render(
        &self,
        surface: &mut Surface,
        path: &StitchPath,
        config: &PatternConfig,
        options: &RenderOptions,
    ) -> Result<RenderOutcome>;
}

/// Lowercase and drop `-`, `_` and whitespace, so `Zig-Zag`, `zig_zag`
/// and `zigzag` compare equal.
pub fn normalize_pattern_name(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '-' | '_') && !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Every built-in renderer, in resolution order.
pub fn builtin_renderers() -> Vec<std::sync::Arc<dyn PatternRenderer>> {
    use std::sync::Arc;
    vec![
        Arc::new(CrossStitchRenderer),
        Arc::new(SatinRenderer),
        Arc::new(ChainRenderer),
        Arc::new(FillRenderer),
        Arc::new(OutlineRenderer),
        Arc::new(OffsetRenderer::new(OffsetStrategy::Zigzag)),
        Arc::new(OffsetRenderer::new(OffsetStrategy::DoubleSatin)),
        Arc::new(OffsetRenderer::new(OffsetStrategy::Meander)),
        Arc::new(OffsetRenderer::new(OffsetStrategy::Contour)),
        Arc::new(OffsetRenderer::new(OffsetStrategy::Ripple)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_pattern_name() {
        assert_eq!(normalize_pattern_name("Zig-Zag"), "zigzag");
        assert_eq!(normalize_pattern_name("zig_zag"), "zigzag");
        assert_eq!(normalize_pattern_name(" cross stitch "), "crossstitch");
    }

    #[test]
    fn test_config_validation() {
        assert!(PatternConfig::new("satin").validate().is_ok());
        assert!(PatternConfig::new("").validate().is_err());
        assert!(PatternConfig::new("satin").with_thickness(0.0).validate().is_err());
        assert!(PatternConfig::new("satin")
            .with_thickness(f32::NAN)
            .validate()
            .is_err());
        assert!(PatternConfig::new("satin").with_opacity(1.2).validate().is_err());
        assert!(PatternConfig::new("satin").with_density(0.0).validate().is_err());
    }

    #[test]
    fn test_stitch_spacing() {
        let c = PatternConfig::new("zigzag").with_thickness(4.0);
        assert!((c.stitch_spacing() - 6.0).abs() < 1e-6);
        let c = c.with_density(0.1);
        // density is floored at 0.25
        assert!((c.stitch_spacing() - 24.0).abs() < 1e-6);
        let c = PatternConfig::new("zigzag").with_thickness(0.2);
        assert_eq!(c.stitch_spacing(), 1.0);
    }
}
