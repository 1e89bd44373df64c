//! Outline: the raw path as a plain stroke. Also the registry fallback.

use loomkit_core::Result;

use super::draw;
use super::{PatternConfig, PatternRenderer, RenderOptions, RenderOutcome};
use crate::path::StitchPath;
use crate::surface::Surface;

/// Stroke width never drops below this.
const MIN_WIDTH: f32 = 1.0;

#[derive(Debug, Clone, Copy, Default)]
pub struct OutlineRenderer;

impl OutlineRenderer {
    fn width(config: &PatternConfig) -> f32 {
        let half = config.thickness / 2.0;
        if half.is_finite() {
            half.max(MIN_WIDTH)
        } else {
            MIN_WIDTH
        }
    }
}

impl PatternRenderer for OutlineRenderer {
    fn id(&self) -> &'static str {
        "outline"
    }

    fn aliases(&self) -> &[&'static str] {
        &["running", "running-stitch"]
    }

    fn render(
        &self,
        surface: &mut Surface,
        path: &StitchPath,
        config: &PatternConfig,
        _options: &RenderOptions,
    ) -> Result<RenderOutcome> {
        let pts = path.cleaned();
        if pts.len() < 2 {
            return Ok(RenderOutcome::NOTHING);
        }
        let paint = draw::paint(config.color, config.opacity);
        draw::stroke_polyline(
            surface.pixmap_mut()?,
            &pts,
            Self::width(config),
            &paint,
            false,
        );
        Ok(RenderOutcome { units: pts.len() })
    }
}
