//! Satin: one continuous stroke through every point.

use loomkit_core::Result;

use super::draw;
use super::{PatternConfig, PatternRenderer, RenderOptions, RenderOutcome};
use crate::path::StitchPath;
use crate::surface::Surface;

#[derive(Debug, Clone, Copy, Default)]
pub struct SatinRenderer;

impl PatternRenderer for SatinRenderer {
    fn id(&self) -> &'static str {
        "satin"
    }

    fn aliases(&self) -> &[&'static str] {
        &["satin-stitch"]
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
        draw::stroke_polyline(surface.pixmap_mut()?, &pts, config.thickness, &paint, false);
        Ok(RenderOutcome { units: pts.len() })
    }
}
