//! Fill: solid polygon.

use loomkit_core::Result;

use super::draw;
use super::{PatternConfig, PatternRenderer, RenderOptions, RenderOutcome};
use crate::path::StitchPath;
use crate::surface::Surface;

#[derive(Debug, Clone, Copy, Default)]
pub struct FillRenderer;

impl PatternRenderer for FillRenderer {
    fn id(&self) -> &'static str {
        "fill"
    }

    fn aliases(&self) -> &[&'static str] {
        &["tatami", "fill-stitch"]
    }

    fn render(
        &self,
        surface: &mut Surface,
        path: &StitchPath,
        config: &PatternConfig,
        _options: &RenderOptions,
    ) -> Result<RenderOutcome> {
        let mut pts = path.cleaned();
        // a closed path repeats its first point
        if pts.len() > 3 && pts.first() == pts.last() {
            pts.pop();
        }
        if pts.len() < 3 {
            return Ok(RenderOutcome::NOTHING);
        }
        let paint = draw::paint(config.color, config.opacity);
        let drawn = draw::fill_polygon(surface.pixmap_mut()?, &pts, &paint);
        Ok(RenderOutcome {
            units: usize::from(drawn),
        })
    }
}
