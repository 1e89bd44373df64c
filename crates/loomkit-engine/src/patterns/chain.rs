//! Chain stitch: one loop per segment, anchored at the segment start.

use loomkit_core::geometry::DEGENERATE_SEGMENT;
use loomkit_core::{Result, StitchJitter};

use super::draw;
use super::{PatternConfig, PatternRenderer, RenderOptions, RenderOutcome};
use crate::path::{StitchPath, StitchPoint};
use crate::surface::Surface;

#[derive(Debug, Clone, Copy, Default)]
pub struct ChainRenderer;

impl ChainRenderer {
    /// Loop radius for a segment of the given length.
    pub fn loop_radius(segment_length: f32, thickness: f32) -> f32 {
        (segment_length / 2.0).min(thickness * 2.0)
    }
}

impl PatternRenderer for ChainRenderer {
    fn id(&self) -> &'static str {
        "chain"
    }

    fn aliases(&self) -> &[&'static str] {
        &["chain-stitch"]
    }

    fn stitch_plan(
        &self,
        path: &StitchPath,
        _config: &PatternConfig,
        _options: &RenderOptions,
    ) -> Vec<StitchPoint> {
        let pts = path.cleaned();
        pts.windows(2)
            .filter(|w| w[0].distance_to(&w[1]) > DEGENERATE_SEGMENT)
            .map(|w| StitchPoint::new(w[0]))
            .collect()
    }

    fn render(
        &self,
        surface: &mut Surface,
        path: &StitchPath,
        config: &PatternConfig,
        options: &RenderOptions,
    ) -> Result<RenderOutcome> {
        let pts = path.cleaned();
        if pts.len() < 2 {
            return Ok(RenderOutcome::NOTHING);
        }
        let pixmap = surface.pixmap_mut()?;
        let jitter = StitchJitter::new(options.seed, options.thread_variation);
        let width = (config.thickness / 3.0).max(1.0);

        let mut units = 0;
        for w in pts.windows(2) {
            let len = w[0].distance_to(&w[1]);
            let radius = Self::loop_radius(len, config.thickness);
            if radius <= DEGENERATE_SEGMENT {
                continue;
            }
            let color = draw::stitch_color(config.color, &jitter, units);
            let paint = draw::paint(color, config.opacity);
            if draw::stroke_circle(pixmap, w[0], radius, width, &paint) {
                units += 1;
            }
        }
        Ok(RenderOutcome { units })
    }
}
