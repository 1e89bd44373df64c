//! Cross-stitch: a fixed-size X at regular arc-length steps.

use std::f32::consts::FRAC_1_SQRT_2;

use loomkit_core::geometry::{walk_arc_length, walk_segments};
use loomkit_core::{Point, Result, StitchJitter};

use super::draw;
use super::{PatternConfig, PatternRenderer, RenderOptions, RenderOutcome};
use crate::path::{StitchPath, StitchPoint};
use crate::surface::Surface;

/// Smallest distance between two X centers.
pub const MIN_STEP: f32 = 4.0;

#[derive(Debug, Clone, Copy, Default)]
pub struct CrossStitchRenderer;

impl CrossStitchRenderer {
    /// Distance between X centers for a given thickness.
    pub fn step(thickness: f32) -> f32 {
        (thickness * 1.2).max(MIN_STEP)
    }

    fn centers(path: &StitchPath, config: &PatternConfig, options: &RenderOptions) -> Vec<Point> {
        let pts = path.cleaned();
        let step = Self::step(config.thickness);
        if options.connect_all_points {
            walk_segments(&pts, step)
        } else {
            walk_arc_length(&pts, step)
        }
    }
}

impl PatternRenderer for CrossStitchRenderer {
    fn id(&self) -> &'static str {
        "cross-stitch"
    }

    fn aliases(&self) -> &[&'static str] {
        &["cross"]
    }

    fn stitch_plan(
        &self,
        path: &StitchPath,
        config: &PatternConfig,
        options: &RenderOptions,
    ) -> Vec<StitchPoint> {
        if !path.is_drawable() {
            return Vec::new();
        }
        Self::centers(path, config, options)
            .into_iter()
            .map(StitchPoint::new)
            .collect()
    }

    fn render(
        &self,
        surface: &mut Surface,
        path: &StitchPath,
        config: &PatternConfig,
        options: &RenderOptions,
    ) -> Result<RenderOutcome> {
        if !path.is_drawable() {
            return Ok(RenderOutcome::NOTHING);
        }
        let pixmap = surface.pixmap_mut()?;
        let centers = Self::centers(path, config, options);
        let jitter = StitchJitter::new(options.seed, options.thread_variation);

        // each diagonal has half-length thickness / 2
        let d = config.thickness / 2.0 * FRAC_1_SQRT_2;
        let width = (config.thickness / 4.0).max(1.0);
        for (i, c) in centers.iter().enumerate() {
            let color = draw::stitch_color(config.color, &jitter, i);
            let paint = draw::paint(color, config.opacity);
            draw::stroke_segment(
                pixmap,
                Point::new(c.x - d, c.y - d),
                Point::new(c.x + d, c.y + d),
                width,
                &paint,
            );
            draw::stroke_segment(
                pixmap,
                Point::new(c.x - d, c.y + d),
                Point::new(c.x + d, c.y - d),
                width,
                &paint,
            );
        }

        Ok(RenderOutcome {
            units: centers.len(),
        })
    }
}
