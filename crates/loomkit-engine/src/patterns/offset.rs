//! Normal-offset stitch families.
//!
//! The path is resampled at the config's stitch spacing and every sample is
//! pushed along the left normal of the local tangent by an amount the
//! strategy decides. Offset points on the same rail are joined with a thin
//! stroke.

use loomkit_core::geometry::{normal_of, resample_polyline, tangent_at};
use loomkit_core::Result;

use super::draw;
use super::{PatternConfig, PatternRenderer, RenderOptions, RenderOutcome};
use crate::path::{StitchPath, StitchPoint};
use crate::surface::Surface;

/// How samples are displaced from the centerline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OffsetStrategy {
    /// Alternating +-thickness/2
    Zigzag,
    /// Two rails at +thickness/4 and -thickness/2
    DoubleSatin,
    /// Sinusoid, phase advancing with the stitch spacing
    Meander,
    /// Parallel rails across the thickness
    Contour,
    /// One-sided sinusoid with a fixed phase step
    Ripple,
}

impl OffsetStrategy {
    pub fn id(&self) -> &'static str {
        match self {
            OffsetStrategy::Zigzag => "zigzag",
            OffsetStrategy::DoubleSatin => "double-satin",
            OffsetStrategy::Meander => "meander",
            OffsetStrategy::Contour => "contour",
            OffsetStrategy::Ripple => "ripple",
        }
    }

    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            OffsetStrategy::Zigzag => &["zig-zag", "zig_zag"],
            OffsetStrategy::DoubleSatin => &["double_satin"],
            _ => &[],
        }
    }
}

/// Renderer for one [`OffsetStrategy`]
#[derive(Debug, Clone, Copy)]
pub struct OffsetRenderer {
    strategy: OffsetStrategy,
}

impl OffsetRenderer {
    pub fn new(strategy: OffsetStrategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> OffsetStrategy {
        self.strategy
    }

    fn plan(&self, path: &StitchPath, config: &PatternConfig) -> Vec<StitchPoint> {
        let pts = path.cleaned();
        if pts.len() < 2 {
            return Vec::new();
        }
        let spacing = config.stitch_spacing();
        let base = resample_polyline(&pts, spacing);
        let half = config.thickness * 0.5;

        let mut out = Vec::with_capacity(base.len() * 2);
        let mut phase = 0.0f32;
        let mut toggle = 1.0f32;
        for (i, b) in base.iter().enumerate() {
            let n = normal_of(tangent_at(&base, i));
            match self.strategy {
                OffsetStrategy::Zigzag => {
                    out.push(StitchPoint::new(b.offset(n, toggle * half)));
                    toggle = -toggle;
                }
                OffsetStrategy::DoubleSatin => {
                    out.push(StitchPoint::on_rail(b.offset(n, config.thickness * 0.25), 0));
                    out.push(StitchPoint::on_rail(b.offset(n, -half), 1));
                }
                OffsetStrategy::Meander => {
                    phase += (2.0 / spacing).max(0.2);
                    out.push(StitchPoint::new(b.offset(n, phase.sin() * half)));
                }
                OffsetStrategy::Contour => {
                    let bands = contour_bands(config.thickness, spacing);
                    for (rail, band) in (-bands..=bands).step_by(2).enumerate() {
                        let off = (band as f32 / bands as f32) * half;
                        out.push(StitchPoint::on_rail(b.offset(n, off), rail));
                    }
                }
                OffsetStrategy::Ripple => {
                    phase += 0.5;
                    let amp = (0.5 + 0.5 * phase.sin()) * half;
                    out.push(StitchPoint::new(b.offset(n, amp)));
                }
            }
        }
        out
    }
}

/// Number of contour bands on each side of the centerline.
fn contour_bands(thickness: f32, spacing: f32) -> i32 {
    ((thickness.max(2.0) / spacing.max(1.0)).floor() as i32).max(1)
}

impl PatternRenderer for OffsetRenderer {
    fn id(&self) -> &'static str {
        self.strategy.id()
    }

    fn aliases(&self) -> &[&'static str] {
        self.strategy.aliases()
    }

    fn stitch_plan(
        &self,
        path: &StitchPath,
        config: &PatternConfig,
        _options: &RenderOptions,
    ) -> Vec<StitchPoint> {
        self.plan(path, config)
    }

    fn render(
        &self,
        surface: &mut Surface,
        path: &StitchPath,
        config: &PatternConfig,
        _options: &RenderOptions,
    ) -> Result<RenderOutcome> {
        let plan = self.plan(path, config);
        if plan.is_empty() {
            return Ok(RenderOutcome::NOTHING);
        }
        let pixmap = surface.pixmap_mut()?;
        let paint = draw::paint(config.color, config.opacity);
        let width = (config.thickness / 6.0).max(1.0);

        let rails = plan.iter().map(|s| s.rail).max().unwrap_or(0) + 1;
        for rail in 0..rails {
            let line: Vec<_> = plan
                .iter()
                .filter(|s| s.rail == rail)
                .map(|s| s.position)
                .collect();
            draw::stroke_polyline(pixmap, &line, width, &paint, false);
        }

        Ok(RenderOutcome { units: plan.len() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::SurfaceFormat;
    use loomkit_core::Point;

    fn straight() -> StitchPath {
        StitchPath::new(vec![Point::new(0.0, 50.0), Point::new(60.0, 50.0)])
    }

    #[test]
    fn test_zigzag_alternates_sides() {
        let r = OffsetRenderer::new(OffsetStrategy::Zigzag);
        let config = PatternConfig::new("zigzag").with_thickness(4.0);
        let plan = r.stitch_plan(&straight(), &config, &RenderOptions::default());
        // spacing 6 over 60 px: 11 samples
        assert_eq!(plan.len(), 11);
        // left normal of +x is +y
        assert!((plan[0].position.y - 52.0).abs() < 1e-4);
        assert!((plan[1].position.y - 48.0).abs() < 1e-4);
    }

    #[test]
    fn test_double_satin_has_two_rails() {
        let r = OffsetRenderer::new(OffsetStrategy::DoubleSatin);
        let config = PatternConfig::new("double-satin").with_thickness(8.0);
        let plan = r.stitch_plan(&straight(), &config, &RenderOptions::default());
        assert!(plan.iter().any(|s| s.rail == 1));
        assert!(plan
            .iter()
            .filter(|s| s.rail == 0)
            .all(|s| (s.position.y - 52.0).abs() < 1e-4));
        assert!(plan
            .iter()
            .filter(|s| s.rail == 1)
            .all(|s| (s.position.y - 46.0).abs() < 1e-4));
    }

    #[test]
    fn test_contour_bands() {
        assert_eq!(contour_bands(3.0, 4.5), 1);
        assert_eq!(contour_bands(12.0, 3.0), 4);
        let r = OffsetRenderer::new(OffsetStrategy::Contour);
        let config = PatternConfig::new("contour").with_thickness(6.0).with_density(3.0);
        // spacing 3, bands 2: offsets -1, 0, 1 x half
        let plan = r.stitch_plan(&straight(), &config, &RenderOptions::default());
        assert_eq!(plan.iter().map(|s| s.rail).max(), Some(2));
    }

    #[test]
    fn test_ripple_stays_on_left() {
        let r = OffsetRenderer::new(OffsetStrategy::Ripple);
        let config = PatternConfig::new("ripple").with_thickness(6.0);
        let plan = r.stitch_plan(&straight(), &config, &RenderOptions::default());
        assert!(plan.iter().all(|s| s.position.y >= 50.0 - 1e-4));
    }

    #[test]
    fn test_render_counts_plan() {
        let r = OffsetRenderer::new(OffsetStrategy::Meander);
        let config = PatternConfig::new("meander").with_thickness(6.0);
        let mut s = Surface::new(64, 100, SurfaceFormat::Rgba8).unwrap();
        let outcome = r
            .render(&mut s, &straight(), &config, &RenderOptions::default())
            .unwrap();
        assert_eq!(
            outcome.units,
            r.stitch_plan(&straight(), &config, &RenderOptions::default())
                .len()
        );
        assert!(!s.is_clear());
    }
}
