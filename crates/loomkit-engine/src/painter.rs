//! Payload painter
//!
//! Draws stored tool payloads onto a layer's color surface. Used for new
//! strokes, for the live preview, and to replay layer content after a
//! resize or snapshot restore.

use loomkit_core::{Result, ThreadColor};

use crate::classify::{resolve_pattern, ToolClassifier};
use crate::layer::{BrushStroke, EmbroideryStroke, PuffSample, ToolPayload, VectorPath};
use crate::patterns::{draw, PatternConfig, PatternRegistry, RenderOptions, RenderOutcome};
use crate::surface::Surface;

/// Totals of one paint call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PaintReport {
    /// Stitch units, brush segments or puff samples drawn
    pub units: usize,
    /// Strokes skipped because their renderer rejected the config
    pub skipped: usize,
}

impl PaintReport {
    fn add(&mut self, other: PaintReport) {
        self.units += other.units;
        self.skipped += other.skipped;
    }
}

/// Minimum alpha of a puff sample on the color surface.
const MIN_PUFF_ALPHA: f32 = 0.1;

pub struct Painter<'a> {
    registry: &'a PatternRegistry,
    classifier: &'a ToolClassifier,
    default_pattern: &'a str,
    options: RenderOptions,
}

impl<'a> Painter<'a> {
    pub fn new(
        registry: &'a PatternRegistry,
        classifier: &'a ToolClassifier,
        default_pattern: &'a str,
        options: RenderOptions,
    ) -> Self {
        Self {
            registry,
            classifier,
            default_pattern,
            options,
        }
    }

    /// Draw every stroke of `payload`. Strokes whose renderer rejects the
    /// config are skipped and counted; other strokes still draw.
    pub fn paint(&self, payload: &ToolPayload, surface: &mut Surface) -> Result<PaintReport> {
        let mut report = PaintReport::default();
        match payload {
            ToolPayload::Empty => {}
            ToolPayload::BrushStrokes { strokes } => {
                for stroke in strokes {
                    report.units += paint_brush(stroke, surface)?;
                }
            }
            ToolPayload::Embroidery { stitches } => {
                for stitch in stitches {
                    report.add(self.paint_embroidery(stitch, surface)?);
                }
            }
            ToolPayload::Puff { color, samples } => {
                report.units += paint_puff(*color, samples, surface)?;
            }
            ToolPayload::Vector { paths } => {
                for path in paths {
                    report.add(self.paint_vector(path, surface)?);
                }
            }
        }
        Ok(report)
    }

    pub fn paint_embroidery(
        &self,
        stroke: &EmbroideryStroke,
        surface: &mut Surface,
    ) -> Result<PaintReport> {
        self.render_pattern(&stroke.pattern_type, &stroke.path, &stroke.config, &stroke.options, surface)
    }

    /// Pattern type a vector path renders with.
    pub fn pattern_for(&self, path: &VectorPath) -> String {
        let kind = self.classifier.classify(&path.tool);
        resolve_pattern(
            path.stitch_type_override.as_deref(),
            kind.pattern_type(),
            self.default_pattern,
        )
        .to_string()
    }

    pub fn paint_vector(&self, path: &VectorPath, surface: &mut Surface) -> Result<PaintReport> {
        let pattern_type = self.pattern_for(path);
        let mut config = path.style.clone();
        config.pattern_type = pattern_type.clone();
        self.render_pattern(&pattern_type, &path.stitch_path(), &config, &self.options, surface)
    }

    fn render_pattern(
        &self,
        pattern_type: &str,
        path: &crate::path::StitchPath,
        config: &PatternConfig,
        options: &RenderOptions,
        surface: &mut Surface,
    ) -> Result<PaintReport> {
        let resolved = self.registry.resolve(pattern_type, Some(config));
        if let Err(err) = resolved.renderer.validate_config(config) {
            tracing::warn!("Skipping {} stroke: {}", pattern_type, err);
            return Ok(PaintReport {
                units: 0,
                skipped: 1,
            });
        }
        let RenderOutcome { units } = resolved.renderer.render(surface, path, config, options)?;
        Ok(PaintReport { units, skipped: 0 })
    }
}

/// Round-capped segments between consecutive samples, each in the color and
/// width of its first sample.
pub fn paint_brush(stroke: &BrushStroke, surface: &mut Surface) -> Result<usize> {
    if stroke.samples.len() < 2 {
        return Ok(0);
    }
    let pixmap = surface.pixmap_mut()?;
    let mut drawn = 0;
    for pair in stroke.samples.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if !a.position.is_finite() || !b.position.is_finite() || a.width <= 0.0 {
            continue;
        }
        let paint = draw::paint(a.color, 1.0);
        draw::stroke_segment(pixmap, a.position, b.position, a.width, &paint);
        drawn += 1;
    }
    Ok(drawn)
}

/// Filled circles in the puff color, alpha following the intensity.
pub fn paint_puff(color: ThreadColor, samples: &[PuffSample], surface: &mut Surface) -> Result<usize> {
    if samples.is_empty() {
        return Ok(0);
    }
    let pixmap = surface.pixmap_mut()?;
    let mut drawn = 0;
    for sample in samples {
        if !sample.position.is_finite() || sample.radius.is_nan() || sample.radius <= 0.0 {
            continue;
        }
        let alpha = sample.intensity.abs().clamp(MIN_PUFF_ALPHA, 1.0);
        let paint = draw::paint(color, alpha);
        if draw::fill_circle(pixmap, sample.position, sample.radius, &paint) {
            drawn += 1;
        }
    }
    Ok(drawn)
}
