//! Compositor
//!
//! Produces the three derived outputs of a session from the layer store:
//!
//! - **composed**: every effectively visible layer drawn bottom to top with
//!   its opacity (times its group's) and blend mode
//! - **displacement**: single channel height, neutral at 128, raised or
//!   sunk by puff samples
//! - **normal**: per-pixel unit normal from the displacement gradient
//!
//! Every pass regenerates its output completely. Revisions recorded per
//! output let the session skip passes whose inputs did not change.

use std::sync::Arc;

use image::GrayImage;
use loomkit_core::{
    clamp_channel, CompositionEvent, DiagnosticEvent, EventBus, Result, SessionEvent,
};
use tiny_skia::{FillRule, FilterQuality, Mask, PathBuilder, PixmapPaint, Transform};

use crate::layer::{LayerStore, ToolPayload};
use crate::pool::{SurfaceKey, SurfacePool};
use crate::surface::{Surface, SurfaceFormat};

/// Displacement value representing zero height.
pub const NEUTRAL_HEIGHT: u8 = 128;

/// Result of one composition pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ComposeStats {
    pub drawn: usize,
    pub skipped: usize,
}

pub struct Compositor {
    bus: Arc<EventBus>,
    composed_revision: Option<u64>,
    displacement_revision: Option<u64>,
    normal_stale: bool,
}

impl Compositor {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self {
            bus,
            composed_revision: None,
            displacement_revision: None,
            normal_stale: true,
        }
    }

    /// Forget cached revisions so the next pass of each output runs.
    pub fn invalidate(&mut self) {
        self.composed_revision = None;
        self.displacement_revision = None;
        self.normal_stale = true;
    }

    pub fn is_composed_current(&self, store: &LayerStore) -> bool {
        self.composed_revision == Some(store.revision())
    }

    pub fn is_displacement_current(&self, store: &LayerStore) -> bool {
        self.displacement_revision == Some(store.displacement_revision())
    }

    /// Regenerate the composed surface from scratch.
    ///
    /// Layers whose surface is missing or unusable are skipped with a
    /// warning; the rest of the stack still composes.
    pub fn compose(&mut self, store: &LayerStore, pool: &mut SurfacePool) -> Result<ComposeStats> {
        let mut composed = pool.checkout(SurfaceKey::Composed)?;
        let result = self.draw_layers(store, pool, &mut composed);
        pool.checkin(SurfaceKey::Composed, composed);
        let stats = result?;

        self.composed_revision = Some(store.revision());
        tracing::trace!("Composed {} layers ({} skipped)", stats.drawn, stats.skipped);
        self.bus.emit(SessionEvent::Composition(CompositionEvent::Composed {
            drawn: stats.drawn,
            skipped: stats.skipped,
        }));
        Ok(stats)
    }

    /// Compose only when the store changed since the last pass.
    pub fn compose_if_dirty(
        &mut self,
        store: &LayerStore,
        pool: &mut SurfacePool,
    ) -> Result<Option<ComposeStats>> {
        if self.is_composed_current(store) && pool.contains(&SurfaceKey::Composed) {
            return Ok(None);
        }
        self.compose(store, pool).map(Some)
    }

    fn draw_layers(
        &self,
        store: &LayerStore,
        pool: &SurfacePool,
        composed: &mut Surface,
    ) -> Result<ComposeStats> {
        composed.clear();
        let dims = composed.dimensions();
        let target = composed.pixmap_mut()?;
        let mut stats = ComposeStats::default();

        for layer in store.layers() {
            if !store.is_effectively_visible(layer) {
                continue;
            }
            let opacity = store.effective_opacity(layer);
            if opacity <= 0.0 {
                continue;
            }

            let source = pool.get(&SurfaceKey::Layer(layer.id));
            let reason = match source {
                None => Some("no surface bound".to_string()),
                Some(s) if s.dimensions() != dims => Some(format!(
                    "surface is {}x{}, canvas is {}x{}",
                    s.width(),
                    s.height(),
                    dims.0,
                    dims.1
                )),
                Some(s) if s.format() != SurfaceFormat::Rgba8 => {
                    Some(format!("{} surface cannot be composited", s.format()))
                }
                Some(_) => None,
            };
            let pixmap = match (reason, source.and_then(Surface::pixmap)) {
                (None, Some(pixmap)) => pixmap,
                (reason, _) => {
                    let reason = reason.unwrap_or_else(|| "no pixels".to_string());
                    tracing::warn!("Skipping layer {} in composition: {}", layer.id, reason);
                    self.bus.emit(SessionEvent::Diagnostic(DiagnosticEvent::LayerSkipped {
                        id: layer.id,
                        reason,
                    }));
                    stats.skipped += 1;
                    continue;
                }
            };

            let paint = PixmapPaint {
                opacity,
                blend_mode: layer.blend_mode.to_skia(),
                quality: FilterQuality::Nearest,
            };
            target.draw_pixmap(0, 0, pixmap.as_ref(), &paint, Transform::identity(), None);
            stats.drawn += 1;
        }
        Ok(stats)
    }

    /// Regenerate the displacement surface from visible puff payloads.
    ///
    /// Returns the number of samples drawn.
    pub fn derive_displacement(&mut self, store: &LayerStore, pool: &mut SurfacePool) -> Result<usize> {
        let surface = pool.displacement()?;
        surface.fill_scalar(NEUTRAL_HEIGHT)?;
        let gray = surface.gray_mut()?;

        let mut samples = 0;
        for layer in store.layers() {
            if !store.is_effectively_visible(layer) {
                continue;
            }
            if let ToolPayload::Puff { samples: puff, .. } = &layer.payload {
                for sample in puff {
                    let value = clamp_channel(
                        f64::from(NEUTRAL_HEIGHT) + f64::from(sample.intensity) * 127.0,
                    )
                    .unwrap_or(NEUTRAL_HEIGHT);
                    if stamp_circle(gray, sample.position.x, sample.position.y, sample.radius, value) {
                        samples += 1;
                    }
                }
            }
        }

        self.displacement_revision = Some(store.displacement_revision());
        self.normal_stale = true;
        tracing::debug!("Displacement derived from {} samples", samples);
        self.bus.emit(SessionEvent::Composition(
            CompositionEvent::DisplacementUpdated { samples },
        ));
        Ok(samples)
    }

    /// Regenerate displacement and normal when puff content changed.
    pub fn derive_if_dirty(&mut self, store: &LayerStore, pool: &mut SurfacePool) -> Result<bool> {
        let mut changed = false;
        if !self.is_displacement_current(store) || !pool.contains(&SurfaceKey::Displacement) {
            self.derive_displacement(store, pool)?;
            changed = true;
        }
        if self.normal_stale || !pool.contains(&SurfaceKey::Normal) {
            self.derive_normal(pool)?;
            changed = true;
        }
        Ok(changed)
    }

    /// Regenerate the normal surface from the current displacement surface.
    pub fn derive_normal(&mut self, pool: &mut SurfacePool) -> Result<()> {
        if !pool.contains(&SurfaceKey::Displacement) {
            pool.displacement()?.fill_scalar(NEUTRAL_HEIGHT)?;
        }
        let mut normal = pool.checkout(SurfaceKey::Normal)?;
        let result = write_normals(pool, &mut normal);
        pool.checkin(SurfaceKey::Normal, normal);
        result?;

        self.normal_stale = false;
        self.bus
            .emit(SessionEvent::Composition(CompositionEvent::NormalUpdated));
        Ok(())
    }
}

fn write_normals(pool: &SurfacePool, normal: &mut Surface) -> Result<()> {
    let height_map = pool
        .get(&SurfaceKey::Displacement)
        .and_then(Surface::gray)
        .ok_or_else(|| loomkit_core::Error::other("displacement surface missing"))?;
    let (w, h) = height_map.dimensions();
    let pixmap = normal.pixmap_mut()?;
    if (pixmap.width(), pixmap.height()) != (w, h) {
        return Err(loomkit_core::EngineError::InvalidDimensions {
            width: pixmap.width(),
            height: pixmap.height(),
        }
        .into());
    }

    let data = pixmap.data_mut();
    for y in 0..h {
        for x in 0..w {
            let [r, g, b] = encode_normal(normal_at(height_map, x, y));
            let i = ((y * w + x) * 4) as usize;
            // opaque, so premultiplied equals straight
            data[i..i + 4].copy_from_slice(&[r, g, b, 255]);
        }
    }
    Ok(())
}

/// Blend a filled, anti-aliased circle of `value` into a height map.
fn stamp_circle(gray: &mut GrayImage, cx: f32, cy: f32, radius: f32, value: u8) -> bool {
    if !cx.is_finite() || !cy.is_finite() || radius.is_nan() || radius <= 0.0 {
        return false;
    }
    let (w, h) = gray.dimensions();
    let x0 = (cx - radius).floor().max(0.0) as u32;
    let y0 = (cy - radius).floor().max(0.0) as u32;
    let x1 = ((cx + radius).ceil().max(0.0) as u32).min(w);
    let y1 = ((cy + radius).ceil().max(0.0) as u32).min(h);
    if x0 >= x1 || y0 >= y1 {
        return false;
    }

    let Some(mut mask) = Mask::new(x1 - x0, y1 - y0) else {
        return false;
    };
    let Some(path) = PathBuilder::from_circle(cx - x0 as f32, cy - y0 as f32, radius) else {
        return false;
    };
    mask.fill_path(&path, FillRule::Winding, true, Transform::identity());

    let mw = x1 - x0;
    for (i, &coverage) in mask.data().iter().enumerate() {
        if coverage == 0 {
            continue;
        }
        let x = x0 + i as u32 % mw;
        let y = y0 + i as u32 / mw;
        let px = gray.get_pixel_mut(x, y);
        let current = f32::from(px.0[0]);
        let t = f32::from(coverage) / 255.0;
        px.0[0] = (current + (f32::from(value) - current) * t).round().clamp(0.0, 255.0) as u8;
    }
    true
}

/// Unit normal for the given 4-neighbourhood heights.
pub fn normal_from_heights(left: u8, right: u8, up: u8, down: u8) -> [f32; 3] {
    let gx = (f32::from(right) - f32::from(left)) / 255.0;
    let gy = (f32::from(down) - f32::from(up)) / 255.0;
    let len = (gx * gx + gy * gy + 1.0).sqrt();
    [-gx / len, -gy / len, 1.0 / len]
}

/// Normal at `(x, y)`, neighbours clamped at the borders.
pub fn normal_at(height_map: &GrayImage, x: u32, y: u32) -> [f32; 3] {
    let (w, h) = height_map.dimensions();
    let at = |x: u32, y: u32| height_map.get_pixel(x, y).0[0];
    let left = at(x.saturating_sub(1), y);
    let right = at((x + 1).min(w - 1), y);
    let up = at(x, y.saturating_sub(1));
    let down = at(x, (y + 1).min(h - 1));
    normal_from_heights(left, right, up, down)
}

/// `round((c + 1) * 127.5)` per component.
pub fn encode_normal(n: [f32; 3]) -> [u8; 3] {
    n.map(|c| ((c + 1.0) * 127.5).round().clamp(0.0, 255.0) as u8)
}

/// Inverse of [`encode_normal`], up to quantization.
pub fn decode_normal(rgb: [u8; 3]) -> [f32; 3] {
    rgb.map(|c| f32::from(c) / 127.5 - 1.0)
}
