//! Compositing session
//!
//! Owns one of everything: surface pool, layer store, renderer registry,
//! compositor and the session event bus. The input side drives it through
//! the `on_*` callbacks; the scene side reads the derived surfaces after a
//! [`frame`](CompositingSession::frame).
//!
//! Points accumulate into an in-progress path with a throttled, subsampled
//! live preview drawn into the overlay surface. Completing the path renders
//! the full point sequence into the tool's layer. The overlay never reaches
//! the composed surface.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use loomkit_core::{
    DiagnosticEvent, EngineError, Error, EventBus, LayerId, Point, Result, SessionEvent,
    ThreadColor, ToolEvent,
};
use loomkit_settings::EngineConfig;

use crate::classify::{resolve_pattern, ToolClassifier, ToolKind};
use crate::compositor::{ComposeStats, Compositor};
use crate::layer::{
    BrushSample, BrushStroke, EmbroideryStroke, LayerKind, LayerStore, PuffSample, ToolPayload,
    VectorPath,
};
use crate::painter::{PaintReport, Painter};
use crate::path::StitchPath;
use crate::patterns::{draw, PatternConfig, PatternRegistry, PatternRenderer, RenderOptions};
use crate::pool::{PoolStats, SurfaceKey, SurfacePool};
use crate::snapshot::{LayerSnapshot, SnapshotMetadata};
use crate::surface::Surface;
use crate::throttle::{RenderThrottle, ThrottleDecision};

const GENERIC_TOOL: &str = "embroidery";
const ANCHOR_RADIUS: f32 = 3.0;
const ANCHOR_COLOR: ThreadColor = ThreadColor::new(0x33, 0x99, 0xff);

/// Result of committing a path to a layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathCommit {
    pub layer: LayerId,
    /// Pattern type for stitched strokes, tool family otherwise
    pub pattern_type: String,
    /// Points handed to the renderer
    pub points: usize,
    /// Units drawn
    pub units: usize,
}

#[derive(Debug, Clone)]
struct ActiveTool {
    name: String,
    kind: ToolKind,
    pattern_override: Option<String>,
}

impl ActiveTool {
    fn generic() -> Self {
        Self {
            name: GENERIC_TOOL.to_string(),
            kind: ToolKind::Embroidery { pattern_type: None },
            pattern_override: None,
        }
    }

    fn layer_kind(&self) -> LayerKind {
        match self.kind {
            ToolKind::Vector => LayerKind::Vector,
            _ => LayerKind::Raster,
        }
    }
}

pub struct CompositingSession {
    config: EngineConfig,
    bus: Arc<EventBus>,
    pool: SurfacePool,
    store: LayerStore,
    registry: PatternRegistry,
    classifier: ToolClassifier,
    compositor: Compositor,
    throttle: RenderThrottle,
    tool: Option<ActiveTool>,
    style: PatternConfig,
    in_progress: Vec<Point>,
    overlay_stale: bool,
    preview_renders: u64,
    frame: u64,
    metadata: SnapshotMetadata,
}

impl CompositingSession {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| Error::other(format!("Invalid engine config: {}", e)))?;

        let bus = Arc::new(EventBus::with_config(config.event_bus_config()));
        let (width, height) = (config.canvas.width, config.canvas.height);
        let pool = SurfacePool::new(width, height, config.pool.memory_ceiling_bytes)?;
        let registry = PatternRegistry::with_builtins();
        let classifier = ToolClassifier::from_registry(&registry);
        let p = &config.patterns;
        let style = PatternConfig::new(p.default_pattern.clone())
            .with_color(p.default_color)
            .with_thickness(p.default_thickness)
            .with_opacity(p.default_opacity)
            .with_density(p.default_density);

        tracing::info!("Compositing session created ({}x{})", width, height);
        Ok(Self {
            store: LayerStore::with_bus(width, height, bus.clone()),
            compositor: Compositor::new(bus.clone()),
            throttle: RenderThrottle::new(config.throttle_window()),
            config,
            bus,
            pool,
            registry,
            classifier,
            tool: None,
            style,
            in_progress: Vec::new(),
            overlay_stale: false,
            preview_renders: 0,
            frame: 0,
            metadata: SnapshotMetadata::new("Untitled"),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn store(&self) -> &LayerStore {
        &self.store
    }

    /// Direct access to the store and the pool it binds surfaces from.
    pub fn layers_mut(&mut self) -> (&mut LayerStore, &mut SurfacePool) {
        (&mut self.store, &mut self.pool)
    }

    pub fn registry(&self) -> &PatternRegistry {
        &self.registry
    }

    pub fn classifier(&self) -> &ToolClassifier {
        &self.classifier
    }

    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.store.dimensions()
    }

    /// Style applied to new strokes.
    pub fn style(&self) -> &PatternConfig {
        &self.style
    }

    pub fn set_style(&mut self, style: PatternConfig) {
        self.style = style;
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.metadata.name = name.into();
    }

    pub fn active_tool(&self) -> Option<&str> {
        self.tool.as_ref().map(|t| t.name.as_str())
    }

    /// Points of the path being drawn.
    pub fn in_progress(&self) -> &[Point] {
        &self.in_progress
    }

    /// Number of live previews rendered so far.
    pub fn preview_renders(&self) -> u64 {
        self.preview_renders
    }

    /// Previews dropped because a newer one replaced them.
    pub fn dropped_previews(&self) -> u64 {
        self.throttle.dropped()
    }

    /// Renderer options for new strokes.
    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            connect_all_points: self.config.render.connect_all_points,
            thread_variation: self.config.render.thread_variation,
            seed: self.config.render.jitter_seed,
            preview: false,
        }
    }

    pub fn create_layer(&mut self, kind: LayerKind, name: Option<&str>) -> Result<LayerId> {
        Ok(self.store.create(kind, name, &mut self.pool)?.id)
    }

    pub fn delete_layer(&mut self, id: LayerId) -> Result<()> {
        self.store.delete(id, &mut self.pool)
    }

    /// Register a renderer and make its identifiers known to tool
    /// classification.
    pub fn register_renderer(&mut self, renderer: Arc<dyn PatternRenderer>) -> bool {
        for name in renderer.pattern_types() {
            self.classifier.register_pattern_type(name);
        }
        let replaced = self.registry.register(renderer);
        // replay uses the registry, so cached outputs may be stale
        self.compositor.invalidate();
        replaced
    }

    /// Switch tools. An unfinished path of the previous tool is committed
    /// first.
    pub fn on_tool_activated(
        &mut self,
        tool: &str,
        pattern_override: Option<&str>,
    ) -> Result<Option<PathCommit>> {
        let flushed = self.finish_in_progress()?;
        let kind = self.classifier.classify(tool);
        let pattern_type = pattern_override
            .or(kind.pattern_type())
            .map(str::to_string);
        self.tool = Some(ActiveTool {
            name: tool.to_string(),
            kind,
            pattern_override: pattern_override.map(str::to_string),
        });

        tracing::info!("Tool activated: {}", tool);
        self.bus.emit(SessionEvent::Tool(ToolEvent::Activated {
            tool: tool.to_string(),
            pattern_type,
        }));
        Ok(flushed)
    }

    /// Leave drawing mode: commit the unfinished path and clear the overlay.
    pub fn on_mode_exited(&mut self) -> Result<Option<PathCommit>> {
        let flushed = self.finish_in_progress()?;
        self.tool = None;
        self.clear_overlay();
        self.bus.emit(SessionEvent::Tool(ToolEvent::ModeExited));
        Ok(flushed)
    }

    /// Append a point to the in-progress path and request a preview.
    pub fn on_point_added(&mut self, point: Point, now: Instant) -> Result<()> {
        if !point.is_finite() {
            tracing::warn!("Ignoring non-finite point ({}, {})", point.x, point.y);
            return Ok(());
        }
        self.in_progress.push(point);
        self.overlay_stale = true;

        match self.throttle.request(now) {
            ThrottleDecision::RunNow => self.render_preview(),
            ThrottleDecision::Deferred { superseded: true } => {
                tracing::debug!("Superseded preview render dropped");
                self.bus.emit(SessionEvent::Tool(ToolEvent::PreviewDropped));
                Ok(())
            }
            ThrottleDecision::Deferred { superseded: false } => Ok(()),
        }
    }

    /// Run a deferred preview whose window has elapsed.
    pub fn tick(&mut self, now: Instant) -> Result<bool> {
        if self.throttle.tick(now) {
            self.render_preview()?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Run the pending preview immediately.
    pub fn flush_preview(&mut self) -> Result<bool> {
        let pending = self.throttle.flush();
        if pending || self.overlay_stale {
            self.render_preview()?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Path the live preview renders: the in-progress points, subsampled.
    pub fn preview_path(&self) -> StitchPath {
        StitchPath::new(self.in_progress.clone()).subsampled(self.config.render.preview_max_points)
    }

    /// Commit a completed path with every one of its points.
    ///
    /// The in-progress path is discarded; paths with fewer than two points
    /// commit nothing.
    pub fn on_path_completed(&mut self, path: StitchPath) -> Result<Option<PathCommit>> {
        self.throttle.cancel();
        self.in_progress.clear();
        self.clear_overlay();
        if !path.is_drawable() {
            tracing::debug!("Completed path has {} points, nothing to draw", path.len());
            return Ok(None);
        }
        let tool = self.tool.clone().unwrap_or_else(ActiveTool::generic);
        self.commit(&tool, path).map(Some)
    }

    fn finish_in_progress(&mut self) -> Result<Option<PathCommit>> {
        let points = std::mem::take(&mut self.in_progress);
        if points.is_empty() {
            return Ok(None);
        }
        self.on_path_completed(StitchPath::new(points))
    }

    fn commit(&mut self, tool: &ActiveTool, path: StitchPath) -> Result<PathCommit> {
        let points = path.len();
        let (payload, pattern_type) = self.build_payload(tool, path, false);

        if let Some(config) = stitch_config(&payload) {
            let resolved = self.registry.resolve(&pattern_type, Some(config));
            if resolved.fallback {
                self.bus
                    .emit(SessionEvent::Diagnostic(DiagnosticEvent::PatternFallback {
                        pattern_type: pattern_type.clone(),
                    }));
            }
            if let Err(err) = resolved.renderer.validate_config(config) {
                tracing::warn!("Path not committed: {}", err);
                return Err(err.into());
            }
        }

        let layer = self
            .store
            .get_or_create_tool_layer(&tool.name, tool.layer_kind(), &mut self.pool)?;
        let report = self.paint_into(layer, payload)?;

        tracing::info!(
            "Committed {} points as {} to layer {} ({} units)",
            points,
            pattern_type,
            layer,
            report.units
        );
        self.bus.emit(SessionEvent::Tool(ToolEvent::PathCompleted {
            layer,
            pattern_type: pattern_type.clone(),
            points,
            stitches: report.units,
        }));
        Ok(PathCommit {
            layer,
            pattern_type,
            points,
            units: report.units,
        })
    }

    /// Add a vector path to `layer`, or to the shared vector layer.
    pub fn add_vector_path(&mut self, layer: Option<LayerId>, path: VectorPath) -> Result<PathCommit> {
        let layer = match layer {
            Some(id) => id,
            None => self
                .store
                .get_or_create_tool_layer("vector", LayerKind::Vector, &mut self.pool)?,
        };
        let points = path.points.len();
        let pattern_type = self.painter(false).pattern_for(&path);
        let report = self.paint_into(layer, ToolPayload::Vector { paths: vec![path] })?;
        Ok(PathCommit {
            layer,
            pattern_type,
            points,
            units: report.units,
        })
    }

    /// Draw `payload` onto a layer and append it to the layer's payload.
    fn paint_into(&mut self, layer: LayerId, payload: ToolPayload) -> Result<PaintReport> {
        let painter = Painter::new(
            &self.registry,
            &self.classifier,
            &self.config.patterns.default_pattern,
            self.render_options(),
        );
        self.store.paint(layer, &mut self.pool, |stored, surface| {
            if !stored.accepts(&payload) {
                return Err(EngineError::PayloadMismatch {
                    id: layer.to_string(),
                    expected: payload.family().to_string(),
                    found: stored.family().to_string(),
                }
                .into());
            }
            let report = painter.paint(&payload, surface)?;
            stored.append(payload, layer)?;
            Ok(report)
        })
    }

    fn painter(&self, preview: bool) -> Painter<'_> {
        let mut options = self.render_options();
        options.preview = preview;
        Painter::new(
            &self.registry,
            &self.classifier,
            &self.config.patterns.default_pattern,
            options,
        )
    }

    /// Payload a tool produces for `path`, with the pattern type (or tool
    /// family) it renders as.
    fn build_payload(&self, tool: &ActiveTool, path: StitchPath, preview: bool) -> (ToolPayload, String) {
        let style = &self.style;
        match &tool.kind {
            ToolKind::Brush => {
                let samples = path
                    .points
                    .iter()
                    .map(|&position| BrushSample {
                        position,
                        color: style.color,
                        width: style.thickness,
                    })
                    .collect();
                let payload = ToolPayload::BrushStrokes {
                    strokes: vec![BrushStroke { samples }],
                };
                (payload, "brush".to_string())
            }
            ToolKind::Puff => {
                let samples = path
                    .points
                    .iter()
                    .map(|&position| PuffSample {
                        position,
                        radius: style.thickness,
                        intensity: self.config.patterns.puff_intensity,
                    })
                    .collect();
                let payload = ToolPayload::Puff {
                    color: style.color,
                    samples,
                };
                (payload, "puff".to_string())
            }
            ToolKind::Vector => {
                let mut vector = VectorPath::new(path.points, tool.name.clone(), style.clone());
                vector.closed = path.closed;
                vector.stitch_type_override = tool.pattern_override.clone();
                let pattern_type = self.painter(preview).pattern_for(&vector);
                (ToolPayload::Vector { paths: vec![vector] }, pattern_type)
            }
            ToolKind::Embroidery { pattern_type } => {
                let pattern_type = resolve_pattern(
                    tool.pattern_override.as_deref(),
                    pattern_type.as_deref(),
                    &self.config.patterns.default_pattern,
                )
                .to_string();
                let mut config = style.clone();
                config.pattern_type = pattern_type.clone();
                let mut options = self.render_options();
                options.preview = preview;
                let stroke = EmbroideryStroke {
                    pattern_type: pattern_type.clone(),
                    path,
                    config,
                    options,
                };
                (ToolPayload::Embroidery { stitches: vec![stroke] }, pattern_type)
            }
        }
    }

    fn render_preview(&mut self) -> Result<()> {
        let tool = self.tool.clone().unwrap_or_else(ActiveTool::generic);
        let path = self.preview_path();
        let anchors = [path.points.first().copied(), path.points.last().copied()];
        let (payload, _) = self.build_payload(&tool, path, true);

        let painter = Painter::new(
            &self.registry,
            &self.classifier,
            &self.config.patterns.default_pattern,
            RenderOptions {
                preview: true,
                ..self.render_options()
            },
        );
        let overlay = self.pool.overlay()?;
        overlay.clear();
        painter.paint(&payload, overlay)?;

        let pixmap = overlay.pixmap_mut()?;
        let paint = draw::paint(ANCHOR_COLOR, 1.0);
        for anchor in anchors.into_iter().flatten() {
            draw::stroke_circle(pixmap, anchor, ANCHOR_RADIUS, 1.0, &paint);
        }

        self.preview_renders += 1;
        self.overlay_stale = false;
        Ok(())
    }

    fn clear_overlay(&mut self) {
        if let Some(overlay) = self.pool.get_mut(&SurfaceKey::Overlay) {
            overlay.clear();
        }
        self.overlay_stale = false;
    }

    /// Two-phase frame: persistent outputs first, then the transient
    /// overlay, then `FrameReady`. Returns the frame number.
    pub fn frame(&mut self) -> Result<u64> {
        self.compositor.compose_if_dirty(&self.store, &mut self.pool)?;
        self.compositor.derive_if_dirty(&self.store, &mut self.pool)?;

        if self.overlay_stale && !self.throttle.is_pending() {
            self.render_preview()?;
        }
        self.pool.overlay()?;

        self.frame += 1;
        self.bus.emit(SessionEvent::Composition(
            loomkit_core::CompositionEvent::FrameReady { frame: self.frame },
        ));
        Ok(self.frame)
    }

    /// Full recomposition regardless of cached revisions.
    pub fn recompose(&mut self) -> Result<ComposeStats> {
        self.compositor.compose(&self.store, &mut self.pool)
    }

    pub fn composed_surface(&self) -> Option<&Surface> {
        self.pool.get(&SurfaceKey::Composed)
    }

    pub fn displacement_surface(&self) -> Option<&Surface> {
        self.pool.get(&SurfaceKey::Displacement)
    }

    pub fn normal_surface(&self) -> Option<&Surface> {
        self.pool.get(&SurfaceKey::Normal)
    }

    pub fn overlay_surface(&self) -> Option<&Surface> {
        self.pool.get(&SurfaceKey::Overlay)
    }

    /// Redraw every layer from its payload.
    ///
    /// A layer that fails to replay is left cleared and reported; only
    /// resource exhaustion aborts the replay.
    pub fn replay(&mut self) -> Result<()> {
        let painter = Painter::new(
            &self.registry,
            &self.classifier,
            &self.config.patterns.default_pattern,
            self.render_options(),
        );
        for id in self.store.ids() {
            let result = self.store.repaint(id, &mut self.pool, |payload, surface| {
                surface.clear();
                painter.paint(payload, surface)
            });
            match result {
                Ok(report) if report.skipped > 0 => {
                    self.bus
                        .emit(SessionEvent::Diagnostic(DiagnosticEvent::LayerSkipped {
                            id,
                            reason: format!("{} strokes rejected by their renderer", report.skipped),
                        }));
                }
                Ok(_) => {}
                Err(err) if err.is_resource_exhaustion() => return Err(err),
                Err(err) => {
                    tracing::warn!("Layer {} failed to replay: {}", id, err);
                    self.bus
                        .emit(SessionEvent::Diagnostic(DiagnosticEvent::LayerSkipped {
                            id,
                            reason: err.to_string(),
                        }));
                }
            }
        }
        self.compositor.invalidate();
        Ok(())
    }

    /// Resize the canvas and replay all layer content at the new size.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        self.pool.resize(width, height)?;
        self.store.set_dimensions(width, height);
        self.replay()?;
        self.overlay_stale = !self.in_progress.is_empty();
        self.bus.emit(SessionEvent::Composition(
            loomkit_core::CompositionEvent::Resized { width, height },
        ));
        Ok(())
    }

    pub fn snapshot(&self) -> LayerSnapshot {
        let mut metadata = self.metadata.clone();
        metadata.modified = Utc::now();
        LayerSnapshot::capture(&self.store, metadata)
    }

    /// Replace the session content with `snapshot` and replay it.
    pub fn restore(&mut self, snapshot: LayerSnapshot) -> Result<()> {
        LayerStore::validate_content(&snapshot.layers, &snapshot.groups, snapshot.active)?;
        self.pool.check_rebind(
            self.store.len(),
            snapshot.layers.len(),
            snapshot.width,
            snapshot.height,
        )?;
        self.throttle.cancel();
        self.in_progress.clear();
        self.clear_overlay();

        if (snapshot.width, snapshot.height) != self.store.dimensions() {
            self.pool.resize(snapshot.width, snapshot.height)?;
            self.store.set_dimensions(snapshot.width, snapshot.height);
            self.bus.emit(SessionEvent::Composition(
                loomkit_core::CompositionEvent::Resized {
                    width: snapshot.width,
                    height: snapshot.height,
                },
            ));
        }
        self.store
            .replace_all(snapshot.layers, snapshot.groups, snapshot.active, &mut self.pool)?;
        self.metadata = snapshot.metadata;
        self.replay()
    }

    pub fn save_snapshot(&self, path: &Path) -> Result<()> {
        self.snapshot().save(path)
    }

    pub fn load_snapshot(&mut self, path: &Path) -> Result<()> {
        let snapshot = LayerSnapshot::load(path)?;
        self.restore(snapshot)
    }
}

/// Style of a stitched payload, checked before committing.
fn stitch_config(payload: &ToolPayload) -> Option<&PatternConfig> {
    match payload {
        ToolPayload::Embroidery { stitches } => stitches.first().map(|s| &s.config),
        ToolPayload::Vector { paths } => paths.first().map(|p| &p.style),
        _ => None,
    }
}

impl std::fmt::Debug for CompositingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositingSession")
            .field("store", &self.store)
            .field("tool", &self.active_tool())
            .field("in_progress", &self.in_progress.len())
            .field("frame", &self.frame)
            .finish()
    }
}
