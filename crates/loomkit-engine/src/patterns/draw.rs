//! tiny-skia drawing helpers shared by the renderers.

use loomkit_core::prng::stream;
use loomkit_core::{Point, StitchJitter, ThreadColor};
use tiny_skia::{Color, FillRule, LineCap, LineJoin, Paint, PathBuilder, Pixmap, Stroke, Transform};

pub(crate) fn paint(color: ThreadColor, opacity: f32) -> Paint<'static> {
    let [r, g, b, a] = color.rgba8(opacity);
    let mut paint = Paint::default();
    paint.set_color(Color::from_rgba8(r, g, b, a));
    paint.anti_alias = true;
    paint
}

fn round_stroke(width: f32) -> Stroke {
    Stroke {
        width,
        line_cap: LineCap::Round,
        line_join: LineJoin::Round,
        ..Default::default()
    }
}

/// Stroke a polyline with round joins and caps. Returns false when nothing
/// was drawn.
pub(crate) fn stroke_polyline(
    pixmap: &mut Pixmap,
    points: &[Point],
    width: f32,
    paint: &Paint,
    closed: bool,
) -> bool {
    if points.len() < 2 {
        return false;
    }
    let mut pb = PathBuilder::new();
    pb.move_to(points[0].x, points[0].y);
    for p in &points[1..] {
        pb.line_to(p.x, p.y);
    }
    if closed {
        pb.close();
    }
    match pb.finish() {
        Some(path) => {
            pixmap.stroke_path(&path, paint, &round_stroke(width), Transform::identity(), None);
            true
        }
        None => false,
    }
}

/// One straight segment.
pub(crate) fn stroke_segment(pixmap: &mut Pixmap, a: Point, b: Point, width: f32, paint: &Paint) {
    stroke_polyline(pixmap, &[a, b], width, paint, false);
}

pub(crate) fn fill_polygon(pixmap: &mut Pixmap, points: &[Point], paint: &Paint) -> bool {
    if points.len() < 3 {
        return false;
    }
    let mut pb = PathBuilder::new();
    pb.move_to(points[0].x, points[0].y);
    for p in &points[1..] {
        pb.line_to(p.x, p.y);
    }
    pb.close();
    match pb.finish() {
        Some(path) => {
            pixmap.fill_path(&path, paint, FillRule::EvenOdd, Transform::identity(), None);
            true
        }
        None => false,
    }
}

pub(crate) fn fill_circle(pixmap: &mut Pixmap, center: Point, radius: f32, paint: &Paint) -> bool {
    match PathBuilder::from_circle(center.x, center.y, radius) {
        Some(path) => {
            pixmap.fill_path(&path, paint, FillRule::Winding, Transform::identity(), None);
            true
        }
        None => false,
    }
}

pub(crate) fn stroke_circle(
    pixmap: &mut Pixmap,
    center: Point,
    radius: f32,
    width: f32,
    paint: &Paint,
) -> bool {
    match PathBuilder::from_circle(center.x, center.y, radius) {
        Some(path) => {
            pixmap.stroke_path(&path, paint, &round_stroke(width), Transform::identity(), None);
            true
        }
        None => false,
    }
}

/// Base color shifted by the stitch's brightness jitter.
pub(crate) fn stitch_color(base: ThreadColor, jitter: &StitchJitter, index: usize) -> ThreadColor {
    if !jitter.is_enabled() {
        return base;
    }
    base.adjusted(jitter.amount(stream::BRIGHTNESS, index as u64))
}
