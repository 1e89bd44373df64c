//! Point paths handed to pattern renderers.

use loomkit_core::geometry::{self, Point};
use lyon::math::point;
use lyon::path::iterator::*;
use lyon::path::Path;
use serde::{Deserialize, Serialize};

/// Flattening tolerance for smoothed paths, in pixels.
pub const SMOOTHING_TOLERANCE: f32 = 0.25;

/// An ordered point sequence. Fewer than two points is valid and draws
/// nothing.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StitchPath {
    pub points: Vec<Point>,
    #[serde(default)]
    pub closed: bool,
}

impl StitchPath {
    pub fn new(points: Vec<Point>) -> Self {
        Self {
            points,
            closed: false,
        }
    }

    pub fn closed(points: Vec<Point>) -> Self {
        Self {
            points,
            closed: true,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Whether the path has enough points to produce geometry.
    pub fn is_drawable(&self) -> bool {
        self.points.len() >= 2
    }

    /// Points with duplicates and non-finite entries removed; a closed path
    /// gets its first point appended when it is not already the last.
    pub fn cleaned(&self) -> Vec<Point> {
        let mut pts = geometry::dedup_points(&self.points);
        if self.closed && pts.len() > 2 {
            if let (Some(first), Some(last)) = (pts.first().copied(), pts.last()) {
                if first.distance_to(last) > geometry::DEGENERATE_SEGMENT {
                    pts.push(first);
                }
            }
        }
        pts
    }

    /// Total length of the cleaned polyline.
    pub fn length(&self) -> f32 {
        geometry::path_length(&self.cleaned())
    }

    /// Copy keeping roughly `max_points` points, for live previews only.
    pub fn subsampled(&self, max_points: usize) -> StitchPath {
        StitchPath {
            points: geometry::subsample(&self.points, max_points),
            closed: self.closed,
        }
    }

    /// Interpret the points as a quadratic B-spline (each interior point
    /// is a control point, curve knots at segment midpoints) and flatten it.
    pub fn smoothed(&self, tolerance: f32) -> StitchPath {
        let pts = geometry::dedup_points(&self.points);
        if pts.len() < 3 {
            return StitchPath {
                points: pts,
                closed: self.closed,
            };
        }

        let mut builder = Path::builder();
        builder.begin(point(pts[0].x, pts[0].y));
        for i in 1..pts.len() - 1 {
            let ctrl = pts[i];
            let to = ctrl.lerp(&pts[i + 1], 0.5);
            builder.quadratic_bezier_to(point(ctrl.x, ctrl.y), point(to.x, to.y));
        }
        let last = pts[pts.len() - 1];
        builder.line_to(point(last.x, last.y));
        builder.end(self.closed);
        let path = builder.build();

        let mut out: Vec<Point> = Vec::new();
        for event in path.iter().flattened(tolerance.max(0.01)) {
            match event {
                lyon::path::Event::Begin { at } => out.push(Point::new(at.x, at.y)),
                lyon::path::Event::Line { to, .. } => out.push(Point::new(to.x, to.y)),
                _ => {}
            }
        }

        StitchPath {
            points: geometry::dedup_points(&out),
            closed: self.closed,
        }
    }
}

impl From<Vec<Point>> for StitchPath {
    fn from(points: Vec<Point>) -> Self {
        StitchPath::new(points)
    }
}

/// One needle position of a stitch plan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StitchPoint {
    pub position: Point,
    /// Rail index for renderers that sew several parallel lines.
    pub rail: usize,
}

impl StitchPoint {
    pub fn new(position: Point) -> Self {
        Self { position, rail: 0 }
    }

    pub fn on_rail(position: Point, rail: usize) -> Self {
        Self { position, rail }
    }
}
