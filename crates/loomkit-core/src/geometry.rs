//! Geometry utilities
//!
//! Pure functions over ordered point sequences: distances, arc-length walks,
//! resampling and tangents. Nothing in here keeps state.

use serde::{Deserialize, Serialize};

/// Segments shorter than this are treated as duplicate points.
pub const DEGENERATE_SEGMENT: f32 = 1e-6;

/// A point in texture space (pixels).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Linear interpolation towards `other`; `t` is not clamped.
    pub fn lerp(&self, other: &Point, t: f32) -> Point {
        Point::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
        )
    }

    /// Offset along a direction vector.
    pub fn offset(&self, dir: (f32, f32), amount: f32) -> Point {
        Point::new(self.x + dir.0 * amount, self.y + dir.1 * amount)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<(f32, f32)> for Point {
    fn from((x, y): (f32, f32)) -> Self {
        Self::new(x, y)
    }
}

/// Euclidean distance between two points.
pub fn distance(a: &Point, b: &Point) -> f32 {
    a.distance_to(b)
}

/// Total polyline length.
pub fn path_length(points: &[Point]) -> f32 {
    points.windows(2).map(|w| w[0].distance_to(&w[1])).sum()
}

/// Upper bound on the samples one walk or resample emits.
///
/// Sample positions are computed in `f64` from an integer counter, so the
/// walk always advances, but a path far larger than any canvas would still
/// ask for one sample per step. Walks stop once this many are emitted.
pub const MAX_WALK_SAMPLES: usize = 1 << 18;

/// Walk the polyline by arc length, emitting a point every `step` units
/// starting at distance 0.
///
/// A path whose segments are all degenerate yields its first point once.
/// Fewer than two points yields nothing. At most [`MAX_WALK_SAMPLES`]
/// points are returned.
pub fn walk_arc_length(points: &[Point], step: f32) -> Vec<Point> {
    if points.len() < 2 || !(step > 0.0) || !step.is_finite() {
        return Vec::new();
    }

    let step = f64::from(step);
    let mut out = Vec::new();
    let mut travelled = 0.0f64;
    let mut k: u64 = 0;
    'walk: for w in points.windows(2) {
        let (a, b) = (w[0], w[1]);
        let len = f64::from(a.distance_to(&b));
        if len <= f64::from(DEGENERATE_SEGMENT) {
            continue;
        }
        loop {
            let target = k as f64 * step;
            // Small slack so a step landing exactly on the end is not lost to rounding.
            if target > travelled + len + 1e-4 {
                break;
            }
            if out.len() >= MAX_WALK_SAMPLES {
                break 'walk;
            }
            let t = ((target - travelled) / len).clamp(0.0, 1.0);
            out.push(a.lerp(&b, t as f32));
            k += 1;
        }
        travelled += len;
    }

    if out.is_empty() {
        out.push(points[0]);
    }
    out
}

/// Walk every segment independently, restarting the step counter at each
/// segment start. Every segment boundary and the final point get a sample.
/// At most [`MAX_WALK_SAMPLES`] points are returned, the final point included.
pub fn walk_segments(points: &[Point], step: f32) -> Vec<Point> {
    if points.len() < 2 || !(step > 0.0) || !step.is_finite() {
        return Vec::new();
    }

    let step = f64::from(step);
    let mut out = Vec::new();
    'walk: for w in points.windows(2) {
        let (a, b) = (w[0], w[1]);
        let len = f64::from(a.distance_to(&b));
        if len <= f64::from(DEGENERATE_SEGMENT) {
            continue;
        }
        let mut k: u64 = 0;
        loop {
            let d = k as f64 * step;
            if d >= len - 1e-4 {
                break;
            }
            if out.len() + 1 >= MAX_WALK_SAMPLES {
                break 'walk;
            }
            out.push(a.lerp(&b, (d / len) as f32));
            k += 1;
        }
    }

    if let Some(last) = points.last() {
        out.push(*last);
    }
    out
}

/// Resample at a fixed spacing measured along the whole polyline. The first
/// and last input points are always kept, and at most [`MAX_WALK_SAMPLES`]
/// points are returned.
pub fn resample_polyline(points: &[Point], spacing: f32) -> Vec<Point> {
    if points.len() < 2 || !(spacing > 0.0) || !spacing.is_finite() {
        return points.to_vec();
    }

    let spacing = f64::from(spacing);
    let mut out = vec![points[0]];
    let mut travelled = 0.0f64;
    let mut k: u64 = 1;
    'walk: for w in points.windows(2) {
        let (a, b) = (w[0], w[1]);
        let len = f64::from(a.distance_to(&b));
        if len <= f64::from(DEGENERATE_SEGMENT) {
            continue;
        }
        loop {
            let target = k as f64 * spacing;
            if target > travelled + len {
                break;
            }
            if out.len() + 1 >= MAX_WALK_SAMPLES {
                break 'walk;
            }
            out.push(a.lerp(&b, ((target - travelled) / len) as f32));
            k += 1;
        }
        travelled += len;
    }

    if let (Some(last_out), Some(last_in)) = (out.last(), points.last()) {
        if last_out.distance_to(last_in) > DEGENERATE_SEGMENT {
            out.push(*last_in);
        }
    }
    out
}

/// Unit tangent at index `i`: central difference inside the path, one-sided
/// at the ends. Falls back to `(1, 0)` where the neighbourhood is degenerate.
pub fn tangent_at(points: &[Point], i: usize) -> (f32, f32) {
    if points.len() < 2 {
        return (1.0, 0.0);
    }
    let last = points.len() - 1;
    let (a, b) = if i == 0 {
        (points[0], points[1])
    } else if i >= last {
        (points[last - 1], points[last])
    } else {
        (points[i - 1], points[i + 1])
    };
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let mag = (dx * dx + dy * dy).sqrt();
    if mag <= DEGENERATE_SEGMENT || !mag.is_finite() {
        (1.0, 0.0)
    } else {
        (dx / mag, dy / mag)
    }
}

/// Left-hand normal of a unit tangent.
pub fn normal_of(tangent: (f32, f32)) -> (f32, f32) {
    (-tangent.1, tangent.0)
}

/// Keep at most `max_points` points by taking every Nth one.
/// The last point is always kept so the preview reaches the cursor.
pub fn subsample(points: &[Point], max_points: usize) -> Vec<Point> {
    if max_points < 2 || points.len() <= max_points {
        return points.to_vec();
    }
    // stride leaves a free slot for the last point
    let stride = (points.len() - 1).div_ceil(max_points - 1);
    let mut out: Vec<Point> = points.iter().step_by(stride).copied().collect();
    if let (Some(kept), Some(last)) = (out.last(), points.last()) {
        if kept != last {
            out.push(*last);
        }
    }
    out
}

/// Drop consecutive points closer than [`DEGENERATE_SEGMENT`] and any
/// non-finite point.
pub fn dedup_points(points: &[Point]) -> Vec<Point> {
    let mut out: Vec<Point> = Vec::with_capacity(points.len());
    for p in points.iter().filter(|p| p.is_finite()) {
        match out.last() {
            Some(prev) if prev.distance_to(p) <= DEGENERATE_SEGMENT => {}
            _ => out.push(*p),
        }
    }
    out
}
