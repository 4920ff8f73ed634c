//! Ring segments and point-in-polygon testing.
//!
//! Containment uses the even-odd rule: a ray from the query point in a fixed
//! direction is intersected with every segment, and an odd crossing count
//! means inside.
//!
//! Vertex and edge hits use a half-open rule. An endpoint lying exactly on the
//! ray's supporting line counts as being on its right-hand side, so a ray that
//! passes through a vertex shared by two segments crosses exactly one of them,
//! and a segment collinear with the ray never counts.

use geo::{Coord, Line};

/// Ray direction shared by every containment test in a run
pub const RAY_DIRECTION: Coord<f64> = Coord { x: 1.0, y: 1.0 };

fn cross(a: Coord<f64>, b: Coord<f64>) -> f64 {
    a.x * b.y - a.y * b.x
}

/// Build closing segments `(p[i], p[(i + 1) % n])` for a projected ring.
///
/// Zero-length segments (repeated consecutive points) are skipped.
pub fn build_segments(ring: &[Coord<f64>]) -> Vec<Line<f64>> {
    let n = ring.len();
    if n < 2 {
        return Vec::new();
    }

    (0..n)
        .map(|i| Line::new(ring[i], ring[(i + 1) % n]))
        .filter(|line| line.start != line.end)
        .collect()
}

/// Count segments crossed by the ray from `point` along [`RAY_DIRECTION`].
pub fn ray_crossings(segments: &[Line<f64>], point: Coord<f64>) -> usize {
    segments
        .iter()
        .filter(|segment| crosses(segment, point))
        .count()
}

fn crosses(segment: &Line<f64>, point: Coord<f64>) -> bool {
    let side_start = cross(RAY_DIRECTION, segment.start - point);
    let side_end = cross(RAY_DIRECTION, segment.end - point);

    // Both endpoints on the same side of the ray's line
    if (side_start > 0.0) == (side_end > 0.0) {
        return false;
    }

    // Sides differ, so the segment is not parallel to the ray
    let delta = segment.delta();
    let t = cross(segment.start - point, delta) / cross(RAY_DIRECTION, delta);
    t > 0.0
}

/// Even-odd point-in-polygon test
pub fn contains(segments: &[Line<f64>], point: Coord<f64>) -> bool {
    ray_crossings(segments, point) % 2 == 1
}
