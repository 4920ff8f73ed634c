//! Local planar projection around a boundary's anchor.
//!
//! This is a latitude-scaled flattening valid for boundary-sized extents. It is
//! not a general Mercator projection and must not be used for long distances.

use std::f64::consts::PI;

use geo::Coord;

/// Earth radius in meters
pub const EARTH_RADIUS_M: f64 = 6_378_000.0;

/// Meters per degree along a great circle
const DEG_TO_METER: f64 = PI * EARTH_RADIUS_M / 180.0;

/// Projection anchored at the first coordinate added to a boundary
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalProjection {
    lat0: f64,
    lon0: f64,
    y_scale: f64,
}

impl LocalProjection {
    pub fn new(lat0: f64, lon0: f64) -> Self {
        let stretch = (PI / 4.0 + lat0 * PI / 360.0).tan().ln();
        // On the equator the stretch is zero and would collapse every ring
        let y_scale = if stretch.is_finite() && stretch.abs() > f64::EPSILON {
            DEG_TO_METER * stretch
        } else {
            DEG_TO_METER
        };

        Self { lat0, lon0, y_scale }
    }

    /// Anchor as `(lat, lon)`
    pub fn anchor(&self) -> (f64, f64) {
        (self.lat0, self.lon0)
    }

    /// Map `(lat, lon)` onto the local plane
    pub fn project(&self, lat: f64, lon: f64) -> Coord<f64> {
        Coord {
            x: (lon - self.lon0) * DEG_TO_METER,
            y: (lat - self.lat0) * self.y_scale,
        }
    }

    /// Map a planar point back to `(lat, lon)`
    pub fn unproject(&self, point: Coord<f64>) -> (f64, f64) {
        (
            self.lat0 + point.y / self.y_scale,
            self.lon0 + point.x / DEG_TO_METER,
        )
    }
}

/// Great-circle distance in meters between two `(lat, lon)` points.
pub fn distance_m(a: (f64, f64), b: (f64, f64)) -> f64 {
    let (a1, b1) = (a.0.to_radians(), a.1.to_radians());
    let (a2, b2) = (b.0.to_radians(), b.1.to_radians());

    let cos_angle = a1.cos() * b1.cos() * a2.cos() * b2.cos()
        + a1.cos() * b1.sin() * a2.cos() * b2.sin()
        + a1.sin() * a2.sin();

    // Rounding can push the argument just outside acos' domain
    cos_angle.clamp(-1.0, 1.0).acos() * EARTH_RADIUS_M
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64, eps: f64) -> bool {
        (a - b).abs() < eps
    }

    #[test]
    fn test_anchor_maps_to_origin() {
        let proj = LocalProjection::new(-33.45, -70.66);
        let origin = proj.project(-33.45, -70.66);
        assert_eq!(origin, Coord { x: 0.0, y: 0.0 });
        assert_eq!(proj.anchor(), (-33.45, -70.66));
    }

    #[test]
    fn test_formula() {
        let proj = LocalProjection::new(45.0, 10.0);
        let p = proj.project(46.0, 11.0);
        let expected_y = DEG_TO_METER * (PI / 4.0 + 45.0 * PI / 360.0).tan().ln();
        assert!(close(p.x, DEG_TO_METER, 1e-6));
        assert!(close(p.y, expected_y, 1e-6));
    }

    #[test]
    fn test_southern_hemisphere_flips_y() {
        let proj = LocalProjection::new(-33.0, -70.0);
        assert!(proj.project(-32.0, -70.0).y < 0.0);
    }

    #[test]
    fn test_equator_does_not_collapse() {
        let proj = LocalProjection::new(0.0, 0.0);
        let p = proj.project(1.0, 0.0);
        assert!(close(p.y, DEG_TO_METER, 1e-6));
    }

    #[test]
    fn test_unproject_round_trip() {
        let proj = LocalProjection::new(-33.45, -70.66);
        let (lat, lon) = proj.unproject(proj.project(-33.5, -70.6));
        assert!(close(lat, -33.5, 1e-9));
        assert!(close(lon, -70.6, 1e-9));
    }

    #[test]
    fn test_distance() {
        assert!(close(distance_m((10.0, 10.0), (10.0, 10.0)), 0.0, 1.0));
        // One degree of latitude along a meridian
        let d = distance_m((0.0, 0.0), (1.0, 0.0));
        assert!(close(d, DEG_TO_METER, 1.0));
        // Antipodes hit the clamped end of acos
        let d = distance_m((0.0, 0.0), (0.0, 180.0));
        assert!(close(d, PI * EARTH_RADIUS_M, 1.0));
    }
}
