//! Geographic <-> screen coordinate transforms
//!
//! Positions are projected with Equal Earth (equal-area, smooth across
//! latitudes, invertible). Three spaces are involved:
//!
//! - geographic: [`LonLat`] in degrees
//! - map space: projected and scaled, origin at (0°, 0°), y grows downward
//! - screen space: map space under the viewport's [`ZoomTransform`]
//!
//! Overlay glyphs live in map space inside the zoom group and are sized
//! `base / zoom`, which keeps their on-screen size constant.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

const A1: f64 = 1.340264;
const A2: f64 = -0.081106;
const A3: f64 = 0.000893;
const A4: f64 = 0.003796;
const M: f64 = 0.866_025_403_784_438_6; // sqrt(3) / 2

const NEWTON_ITERATIONS: usize = 12;
const NEWTON_EPSILON: f64 = 1e-12;
const LIMIT_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LonLat {
    pub lon: f64,
    pub lat: f64,
}

impl LonLat {
    pub const fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

impl From<[f64; 2]> for LonLat {
    fn from([lon, lat]: [f64; 2]) -> Self {
        Self { lon, lat }
    }
}

/// A point in map or screen space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn midpoint(self, other: Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

/// Raw Equal Earth forward transform on radians, unit sphere.
pub fn equal_earth(lambda: f64, phi: f64) -> (f64, f64) {
    let l = (M * phi.sin()).asin();
    let l2 = l * l;
    let l6 = l2 * l2 * l2;
    let x = lambda * l.cos() / (M * (A1 + 3.0 * A2 * l2 + l6 * (7.0 * A3 + 9.0 * A4 * l2)));
    let y = l * (A1 + A2 * l2 + l6 * (A3 + A4 * l2));
    (x, y)
}

/// Inverse of [`equal_earth`]; `None` outside the projected world outline.
pub fn equal_earth_inverse(x: f64, y: f64) -> Option<(f64, f64)> {
    let mut l = y;
    for _ in 0..NEWTON_ITERATIONS {
        let l2 = l * l;
        let l6 = l2 * l2 * l2;
        let fy = l * (A1 + A2 * l2 + l6 * (A3 + A4 * l2)) - y;
        let fpy = A1 + 3.0 * A2 * l2 + l6 * (7.0 * A3 + 9.0 * A4 * l2);
        let delta = fy / fpy;
        l -= delta;
        if delta.abs() < NEWTON_EPSILON {
            break;
        }
    }

    // |l| peaks at asin(M) = π/3 on the poles; past that Newton found a spurious root
    if !l.is_finite() || l.abs() > PI / 3.0 + LIMIT_EPSILON {
        return None;
    }
    let sin_phi = l.sin() / M;
    if sin_phi.abs() > 1.0 + LIMIT_EPSILON {
        return None;
    }

    let l2 = l * l;
    let l6 = l2 * l2 * l2;
    let lambda = M * x * (A1 + 3.0 * A2 * l2 + l6 * (7.0 * A3 + 9.0 * A4 * l2)) / l.cos();
    if !lambda.is_finite() || lambda.abs() > PI + LIMIT_EPSILON {
        return None;
    }

    Some((lambda, sin_phi.clamp(-1.0, 1.0).asin()))
}

pub fn wrap_longitude(lon: f64) -> f64 {
    (lon + 180.0).rem_euclid(360.0) - 180.0
}

/// Scale-then-translate that maps map space onto the screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomTransform {
    pub translate_x: f64,
    pub translate_y: f64,
    pub scale: f64,
}

impl ZoomTransform {
    pub const IDENTITY: ZoomTransform = ZoomTransform {
        translate_x: 0.0,
        translate_y: 0.0,
        scale: 1.0,
    };

    pub fn apply(&self, point: Point) -> Point {
        Point::new(
            self.translate_x + point.x * self.scale,
            self.translate_y + point.y * self.scale,
        )
    }

    pub fn invert(&self, point: Point) -> Point {
        Point::new(
            (point.x - self.translate_x) / self.scale,
            (point.y - self.translate_y) / self.scale,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectionConfig {
    /// Degrees added to every longitude before projecting.
    pub rotation: f64,
    pub scale: f64,
    pub center: LonLat,
    pub zoom: f64,
    pub width: f64,
    pub height: f64,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            rotation: 0.0,
            scale: 180.0,
            center: LonLat::new(0.0, 0.0),
            zoom: 1.0,
            width: 1000.0,
            height: 500.0,
        }
    }
}

impl From<&shared::MapSection> for ProjectionConfig {
    /// Base projection for a configured map; the view starts at the
    /// configured default center and zoom.
    fn from(map: &shared::MapSection) -> Self {
        Self {
            rotation: map.rotation,
            scale: map.scale,
            center: LonLat::from(map.default_center),
            zoom: map.default_zoom,
            width: map.width,
            height: map.height,
        }
    }
}

impl ProjectionConfig {
    pub fn with_view(mut self, center: LonLat, zoom: f64) -> Self {
        self.center = center;
        self.zoom = zoom;
        self
    }

    pub fn to_map(&self, position: LonLat) -> Point {
        let lambda = wrap_longitude(position.lon + self.rotation).to_radians();
        let phi = position.lat.clamp(-90.0, 90.0).to_radians();
        let (x, y) = equal_earth(lambda, phi);
        Point::new(x * self.scale, -y * self.scale)
    }

    pub fn from_map(&self, point: Point) -> Option<LonLat> {
        let (lambda, phi) = equal_earth_inverse(point.x / self.scale, -point.y / self.scale)?;
        Some(LonLat::new(
            wrap_longitude(lambda.to_degrees() - self.rotation),
            phi.to_degrees(),
        ))
    }

    pub fn zoom_transform(&self) -> ZoomTransform {
        let center = self.to_map(self.center);
        ZoomTransform {
            translate_x: self.width / 2.0 - center.x * self.zoom,
            translate_y: self.height / 2.0 - center.y * self.zoom,
            scale: self.zoom,
        }
    }

    pub fn project(&self, position: LonLat) -> Point {
        self.zoom_transform().apply(self.to_map(position))
    }

    pub fn unproject(&self, point: Point) -> Option<LonLat> {
        self.from_map(self.zoom_transform().invert(point))
    }

    /// Horizontal extent of the whole world in map units.
    pub fn world_width(&self) -> f64 {
        2.0 * equal_earth(PI, 0.0).0 * self.scale
    }
}

pub fn project(lon: f64, lat: f64, config: &ProjectionConfig) -> Point {
    config.project(LonLat::new(lon, lat))
}

pub fn unproject(x: f64, y: f64, config: &ProjectionConfig) -> Option<LonLat> {
    config.unproject(Point::new(x, y))
}

/// Map-space size that renders as `base_size` screen units at `zoom`.
pub fn inverse_zoom_size(base_size: f64, zoom: f64) -> f64 {
    base_size / zoom
}

/// Points along the shortest great-circle arc, endpoints included.
pub fn great_circle(from: LonLat, to: LonLat, segments: usize) -> Vec<LonLat> {
    let to_vector = |p: LonLat| {
        let (lon, lat) = (p.lon.to_radians(), p.lat.to_radians());
        [lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin()]
    };
    let a = to_vector(from);
    let b = to_vector(to);
    let dot = (a[0] * b[0] + a[1] * b[1] + a[2] * b[2]).clamp(-1.0, 1.0);
    let angle = dot.acos();
    let segments = segments.max(1);

    if angle < 1e-9 || (PI - angle) < 1e-9 {
        return vec![from, to];
    }

    let sin_angle = angle.sin();
    (0..=segments)
        .map(|step| {
            let f = step as f64 / segments as f64;
            let wa = ((1.0 - f) * angle).sin() / sin_angle;
            let wb = (f * angle).sin() / sin_angle;
            let v = [
                wa * a[0] + wb * b[0],
                wa * a[1] + wb * b[1],
                wa * a[2] + wb * b[2],
            ];
            LonLat::new(
                v[1].atan2(v[0]).to_degrees(),
                v[2].atan2(v[0].hypot(v[1])).to_degrees(),
            )
        })
        .collect()
}
