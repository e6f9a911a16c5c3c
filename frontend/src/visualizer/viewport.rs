//! Pan/zoom state of the map
//!
//! The viewport is a plain value; the map view actor owns the only mutable
//! copy and replaces it on every gesture.

use crate::geo::{LonLat, Point, ProjectionConfig};
use crate::registry::RegionPreset;

pub const ZOOM_MIN: f64 = 1.0;
pub const ZOOM_MAX: f64 = 8.0;
pub const ZOOM_STEP: f64 = 1.5;
const WHEEL_SENSITIVITY: f64 = 0.002;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub center: LonLat,
    pub zoom: f64,
}

impl From<&shared::MapSection> for Viewport {
    fn from(map: &shared::MapSection) -> Self {
        Self::new(LonLat::from(map.default_center), map.default_zoom)
    }
}

impl Viewport {
    pub fn new(center: LonLat, zoom: f64) -> Self {
        Self {
            center,
            zoom: clamp_zoom(zoom),
        }
    }

    pub fn with_zoom(self, zoom: f64) -> Self {
        Self::new(self.center, zoom)
    }

    pub fn zoom_in(self) -> Self {
        self.with_zoom(self.zoom * ZOOM_STEP)
    }

    pub fn zoom_out(self) -> Self {
        self.with_zoom(self.zoom / ZOOM_STEP)
    }

    /// Scroll zoom: each wheel unit scales by `2^(-delta_y * 0.002)`.
    pub fn zoom_by_wheel(self, delta_y: f64) -> Self {
        self.with_zoom(self.zoom * (-delta_y * WHEEL_SENSITIVITY).exp2())
    }

    /// Drag by a screen-space delta. Content follows the pointer, so the new
    /// center is whatever sat at `middle - delta`. A drag that would move the
    /// center off the world is ignored.
    pub fn pan_by(self, dx: f64, dy: f64, base: &ProjectionConfig) -> Self {
        let projection = self.projection(base);
        let target = Point::new(base.width / 2.0 - dx, base.height / 2.0 - dy);
        match projection.unproject(target) {
            Some(center) => Self { center, ..self },
            None => self,
        }
    }

    pub fn fly_to(self, preset: &RegionPreset) -> Self {
        Self::new(preset.center, preset.zoom)
    }

    pub fn projection(&self, base: &ProjectionConfig) -> ProjectionConfig {
        base.with_view(self.center, self.zoom)
    }
}

pub fn clamp_zoom(zoom: f64) -> f64 {
    if zoom.is_nan() {
        return ZOOM_MIN;
    }
    zoom.clamp(ZOOM_MIN, ZOOM_MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{EntityRegistry, ZoneId};

    fn start() -> Viewport {
        Viewport::new(LonLat::new(30.0, 20.0), 1.0)
    }

    #[test]
    fn zoom_buttons_step_and_clamp() {
        let zoomed = start().zoom_in();
        assert!((zoomed.zoom - 1.5).abs() < 1e-12);
        assert!((zoomed.zoom_out().zoom - 1.0).abs() < 1e-12);

        let mut viewport = start();
        for _ in 0..20 {
            viewport = viewport.zoom_in();
        }
        assert_eq!(viewport.zoom, ZOOM_MAX);
        assert_eq!(start().zoom_out().zoom, ZOOM_MIN);
    }

    #[test]
    fn wheel_zoom_is_exponential_and_clamped() {
        let zoomed = start().with_zoom(2.0).zoom_by_wheel(-500.0);
        assert!((zoomed.zoom - 4.0).abs() < 1e-9);
        assert_eq!(start().zoom_by_wheel(10_000.0).zoom, ZOOM_MIN);
        assert_eq!(Viewport::new(LonLat::new(0.0, 0.0), f64::NAN).zoom, ZOOM_MIN);
    }

    #[test]
    fn pan_moves_center_against_drag() {
        let base = ProjectionConfig::default();
        let panned = start().pan_by(100.0, 0.0, &base);
        assert!(panned.center.lon < 30.0);
        assert!((panned.center.lat - 20.0).abs() < 1.0);

        let zoomed_pan = start().with_zoom(4.0).pan_by(100.0, 0.0, &base);
        // same screen drag covers less ground when zoomed in
        assert!(zoomed_pan.center.lon > panned.center.lon);
    }

    #[test]
    fn pan_off_the_world_is_ignored() {
        let base = ProjectionConfig::default();
        let viewport = start();
        assert_eq!(viewport.pan_by(0.0, 5_000.0, &base), viewport);
    }

    #[test]
    fn fly_to_snaps_to_preset() {
        let registry = EntityRegistry::builtin();
        let preset = registry.preset_for(ZoneId::Ukraine).unwrap();
        let viewport = start().fly_to(preset);
        assert_eq!(viewport.center, preset.center);
        assert_eq!(viewport.zoom, preset.zoom);
    }
}
