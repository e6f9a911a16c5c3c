//! Live overlay layers drawn from the latest payload
//!
//! Thermal anomalies are triangles whose size and colour follow fire
//! radiative power; aircraft are diamonds and vessels squares. Entries
//! without coordinates are skipped. Overlay entities are identified by their
//! index in the payload list.

use super::hover::{EntityKind, EntityRef};
use super::map_view::MapViewState;
use super::render::push_label;
use super::scene::{Layer, Rgba, Scene, Shape, Style};
use crate::geo::{LonLat, Point, ProjectionConfig, inverse_zoom_size};
use shared::{Aircraft, ConflictReport, ThermalAnomaly, Vessel};

const THERMAL_BASE_SIZE: f64 = 3.0;
const THERMAL_MAX_SIZE: f64 = 8.0;
const THERMAL_FRP_PER_UNIT: f64 = 200.0;
/// FRP at which the anomaly colour saturates.
const THERMAL_FRP_SATURATION: f64 = 1000.0;

const AIRCRAFT_SIZE: f64 = 4.0;
const VESSEL_HALF_SIDE: f64 = 3.0;

const THERMAL_COOL: Rgba = (251, 191, 36, 1.0);
const THERMAL_HOT: Rgba = (239, 68, 68, 1.0);
const AIRCRAFT_CIVIL: Rgba = (96, 165, 250, 1.0);
const AIRCRAFT_MILITARY: Rgba = (244, 63, 94, 1.0);
const VESSEL_COLOR: Rgba = (45, 212, 191, 1.0);

/// On-screen triangle size for a reading: `min(3 + frp / 200, 8)`.
pub fn thermal_base_size(frp: f64) -> f64 {
    (THERMAL_BASE_SIZE + frp.max(0.0) / THERMAL_FRP_PER_UNIT).min(THERMAL_MAX_SIZE)
}

/// Colour intensity in `[0, 1]`.
pub fn thermal_intensity(frp: f64) -> f64 {
    (frp / THERMAL_FRP_SATURATION).clamp(0.0, 1.0)
}

fn thermal_color(intensity: f64) -> Rgba {
    let mix = |cool: u8, hot: u8| (cool as f64 + (hot as f64 - cool as f64) * intensity).round() as u8;
    (
        mix(THERMAL_COOL.0, THERMAL_HOT.0),
        mix(THERMAL_COOL.1, THERMAL_HOT.1),
        mix(THERMAL_COOL.2, THERMAL_HOT.2),
        1.0,
    )
}

fn position(lat: Option<f64>, lon: Option<f64>) -> Option<LonLat> {
    match (lat, lon) {
        (Some(lat), Some(lon)) if lat.is_finite() && lon.is_finite() => Some(LonLat::new(lon, lat)),
        _ => None,
    }
}

pub fn render_live_overlays(
    scene: &mut Scene,
    payload: &ConflictReport,
    projection: &ProjectionConfig,
    view: &MapViewState,
) {
    if let Some(geoint) = payload.geoint.as_ref().filter(|_| view.layers.thermal) {
        render_thermal(scene, &geoint.anomalies, projection, view);
    }
    if let Some(sigint) = &payload.sigint {
        if view.layers.aircraft {
            render_aircraft(scene, &sigint.aircraft, projection, view);
        }
        if view.layers.vessels {
            render_vessels(scene, &sigint.ships, projection, view);
        }
    }
}

fn render_thermal(
    scene: &mut Scene,
    anomalies: &[ThermalAnomaly],
    projection: &ProjectionConfig,
    view: &MapViewState,
) {
    let zoom = projection.zoom;
    for (index, anomaly) in anomalies.iter().enumerate() {
        let Some(location) = position(anomaly.lat, anomaly.lon) else {
            continue;
        };
        let center = projection.to_map(location);
        let size = inverse_zoom_size(thermal_base_size(anomaly.frp), zoom);
        let intensity = thermal_intensity(anomaly.frp);
        let color = thermal_color(intensity);
        let entity = EntityRef::new(EntityKind::ThermalAnomaly, index.to_string());

        let half_base = size * 3f64.sqrt() / 2.0;
        scene.push_interactive(
            Layer::Thermal,
            Shape::Polyline {
                points: vec![
                    Point::new(center.x, center.y - size),
                    Point::new(center.x + half_base, center.y + size / 2.0),
                    Point::new(center.x - half_base, center.y + size / 2.0),
                ],
                closed: true,
            },
            Style::filled(color).with_opacity(0.5 + 0.5 * intensity),
            entity.clone(),
        );

        if view.hover.is_hovered(&entity) {
            let label = match &anomaly.confidence {
                Some(confidence) => format!("FRP {:.1} MW ({})", anomaly.frp, confidence),
                None => format!("FRP {:.1} MW", anomaly.frp),
            };
            push_label(scene, center, &label, color, zoom);
        }
    }
}

fn render_aircraft(
    scene: &mut Scene,
    aircraft: &[Aircraft],
    projection: &ProjectionConfig,
    view: &MapViewState,
) {
    let zoom = projection.zoom;
    let size = inverse_zoom_size(AIRCRAFT_SIZE, zoom);
    for (index, plane) in aircraft.iter().enumerate() {
        let Some(location) = position(plane.lat, plane.lon) else {
            continue;
        };
        let center = projection.to_map(location);
        let military = plane
            .category
            .as_deref()
            .is_some_and(|category| category.eq_ignore_ascii_case("military"));
        let color = if military { AIRCRAFT_MILITARY } else { AIRCRAFT_CIVIL };
        let entity = EntityRef::new(EntityKind::Aircraft, index.to_string());

        scene.push_interactive(
            Layer::Aircraft,
            Shape::Polyline {
                points: vec![
                    Point::new(center.x, center.y - size),
                    Point::new(center.x + size, center.y),
                    Point::new(center.x, center.y + size),
                    Point::new(center.x - size, center.y),
                ],
                closed: true,
            },
            Style::filled(color).with_opacity(0.9),
            entity.clone(),
        );

        if view.hover.is_hovered(&entity) {
            let callsign = plane.callsign.as_deref().map(str::trim).unwrap_or_default();
            let label = if callsign.is_empty() { "UNKNOWN" } else { callsign };
            push_label(scene, center, label, color, zoom);
        }
    }
}

fn render_vessels(scene: &mut Scene, ships: &[Vessel], projection: &ProjectionConfig, view: &MapViewState) {
    let zoom = projection.zoom;
    let half = inverse_zoom_size(VESSEL_HALF_SIDE, zoom);
    for (index, ship) in ships.iter().enumerate() {
        let Some(location) = position(ship.lat, ship.lon) else {
            continue;
        };
        let center = projection.to_map(location);
        let entity = EntityRef::new(EntityKind::Vessel, index.to_string());

        scene.push_interactive(
            Layer::Vessels,
            Shape::Rect {
                origin: Point::new(center.x - half, center.y - half),
                width: half * 2.0,
                height: half * 2.0,
                corner_radius: 0.0,
            },
            Style::filled(VESSEL_COLOR).with_opacity(0.9),
            entity.clone(),
        );

        if view.hover.is_hovered(&entity) {
            let name = ship.name.as_deref().map(str::trim).unwrap_or_default();
            let label = if name.is_empty() { "UNKNOWN" } else { name };
            push_label(scene, center, label, VESSEL_COLOR, zoom);
        }
    }
}
