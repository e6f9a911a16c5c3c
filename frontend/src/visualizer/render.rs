//! Map render pass
//!
//! Builds one [`Scene`] from the registry, the basemap, the view state, the
//! animation phase and the latest payload. Z-order: basemap, links, zones,
//! live overlays, hover labels, legend.

use super::hover::{EntityKind, EntityRef};
use super::map_view::MapViewState;
use super::overlay::render_live_overlays;
use super::scene::{Dash, Layer, Rgba, Scene, Shape, Style};
use crate::animation_clock::{AnimationPhase, dash_offset, entity_offset, pulse_scale};
use crate::geo::{Basemap, LonLat, Point, ProjectionConfig, graticule, great_circle, inverse_zoom_size};
use crate::registry::{EntityRegistry, Severity};
use shared::ConflictReport;

pub const PRIMARY: Rgba = (34, 211, 238, 1.0);
pub const FOREGROUND: Rgba = (226, 232, 240, 1.0);
pub const MUTED: Rgba = (148, 163, 184, 1.0);
pub const CARD: Rgba = (15, 23, 42, 1.0);
const BORDER: Rgba = (51, 65, 85, 1.0);

const LINK_SEGMENTS: usize = 32;
const GRATICULE_STEP: f64 = 30.0;

const RING_INNER: f64 = 8.0;
const RING_OUTER: f64 = 14.0;
const CORE_RADIUS: f64 = 3.5;
const CORE_RADIUS_HOVERED: f64 = 5.0;

const LABEL_CHAR_WIDTH: f64 = 7.5;
const LABEL_PADDING: f64 = 16.0;
const LABEL_HEIGHT: f64 = 20.0;
const LABEL_FONT_SIZE: f64 = 10.0;

const LEGEND_MARGIN_X: f64 = 30.0;
const LEGEND_MARGIN_BOTTOM: f64 = 70.0;
const LEGEND_SPACING: f64 = 70.0;

pub struct SceneInput<'a> {
    pub registry: &'a EntityRegistry,
    pub basemap: &'a Basemap,
    pub base: &'a ProjectionConfig,
    pub view: &'a MapViewState,
    pub phase: AnimationPhase,
    pub payload: Option<&'a ConflictReport>,
}

pub fn render_scene(input: &SceneInput<'_>) -> Scene {
    let projection = input.view.viewport.projection(input.base);
    let mut scene = Scene::new(projection.width, projection.height, projection.zoom_transform());

    render_basemap(&mut scene, input.basemap, &projection);
    if input.view.layers.links {
        render_links(&mut scene, input, &projection);
    }
    render_zones(&mut scene, input, &projection);
    if let Some(payload) = input.payload {
        render_live_overlays(&mut scene, payload, &projection, input.view);
    }
    render_legend(&mut scene);
    scene
}

// ===== BASEMAP =====

fn render_basemap(scene: &mut Scene, basemap: &Basemap, projection: &ProjectionConfig) {
    let zoom = projection.zoom;
    if basemap.is_empty() {
        let style = Style::stroked(BORDER, inverse_zoom_size(0.3, zoom))
            .with_opacity(0.3)
            .with_dash(Dash {
                length: inverse_zoom_size(4.0, zoom),
                gap: inverse_zoom_size(8.0, zoom),
                offset: 0.0,
            });
        for line in graticule(GRATICULE_STEP) {
            for run in project_path(&line, projection) {
                scene.push(Layer::Basemap, polyline(run, false), style.clone());
            }
        }
        return;
    }

    let land = Style::filled(FOREGROUND)
        .with_stroke((PRIMARY.0, PRIMARY.1, PRIMARY.2, 0.35), inverse_zoom_size(0.4, zoom))
        .with_opacity(0.18);
    let coast = Style::stroked((PRIMARY.0, PRIMARY.1, PRIMARY.2, 0.35), inverse_zoom_size(0.4, zoom))
        .with_opacity(0.18);
    for ring in basemap.rings() {
        let runs = project_path(ring, projection);
        let is_closed_ring = ring.len() > 2 && ring.first() == ring.last();
        if runs.len() == 1 && is_closed_ring {
            for run in runs {
                scene.push(Layer::Basemap, polyline(run, true), land.clone());
            }
        } else {
            for run in runs {
                scene.push(Layer::Basemap, polyline(run, false), coast.clone());
            }
        }
    }
}

/// Project a geographic path into map space, splitting it wherever it
/// jumps across the antimeridian.
pub fn project_path(path: &[LonLat], projection: &ProjectionConfig) -> Vec<Vec<Point>> {
    let max_jump = projection.world_width() / 2.0;
    let mut runs: Vec<Vec<Point>> = Vec::new();
    let mut current: Vec<Point> = Vec::new();
    for position in path {
        let point = projection.to_map(*position);
        let jumps = current
            .last()
            .is_some_and(|previous| (point.x - previous.x).abs() > max_jump);
        if jumps {
            runs.push(std::mem::take(&mut current));
        }
        current.push(point);
    }
    runs.push(current);
    runs.retain(|run| run.len() >= 2);
    runs
}

fn polyline(points: Vec<Point>, closed: bool) -> Shape {
    Shape::Polyline { points, closed }
}

// ===== LINKS =====

fn render_links(scene: &mut Scene, input: &SceneInput<'_>, projection: &ProjectionConfig) {
    let zoom = projection.zoom;
    let style = Style::stroked((PRIMARY.0, PRIMARY.1, PRIMARY.2, 0.4), inverse_zoom_size(1.0, zoom))
        .with_dash(Dash {
            length: inverse_zoom_size(4.0, zoom),
            gap: inverse_zoom_size(4.0, zoom),
            offset: inverse_zoom_size(dash_offset(input.phase), zoom),
        });

    for resolved in input.registry.resolved_links() {
        if !input.view.is_link_drawn(resolved.link.id) {
            continue;
        }
        let arc = great_circle(resolved.from.coordinates, resolved.to.coordinates, LINK_SEGMENTS);
        let entity = EntityRef::new(EntityKind::Link, resolved.link.id);
        for run in project_path(&arc, projection) {
            scene.push_interactive(Layer::Links, polyline(run, false), style.clone(), entity.clone());
        }

        if input.view.hover.is_hovered(&entity) {
            let midpoint = projection.to_map(arc[arc.len() / 2]);
            push_label(scene, midpoint, resolved.link.label, PRIMARY, zoom);
        }
    }
}

// ===== ZONES =====

fn render_zones(scene: &mut Scene, input: &SceneInput<'_>, projection: &ProjectionConfig) {
    let zoom = projection.zoom;
    for zone in input.registry.zones() {
        let color = zone.severity.color();
        let center = projection.to_map(zone.coordinates);
        let pulse = pulse_scale(input.phase, entity_offset(zone.id.as_str()));
        let entity = EntityRef::new(EntityKind::Zone, zone.id.as_str());
        let hovered = input.view.hover.is_hovered(&entity);

        scene.push(
            Layer::Zones,
            Shape::Circle {
                center,
                radius: inverse_zoom_size(RING_INNER * pulse, zoom),
            },
            Style::stroked(color, inverse_zoom_size(0.5, zoom)).with_opacity(0.4 / pulse),
        );
        scene.push(
            Layer::Zones,
            Shape::Circle {
                center,
                radius: inverse_zoom_size(RING_OUTER * pulse, zoom),
            },
            Style::stroked(color, inverse_zoom_size(0.3, zoom)).with_opacity(0.2 / pulse),
        );
        scene.push_interactive(
            Layer::Zones,
            Shape::Circle {
                center,
                radius: inverse_zoom_size(if hovered { CORE_RADIUS_HOVERED } else { CORE_RADIUS }, zoom),
            },
            Style::filled(color).with_opacity(0.9),
            entity,
        );

        if hovered {
            push_label(scene, center, zone.label, color, zoom);
        }
    }
}

// ===== LABELS =====

/// Tooltip box anchored right of `anchor`, constant size on screen.
pub fn push_label(scene: &mut Scene, anchor: Point, text: &str, accent: Rgba, zoom: f64) {
    let width = text.chars().count() as f64 * LABEL_CHAR_WIDTH + LABEL_PADDING;
    scene.push(
        Layer::Labels,
        Shape::Rect {
            origin: Point::new(
                anchor.x + inverse_zoom_size(8.0, zoom),
                anchor.y - inverse_zoom_size(12.0, zoom),
            ),
            width: inverse_zoom_size(width, zoom),
            height: inverse_zoom_size(LABEL_HEIGHT, zoom),
            corner_radius: inverse_zoom_size(3.0, zoom),
        },
        Style::filled(CARD)
            .with_stroke(accent, inverse_zoom_size(0.5, zoom))
            .with_opacity(0.95),
    );
    scene.push(
        Layer::Labels,
        Shape::Text {
            origin: Point::new(
                anchor.x + inverse_zoom_size(16.0, zoom),
                anchor.y + inverse_zoom_size(2.0, zoom),
            ),
            content: text.to_string(),
            font_size: inverse_zoom_size(LABEL_FONT_SIZE, zoom),
        },
        Style::filled(FOREGROUND),
    );
}

// ===== LEGEND =====

fn render_legend(scene: &mut Scene) {
    let origin = Point::new(LEGEND_MARGIN_X, scene.height - LEGEND_MARGIN_BOTTOM);
    for (index, severity) in Severity::ALL.into_iter().enumerate() {
        let x = origin.x + index as f64 * LEGEND_SPACING;
        scene.push_screen(
            Layer::Legend,
            Shape::Circle {
                center: Point::new(x + 5.0, origin.y + 5.0),
                radius: 3.0,
            },
            Style::filled(severity.color()),
        );
        scene.push_screen(
            Layer::Legend,
            Shape::Text {
                origin: Point::new(x + 14.0, origin.y + 9.0),
                content: severity.legend_label().to_string(),
                font_size: 8.0,
            },
            Style::filled(MUTED),
        );
    }
}
