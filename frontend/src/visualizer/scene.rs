//! Retained display list
//!
//! A [`Scene`] is what one render pass produces: shapes in z-ordered layers,
//! each optionally tagged with the entity it stands for. Map-space shapes sit
//! inside the zoom group; screen-space shapes (the legend) do not.

use super::hover::EntityRef;
use crate::geo::{Point, ZoomTransform};

/// `(r, g, b, alpha)`
pub type Rgba = (u8, u8, u8, f32);

/// Extra screen pixels around a shape that still count as a hit.
const HIT_SLOP: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Layer {
    Basemap,
    Links,
    Zones,
    Thermal,
    Aircraft,
    Vessels,
    Labels,
    Legend,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Space {
    Map,
    Screen,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Circle {
        center: Point,
        radius: f64,
    },
    Polyline {
        points: Vec<Point>,
        closed: bool,
    },
    Rect {
        origin: Point,
        width: f64,
        height: f64,
        corner_radius: f64,
    },
    Text {
        origin: Point,
        content: String,
        font_size: f64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dash {
    pub length: f64,
    pub gap: f64,
    pub offset: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Style {
    pub fill: Option<Rgba>,
    pub stroke: Option<Rgba>,
    pub stroke_width: f64,
    pub opacity: f64,
    pub dash: Option<Dash>,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            fill: None,
            stroke: None,
            stroke_width: 1.0,
            opacity: 1.0,
            dash: None,
        }
    }
}

impl Style {
    pub fn filled(color: Rgba) -> Self {
        Self {
            fill: Some(color),
            ..Self::default()
        }
    }

    pub fn stroked(color: Rgba, width: f64) -> Self {
        Self {
            stroke: Some(color),
            stroke_width: width,
            ..Self::default()
        }
    }

    pub fn with_stroke(mut self, color: Rgba, width: f64) -> Self {
        self.stroke = Some(color);
        self.stroke_width = width;
        self
    }

    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity;
        self
    }

    pub fn with_dash(mut self, dash: Dash) -> Self {
        self.dash = Some(dash);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneObject {
    pub layer: Layer,
    pub space: Space,
    pub shape: Shape,
    pub style: Style,
    pub hit: Option<EntityRef>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub width: f64,
    pub height: f64,
    pub transform: ZoomTransform,
    objects: Vec<SceneObject>,
}

impl Scene {
    pub fn new(width: f64, height: f64, transform: ZoomTransform) -> Self {
        Self {
            width,
            height,
            transform,
            objects: Vec::new(),
        }
    }

    pub fn push(&mut self, layer: Layer, shape: Shape, style: Style) {
        self.push_object(SceneObject {
            layer,
            space: Space::Map,
            shape,
            style,
            hit: None,
        });
    }

    pub fn push_interactive(&mut self, layer: Layer, shape: Shape, style: Style, hit: EntityRef) {
        self.push_object(SceneObject {
            layer,
            space: Space::Map,
            shape,
            style,
            hit: Some(hit),
        });
    }

    pub fn push_screen(&mut self, layer: Layer, shape: Shape, style: Style) {
        self.push_object(SceneObject {
            layer,
            space: Space::Screen,
            shape,
            style,
            hit: None,
        });
    }

    pub fn push_object(&mut self, object: SceneObject) {
        self.objects.push(object);
    }

    /// Objects in paint order: by layer, then insertion order.
    pub fn objects(&self) -> Vec<&SceneObject> {
        let mut ordered: Vec<&SceneObject> = self.objects.iter().collect();
        ordered.sort_by_key(|object| object.layer);
        ordered
    }

    pub fn layer(&self, layer: Layer) -> impl Iterator<Item = &SceneObject> {
        self.objects.iter().filter(move |object| object.layer == layer)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Text of every label currently drawn in the tooltip layer.
    pub fn tooltips(&self) -> Vec<&str> {
        self.layer(Layer::Labels)
            .filter_map(|object| match &object.shape {
                Shape::Text { content, .. } => Some(content.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Topmost interactive entity under a screen position.
    pub fn hit_test(&self, screen: Point) -> Option<&EntityRef> {
        let map_point = self.transform.invert(screen);
        let map_slop = HIT_SLOP / self.transform.scale;
        self.objects()
            .into_iter()
            .rev()
            .filter(|object| object.hit.is_some())
            .find(|object| match object.space {
                Space::Map => shape_contains(&object.shape, map_point, map_slop),
                Space::Screen => shape_contains(&object.shape, screen, HIT_SLOP),
            })
            .and_then(|object| object.hit.as_ref())
    }
}

fn shape_contains(shape: &Shape, point: Point, slop: f64) -> bool {
    match shape {
        Shape::Circle { center, radius } => center.distance(point) <= radius + slop,
        Shape::Rect {
            origin,
            width,
            height,
            ..
        } => {
            point.x >= origin.x - slop
                && point.x <= origin.x + width + slop
                && point.y >= origin.y - slop
                && point.y <= origin.y + height + slop
        }
        Shape::Polyline { points, closed } => {
            (*closed && polygon_contains(points, point))
                || segments(points, *closed).any(|(a, b)| distance_to_segment(point, a, b) <= slop)
        }
        Shape::Text { .. } => false,
    }
}

fn segments(points: &[Point], closed: bool) -> impl Iterator<Item = (Point, Point)> + '_ {
    let closing = if closed && points.len() > 2 {
        points.last().copied().zip(points.first().copied())
    } else {
        None
    };
    points
        .windows(2)
        .map(|pair| (pair[0], pair[1]))
        .chain(closing)
}

fn polygon_contains(points: &[Point], point: Point) -> bool {
    let mut inside = false;
    let mut previous = match points.last() {
        Some(last) => *last,
        None => return false,
    };
    for &current in points {
        if (current.y > point.y) != (previous.y > point.y) {
            let crossing =
                (previous.x - current.x) * (point.y - current.y) / (previous.y - current.y) + current.x;
            if point.x < crossing {
                inside = !inside;
            }
        }
        previous = current;
    }
    inside
}

fn distance_to_segment(point: Point, a: Point, b: Point) -> f64 {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let length_squared = dx * dx + dy * dy;
    if length_squared == 0.0 {
        return point.distance(a);
    }
    let t = (((point.x - a.x) * dx + (point.y - a.y) * dy) / length_squared).clamp(0.0, 1.0);
    point.distance(Point::new(a.x + t * dx, a.y + t * dy))
}
