//! SVG serialization of a [`Scene`]
//!
//! Map-space objects go into one group carrying the zoom transform, the rest
//! are written after it in screen coordinates.

use super::scene::{Rgba, Scene, SceneObject, Shape, Space, Style};
use std::fmt::{self, Write};

const BACKGROUND: &str = "rgb(2,6,23)";

pub fn to_svg(scene: &Scene) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write_svg(scene, &mut out);
    out
}

pub fn write_svg(scene: &Scene, out: &mut impl Write) -> fmt::Result {
    writeln!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = num(scene.width),
        h = num(scene.height),
    )?;
    writeln!(out, r#"<rect width="100%" height="100%" fill="{BACKGROUND}"/>"#)?;

    let transform = scene.transform;
    writeln!(
        out,
        r#"<g transform="translate({} {}) scale({})">"#,
        num(transform.translate_x),
        num(transform.translate_y),
        num(transform.scale),
    )?;
    let ordered = scene.objects();
    for object in ordered.iter().filter(|object| object.space == Space::Map) {
        write_object(out, object)?;
    }
    writeln!(out, "</g>")?;
    for object in ordered.iter().filter(|object| object.space == Space::Screen) {
        write_object(out, object)?;
    }
    writeln!(out, "</svg>")
}

fn write_object(out: &mut impl Write, object: &SceneObject) -> fmt::Result {
    match &object.shape {
        Shape::Circle { center, radius } => {
            write!(
                out,
                r#"<circle cx="{}" cy="{}" r="{}""#,
                num(center.x),
                num(center.y),
                num(*radius)
            )?;
            write_style(out, &object.style)?;
            writeln!(out, "/>")
        }
        Shape::Polyline { points, closed } => {
            let tag = if *closed { "polygon" } else { "polyline" };
            write!(out, r#"<{tag} points=""#)?;
            for (index, point) in points.iter().enumerate() {
                if index > 0 {
                    out.write_char(' ')?;
                }
                write!(out, "{},{}", num(point.x), num(point.y))?;
            }
            out.write_char('"')?;
            write_style(out, &object.style)?;
            writeln!(out, "/>")
        }
        Shape::Rect {
            origin,
            width,
            height,
            corner_radius,
        } => {
            write!(
                out,
                r#"<rect x="{}" y="{}" width="{}" height="{}""#,
                num(origin.x),
                num(origin.y),
                num(*width),
                num(*height)
            )?;
            if *corner_radius > 0.0 {
                write!(out, r#" rx="{}""#, num(*corner_radius))?;
            }
            write_style(out, &object.style)?;
            writeln!(out, "/>")
        }
        Shape::Text {
            origin,
            content,
            font_size,
        } => {
            write!(
                out,
                r#"<text x="{}" y="{}" font-size="{}" font-family="monospace""#,
                num(origin.x),
                num(origin.y),
                num(*font_size)
            )?;
            write_style(out, &object.style)?;
            writeln!(out, ">{}</text>", escape(content))
        }
    }
}

fn write_style(out: &mut impl Write, style: &Style) -> fmt::Result {
    match style.fill {
        Some(color) => write_paint(out, "fill", color)?,
        None => write!(out, r#" fill="none""#)?,
    }
    if let Some(color) = style.stroke {
        write_paint(out, "stroke", color)?;
        write!(out, r#" stroke-width="{}""#, num(style.stroke_width))?;
    }
    if let Some(dash) = style.dash {
        write!(
            out,
            r#" stroke-dasharray="{} {}" stroke-dashoffset="{}""#,
            num(dash.length),
            num(dash.gap),
            num(dash.offset)
        )?;
    }
    if style.opacity < 1.0 {
        write!(out, r#" opacity="{}""#, num(style.opacity))?;
    }
    Ok(())
}

fn write_paint(out: &mut impl Write, attribute: &str, (r, g, b, alpha): Rgba) -> fmt::Result {
    write!(out, r#" {attribute}="rgb({r},{g},{b})""#)?;
    if alpha < 1.0 {
        write!(out, r#" {attribute}-opacity="{}""#, num(f64::from(alpha)))?;
    }
    Ok(())
}

/// Compact number formatting: at most three decimals, no trailing zeros.
fn num(value: f64) -> String {
    let mut text = format!("{value:.3}");
    if text.contains('.') {
        let trimmed = text.trim_end_matches('0').trim_end_matches('.').len();
        text.truncate(trimmed);
    }
    if text == "-0" {
        text = "0".to_string();
    }
    text
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for character in text.chars() {
        match character {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(character),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::{Point, ZoomTransform};
    use crate::visualizer::scene::{Dash, Layer};

    fn scene() -> Scene {
        let mut scene = Scene::new(
            1000.0,
            500.0,
            ZoomTransform {
                translate_x: -250.0,
                translate_y: -125.5,
                scale: 1.5,
            },
        );
        scene.push_screen(
            Layer::Legend,
            Shape::Text {
                origin: Point::new(44.0, 439.0),
                content: "HIGH".to_string(),
                font_size: 8.0,
            },
            Style::filled((148, 163, 184, 1.0)),
        );
        scene.push(
            Layer::Links,
            Shape::Polyline {
                points: vec![Point::new(0.0, 0.0), Point::new(10.25, 20.0)],
                closed: false,
            },
            Style::stroked((34, 211, 238, 0.4), 1.0).with_dash(Dash {
                length: 4.0,
                gap: 4.0,
                offset: -14.0,
            }),
        );
        scene.push(
            Layer::Labels,
            Shape::Text {
                origin: Point::new(1.0, 2.0),
                content: "Israel <> Iran & \"proxies\"".to_string(),
                font_size: 10.0,
            },
            Style::default(),
        );
        scene
    }

    #[test]
    fn map_objects_are_inside_the_zoom_group() {
        let svg = to_svg(&scene());
        let group_start = svg.find(r#"<g transform="translate(-250 -125.5) scale(1.5)">"#).unwrap();
        let group_end = svg.find("</g>").unwrap();
        let polyline = svg.find("<polyline").unwrap();
        let legend = svg.find(">HIGH<").unwrap();

        assert!(group_start < polyline && polyline < group_end);
        assert!(legend > group_end);
        assert!(svg.ends_with("</svg>\n"));
    }

    #[test]
    fn writes_dash_and_stroke_alpha() {
        let svg = to_svg(&scene());
        assert!(svg.contains(r#"points="0,0 10.25,20""#));
        assert!(svg.contains(r#"stroke="rgb(34,211,238)" stroke-opacity="0.4" stroke-width="1""#));
        assert!(svg.contains(r#"stroke-dasharray="4 4" stroke-dashoffset="-14""#));
    }

    #[test]
    fn escapes_label_text() {
        let svg = to_svg(&scene());
        assert!(svg.contains("Israel &lt;&gt; Iran &amp; &quot;proxies&quot;</text>"));
    }

    #[test]
    fn number_formatting() {
        assert_eq!(num(3.0), "3");
        assert_eq!(num(0.1 + 0.2), "0.3");
        assert_eq!(num(-0.0001), "0");
        assert_eq!(num(12.3456), "12.346");
    }
}
