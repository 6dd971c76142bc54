//! Paint a [`Scene`] onto any plotters drawing area.

use anyhow::{Result, anyhow};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::FontFamily;
use plotters::style::text_anchor::{HPos, Pos, VPos};

use super::scene::{Anchor, Node, Paint, Scene, Shape};

const DASH_PX: f64 = 4.0;
const GAP_PX: f64 = 4.0;

fn px(v: f64) -> i32 {
    v.round() as i32
}

fn pt((x, y): (f64, f64)) -> (i32, i32) {
    (px(x), px(y))
}

fn fill_style(paint: &Paint) -> Option<ShapeStyle> {
    paint.fill.map(|c| c.to_plotters(paint.opacity).filled())
}

fn stroke_style(paint: &Paint) -> Option<ShapeStyle> {
    paint
        .stroke
        .map(|c| c.to_plotters(paint.opacity).stroke_width(paint.stroke_width.round().max(1.0) as u32))
}

/// Split a segment into dash pieces.
fn dashes(a: (f64, f64), b: (f64, f64)) -> Vec<[(f64, f64); 2]> {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let len = (dx * dx + dy * dy).sqrt();
    if len == 0.0 {
        return Vec::new();
    }
    let (ux, uy) = (dx / len, dy / len);
    let mut out = Vec::new();
    let mut t = 0.0;
    while t < len {
        let e = (t + DASH_PX).min(len);
        out.push([(a.0 + ux * t, a.1 + uy * t), (a.0 + ux * e, a.1 + uy * e)]);
        t = e + GAP_PX;
    }
    out
}

fn draw_node<DB: DrawingBackend>(root: &DrawingArea<DB, Shift>, node: &Node) -> Result<()> {
    let paint = &node.paint;
    match &node.shape {
        Shape::Rect { x, y, w, h } => {
            let corners = [pt((*x, *y)), pt((x + w, y + h))];
            if let Some(s) = fill_style(paint) {
                root.draw(&Rectangle::new(corners, s)).map_err(|e| anyhow!("{:?}", e))?;
            }
            if let Some(s) = stroke_style(paint) {
                root.draw(&Rectangle::new(corners, s)).map_err(|e| anyhow!("{:?}", e))?;
            }
        }
        Shape::Circle { cx, cy, r } => {
            let center = pt((*cx, *cy));
            let r = r.round().max(0.0) as u32;
            if let Some(s) = fill_style(paint) {
                root.draw(&Circle::new(center, r, s)).map_err(|e| anyhow!("{:?}", e))?;
            }
            if let Some(s) = stroke_style(paint) {
                root.draw(&Circle::new(center, r, s)).map_err(|e| anyhow!("{:?}", e))?;
            }
        }
        Shape::Line { x1, y1, x2, y2, dashed } => {
            let Some(s) = stroke_style(paint) else {
                return Ok(());
            };
            let pieces = if *dashed {
                dashes((*x1, *y1), (*x2, *y2))
            } else {
                vec![[(*x1, *y1), (*x2, *y2)]]
            };
            for [a, b] in pieces {
                root.draw(&PathElement::new(vec![pt(a), pt(b)], s))
                    .map_err(|e| anyhow!("{:?}", e))?;
            }
        }
        Shape::Path { points, closed } => {
            let pts: Vec<(i32, i32)> = points.iter().copied().map(pt).collect();
            if *closed && let Some(s) = fill_style(paint) {
                root.draw(&Polygon::new(pts.clone(), s)).map_err(|e| anyhow!("{:?}", e))?;
            }
            if let Some(s) = stroke_style(paint) {
                let mut line = pts;
                if *closed && let Some(first) = line.first().copied() {
                    line.push(first);
                }
                root.draw(&PathElement::new(line, s)).map_err(|e| anyhow!("{:?}", e))?;
            }
        }
        Shape::Text {
            x,
            y,
            text,
            size,
            anchor,
            ..
        } => {
            if text.is_empty() {
                return Ok(());
            }
            let h = match anchor {
                Anchor::Start => HPos::Left,
                Anchor::Middle => HPos::Center,
                Anchor::End => HPos::Right,
            };
            let color = paint.fill.unwrap_or(super::color::Rgb::BLACK).to_plotters(paint.opacity);
            // Only the regular face is registered for the ab_glyph path, so bold
            // text is drawn with it too.
            let style = TextStyle::from((FontFamily::SansSerif, *size))
                .pos(Pos::new(h, VPos::Center))
                .color(&color);
            root.draw(&Text::new(text.as_str(), pt((*x, *y)), style))
                .map_err(|e| anyhow!("{:?}", e))?;
        }
    }
    Ok(())
}

/// Fill the background, then paint every visible node in order.
pub fn draw_scene<DB: DrawingBackend>(root: &DrawingArea<DB, Shift>, scene: &Scene) -> Result<()> {
    root.fill(&scene.background.to_plotters(1.0))
        .map_err(|e| anyhow!("{:?}", e))?;
    for node in scene.nodes().iter().filter(|n| n.visible) {
        draw_node(root, node)?;
    }
    root.present().map_err(|e| anyhow!("{:?}", e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dashes_cover_segment_with_gaps() {
        let d = dashes((0.0, 0.0), (20.0, 0.0));
        assert_eq!(d.len(), 3);
        assert_eq!(d[0], [(0.0, 0.0), (4.0, 0.0)]);
        assert_eq!(d[2], [(16.0, 0.0), (20.0, 0.0)]);
    }
}
