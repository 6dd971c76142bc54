//! Plot frame and axis drawing shared by the cartesian charts.

use super::color::Rgb;
use super::scale::{BandScale, LinearScale, Scale};
use super::scene::{Anchor, Node, Paint, Scene, Shape};
use super::text::truncate_to_width;
use super::types::Margin;

pub const TICK_FONT_PX: f64 = 12.0;
const TICK_LEN: f64 = 6.0;
const AXIS_COLOR: Rgb = Rgb::new(0x33, 0x33, 0x33);

/// Outer canvas size, margins, and the inner plot area they leave.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub width: f64,
    pub height: f64,
    pub margin: Margin,
}

impl Frame {
    pub fn new(width: f64, height: f64, margin: Margin) -> Self {
        Self {
            width,
            height,
            margin,
        }
    }

    pub fn inner_width(&self) -> f64 {
        (self.width - self.margin.left - self.margin.right).max(0.0)
    }

    pub fn inner_height(&self) -> f64 {
        (self.height - self.margin.top - self.margin.bottom).max(0.0)
    }

    /// Inner x to canvas x.
    pub fn x(&self, px: f64) -> f64 {
        self.margin.left + px
    }

    /// Inner y to canvas y.
    pub fn y(&self, py: f64) -> f64 {
        self.margin.top + py
    }

    /// Canvas point to inner coordinates.
    pub fn to_inner(&self, x: f64, y: f64) -> (f64, f64) {
        (x - self.margin.left, y - self.margin.top)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Bottom,
    Left,
}

/// Draw an axis for `scale` along one side of `frame`.
pub fn draw_axis<F>(scene: &mut Scene, frame: &Frame, scale: &Scale, side: Side, ticks: usize, fmt: F)
where
    F: Fn(f64) -> String,
{
    match scale {
        Scale::Band(b) => draw_band_axis(scene, frame, b, side),
        Scale::Linear(l) => draw_linear_axis(scene, frame, l, side, ticks, fmt),
    }
}

fn axis_origin(frame: &Frame, side: Side) -> (f64, f64) {
    match side {
        Side::Bottom => (frame.margin.left, frame.margin.top + frame.inner_height()),
        Side::Left => (frame.margin.left, frame.margin.top),
    }
}

fn draw_domain(scene: &mut Scene, frame: &Frame, side: Side, range: (f64, f64)) {
    let (ox, oy) = axis_origin(frame, side);
    let shape = match side {
        Side::Bottom => Shape::line(ox + range.0, oy, ox + range.1, oy),
        Side::Left => Shape::line(ox, oy + range.0, ox, oy + range.1),
    };
    scene.push(Node::new("axis", shape, Paint::stroke(AXIS_COLOR, 1.0)));
}

fn draw_tick(scene: &mut Scene, frame: &Frame, side: Side, at: f64, label: String) {
    let (ox, oy) = axis_origin(frame, side);
    let (mark, text) = match side {
        Side::Bottom => (
            Shape::line(ox + at, oy, ox + at, oy + TICK_LEN),
            Node::new("tick", Shape::text(ox + at, oy + TICK_LEN + 9.0, label, TICK_FONT_PX), Paint::fill(AXIS_COLOR))
                .anchor(Anchor::Middle),
        ),
        Side::Left => (
            Shape::line(ox - TICK_LEN, oy + at, ox, oy + at),
            Node::new("tick", Shape::text(ox - TICK_LEN - 3.0, oy + at, label, TICK_FONT_PX), Paint::fill(AXIS_COLOR))
                .anchor(Anchor::End),
        ),
    };
    scene.push(Node::new("axis", mark, Paint::stroke(AXIS_COLOR, 1.0)));
    scene.push(text);
}

pub fn draw_band_axis(scene: &mut Scene, frame: &Frame, band: &BandScale, side: Side) {
    draw_domain(scene, frame, side, band.range());
    let max_px = match side {
        Side::Bottom => band.step().max(TICK_FONT_PX * 2.0),
        Side::Left => (frame.margin.left - TICK_LEN - 4.0).max(TICK_FONT_PX * 2.0),
    };
    for (i, cat) in band.domain().iter().enumerate() {
        let at = band.position_at(i) + band.bandwidth() / 2.0;
        draw_tick(scene, frame, side, at, truncate_to_width(cat, TICK_FONT_PX, max_px));
    }
}

pub fn draw_linear_axis<F>(scene: &mut Scene, frame: &Frame, scale: &LinearScale, side: Side, ticks: usize, fmt: F)
where
    F: Fn(f64) -> String,
{
    draw_domain(scene, frame, side, scale.range());
    for t in scale.ticks(ticks) {
        draw_tick(scene, frame, side, scale.scale(t), fmt(t));
    }
}

/// Axis title centered along `side`.
pub fn draw_axis_title(scene: &mut Scene, frame: &Frame, side: Side, text: &str) {
    if text.is_empty() {
        return;
    }
    let node = match side {
        Side::Bottom => Node::new(
            "axis-title",
            Shape::text(
                frame.margin.left + frame.inner_width() / 2.0,
                frame.height - 6.0,
                text,
                TICK_FONT_PX,
            ),
            Paint::fill(AXIS_COLOR),
        ),
        Side::Left => Node::new(
            "axis-title",
            Shape::text(frame.margin.left, frame.margin.top.max(TICK_FONT_PX) - 8.0, text, TICK_FONT_PX),
            Paint::fill(AXIS_COLOR),
        ),
    };
    scene.push(node.anchor(Anchor::Middle));
}

/// Dashed horizontal grid lines at the ticks of a vertical value scale,
/// skipping the one on the domain start.
pub fn draw_grid(scene: &mut Scene, frame: &Frame, scale: &LinearScale, ticks: usize) {
    let d0 = scale.domain().0;
    for t in scale.ticks(ticks).into_iter().filter(|t| *t != d0) {
        let y = frame.y(scale.scale(t));
        scene.push(Node::new(
            "grid-line",
            Shape::dashed(frame.x(0.0), y, frame.x(frame.inner_width()), y),
            Paint::stroke(Rgb::GRID, 1.0),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_inner_area() {
        let f = Frame::new(400.0, 300.0, Margin::new(20.0, 0.0, 30.0, 30.0));
        assert_eq!(f.inner_width(), 370.0);
        assert_eq!(f.inner_height(), 250.0);
        assert_eq!(f.y(250.0), 270.0);
        assert_eq!(f.to_inner(30.0, 20.0), (0.0, 0.0));
    }

    #[test]
    fn band_axis_labels_every_category() {
        let f = Frame::new(400.0, 300.0, Margin::new(20.0, 0.0, 40.0, 30.0));
        let b = BandScale::new(["A", "B", "C"], (0.0, f.inner_width())).padding(0.2);
        let mut s = Scene::new(400.0, 300.0);
        draw_band_axis(&mut s, &f, &b, Side::Bottom);
        let labels: Vec<&str> = s.by_class("tick").filter_map(|n| match &n.shape {
            Shape::Text { text, .. } => Some(text.as_str()),
            _ => None,
        }).collect();
        assert_eq!(labels, vec!["A", "B", "C"]);
    }
}
