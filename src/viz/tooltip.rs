//! Tooltip placement and content.
//!
//! Placement is pure geometry recomputed on every pointer move: the tooltip
//! sits at a fixed offset from the cursor, relative to the chart container,
//! and the clamped variant flips to the opposite side of the cursor when it
//! would overflow the right or bottom edge.

use serde::Serialize;

use super::color::Rgb;
use super::scene::{Anchor, Node, Paint, Scene, Shape};
use super::text::estimate_text_width_px;

/// Cursor position in page coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Pointer {
    pub client_x: f64,
    pub client_y: f64,
}

impl Pointer {
    pub fn new(client_x: f64, client_y: f64) -> Self {
        Self { client_x, client_y }
    }

    /// Position relative to `container`'s top-left corner.
    pub fn local(&self, container: &ContainerRect) -> (f64, f64) {
        (self.client_x - container.left, self.client_y - container.top)
    }
}

/// Bounding box of the chart container in page coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ContainerRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl ContainerRect {
    pub fn at_origin(width: f64, height: f64) -> Self {
        Self {
            left: 0.0,
            top: 0.0,
            width,
            height,
        }
    }
}

/// Horizontal offset added to the cursor x, vertical offset subtracted from y.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Offsets {
    pub horizontal: f64,
    pub vertical: f64,
}

impl Offsets {
    pub const fn new(horizontal: f64, vertical: f64) -> Self {
        Self {
            horizontal,
            vertical,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TooltipPosition {
    pub x: f64,
    pub y: f64,
}

pub fn position_simple(pointer: Pointer, container: &ContainerRect, offsets: Offsets) -> TooltipPosition {
    TooltipPosition {
        x: pointer.client_x - container.left + offsets.horizontal,
        y: pointer.client_y - container.top - offsets.vertical,
    }
}

/// Like [`position_simple`], but flips to the left of the cursor when the
/// tooltip would cross `bounds.0`, and above it when it would cross `bounds.1`.
pub fn position_clamped(
    pointer: Pointer,
    container: &ContainerRect,
    offsets: Offsets,
    tooltip_size: (f64, f64),
    bounds: (f64, f64),
) -> TooltipPosition {
    let (tw, th) = tooltip_size;
    let mut pos = position_simple(pointer, container, offsets);
    if pos.x + tw > bounds.0 {
        pos.x = pointer.client_x - container.left - tw - offsets.horizontal;
    }
    if pos.y + th > bounds.1 {
        pos.y = pointer.client_y - container.top - th - offsets.vertical;
    }
    pos
}

/// One `label: value` line of a tooltip, with an optional color swatch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TooltipRow {
    pub label: String,
    pub value: String,
    pub swatch: Option<Rgb>,
}

impl TooltipRow {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            swatch: None,
        }
    }

    pub fn swatch(mut self, color: Rgb) -> Self {
        self.swatch = Some(color);
        self
    }

    pub fn line(&self) -> String {
        if self.label.is_empty() {
            self.value.clone()
        } else {
            format!("{}: {}", self.label, self.value)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TooltipContent {
    pub title: Option<String>,
    pub rows: Vec<TooltipRow>,
    /// Summary line such as a total, drawn below a separator.
    pub footer: Option<TooltipRow>,
}

const FONT_PX: f64 = 14.0;
const LINE_PX: f64 = 20.0;
const PAD_PX: f64 = 16.0;
const SWATCH_PX: f64 = 12.0;

impl TooltipContent {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn row(mut self, row: TooltipRow) -> Self {
        self.rows.push(row);
        self
    }

    pub fn footer(mut self, row: TooltipRow) -> Self {
        self.footer = Some(row);
        self
    }

    /// Every line of text, title first.
    pub fn lines(&self) -> Vec<String> {
        let mut out = Vec::new();
        if let Some(t) = &self.title {
            out.push(t.clone());
        }
        out.extend(self.rows.iter().map(TooltipRow::line));
        if let Some(f) = &self.footer {
            out.push(f.line());
        }
        out
    }

    fn has_swatches(&self) -> bool {
        self.rows.iter().any(|r| r.swatch.is_some())
    }

    /// Estimated rendered size `(w, h)` in pixels.
    pub fn size(&self) -> (f64, f64) {
        let lines = self.lines();
        let swatch = if self.has_swatches() { SWATCH_PX + 6.0 } else { 0.0 };
        let w = lines
            .iter()
            .map(|l| estimate_text_width_px(l, FONT_PX))
            .fold(0.0, f64::max);
        (w + swatch + PAD_PX * 2.0, lines.len() as f64 * LINE_PX + PAD_PX * 2.0)
    }
}

/// What the pointer is currently over.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoverTarget {
    pub class: &'static str,
    pub datum: Option<usize>,
    pub group: Option<usize>,
}

/// Transient tooltip state of a drawn chart.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TooltipState {
    pub hovered: Option<HoverTarget>,
    pub position: Option<TooltipPosition>,
    pub content: Option<TooltipContent>,
    pub border_color: Option<Rgb>,
}

impl TooltipState {
    pub fn is_visible(&self) -> bool {
        self.position.is_some() && self.content.is_some()
    }

    pub fn show(&mut self, hovered: HoverTarget, position: TooltipPosition, content: TooltipContent) {
        self.hovered = Some(hovered);
        self.position = Some(position);
        self.content = Some(content);
    }

    pub fn clear(&mut self) {
        *self = TooltipState::default();
    }

    /// Draw the tooltip box into `scene` (for static exports of a hovered state).
    pub fn overlay(&self, scene: &mut Scene) {
        let (Some(pos), Some(content)) = (self.position, self.content.as_ref()) else {
            return;
        };
        let (w, h) = content.size();
        let border = self.border_color.unwrap_or(Rgb::GRID);
        scene.push(Node::new(
            "tooltip",
            Shape::rect(pos.x, pos.y, w, h),
            Paint::fill(Rgb::WHITE).with_stroke(border, 1.0),
        ));
        let mut y = pos.y + PAD_PX + LINE_PX / 2.0;
        let x = pos.x + PAD_PX;
        if let Some(title) = &content.title {
            scene.push(Node::new("tooltip", Shape::text(x, y, title.clone(), FONT_PX), Paint::fill(Rgb::BLACK)).bold());
            y += LINE_PX;
        }
        let text_x = if content.has_swatches() { x + SWATCH_PX + 6.0 } else { x };
        for row in &content.rows {
            if let Some(c) = row.swatch {
                scene.push(Node::new(
                    "tooltip",
                    Shape::rect(x, y - SWATCH_PX / 2.0, SWATCH_PX, SWATCH_PX),
                    Paint::fill(c),
                ));
            }
            scene.push(Node::new("tooltip", Shape::text(text_x, y, row.line(), FONT_PX), Paint::fill(Rgb::BLACK)));
            y += LINE_PX;
        }
        if let Some(f) = &content.footer {
            scene.push(Node::new(
                "tooltip",
                Shape::line(x, y - LINE_PX / 2.0, pos.x + w - PAD_PX, y - LINE_PX / 2.0),
                Paint::stroke(Rgb::GRID, 1.0),
            ));
            scene.push(
                Node::new("tooltip", Shape::text(x, y, f.line(), FONT_PX), Paint::fill(Rgb::BLACK))
                    .anchor(Anchor::Start)
                    .bold(),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_position_offsets_from_cursor() {
        let c = ContainerRect { left: 100.0, top: 50.0, width: 400.0, height: 300.0 };
        let p = position_simple(Pointer::new(300.0, 200.0), &c, Offsets::new(25.0, 60.0));
        assert_eq!(p, TooltipPosition { x: 225.0, y: 90.0 });
    }

    #[test]
    fn clamped_position_flips_right_and_bottom() {
        let c = ContainerRect::at_origin(500.0, 400.0);
        let off = Offsets::new(10.0, 10.0);
        let p = position_clamped(Pointer::new(100.0, 100.0), &c, off, (120.0, 80.0), (500.0, 400.0));
        assert_eq!(p, TooltipPosition { x: 110.0, y: 90.0 });
        let p = position_clamped(Pointer::new(450.0, 380.0), &c, off, (120.0, 80.0), (500.0, 400.0));
        assert_eq!(p, TooltipPosition { x: 320.0, y: 290.0 });
    }

    #[test]
    fn content_lines_and_size() {
        let t = TooltipContent::titled("2021")
            .row(TooltipRow::new("Italy", "12.00%").swatch(Rgb::BLACK))
            .footer(TooltipRow::new("Total", "12.00%"));
        assert_eq!(t.lines(), vec!["2021", "Italy: 12.00%", "Total: 12.00%"]);
        let (w, h) = t.size();
        assert!(w > estimate_text_width_px("Italy: 12.00%", FONT_PX));
        assert_eq!(h, 3.0 * LINE_PX + 2.0 * PAD_PX);
    }

    #[test]
    fn overlay_draws_nothing_when_hidden() {
        let mut s = Scene::new(10.0, 10.0);
        TooltipState::default().overlay(&mut s);
        assert!(s.is_empty());
    }
}
