//! Retained drawing surface.
//!
//! Charts build a [`Scene`] from scratch on every draw. Nodes carry absolute
//! pixel coordinates, a class name (`"bar"`, `"link"`, ...) and optionally the
//! index of the datum they represent, so interaction code can find them again.

use serde::Serialize;

use super::color::Rgb;
use super::text::estimate_text_width_px;

/// Horizontal anchor of a text node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Anchor {
    #[default]
    Start,
    Middle,
    End,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Shape {
    Rect {
        x: f64,
        y: f64,
        w: f64,
        h: f64,
    },
    Circle {
        cx: f64,
        cy: f64,
        r: f64,
    },
    Line {
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        dashed: bool,
    },
    /// Open polyline; with a fill and `closed` it is a polygon.
    Path {
        points: Vec<(f64, f64)>,
        closed: bool,
    },
    /// Single line of text; `y` is the vertical middle of the line.
    Text {
        x: f64,
        y: f64,
        text: String,
        size: f64,
        anchor: Anchor,
        bold: bool,
    },
}

impl Shape {
    pub fn rect(x: f64, y: f64, w: f64, h: f64) -> Self {
        // Negative extents are normalized so hit testing stays simple.
        let (x, w) = if w < 0.0 { (x + w, -w) } else { (x, w) };
        let (y, h) = if h < 0.0 { (y + h, -h) } else { (y, h) };
        Shape::Rect { x, y, w, h }
    }

    pub fn circle(cx: f64, cy: f64, r: f64) -> Self {
        Shape::Circle { cx, cy, r: r.max(0.0) }
    }

    pub fn line(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Shape::Line {
            x1,
            y1,
            x2,
            y2,
            dashed: false,
        }
    }

    pub fn dashed(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Shape::Line {
            x1,
            y1,
            x2,
            y2,
            dashed: true,
        }
    }

    pub fn text(x: f64, y: f64, text: impl Into<String>, size: f64) -> Self {
        Shape::Text {
            x,
            y,
            text: text.into(),
            size,
            anchor: Anchor::Start,
            bold: false,
        }
    }

    /// Axis-aligned bounding box `(x0, y0, x1, y1)`.
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        match self {
            Shape::Rect { x, y, w, h } => (*x, *y, x + w, y + h),
            Shape::Circle { cx, cy, r } => (cx - r, cy - r, cx + r, cy + r),
            Shape::Line { x1, y1, x2, y2, .. } => (x1.min(*x2), y1.min(*y2), x1.max(*x2), y1.max(*y2)),
            Shape::Path { points, .. } => points.iter().fold(
                (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
                |(a, b, c, d), (x, y)| (a.min(*x), b.min(*y), c.max(*x), d.max(*y)),
            ),
            Shape::Text {
                x,
                y,
                text,
                size,
                anchor,
                ..
            } => {
                let w = estimate_text_width_px(text, *size);
                let x0 = match anchor {
                    Anchor::Start => *x,
                    Anchor::Middle => x - w / 2.0,
                    Anchor::End => x - w,
                };
                (x0, y - size / 2.0, x0 + w, y + size / 2.0)
            }
        }
    }
}

/// Paint attributes of a node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Paint {
    pub fill: Option<Rgb>,
    pub stroke: Option<Rgb>,
    pub stroke_width: f64,
    pub opacity: f64,
}

impl Default for Paint {
    fn default() -> Self {
        Self {
            fill: None,
            stroke: None,
            stroke_width: 1.0,
            opacity: 1.0,
        }
    }
}

impl Paint {
    pub fn fill(color: Rgb) -> Self {
        Self {
            fill: Some(color),
            ..Self::default()
        }
    }

    pub fn stroke(color: Rgb, width: f64) -> Self {
        Self {
            stroke: Some(color),
            stroke_width: width,
            ..Self::default()
        }
    }

    pub fn with_stroke(mut self, color: Rgb, width: f64) -> Self {
        self.stroke = Some(color);
        self.stroke_width = width;
        self
    }

    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub class: &'static str,
    /// Index of the datum the node represents, if any.
    pub datum: Option<usize>,
    /// Secondary grouping key (facet, series, destination node).
    pub group: Option<usize>,
    pub shape: Shape,
    pub paint: Paint,
    pub visible: bool,
    /// Whether the node reacts to the pointer.
    pub interactive: bool,
}

impl Node {
    pub fn new(class: &'static str, shape: Shape, paint: Paint) -> Self {
        Self {
            class,
            datum: None,
            group: None,
            shape,
            paint,
            visible: true,
            interactive: false,
        }
    }

    pub fn datum(mut self, idx: usize) -> Self {
        self.datum = Some(idx);
        self
    }

    pub fn group(mut self, idx: usize) -> Self {
        self.group = Some(idx);
        self
    }

    pub fn interactive(mut self) -> Self {
        self.interactive = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn anchor(mut self, a: Anchor) -> Self {
        if let Shape::Text { anchor, .. } = &mut self.shape {
            *anchor = a;
        }
        self
    }

    pub fn bold(mut self) -> Self {
        if let Shape::Text { bold, .. } = &mut self.shape {
            *bold = true;
        }
        self
    }

    /// Whether `(x, y)` lies on this node.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        match &self.shape {
            Shape::Rect { x: rx, y: ry, w, h } => x >= *rx && x <= rx + w && y >= *ry && y <= ry + h,
            Shape::Circle { cx, cy, r } => (x - cx).powi(2) + (y - cy).powi(2) <= r * r,
            Shape::Path { points, closed } if *closed => point_in_polygon(points, x, y),
            Shape::Path { points, .. } => {
                let tol = (self.paint.stroke_width / 2.0).max(2.0);
                points
                    .windows(2)
                    .any(|w| dist_to_segment((x, y), w[0], w[1]) <= tol)
            }
            Shape::Text { .. } => {
                let (x0, y0, x1, y1) = self.shape.bounds();
                x >= x0 && x <= x1 && y >= y0 && y <= y1
            }
            Shape::Line { .. } => false,
        }
    }
}

fn dist_to_segment(p: (f64, f64), a: (f64, f64), b: (f64, f64)) -> f64 {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let len2 = dx * dx + dy * dy;
    let t = if len2 == 0.0 {
        0.0
    } else {
        (((p.0 - a.0) * dx + (p.1 - a.1) * dy) / len2).clamp(0.0, 1.0)
    };
    let (qx, qy) = (a.0 + t * dx, a.1 + t * dy);
    ((p.0 - qx).powi(2) + (p.1 - qy).powi(2)).sqrt()
}

fn point_in_polygon(points: &[(f64, f64)], x: f64, y: f64) -> bool {
    let mut inside = false;
    let n = points.len();
    if n < 3 {
        return false;
    }
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = points[i];
        let (xj, yj) = points[j];
        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Index of a node inside its scene.
pub type NodeId = usize;

/// A full drawing: canvas size plus nodes in paint order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scene {
    pub width: f64,
    pub height: f64,
    pub background: Rgb,
    nodes: Vec<Node>,
}

impl Scene {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            background: Rgb::WHITE,
            nodes: Vec::new(),
        }
    }

    pub fn push(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes of one class, in paint order.
    pub fn by_class<'a>(&'a self, class: &'a str) -> impl Iterator<Item = &'a Node> + 'a {
        self.nodes.iter().filter(move |n| n.class == class)
    }

    pub fn ids_by_class(&self, class: &str) -> Vec<NodeId> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.class == class)
            .map(|(i, _)| i)
            .collect()
    }

    /// All text content, useful for assertions and exports.
    pub fn texts(&self) -> Vec<&str> {
        self.nodes
            .iter()
            .filter_map(|n| match &n.shape {
                Shape::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Topmost visible interactive node under `(x, y)`.
    pub fn hit_test(&self, x: f64, y: f64) -> Option<NodeId> {
        self.nodes
            .iter()
            .enumerate()
            .rev()
            .find(|(_, n)| n.visible && n.interactive && n.contains(x, y))
            .map(|(i, _)| i)
    }

    /// Set the opacity of every node of `class` matching `pred`.
    pub fn set_opacity<F>(&mut self, class: &str, opacity: f64, pred: F)
    where
        F: Fn(&Node) -> bool,
    {
        for n in self.nodes.iter_mut().filter(|n| n.class == class) {
            if pred(n) {
                n.paint.opacity = opacity;
            }
        }
    }

    pub fn set_visible<F>(&mut self, class: &str, visible: bool, pred: F)
    where
        F: Fn(&Node) -> bool,
    {
        for n in self.nodes.iter_mut().filter(|n| n.class == class) {
            if pred(n) {
                n.visible = visible;
            }
        }
    }

    /// Drop every node of `class`.
    pub fn remove_class(&mut self, class: &str) {
        self.nodes.retain(|n| n.class != class);
    }
}

pub const NO_DATA_TITLE: &str = "No matching data";
pub const NO_DATA_HINT: &str = "Try adding countries and regions to display data.";

/// Placeholder drawn instead of a chart when there is nothing to show.
pub fn no_data_scene(width: f64, height: f64) -> Scene {
    let mut scene = Scene::new(width, height);
    scene.push(Node::new(
        "placeholder",
        Shape::rect(0.0, 0.0, width, height),
        Paint::stroke(Rgb::GRID, 1.0),
    ));
    scene.push(
        Node::new(
            "placeholder-text",
            Shape::text(width / 2.0, height / 2.0 - 12.0, NO_DATA_TITLE, 18.0),
            Paint::fill(Rgb::BLACK),
        )
        .anchor(Anchor::Middle)
        .bold(),
    );
    scene.push(
        Node::new(
            "placeholder-text",
            Shape::text(width / 2.0, height / 2.0 + 14.0, NO_DATA_HINT, 14.0),
            Paint::fill(Rgb::new(0x6b, 0x72, 0x80)),
        )
        .anchor(Anchor::Middle),
    );
    scene
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_with_negative_extent_is_normalized() {
        assert_eq!(Shape::rect(10.0, 10.0, -5.0, 4.0), Shape::Rect { x: 5.0, y: 10.0, w: 5.0, h: 4.0 });
    }

    #[test]
    fn hit_test_prefers_topmost_interactive() {
        let mut s = Scene::new(100.0, 100.0);
        s.push(Node::new("bg", Shape::rect(0.0, 0.0, 100.0, 100.0), Paint::default()));
        let a = s.push(Node::new("bar", Shape::rect(0.0, 0.0, 50.0, 50.0), Paint::default()).interactive());
        let b = s.push(Node::new("bar", Shape::circle(20.0, 20.0, 5.0), Paint::default()).interactive());
        assert_eq!(s.hit_test(20.0, 20.0), Some(b));
        assert_eq!(s.hit_test(40.0, 40.0), Some(a));
        assert_eq!(s.hit_test(90.0, 90.0), None);
    }

    #[test]
    fn stroked_path_hit_uses_width() {
        let n = Node::new(
            "link",
            Shape::Path { points: vec![(0.0, 0.0), (100.0, 0.0)], closed: false },
            Paint::stroke(Rgb::BLACK, 20.0),
        );
        assert!(n.contains(50.0, 9.0));
        assert!(!n.contains(50.0, 11.0));
    }

    #[test]
    fn polygon_contains() {
        let n = Node::new(
            "area",
            Shape::Path { points: vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)], closed: true },
            Paint::fill(Rgb::BLACK),
        );
        assert!(n.contains(5.0, 5.0));
        assert!(!n.contains(15.0, 5.0));
    }

    #[test]
    fn placeholder_has_both_messages() {
        let s = no_data_scene(400.0, 300.0);
        assert_eq!(s.texts(), vec![NO_DATA_TITLE, NO_DATA_HINT]);
        assert_eq!(s.height, 300.0);
    }
}
