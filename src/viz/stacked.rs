//! Stacked bar chart, optionally normalized so each bar spans [0, 1].

use serde::Serialize;

use super::axis::{Frame, Side, draw_axis};
use super::bar::BAND_PADDING;
use super::color::{OrdinalColors, Rgb};
use super::error::ChartError;
use super::scale::AxisPair;
use super::scene::{Anchor, Node, NodeId, Paint, Scene, Shape, no_data_scene};
use super::tooltip::{
    ContainerRect, HoverTarget, Offsets, Pointer, TooltipContent, TooltipRow, TooltipState,
    position_simple,
};
use super::types::{ChartConfig, Margin, Orientation, Rendered, TooltipMapper};
use super::util::{format_fixed, format_tick};
use super::{Chart, highlight};
use crate::models::StackedEntity;

const OFFSETS: Offsets = Offsets::new(10.0, 65.0);
const RESTING: f64 = 0.95;
const DIMMED: f64 = 0.25;
/// 1.2rem
const LABEL_FONT_PX: f64 = 19.2;

/// A declared category and its fill.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySpec {
    pub name: String,
    pub color: Rgb,
}

impl CategorySpec {
    pub fn new(name: impl Into<String>, color: Rgb) -> Self {
        Self {
            name: name.into(),
            color,
        }
    }
}

/// One stacked section in value space. In percentage mode `start`/`end` are
/// fractions of the entity's total.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StackSegment {
    pub entity: String,
    pub category: String,
    pub start: f64,
    pub end: f64,
}

#[derive(Clone, Default)]
pub struct StackedOptions {
    pub config: ChartConfig,
    pub percentage: bool,
    pub tooltip: Option<TooltipMapper<StackSegment>>,
}

pub struct StackedBarChart {
    scene: Scene,
    tooltip: TooltipState,
    segments: Vec<StackSegment>,
    axes: AxisPair,
    frame: Frame,
    colors: OrdinalColors,
    options: StackedOptions,
}

pub fn default_margin(orientation: Orientation) -> Margin {
    let right = if orientation.is_vertical() { 60.0 } else { 10.0 };
    Margin::new(50.0, right, 40.0, 100.0)
}

fn validate(data: &[StackedEntity], categories: &[CategorySpec]) -> Result<(), ChartError> {
    for e in data {
        if let Some(c) = categories.iter().find(|c| !e.values.contains_key(&c.name)) {
            return Err(ChartError::MissingCategory {
                entity: e.entity.clone(),
                category: c.name.clone(),
            });
        }
    }
    Ok(())
}

/// Cumulative `[start, end)` sections per entity, in category order. With
/// `percentage` each entity is divided by its own total.
pub fn stack(data: &[StackedEntity], categories: &[CategorySpec], percentage: bool) -> Vec<StackSegment> {
    let mut out = Vec::with_capacity(data.len() * categories.len());
    for e in data {
        let total: f64 = categories.iter().map(|c| e.values.get(&c.name).copied().unwrap_or(0.0)).sum();
        let mut acc = 0.0;
        for c in categories {
            let raw = e.values.get(&c.name).copied().unwrap_or(0.0);
            let v = match (percentage, total == 0.0) {
                (true, true) => 0.0,
                (true, false) => raw / total,
                (false, _) => raw,
            };
            out.push(StackSegment {
                entity: e.entity.clone(),
                category: c.name.clone(),
                start: acc,
                end: acc + v,
            });
            acc += v;
        }
    }
    out
}

pub fn draw(
    data: &[StackedEntity],
    categories: &[CategorySpec],
    options: &StackedOptions,
) -> Result<Rendered<StackedBarChart>, ChartError> {
    validate(data, categories)?;
    let cfg = &options.config;
    if data.is_empty() || categories.is_empty() {
        return Ok(Rendered::NoData(no_data_scene(cfg.width, cfg.height)));
    }

    let percentage = options.percentage;
    let unit = match (&cfg.unit, percentage) {
        (Some(u), _) => u.clone(),
        (None, true) => "%".to_string(),
        (None, false) => String::new(),
    };
    let frame = Frame::new(cfg.width, cfg.height, cfg.margin.resolve(default_margin(cfg.orientation)));
    let segments = stack(data, categories, percentage);
    let max_total = segments.iter().map(|s| s.end).fold(0.0, f64::max);
    let domain = if percentage { (0.0, 1.0) } else { (0.0, max_total) };
    let axes = AxisPair::build(
        cfg.orientation,
        data.iter().map(|e| e.entity.clone()),
        domain,
        frame.inner_width(),
        frame.inner_height(),
        BAND_PADDING,
        false,
    );
    let colors = OrdinalColors::new(
        categories.iter().map(|c| c.name.clone()),
        categories.iter().map(|c| c.color).collect(),
    );

    let mut scene = Scene::new(cfg.width, cfg.height);
    for (i, s) in segments.iter().enumerate() {
        let Some(pos) = axes.band.position(&s.entity) else {
            continue;
        };
        let (x, y, w, h) = axes.span_rect(pos, axes.band.bandwidth(), s.start, s.end);
        scene.push(
            Node::new(
                "bar",
                Shape::rect(frame.x(x), frame.y(y), w, h),
                Paint::fill(colors.get(&s.category)).with_opacity(RESTING),
            )
            .datum(i)
            .interactive(),
        );
    }

    let (xs, ys) = axes.xy();
    let tick = |v: f64| {
        let shown = if percentage { v * 100.0 } else { v };
        format_tick(shown, "", &unit, &cfg.locale)
    };
    draw_axis(&mut scene, &frame, &xs, Side::Bottom, 5, tick);
    draw_axis(&mut scene, &frame, &ys, Side::Left, 5, tick);
    draw_category_labels(&mut scene, &frame, &axes, &segments, categories, &colors);

    let mut options = options.clone();
    options.config.unit = Some(unit);
    Ok(Rendered::Chart(StackedBarChart {
        scene,
        tooltip: TooltipState::default(),
        segments,
        axes,
        frame,
        colors,
        options,
    }))
}

/// Category names placed at the mean midpoint of their sections.
fn draw_category_labels(
    scene: &mut Scene,
    frame: &Frame,
    axes: &AxisPair,
    segments: &[StackSegment],
    categories: &[CategorySpec],
    colors: &OrdinalColors,
) {
    let vertical = axes.orientation.is_vertical();
    for c in categories {
        let mids: Vec<f64> = segments
            .iter()
            .filter(|s| s.category == c.name)
            .map(|s| axes.value.scale((s.start + s.end) / 2.0))
            .collect();
        let mean = if mids.is_empty() {
            0.0
        } else {
            mids.iter().sum::<f64>() / mids.len() as f64
        };
        let (x, y, anchor) = if vertical {
            (frame.x(frame.inner_width() - 10.0), frame.y(mean), Anchor::Start)
        } else {
            (frame.x(mean), frame.y(-15.0), Anchor::Middle)
        };
        scene.push(
            Node::new(
                "category-label",
                Shape::text(x, y, c.name.clone(), LABEL_FONT_PX),
                Paint::fill(colors.get(&c.name)),
            )
            .anchor(anchor)
            .bold(),
        );
    }
}

impl StackedBarChart {
    pub fn segments(&self) -> &[StackSegment] {
        &self.segments
    }

    pub fn axes(&self) -> &AxisPair {
        &self.axes
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    /// Extent of a rendered bar mapped back into value space.
    pub fn rendered_extent(&self, id: NodeId) -> Option<f64> {
        let (x0, y0, x1, y1) = self.scene.node(id)?.shape.bounds();
        let (a, b) = match self.axes.orientation {
            Orientation::Vertical => (self.frame.to_inner(0.0, y0).1, self.frame.to_inner(0.0, y1).1),
            Orientation::Horizontal => (self.frame.to_inner(x0, 0.0).0, self.frame.to_inner(x1, 0.0).0),
        };
        Some((self.axes.value.invert(b) - self.axes.value.invert(a)).abs())
    }

    fn content(&self, s: &StackSegment) -> TooltipContent {
        let mut shown = s.clone();
        if self.options.percentage {
            shown.start *= 100.0;
            shown.end *= 100.0;
        }
        if let Some(m) = &self.options.tooltip {
            return m(&shown);
        }
        let cfg = &self.options.config;
        let value = format!("{} {}", format_fixed(shown.end - shown.start, 2, &cfg.locale), cfg.unit_str());
        TooltipContent::titled(shown.entity.clone())
            .row(TooltipRow::new(shown.category.clone(), value.trim_end().to_string()))
    }
}

impl Chart for StackedBarChart {
    fn scene(&self) -> &Scene {
        &self.scene
    }

    fn tooltip(&self) -> &TooltipState {
        &self.tooltip
    }

    fn pointer_move(&mut self, pointer: Pointer, container: &ContainerRect) -> &TooltipState {
        let (lx, ly) = pointer.local(container);
        let hit = self
            .scene
            .hit_test(lx, ly)
            .and_then(|id| self.scene.node(id).filter(|n| n.class == "bar").and_then(|n| n.datum).map(|d| (id, d)));
        let Some((id, datum)) = hit else {
            self.pointer_leave();
            return &self.tooltip;
        };
        highlight(&mut self.scene, "bar", id, DIMMED, 1.0);
        let seg = self.segments[datum].clone();
        self.tooltip.show(
            HoverTarget {
                class: "bar",
                datum: Some(datum),
                group: None,
            },
            position_simple(pointer, container, OFFSETS),
            self.content(&seg),
        );
        self.tooltip.border_color = Some(self.colors.get(&seg.category));
        &self.tooltip
    }

    fn pointer_leave(&mut self) {
        self.scene.set_opacity("bar", RESTING, |_| true);
        self.tooltip.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cats() -> Vec<CategorySpec> {
        vec![CategorySpec::new("a", Rgb::BLACK), CategorySpec::new("b", Rgb::GRID)]
    }

    #[test]
    fn missing_category_is_rejected() {
        let data = vec![StackedEntity::new("X", [("a", 1.0)])];
        assert_eq!(
            draw(&data, &cats(), &StackedOptions::default()).err(),
            Some(ChartError::MissingCategory {
                entity: "X".into(),
                category: "b".into()
            })
        );
    }

    #[test]
    fn percentage_uses_each_entity_total() {
        let data = vec![
            StackedEntity::new("X", [("a", 30.0), ("b", 70.0)]),
            StackedEntity::new("Y", [("a", 1.0), ("b", 3.0)]),
        ];
        let segs = stack(&data, &cats(), true);
        assert!((segs[1].end - 1.0).abs() < 1e-12);
        assert!((segs[3].end - 1.0).abs() < 1e-12);
        assert!((segs[2].end - 0.25).abs() < 1e-12);
    }

    #[test]
    fn tooltip_shows_percent_and_leave_restores_opacity() {
        let data = vec![StackedEntity::new("X", [("a", 25.0), ("b", 75.0)])];
        let opts = StackedOptions {
            config: ChartConfig::sized(500.0, 200.0),
            percentage: true,
            ..StackedOptions::default()
        };
        let mut chart = draw(&data, &cats(), &opts).unwrap().into_chart().unwrap();
        let id = chart.scene().ids_by_class("bar")[1];
        let (x0, y0, x1, y1) = chart.scene().node(id).unwrap().shape.bounds();
        let c = ContainerRect::at_origin(500.0, 200.0);
        let t = chart.pointer_move(Pointer::new((x0 + x1) / 2.0, (y0 + y1) / 2.0), &c).clone();
        assert_eq!(t.content.unwrap().lines(), vec!["X", "b: 75.00 %"]);
        assert_eq!(t.border_color, Some(Rgb::GRID));
        chart.pointer_leave();
        assert!(chart.scene().by_class("bar").all(|n| n.paint.opacity == RESTING));
    }
}
