//! Grouped bar chart: one band per group label, one bar per category inside it.

use serde::Serialize;

use super::axis::{Frame, Side, draw_axis, draw_axis_title};
use super::bar::{BAND_PADDING, DEFAULT_MARGIN, value_domain};
use super::color::{OrdinalColors, Rgb};
use super::error::ChartError;
use super::legend::{draw_swatch_row, estimate_swatch_row_height};
use super::scale::{AxisPair, BandScale};
use super::scene::{Node, NodeId, Paint, Scene, Shape, no_data_scene};
use super::tooltip::{
    ContainerRect, HoverTarget, Offsets, Pointer, TooltipContent, TooltipRow, TooltipState,
    position_simple,
};
use super::types::{ChartConfig, Rendered, TooltipMapper};
use super::util::format_tick;
use super::{Chart, highlight};
use crate::models::BarGroup;

pub const INNER_PADDING: f64 = 0.05;
const OFFSETS: Offsets = Offsets::new(25.0, 60.0);
const DIMMED: f64 = 0.4;

/// A hovered bar: its group label plus the category entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupedPoint {
    pub label: String,
    pub name: String,
    pub value: f64,
}

#[derive(Clone, Default)]
pub struct GroupedOptions {
    pub config: ChartConfig,
    /// One color per category, in first-seen category order.
    pub category_colors: Vec<Rgb>,
    pub tooltip: Option<TooltipMapper<GroupedPoint>>,
}

pub struct GroupedBarChart {
    scene: Scene,
    tooltip: TooltipState,
    points: Vec<GroupedPoint>,
    colors: OrdinalColors,
    options: GroupedOptions,
}

/// Unique category names across all groups, first-seen order.
pub fn unique_categories(data: &[BarGroup]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for c in data.iter().flat_map(|g| g.values.iter()) {
        if !out.contains(&c.name) {
            out.push(c.name.clone());
        }
    }
    out
}

fn validate(data: &[BarGroup], categories: &[String], colors: usize) -> Result<(), ChartError> {
    if let Some(g) = data.iter().find(|g| g.values.is_empty()) {
        return Err(ChartError::EmptyGroup(g.label.clone()));
    }
    if categories.len() < colors {
        return Err(ChartError::ColorCountMismatch {
            what: "The number of colors should match the number of categories",
            colors,
            items: categories.len(),
        });
    }
    for g in data {
        if let Some(missing) = categories.iter().find(|c| !g.values.iter().any(|v| &v.name == *c)) {
            return Err(ChartError::MissingCategory {
                entity: g.label.clone(),
                category: missing.clone(),
            });
        }
    }
    Ok(())
}

pub fn draw(data: &[BarGroup], options: &GroupedOptions) -> Result<Rendered<GroupedBarChart>, ChartError> {
    let cfg = &options.config;
    if data.is_empty() {
        return Ok(Rendered::NoData(no_data_scene(cfg.width, cfg.height)));
    }
    let categories = unique_categories(data);
    validate(data, &categories, options.category_colors.len())?;

    let palette = if options.category_colors.is_empty() {
        super::color::OFFICE10.to_vec()
    } else {
        options.category_colors.clone()
    };
    let colors = OrdinalColors::new(categories.iter().cloned(), palette);

    let frame = Frame::new(cfg.width, cfg.height, cfg.margin.resolve(DEFAULT_MARGIN));
    let all: Vec<f64> = data.iter().flat_map(|g| g.values.iter().map(|v| v.value)).collect();
    let domain = value_domain(&all, cfg.domain_min, cfg.domain_max);
    let axes = AxisPair::build(
        cfg.orientation,
        data.iter().map(|g| g.label.clone()),
        domain,
        frame.inner_width(),
        frame.inner_height(),
        BAND_PADDING,
        true,
    );
    let inner = BandScale::new(categories.iter().cloned(), (0.0, axes.band.bandwidth())).padding(INNER_PADDING);
    let (d0, d1) = domain;
    let baseline = 0f64.clamp(d0.min(d1), d0.max(d1));

    let legend_items: Vec<(String, Rgb)> = categories.iter().map(|c| (c.clone(), colors.get(c))).collect();
    let legend_h = estimate_swatch_row_height(&legend_items, cfg.width);
    let mut scene = Scene::new(cfg.width, cfg.height + legend_h);

    let (xs, ys) = axes.xy();
    let tick = |v: f64| format_tick(v, cfg.prefix_str(), cfg.unit_str(), &cfg.locale);
    draw_axis(&mut scene, &frame, &xs, Side::Bottom, 10, tick);
    draw_axis(&mut scene, &frame, &ys, Side::Left, 10, tick);
    draw_axis_title(&mut scene, &frame, Side::Bottom, cfg.x_label.as_deref().unwrap_or(""));
    draw_axis_title(&mut scene, &frame, Side::Left, cfg.y_label.as_deref().unwrap_or(""));

    let mut points = Vec::new();
    for (gi, g) in data.iter().enumerate() {
        let Some(outer) = axes.band.position(&g.label) else {
            continue;
        };
        for v in &g.values {
            let Some(pos) = inner.position(&v.name) else {
                continue;
            };
            let (x, y, w, h) = axes.span_rect(outer + pos, inner.bandwidth(), baseline, v.value);
            let datum = points.len();
            scene.push(
                Node::new(
                    "bar",
                    Shape::rect(frame.x(x), frame.y(y), w, h),
                    Paint::fill(colors.get(&v.name)),
                )
                .datum(datum)
                .group(gi)
                .interactive(),
            );
            points.push(GroupedPoint {
                label: g.label.clone(),
                name: v.name.clone(),
                value: v.value,
            });
        }
    }
    draw_swatch_row(&mut scene, &legend_items, frame.margin.left, cfg.height, cfg.width - frame.margin.left);

    Ok(Rendered::Chart(GroupedBarChart {
        scene,
        tooltip: TooltipState::default(),
        points,
        colors,
        options: options.clone(),
    }))
}

impl GroupedBarChart {
    pub fn points(&self) -> &[GroupedPoint] {
        &self.points
    }

    pub fn color_of(&self, category: &str) -> Rgb {
        self.colors.get(category)
    }

    fn content(&self, p: &GroupedPoint) -> TooltipContent {
        if let Some(m) = &self.options.tooltip {
            return m(p);
        }
        TooltipContent::titled(format!("{} - {}:", p.label, p.name))
            .row(TooltipRow::new("", format!("{}{}", p.value, self.options.config.unit_str())))
    }

    fn bar_at(&self, x: f64, y: f64) -> Option<(NodeId, usize)> {
        let id = self.scene.hit_test(x, y)?;
        let n = self.scene.node(id)?;
        (n.class == "bar").then_some((id, n.datum?))
    }
}

impl Chart for GroupedBarChart {
    fn scene(&self) -> &Scene {
        &self.scene
    }

    fn tooltip(&self) -> &TooltipState {
        &self.tooltip
    }

    fn pointer_move(&mut self, pointer: Pointer, container: &ContainerRect) -> &TooltipState {
        let (lx, ly) = pointer.local(container);
        let Some((id, datum)) = self.bar_at(lx, ly) else {
            self.pointer_leave();
            return &self.tooltip;
        };
        highlight(&mut self.scene, "bar", id, DIMMED, 1.0);
        let p = self.points[datum].clone();
        self.tooltip.show(
            HoverTarget {
                class: "bar",
                datum: Some(datum),
                group: self.scene.node(id).and_then(|n| n.group),
            },
            position_simple(pointer, container, OFFSETS),
            self.content(&p),
        );
        self.tooltip.border_color = Some(self.colors.get(&p.name));
        &self.tooltip
    }

    fn pointer_leave(&mut self) {
        self.scene.set_opacity("bar", 1.0, |_| true);
        self.tooltip.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;

    fn group(label: &str, values: &[(&str, f64)]) -> BarGroup {
        BarGroup {
            label: label.into(),
            values: values.iter().map(|(n, v)| Category::new(*n, *v)).collect(),
        }
    }

    #[test]
    fn empty_group_is_rejected() {
        let data = vec![group("2020", &[("A", 1.0)]), group("2021", &[])];
        assert_eq!(
            draw(&data, &GroupedOptions::default()).err(),
            Some(ChartError::EmptyGroup("2021".into()))
        );
    }

    #[test]
    fn too_many_colors_is_rejected() {
        let data = vec![group("2020", &[("A", 1.0)])];
        let opts = GroupedOptions {
            category_colors: vec![Rgb::BLACK, Rgb::WHITE],
            ..GroupedOptions::default()
        };
        assert!(matches!(draw(&data, &opts).err(), Some(ChartError::ColorCountMismatch { .. })));
    }

    #[test]
    fn bars_fit_inside_their_group_band() {
        let data = vec![
            group("2020", &[("Male", 3.0), ("Female", 4.0)]),
            group("2021", &[("Male", 5.0), ("Female", 6.0)]),
        ];
        let cfg = ChartConfig::sized(400.0, 300.0).vertical(true);
        let opts = GroupedOptions {
            config: cfg,
            ..GroupedOptions::default()
        };
        let r = draw(&data, &opts).unwrap();
        let bars: Vec<_> = r.scene().by_class("bar").collect();
        assert_eq!(bars.len(), 4);
        let (a0, _, a1, _) = bars[0].shape.bounds();
        let (b0, _, _, _) = bars[1].shape.bounds();
        assert!(a1 <= b0);
        assert!(a0 >= 30.0);
    }
}
