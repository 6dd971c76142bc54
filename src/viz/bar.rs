//! Single-series bar chart.

use super::axis::{Frame, Side, draw_axis, draw_axis_title};
use super::color::ColorSource;
use super::error::ChartError;
use super::scale::AxisPair;
use super::scene::{Node, NodeId, Paint, Scene, Shape, no_data_scene};
use super::tooltip::{
    ContainerRect, HoverTarget, Offsets, Pointer, TooltipContent, TooltipRow, TooltipState,
    position_simple,
};
use super::types::{ChartConfig, Margin, Rendered, TooltipMapper};
use super::util::format_tick;
use super::{Chart, highlight};
use crate::models::Point;

pub const DEFAULT_MARGIN: Margin = Margin::new(20.0, 0.0, 40.0, 30.0);
pub const BAND_PADDING: f64 = 0.2;
const OFFSETS: Offsets = Offsets::new(25.0, 60.0);
const DIMMED: f64 = 0.4;

#[derive(Clone, Default)]
pub struct BarOptions {
    pub config: ChartConfig,
    pub tooltip: Option<TooltipMapper<Point>>,
}

impl From<ChartConfig> for BarOptions {
    fn from(config: ChartConfig) -> Self {
        Self {
            config,
            tooltip: None,
        }
    }
}

pub struct BarChart {
    scene: Scene,
    tooltip: TooltipState,
    points: Vec<Point>,
    bars: Vec<NodeId>,
    axes: AxisPair,
    frame: Frame,
    options: BarOptions,
}

/// Domain of the value axis: caller bounds, else `[min(0, min y), max y]`.
pub fn value_domain(values: &[f64], lo: Option<f64>, hi: Option<f64>) -> (f64, f64) {
    let finite = values.iter().copied().filter(|v| v.is_finite());
    let min = finite.clone().fold(f64::INFINITY, f64::min);
    let max = finite.fold(f64::NEG_INFINITY, f64::max);
    (
        lo.unwrap_or(0f64.min(min)),
        hi.unwrap_or(if max.is_finite() { max } else { 0.0 }),
    )
}

/// Draw a bar per `(x[i], y[i])`.
pub fn draw(x: &[String], y: &[f64], options: &BarOptions) -> Result<Rendered<BarChart>, ChartError> {
    let cfg = &options.config;
    if x.is_empty() || y.is_empty() {
        return Ok(Rendered::NoData(no_data_scene(cfg.width, cfg.height)));
    }
    if x.len() != y.len() {
        return Err(ChartError::LengthMismatch {
            what: "X and Y data",
            left: x.len(),
            right: y.len(),
        });
    }

    let frame = Frame::new(cfg.width, cfg.height, cfg.margin.resolve(DEFAULT_MARGIN));
    let domain = value_domain(y, cfg.domain_min, cfg.domain_max);
    let axes = AxisPair::build(
        cfg.orientation,
        x.iter().cloned(),
        domain,
        frame.inner_width(),
        frame.inner_height(),
        BAND_PADDING,
        true,
    );
    let colors = cfg.colors.clone().unwrap_or_default();
    let points: Vec<Point> = x
        .iter()
        .zip(y)
        .map(|(x, y)| Point { x: x.clone(), y: *y })
        .collect();

    let mut scene = Scene::new(cfg.width, cfg.height);
    let (xs, ys) = axes.xy();
    let tick = |v: f64| format_tick(v, cfg.prefix_str(), cfg.unit_str(), &cfg.locale);
    draw_axis(&mut scene, &frame, &xs, Side::Bottom, 10, tick);
    draw_axis(&mut scene, &frame, &ys, Side::Left, 10, tick);
    draw_axis_title(&mut scene, &frame, Side::Bottom, cfg.x_label.as_deref().unwrap_or(""));
    draw_axis_title(&mut scene, &frame, Side::Left, cfg.y_label.as_deref().unwrap_or(""));

    let bars = draw_bars(&mut scene, &frame, &axes, &points, &colors, domain);
    log::debug!("bar chart: {} bars", bars.len());

    Ok(Rendered::Chart(BarChart {
        scene,
        tooltip: TooltipState::default(),
        points,
        bars,
        axes,
        frame,
        options: options.clone(),
    }))
}

fn draw_bars(
    scene: &mut Scene,
    frame: &Frame,
    axes: &AxisPair,
    points: &[Point],
    colors: &ColorSource,
    domain: (f64, f64),
) -> Vec<NodeId> {
    let (d0, d1) = axes.value.domain();
    let baseline = 0f64.clamp(d0.min(d1), d0.max(d1));
    points
        .iter()
        .enumerate()
        .filter_map(|(i, p)| {
            let pos = axes.band.position(&p.x)?;
            let (x, y, w, h) = axes.span_rect(pos, axes.band.bandwidth(), baseline, p.y);
            let node = Node::new(
                "bar",
                Shape::rect(frame.x(x), frame.y(y), w, h),
                Paint::fill(colors.sequential(domain, p.y)),
            )
            .datum(i)
            .interactive();
            Some(scene.push(node))
        })
        .collect()
}

impl BarChart {
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn axes(&self) -> &AxisPair {
        &self.axes
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    /// Scene ids of the bars, in input order.
    pub fn bar_ids(&self) -> &[NodeId] {
        &self.bars
    }

    fn content(&self, p: &Point) -> TooltipContent {
        if let Some(mapper) = &self.options.tooltip {
            return mapper(p);
        }
        let cfg = &self.options.config;
        let value = format!("{}{} {}", cfg.prefix_str(), p.y, cfg.unit_str());
        TooltipContent::default().row(TooltipRow::new(p.x.clone(), value.trim_end().to_string()))
    }
}

impl Chart for BarChart {
    fn scene(&self) -> &Scene {
        &self.scene
    }

    fn tooltip(&self) -> &TooltipState {
        &self.tooltip
    }

    fn pointer_move(&mut self, pointer: Pointer, container: &ContainerRect) -> &TooltipState {
        let (lx, ly) = pointer.local(container);
        let hit = self.scene.hit_test(lx, ly).filter(|id| self.bars.contains(id));
        let Some(id) = hit else {
            self.pointer_leave();
            return &self.tooltip;
        };
        let Some(datum) = self.scene.node(id).and_then(|n| n.datum) else {
            return &self.tooltip;
        };
        highlight(&mut self.scene, "bar", id, DIMMED, 1.0);
        let content = self.content(&self.points[datum]);
        self.tooltip.show(
            HoverTarget {
                class: "bar",
                datum: Some(datum),
                group: None,
            },
            position_simple(pointer, container, OFFSETS),
            content,
        );
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
    use crate::viz::types::MarginSpec;

    fn labels(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn domain_includes_zero_unless_overridden() {
        assert_eq!(value_domain(&[5.0, 9.0], None, None), (0.0, 9.0));
        assert_eq!(value_domain(&[-5.0, 9.0], None, None), (-5.0, 9.0));
        assert_eq!(value_domain(&[5.0, 9.0], Some(2.0), Some(100.0)), (2.0, 100.0));
    }

    #[test]
    fn mismatched_lengths_error() {
        let err = draw(&labels(&["A", "B"]), &[1.0], &BarOptions::default()).err();
        assert!(matches!(err, Some(ChartError::LengthMismatch { left: 2, right: 1, .. })));
    }

    #[test]
    fn hover_dims_siblings_and_leave_restores() {
        let cfg = ChartConfig {
            margin: MarginSpec::default(),
            ..ChartConfig::sized(300.0, 200.0).vertical(true)
        };
        let mut chart = draw(&labels(&["A", "B"]), &[1.0, 2.0], &cfg.into())
            .unwrap()
            .into_chart()
            .unwrap();
        let id = chart.bar_ids()[1];
        let (x0, y0, x1, y1) = chart.scene().node(id).unwrap().shape.bounds();
        let p = Pointer::new((x0 + x1) / 2.0, (y0 + y1) / 2.0);
        let c = ContainerRect::at_origin(300.0, 200.0);
        let state = chart.pointer_move(p, &c).clone();
        assert!(state.is_visible());
        assert_eq!(state.content.unwrap().lines(), vec!["B: 2"]);
        let ops: Vec<f64> = chart.scene().by_class("bar").map(|n| n.paint.opacity).collect();
        assert_eq!(ops, vec![0.4, 1.0]);
        chart.pointer_leave();
        assert!(!chart.tooltip().is_visible());
        assert!(chart.scene().by_class("bar").all(|n| n.paint.opacity == 1.0));
    }
}
