//! Multi-series line chart with a snapping hover guide.

use serde::Serialize;

use super::axis::{Frame, Side, draw_band_axis, draw_grid, draw_linear_axis};
use super::color::Rgb;
use super::error::ChartError;
use super::scale::{BandScale, LinearScale};
use super::scene::{Node, NodeId, Paint, Scene, Shape, no_data_scene};
use super::tooltip::{
    ContainerRect, HoverTarget, Offsets, Pointer, TooltipContent, TooltipRow, TooltipState,
    position_clamped,
};
use super::types::{ChartConfig, Margin, Rendered, TooltipMapper};
use super::util::{format_fixed, format_tick};
use super::Chart;

pub const DEFAULT_MARGIN: Margin = Margin::new(20.0, 0.0, 40.0, 30.0);
const BAND_PADDING: f64 = 0.1;
const OFFSETS: Offsets = Offsets::new(10.0, 10.0);
const Y_TICKS: usize = 8;

/// One line (or scatter) series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineSeries {
    pub x: Vec<String>,
    pub y: Vec<f64>,
    pub color: Rgb,
    pub tag: String,
    /// Draw points instead of a connected line.
    pub scatter: bool,
}

impl LineSeries {
    pub fn new(tag: impl Into<String>, x: Vec<String>, y: Vec<f64>, color: Rgb) -> Self {
        Self {
            x,
            y,
            color,
            tag: tag.into(),
            scatter: false,
        }
    }

    pub fn scatter(mut self) -> Self {
        self.scatter = true;
        self
    }

    /// Value at x label `x`, NaN when the series has no sample there.
    pub fn value_at(&self, x: &str) -> f64 {
        self.x
            .iter()
            .position(|v| v == x)
            .and_then(|i| self.y.get(i).copied())
            .unwrap_or(f64::NAN)
    }
}

/// Snapshot handed to a custom tooltip mapper.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineHover {
    pub x: String,
    /// Long name of `x` when full tags were supplied.
    pub name: String,
    /// `(tag, value, color)` per series.
    pub values: Vec<(String, f64, Rgb)>,
}

#[derive(Clone, Default)]
pub struct LineOptions {
    pub config: ChartConfig,
    pub lower: Option<f64>,
    pub upper: Option<f64>,
    /// Long names for numeric x labels; label `n` maps to entry `n - 1`.
    pub x_full_tags: Option<Vec<String>>,
    pub tooltip: Option<TooltipMapper<LineHover>>,
}

pub struct LineChart {
    scene: Scene,
    tooltip: TooltipState,
    series: Vec<LineSeries>,
    x: BandScale,
    y: LinearScale,
    frame: Frame,
    guide: NodeId,
    dots: Vec<NodeId>,
    options: LineOptions,
}

fn validate(series: &[LineSeries], tags: Option<&[String]>) -> Result<(), ChartError> {
    for s in series {
        if s.x.is_empty() || s.y.is_empty() {
            return Err(ChartError::EmptySeries {
                series: s.tag.clone(),
                x: s.x.len(),
                y: s.y.len(),
            });
        }
        if s.x.len() != s.y.len() {
            return Err(ChartError::LengthMismatch {
                what: "X and Y data",
                left: s.x.len(),
                right: s.y.len(),
            });
        }
        if let Some(tags) = tags
            && tags.len() != s.x.len()
        {
            return Err(ChartError::TagCountMismatch {
                x: s.x.len(),
                tags: tags.len(),
            });
        }
    }
    Ok(())
}

/// `[lower or min, upper or max]` over every finite sample.
pub fn y_domain(series: &[LineSeries], lower: Option<f64>, upper: Option<f64>) -> (f64, f64) {
    let finite = || series.iter().flat_map(|s| s.y.iter().copied()).filter(|v| v.is_finite());
    let min = finite().fold(f64::INFINITY, f64::min);
    let max = finite().fold(f64::NEG_INFINITY, f64::max);
    let (min, max) = if min.is_finite() { (min, max) } else { (0.0, 0.0) };
    (lower.unwrap_or(min), upper.unwrap_or(max))
}

/// Consecutive runs of finite samples, so gaps break the line.
fn segments(s: &LineSeries, x: &BandScale, y: &LinearScale, frame: &Frame) -> Vec<Vec<(f64, f64)>> {
    let mut out = Vec::new();
    let mut cur = Vec::new();
    for (xv, yv) in s.x.iter().zip(&s.y) {
        match x.center(xv) {
            Some(cx) if yv.is_finite() => cur.push((frame.x(cx), frame.y(y.scale(*yv)))),
            _ => {
                if !cur.is_empty() {
                    out.push(std::mem::take(&mut cur));
                }
            }
        }
    }
    if !cur.is_empty() {
        out.push(cur);
    }
    out
}

pub fn draw(series: &[LineSeries], options: &LineOptions) -> Result<Rendered<LineChart>, ChartError> {
    let cfg = &options.config;
    if series.is_empty() {
        return Ok(Rendered::NoData(no_data_scene(cfg.width, cfg.height)));
    }
    validate(series, options.x_full_tags.as_deref())?;

    let frame = Frame::new(cfg.width, cfg.height, cfg.margin.resolve(DEFAULT_MARGIN));
    let x = BandScale::new(series[0].x.iter().cloned(), (0.0, frame.inner_width())).padding(BAND_PADDING);
    let y = LinearScale::new(y_domain(series, options.lower, options.upper), (frame.inner_height(), 0.0));

    let mut scene = Scene::new(cfg.width, cfg.height);
    draw_grid(&mut scene, &frame, &y, Y_TICKS);
    draw_band_axis(&mut scene, &frame, &x, Side::Bottom);
    let unit = cfg.unit_str();
    draw_linear_axis(&mut scene, &frame, &y, Side::Left, Y_TICKS, |v| {
        format!("{} {}", format_tick(v, "", "", &cfg.locale), unit).trim_end().to_string()
    });

    for (si, s) in series.iter().enumerate() {
        if s.scatter {
            for (xv, yv) in s.x.iter().zip(&s.y) {
                let Some(cx) = x.center(xv) else { continue };
                let node = Node::new(
                    "point",
                    Shape::circle(frame.x(cx), frame.y(y.scale(*yv)), 5.0),
                    Paint::fill(s.color),
                )
                .group(si);
                scene.push(if yv.is_finite() { node } else { node.hidden() });
            }
        } else {
            for points in segments(s, &x, &y, &frame) {
                scene.push(
                    Node::new("line", Shape::Path { points, closed: false }, Paint::stroke(s.color, 2.0)).group(si),
                );
            }
        }
        for (xv, yv) in s.x.iter().zip(&s.y) {
            let Some(cx) = x.center(xv) else { continue };
            let node = Node::new("marker", Shape::circle(frame.x(cx), frame.y(y.scale(*yv)), 3.0), Paint::fill(s.color))
                .group(si);
            scene.push(if yv.is_finite() { node } else { node.hidden() });
        }
    }

    let guide = scene.push(
        Node::new(
            "guide",
            Shape::line(frame.x(0.0), frame.y(0.0), frame.x(0.0), frame.y(frame.inner_height())),
            Paint::stroke(Rgb::GUIDE, 1.0),
        )
        .hidden(),
    );
    let dots = series
        .iter()
        .enumerate()
        .map(|(si, s)| {
            scene.push(
                Node::new("hover-dot", Shape::circle(0.0, 0.0, 5.0), Paint::fill(s.color))
                    .group(si)
                    .hidden(),
            )
        })
        .collect();
    log::debug!("line chart: {} series over {} x labels", series.len(), x.domain().len());

    Ok(Rendered::Chart(LineChart {
        scene,
        tooltip: TooltipState::default(),
        series: series.to_vec(),
        x,
        y,
        frame,
        guide,
        dots,
        options: options.clone(),
    }))
}

impl LineChart {
    pub fn series(&self) -> &[LineSeries] {
        &self.series
    }

    pub fn x_scale(&self) -> &BandScale {
        &self.x
    }

    pub fn y_scale(&self) -> &LinearScale {
        &self.y
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    /// Long name for an x label: `x_full_tags[label - 1]` when the label is a
    /// number inside the tag list, else the label itself.
    pub fn x_name(&self, x: &str) -> String {
        self.options
            .x_full_tags
            .as_ref()
            .and_then(|tags| {
                let n = x.trim().parse::<usize>().ok()?;
                tags.get(n.checked_sub(1)?).cloned()
            })
            .unwrap_or_else(|| x.to_string())
    }

    fn content(&self, hover: &LineHover) -> TooltipContent {
        if let Some(m) = &self.options.tooltip {
            return m(hover);
        }
        let cfg = &self.options.config;
        let mut c = TooltipContent::titled(hover.name.clone());
        for (tag, v, color) in &hover.values {
            let value = format!("{} {}", format_fixed(*v, 2, &cfg.locale), cfg.unit_str());
            c.rows.push(TooltipRow::new(tag.clone(), value.trim_end().to_string()).swatch(*color));
        }
        c
    }
}

impl Chart for LineChart {
    fn scene(&self) -> &Scene {
        &self.scene
    }

    fn tooltip(&self) -> &TooltipState {
        &self.tooltip
    }

    fn pointer_move(&mut self, pointer: Pointer, container: &ContainerRect) -> &TooltipState {
        let (lx, ly) = pointer.local(container);
        let (ix, iy) = self.frame.to_inner(lx, ly);
        if ix < 0.0 || iy < 0.0 || ix > self.frame.inner_width() || iy > self.frame.inner_height() {
            self.pointer_leave();
            return &self.tooltip;
        }
        let Some(xv) = self.x.snap(ix).map(str::to_string) else {
            return &self.tooltip;
        };
        let Some(cx) = self.x.center(&xv) else {
            return &self.tooltip;
        };
        let gx = self.frame.x(cx);
        let (top, bottom) = (self.frame.y(0.0), self.frame.y(self.frame.inner_height()));
        if let Some(n) = self.scene.node_mut(self.guide) {
            n.shape = Shape::line(gx, top, gx, bottom);
            n.visible = true;
        }

        let mut values = Vec::with_capacity(self.series.len());
        for (si, s) in self.series.iter().enumerate() {
            let v = s.value_at(&xv);
            let cy = self.frame.y(self.y.scale(v));
            if let Some(n) = self.dots.get(si).and_then(|id| self.scene.node_mut(*id)) {
                n.shape = Shape::circle(gx, cy, 5.0);
                n.visible = v.is_finite();
            }
            values.push((s.tag.clone(), v, s.color));
        }
        let hover = LineHover {
            name: self.x_name(&xv),
            x: xv,
            values,
        };
        let content = self.content(&hover);
        let bounds = (self.frame.inner_width(), self.frame.inner_height());
        let pos = position_clamped(pointer, container, OFFSETS, content.size(), bounds);
        let datum = self.x.domain().iter().position(|d| *d == hover.x);
        self.tooltip.show(
            HoverTarget {
                class: "guide",
                datum,
                group: None,
            },
            pos,
            content,
        );
        &self.tooltip
    }

    fn pointer_leave(&mut self) {
        self.scene.set_visible("guide", false, |_| true);
        self.scene.set_visible("hover-dot", false, |_| true);
        self.tooltip.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn unequal_lengths_error() {
        let s = LineSeries::new("Italy", labels(&["1", "2"]), vec![1.0], Rgb::BLACK);
        assert!(matches!(
            draw(&[s], &LineOptions::default()).err(),
            Some(ChartError::LengthMismatch { left: 2, right: 1, .. })
        ));
    }

    #[test]
    fn empty_series_and_tag_count_error() {
        let empty = LineSeries::new("Italy", vec![], vec![], Rgb::BLACK);
        assert!(matches!(
            draw(&[empty], &LineOptions::default()).err(),
            Some(ChartError::EmptySeries { .. })
        ));
        let s = LineSeries::new("Italy", labels(&["1", "2"]), vec![1.0, 2.0], Rgb::BLACK);
        let opts = LineOptions {
            x_full_tags: Some(labels(&["Basic"])),
            ..LineOptions::default()
        };
        assert_eq!(
            draw(&[s], &opts).err(),
            Some(ChartError::TagCountMismatch { x: 2, tags: 1 })
        );
    }

    #[test]
    fn nan_samples_split_the_path() {
        let s = LineSeries::new("A", labels(&["a", "b", "c", "d"]), vec![1.0, f64::NAN, 2.0, 3.0], Rgb::BLACK);
        let r = draw(&[s], &LineOptions::default()).unwrap();
        assert_eq!(r.scene().by_class("line").count(), 2);
        assert_eq!(r.scene().by_class("marker").filter(|n| !n.visible).count(), 1);
    }

    #[test]
    fn first_series_sets_the_x_domain() {
        let a = LineSeries::new("Italy", labels(&["2020", "2021"]), vec![1.0, 2.0], Rgb::BLACK);
        let b = LineSeries::new("France", labels(&["2019", "2020", "2021"]), vec![3.0, 4.0, 5.0], Rgb::GRID);
        let c = draw(&[a, b], &LineOptions::default()).unwrap().into_chart().unwrap();
        assert_eq!(c.x.domain(), &["2020".to_string(), "2021".to_string()]);
    }

    #[test]
    fn hover_snaps_and_uses_full_tag() {
        let a = LineSeries::new("Italy", labels(&["1", "2"]), vec![10.0, 20.0], Rgb::BLACK);
        let b = LineSeries::new("France", labels(&["1", "2"]), vec![5.0, f64::NAN], Rgb::GRID);
        let opts = LineOptions {
            config: ChartConfig::sized(430.0, 300.0).unit("%"),
            x_full_tags: Some(labels(&["Basic skills", "Above basic"])),
            ..LineOptions::default()
        };
        let mut chart = draw(&[a, b], &opts).unwrap().into_chart().unwrap();
        let cx = chart.frame().x(chart.x_scale().center("2").unwrap());
        let c = ContainerRect::at_origin(430.0, 300.0);
        let t = chart.pointer_move(Pointer::new(cx + 3.0, 100.0), &c).clone();
        assert_eq!(
            t.content.unwrap().lines(),
            vec!["Above basic", "Italy: 20.00 %", "France: NaN %"]
        );
        let dots: Vec<bool> = chart.scene().by_class("hover-dot").map(|n| n.visible).collect();
        assert_eq!(dots, vec![true, false]);
        chart.pointer_leave();
        assert!(chart.scene().by_class("guide").all(|n| !n.visible));
    }
}
