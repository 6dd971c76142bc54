//! Bubble chart laid out by the force simulation.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use super::axis::Frame;
use super::color::{OrdinalColors, Rgb};
use super::error::ChartError;
use super::force::{Body, Forces, Simulation};
use super::legend::draw_swatch_list;
use super::scene::{Anchor, Node, Paint, Scene, Shape, no_data_scene};
use super::tooltip::{
    ContainerRect, HoverTarget, Offsets, Pointer, TooltipContent, TooltipRow, TooltipState,
    position_simple,
};
use super::types::{ChartConfig, Margin, Rendered, TooltipMapper};
use super::util::format_fixed;
use super::{Chart, highlight};

pub const DEFAULT_MARGIN: Margin = Margin::new(20.0, 0.0, 40.0, 75.0);
const OFFSETS: Offsets = Offsets::new(15.0, 40.0);
const DIMMED: f64 = 0.4;

/// Parallel input arrays, one entry per bubble.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BubbleData {
    pub percentage: Vec<f64>,
    /// Radius in pixels.
    pub dimension: Vec<f64>,
    /// Key of the color table, e.g. a country.
    pub color_key: Vec<String>,
    /// Text shown inside the bubble, e.g. a year.
    pub label: Vec<String>,
    pub count: Option<Vec<f64>>,
}

impl BubbleData {
    pub fn len(&self) -> usize {
        self.dimension.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dimension.is_empty()
    }
}

/// One laid-out bubble.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bubble {
    pub label: String,
    pub color_key: String,
    pub percentage: f64,
    pub count: Option<f64>,
    pub radius: f64,
    pub x: f64,
    pub y: f64,
}

#[derive(Clone)]
pub struct BubbleOptions {
    pub config: ChartConfig,
    /// Seed of the layout jitter.
    pub seed: u64,
    pub max_ticks: usize,
    pub tooltip: Option<TooltipMapper<Bubble>>,
}

impl Default for BubbleOptions {
    fn default() -> Self {
        Self {
            config: ChartConfig::default(),
            seed: 0x5eed,
            max_ticks: 400,
            tooltip: None,
        }
    }
}

pub struct BubbleChart {
    scene: Scene,
    tooltip: TooltipState,
    bubbles: Vec<Bubble>,
    colors: OrdinalColors,
    options: BubbleOptions,
}

fn validate(data: &BubbleData) -> Result<(), ChartError> {
    let n = data.dimension.len();
    let check = |what, len: usize| {
        if len == n {
            Ok(())
        } else {
            Err(ChartError::LengthMismatch { what, left: n, right: len })
        }
    };
    check("Bubble dimensions and percentages", data.percentage.len())?;
    check("Bubble dimensions and colors", data.color_key.len())?;
    check("Bubble dimensions and labels", data.label.len())?;
    if let Some(c) = &data.count {
        check("Bubble dimensions and counts", c.len())?;
    }
    Ok(())
}

/// Drift target: a jittered step right of/below `origin`, pulled back inside `limit`.
fn drift_target(origin: f64, jitter: f64, radius: f64, limit: f64) -> f64 {
    let t = origin + jitter + radius;
    if t > limit { limit - radius } else { t }
}

/// Settle bubbles around the center of a `w` x `h` area.
pub fn layout(data: &BubbleData, w: f64, h: f64, seed: u64, max_ticks: usize) -> Vec<Bubble> {
    let (cx, cy) = (w / 2.0, h / 2.0);
    let forces = Forces {
        center: (cx, cy),
        ..Forces::default()
    };
    let mut rng = StdRng::seed_from_u64(seed);
    let bodies: Vec<Body> = data
        .dimension
        .iter()
        .map(|r| {
            let (jx, jy): (f64, f64) = (rng.r#gen(), rng.r#gen());
            Body {
                x: cx,
                y: cy,
                vx: 0.0,
                vy: 0.0,
                radius: *r,
                target: (drift_target(cx, jx, *r, w), drift_target(cy, jy, *r, h)),
            }
        })
        .collect();
    let mut sim = Simulation::new(bodies, forces, seed.wrapping_add(1));
    sim.run_until_settled(max_ticks);
    sim.into_bodies()
        .into_iter()
        .enumerate()
        .map(|(i, b)| Bubble {
            label: data.label[i].clone(),
            color_key: data.color_key[i].clone(),
            percentage: data.percentage[i],
            count: data.count.as_ref().and_then(|c| c.get(i).copied()),
            radius: b.radius,
            x: b.x,
            y: b.y,
        })
        .collect()
}

pub fn draw(data: &BubbleData, options: &BubbleOptions) -> Result<Rendered<BubbleChart>, ChartError> {
    let cfg = &options.config;
    validate(data)?;
    if data.is_empty() {
        return Ok(Rendered::NoData(no_data_scene(cfg.width, cfg.height)));
    }

    let frame = Frame::new(cfg.width, cfg.height, cfg.margin.resolve(DEFAULT_MARGIN));
    let source = cfg.colors.clone().unwrap_or_default();
    let colors = OrdinalColors::from_source(data.color_key.iter().cloned(), &source);
    let bubbles = layout(data, frame.inner_width(), frame.inner_height(), options.seed, options.max_ticks);

    let mut scene = Scene::new(cfg.width, cfg.height);
    for (i, b) in bubbles.iter().enumerate() {
        let (x, y) = (frame.x(b.x), frame.y(b.y));
        scene.push(
            Node::new("bubble", Shape::circle(x, y, b.radius), Paint::fill(colors.get(&b.color_key)))
                .datum(i)
                .interactive(),
        );
        let id_font = (b.radius * 0.4).max(10.0);
        let pct_font = (b.radius * 0.3).max(8.0);
        scene.push(
            Node::new("bubble-label", Shape::text(x, y - id_font * 0.4, b.label.clone(), id_font), Paint::fill(Rgb::WHITE))
                .datum(i)
                .anchor(Anchor::Middle)
                .bold(),
        );
        scene.push(
            Node::new(
                "bubble-label",
                Shape::text(x, y + pct_font * 0.9, format!("{}%", b.percentage.trunc()), pct_font),
                Paint::fill(Rgb::WHITE),
            )
            .datum(i)
            .anchor(Anchor::Middle),
        );
    }
    let items: Vec<(String, Rgb)> = colors.keys().iter().map(|k| (k.clone(), colors.get(k))).collect();
    draw_swatch_list(&mut scene, &items, frame.margin.left - 30.0, frame.margin.top + 20.0);

    Ok(Rendered::Chart(BubbleChart {
        scene,
        tooltip: TooltipState::default(),
        bubbles,
        colors,
        options: options.clone(),
    }))
}

impl BubbleChart {
    pub fn bubbles(&self) -> &[Bubble] {
        &self.bubbles
    }

    pub fn color_of(&self, key: &str) -> Rgb {
        self.colors.get(key)
    }

    fn content(&self, b: &Bubble) -> TooltipContent {
        if let Some(m) = &self.options.tooltip {
            return m(b);
        }
        let locale = &self.options.config.locale;
        let mut c = TooltipContent::titled(format!("{} - {}", b.color_key, b.label))
            .row(TooltipRow::new("Percentage", format!("{}%", format_fixed(b.percentage, 2, locale))));
        if let Some(n) = b.count {
            c = c.row(TooltipRow::new("Count", format_fixed(n, 0, locale)));
        }
        c
    }
}

impl Chart for BubbleChart {
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
            .and_then(|id| self.scene.node(id).and_then(|n| n.datum).map(|d| (id, d)));
        let Some((id, datum)) = hit else {
            self.pointer_leave();
            return &self.tooltip;
        };
        highlight(&mut self.scene, "bubble", id, DIMMED, 1.0);
        let b = self.bubbles[datum].clone();
        self.tooltip.show(
            HoverTarget {
                class: "bubble",
                datum: Some(datum),
                group: None,
            },
            position_simple(pointer, container, OFFSETS),
            self.content(&b),
        );
        self.tooltip.border_color = Some(self.colors.get(&b.color_key));
        &self.tooltip
    }

    fn pointer_leave(&mut self) {
        self.scene.set_opacity("bubble", 1.0, |_| true);
        self.tooltip.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data() -> BubbleData {
        BubbleData {
            percentage: vec![12.7, 40.2, 33.0],
            dimension: vec![20.0, 30.0, 25.0],
            color_key: vec!["Italy".into(), "France".into(), "Italy".into()],
            label: vec!["2019".into(), "2020".into(), "2021".into()],
            count: Some(vec![1200.0, 5300.0, 900.0]),
        }
    }

    #[test]
    fn length_mismatch_is_rejected() {
        let mut d = data();
        d.label.pop();
        assert!(matches!(
            draw(&d, &BubbleOptions::default()).err(),
            Some(ChartError::LengthMismatch { left: 3, right: 2, .. })
        ));
    }

    #[test]
    fn partially_empty_arrays_are_a_mismatch() {
        let d = BubbleData {
            percentage: vec![12.7],
            dimension: vec![20.0],
            color_key: vec![],
            label: vec!["2019".into()],
            count: None,
        };
        assert!(matches!(
            draw(&d, &BubbleOptions::default()).err(),
            Some(ChartError::LengthMismatch { left: 1, right: 0, .. })
        ));
        assert!(draw(&BubbleData::default(), &BubbleOptions::default()).unwrap().is_no_data());
    }

    #[test]
    fn labels_truncate_percentages_and_legend_lists_keys_once() {
        let r = draw(&data(), &BubbleOptions::default()).unwrap();
        let texts = r.scene().texts();
        assert!(texts.contains(&"12%"));
        assert!(texts.contains(&"40%"));
        assert_eq!(texts.iter().filter(|t| **t == "Italy").count(), 1);
    }

    #[test]
    fn layout_is_reproducible_and_separated() {
        let a = layout(&data(), 600.0, 400.0, 3, 400);
        let b = layout(&data(), 600.0, 400.0, 3, 400);
        assert_eq!(a, b);
        let d = ((a[0].x - a[1].x).powi(2) + (a[0].y - a[1].y).powi(2)).sqrt();
        assert!(d > a[0].radius + a[1].radius);
    }

    #[test]
    fn hover_dims_other_bubbles() {
        let opts = BubbleOptions {
            config: ChartConfig::sized(600.0, 400.0),
            ..BubbleOptions::default()
        };
        let mut chart = draw(&data(), &opts).unwrap().into_chart().unwrap();
        let b = chart.bubbles()[1].clone();
        let c = ContainerRect::at_origin(600.0, 400.0);
        let p = Pointer::new(b.x + 75.0, b.y + 20.0);
        let t = chart.pointer_move(p, &c).clone();
        assert_eq!(t.content.unwrap().lines(), vec!["France - 2020", "Percentage: 40.20%", "Count: 5,300"]);
        let ops: Vec<f64> = chart.scene().by_class("bubble").map(|n| n.paint.opacity).collect();
        assert_eq!(ops, vec![DIMMED, 1.0, DIMMED]);
    }
}
