//! Alluvial (two-layer Sankey) chart.

use serde::Serialize;

use super::axis::Frame;
use super::color::{OrdinalColors, PASTEL4, Rgb};
use super::error::ChartError;
use super::legend::draw_responsive_legend;
use super::sankey::{self, NODE_PADDING, NODE_WIDTH, SankeyGraph};
use super::scene::{Anchor, Node, Paint, Scene, Shape, no_data_scene};
use super::text::wrap_text_to_width;
use super::tooltip::{
    ContainerRect, HoverTarget, Offsets, Pointer, TooltipContent, TooltipRow, TooltipState,
    position_simple,
};
use super::types::{ChartConfig, Margin, Rendered, TooltipMapper};
use super::Chart;
use crate::models::{AlluvialData, LinkData};

pub const DEFAULT_MARGIN: Margin = Margin::new(20.0, 80.0, 50.0, 20.0);
const OFFSETS: Offsets = Offsets::new(10.0, 40.0);
const RESTING: f64 = 0.85;
const DIMMED: f64 = 0.2;
const LABEL_WIDTH_PX: f64 = 100.0;
const LABEL_LINE_PX: f64 = 15.0;
const LABEL_FONT_PX: f64 = 12.0;
const CURVE_SEGMENTS: usize = 24;

/// One flow in a tooltip breakdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Flow {
    pub source: String,
    pub target: String,
    pub value: f64,
    /// Color of the destination.
    pub color: Rgb,
}

/// Everything a tooltip mapper gets: the hovered node (or the destination of
/// the hovered link) and its flows, largest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowBreakdown {
    pub node: String,
    pub flows: Vec<Flow>,
    pub total: f64,
}

#[derive(Clone)]
pub struct AlluvialOptions {
    pub config: ChartConfig,
    /// Destination colors, in destination order.
    pub colors: Vec<Rgb>,
    /// Width added to every source node.
    pub node_width: f64,
    /// Sources shorter than this are grown symmetrically about their center.
    pub min_node_height: f64,
    /// Appended to tooltip values, e.g. `k individuals`.
    pub suffix: String,
    /// Tooltip values are divided by this.
    pub scaling_factor: f64,
    pub float_precision: usize,
    /// Viewport width; the legend is drawn from the large-screen breakpoint up.
    pub screen_width: f64,
    pub link_tooltip: Option<TooltipMapper<FlowBreakdown>>,
    pub source_tooltip: Option<TooltipMapper<FlowBreakdown>>,
    pub destination_tooltip: Option<TooltipMapper<FlowBreakdown>>,
}

impl Default for AlluvialOptions {
    fn default() -> Self {
        Self {
            config: ChartConfig::default(),
            colors: PASTEL4.to_vec(),
            node_width: 95.0,
            min_node_height: 45.0,
            suffix: String::new(),
            scaling_factor: 1.0,
            float_precision: 0,
            screen_width: 1440.0,
            link_tooltip: None,
            source_tooltip: None,
            destination_tooltip: None,
        }
    }
}

pub struct AlluvialChart {
    scene: Scene,
    tooltip: TooltipState,
    graph: SankeyGraph,
    colors: OrdinalColors,
    options: AlluvialOptions,
}

/// Every source paired with every destination; missing pairs count 0 and
/// zero-valued pairs are dropped.
pub fn cross_links(data: &AlluvialData) -> Vec<LinkData> {
    let (Some(sources), Some(targets)) = (data.nodes.first(), data.nodes.get(1)) else {
        return Vec::new();
    };
    sources
        .iter()
        .flat_map(|s| {
            targets.iter().map(move |t| LinkData {
                source: s.clone(),
                target: t.clone(),
                value: data
                    .links
                    .iter()
                    .find(|l| &l.source == s && &l.target == t)
                    .map(|l| l.value)
                    .unwrap_or(0.0),
            })
        })
        .filter(|l| l.value > 0.0)
        .collect()
}

/// Widen source nodes and enforce their minimum height.
fn adjust_sources(graph: &mut SankeyGraph, node_width: f64, min_height: f64) {
    for n in graph.nodes.iter_mut().filter(|n| n.layer == 0) {
        n.x1 += node_width;
        let h = n.height();
        if h < min_height {
            let grow = (min_height - h) / 2.0;
            n.y0 -= grow;
            n.y1 += grow;
        }
    }
}

pub fn draw(data: &AlluvialData, options: &AlluvialOptions) -> Result<Rendered<AlluvialChart>, ChartError> {
    let cfg = &options.config;
    if data.nodes.len() > 2 {
        return Err(ChartError::TooManyLayers(data.nodes.len()));
    }
    if let Some(targets) = data.nodes.get(1)
        && targets.len() > options.colors.len()
    {
        return Err(ChartError::ColorCountMismatch {
            what: "The number colors must be the same of nodes",
            colors: options.colors.len(),
            items: targets.len(),
        });
    }
    let links = cross_links(data);
    if data.nodes.len() < 2 || links.is_empty() {
        return Ok(Rendered::NoData(no_data_scene(cfg.width, cfg.height)));
    }

    let frame = Frame::new(cfg.width, cfg.height, cfg.margin.resolve(DEFAULT_MARGIN));
    let mut graph = sankey::layout(
        &data.nodes,
        &links,
        (0.0, 0.0, frame.inner_width(), frame.inner_height()),
        NODE_WIDTH,
        NODE_PADDING,
    )?;
    adjust_sources(&mut graph, options.node_width, options.min_node_height);
    let colors = OrdinalColors::new(data.nodes[1].iter().cloned(), options.colors.clone());

    let mut scene = Scene::new(cfg.width, cfg.height);
    for (i, l) in graph.links.iter().enumerate() {
        let (src, dst) = (&graph.nodes[l.source], &graph.nodes[l.target]);
        let outline = sankey::link_band(
            frame.x(src.x1),
            frame.y(l.y0),
            frame.x(dst.x0),
            frame.y(l.y1),
            l.width.max(1.0),
            CURVE_SEGMENTS,
        );
        scene.push(
            Node::new(
                "link",
                Shape::Path {
                    points: outline,
                    closed: true,
                },
                Paint::fill(colors.get(&dst.name)).with_opacity(RESTING),
            )
            .datum(i)
            .group(l.target)
            .interactive(),
        );
    }
    for (i, n) in graph.nodes.iter().enumerate() {
        let fill = if n.layer == 1 { colors.get(&n.name) } else { Rgb::WHITE };
        scene.push(
            Node::new(
                "node",
                Shape::rect(frame.x(n.x0), frame.y(n.y0), n.x1 - n.x0, n.height()),
                Paint::fill(fill).with_stroke(Rgb::BLACK, 1.0),
            )
            .datum(i)
            .interactive(),
        );
    }
    for (i, n) in graph.nodes.iter().enumerate().filter(|(_, n)| n.layer == 0) {
        let lines = wrap_text_to_width(&n.name, LABEL_FONT_PX, LABEL_WIDTH_PX);
        let cx = frame.x((n.x0 + n.x1) / 2.0);
        let top = frame.y((n.y0 + n.y1) / 2.0) - (lines.len().saturating_sub(1)) as f64 * LABEL_LINE_PX / 2.0;
        for (li, line) in lines.into_iter().enumerate() {
            scene.push(
                Node::new(
                    "node-label",
                    Shape::text(cx, top + li as f64 * LABEL_LINE_PX, line, LABEL_FONT_PX),
                    Paint::fill(Rgb::BLACK),
                )
                .datum(i)
                .anchor(Anchor::Middle)
                .bold()
                .interactive(),
            );
        }
    }
    let items: Vec<(String, Rgb)> = data.nodes[1].iter().map(|d| (d.clone(), colors.get(d))).collect();
    draw_responsive_legend(
        &mut scene,
        &items,
        options.screen_width,
        frame.x(frame.inner_width()) + 20.0,
        frame.margin.top,
    );
    log::debug!("alluvial: {} nodes, {} links", graph.nodes.len(), graph.links.len());

    Ok(Rendered::Chart(AlluvialChart {
        scene,
        tooltip: TooltipState::default(),
        graph,
        colors,
        options: options.clone(),
    }))
}

impl AlluvialChart {
    pub fn graph(&self) -> &SankeyGraph {
        &self.graph
    }

    pub fn color_of(&self, destination: &str) -> Rgb {
        self.colors.get(destination)
    }

    /// `(value / scaling_factor)` with the configured precision and suffix.
    pub fn format_value(&self, v: f64) -> String {
        let o = &self.options;
        let scaled = if o.scaling_factor == 0.0 { v } else { v / o.scaling_factor };
        format!("{:.*}{}", o.float_precision, scaled, o.suffix)
    }

    fn breakdown(&self, node: usize, pick: impl Fn(usize, usize) -> bool) -> FlowBreakdown {
        let mut flows: Vec<Flow> = self
            .graph
            .links
            .iter()
            .filter(|l| pick(l.source, l.target))
            .map(|l| {
                let target = self.graph.nodes[l.target].name.clone();
                Flow {
                    source: self.graph.nodes[l.source].name.clone(),
                    color: self.colors.get(&target),
                    target,
                    value: l.value,
                }
            })
            .collect();
        flows.sort_by(|a, b| b.value.total_cmp(&a.value));
        FlowBreakdown {
            node: self.graph.nodes[node].name.clone(),
            total: flows.iter().map(|f| f.value).sum(),
            flows,
        }
    }

    fn incoming_content(&self, b: &FlowBreakdown) -> TooltipContent {
        let mut c = TooltipContent::titled(b.node.clone());
        for f in &b.flows {
            c.rows.push(TooltipRow::new(f.source.clone(), self.format_value(f.value)));
        }
        c.footer(TooltipRow::new("Total", self.format_value(b.total)))
    }

    fn outgoing_content(&self, b: &FlowBreakdown) -> TooltipContent {
        let mut c = TooltipContent::titled(b.node.clone());
        for f in &b.flows {
            c.rows.push(TooltipRow::new(f.target.clone(), self.format_value(f.value)).swatch(f.color));
        }
        c
    }

    fn hover_link(&mut self, link: usize) -> (TooltipContent, Option<Rgb>) {
        let target = self.graph.links[link].target;
        self.scene.set_opacity("link", 1.0, |n| n.group == Some(target));
        self.scene.set_opacity("link", DIMMED, |n| n.group != Some(target));
        let b = self.breakdown(target, |_, t| t == target);
        let content = match &self.options.link_tooltip {
            Some(m) => m(&b),
            None => self.incoming_content(&b),
        };
        (content, Some(self.colors.get(&b.node)))
    }

    fn hover_node(&mut self, node: usize) -> (TooltipContent, Option<Rgb>) {
        let touching: Vec<bool> = self
            .graph
            .links
            .iter()
            .map(|l| l.source == node || l.target == node)
            .collect();
        self.scene.set_opacity("link", DIMMED, |_| true);
        for (i, hit) in touching.iter().enumerate() {
            if *hit {
                self.scene.set_opacity("link", 1.0, |n| n.datum == Some(i));
            }
        }
        let b = self.breakdown(node, |s, t| s == node || t == node);
        if self.graph.nodes[node].layer == 0 {
            let content = match &self.options.source_tooltip {
                Some(m) => m(&b),
                None => self.outgoing_content(&b),
            };
            (content, None)
        } else {
            let content = match &self.options.destination_tooltip {
                Some(m) => m(&b),
                None => self.incoming_content(&b),
            };
            (content, Some(self.colors.get(&b.node)))
        }
    }
}

impl Chart for AlluvialChart {
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
            .and_then(|id| self.scene.node(id))
            .and_then(|n| n.datum.map(|d| (n.class, d)));
        let (class, datum) = match hit {
            Some(h) => h,
            None => {
                self.pointer_leave();
                return &self.tooltip;
            }
        };
        let (content, border) = match class {
            "link" => self.hover_link(datum),
            _ => self.hover_node(datum),
        };
        self.tooltip.show(
            HoverTarget {
                class,
                datum: Some(datum),
                group: None,
            },
            position_simple(pointer, container, OFFSETS),
            content,
        );
        self.tooltip.border_color = border;
        &self.tooltip
    }

    fn pointer_leave(&mut self) {
        self.scene.set_opacity("link", RESTING, |_| true);
        self.tooltip.clear();
    }
}
