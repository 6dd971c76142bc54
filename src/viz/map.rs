//! Choropleth map: one outline per GeoJSON region, filled by the region's value
//! for the selected year, with a gradient legend and stepwise zoom.

use ahash::AHashMap;
use anyhow::{Context, Result, bail};
use geojson::{GeoJson, Value};
use serde::Serialize;

use super::Chart;
use super::axis::Frame;
use super::color::{ColorSource, Rgb};
use super::error::ChartError;
use super::scale::LinearScale;
use super::scene::{Anchor, Node, NodeId, Paint, Scene, Shape, no_data_scene};
use super::tooltip::{
    ContainerRect, HoverTarget, Offsets, Pointer, TooltipContent, TooltipRow, TooltipState,
    position_clamped,
};
use super::types::{ChartConfig, Margin, Rendered, TooltipMapper};
use super::util::format_fixed;

pub const DEFAULT_MARGIN: Margin = Margin::new(20.0, 80.0, 50.0, 20.0);
/// Rows that are not countries and have no outline.
pub const AGGREGATES: [&str; 2] = ["EU-27(from 2020)", "EU-28(2013-2020)"];
pub const NAME_PROPERTY: &str = "NAME";
pub const MIN_ZOOM: f64 = 1.0;
pub const MAX_ZOOM: f64 = 15.0;
const ZOOM_STEP: f64 = 1.5;
const OFFSETS: Offsets = Offsets::new(3.0, 55.0);
const MISSING: Rgb = Rgb::new(0xcc, 0xcc, 0xcc);
const STROKE: f64 = 0.5;
const STROKE_HOVER: f64 = 1.5;
const LEGEND_W: f64 = 350.0;
const LEGEND_H: f64 = 20.0;
const LEGEND_STEPS: usize = 70;
const LEGEND_TICKS: usize = 5;
/// 0.8rem
const LEGEND_FONT_PX: f64 = 12.8;

/// A named area with its outer rings as `(longitude, latitude)` degrees.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Region {
    pub name: String,
    pub rings: Vec<Vec<(f64, f64)>>,
}

/// Regions of a GeoJSON feature collection, named by `name_property`.
///
/// Only exterior rings are kept; holes are left to the regions drawn inside them.
pub fn parse_regions(text: &str, name_property: &str) -> Result<Vec<Region>> {
    let geo: GeoJson = text.parse().context("parse GeoJSON")?;
    let features = match geo {
        GeoJson::FeatureCollection(fc) => fc.features,
        GeoJson::Feature(f) => vec![f],
        GeoJson::Geometry(_) => bail!("GeoJSON holds a bare geometry, expected features"),
    };
    let regions = features
        .iter()
        .map(|f| {
            let name = f
                .properties
                .as_ref()
                .and_then(|p| p.get(name_property))
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            let rings = f.geometry.as_ref().map(|g| exterior_rings(&g.value)).unwrap_or_default();
            Region { name, rings }
        })
        .collect::<Vec<_>>();
    log::debug!("parsed {} regions", regions.len());
    Ok(regions)
}

fn ring(positions: &[Vec<f64>]) -> Vec<(f64, f64)> {
    positions
        .iter()
        .filter(|p| p.len() >= 2)
        .map(|p| (p[0], p[1]))
        .collect()
}

fn exterior_rings(value: &Value) -> Vec<Vec<(f64, f64)>> {
    match value {
        Value::Polygon(rings) => rings.first().map(|r| vec![ring(r)]).unwrap_or_default(),
        Value::MultiPolygon(polygons) => polygons.iter().filter_map(|p| p.first()).map(|r| ring(r)).collect(),
        Value::GeometryCollection(geometries) => geometries.iter().flat_map(|g| exterior_rings(&g.value)).collect(),
        _ => Vec::new(),
    }
}

/// Albers conic equal-area projection onto screen pixels (y grows downward).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConicEqualArea {
    n: f64,
    c: f64,
    r0: f64,
    k: f64,
    tx: f64,
    ty: f64,
}

impl Default for ConicEqualArea {
    fn default() -> Self {
        Self::new(0.0, 60.0)
    }
}

impl ConicEqualArea {
    /// Standard parallels in degrees; they must not be mirror images across the equator.
    pub fn new(phi0: f64, phi1: f64) -> Self {
        let (s0, s1) = (phi0.to_radians().sin(), phi1.to_radians().sin());
        let n = (s0 + s1) / 2.0;
        let c = 1.0 + s0 * (2.0 * n - s0);
        Self {
            n,
            c,
            r0: c.sqrt() / n,
            k: 1.0,
            tx: 0.0,
            ty: 0.0,
        }
    }

    fn raw(&self, lon: f64, lat: f64) -> (f64, f64) {
        let r = (self.c - 2.0 * self.n * lat.to_radians().sin()).max(0.0).sqrt() / self.n;
        let a = lon.to_radians() * self.n;
        (r * a.sin(), r * a.cos() - self.r0)
    }

    pub fn project(&self, lon: f64, lat: f64) -> (f64, f64) {
        let (x, y) = self.raw(lon, lat);
        (self.tx + self.k * x, self.ty + self.k * y)
    }

    /// Scale and center so every ring fits inside `(0, 0)..size`.
    pub fn fit_size(mut self, size: (f64, f64), regions: &[Region]) -> Self {
        let (mut x0, mut y0, mut x1, mut y1) = (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY);
        for &(lon, lat) in regions.iter().flat_map(|r| r.rings.iter().flatten()) {
            let (x, y) = self.raw(lon, lat);
            x0 = x0.min(x);
            y0 = y0.min(y);
            x1 = x1.max(x);
            y1 = y1.max(y);
        }
        let k = (size.0 / (x1 - x0)).min(size.1 / (y1 - y0));
        if !k.is_finite() || k <= 0.0 {
            return self;
        }
        self.k = k;
        self.tx = (size.0 - k * (x0 + x1)) / 2.0;
        self.ty = (size.1 - k * (y0 + y1)) / 2.0;
        self
    }
}

/// A region as hovered: its name and value, if the data has one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionValue {
    pub name: String,
    pub value: Option<f64>,
}

#[derive(Clone)]
pub struct MapOptions {
    pub config: ChartConfig,
    /// Value rows ignored when coloring.
    pub excluded: Vec<String>,
    /// Label of the value line in the tooltip.
    pub value_label: String,
    pub zoom: f64,
    pub tooltip: Option<TooltipMapper<RegionValue>>,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            config: ChartConfig::default(),
            excluded: AGGREGATES.iter().map(|s| s.to_string()).collect(),
            value_label: "Households with internet access".to_string(),
            zoom: MIN_ZOOM,
            tooltip: None,
        }
    }
}

pub struct MapChart {
    scene: Scene,
    tooltip: TooltipState,
    regions: Vec<RegionValue>,
    /// Region nodes and their outlines at zoom 1.
    outlines: Vec<(NodeId, Vec<(f64, f64)>)>,
    domain: (f64, f64),
    zoom: f64,
    frame: Frame,
    options: MapOptions,
}

fn extent(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if lo.is_finite() { (lo, hi) } else { (0.0, 0.0) }
}

/// Draw `regions`, colored by the `(name, value)` pairs. A later pair for the
/// same name replaces an earlier one.
pub fn draw(regions: &[Region], values: &[(String, f64)], options: &MapOptions) -> Result<Rendered<MapChart>, ChartError> {
    let cfg = &options.config;
    if regions.is_empty() {
        return Ok(Rendered::NoData(no_data_scene(cfg.width, cfg.height)));
    }
    let mut by_name: AHashMap<&str, f64> = AHashMap::new();
    for (name, v) in values {
        if v.is_finite() && !options.excluded.iter().any(|e| e == name) {
            by_name.insert(name.as_str(), *v);
        }
    }
    let domain = extent(by_name.values().copied());
    let colors = cfg.colors.clone().unwrap_or_default();

    let frame = Frame::new(cfg.width, cfg.height, cfg.margin.resolve(DEFAULT_MARGIN));
    let projection = ConicEqualArea::default().fit_size((frame.inner_width(), frame.inner_height()), regions);

    let mut scene = Scene::new(cfg.width, cfg.height);
    let mut outlines = Vec::new();
    let mut data = Vec::with_capacity(regions.len());
    for (ri, r) in regions.iter().enumerate() {
        let value = by_name.get(r.name.as_str()).copied();
        let fill = value.map_or(MISSING, |v| colors.sequential(domain, v));
        for ring in &r.rings {
            let points: Vec<(f64, f64)> = ring.iter().map(|&(lon, lat)| projection.project(lon, lat)).collect();
            let id = scene.push(
                Node::new(
                    "region",
                    Shape::Path {
                        points: points.clone(),
                        closed: true,
                    },
                    Paint::fill(fill).with_stroke(Rgb::BLACK, STROKE),
                )
                .datum(ri)
                .interactive(),
            );
            outlines.push((id, points));
        }
        data.push(RegionValue {
            name: r.name.clone(),
            value,
        });
    }
    draw_legend(&mut scene, &frame, &colors, domain);

    let mut chart = MapChart {
        scene,
        tooltip: TooltipState::default(),
        regions: data,
        outlines,
        domain,
        zoom: MIN_ZOOM,
        frame,
        options: options.clone(),
    };
    chart.set_zoom(options.zoom);
    Ok(Rendered::Chart(chart))
}

/// Gradient bar under the map with a percent axis over the color domain.
fn draw_legend(scene: &mut Scene, frame: &Frame, colors: &ColorSource, domain: (f64, f64)) {
    let (x0, y0) = (frame.margin.left, frame.height - frame.margin.bottom);
    let step = LEGEND_W / LEGEND_STEPS as f64;
    for i in 0..LEGEND_STEPS {
        let t = i as f64 / (LEGEND_STEPS - 1) as f64;
        scene.push(Node::new(
            "legend",
            Shape::rect(x0 + i as f64 * step, y0, step, LEGEND_H),
            Paint::fill(colors.at(t)),
        ));
    }
    let scale = LinearScale::new(domain, (0.0, LEGEND_W));
    let base = y0 + LEGEND_H;
    scene.push(Node::new(
        "legend-axis",
        Shape::line(x0, base, x0 + LEGEND_W, base),
        Paint::stroke(Rgb::BLACK, 1.0),
    ));
    for t in scale.ticks(LEGEND_TICKS) {
        let x = x0 + scale.scale(t);
        scene.push(Node::new("legend-axis", Shape::line(x, base, x, base + 6.0), Paint::stroke(Rgb::BLACK, 1.0)));
        scene.push(
            Node::new(
                "legend-axis",
                Shape::text(x, base + 9.0 + LEGEND_FONT_PX / 2.0, format!("{}%", t), LEGEND_FONT_PX),
                Paint::fill(Rgb::BLACK),
            )
            .anchor(Anchor::Middle),
        );
    }
}

impl MapChart {
    pub fn regions(&self) -> &[RegionValue] {
        &self.regions
    }

    /// Extent of the values that color the map.
    pub fn domain(&self) -> (f64, f64) {
        self.domain
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    /// Nodes drawn for region `ri`, one per ring.
    pub fn region_ids(&self, ri: usize) -> Vec<NodeId> {
        self.outlines
            .iter()
            .map(|(id, _)| *id)
            .filter(|id| self.scene.node(*id).and_then(|n| n.datum) == Some(ri))
            .collect()
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Scale the outlines about the canvas origin. Returns the clamped zoom.
    pub fn set_zoom(&mut self, zoom: f64) -> f64 {
        let k = if zoom.is_finite() {
            zoom.clamp(MIN_ZOOM, MAX_ZOOM)
        } else {
            MIN_ZOOM
        };
        self.zoom = k;
        for (id, base) in &self.outlines {
            if let Some(n) = self.scene.node_mut(*id) {
                n.shape = Shape::Path {
                    points: base.iter().map(|&(x, y)| (x * k, y * k)).collect(),
                    closed: true,
                };
            }
        }
        k
    }

    pub fn zoom_in(&mut self) -> f64 {
        self.set_zoom(self.zoom * ZOOM_STEP)
    }

    pub fn zoom_out(&mut self) -> f64 {
        self.set_zoom(self.zoom / ZOOM_STEP)
    }

    fn outline(&mut self, hovered: Option<usize>) {
        for (id, _) in &self.outlines {
            if let Some(n) = self.scene.node_mut(*id) {
                n.paint.stroke_width = if hovered.is_some() && n.datum == hovered {
                    STROKE_HOVER
                } else {
                    STROKE
                };
            }
        }
    }

    fn content(&self, region: &RegionValue) -> TooltipContent {
        if let Some(m) = &self.options.tooltip {
            return m(region);
        }
        let value = match region.value {
            Some(v) => format_fixed(v, 2, &self.options.config.locale),
            None => "N/A".to_string(),
        };
        TooltipContent::default()
            .row(TooltipRow::new("Country", region.name.clone()))
            .row(TooltipRow::new(self.options.value_label.clone(), value))
    }
}

impl Chart for MapChart {
    fn scene(&self) -> &Scene {
        &self.scene
    }

    fn tooltip(&self) -> &TooltipState {
        &self.tooltip
    }

    fn pointer_move(&mut self, pointer: Pointer, container: &ContainerRect) -> &TooltipState {
        let (lx, ly) = pointer.local(container);
        let hit = self.scene.hit_test(lx, ly).and_then(|id| self.scene.node(id)).and_then(|n| n.datum);
        let Some(region) = hit.and_then(|ri| self.regions.get(ri)).cloned() else {
            self.pointer_leave();
            return &self.tooltip;
        };
        self.outline(hit);
        let content = self.content(&region);
        let bounds = (self.frame.inner_width(), self.frame.inner_height());
        let pos = position_clamped(pointer, container, OFFSETS, content.size(), bounds);
        self.tooltip.show(
            HoverTarget {
                class: "region",
                datum: hit,
                group: None,
            },
            pos,
            content,
        );
        &self.tooltip
    }

    fn pointer_leave(&mut self) {
        self.outline(None);
        self.tooltip.clear();
    }
}
