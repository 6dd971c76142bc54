//! Faceted bar chart: one small horizontal bar chart per group, four per page.

use serde::Serialize;

use super::axis::{Frame, TICK_FONT_PX};
use super::bar::value_domain;
use super::color::{CATEGORY10, OrdinalColors, Rgb};
use super::error::ChartError;
use super::scale::{BandScale, LinearScale};
use super::scene::{Anchor, Node, Paint, Scene, Shape, no_data_scene};
use super::text::{calculate_max_length, split_text};
use super::tooltip::{
    ContainerRect, HoverTarget, Offsets, Pointer, TooltipContent, TooltipRow, TooltipState,
    position_simple,
};
use super::types::{ChartConfig, Margin, Rendered, TooltipMapper};
use super::util::format_tick;
use super::Chart;
use crate::models::FacetedPoint;

pub const GROUPS_PER_PAGE: usize = 4;
pub const DEFAULT_MARGIN: Margin = Margin::new(50.0, 0.0, 40.0, 75.0);
const FACETS_MARGIN: f64 = 30.0;
const RECT_HEIGHT: f64 = 31.0;
const MAX_CATEGORIES: usize = 15;
const RESTING: f64 = 0.85;
const DIMMED: f64 = 0.5;
/// 0.8rem
const TITLE_FONT_REM: f64 = 0.8;
const TITLE_LINE_PX: f64 = 12.0;
const LABEL_MAX_CHARS: usize = 13;
const LABEL_LINE_PX: f64 = 15.0;
const BORDER: Rgb = Rgb::new(0xd9, 0xd9, 0xd9);

/// Tooltip input: an optional header and the bars it describes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FacetTooltip {
    pub header: Option<String>,
    pub points: Vec<FacetedPoint>,
}

#[derive(Clone)]
pub struct FacetedOptions {
    pub config: ChartConfig,
    /// Horizontal gap between facets.
    pub facets_margin: f64,
    /// One color per group; defaults to the ten-color categorical scheme.
    pub group_colors: Option<Vec<Rgb>>,
    pub tooltip: Option<TooltipMapper<FacetTooltip>>,
}

impl Default for FacetedOptions {
    fn default() -> Self {
        Self {
            config: ChartConfig::default(),
            facets_margin: FACETS_MARGIN,
            group_colors: None,
            tooltip: None,
        }
    }
}

/// Paginated faceted chart. Changing page rebuilds the scene.
pub struct FacetedBarChart {
    data: Vec<FacetedPoint>,
    groups: Vec<String>,
    categories: Vec<String>,
    colors: OrdinalColors,
    options: FacetedOptions,
    page: usize,
    scene: Scene,
    tooltip: TooltipState,
}

fn unique<'a>(it: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for s in it {
        if !out.iter().any(|o| o == s) {
            out.push(s.to_string());
        }
    }
    out
}

/// Number of pages needed for `groups` facets.
pub fn page_count(groups: usize) -> usize {
    groups.div_ceil(GROUPS_PER_PAGE)
}

pub fn draw(data: &[FacetedPoint], options: &FacetedOptions) -> Result<Rendered<FacetedBarChart>, ChartError> {
    let cfg = &options.config;
    if data.is_empty() {
        return Ok(Rendered::NoData(no_data_scene(cfg.width, cfg.height)));
    }
    let groups = unique(data.iter().map(|d| d.group.as_str()));
    if let Some(c) = &options.group_colors
        && groups.len() < c.len()
    {
        return Err(ChartError::ColorCountMismatch {
            what: "The number of color maps has to be the same of the groups",
            colors: c.len(),
            items: groups.len(),
        });
    }
    let mut categories = unique(data.iter().map(|d| d.category.as_str()));
    categories.truncate(MAX_CATEGORIES);
    let palette = options.group_colors.clone().unwrap_or_else(|| CATEGORY10.to_vec());
    let colors = OrdinalColors::new(groups.iter().cloned(), palette);

    let mut chart = FacetedBarChart {
        data: data.to_vec(),
        groups,
        categories,
        colors,
        options: options.clone(),
        page: 0,
        scene: Scene::new(cfg.width, cfg.height),
        tooltip: TooltipState::default(),
    };
    chart.rebuild();
    Ok(Rendered::Chart(chart))
}

impl FacetedBarChart {
    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_count(&self) -> usize {
        page_count(self.groups.len())
    }

    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    /// Groups shown on the current page.
    pub fn page_groups(&self) -> &[String] {
        let start = (self.page * GROUPS_PER_PAGE).min(self.groups.len());
        let end = (start + GROUPS_PER_PAGE).min(self.groups.len());
        &self.groups[start..end]
    }

    /// Advance one page; a no-op on the last page. Returns whether the page changed.
    pub fn next_page(&mut self) -> bool {
        if self.page + 1 < self.page_count() {
            self.page += 1;
            self.rebuild();
            true
        } else {
            false
        }
    }

    /// Go back one page; a no-op on the first page.
    pub fn prev_page(&mut self) -> bool {
        if self.page == 0 {
            return false;
        }
        self.page -= 1;
        self.rebuild();
        true
    }

    fn group_index(&self, group: &str) -> usize {
        self.groups.iter().position(|g| g == group).unwrap_or(usize::MAX)
    }

    fn rebuild(&mut self) {
        let cfg = &self.options.config;
        let frame = Frame::new(cfg.width, cfg.height, cfg.margin.resolve(DEFAULT_MARGIN));
        let page_groups = self.page_groups().to_vec();
        let n = page_groups.len().max(1) as f64;
        let facets_margin = self.options.facets_margin;
        let facet_w = (frame.inner_width() / n - facets_margin).max(0.0);
        let facet_h = frame.inner_height();

        let values: Vec<f64> = self.data.iter().map(|d| d.value).collect();
        let domain = value_domain(&values, cfg.domain_min, cfg.domain_max);
        let ticks = if page_groups.len() > 4 { 3 } else { 5 };
        let x = LinearScale::new(domain, (0.0, facet_w)).nice(ticks);
        let y = BandScale::new(self.categories.iter().cloned(), (0.0, facet_h)).padding(0.2);
        let rect_h = RECT_HEIGHT.min(y.bandwidth());
        let (d0, d1) = x.domain();
        let baseline = 0f64.clamp(d0.min(d1), d0.max(d1));

        let mut scene = Scene::new(cfg.width, cfg.height);
        for (fi, group) in page_groups.iter().enumerate() {
            let gi = self.group_index(group);
            let ox = frame.x(fi as f64 * (facet_w + facets_margin));
            let oy = frame.y(0.0);
            scene.push(Node::new("facet", Shape::rect(ox, oy, facet_w, facet_h), Paint::stroke(BORDER, 1.0)));

            let rows: Vec<(usize, &FacetedPoint)> = self
                .data
                .iter()
                .enumerate()
                .filter(|(_, d)| &d.group == group && self.categories.contains(&d.category))
                .collect();
            for (k, (_, d)) in rows.iter().enumerate() {
                let Some(top) = y.position(&d.category) else { continue };
                let top = top + rect_h / 2.0;
                let bottom = rows
                    .get(k + 1)
                    .and_then(|(_, nd)| y.position(&nd.category))
                    .map(|p| p + rect_h / 2.0)
                    .unwrap_or(facet_h);
                scene.push(Node::new(
                    "facet",
                    Shape::rect(ox, oy + top, facet_w, bottom - top),
                    Paint::stroke(BORDER, 1.0),
                ));
            }
            for (di, d) in &rows {
                let Some(top) = y.position(&d.category) else { continue };
                let (start, end) = (x.scale(baseline), x.scale(d.value));
                scene.push(
                    Node::new(
                        "bar",
                        Shape::rect(ox + start.min(end), oy + top, (end - start).abs(), rect_h),
                        Paint::fill(self.colors.get(group)).with_opacity(RESTING),
                    )
                    .datum(*di)
                    .group(gi)
                    .interactive(),
                );
            }

            let max_len = calculate_max_length(facet_w, TITLE_FONT_REM);
            let lines = split_text(group, max_len, 3);
            let y0 = oy - 15.0 - (lines.len().saturating_sub(1)) as f64 * TITLE_LINE_PX;
            for (li, line) in lines.iter().enumerate() {
                scene.push(
                    Node::new(
                        "facet-title",
                        Shape::text(ox + facet_w / 2.0, y0 + li as f64 * TITLE_LINE_PX, line.clone(), TITLE_FONT_REM * 16.0),
                        Paint::fill(Rgb::BLACK),
                    )
                    .group(gi)
                    .anchor(Anchor::Middle)
                    .bold()
                    .interactive(),
                );
            }

            let base = oy + facet_h;
            scene.push(Node::new("axis", Shape::line(ox, base, ox + facet_w, base), Paint::stroke(BORDER, 1.0)));
            for t in x.ticks(ticks) {
                let px = ox + x.scale(t);
                scene.push(Node::new("axis", Shape::line(px, base, px, base + 6.0), Paint::stroke(BORDER, 1.0)));
                let label = format_tick(t.round(), "", cfg.unit_str(), &cfg.locale);
                scene.push(
                    Node::new("tick", Shape::text(px, base + 15.0, label, TICK_FONT_PX), Paint::fill(Rgb::BLACK))
                        .anchor(Anchor::Middle),
                );
            }
        }

        for (ci, cat) in self.categories.iter().enumerate() {
            let Some(top) = y.position(cat) else { continue };
            for (li, line) in split_text(cat, LABEL_MAX_CHARS, 2).into_iter().enumerate() {
                scene.push(
                    Node::new(
                        "category-label",
                        Shape::text(frame.x(-15.0), frame.y(top + rect_h / 2.0 + li as f64 * LABEL_LINE_PX), line, 12.8),
                        Paint::fill(Rgb::BLACK),
                    )
                    .datum(ci)
                    .anchor(Anchor::End)
                    .bold()
                    .interactive(),
                );
            }
        }
        log::debug!("faceted chart page {}/{}", self.page + 1, self.page_count());
        self.scene = scene;
        self.tooltip.clear();
    }

    fn content(&self, t: FacetTooltip) -> TooltipContent {
        if let Some(m) = &self.options.tooltip {
            return m(&t);
        }
        let unit = self.options.config.unit_str();
        let mut c = TooltipContent {
            title: t.header.clone(),
            ..TooltipContent::default()
        };
        for p in &t.points {
            c.rows.push(TooltipRow::new(p.group.clone(), format!("{}{}", p.value, unit)));
        }
        c
    }

    fn restore(&mut self) {
        self.scene.set_opacity("bar", RESTING, |_| true);
    }
}

impl Chart for FacetedBarChart {
    fn scene(&self) -> &Scene {
        &self.scene
    }

    fn tooltip(&self) -> &TooltipState {
        &self.tooltip
    }

    fn pointer_move(&mut self, pointer: Pointer, container: &ContainerRect) -> &TooltipState {
        let (lx, ly) = pointer.local(container);
        let Some(id) = self.scene.hit_test(lx, ly) else {
            self.pointer_leave();
            return &self.tooltip;
        };
        let Some(node) = self.scene.node(id).cloned() else {
            return &self.tooltip;
        };
        self.restore();
        match node.class {
            "bar" => {
                let Some(d) = node.datum.and_then(|i| self.data.get(i)).cloned() else {
                    return &self.tooltip;
                };
                self.scene.set_opacity("bar", DIMMED, |n| n.group == node.group);
                if let Some(n) = self.scene.node_mut(id) {
                    n.paint.opacity = 1.0;
                }
                let content = self.content(FacetTooltip {
                    header: None,
                    points: vec![d],
                });
                let pos = position_simple(pointer, container, Offsets::new(25.0, 40.0));
                self.tooltip.show(hover(&node), pos, content);
                self.tooltip.border_color = None;
            }
            "facet-title" => {
                let Some(group) = node.group.and_then(|g| self.groups.get(g)).cloned() else {
                    return &self.tooltip;
                };
                // Category and group swap roles so each row names a category.
                let points = self
                    .data
                    .iter()
                    .filter(|d| d.group == group)
                    .map(|d| FacetedPoint {
                        group: d.category.clone(),
                        category: d.group.clone(),
                        value: d.value,
                    })
                    .collect();
                let content = self.content(FacetTooltip {
                    header: Some(group.clone()),
                    points,
                });
                let pos = position_simple(pointer, container, Offsets::new(10.0, 0.0));
                self.tooltip.show(hover(&node), pos, content);
                self.tooltip.border_color = Some(self.colors.get(&group));
            }
            "category-label" => {
                let Some(cat) = node.datum.and_then(|c| self.categories.get(c)).cloned() else {
                    return &self.tooltip;
                };
                let points = self.data.iter().filter(|d| d.category == cat).cloned().collect();
                let content = self.content(FacetTooltip {
                    header: Some(cat),
                    points,
                });
                let pos = position_simple(pointer, container, Offsets::new(10.0, 60.0));
                self.tooltip.show(hover(&node), pos, content);
                self.tooltip.border_color = None;
            }
            _ => self.pointer_leave(),
        }
        &self.tooltip
    }

    fn pointer_leave(&mut self) {
        self.restore();
        self.tooltip.clear();
    }
}

fn hover(node: &Node) -> HoverTarget {
    HoverTarget {
        class: node.class,
        datum: node.datum,
        group: node.group,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(groups: usize) -> Vec<FacetedPoint> {
        (0..groups)
            .flat_map(|g| {
                ["Italy", "France"].into_iter().map(move |c| FacetedPoint {
                    group: format!("G{g}"),
                    category: c.to_string(),
                    value: 10.0 + g as f64,
                })
            })
            .collect()
    }

    fn chart(groups: usize) -> FacetedBarChart {
        let opts = FacetedOptions {
            config: ChartConfig::sized(900.0, 300.0),
            ..FacetedOptions::default()
        };
        draw(&data(groups), &opts).unwrap().into_chart().unwrap()
    }

    #[test]
    fn pages_clamp_at_both_ends() {
        let mut c = chart(6);
        assert_eq!(c.page_count(), 2);
        assert!(!c.prev_page());
        assert!(c.next_page());
        assert_eq!(c.page_groups(), &["G4".to_string(), "G5".to_string()]);
        assert!(!c.next_page());
        assert_eq!(c.page(), 1);
    }

    #[test]
    fn too_many_colors_for_groups() {
        let opts = FacetedOptions {
            group_colors: Some(vec![Rgb::BLACK; 3]),
            ..FacetedOptions::default()
        };
        assert!(matches!(draw(&data(2), &opts), Err(ChartError::ColorCountMismatch { .. })));
    }

    #[test]
    fn bars_grow_from_zero() {
        let data = vec![
            FacetedPoint {
                group: "Emissions".into(),
                category: "Italy".into(),
                value: -5.0,
            },
            FacetedPoint {
                group: "Emissions".into(),
                category: "France".into(),
                value: 10.0,
            },
        ];
        let opts = FacetedOptions {
            config: ChartConfig::sized(600.0, 300.0),
            ..FacetedOptions::default()
        };
        let c = draw(&data, &opts).unwrap().into_chart().unwrap();
        let bars: Vec<_> = c.scene().by_class("bar").map(|n| n.shape.bounds()).collect();
        let (neg_x0, _, neg_x1, _) = bars[0];
        let (pos_x0, _, pos_x1, _) = bars[1];
        assert!((neg_x1 - pos_x0).abs() < 1e-9);
        assert!(neg_x0 < neg_x1 && pos_x0 < pos_x1);
        assert!(((pos_x1 - pos_x0) / (neg_x1 - neg_x0) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn hover_dims_only_same_facet() {
        let mut c = chart(2);
        let ids = c.scene().ids_by_class("bar");
        let (x0, y0, x1, y1) = c.scene().node(ids[0]).unwrap().shape.bounds();
        let cont = ContainerRect::at_origin(900.0, 300.0);
        c.pointer_move(Pointer::new((x0 + x1) / 2.0, (y0 + y1) / 2.0), &cont);
        let ops: Vec<f64> = c.scene().by_class("bar").map(|n| n.paint.opacity).collect();
        assert_eq!(ops, vec![1.0, DIMMED, RESTING, RESTING]);
        c.pointer_leave();
        assert!(c.scene().by_class("bar").all(|n| n.paint.opacity == RESTING));
    }
}
