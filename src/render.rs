//! Draw any chart kind straight from records: reshape through [`crate::select`],
//! draw, optionally hover one point, and snapshot the scene.
//!
//! This is the job both binaries run.

use crate::models::Record;
use crate::select::{self, ColumnMap, Selection};
use crate::viz::alluvial::{self, AlluvialOptions};
use crate::viz::bar::{self, BarOptions};
use crate::viz::bubble::{self, BubbleOptions};
use crate::viz::color::{ColorSource, OFFICE10, Rgb};
use crate::viz::faceted::{self, FacetedOptions};
use crate::viz::grouped::{self, GroupedOptions};
use crate::viz::line::{self, LineOptions};
use crate::viz::map::{self, MapOptions, Region};
use crate::viz::stacked::{self, CategorySpec, StackedOptions};
use crate::viz::{self, Chart, ChartConfig, ChartKind, ContainerRect, Pointer, Rendered, Scene};
use anyhow::{Context, Result};
use std::path::Path;

#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub kind: ChartKind,
    pub config: ChartConfig,
    /// Stacked bars as shares of each entity's total.
    pub percentage: bool,
    /// Faceted page, 0-based; stops at the last page.
    pub page: usize,
    /// Canvas position to hover before the snapshot is taken.
    pub hover: Option<(f64, f64)>,
    /// Outlines the map is drawn over.
    pub regions: Vec<Region>,
    /// Map zoom factor.
    pub zoom: f64,
}

impl RenderRequest {
    pub fn new(kind: ChartKind, config: ChartConfig) -> Self {
        Self {
            kind,
            config,
            percentage: false,
            page: 0,
            hover: None,
            regions: Vec::new(),
            zoom: map::MIN_ZOOM,
        }
    }
}

fn finish<C: Chart>(rendered: Rendered<C>, hover: Option<(f64, f64)>) -> Scene {
    match rendered {
        Rendered::NoData(scene) => scene,
        Rendered::Chart(mut chart) => {
            if let Some((x, y)) = hover {
                let container = ContainerRect::at_origin(chart.scene().width, chart.scene().height);
                chart.pointer_move(Pointer::new(x, y), &container);
            }
            chart.snapshot()
        }
    }
}

/// `n` colors from the configured source, or the office palette.
fn palette(config: &ChartConfig, n: usize) -> Vec<Rgb> {
    let source = config
        .colors
        .clone()
        .unwrap_or_else(|| ColorSource::List(OFFICE10.to_vec()));
    (0..n).map(|i| source.nth(i, n)).collect()
}

/// Reshape `rows` for `request.kind` and draw them.
pub fn draw_records(
    rows: &[Record],
    selection: &Selection,
    columns: &ColumnMap,
    request: &RenderRequest,
) -> Result<Scene> {
    let config = request.config.clone();
    let hover = request.hover;
    let kind = request.kind;
    let scene = match kind {
        ChartKind::Bar => {
            let (x, y) = select::bar_input(rows, selection, columns);
            finish(bar::draw(&x, &y, &BarOptions::from(config))?, hover)
        }
        ChartKind::Grouped => {
            let data = select::grouped_input(rows, selection, columns);
            let n = grouped::unique_categories(&data).len();
            let options = GroupedOptions {
                category_colors: palette(&config, n),
                config,
                tooltip: None,
            };
            finish(grouped::draw(&data, &options)?, hover)
        }
        ChartKind::Stacked => {
            let (data, categories) = select::stacked_input(rows, selection, columns);
            let specs: Vec<CategorySpec> = categories
                .iter()
                .zip(palette(&config, categories.len()))
                .map(|(c, color)| CategorySpec::new(c.clone(), color))
                .collect();
            let options = StackedOptions {
                config,
                percentage: request.percentage,
                tooltip: None,
            };
            finish(stacked::draw(&data, &specs, &options)?, hover)
        }
        ChartKind::Faceted => {
            let data = select::faceted_input(rows, selection, columns);
            let options = FacetedOptions {
                config,
                ..FacetedOptions::default()
            };
            let mut rendered = faceted::draw(&data, &options)?;
            if let Some(chart) = rendered.chart_mut() {
                for _ in 0..request.page {
                    if !chart.next_page() {
                        break;
                    }
                }
            }
            finish(rendered, hover)
        }
        ChartKind::Line => {
            let series = select::line_input(rows, selection, columns);
            let options = LineOptions {
                config,
                ..LineOptions::default()
            };
            finish(line::draw(&series, &options)?, hover)
        }
        ChartKind::Bubble => {
            let data = select::bubble_input(rows, selection, columns);
            let options = BubbleOptions {
                config,
                ..BubbleOptions::default()
            };
            finish(bubble::draw(&data, &options)?, hover)
        }
        ChartKind::Alluvial => {
            let data = select::alluvial_input(rows, selection, columns);
            let targets = data.nodes.get(1).map_or(0, Vec::len);
            let options = AlluvialOptions {
                colors: palette(&config, targets),
                config,
                ..AlluvialOptions::default()
            };
            finish(alluvial::draw(&data, &options)?, hover)
        }
        ChartKind::Map => {
            if request.regions.is_empty() {
                log::warn!("map chart without region outlines");
            }
            let values = select::map_input(rows, selection, columns);
            let options = MapOptions {
                config,
                zoom: request.zoom,
                ..MapOptions::default()
            };
            finish(map::draw(&request.regions, &values, &options)?, hover)
        }
    };
    log::debug!("{} chart: {} nodes", kind.name(), scene.len());
    Ok(scene)
}

/// [`draw_records`], then write the scene to `out_path` (SVG or PNG by extension).
pub fn render_records<P: AsRef<Path>>(
    rows: &[Record],
    selection: &Selection,
    columns: &ColumnMap,
    request: &RenderRequest,
    out_path: P,
) -> Result<Scene> {
    let scene = draw_records(rows, selection, columns, request)
        .with_context(|| format!("drawing {} chart", request.kind.name()))?;
    viz::render_scene(&scene, out_path)?;
    Ok(scene)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::viz::scene::NO_DATA_TITLE;

    const OUTLINES: &str = r#"{"type": "FeatureCollection", "features": [
        {"type": "Feature", "properties": {"NAME": "Italy"},
         "geometry": {"type": "Polygon", "coordinates": [[[10, 40], [14, 40], [14, 44], [10, 40]]]}},
        {"type": "Feature", "properties": {"NAME": "France"},
         "geometry": {"type": "Polygon", "coordinates": [[[0, 44], [4, 44], [4, 48], [0, 44]]]}}
    ]}"#;

    fn rows() -> Vec<Record> {
        let head = ["geo", "time_period", "indic_is", "ind_type", "obs_value"];
        vec![
            Record::from_parts(head, ["Italy", "2021", "basic", "All", "40"]),
            Record::from_parts(head, ["France", "2021", "basic", "All", "55"]),
            Record::from_parts(head, ["Italy", "2021", "basic", "Young", "60"]),
            Record::from_parts(head, ["France", "2021", "basic", "Young", "70"]),
        ]
    }

    #[test]
    fn every_kind_draws_from_records() {
        let columns = ColumnMap {
            category: Some("ind_type".into()),
            ..ColumnMap::default()
        };
        let selection = Selection::default();
        let regions = map::parse_regions(OUTLINES, map::NAME_PROPERTY).unwrap();
        for kind in ChartKind::ALL {
            let mut req = RenderRequest::new(kind, ChartConfig::sized(640.0, 400.0));
            if kind.needs_regions() {
                req.regions = regions.clone();
            }
            let scene = draw_records(&rows(), &selection, &columns, &req).unwrap();
            assert!(!scene.is_empty(), "{}", kind.name());
            assert!(!scene.texts().contains(&NO_DATA_TITLE), "{}", kind.name());
        }
    }

    #[test]
    fn alluvial_colors_cover_every_destination() {
        let head = ["geo", "time_period", "indic_is", "ind_type", "obs_value"];
        let kinds = ["None", "Low", "Basic", "Above basic", "At least basic", "High"];
        let rows: Vec<Record> = ["Italy", "France"]
            .iter()
            .flat_map(|geo| {
                kinds
                    .iter()
                    .map(move |k| Record::from_parts(head, [*geo, "2021", "basic", *k, "10"]))
            })
            .collect();
        let columns = ColumnMap {
            category: Some("ind_type".into()),
            ..ColumnMap::default()
        };
        let req = RenderRequest::new(ChartKind::Alluvial, ChartConfig::sized(900.0, 500.0));
        let scene = draw_records(&rows, &Selection::default(), &columns, &req).unwrap();
        assert_eq!(scene.by_class("link").count(), 12);
        assert!(!scene.texts().contains(&NO_DATA_TITLE));
    }

    #[test]
    fn map_without_outlines_draws_placeholder() {
        let req = RenderRequest::new(ChartKind::Map, ChartConfig::default());
        let scene = draw_records(&rows(), &Selection::default(), &ColumnMap::default(), &req).unwrap();
        assert!(scene.texts().contains(&NO_DATA_TITLE));
    }

    #[test]
    fn no_matching_rows_draws_placeholder() {
        let selection = Selection {
            year: Some("1999".into()),
            ..Selection::default()
        };
        let req = RenderRequest::new(ChartKind::Bar, ChartConfig::default());
        let scene = draw_records(&rows(), &selection, &ColumnMap::default(), &req).unwrap();
        assert!(scene.texts().contains(&NO_DATA_TITLE));
    }
}
