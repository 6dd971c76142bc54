use datavis::models::{AlluvialData, BarGroup, Category, FacetedPoint, LinkData, StackedEntity};
use datavis::viz::alluvial::{self, AlluvialOptions};
use datavis::viz::bar::{self, BarOptions};
use datavis::viz::color::Rgb;
use datavis::viz::faceted::{self, FacetedOptions};
use datavis::viz::grouped::{self, GroupedOptions};
use datavis::viz::line::{self, LineOptions, LineSeries};
use datavis::viz::scene::NO_DATA_TITLE;
use datavis::viz::stacked::{self, CategorySpec, StackedOptions};
use datavis::viz::tooltip::{Offsets, position_clamped};
use datavis::viz::{self, Chart, ChartConfig, ChartError, ContainerRect, MarginSpec, Pointer};
use std::fs;

fn labels(v: &[&str]) -> Vec<String> {
    v.iter().map(|s| s.to_string()).collect()
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}

#[test]
fn vertical_bars_share_a_baseline_and_scale_with_values() {
    let cfg = ChartConfig::sized(400.0, 300.0).vertical(true).margin(MarginSpec {
        bottom: Some(30.0),
        ..MarginSpec::default()
    });
    let chart = bar::draw(&labels(&["A", "B", "C"]), &[10.0, 20.0, 15.0], &BarOptions::from(cfg))
        .unwrap()
        .into_chart()
        .unwrap();
    let rects: Vec<(f64, f64, f64, f64)> = chart
        .bar_ids()
        .iter()
        .map(|id| chart.scene().node(*id).unwrap().shape.bounds())
        .collect();
    assert_eq!(rects.len(), 3);
    for (_, _, _, bottom) in &rects {
        assert!(close(*bottom, 270.0), "bottom at {}", bottom);
    }
    let heights: Vec<f64> = rects.iter().map(|(_, y0, _, y1)| y1 - y0).collect();
    assert!(close(heights[0] / heights[1], 0.5));
    assert!(close(heights[2] / heights[1], 0.75));
}

#[test]
fn percentage_stacks_fill_the_value_axis() {
    let data = vec![
        StackedEntity::new("Italy", [("basic", 30.0), ("above", 70.0)]),
        StackedEntity::new("France", [("basic", 50.0), ("above", 50.0)]),
    ];
    let cats = vec![
        CategorySpec::new("basic", Rgb::new(0x1f, 0x77, 0xb4)),
        CategorySpec::new("above", Rgb::new(0xff, 0x7f, 0x0e)),
    ];
    let opts = StackedOptions {
        config: ChartConfig::sized(600.0, 300.0),
        percentage: true,
        tooltip: None,
    };
    let chart = stacked::draw(&data, &cats, &opts).unwrap().into_chart().unwrap();
    let inner = chart.frame().inner_width();
    let ids = chart.scene().ids_by_class("bar");
    assert_eq!(ids.len(), 4);
    for entity in ["Italy", "France"] {
        let width: f64 = ids
            .iter()
            .zip(chart.segments())
            .filter(|(_, s)| s.entity == entity)
            .map(|(id, _)| {
                let (x0, _, x1, _) = chart.scene().node(*id).unwrap().shape.bounds();
                x1 - x0
            })
            .sum();
        assert!(close(width, inner), "{}: {} vs {}", entity, width, inner);
    }
}

#[test]
fn stacked_extents_match_values() {
    let data = vec![StackedEntity::new("Germany", [("a", 4.0), ("b", 6.0)])];
    let cats = vec![CategorySpec::new("a", Rgb::BLACK), CategorySpec::new("b", Rgb::GRID)];
    let opts = StackedOptions {
        config: ChartConfig::sized(500.0, 300.0).vertical(true),
        ..StackedOptions::default()
    };
    let chart = stacked::draw(&data, &cats, &opts).unwrap().into_chart().unwrap();
    let extents: Vec<f64> = chart
        .scene()
        .ids_by_class("bar")
        .into_iter()
        .map(|id| chart.rendered_extent(id).unwrap())
        .collect();
    assert!(close(extents[0], 4.0));
    assert!(close(extents[1], 6.0));
}

#[test]
fn empty_input_draws_placeholder() {
    let rendered = bar::draw(&[], &[], &BarOptions::default()).unwrap();
    assert!(rendered.is_no_data());
    assert!(rendered.scene().texts().contains(&NO_DATA_TITLE));

    let rendered = line::draw(&[], &LineOptions::default()).unwrap();
    assert!(rendered.is_no_data());

    let rendered = alluvial::draw(&AlluvialData::default(), &AlluvialOptions::default()).unwrap();
    assert!(rendered.is_no_data());
}

#[test]
fn empty_grouped_stacked_and_faceted_input_draws_placeholder() {
    let rendered = grouped::draw(&[], &GroupedOptions::default()).unwrap();
    assert!(rendered.is_no_data());
    assert!(rendered.scene().texts().contains(&NO_DATA_TITLE));

    let cats = vec![CategorySpec::new("basic", Rgb::BLACK)];
    let rendered = stacked::draw(&[], &cats, &StackedOptions::default()).unwrap();
    assert!(rendered.is_no_data());
    assert!(rendered.scene().texts().contains(&NO_DATA_TITLE));

    let rendered = faceted::draw(&[], &FacetedOptions::default()).unwrap();
    assert!(rendered.is_no_data());
    assert!(rendered.scene().texts().contains(&NO_DATA_TITLE));
}

#[test]
fn grouped_rejects_a_group_missing_a_category() {
    let data = vec![
        BarGroup {
            label: "2020".into(),
            values: vec![Category::new("Male", 3.0), Category::new("Female", 4.0)],
        },
        BarGroup {
            label: "2021".into(),
            values: vec![Category::new("Male", 5.0)],
        },
    ];
    let err = grouped::draw(&data, &GroupedOptions::default()).err();
    assert_eq!(
        err,
        Some(ChartError::MissingCategory {
            entity: "2021".into(),
            category: "Female".into(),
        })
    );
}

#[test]
fn grouped_bars_start_at_a_raised_domain_minimum() {
    let data = vec![BarGroup {
        label: "2021".into(),
        values: vec![Category::new("Male", 30.0), Category::new("Female", 40.0)],
    }];
    let mut config = ChartConfig::sized(400.0, 300.0).vertical(true);
    config.domain_min = Some(20.0);
    let opts = GroupedOptions {
        config,
        ..GroupedOptions::default()
    };
    let rendered = grouped::draw(&data, &opts).unwrap();
    let bars: Vec<(f64, f64, f64, f64)> = rendered.scene().by_class("bar").map(|n| n.shape.bounds()).collect();
    assert_eq!(bars.len(), 2);
    let (_, top_a, _, bottom_a) = bars[0];
    let (_, top_b, _, bottom_b) = bars[1];
    assert!(close(bottom_a, bottom_b));
    assert!(close((bottom_b - top_b) / (bottom_a - top_a), 2.0));
}

#[test]
fn faceted_placeholder_keeps_the_configured_size() {
    let opts = FacetedOptions {
        config: ChartConfig::sized(500.0, 200.0),
        ..FacetedOptions::default()
    };
    let points: Vec<FacetedPoint> = Vec::new();
    let rendered = faceted::draw(&points, &opts).unwrap();
    assert_eq!((rendered.scene().width, rendered.scene().height), (500.0, 200.0));
}

#[test]
fn tooltip_flips_left_near_the_right_edge() {
    let container = ContainerRect::at_origin(400.0, 300.0);
    let pos = position_clamped(
        Pointer::new(390.0, 50.0),
        &container,
        Offsets::new(10.0, 40.0),
        (100.0, 40.0),
        (400.0, 300.0),
    );
    assert!(close(pos.x, 280.0));
    assert!(close(pos.y, 10.0));
}

#[test]
fn alluvial_rejects_three_layers_and_too_few_colors() {
    let three = AlluvialData {
        nodes: vec![labels(&["a"]), labels(&["b"]), labels(&["c"])],
        links: Vec::new(),
    };
    let err = alluvial::draw(&three, &AlluvialOptions::default()).err();
    assert_eq!(err, Some(ChartError::TooManyLayers(3)));

    let data = AlluvialData {
        nodes: vec![labels(&["Italy"]), labels(&["Basic", "Above basic"])],
        links: vec![LinkData {
            source: "Italy".into(),
            target: "Basic".into(),
            value: 3.0,
        }],
    };
    let opts = AlluvialOptions {
        colors: vec![Rgb::BLACK],
        ..AlluvialOptions::default()
    };
    let err = alluvial::draw(&data, &opts).err();
    assert!(matches!(err, Some(ChartError::ColorCountMismatch { colors: 1, items: 2, .. })));
}

#[test]
fn alluvial_draws_one_band_per_nonzero_flow() {
    let data = AlluvialData {
        nodes: vec![labels(&["Italy", "France"]), labels(&["Basic", "Above basic"])],
        links: vec![
            LinkData {
                source: "Italy".into(),
                target: "Basic".into(),
                value: 40.0,
            },
            LinkData {
                source: "Italy".into(),
                target: "Above basic".into(),
                value: 60.0,
            },
            LinkData {
                source: "France".into(),
                target: "Basic".into(),
                value: 55.0,
            },
        ],
    };
    let opts = AlluvialOptions {
        config: ChartConfig::sized(900.0, 500.0),
        ..AlluvialOptions::default()
    };
    let chart = alluvial::draw(&data, &opts).unwrap().into_chart().unwrap();
    assert_eq!(chart.scene().by_class("link").count(), 3);
}

#[test]
fn line_series_with_mismatched_lengths_error() {
    let series = vec![LineSeries::new("Italy", labels(&["2020", "2021"]), vec![1.0], Rgb::BLACK)];
    let err = line::draw(&series, &LineOptions::default()).err();
    assert!(matches!(err, Some(ChartError::LengthMismatch { left: 2, right: 1, .. })));
}

#[test]
fn hovered_chart_renders_to_svg_and_png() {
    let dir = tempfile::tempdir().unwrap();
    let mut chart = bar::draw(&labels(&["Italy", "France"]), &[3.5, 4.5], &BarOptions::default())
        .unwrap()
        .into_chart()
        .unwrap();
    let (x0, y0, x1, y1) = chart.scene().node(chart.bar_ids()[0]).unwrap().shape.bounds();
    let c = ContainerRect::at_origin(chart.scene().width, chart.scene().height);
    assert!(chart.pointer_move(Pointer::new((x0 + x1) / 2.0, (y0 + y1) / 2.0), &c).is_visible());
    let scene = chart.snapshot();
    assert!(scene.by_class("tooltip").count() > 0);

    let svg = dir.path().join("bars.svg");
    viz::render_scene(&scene, &svg).unwrap();
    let text = fs::read_to_string(&svg).unwrap();
    assert!(text.contains("<svg"));
    assert!(text.contains("Italy"));

    let png = dir.path().join("bars.png");
    viz::render_scene(&scene, &png).unwrap();
    let bytes = fs::read(&png).unwrap();
    assert_eq!(&bytes[..4], &[0x89, b'P', b'N', b'G']);
}
