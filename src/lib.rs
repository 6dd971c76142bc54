//! datavis
//!
//! Load, reshape and chart the EU digitalization and emissions datasets.
//! Pairs with the `datavis` CLI and the `datavis-gui` explorer.
//!
//! ### Features
//! - Fetch static CSV datasets from disk or over HTTP, in the background or blocking
//! - Reshape header-keyed rows into chart inputs driven by a page selection
//! - Bar, grouped, stacked, faceted, line, bubble and alluvial charts with hover tooltips
//! - Render any chart to SVG or PNG
//! - Serve the datasets and a JSON API route
//!
//! ### Example
//! ```no_run
//! use datavis::dataset::{DatasetSource, load_blocking};
//! use datavis::select::{ColumnMap, Selection, bar_input};
//! use datavis::viz::{self, bar};
//!
//! let source = DatasetSource::local("public/DataVis-Project/datasets");
//! let state = load_blocking(&source, "digital-skills/ilods-final.csv", |r, _| Some(r.clone()));
//! let rows = state.rows().unwrap_or_default();
//! let columns = ColumnMap::default();
//! let mut selection = Selection::defaults(rows, &columns, Some("Individuals with basic overall digital skills"));
//! selection.countries.clear();
//! let (x, y) = bar_input(rows, &selection, &columns);
//! let chart = bar::draw(&x, &y, &bar::BarOptions::default())?;
//! viz::render_scene(chart.scene(), "skills.svg")?;
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod dataset;
pub mod models;
pub mod render;
pub mod select;
pub mod server;
pub mod storage;
pub mod viz;

pub use dataset::{DatasetHandle, DatasetSource, LoadState, StaticConfig};
pub use models::{AlluvialData, LinkData, Record};
pub use viz::{Chart, ChartError, Rendered};
