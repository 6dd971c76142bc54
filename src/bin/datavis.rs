use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use datavis::dataset::{DatasetSource, LoadState, StaticConfig, load_blocking};
use datavis::models::Record;
use datavis::render::{RenderRequest, render_records};
use datavis::select::{ColumnMap, Selection};
use datavis::server::{self, ServerConfig};
use datavis::viz::map::{self, Region};
use datavis::viz::{ChartConfig, ChartKind, ColorSource};
use datavis::storage;
use std::io::Read;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(
    name = "datavis",
    version,
    about = "Chart & serve EU digitalization and emissions datasets"
)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Draw a chart from a CSV dataset to SVG or PNG.
    Render(RenderArgs),
    /// Serve the datasets directory and the JSON API route.
    Serve(ServeArgs),
    /// Re-save a CSV dataset as CSV or JSON.
    Export(ExportArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum KindArg {
    Bar,
    Grouped,
    Stacked,
    Faceted,
    Line,
    Bubble,
    Alluvial,
    Map,
}

impl From<KindArg> for ChartKind {
    fn from(k: KindArg) -> Self {
        match k {
            KindArg::Bar => ChartKind::Bar,
            KindArg::Grouped => ChartKind::Grouped,
            KindArg::Stacked => ChartKind::Stacked,
            KindArg::Faceted => ChartKind::Faceted,
            KindArg::Line => ChartKind::Line,
            KindArg::Bubble => ChartKind::Bubble,
            KindArg::Alluvial => ChartKind::Alluvial,
            KindArg::Map => ChartKind::Map,
        }
    }
}

#[derive(ValueEnum, Clone, Debug)]
enum OutFormat {
    Csv,
    Json,
}

#[derive(Args, Debug)]
struct DataArgs {
    /// CSV dataset: a file path, or a path under <base-url><base-path>/datasets/ with --base-url.
    #[arg(long)]
    data: String,
    /// Fetch the dataset over HTTP from this origin (e.g., http://localhost:3000).
    #[arg(long)]
    base_url: Option<String>,
    /// Mount point of the static files on the remote origin.
    #[arg(long, default_value = "/DataVis-Project")]
    base_path: String,
}

#[derive(Args, Debug)]
struct RenderArgs {
    /// Chart kind.
    #[arg(value_enum)]
    kind: KindArg,
    #[command(flatten)]
    data: DataArgs,
    /// Output path (.svg or .png).
    #[arg(long)]
    out: PathBuf,
    /// Column of the categorical axis (bar labels, stacked entities, facets, alluvial sources).
    #[arg(long, default_value = "geo")]
    label: String,
    /// Column holding the values.
    #[arg(long, default_value = "obs_value")]
    value: String,
    /// Second categorical column (stack/group categories, alluvial destinations).
    #[arg(long)]
    category: Option<String>,
    /// Year column; ignored when absent from the dataset.
    #[arg(long, default_value = "time_period")]
    year_col: String,
    /// Country column; ignored when absent from the dataset.
    #[arg(long, default_value = "geo")]
    country_col: String,
    /// Metric column; ignored when absent from the dataset.
    #[arg(long, default_value = "indic_is")]
    metric_col: String,
    /// Weight column for bubble sizes and alluvial head counts.
    #[arg(long)]
    count_col: Option<String>,
    /// Selected year (default: the latest).
    #[arg(long)]
    year: Option<String>,
    /// Selected countries separated by comma or semicolon (default: all; line charts pick a few).
    #[arg(long)]
    countries: Option<String>,
    /// Selected metric (default: the first one).
    #[arg(long)]
    metric: Option<String>,
    /// Width of the chart (default 820).
    #[arg(long, default_value_t = 820.0)]
    width: f64,
    /// Height of the chart (default 550).
    #[arg(long, default_value_t = 550.0)]
    height: f64,
    /// Categories on the x axis instead of down the y axis.
    #[arg(long, default_value_t = false)]
    vertical: bool,
    /// Stacked bars as shares of each entity's total.
    #[arg(long, default_value_t = false)]
    percentage: bool,
    /// Color ramp (blues, viridis, office, category10) or comma-separated hex colors.
    #[arg(long)]
    colors: Option<String>,
    /// Unit appended to values.
    #[arg(long)]
    unit: Option<String>,
    /// Faceted page, 0-based.
    #[arg(long, default_value_t = 0)]
    page: usize,
    /// GeoJSON region outlines for map charts, located like --data.
    #[arg(long)]
    geojson: Option<String>,
    /// Feature property holding the region name.
    #[arg(long, default_value = map::NAME_PROPERTY)]
    name_property: String,
    /// Map zoom factor (1 to 15).
    #[arg(long, default_value_t = 1.0)]
    zoom: f64,
    /// Hover the chart at X,Y before saving, to include a tooltip.
    #[arg(long)]
    hover: Option<String>,
    /// Also save the drawn scene as JSON.
    #[arg(long)]
    scene_json: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Address to listen on.
    #[arg(long, default_value = "127.0.0.1:3000")]
    addr: SocketAddr,
    /// Directory containing datasets/.
    #[arg(long, default_value = ".")]
    root: PathBuf,
    /// Mount point of the datasets.
    #[arg(long, default_value = "/DataVis-Project")]
    base_path: String,
    /// CSV read by /api/emissions, relative to --root.
    #[arg(long, default_value = server::DEFAULT_EMISSIONS_CSV)]
    emissions_csv: PathBuf,
}

#[derive(Args, Debug)]
struct ExportArgs {
    #[command(flatten)]
    data: DataArgs,
    /// Output path.
    #[arg(long)]
    out: PathBuf,
    /// Output format (csv or json). If omitted, inferred from --out extension.
    #[arg(long, value_enum)]
    format: Option<OutFormat>,
}

fn parse_list(s: &str) -> Vec<String> {
    s.split([',', ';'])
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect()
}

fn parse_point(s: &str) -> Option<(f64, f64)> {
    let (a, b) = s.split_once(',')?;
    Some((a.trim().parse().ok()?, b.trim().parse().ok()?))
}

/// Source and file name of `name`: a local path, or a dataset under --base-url.
fn locate(args: &DataArgs, name: &str) -> Result<(DatasetSource, String)> {
    match &args.base_url {
        Some(url) => Ok((
            DatasetSource::http(url.clone(), StaticConfig::new(args.base_path.clone())),
            name.to_string(),
        )),
        None => {
            let path = Path::new(name);
            let root = path.parent().map(Path::to_path_buf).unwrap_or_default();
            let file = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| anyhow::anyhow!("{} must name a file", name))?;
            Ok((DatasetSource::local(root), file))
        }
    }
}

fn load_records(args: &DataArgs) -> Result<Vec<Record>> {
    let (source, dataset) = locate(args, &args.data)?;
    match load_blocking(&source, &dataset, |r, _| Some(r.clone())) {
        LoadState::Loaded(rows) => Ok(rows),
        LoadState::Failed(e) => bail!("{}", e),
        LoadState::Loading => bail!("dataset did not finish loading"),
    }
}

fn load_regions(args: &DataArgs, geojson: &str, name_property: &str) -> Result<Vec<Region>> {
    let (source, file) = locate(args, geojson)?;
    let mut text = String::new();
    source
        .open(&file)?
        .read_to_string(&mut text)
        .with_context(|| format!("read {}", source.locate(&file)))?;
    map::parse_regions(&text, name_property).with_context(|| format!("regions from {}", geojson))
}

/// `Some(col)` when the dataset has that column.
fn present(rows: &[Record], col: &str) -> Option<String> {
    rows.first()
        .filter(|r| r.get(col).is_some())
        .map(|_| col.to_string())
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Serve(args) => cmd_serve(args),
        Command::Export(args) => cmd_export(args),
    }
}

fn cmd_render(args: RenderArgs) -> Result<()> {
    let rows = load_records(&args.data)?;
    let kind = ChartKind::from(args.kind);
    let columns = ColumnMap {
        label: args.label.clone(),
        value: args.value.clone(),
        category: args.category.clone(),
        year: present(&rows, &args.year_col),
        country: present(&rows, &args.country_col),
        metric: present(&rows, &args.metric_col),
        count: args.count_col.clone(),
    };
    if kind.needs_category() && columns.category.is_none() {
        if kind == ChartKind::Alluvial {
            bail!("alluvial charts need --category (the destination column)");
        }
        log::warn!("no --category given; using {} as the only category", columns.value);
    }

    let mut selection = Selection::defaults(&rows, &columns, args.metric.as_deref());
    if let Some(y) = &args.year {
        selection.set_year(y.clone());
    }
    let countries = args.countries.as_deref().map(parse_list).unwrap_or_default();
    if !countries.is_empty() || !matches!(kind, ChartKind::Line | ChartKind::Bubble) {
        selection.set_countries(countries);
    }

    let mut config = ChartConfig::sized(args.width, args.height).vertical(args.vertical);
    if let Some(spec) = &args.colors {
        let colors = ColorSource::parse(spec).ok_or_else(|| anyhow::anyhow!("invalid --colors: {}", spec))?;
        config = config.colors(colors);
    }
    if let Some(u) = &args.unit {
        config = config.unit(u.clone());
    }
    let hover = match &args.hover {
        Some(s) => Some(parse_point(s).ok_or_else(|| anyhow::anyhow!("invalid --hover, expected X,Y"))?),
        None => None,
    };

    let regions = match &args.geojson {
        Some(g) => load_regions(&args.data, g, &args.name_property)?,
        None if kind.needs_regions() => bail!("map charts need --geojson (the region outlines)"),
        None => Vec::new(),
    };

    let request = RenderRequest {
        percentage: args.percentage,
        page: args.page,
        hover,
        regions,
        zoom: args.zoom,
        ..RenderRequest::new(kind, config)
    };
    let scene = render_records(&rows, &selection, &columns, &request, &args.out)?;
    eprintln!(
        "Wrote {} chart ({} rows, year {}, {}) to {}",
        kind.name(),
        rows.len(),
        selection.year.as_deref().unwrap_or("any"),
        selection.metric.as_deref().unwrap_or("all metrics"),
        args.out.display()
    );
    if let Some(path) = &args.scene_json {
        storage::save_scene_json(&scene, path)?;
        eprintln!("Saved scene to {}", path.display());
    }
    Ok(())
}

fn cmd_serve(args: ServeArgs) -> Result<()> {
    let config = ServerConfig {
        root: args.root,
        emissions_csv: args.emissions_csv,
        static_config: StaticConfig::new(args.base_path),
    };
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(server::serve(args.addr, config))
}

fn cmd_export(args: ExportArgs) -> Result<()> {
    let rows = load_records(&args.data)?;
    let path = &args.out;
    let fmt = match args.format {
        Some(OutFormat::Csv) => "csv",
        Some(OutFormat::Json) => "json",
        None => path.extension().and_then(|e| e.to_str()).unwrap_or("csv"),
    }
    .to_ascii_lowercase();
    match fmt.as_str() {
        "csv" => storage::save_csv(&rows, path)?,
        "json" => storage::save_json(&rows, path)?,
        other => bail!("unsupported format: {}", other),
    }
    eprintln!("Saved {} rows to {}", rows.len(), path.display());
    Ok(())
}
