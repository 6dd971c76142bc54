/*!
 * Desktop explorer for datavis - EU digitalization and emissions charts
 *
 * A cross-platform desktop application providing an interface for:
 * - Loading a CSV dataset in the background
 * - Mapping columns and choosing year, countries and metric
 * - Rendering any chart kind to PNG or SVG
 * - Switching between the charts and the choropleth map
 *
 * Platform support: Windows, macOS, Linux
 */

use anyhow::{Context, Result};
use datavis::dataset::{DatasetHandle, DatasetSource, LoadState};
use datavis::models::Record;
use datavis::render::{RenderRequest, render_records};
use datavis::select::{self, ColumnMap, Selection};
use datavis::viz::map::{self, Region};
use datavis::viz::tabs::{Tab, Tabs};
use datavis::viz::{ChartConfig, ChartError, ChartKind, ColorSource};
use eframe::egui;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;

fn main() -> Result<(), eframe::Error> {
    env_logger::init();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([820.0, 720.0])
            .with_min_inner_size([600.0, 400.0])
            .with_title("datavis - EU digitalization & emissions"),
        ..Default::default()
    };

    eframe::run_native(
        "datavis",
        options,
        Box::new(|_cc| Ok(Box::new(DatavisApp::new()?))),
    )
}

#[derive(Debug, Clone, PartialEq)]
enum PlotFormat {
    Png,
    Svg,
}

#[derive(Debug)]
enum OperationResult {
    Success(String),
    Error(String),
}

/// Values offered by the selection widgets, refreshed after each load.
#[derive(Default)]
struct Choices {
    years: Vec<String>,
    countries: Vec<String>,
    metrics: Vec<String>,
}

/// Main application state
struct DatavisApp {
    // Dataset
    data_path: String,
    dataset: Option<DatasetHandle<Record>>,
    rows: Vec<Record>,
    choices: Choices,

    // Column mapping
    label_col: String,
    value_col: String,
    category_col: String,
    year_col: String,
    country_col: String,
    metric_col: String,
    count_col: String,

    // Selection
    selection: Selection,

    // Chart options
    views: Tabs<ChartKind>,
    plot_format: PlotFormat,
    plot_width: u32,
    plot_height: u32,
    vertical: bool,
    percentage: bool,
    colors: String,
    locale: String,
    output_path: String,

    // Map options
    geojson_path: String,
    name_property: String,
    zoom: f64,

    // UI state
    is_rendering: bool,
    status_message: String,
    error_message: String,

    // Background render
    operation_receiver: Option<mpsc::Receiver<OperationResult>>,
}

impl DatavisApp {
    fn new() -> Result<Self, ChartError> {
        // Default to user's home directory for output
        let home_dir = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .to_string_lossy()
            .to_string();
        let defaults = ColumnMap::default();

        let views = Tabs::new(vec![Tab::new("Charts", ChartKind::Bar), Tab::new("Map", ChartKind::Map)])?;

        Ok(Self {
            data_path: String::new(),
            dataset: None,
            rows: Vec::new(),
            choices: Choices::default(),

            label_col: defaults.label,
            value_col: defaults.value,
            category_col: String::new(),
            year_col: defaults.year.unwrap_or_default(),
            country_col: defaults.country.unwrap_or_default(),
            metric_col: defaults.metric.unwrap_or_default(),
            count_col: String::new(),

            selection: Selection::default(),

            views,
            plot_format: PlotFormat::Png,
            plot_width: 820,
            plot_height: 550,
            vertical: false,
            percentage: false,
            colors: String::new(),
            locale: "en".to_string(),
            output_path: home_dir,

            geojson_path: String::new(),
            name_property: map::NAME_PROPERTY.to_string(),
            zoom: map::MIN_ZOOM,

            is_rendering: false,
            status_message: String::new(),
            error_message: String::new(),
            operation_receiver: None,
        })
    }

    fn kind(&self) -> ChartKind {
        self.views.active_tab().content
    }

    fn is_loading(&self) -> bool {
        self.dataset.as_ref().is_some_and(|h| h.state().is_loading())
    }

    /// Mapped columns; blank fields and columns missing from the dataset are dropped.
    fn columns(&self) -> ColumnMap {
        let has = |c: &str| {
            let c = c.trim();
            (!c.is_empty() && self.rows.first().is_some_and(|r| r.get(c).is_some())).then(|| c.to_string())
        };
        ColumnMap {
            label: self.label_col.trim().to_string(),
            value: self.value_col.trim().to_string(),
            category: has(&self.category_col),
            year: has(&self.year_col),
            country: has(&self.country_col),
            metric: has(&self.metric_col),
            count: has(&self.count_col),
        }
    }

    fn start_load(&mut self) {
        let path = PathBuf::from(self.data_path.trim());
        let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            self.error_message = "Please choose a CSV file".to_string();
            return;
        };
        let root = path.parent().map(Path::to_path_buf).unwrap_or_default();
        self.error_message.clear();
        self.status_message = format!("Loading {}...", name);
        // Replacing the handle cancels any load still running.
        self.dataset = Some(DatasetHandle::spawn(DatasetSource::local(root), name, |r, _| {
            Some(r.clone())
        }));
    }

    fn check_dataset(&mut self) {
        let Some(handle) = self.dataset.as_mut() else {
            return;
        };
        let was_loading = handle.state().is_loading();
        let state = handle.poll();
        if !was_loading || state.is_loading() {
            return;
        }
        match state {
            LoadState::Loaded(rows) => {
                self.rows = rows.clone();
                self.refresh_choices();
                self.status_message = format!("Loaded {} rows", self.rows.len());
            }
            LoadState::Failed(e) => {
                self.error_message = format!("Failed to load dataset: {}", e);
                self.status_message.clear();
            }
            LoadState::Loading => {}
        }
    }

    fn refresh_choices(&mut self) {
        let columns = self.columns();
        let unique = |c: &Option<String>| {
            c.as_deref()
                .map(|c| select::unique_values(&self.rows, c))
                .unwrap_or_default()
        };
        self.choices = Choices {
            years: unique(&columns.year),
            countries: unique(&columns.country),
            metrics: unique(&columns.metric),
        };
        self.selection = Selection::defaults(&self.rows, &columns, None);
    }

    fn validate_inputs(&self) -> Result<()> {
        if self.rows.is_empty() {
            anyhow::bail!("Please load a dataset with at least one row");
        }
        if self.value_col.trim().is_empty() || self.label_col.trim().is_empty() {
            anyhow::bail!("Please name the label and value columns");
        }
        let kind = self.kind();
        if kind == ChartKind::Alluvial && self.category_col.trim().is_empty() {
            anyhow::bail!("Alluvial charts need a category (destination) column");
        }
        if kind.needs_regions() && self.geojson_path.trim().is_empty() {
            anyhow::bail!("Map charts need a GeoJSON file with the region outlines");
        }
        if self.output_path.trim().is_empty() {
            anyhow::bail!("Please specify an output directory");
        }
        if self.plot_width < 200 || self.plot_width > 3000 {
            anyhow::bail!("Chart width must be between 200 and 3000 pixels");
        }
        if self.plot_height < 200 || self.plot_height > 3000 {
            anyhow::bail!("Chart height must be between 200 and 3000 pixels");
        }
        if !self.colors.trim().is_empty() && ColorSource::parse(&self.colors).is_none() {
            anyhow::bail!("Colors must be a ramp name or comma-separated hex colors");
        }
        Ok(())
    }

    fn load_regions(&self) -> Result<Vec<Region>> {
        let path = self.geojson_path.trim();
        let text = fs::read_to_string(path).with_context(|| format!("read {}", path))?;
        map::parse_regions(&text, self.name_property.trim())
    }

    fn start_render(&mut self) {
        if let Err(err) = self.validate_inputs() {
            self.error_message = format!("Validation error: {}", err);
            return;
        }
        let kind = self.kind();
        let regions = if kind.needs_regions() {
            match self.load_regions() {
                Ok(regions) => regions,
                Err(err) => {
                    self.error_message = format!("Failed to read region outlines: {:#}", err);
                    return;
                }
            }
        } else {
            Vec::new()
        };

        self.is_rendering = true;
        self.error_message.clear();
        self.status_message = "Rendering chart...".to_string();

        let (sender, receiver) = mpsc::channel();
        self.operation_receiver = Some(receiver);

        // Clone the data we need for the background thread
        let rows = self.rows.clone();
        let selection = self.selection.clone();
        let columns = self.columns();
        let mut config = ChartConfig::sized(self.plot_width as f64, self.plot_height as f64).vertical(self.vertical);
        config.locale = self.locale.clone();
        if let Some(colors) = ColorSource::parse(&self.colors) {
            config = config.colors(colors);
        }
        let request = RenderRequest {
            percentage: self.percentage,
            regions,
            zoom: self.zoom,
            ..RenderRequest::new(kind, config)
        };
        let extension = match self.plot_format {
            PlotFormat::Png => "png",
            PlotFormat::Svg => "svg",
        };
        let out = PathBuf::from(&self.output_path).join(format!("datavis_{}.{}", kind.name(), extension));

        thread::spawn(move || {
            let result = match render_records(&rows, &selection, &columns, &request, &out) {
                Ok(scene) => OperationResult::Success(format!(
                    "Chart written ({} shapes)\n\nFile created:\n{}",
                    scene.len(),
                    out.display()
                )),
                Err(err) => OperationResult::Error(format!("Failed to create chart: {:#}", err)),
            };
            let _ = sender.send(result);
        });
    }

    fn check_operation_result(&mut self) {
        if let Some(receiver) = &self.operation_receiver
            && let Ok(result) = receiver.try_recv()
        {
            self.is_rendering = false;
            self.operation_receiver = None;

            match result {
                OperationResult::Success(message) => {
                    self.status_message = message;
                    self.error_message.clear();
                }
                OperationResult::Error(error) => {
                    self.error_message = error;
                    self.status_message.clear();
                }
            }
        }
    }

    fn selection_ui(&mut self, ui: &mut egui::Ui) {
        if !self.choices.years.is_empty() {
            ui.horizontal(|ui| {
                ui.label("Year:");
                egui::ComboBox::from_id_salt("year")
                    .selected_text(self.selection.year.clone().unwrap_or_default())
                    .show_ui(ui, |ui| {
                        for y in &self.choices.years {
                            ui.selectable_value(&mut self.selection.year, Some(y.clone()), y);
                        }
                    });
            });
        }
        if !self.choices.metrics.is_empty() {
            ui.horizontal(|ui| {
                ui.label("Metric:");
                egui::ComboBox::from_id_salt("metric")
                    .selected_text(self.selection.metric.clone().unwrap_or_default())
                    .show_ui(ui, |ui| {
                        for m in &self.choices.metrics {
                            ui.selectable_value(&mut self.selection.metric, Some(m.clone()), m);
                        }
                    });
            });
        }
        if !self.choices.countries.is_empty() {
            ui.collapsing(format!("Countries ({} selected, none = all)", self.selection.countries.len()), |ui| {
                ui.horizontal_wrapped(|ui| {
                    for c in &self.choices.countries {
                        let mut on = self.selection.countries.contains(c);
                        if ui.checkbox(&mut on, c).changed() {
                            self.selection.toggle_country(c);
                        }
                    }
                });
                if ui.button("Clear").clicked() {
                    self.selection.set_countries(Vec::new());
                }
            });
        }
    }
}

impl DatavisApp {
    fn map_ui(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label("GeoJSON file:");
            ui.text_edit_singleline(&mut self.geojson_path);
            if ui.button("Browse").clicked()
                && let Some(path) = rfd::FileDialog::new()
                    .add_filter("GeoJSON", &["geojson", "json"])
                    .pick_file()
            {
                self.geojson_path = path.to_string_lossy().to_string();
            }
        });
        ui.horizontal(|ui| {
            ui.label("Name property:");
            ui.text_edit_singleline(&mut self.name_property)
                .on_hover_text("Feature property holding the country name");
        });
        ui.horizontal(|ui| {
            ui.label("Zoom:");
            ui.add(egui::Slider::new(&mut self.zoom, map::MIN_ZOOM..=map::MAX_ZOOM));
        });
    }
}

impl eframe::App for DatavisApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Check for completed background work
        self.check_dataset();
        self.check_operation_result();

        // Request repaint while busy (for spinner animation)
        if self.is_rendering || self.is_loading() {
            ctx.request_repaint();
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                ui.heading("EU Digitalization & Emissions Charts");
                ui.add_space(10.0);

                // Dataset section
                ui.group(|ui| {
                    ui.label("Dataset");
                    ui.add_space(5.0);

                    ui.horizontal(|ui| {
                        ui.label("CSV file:");
                        ui.text_edit_singleline(&mut self.data_path);
                        if ui.button("Browse").clicked()
                            && let Some(path) = rfd::FileDialog::new().add_filter("CSV", &["csv"]).pick_file()
                        {
                            self.data_path = path.to_string_lossy().to_string();
                        }
                        if ui.add_enabled(!self.is_loading(), egui::Button::new("Load")).clicked() {
                            self.start_load();
                        }
                        if self.is_loading() {
                            ui.spinner();
                        }
                    });
                });

                ui.add_space(10.0);

                // Column mapping section
                ui.group(|ui| {
                    ui.label("Columns");
                    ui.add_space(5.0);
                    let fields: [(&str, &mut String, &str); 7] = [
                        ("Label:", &mut self.label_col, "Categorical axis: bar labels, stacked entities, facets, alluvial sources"),
                        ("Value:", &mut self.value_col, "Numeric values"),
                        ("Category:", &mut self.category_col, "Stack/group categories or alluvial destinations"),
                        ("Year:", &mut self.year_col, "Year column used by the year selector"),
                        ("Country:", &mut self.country_col, "Country column used by the country selector"),
                        ("Metric:", &mut self.metric_col, "Metric column used by the metric selector"),
                        ("Count:", &mut self.count_col, "Optional weight for bubble sizes and alluvial head counts"),
                    ];
                    for (label, value, hint) in fields {
                        ui.horizontal(|ui| {
                            ui.label(label);
                            ui.text_edit_singleline(value).on_hover_text(hint);
                        });
                    }
                    if ui.add_enabled(!self.rows.is_empty(), egui::Button::new("Apply columns")).clicked() {
                        self.refresh_choices();
                    }
                });

                ui.add_space(10.0);

                ui.group(|ui| {
                    ui.label("Selection");
                    ui.add_space(5.0);
                    if self.rows.is_empty() {
                        ui.label("Load a dataset to choose year, countries and metric.");
                    } else {
                        self.selection_ui(ui);
                    }
                });

                ui.add_space(10.0);

                // Chart section
                ui.group(|ui| {
                    ui.label("Chart");
                    ui.add_space(5.0);

                    ui.horizontal(|ui| {
                        let active = self.views.active();
                        let labels: Vec<String> = self.views.labels().map(str::to_string).collect();
                        for (i, label) in labels.iter().enumerate() {
                            if ui.selectable_label(i == active, label).clicked() {
                                self.views.select(i);
                            }
                        }
                    });

                    if self.kind().needs_regions() {
                        self.map_ui(ui);
                    } else {
                        ui.horizontal(|ui| {
                            ui.label("Chart type:");
                            let kind = self.views.active_content_mut();
                            egui::ComboBox::from_id_salt("kind")
                                .selected_text(kind.name())
                                .show_ui(ui, |ui| {
                                    for k in ChartKind::ALL.into_iter().filter(|k| !k.needs_regions()) {
                                        ui.selectable_value(kind, k, k.name());
                                    }
                                });
                        });
                    }

                    ui.horizontal(|ui| {
                        ui.label("Format:");
                        ui.radio_value(&mut self.plot_format, PlotFormat::Png, "PNG");
                        ui.radio_value(&mut self.plot_format, PlotFormat::Svg, "SVG");
                    });

                    ui.horizontal(|ui| {
                        ui.label("Dimensions:");
                        ui.add(egui::DragValue::new(&mut self.plot_width).range(200..=3000));
                        ui.label("×");
                        ui.add(egui::DragValue::new(&mut self.plot_height).range(200..=3000));
                        ui.label("pixels");
                    });

                    ui.checkbox(&mut self.vertical, "Vertical bars");
                    if self.kind() == ChartKind::Stacked {
                        ui.checkbox(&mut self.percentage, "Show as percentage of total");
                    }

                    ui.horizontal(|ui| {
                        ui.label("Output path:");
                        ui.text_edit_singleline(&mut self.output_path);
                        if ui.button("Browse").clicked()
                            && let Some(path) = rfd::FileDialog::new().pick_folder()
                        {
                            self.output_path = path.to_string_lossy().to_string();
                        }
                    });
                });

                ui.add_space(10.0);

                ui.collapsing("Advanced Options", |ui| {
                    ui.horizontal(|ui| {
                        ui.label("Colors:");
                        ui.text_edit_singleline(&mut self.colors)
                            .on_hover_text("blues, viridis, office, category10, or #hex,#hex,...");
                    });

                    ui.horizontal(|ui| {
                        ui.label("Locale:");
                        egui::ComboBox::from_id_salt("locale")
                            .selected_text(&self.locale)
                            .show_ui(ui, |ui| {
                                ui.selectable_value(&mut self.locale, "en".to_string(), "English (en)");
                                ui.selectable_value(&mut self.locale, "de".to_string(), "German (de)");
                                ui.selectable_value(&mut self.locale, "fr".to_string(), "French (fr)");
                                ui.selectable_value(&mut self.locale, "es".to_string(), "Spanish (es)");
                                ui.selectable_value(&mut self.locale, "it".to_string(), "Italian (it)");
                            });
                    });
                });

                ui.add_space(15.0);

                // Action buttons
                ui.horizontal(|ui| {
                    let ready = !self.is_rendering && !self.rows.is_empty();
                    if ui.add_enabled(ready, egui::Button::new("Render Chart")).clicked() {
                        self.start_render();
                    }

                    if self.is_rendering {
                        ui.spinner();
                        ui.label("Processing...");
                    }
                });

                ui.add_space(10.0);

                // Status messages
                if !self.status_message.is_empty() {
                    ui.colored_label(egui::Color32::DARK_GREEN, &self.status_message);
                }

                if !self.error_message.is_empty() {
                    ui.colored_label(egui::Color32::RED, &self.error_message);
                }
            });
        });
    }
}
