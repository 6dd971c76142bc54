//! Public configuration and result types shared by the chart components.

use serde::Serialize;
use std::sync::Arc;

use super::color::ColorSource;
use super::scene::Scene;
use super::tooltip::TooltipContent;

/// Which axis carries the categories.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// Categories on x, values on y.
    Vertical,
    /// Categories down the y axis, values along x.
    #[default]
    Horizontal,
}

impl Orientation {
    pub fn from_vertical(vertical: bool) -> Self {
        if vertical {
            Orientation::Vertical
        } else {
            Orientation::Horizontal
        }
    }

    pub fn is_vertical(self) -> bool {
        matches!(self, Orientation::Vertical)
    }
}

/// Chart kinds this crate can draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Bar,
    Grouped,
    Stacked,
    Faceted,
    Line,
    Bubble,
    Alluvial,
    Map,
}

impl ChartKind {
    pub const ALL: [ChartKind; 8] = [
        ChartKind::Bar,
        ChartKind::Grouped,
        ChartKind::Stacked,
        ChartKind::Faceted,
        ChartKind::Line,
        ChartKind::Bubble,
        ChartKind::Alluvial,
        ChartKind::Map,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ChartKind::Bar => "bar",
            ChartKind::Grouped => "grouped",
            ChartKind::Stacked => "stacked",
            ChartKind::Faceted => "faceted",
            ChartKind::Line => "line",
            ChartKind::Bubble => "bubble",
            ChartKind::Alluvial => "alluvial",
            ChartKind::Map => "map",
        }
    }

    /// Kinds that read a second categorical column.
    pub fn needs_category(self) -> bool {
        matches!(self, ChartKind::Grouped | ChartKind::Stacked | ChartKind::Alluvial)
    }

    /// Kinds drawn over region outlines.
    pub fn needs_regions(self) -> bool {
        self == ChartKind::Map
    }
}

/// Resolved pixel margins around the plot area.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Margin {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Margin {
    pub const fn new(top: f64, right: f64, bottom: f64, left: f64) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }
}

/// Caller-supplied margins; each omitted side falls back to the chart's default.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MarginSpec {
    pub top: Option<f64>,
    pub right: Option<f64>,
    pub bottom: Option<f64>,
    pub left: Option<f64>,
}

impl MarginSpec {
    pub fn resolve(&self, defaults: Margin) -> Margin {
        Margin {
            top: self.top.unwrap_or(defaults.top),
            right: self.right.unwrap_or(defaults.right),
            bottom: self.bottom.unwrap_or(defaults.bottom),
            left: self.left.unwrap_or(defaults.left),
        }
    }
}

/// Optional override for tooltip content.
pub type TooltipMapper<T> = Arc<dyn Fn(&T) -> TooltipContent + Send + Sync>;

/// Options shared by every chart component.
///
/// Fields left as `None` take the per-chart default.
#[derive(Debug, Clone)]
pub struct ChartConfig {
    pub width: f64,
    pub height: f64,
    pub margin: MarginSpec,
    pub colors: Option<ColorSource>,
    pub x_label: Option<String>,
    pub y_label: Option<String>,
    /// Unit appended to values in tooltips and ticks.
    pub unit: Option<String>,
    /// Prefix placed before values in tooltips and ticks.
    pub prefix: Option<String>,
    pub orientation: Orientation,
    pub domain_min: Option<f64>,
    pub domain_max: Option<f64>,
    /// Locale tag for number formatting, e.g. `en` or `de`.
    pub locale: String,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            width: 820.0,
            height: 550.0,
            margin: MarginSpec::default(),
            colors: None,
            x_label: None,
            y_label: None,
            unit: None,
            prefix: None,
            orientation: Orientation::default(),
            domain_min: None,
            domain_max: None,
            locale: "en".to_string(),
        }
    }
}

impl ChartConfig {
    pub fn sized(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    pub fn vertical(mut self, vertical: bool) -> Self {
        self.orientation = Orientation::from_vertical(vertical);
        self
    }

    pub fn colors(mut self, colors: ColorSource) -> Self {
        self.colors = Some(colors);
        self
    }

    pub fn unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn margin(mut self, margin: MarginSpec) -> Self {
        self.margin = margin;
        self
    }

    pub(crate) fn unit_str(&self) -> &str {
        self.unit.as_deref().unwrap_or("")
    }

    pub(crate) fn prefix_str(&self) -> &str {
        self.prefix.as_deref().unwrap_or("")
    }
}

/// Outcome of a draw: the "no data" placeholder or an interactive chart.
#[derive(Debug)]
pub enum Rendered<C> {
    NoData(Scene),
    Chart(C),
}

impl<C: super::Chart> Rendered<C> {
    pub fn scene(&self) -> &Scene {
        match self {
            Rendered::NoData(s) => s,
            Rendered::Chart(c) => c.scene(),
        }
    }

    pub fn is_no_data(&self) -> bool {
        matches!(self, Rendered::NoData(_))
    }

    pub fn chart(&self) -> Option<&C> {
        match self {
            Rendered::Chart(c) => Some(c),
            Rendered::NoData(_) => None,
        }
    }

    pub fn chart_mut(&mut self) -> Option<&mut C> {
        match self {
            Rendered::Chart(c) => Some(c),
            Rendered::NoData(_) => None,
        }
    }

    pub fn into_chart(self) -> Option<C> {
        match self {
            Rendered::Chart(c) => Some(c),
            Rendered::NoData(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn omitted_margin_sides_use_defaults() {
        let spec = MarginSpec {
            bottom: Some(30.0),
            left: Some(0.0),
            ..MarginSpec::default()
        };
        let m = spec.resolve(Margin::new(20.0, 0.0, 40.0, 30.0));
        assert_eq!(m, Margin::new(20.0, 0.0, 30.0, 0.0));
    }
}
