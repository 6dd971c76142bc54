//! Chart components: bar, grouped bar, stacked bar, faceted bar, line, bubble,
//! alluvial and the choropleth map.
//!
//! Every `draw` validates its input, then builds a fresh [`Scene`]. Hover is
//! driven through the [`Chart`] trait; the resulting scene can be written to
//! **SVG** or **PNG** with [`render_scene`].

pub mod alluvial;
pub mod axis;
pub mod backend;
pub mod bar;
pub mod bubble;
pub mod color;
pub mod error;
pub mod faceted;
pub mod force;
pub mod grouped;
pub mod legend;
pub mod line;
pub mod map;
pub mod sankey;
pub mod scale;
pub mod scene;
pub mod stacked;
pub mod tabs;
pub mod text;
pub mod tooltip;
pub mod types;
pub mod util;

pub use color::{ColorSource, Rgb};
pub use error::ChartError;
pub use scene::{NodeId, Scene};
pub use tooltip::{ContainerRect, Pointer, TooltipState};
pub use types::{ChartConfig, ChartKind, Margin, MarginSpec, Orientation, Rendered};

use anyhow::{Context, Result};
use plotters::prelude::*;
use plotters_bitmap::BitMapBackend;
use plotters_svg::SVGBackend;
use std::path::Path;
use std::sync::Once;

/// A drawn, interactive chart.
pub trait Chart {
    fn scene(&self) -> &Scene;

    fn tooltip(&self) -> &TooltipState;

    /// Update hover state for a pointer at page coordinates inside `container`.
    fn pointer_move(&mut self, pointer: Pointer, container: &ContainerRect) -> &TooltipState;

    /// Restore resting opacities and hide the tooltip.
    fn pointer_leave(&mut self);

    /// Scene with the current tooltip drawn on top.
    fn snapshot(&self) -> Scene {
        let mut scene = self.scene().clone();
        self.tooltip().overlay(&mut scene);
        scene
    }
}

/// Set every node of `class` to `dim`, then node `id` to `full`.
pub(crate) fn highlight(scene: &mut Scene, class: &str, id: NodeId, dim: f64, full: f64) {
    scene.set_opacity(class, dim, |_| true);
    if let Some(n) = scene.node_mut(id) {
        n.paint.opacity = full;
    }
}

/// One-time registration for a fallback "sans-serif" font when using the `ab_glyph` text path.
/// Required because `ab_glyph` doesn't discover OS fonts.
static INIT_FONTS: Once = Once::new();

fn ensure_fonts_registered() {
    INIT_FONTS.call_once(|| {
        let _ = plotters::style::register_font(
            "sans-serif",
            plotters::style::FontStyle::Normal,
            include_bytes!("../../assets/DejaVuSans.ttf"),
        );
    });
}

fn canvas_size(scene: &Scene) -> (u32, u32) {
    (scene.width.ceil().max(1.0) as u32, scene.height.ceil().max(1.0) as u32)
}

/// Write `scene` to `out_path`: SVG when the extension is `svg`, PNG otherwise.
pub fn render_scene<P: AsRef<Path>>(scene: &Scene, out_path: P) -> Result<()> {
    ensure_fonts_registered();
    let out_path = out_path.as_ref();
    let path_string = out_path.to_string_lossy().into_owned();
    let size = canvas_size(scene);
    let drawn = if out_path.extension().and_then(|s| s.to_str()) == Some("svg") {
        let root = SVGBackend::new(path_string.as_str(), size).into_drawing_area();
        backend::draw_scene(&root, scene)
    } else {
        let root = BitMapBackend::new(path_string.as_str(), size).into_drawing_area();
        backend::draw_scene(&root, scene)
    };
    drawn.with_context(|| format!("rendering chart to {}", out_path.display()))?;
    log::info!("wrote {}", out_path.display());
    Ok(())
}

/// Render `scene` as an SVG document in memory.
pub fn render_svg_string(scene: &Scene) -> Result<String> {
    ensure_fonts_registered();
    let mut buf = String::new();
    {
        let root = SVGBackend::with_string(&mut buf, canvas_size(scene)).into_drawing_area();
        backend::draw_scene(&root, scene)?;
    }
    Ok(buf)
}
