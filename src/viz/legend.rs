//! Legend layouts: a wrapping swatch row, a vertical swatch list, and the
//! responsive alluvial legend with wrapped multi-line labels.

use super::color::Rgb;
use super::scene::{Node, Paint, Scene, Shape};
use super::text::{estimate_text_width_px, wrap_text_to_width};

/// Screen width from which the alluvial legend is shown.
pub const LARGE_SCREEN_PX: f64 = 1280.0;

const ROW_FONT_PX: f64 = 14.0;
const ROW_SWATCH_PX: f64 = 16.0;
const ROW_GAP_PX: f64 = 16.0;
const ROW_LINE_PX: f64 = 24.0;

/// Estimate the height of [`draw_swatch_row`] for `items` packed into `max_w`.
pub fn estimate_swatch_row_height(items: &[(String, Rgb)], max_w: f64) -> f64 {
    pack_rows(items, max_w).len() as f64 * ROW_LINE_PX
}

fn item_width(label: &str) -> f64 {
    ROW_SWATCH_PX + 8.0 + estimate_text_width_px(label, ROW_FONT_PX)
}

/// Greedy packing into rows of at most `max_w` pixels.
fn pack_rows(items: &[(String, Rgb)], max_w: f64) -> Vec<Vec<usize>> {
    let mut rows: Vec<Vec<usize>> = Vec::new();
    let mut cur: Vec<usize> = Vec::new();
    let mut x = 0.0;
    for (i, (label, _)) in items.iter().enumerate() {
        let w = item_width(label);
        if x + w > max_w && !cur.is_empty() {
            rows.push(std::mem::take(&mut cur));
            x = 0.0;
        }
        cur.push(i);
        x += w + ROW_GAP_PX;
    }
    if !cur.is_empty() {
        rows.push(cur);
    }
    rows
}

/// Horizontal legend that wraps onto new rows, starting at `(x, y)`.
/// Returns the height used.
pub fn draw_swatch_row(scene: &mut Scene, items: &[(String, Rgb)], x: f64, y: f64, max_w: f64) -> f64 {
    let rows = pack_rows(items, max_w);
    for (ri, row) in rows.iter().enumerate() {
        let cy = y + ri as f64 * ROW_LINE_PX + ROW_LINE_PX / 2.0;
        let mut cx = x;
        for &i in row {
            let (label, color) = &items[i];
            scene.push(Node::new(
                "legend",
                Shape::rect(cx, cy - ROW_SWATCH_PX / 2.0, ROW_SWATCH_PX, ROW_SWATCH_PX),
                Paint::fill(*color),
            ));
            scene.push(Node::new(
                "legend",
                Shape::text(cx + ROW_SWATCH_PX + 8.0, cy, label.clone(), ROW_FONT_PX),
                Paint::fill(Rgb::BLACK),
            ));
            cx += item_width(label) + ROW_GAP_PX;
        }
    }
    rows.len() as f64 * ROW_LINE_PX
}

/// Vertical legend: 15 px swatches, one item every 20 px, 12 px labels.
pub fn draw_swatch_list(scene: &mut Scene, items: &[(String, Rgb)], x: f64, y: f64) {
    for (i, (label, color)) in items.iter().enumerate() {
        let top = y + i as f64 * 20.0;
        scene.push(Node::new("legend", Shape::rect(x, top, 15.0, 15.0), Paint::fill(*color)));
        scene.push(Node::new(
            "legend",
            Shape::text(x + 20.0, top + 7.5, label.clone(), 12.0),
            Paint::fill(Rgb::BLACK),
        ));
    }
}

/// Layout of one entry of the responsive legend.
#[derive(Debug, Clone, PartialEq)]
pub struct LegendEntry {
    pub label: String,
    pub color: Rgb,
    pub y: f64,
    pub lines: Vec<String>,
}

const RESP_SWATCH_PX: f64 = 16.0;
const RESP_TEXT_W: f64 = 90.0;
const RESP_LINE_PX: f64 = 14.0;
const RESP_GAP_PX: f64 = 10.0;
/// 0.9rem
const RESP_FONT_PX: f64 = 14.4;

/// Stack entries top to bottom, each advancing by its wrapped height plus a gap.
/// Empty below the large-screen breakpoint.
pub fn responsive_layout(items: &[(String, Rgb)], screen_width: f64) -> Vec<LegendEntry> {
    if screen_width < LARGE_SCREEN_PX {
        return Vec::new();
    }
    let mut y = 0.0;
    items
        .iter()
        .map(|(label, color)| {
            let mut lines = wrap_text_to_width(label, RESP_FONT_PX, RESP_TEXT_W);
            if lines.is_empty() {
                lines.push(String::new());
            }
            let entry = LegendEntry {
                label: label.clone(),
                color: *color,
                y,
                lines,
            };
            y += entry.lines.len() as f64 * RESP_LINE_PX + RESP_GAP_PX;
            entry
        })
        .collect()
}

/// Draw the responsive legend with its top-left corner at `(x, y)`.
pub fn draw_responsive_legend(scene: &mut Scene, items: &[(String, Rgb)], screen_width: f64, x: f64, y: f64) {
    for entry in responsive_layout(items, screen_width) {
        let top = y + entry.y;
        scene.push(Node::new(
            "legend",
            Shape::rect(x, top, RESP_SWATCH_PX, RESP_SWATCH_PX),
            Paint::fill(entry.color),
        ));
        for (li, line) in entry.lines.iter().enumerate() {
            scene.push(Node::new(
                "legend",
                Shape::text(x + 20.0, top + 8.0 + li as f64 * RESP_LINE_PX, line.clone(), RESP_FONT_PX),
                Paint::fill(Rgb::BLACK),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(labels: &[&str]) -> Vec<(String, Rgb)> {
        labels.iter().map(|l| (l.to_string(), Rgb::BLACK)).collect()
    }

    #[test]
    fn hidden_below_breakpoint() {
        assert!(responsive_layout(&items(&["Daily"]), 1279.0).is_empty());
        assert_eq!(responsive_layout(&items(&["Daily"]), 1280.0).len(), 1);
    }

    #[test]
    fn wrapped_entries_push_following_ones_down() {
        let l = responsive_layout(&items(&["At least once a week", "Never"]), 1440.0);
        assert!(l[0].lines.len() > 1);
        assert_eq!(l[1].y, l[0].lines.len() as f64 * 14.0 + 10.0);
    }

    #[test]
    fn swatch_row_wraps_when_narrow() {
        let it = items(&["Upper secondary", "Tertiary education", "Lower secondary"]);
        assert_eq!(estimate_swatch_row_height(&it, 2000.0), ROW_LINE_PX);
        assert!(estimate_swatch_row_height(&it, 200.0) > ROW_LINE_PX);
    }
}
