//! Two-column Sankey layout.

use serde::Serialize;

use super::error::ChartError;
use crate::models::LinkData;

pub const NODE_WIDTH: f64 = 15.0;
pub const NODE_PADDING: f64 = 10.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SankeyNode {
    pub name: String,
    /// 0 for sources, 1 for destinations.
    pub layer: usize,
    pub value: f64,
    pub x0: f64,
    pub x1: f64,
    pub y0: f64,
    pub y1: f64,
}

impl SankeyNode {
    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }
}

/// A laid-out link; `y0`/`y1` are the band centers at the source and target.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SankeyLink {
    pub source: usize,
    pub target: usize,
    pub value: f64,
    pub width: f64,
    pub y0: f64,
    pub y1: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SankeyGraph {
    pub nodes: Vec<SankeyNode>,
    pub links: Vec<SankeyLink>,
}

impl SankeyGraph {
    pub fn node_index(&self, name: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.name == name)
    }

    /// Links touching node `idx` at either end.
    pub fn links_of(&self, idx: usize) -> impl Iterator<Item = &SankeyLink> {
        self.links.iter().filter(move |l| l.source == idx || l.target == idx)
    }
}

/// Lay out `layers[0]` against `layers[1]` inside `(x0, y0, x1, y1)`.
///
/// Nodes keep their input order inside each column. Free vertical space is
/// shared out between the gaps of a column, so short columns end up centered.
pub fn layout(
    layers: &[Vec<String>],
    links: &[LinkData],
    extent: (f64, f64, f64, f64),
    node_width: f64,
    padding: f64,
) -> Result<SankeyGraph, ChartError> {
    if layers.len() > 2 {
        return Err(ChartError::TooManyLayers(layers.len()));
    }
    let (ex0, ey0, ex1, ey1) = extent;
    let columns = layers.len().max(1);
    let mut nodes: Vec<SankeyNode> = layers
        .iter()
        .enumerate()
        .flat_map(|(layer, names)| {
            names.iter().map(move |name| SankeyNode {
                name: name.clone(),
                layer,
                value: 0.0,
                x0: 0.0,
                x1: 0.0,
                y0: 0.0,
                y1: 0.0,
            })
        })
        .collect();

    let find = |name: &str, layer: usize, nodes: &[SankeyNode]| {
        nodes
            .iter()
            .position(|n| n.layer == layer && n.name == name)
            .ok_or_else(|| ChartError::UnknownNode(name.to_string()))
    };
    let mut out_links = Vec::with_capacity(links.len());
    for l in links {
        out_links.push(SankeyLink {
            source: find(&l.source, 0, &nodes)?,
            target: find(&l.target, 1, &nodes)?,
            value: l.value,
            width: 0.0,
            y0: 0.0,
            y1: 0.0,
        });
    }

    for (i, n) in nodes.iter_mut().enumerate() {
        let out: f64 = out_links.iter().filter(|l| l.source == i).map(|l| l.value).sum();
        let inc: f64 = out_links.iter().filter(|l| l.target == i).map(|l| l.value).sum();
        n.value = out.max(inc);
    }

    let height = ey1 - ey0;
    let ky = (0..columns)
        .filter_map(|c| {
            let col: Vec<&SankeyNode> = nodes.iter().filter(|n| n.layer == c).collect();
            let total: f64 = col.iter().map(|n| n.value).sum();
            (total > 0.0).then(|| (height - (col.len() as f64 - 1.0) * padding) / total)
        })
        .fold(f64::INFINITY, f64::min);
    let ky = if ky.is_finite() { ky.max(0.0) } else { 0.0 };

    let kx = if columns > 1 { (ex1 - ex0 - node_width) / (columns - 1) as f64 } else { 0.0 };
    for c in 0..columns {
        let idx: Vec<usize> = (0..nodes.len()).filter(|i| nodes[*i].layer == c).collect();
        let mut y = ey0;
        for &i in &idx {
            let n = &mut nodes[i];
            n.x0 = ex0 + c as f64 * kx;
            n.x1 = n.x0 + node_width;
            n.y0 = y;
            n.y1 = y + n.value * ky;
            y = n.y1 + padding;
        }
        let share = (ey1 - y + padding) / (idx.len() as f64 + 1.0);
        if share > 0.0 {
            for (k, &i) in idx.iter().enumerate() {
                nodes[i].y0 += share * (k as f64 + 1.0);
                nodes[i].y1 += share * (k as f64 + 1.0);
            }
        }
    }

    for l in out_links.iter_mut() {
        l.width = l.value * ky;
    }
    // Stack link bands at each end in the order of the node at the other end.
    for i in 0..nodes.len() {
        let mut outgoing: Vec<usize> = (0..out_links.len()).filter(|k| out_links[*k].source == i).collect();
        outgoing.sort_by_key(|k| out_links[*k].target);
        let mut y = nodes[i].y0;
        for k in outgoing {
            out_links[k].y0 = y + out_links[k].width / 2.0;
            y += out_links[k].width;
        }
        let mut incoming: Vec<usize> = (0..out_links.len()).filter(|k| out_links[*k].target == i).collect();
        incoming.sort_by_key(|k| out_links[*k].source);
        let mut y = nodes[i].y0;
        for k in incoming {
            out_links[k].y1 = y + out_links[k].width / 2.0;
            y += out_links[k].width;
        }
    }

    Ok(SankeyGraph {
        nodes,
        links: out_links,
    })
}

/// Outline of a horizontal link band: cubic Bézier center line from
/// `(x0, y0)` to `(x1, y1)`, offset by half the width on each side.
pub fn link_band(x0: f64, y0: f64, x1: f64, y1: f64, width: f64, segments: usize) -> Vec<(f64, f64)> {
    let xm = (x0 + x1) / 2.0;
    let segments = segments.max(1);
    let center: Vec<(f64, f64)> = (0..=segments)
        .map(|i| {
            let t = i as f64 / segments as f64;
            let u = 1.0 - t;
            let x = u * u * u * x0 + 3.0 * u * u * t * xm + 3.0 * u * t * t * xm + t * t * t * x1;
            let y = u * u * u * y0 + 3.0 * u * u * t * y0 + 3.0 * u * t * t * y1 + t * t * t * y1;
            (x, y)
        })
        .collect();
    let half = width / 2.0;
    let mut outline: Vec<(f64, f64)> = center.iter().map(|(x, y)| (*x, y - half)).collect();
    outline.extend(center.iter().rev().map(|(x, y)| (*x, y + half)));
    outline
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(s: &str, t: &str, v: f64) -> LinkData {
        LinkData {
            source: s.into(),
            target: t.into(),
            value: v,
        }
    }

    fn layers() -> Vec<Vec<String>> {
        vec![
            vec!["Italy".into(), "France".into()],
            vec!["Daily".into(), "Never".into()],
        ]
    }

    #[test]
    fn node_heights_proportional_and_links_stacked() {
        let links = vec![link("Italy", "Daily", 30.0), link("Italy", "Never", 10.0), link("France", "Daily", 20.0)];
        let g = layout(&layers(), &links, (0.0, 0.0, 200.0, 110.0), 15.0, 10.0).unwrap();
        // both columns total 60 with one gap: ky = 100 / 60
        let ky = 100.0 / 60.0;
        assert!((g.nodes[0].height() - 40.0 * ky).abs() < 1e-9);
        assert_eq!(g.nodes[2].x0, 185.0);
        let l0 = &g.links[0];
        let l1 = &g.links[1];
        assert!((l1.y0 - l0.y0 - (l0.width + l1.width) / 2.0).abs() < 1e-9);
    }

    #[test]
    fn short_column_is_centered() {
        let layers = vec![vec!["Italy".into(), "France".into()], vec!["Daily".into()]];
        let links = vec![link("Italy", "Daily", 10.0), link("France", "Daily", 10.0)];
        let g = layout(&layers, &links, (0.0, 0.0, 200.0, 100.0), 15.0, 10.0).unwrap();
        let daily = &g.nodes[2];
        assert!((daily.y0 - 5.0).abs() < 1e-9);
        assert!((daily.y1 - 95.0).abs() < 1e-9);
    }

    #[test]
    fn unknown_node_and_layer_count() {
        let links = vec![link("Spain", "Daily", 1.0)];
        assert_eq!(
            layout(&layers(), &links, (0.0, 0.0, 1.0, 1.0), 15.0, 10.0).err(),
            Some(ChartError::UnknownNode("Spain".into()))
        );
        let three = vec![vec![], vec![], vec![]];
        assert_eq!(
            layout(&three, &[], (0.0, 0.0, 1.0, 1.0), 15.0, 10.0).err(),
            Some(ChartError::TooManyLayers(3))
        );
    }
}
