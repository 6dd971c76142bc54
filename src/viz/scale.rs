//! Band and linear scales, and the helper that picks one per axis.
//!
//! Which axis is categorical is decided by the caller up front (`Orientation`),
//! and the resulting [`Scale`] is a tagged union: chart code matches on the
//! variant instead of probing for a `bandwidth` or `invert` capability.

use serde::Serialize;

use super::types::Orientation;

/// Maps a discrete set of categories to contiguous pixel intervals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BandScale {
    domain: Vec<String>,
    range: (f64, f64),
    padding_inner: f64,
    padding_outer: f64,
    align: f64,
}

impl BandScale {
    pub fn new<I, S>(domain: I, range: (f64, f64)) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        // Duplicate categories collapse onto the first occurrence.
        let mut uniq: Vec<String> = Vec::new();
        for d in domain {
            let d = d.into();
            if !uniq.contains(&d) {
                uniq.push(d);
            }
        }
        Self {
            domain: uniq,
            range,
            padding_inner: 0.0,
            padding_outer: 0.0,
            align: 0.5,
        }
    }

    /// Set inner and outer padding to the same fraction of the step.
    pub fn padding(mut self, p: f64) -> Self {
        let p = p.clamp(0.0, 1.0);
        self.padding_inner = p;
        self.padding_outer = p;
        self
    }

    pub fn domain(&self) -> &[String] {
        &self.domain
    }

    pub fn range(&self) -> (f64, f64) {
        self.range
    }

    /// Distance between the starts of two adjacent bands.
    pub fn step(&self) -> f64 {
        let n = self.domain.len() as f64;
        let (lo, hi) = self.sorted_range();
        (hi - lo) / (n - self.padding_inner + self.padding_outer * 2.0).max(1.0)
    }

    pub fn bandwidth(&self) -> f64 {
        self.step() * (1.0 - self.padding_inner)
    }

    fn sorted_range(&self) -> (f64, f64) {
        let (r0, r1) = self.range;
        if r1 < r0 { (r1, r0) } else { (r0, r1) }
    }

    fn start(&self) -> f64 {
        let n = self.domain.len() as f64;
        let (lo, hi) = self.sorted_range();
        let step = self.step();
        lo + (hi - lo - step * (n - self.padding_inner)) * self.align
    }

    /// Start of the band of `key`, or `None` for an unknown category.
    pub fn position(&self, key: &str) -> Option<f64> {
        let idx = self.domain.iter().position(|d| d == key)?;
        Some(self.position_at(idx))
    }

    pub fn position_at(&self, idx: usize) -> f64 {
        let n = self.domain.len();
        let reversed = self.range.1 < self.range.0;
        let i = if reversed { n - 1 - idx } else { idx };
        self.start() + self.step() * i as f64
    }

    /// Center of the band of `key`.
    pub fn center(&self, key: &str) -> Option<f64> {
        self.position(key).map(|p| p + self.bandwidth() / 2.0)
    }

    /// The category whose band center lies within half a bandwidth of `px`.
    pub fn snap(&self, px: f64) -> Option<&str> {
        let half = self.bandwidth() / 2.0;
        self.domain
            .iter()
            .enumerate()
            .find(|(i, _)| (px - (self.position_at(*i) + half)).abs() < half)
            .map(|(_, d)| d.as_str())
    }
}

/// Maps a numeric interval to a pixel interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinearScale {
    domain: (f64, f64),
    range: (f64, f64),
}

impl LinearScale {
    pub fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
        Self { domain, range }
    }

    pub fn domain(&self) -> (f64, f64) {
        self.domain
    }

    pub fn range(&self) -> (f64, f64) {
        self.range
    }

    pub fn scale(&self, v: f64) -> f64 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        let span = d1 - d0;
        let t = if span == 0.0 || !span.is_finite() {
            0.5
        } else {
            (v - d0) / span
        };
        r0 + t * (r1 - r0)
    }

    pub fn invert(&self, px: f64) -> f64 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        let span = r1 - r0;
        let t = if span == 0.0 { 0.5 } else { (px - r0) / span };
        d0 + t * (d1 - d0)
    }

    /// Extend the domain to round tick values.
    pub fn nice(mut self, count: usize) -> Self {
        let (mut d0, mut d1) = self.domain;
        let reversed = d1 < d0;
        if reversed {
            std::mem::swap(&mut d0, &mut d1);
        }
        let mut prev = 0.0;
        for _ in 0..10 {
            let step = tick_step(d0, d1, count);
            if step == prev || step == 0.0 || !step.is_finite() {
                break;
            }
            d0 = (d0 / step).floor() * step;
            d1 = (d1 / step).ceil() * step;
            prev = step;
        }
        self.domain = if reversed { (d1, d0) } else { (d0, d1) };
        self
    }

    /// Round values spanning the domain, roughly `count` of them.
    pub fn ticks(&self, count: usize) -> Vec<f64> {
        let (mut lo, mut hi) = self.domain;
        if hi < lo {
            std::mem::swap(&mut lo, &mut hi);
        }
        let step = tick_step(lo, hi, count);
        if step == 0.0 || !step.is_finite() {
            return vec![lo];
        }
        let i0 = (lo / step - 1e-9).ceil() as i64;
        let i1 = (hi / step + 1e-9).floor() as i64;
        (i0..=i1)
            .map(|i| {
                let v = i as f64 * step;
                // Strip float noise like 0.30000000000000004
                (v / step).round() * step
            })
            .collect()
    }
}

/// Tick spacing from the 1-2-5 series for `count` intervals over `[start, stop]`.
pub fn tick_step(start: f64, stop: f64, count: usize) -> f64 {
    let count = count.max(1) as f64;
    let raw = (stop - start).abs() / count;
    if raw == 0.0 || !raw.is_finite() {
        return 0.0;
    }
    let power = raw.log10().floor();
    let base = 10f64.powf(power);
    let error = raw / base;
    let factor = if error >= 50f64.sqrt() {
        10.0
    } else if error >= 10f64.sqrt() {
        5.0
    } else if error >= 2f64.sqrt() {
        2.0
    } else {
        1.0
    };
    factor * base
}

/// Role of an axis: discrete categories or a continuous value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisRole {
    Categorical,
    Continuous,
}

/// An axis scale, tagged by kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Scale {
    Band(BandScale),
    Linear(LinearScale),
}

impl Scale {
    pub fn role(&self) -> AxisRole {
        match self {
            Scale::Band(_) => AxisRole::Categorical,
            Scale::Linear(_) => AxisRole::Continuous,
        }
    }

    pub fn as_band(&self) -> Option<&BandScale> {
        match self {
            Scale::Band(b) => Some(b),
            Scale::Linear(_) => None,
        }
    }

    pub fn as_linear(&self) -> Option<&LinearScale> {
        match self {
            Scale::Linear(l) => Some(l),
            Scale::Band(_) => None,
        }
    }
}

/// The two scales of a categorical-vs-value chart.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisPair {
    pub band: BandScale,
    pub value: LinearScale,
    pub orientation: Orientation,
}

impl AxisPair {
    /// Build the band/value pair for an inner plot of `inner_w` x `inner_h`.
    ///
    /// `Vertical` puts categories on x and values on y (growing upward);
    /// `Horizontal` puts categories down the y axis and values along x.
    pub fn build<I, S>(
        orientation: Orientation,
        categories: I,
        value_domain: (f64, f64),
        inner_w: f64,
        inner_h: f64,
        padding: f64,
        nice: bool,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let (band_range, value_range) = match orientation {
            Orientation::Vertical => ((0.0, inner_w), (inner_h, 0.0)),
            Orientation::Horizontal => ((0.0, inner_h), (0.0, inner_w)),
        };
        let band = BandScale::new(categories, band_range).padding(padding);
        let mut value = LinearScale::new(value_domain, value_range);
        if nice {
            value = value.nice(10);
        }
        Self {
            band,
            value,
            orientation,
        }
    }

    /// `(x, y)` scales in screen order.
    pub fn xy(&self) -> (Scale, Scale) {
        match self.orientation {
            Orientation::Vertical => (Scale::Band(self.band.clone()), Scale::Linear(self.value)),
            Orientation::Horizontal => (Scale::Linear(self.value), Scale::Band(self.band.clone())),
        }
    }

    /// Rectangle `(x, y, w, h)` covering `[v0, v1]` in value space on a band
    /// starting at `band_pos` with thickness `thickness`.
    pub fn span_rect(&self, band_pos: f64, thickness: f64, v0: f64, v1: f64) -> (f64, f64, f64, f64) {
        let p0 = self.value.scale(v0);
        let p1 = self.value.scale(v1);
        let (lo, hi) = if p0 <= p1 { (p0, p1) } else { (p1, p0) };
        match self.orientation {
            Orientation::Vertical => (band_pos, lo, thickness, hi - lo),
            Orientation::Horizontal => (lo, band_pos, hi - lo, thickness),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_scale_matches_padding_formula() {
        let b = BandScale::new(["A", "B", "C"], (0.0, 100.0)).padding(0.2);
        // step = 100 / (3 - 0.2 + 0.4)
        let step = 100.0 / 3.2;
        assert!((b.step() - step).abs() < 1e-9);
        assert!((b.bandwidth() - step * 0.8).abs() < 1e-9);
        assert!((b.position("A").unwrap() - step * 0.2).abs() < 1e-9);
        assert!(b.position("Z").is_none());
    }

    #[test]
    fn band_scale_dedups_domain() {
        let b = BandScale::new(["A", "A", "B"], (0.0, 10.0));
        assert_eq!(b.domain(), &["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn snap_picks_nearest_band_center() {
        let b = BandScale::new(["2019", "2020", "2021"], (0.0, 300.0)).padding(0.1);
        let c = b.center("2020").unwrap();
        assert_eq!(b.snap(c + 1.0), Some("2020"));
        assert_eq!(b.snap(-50.0), None);
    }

    #[test]
    fn linear_scale_and_invert() {
        let s = LinearScale::new((0.0, 10.0), (100.0, 0.0));
        assert_eq!(s.scale(5.0), 50.0);
        assert_eq!(s.invert(25.0), 7.5);
    }

    #[test]
    fn nice_rounds_domain_outward() {
        let s = LinearScale::new((0.0, 97.3), (0.0, 1.0)).nice(10);
        assert_eq!(s.domain(), (0.0, 100.0));
    }

    #[test]
    fn ticks_are_round() {
        let s = LinearScale::new((0.0, 1.0), (0.0, 1.0));
        let t = s.ticks(5);
        assert_eq!(t.len(), 6);
        assert!((t[3] - 0.6).abs() < 1e-12);
    }

    #[test]
    fn scale_roles() {
        let pair = AxisPair::build(
            Orientation::Vertical,
            ["A"],
            (0.0, 1.0),
            100.0,
            50.0,
            0.2,
            false,
        );
        let (x, y) = pair.xy();
        assert_eq!(x.role(), AxisRole::Categorical);
        assert_eq!(y.role(), AxisRole::Continuous);
        assert!(x.as_band().is_some());
        assert!(y.as_linear().is_some());
    }
}
