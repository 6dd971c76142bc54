//! Colors: RGB values, sequential interpolators, and category tables.

use ahash::AHashMap;
use plotters::style::{RGBAColor, RGBColor};
use serde::{Serialize, Serializer};
use std::fmt;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);
    pub const GRID: Rgb = Rgb::new(0xd6, 0xd6, 0xd6);
    pub const GUIDE: Rgb = Rgb::new(0xc2, 0xc2, 0xc2);
    pub const FALLBACK: Rgb = Rgb::new(0x88, 0x88, 0x88);

    /// Parse `#rrggbb` or `#rgb`.
    pub fn from_hex(s: &str) -> Option<Self> {
        let h = s.trim().strip_prefix('#')?;
        let expand = |c: char| c.to_digit(16).map(|d| (d * 17) as u8);
        match h.len() {
            6 => {
                let v = u32::from_str_radix(h, 16).ok()?;
                Some(Rgb::new((v >> 16) as u8, (v >> 8) as u8, v as u8))
            }
            3 => {
                let mut it = h.chars();
                Some(Rgb::new(
                    expand(it.next()?)?,
                    expand(it.next()?)?,
                    expand(it.next()?)?,
                ))
            }
            _ => None,
        }
    }

    pub fn hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Component-wise linear blend, `t` in [0, 1].
    pub fn lerp(self, other: Rgb, t: f64) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        Rgb::new(mix(self.r, other.r), mix(self.g, other.g), mix(self.b, other.b))
    }

    pub fn to_plotters(self, opacity: f64) -> RGBAColor {
        RGBColor(self.r, self.g, self.b).mix(opacity.clamp(0.0, 1.0))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hex())
    }
}

impl Serialize for Rgb {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.hex())
    }
}

use plotters::style::Color as _;

/// Microsoft Office (2013+) chart series palette.
pub const OFFICE10: [Rgb; 10] = [
    Rgb::new(68, 114, 196),
    Rgb::new(237, 125, 49),
    Rgb::new(165, 165, 165),
    Rgb::new(255, 192, 0),
    Rgb::new(91, 155, 213),
    Rgb::new(112, 173, 71),
    Rgb::new(38, 68, 120),
    Rgb::new(158, 72, 14),
    Rgb::new(99, 99, 99),
    Rgb::new(153, 115, 0),
];

/// The classic ten-color categorical scheme.
pub const CATEGORY10: [Rgb; 10] = [
    Rgb::new(0x1f, 0x77, 0xb4),
    Rgb::new(0xff, 0x7f, 0x0e),
    Rgb::new(0x2c, 0xa0, 0x2c),
    Rgb::new(0xd6, 0x27, 0x28),
    Rgb::new(0x94, 0x67, 0xbd),
    Rgb::new(0x8c, 0x56, 0x4b),
    Rgb::new(0xe3, 0x77, 0xc2),
    Rgb::new(0x7f, 0x7f, 0x7f),
    Rgb::new(0xbc, 0xbd, 0x22),
    Rgb::new(0x17, 0xbe, 0xcf),
];

/// Pastel fills used for alluvial destination nodes.
pub const PASTEL4: [Rgb; 4] = [
    Rgb::new(0xff, 0xb3, 0xba),
    Rgb::new(0xff, 0xdf, 0xba),
    Rgb::new(0xba, 0xff, 0xc9),
    Rgb::new(0xba, 0xe1, 0xff),
];

/// Get a color from the Office palette.
#[inline]
pub fn office_color(idx: usize) -> Rgb {
    OFFICE10[idx % OFFICE10.len()]
}

/// Piecewise-linear interpolation across evenly spaced stops.
pub fn interpolate_stops(stops: &[Rgb], t: f64) -> Rgb {
    match stops.len() {
        0 => Rgb::FALLBACK,
        1 => stops[0],
        n => {
            let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
            let seg = t * (n - 1) as f64;
            let i = (seg.floor() as usize).min(n - 2);
            stops[i].lerp(stops[i + 1], seg - i as f64)
        }
    }
}

/// Light-to-dark blue ramp.
pub fn interpolate_blues(t: f64) -> Rgb {
    const STOPS: [Rgb; 5] = [
        Rgb::new(0xf7, 0xfb, 0xff),
        Rgb::new(0xc6, 0xdb, 0xef),
        Rgb::new(0x6b, 0xae, 0xd6),
        Rgb::new(0x21, 0x71, 0xb5),
        Rgb::new(0x08, 0x30, 0x6b),
    ];
    interpolate_stops(&STOPS, t)
}

/// Perceptually ordered purple-to-yellow ramp.
pub fn interpolate_viridis(t: f64) -> Rgb {
    const STOPS: [Rgb; 5] = [
        Rgb::new(0x44, 0x01, 0x54),
        Rgb::new(0x3b, 0x52, 0x8b),
        Rgb::new(0x21, 0x91, 0x8c),
        Rgb::new(0x5e, 0xc9, 0x62),
        Rgb::new(0xfd, 0xe7, 0x25),
    ];
    interpolate_stops(&STOPS, t)
}

/// Where fill colors come from: a function of a normalized position, or an
/// explicit list (interpolated when used sequentially, cycled when used by index).
#[derive(Clone)]
pub enum ColorSource {
    Interpolator(Arc<dyn Fn(f64) -> Rgb + Send + Sync>),
    List(Vec<Rgb>),
}

impl ColorSource {
    pub fn interpolator(f: impl Fn(f64) -> Rgb + Send + Sync + 'static) -> Self {
        ColorSource::Interpolator(Arc::new(f))
    }

    /// Parse a named ramp (`blues`, `viridis`, `office`) or a comma-separated
    /// list of hex colors.
    pub fn parse(spec: &str) -> Option<Self> {
        match spec.trim().to_ascii_lowercase().as_str() {
            "blues" => Some(ColorSource::interpolator(interpolate_blues)),
            "viridis" => Some(ColorSource::interpolator(interpolate_viridis)),
            "office" => Some(ColorSource::List(OFFICE10.to_vec())),
            "category10" => Some(ColorSource::List(CATEGORY10.to_vec())),
            other => {
                let list: Option<Vec<Rgb>> = other
                    .split([',', ';'])
                    .filter(|s| !s.trim().is_empty())
                    .map(Rgb::from_hex)
                    .collect();
                list.filter(|l| !l.is_empty()).map(ColorSource::List)
            }
        }
    }

    /// Color at normalized position `t`.
    pub fn at(&self, t: f64) -> Rgb {
        match self {
            ColorSource::Interpolator(f) => f(t),
            ColorSource::List(l) => interpolate_stops(l, t),
        }
    }

    /// Color for the `i`-th of `n` items: `i / n` for interpolators, cycling for lists.
    pub fn nth(&self, i: usize, n: usize) -> Rgb {
        match self {
            ColorSource::Interpolator(f) => f(i as f64 / n.max(1) as f64),
            ColorSource::List(l) if !l.is_empty() => l[i % l.len()],
            ColorSource::List(_) => Rgb::FALLBACK,
        }
    }

    /// Sequential scale: map `v` within `domain` to a color.
    pub fn sequential(&self, domain: (f64, f64), v: f64) -> Rgb {
        let (d0, d1) = domain;
        let t = if d1 == d0 { 0.5 } else { (v - d0) / (d1 - d0) };
        self.at(t)
    }

    pub fn len_hint(&self) -> Option<usize> {
        match self {
            ColorSource::Interpolator(_) => None,
            ColorSource::List(l) => Some(l.len()),
        }
    }
}

impl Default for ColorSource {
    fn default() -> Self {
        ColorSource::interpolator(interpolate_blues)
    }
}

impl fmt::Debug for ColorSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColorSource::Interpolator(_) => f.write_str("ColorSource::Interpolator(..)"),
            ColorSource::List(l) => f.debug_tuple("ColorSource::List").field(l).finish(),
        }
    }
}

/// Ordinal color table: keys get colors in first-seen order, cycling the range.
#[derive(Debug, Clone)]
pub struct OrdinalColors {
    index: AHashMap<String, usize>,
    order: Vec<String>,
    range: Vec<Rgb>,
}

impl OrdinalColors {
    pub fn new<I, S>(domain: I, range: Vec<Rgb>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut me = Self {
            index: AHashMap::new(),
            order: Vec::new(),
            range,
        };
        for key in domain {
            me.insert(key.into());
        }
        me
    }

    /// Table whose colors come from a [`ColorSource`] at `i / n`, as the bubble
    /// chart builds its per-category map.
    pub fn from_source<I, S>(keys: I, source: &ColorSource) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut order: Vec<String> = Vec::new();
        for k in keys {
            let k = k.into();
            if !order.contains(&k) {
                order.push(k);
            }
        }
        let n = order.len();
        let range = (0..n).map(|i| source.nth(i, n)).collect();
        Self::new(order, range)
    }

    fn insert(&mut self, key: String) -> usize {
        if let Some(i) = self.index.get(&key) {
            return *i;
        }
        let i = self.order.len();
        self.index.insert(key.clone(), i);
        self.order.push(key);
        i
    }

    pub fn get(&self, key: &str) -> Rgb {
        match (self.index.get(key), self.range.is_empty()) {
            (Some(i), false) => self.range[i % self.range.len()],
            _ => Rgb::FALLBACK,
        }
    }

    pub fn keys(&self) -> &[String] {
        &self.order
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_round_trip_and_short_form() {
        assert_eq!(Rgb::from_hex("#ffb3ba"), Some(Rgb::new(255, 179, 186)));
        assert_eq!(Rgb::from_hex("#fff"), Some(Rgb::WHITE));
        assert_eq!(Rgb::new(1, 2, 3).hex(), "#010203");
        assert!(Rgb::from_hex("nope").is_none());
    }

    #[test]
    fn stops_interpolate_endpoints() {
        let s = [Rgb::BLACK, Rgb::WHITE];
        assert_eq!(interpolate_stops(&s, 0.0), Rgb::BLACK);
        assert_eq!(interpolate_stops(&s, 1.0), Rgb::WHITE);
        assert_eq!(interpolate_stops(&s, 0.5), Rgb::new(128, 128, 128));
    }

    #[test]
    fn ordinal_colors_follow_first_seen_order() {
        let t = OrdinalColors::from_source(
            ["Italy", "Spain", "Italy", "France"],
            &ColorSource::List(vec![Rgb::BLACK, Rgb::WHITE, Rgb::GRID]),
        );
        assert_eq!(t.keys(), &["Italy", "Spain", "France"]);
        assert_eq!(t.get("Spain"), Rgb::WHITE);
        assert_eq!(t.get("Unknown"), Rgb::FALLBACK);
    }

    #[test]
    fn parse_color_source() {
        assert!(matches!(
            ColorSource::parse("viridis"),
            Some(ColorSource::Interpolator(_))
        ));
        match ColorSource::parse("#000000,#ffffff") {
            Some(ColorSource::List(l)) => assert_eq!(l, vec![Rgb::BLACK, Rgb::WHITE]),
            other => panic!("unexpected {other:?}"),
        }
        assert!(ColorSource::parse("bogus").is_none());
    }
}
