use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One CSV line keyed by its header, in header order.
///
/// Values stay raw strings; typed rows are produced by a caller-supplied mapper
/// (see [`crate::dataset::parse_csv`]).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    columns: Vec<(String, String)>,
}

impl Record {
    pub fn new(columns: Vec<(String, String)>) -> Self {
        Self { columns }
    }

    /// Build a record from a header row and a value row. Missing trailing
    /// values become empty strings.
    pub fn from_parts<'a, H, V>(headers: H, values: V) -> Self
    where
        H: IntoIterator<Item = &'a str>,
        V: IntoIterator<Item = &'a str>,
    {
        let mut values = values.into_iter();
        let columns = headers
            .into_iter()
            .map(|h| (h.to_string(), values.next().unwrap_or("").to_string()))
            .collect();
        Self { columns }
    }

    /// Raw string value of a column.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.columns
            .iter()
            .find(|(k, _)| k == column)
            .map(|(_, v)| v.as_str())
    }

    /// Raw value or the empty string, mirroring `d.column` on a parsed d3 row.
    pub fn str(&self, column: &str) -> &str {
        self.get(column).unwrap_or("")
    }

    /// Numeric coercion of a column (`+d.column`): NaN when missing or non-numeric.
    pub fn num(&self, column: &str) -> f64 {
        match self.get(column) {
            Some(v) => num(v),
            None => f64::NAN,
        }
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// JSON object keyed by header, used by the file-reading API route.
    pub fn to_json(&self) -> serde_json::Value {
        let map: serde_json::Map<String, serde_json::Value> = self
            .columns
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
            .collect();
        serde_json::Value::Object(map)
    }
}

/// Unary-plus coercion: trims whitespace, the empty string is `0`, anything
/// unparsable is `NaN`.
///
/// Only `Infinity` spells an infinity; `inf` and `nan` are not numbers.
/// `0x`, `0o` and `0b` prefixes read unsigned integers.
pub fn num(raw: &str) -> f64 {
    let t = raw.trim();
    if t.is_empty() {
        return 0.0;
    }
    match t {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    let radix = match t.get(..2) {
        Some("0x" | "0X") => Some(16),
        Some("0o" | "0O") => Some(8),
        Some("0b" | "0B") => Some(2),
        _ => None,
    };
    if let Some(radix) = radix {
        return u64::from_str_radix(&t[2..], radix).map_or(f64::NAN, |v| v as f64);
    }
    if !t.bytes().all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'+' | b'-')) {
        return f64::NAN;
    }
    t.parse::<f64>().unwrap_or(f64::NAN)
}

/// A single bar: category on one axis, value on the other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: String,
    pub y: f64,
}

/// One (name, value) entry inside a bar group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub value: f64,
}

impl Category {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Input of the grouped bar chart: a label and one value per category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarGroup {
    pub label: String,
    pub values: Vec<Category>,
}

/// Input of the stacked bar chart: an entity and its value per category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackedEntity {
    pub entity: String,
    pub values: BTreeMap<String, f64>,
}

impl StackedEntity {
    pub fn new<I, S>(entity: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        Self {
            entity: entity.into(),
            values: values.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    pub fn total(&self) -> f64 {
        self.values.values().sum()
    }
}

/// One bar of a faceted chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacetedPoint {
    pub group: String,
    pub category: String,
    pub value: f64,
}

/// Directed, weighted flow between a first-layer node and a second-layer node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkData {
    pub source: String,
    pub target: String,
    pub value: f64,
}

/// Alluvial input: node layers (at most two) and the links between them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlluvialData {
    pub nodes: Vec<Vec<String>>,
    pub links: Vec<LinkData>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unary_plus_coercion() {
        assert_eq!(num("42"), 42.0);
        assert_eq!(num(" 3.5 "), 3.5);
        assert_eq!(num(""), 0.0);
        assert!(num("n/a").is_nan());
    }

    #[test]
    fn only_infinity_spells_an_infinity() {
        assert_eq!(num("Infinity"), f64::INFINITY);
        assert_eq!(num(" -Infinity"), f64::NEG_INFINITY);
        for raw in ["inf", "-inf", "infinity", "NaN", "nan"] {
            assert!(num(raw).is_nan(), "{}", raw);
        }
        assert_eq!(num("0x1A"), 26.0);
        assert!(num("-0x1A").is_nan());
        assert_eq!(num("1e3"), 1000.0);
        assert_eq!(num(".5"), 0.5);
        assert_eq!(num("5."), 5.0);
    }

    #[test]
    fn record_lookup_and_missing_columns() {
        let r = Record::from_parts(["geo", "obs_value"], ["Italy", "12.5"]);
        assert_eq!(r.str("geo"), "Italy");
        assert_eq!(r.num("obs_value"), 12.5);
        assert!(r.num("time_period").is_nan());
        assert_eq!(r.str("time_period"), "");
        assert_eq!(r.columns().collect::<Vec<_>>(), vec!["geo", "obs_value"]);
    }

    #[test]
    fn record_to_json_keeps_strings() {
        let r = Record::from_parts(["a", "b"], ["1", "x"]);
        assert_eq!(r.to_json(), serde_json::json!({"a": "1", "b": "x"}));
    }

    #[test]
    fn record_to_json_keeps_header_order() {
        let r = Record::from_parts(["Year", "Entity", "Code"], ["2020", "Italy", "ITA"]);
        let keys: Vec<String> = r.to_json().as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["Year", "Entity", "Code"]);
        assert_eq!(
            serde_json::to_string(&r.to_json()).unwrap(),
            r#"{"Year":"2020","Entity":"Italy","Code":"ITA"}"#
        );
    }
}
