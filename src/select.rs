//! Page-level containers: selection state and the reshaping of raw records
//! into chart inputs.
//!
//! A page loads one dataset, picks a default [`Selection`] once rows arrive,
//! and recomputes its chart input whenever the rows or the selection change.
//! Reshapers work on generic [`Record`]s and are driven by a [`ColumnMap`]
//! naming the columns to read.

use crate::dataset::{DatasetHandle, LoadState};
use crate::models::{AlluvialData, BarGroup, Category, FacetedPoint, LinkData, Record, StackedEntity};
use crate::viz::bubble::BubbleData;
use crate::viz::color::OFFICE10;
use crate::viz::line::LineSeries;
use std::cmp::Ordering;

pub const DEFAULT_COUNTRIES: [&str; 4] = ["Italy", "Germany", "France", "Romania"];
pub const MIN_BUBBLE_RADIUS: f64 = 10.0;
pub const MAX_BUBBLE_RADIUS: f64 = 40.0;

/// Distinct values of `column`, first-seen order. Rows without the column are ignored.
pub fn unique_values(rows: &[Record], column: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for v in rows.iter().filter_map(|r| r.get(column)) {
        if !out.iter().any(|o| o == v) {
            out.push(v.to_string());
        }
    }
    out
}

/// `wanted` when present, else the first value.
pub fn found_or_first(wanted: &str, values: &[String]) -> Option<String> {
    values
        .iter()
        .find(|v| v.as_str() == wanted)
        .or_else(|| values.first())
        .cloned()
}

/// The usual comparison countries that exist in `available`; the first
/// available country when none of them do.
pub fn default_countries(available: &[String]) -> Vec<String> {
    let picked: Vec<String> = DEFAULT_COUNTRIES
        .iter()
        .filter(|c| available.iter().any(|a| a == *c))
        .map(|c| c.to_string())
        .collect();
    if picked.is_empty() {
        available.first().cloned().into_iter().collect()
    } else {
        picked
    }
}

/// Numeric order when both sides parse, string order otherwise.
fn cmp_labels(a: &str, b: &str) -> Ordering {
    match (a.trim().parse::<f64>(), b.trim().parse::<f64>()) {
        (Ok(x), Ok(y)) => x.total_cmp(&y),
        _ => a.cmp(b),
    }
}

/// Most recent of a list of year labels.
pub fn latest(values: &[String]) -> Option<String> {
    values.iter().max_by(|a, b| cmp_labels(a, b)).cloned()
}

/// Which columns a reshaper reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMap {
    /// Categorical axis: bar labels, stacked entities, facet groups, alluvial sources.
    pub label: String,
    pub value: String,
    /// Second categorical dimension: stack/group categories, alluvial destinations.
    pub category: Option<String>,
    pub year: Option<String>,
    pub country: Option<String>,
    pub metric: Option<String>,
    /// Population-like weight for bubble sizes and alluvial flows.
    pub count: Option<String>,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            label: "geo".into(),
            value: "obs_value".into(),
            category: None,
            year: Some("time_period".into()),
            country: Some("geo".into()),
            metric: Some("indic_is".into()),
            count: None,
        }
    }
}

/// Page-local selection driving which rows reach the chart.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub year: Option<String>,
    /// Empty means every country.
    pub countries: Vec<String>,
    pub metric: Option<String>,
}

impl Selection {
    /// Latest year, the default countries and `preferred_metric` (or the first metric).
    pub fn defaults(rows: &[Record], columns: &ColumnMap, preferred_metric: Option<&str>) -> Self {
        let year = columns.year.as_deref().and_then(|c| latest(&unique_values(rows, c)));
        let countries = columns
            .country
            .as_deref()
            .map(|c| default_countries(&unique_values(rows, c)))
            .unwrap_or_default();
        let metric = columns.metric.as_deref().and_then(|c| {
            let metrics = unique_values(rows, c);
            found_or_first(preferred_metric.unwrap_or(""), &metrics)
        });
        Self { year, countries, metric }
    }

    pub fn set_year(&mut self, year: impl Into<String>) -> bool {
        let year = Some(year.into());
        if self.year == year {
            return false;
        }
        self.year = year;
        true
    }

    pub fn set_metric(&mut self, metric: impl Into<String>) -> bool {
        let metric = Some(metric.into());
        if self.metric == metric {
            return false;
        }
        self.metric = metric;
        true
    }

    pub fn set_countries(&mut self, countries: Vec<String>) -> bool {
        if self.countries == countries {
            return false;
        }
        self.countries = countries;
        true
    }

    /// Add `country` if absent, remove it otherwise. Returns whether it is now selected.
    pub fn toggle_country(&mut self, country: &str) -> bool {
        if let Some(pos) = self.countries.iter().position(|c| c == country) {
            self.countries.remove(pos);
            false
        } else {
            self.countries.push(country.to_string());
            true
        }
    }

    fn matches_with(&self, row: &Record, columns: &ColumnMap, check_year: bool) -> bool {
        let year_ok = match (check_year, &self.year, &columns.year) {
            (true, Some(y), Some(c)) => row.str(c) == y,
            _ => true,
        };
        let country_ok = match &columns.country {
            Some(c) if !self.countries.is_empty() => self.countries.iter().any(|s| s == row.str(c)),
            _ => true,
        };
        let metric_ok = match (&self.metric, &columns.metric) {
            (Some(m), Some(c)) => row.str(c) == m,
            _ => true,
        };
        year_ok && country_ok && metric_ok
    }

    pub fn matches(&self, row: &Record, columns: &ColumnMap) -> bool {
        self.matches_with(row, columns, true)
    }

    /// Rows passing every active filter.
    pub fn filter<'a>(&self, rows: &'a [Record], columns: &ColumnMap) -> Vec<&'a Record> {
        rows.iter().filter(|r| self.matches(r, columns)).collect()
    }

    /// Rows passing the country and metric filters; the year becomes an axis.
    pub fn filter_all_years<'a>(&self, rows: &'a [Record], columns: &ColumnMap) -> Vec<&'a Record> {
        rows.iter().filter(|r| self.matches_with(r, columns, false)).collect()
    }
}

fn push_unique(list: &mut Vec<String>, v: &str) {
    if !list.iter().any(|o| o == v) {
        list.push(v.to_string());
    }
}

/// Label and category of a row; without a category column the value column name stands in.
fn label_and_category<'a>(row: &'a Record, columns: &'a ColumnMap) -> (&'a str, &'a str) {
    let category = match &columns.category {
        Some(c) => row.str(c),
        None => columns.value.as_str(),
    };
    (row.str(&columns.label), category)
}

/// Bar input: one bar per label with its rows summed, positive totals only,
/// largest first.
pub fn bar_input(rows: &[Record], selection: &Selection, columns: &ColumnMap) -> (Vec<String>, Vec<f64>) {
    let mut kept: Vec<(String, f64)> = Vec::new();
    for r in selection.filter(rows, columns) {
        let value = r.num(&columns.value);
        if !value.is_finite() {
            continue;
        }
        let label = r.str(&columns.label);
        match kept.iter_mut().find(|(l, _)| l == label) {
            Some((_, total)) => *total += value,
            None => kept.push((label.to_string(), value)),
        }
    }
    kept.retain(|(_, v)| *v > 0.0);
    kept.sort_by(|a, b| b.1.total_cmp(&a.1));
    kept.into_iter().unzip()
}

/// Map input: `(label, value)` for the selected year and metric. The country
/// filter is ignored since the map shows every region.
pub fn map_input(rows: &[Record], selection: &Selection, columns: &ColumnMap) -> Vec<(String, f64)> {
    let every_country = Selection {
        countries: Vec::new(),
        ..selection.clone()
    };
    every_country
        .filter(rows, columns)
        .into_iter()
        .map(|r| (r.str(&columns.label).to_string(), r.num(&columns.value)))
        .filter(|(_, v)| v.is_finite())
        .collect()
}

/// Entities in first-seen order and the category list; every entity gets every
/// category (0 where the data has no row). Duplicate rows add up.
pub fn stacked_input(rows: &[Record], selection: &Selection, columns: &ColumnMap) -> (Vec<StackedEntity>, Vec<String>) {
    let filtered = selection.filter(rows, columns);
    let mut entities: Vec<String> = Vec::new();
    let mut categories: Vec<String> = Vec::new();
    for r in &filtered {
        let (label, category) = label_and_category(r, columns);
        push_unique(&mut entities, label);
        push_unique(&mut categories, category);
    }
    let data = entities
        .iter()
        .map(|e| {
            let values = categories.iter().map(|c| {
                let total: f64 = filtered
                    .iter()
                    .filter(|r| label_and_category(r, columns) == (e.as_str(), c.as_str()))
                    .map(|r| r.num(&columns.value))
                    .filter(|v| v.is_finite())
                    .sum();
                (c.clone(), total)
            });
            StackedEntity::new(e.clone(), values)
        })
        .collect();
    (data, categories)
}

/// One group per label, one value per category in first-seen order.
pub fn grouped_input(rows: &[Record], selection: &Selection, columns: &ColumnMap) -> Vec<BarGroup> {
    let (entities, categories) = stacked_input(rows, selection, columns);
    entities
        .into_iter()
        .map(|e| BarGroup {
            values: categories
                .iter()
                .map(|c| Category::new(c.clone(), e.values.get(c).copied().unwrap_or(0.0)))
                .collect(),
            label: e.entity,
        })
        .collect()
}

/// One series per country (or per category when set), x = year ascending.
pub fn line_input(rows: &[Record], selection: &Selection, columns: &ColumnMap) -> Vec<LineSeries> {
    let filtered = selection.filter_all_years(rows, columns);
    let series_col = columns
        .category
        .as_deref()
        .or(columns.country.as_deref())
        .unwrap_or(columns.label.as_str());
    let x_col = columns.year.as_deref().unwrap_or(columns.label.as_str());
    let mut tags: Vec<String> = Vec::new();
    for r in &filtered {
        push_unique(&mut tags, r.str(series_col));
    }
    tags.iter()
        .enumerate()
        .map(|(i, tag)| {
            let mut points: Vec<(String, f64)> = filtered
                .iter()
                .filter(|r| r.str(series_col) == tag)
                .map(|r| (r.str(x_col).to_string(), r.num(&columns.value)))
                .collect();
            points.sort_by(|a, b| cmp_labels(&a.0, &b.0));
            let (x, y) = points.into_iter().unzip();
            LineSeries::new(tag.clone(), x, y, OFFICE10[i % OFFICE10.len()])
        })
        .collect()
}

/// Facets per label, bars per category.
pub fn faceted_input(rows: &[Record], selection: &Selection, columns: &ColumnMap) -> Vec<FacetedPoint> {
    selection
        .filter(rows, columns)
        .into_iter()
        .map(|r| {
            let (group, category) = label_and_category(r, columns);
            FacetedPoint {
                group: group.to_string(),
                category: category.to_string(),
                value: r.num(&columns.value),
            }
        })
        .filter(|p| p.value.is_finite())
        .collect()
}

/// Sources from the label column, destinations from the category column.
///
/// With a count column, each source's percentages are first rescaled to sum
/// to 100 and then turned into head counts (`ceil(count * pct / 100)`).
/// Sources and destinations are ordered by total flow, largest first.
pub fn alluvial_input(rows: &[Record], selection: &Selection, columns: &ColumnMap) -> AlluvialData {
    let Some(target_col) = columns.category.as_deref() else {
        return AlluvialData::default();
    };
    let filtered = selection.filter(rows, columns);
    let mut links: Vec<LinkData> = Vec::new();
    for r in &filtered {
        let value = r.num(&columns.value);
        if !value.is_finite() {
            continue;
        }
        let (source, target) = (r.str(&columns.label), r.str(target_col));
        match links.iter_mut().find(|l| l.source == source && l.target == target) {
            Some(l) => l.value += value,
            None => links.push(LinkData {
                source: source.to_string(),
                target: target.to_string(),
                value,
            }),
        }
    }

    if let Some(count_col) = columns.count.as_deref() {
        let mut sources: Vec<String> = Vec::new();
        for l in &links {
            push_unique(&mut sources, &l.source);
        }
        for s in &sources {
            let population = filtered
                .iter()
                .find(|r| r.str(&columns.label) == s)
                .map(|r| r.num(count_col))
                .filter(|p| p.is_finite())
                .unwrap_or(0.0);
            let total: f64 = links.iter().filter(|l| &l.source == s).map(|l| l.value).sum();
            for l in links.iter_mut().filter(|l| &l.source == s) {
                let pct = if total > 0.0 { l.value * 100.0 / total } else { 0.0 };
                l.value = (population * pct / 100.0).ceil();
            }
        }
    }

    let ranked = |pick: fn(&LinkData) -> &str| {
        let mut totals: Vec<(String, f64)> = Vec::new();
        for l in &links {
            match totals.iter_mut().find(|(n, _)| n == pick(l)) {
                Some((_, t)) => *t += l.value,
                None => totals.push((pick(l).to_string(), l.value)),
            }
        }
        totals.sort_by(|a, b| b.1.total_cmp(&a.1));
        totals.into_iter().map(|(n, _)| n).collect::<Vec<_>>()
    };
    let sources = ranked(|l| &l.source);
    let targets = ranked(|l| &l.target);
    AlluvialData {
        nodes: vec![sources, targets],
        links,
    }
}

/// Bubble radius: square-root scale of `count` over `max`.
pub fn bubble_radius(count: f64, max: f64) -> f64 {
    if !(count.is_finite() && max > 0.0) {
        return MIN_BUBBLE_RADIUS;
    }
    let t = (count.max(0.0) / max).sqrt().min(1.0);
    MIN_BUBBLE_RADIUS + (MAX_BUBBLE_RADIUS - MIN_BUBBLE_RADIUS) * t
}

/// One bubble per row across all years: colored by country, labelled by year,
/// sized by the count column (or the value when there is none).
pub fn bubble_input(rows: &[Record], selection: &Selection, columns: &ColumnMap) -> BubbleData {
    let filtered = selection.filter_all_years(rows, columns);
    let label_col = columns.year.as_deref().unwrap_or(columns.label.as_str());
    let key_col = columns.country.as_deref().unwrap_or(columns.label.as_str());
    let percentage: Vec<f64> = filtered.iter().map(|r| r.num(&columns.value)).collect();
    let count: Option<Vec<f64>> = columns
        .count
        .as_deref()
        .map(|c| filtered.iter().map(|r| r.num(c)).collect());
    let sizes = count.as_ref().unwrap_or(&percentage);
    let max = sizes.iter().copied().filter(|v| v.is_finite()).fold(0.0, f64::max);
    BubbleData {
        dimension: sizes.iter().map(|v| bubble_radius(*v, max)).collect(),
        color_key: filtered.iter().map(|r| r.str(key_col).to_string()).collect(),
        label: filtered.iter().map(|r| r.str(label_col).to_string()).collect(),
        percentage,
        count,
    }
}

type Reshape<T, I> = Box<dyn Fn(&[T], &Selection) -> I + Send>;
type Defaults<T> = Box<dyn Fn(&[T]) -> Selection + Send>;

/// Rows, selection and the chart input derived from them.
pub struct Page<T, I> {
    state: LoadState<T>,
    selection: Selection,
    reshape: Reshape<T, I>,
    defaults: Option<Defaults<T>>,
    input: Option<I>,
}

impl<T, I> Page<T, I> {
    pub fn new(reshape: impl Fn(&[T], &Selection) -> I + Send + 'static) -> Self {
        Self {
            state: LoadState::Loading,
            selection: Selection::default(),
            reshape: Box::new(reshape),
            defaults: None,
            input: None,
        }
    }

    /// Pick the selection from the rows once they arrive.
    pub fn with_defaults(mut self, defaults: impl Fn(&[T]) -> Selection + Send + 'static) -> Self {
        self.defaults = Some(Box::new(defaults));
        self
    }

    pub fn state(&self) -> &LoadState<T> {
        &self.state
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// `None` while loading or after a failed load.
    pub fn chart_input(&self) -> Option<&I> {
        self.input.as_ref()
    }

    pub fn set_state(&mut self, state: LoadState<T>) {
        self.state = state;
        if let (Some(rows), Some(defaults)) = (self.state.rows(), &self.defaults) {
            self.selection = defaults(rows);
        }
        self.recompute();
    }

    /// Pull a finished result out of `handle`. Returns whether the state changed.
    pub fn sync(&mut self, handle: &mut DatasetHandle<T>) -> bool
    where
        T: Clone,
    {
        if !self.state.is_loading() || handle.poll().is_loading() {
            return false;
        }
        self.set_state(handle.state().clone());
        true
    }

    /// Apply `change` to the selection; recompute when it reports a change.
    pub fn update_selection(&mut self, change: impl FnOnce(&mut Selection) -> bool) -> bool {
        let changed = change(&mut self.selection);
        if changed {
            self.recompute();
        }
        changed
    }

    fn recompute(&mut self) {
        self.input = self.state.rows().map(|rows| (self.reshape)(rows, &self.selection));
    }
}
