//! Number formatting and axis label helpers.

use num_format::{Locale, ToFormattedString};

use super::text::estimate_text_width_px;

/// Map a user-provided locale tag to a `num_format::Locale` and its decimal separator char.
///
/// Supported tags (case-insensitive): `en`, `us`, `en_US`, `de`, `de_DE`, `german`,
/// `fr`, `es`, `it`, `pt`, `nl`. Defaults to English.
pub fn map_locale(tag: &str) -> (&'static Locale, char) {
    match tag.to_lowercase().as_str() {
        "de" | "de_de" | "german" => (&Locale::de, ','),
        "fr" | "fr_fr" => (&Locale::fr, ','),
        "es" | "es_es" => (&Locale::es, ','),
        "it" | "it_it" => (&Locale::it, ','),
        "pt" | "pt_pt" | "pt_br" => (&Locale::pt, ','),
        "nl" | "nl_nl" => (&Locale::nl, ','),
        _ => (&Locale::en, '.'),
    }
}

/// Fixed-point formatting with locale thousands grouping, e.g. `12,345.68`.
/// Non-finite values print as `NaN`.
pub fn format_fixed(v: f64, decimals: usize, locale_tag: &str) -> String {
    if !v.is_finite() {
        return "NaN".to_string();
    }
    let (locale, dec_sep) = map_locale(locale_tag);
    let raw = format!("{:.*}", decimals, v.abs());
    let (int_part, frac_part) = match raw.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (raw.as_str(), None),
    };
    let grouped = int_part
        .parse::<u64>()
        .map(|n| n.to_formatted_string(locale))
        .unwrap_or_else(|_| int_part.to_string());
    let negative = v < 0.0 && raw.chars().any(|c| c.is_ascii_digit() && c != '0');
    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&grouped);
    if let Some(f) = frac_part {
        out.push(dec_sep);
        out.push_str(f);
    }
    out
}

/// Tick label: shortest round form of `v` with prefix and suffix.
pub fn format_tick(v: f64, prefix: &str, suffix: &str, locale_tag: &str) -> String {
    let a = v.abs();
    let decimals = if a == 0.0 || a.fract() == 0.0 {
        0
    } else if (a * 10.0).fract().abs() < 1e-9 {
        1
    } else {
        2
    };
    format!("{prefix}{}{suffix}", format_fixed(v, decimals, locale_tag))
}

/// Width in pixels of the widest formatted tick label plus room for tick marks.
pub fn compute_label_area_px(labels: &[String], font_px: f64) -> f64 {
    let max_px = labels
        .iter()
        .map(|l| estimate_text_width_px(l, font_px))
        .fold(0.0, f64::max);
    (max_px + 18.0).clamp(24.0, 160.0)
}
