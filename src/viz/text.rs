//! Text measurement, truncation, wrapping and label splitting.
//!
//! Plotters cannot measure text before drawing, so widths are estimated from
//! the character count.

/// Heuristic: estimate pixel width of text.
pub fn estimate_text_width_px(text: &str, font_px: f64) -> f64 {
    (text.chars().count() as f64 * font_px * 0.60).ceil()
}

/// Truncate to fit `max_px` and add a single ellipsis if needed.
pub fn truncate_to_width(text: &str, font_px: f64, max_px: f64) -> String {
    let mut out = String::new();
    for ch in text.chars() {
        out.push(ch);
        if estimate_text_width_px(&out, font_px) > max_px {
            out.pop();
            if out.is_empty() {
                return out;
            }
            while !out.is_empty() && estimate_text_width_px(&format!("{out}…"), font_px) > max_px {
                out.pop();
            }
            out.push('…');
            return out;
        }
    }
    out
}

/// Greedy word wrap: words are added to the current line until it would exceed
/// `max_px`, then a new line starts with the overflowing word. A single word
/// wider than `max_px` stays on its own line.
pub fn wrap_text_to_width(text: &str, font_px: f64, max_px: f64) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    let mut cur = String::new();
    for word in text.split_whitespace() {
        let candidate = if cur.is_empty() {
            word.to_string()
        } else {
            format!("{cur} {word}")
        };
        if cur.is_empty() || estimate_text_width_px(&candidate, font_px) <= max_px {
            cur = candidate;
        } else {
            lines.push(std::mem::replace(&mut cur, word.to_string()));
        }
    }
    if !cur.is_empty() {
        lines.push(cur);
    }
    lines
}

/// Characters per line that fit in `width` pixels at `font_size` (in rem).
pub fn calculate_max_length(width: f64, font_size: f64) -> usize {
    let char_width = font_size * 8.0;
    if char_width <= 0.0 || !width.is_finite() || width <= 0.0 {
        return 0;
    }
    (width / char_width).floor() as usize
}

/// Split a label into at most `max_lines` lines of about `max_length` chars.
///
/// Words are separated by whitespace or `-`. A single unsplittable word longer
/// than `max_length` is cut and ends in `...`, as is the last kept line when
/// the label needs more than `max_lines` lines.
pub fn split_text(text: &str, max_length: usize, max_lines: usize) -> Vec<String> {
    let words: Vec<&str> = text
        .split(|c: char| c.is_whitespace() || c == '-')
        .filter(|w| !w.is_empty())
        .collect();

    if words.len() <= 1 {
        let word = words.first().copied().unwrap_or(text);
        if word.chars().count() > max_length {
            return vec![ellipsize(word, max_length)];
        }
        return vec![word.to_string()];
    }

    let mut lines: Vec<String> = Vec::new();
    let mut cur = String::new();
    for word in words {
        if cur.is_empty() || cur.chars().count() + word.chars().count() <= max_length {
            if !cur.is_empty() {
                cur.push(' ');
            }
            cur.push_str(word);
        } else {
            lines.push(std::mem::replace(&mut cur, word.to_string()));
        }
    }
    if !cur.is_empty() {
        lines.push(cur);
    }

    if max_lines > 0 && lines.len() > max_lines {
        lines.truncate(max_lines);
        let last = lines.pop().unwrap_or_default();
        lines.push(ellipsize(&last, max_length));
    }
    lines
}

fn ellipsize(word: &str, max_length: usize) -> String {
    let keep: String = word.chars().take(max_length.saturating_sub(3)).collect();
    format!("{keep}...")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn width_estimate_scales_with_font() {
        assert_eq!(estimate_text_width_px("abcde", 10.0), 30.0);
    }

    #[test]
    fn truncation_adds_ellipsis() {
        let t = truncate_to_width("Netherlands", 10.0, 40.0);
        assert!(t.ends_with('…'));
        assert!(estimate_text_width_px(&t, 10.0) <= 40.0);
        assert_eq!(truncate_to_width("Italy", 10.0, 100.0), "Italy");
    }

    #[test]
    fn wrap_breaks_on_words() {
        let lines = wrap_text_to_width("Daily internet users in rural areas", 10.0, 100.0);
        assert!(lines.len() > 1);
        assert!(lines.iter().all(|l| !l.starts_with(' ')));
        assert_eq!(lines.join(" "), "Daily internet users in rural areas");
    }

    #[test]
    fn max_length_uses_eight_px_per_rem() {
        assert_eq!(calculate_max_length(200.0, 0.8), 31);
        assert_eq!(calculate_max_length(0.0, 0.8), 0);
    }

    #[test]
    fn split_single_long_word() {
        assert_eq!(split_text("Telecommunications", 10, 2), vec!["Telecom..."]);
        assert_eq!(split_text("Italy", 10, 2), vec!["Italy"]);
    }

    #[test]
    fn split_respects_max_lines() {
        let lines = split_text("Individuals using the internet for banking", 12, 2);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "Individuals");
        assert!(lines[1].ends_with("..."));
    }

    #[test]
    fn split_treats_hyphen_as_break() {
        assert_eq!(split_text("e-government users", 11, 3), vec!["e government", "users"]);
    }
}
