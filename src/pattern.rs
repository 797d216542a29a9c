/// Regex helpers shared by the extractors.
///
/// `capture_all` is the multi-value primitive used for metrics that are
/// reported once per sub-run; `parse_float` converts a captured string the
/// lenient way benchmark harnesses expect (leading numeric prefix wins).
use regex::Regex;
use std::sync::LazyLock;

static FLOAT_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(?:Infinity|(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?)").unwrap()
});

/// Collect capture group 1 of every non-overlapping match, in order.
///
/// A match whose first group did not participate (or a pattern with no
/// groups at all) contributes an empty string, which `parse_float` turns
/// into `NaN`. Matches are never dropped.
pub fn capture_all<'t>(re: &Regex, text: &'t str) -> Vec<&'t str> {
    re.captures_iter(text)
        .map(|caps| caps.get(1).map_or("", |m| m.as_str()))
        .collect()
}

/// First capture group of the first match, if any.
pub fn capture_first<'t>(re: &Regex, text: &'t str) -> Option<&'t str> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Parse the longest leading float prefix of `s`, skipping leading whitespace.
///
/// Returns `NaN` when no numeric prefix exists.
pub fn parse_float(s: &str) -> f64 {
    let trimmed = s.trim_start();
    let Some(m) = FLOAT_PREFIX.find(trimmed) else {
        return f64::NAN;
    };
    let digits = m.as_str();
    match digits.trim_start_matches(['+', '-']) {
        "Infinity" => {
            if digits.starts_with('-') {
                f64::NEG_INFINITY
            } else {
                f64::INFINITY
            }
        }
        _ => digits.parse().unwrap_or(f64::NAN),
    }
}
