//! Lenient parsing of monetary values with a decimal comma.

use std::sync::LazyLock;

use regex::Regex;

/// Leading decimal number, after the comma has become a point.
static LEADING_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?").expect("valid regex")
});

/// Parse a monetary cell into a number.
///
/// Absent or empty cells read as `"0"`. The first comma becomes the decimal
/// point, surrounding whitespace is trimmed, and the longest leading decimal
/// number is taken (`"12abc"` reads as 12). Anything without a leading number
/// yields `None`.
pub fn parse_amount(raw: Option<&str>) -> Option<f64> {
    let raw = match raw {
        Some(s) if !s.is_empty() => s,
        _ => "0",
    };
    let candidate = raw.replacen(',', ".", 1);
    let candidate = candidate.trim();

    let number = LEADING_NUMBER.find(candidate)?;
    number
        .as_str()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

/// Parse a monetary cell, reading unparsable values as zero.
pub fn amount_or_zero(raw: Option<&str>) -> f64 {
    parse_amount(raw).unwrap_or(0.0)
}

/// Round to two fraction digits.
pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
