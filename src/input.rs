//! Normalization of hand-typed numbers such as `"$6,000"` or `"66.5"`.
//!
//! Hosts run raw text through here before calling the engine, which only
//! accepts `Option<f64>`.

/// Strips everything except digits and the decimal point, then parses.
/// Returns `None` for empty or unparseable input.
pub fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|ch| ch.is_ascii_digit() || *ch == '.')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|value| value.is_finite())
}

/// Whole-dollar currency with thousands separators, e.g. `$12,500`.
pub fn format_currency(value: f64) -> String {
    let rounded = value.round() as i64;
    let digits = rounded.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if rounded < 0 {
        format!("-${grouped}")
    } else {
        format!("${grouped}")
    }
}

/// Reads a number written by the engine (`-250`, `107.63199999999999`),
/// falling back to [`parse_number`] for hand-typed text such as `"$6,000"`.
pub fn parse_stored_number(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => Some(value),
        Ok(_) => None,
        Err(_) => parse_number(raw),
    }
}
