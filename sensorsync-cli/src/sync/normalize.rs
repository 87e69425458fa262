//! Canonical string form for raw cell values
//!
//! Dedup keys compare string-for-string across runs and across the remote
//! echo of a created record, so every value that feeds a key goes through
//! `normalize_text` first. The function is idempotent: re-normalizing its own
//! output changes nothing.

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

/// Trailing UTC offset on a time-of-day string, e.g. `+05:00`.
fn offset_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[+-]\d{2}:\d{2}$").unwrap())
}

/// Normalize a JSON cell value to its canonical string form.
pub fn normalize_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.as_f64().map(format_number).unwrap_or_default(),
        Value::String(s) => normalize_text(s),
        other => normalize_text(&other.to_string()),
    }
}

/// Normalize raw text. Rules, in order:
///
/// 1. Empty and not-a-value sentinels (`nan`, `NaT`, `None`) read as empty.
/// 2. Values containing `:` and longer than 5 chars are times of day:
///    fractional seconds and trailing offsets are noise from re-exports.
/// 3. Anything that parses as a number renders without formatting variance
///    (`3.0` and `3` are the same reading).
/// 4. Everything else passes through trimmed.
pub fn normalize_text(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    match trimmed.to_ascii_lowercase().as_str() {
        "nan" | "nat" | "none" => return String::new(),
        _ => {}
    }

    if trimmed.contains(':') && trimmed.len() > 5 {
        return normalize_time(trimmed);
    }

    if let Ok(n) = trimmed.parse::<f64>() {
        if n.is_finite() {
            return format_number(n);
        }
    }

    trimmed.to_string()
}

/// Strip fractional seconds and timezone suffixes from a time-of-day string.
fn normalize_time(raw: &str) -> String {
    let base = raw.split('.').next().unwrap_or(raw);
    let base = base.strip_suffix('Z').unwrap_or(base);
    offset_pattern().replace(base, "").trim().to_string()
}

/// Render a float as an integer when it has no fractional part, otherwise as
/// the shortest unambiguous decimal.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sentinels_read_empty() {
        assert_eq!(normalize_text(""), "");
        assert_eq!(normalize_text("  "), "");
        assert_eq!(normalize_text("nan"), "");
        assert_eq!(normalize_text("NaN"), "");
        assert_eq!(normalize_text("NaT"), "");
        assert_eq!(normalize_text("None"), "");
    }

    #[test]
    fn test_time_strips_fraction_and_offset() {
        assert_eq!(normalize_text("20:57:45.000+05:00"), "20:57:45");
        assert_eq!(normalize_text("20:57:45+05:00"), "20:57:45");
        assert_eq!(normalize_text("20:57:45-08:00"), "20:57:45");
        assert_eq!(normalize_text("20:57:45Z"), "20:57:45");
        assert_eq!(normalize_text("08:15:00"), "08:15:00");
    }

    #[test]
    fn test_short_clock_strings_pass_through() {
        // Five chars or less is not treated as a time-of-day
        assert_eq!(normalize_text("12:03"), "12:03");
    }

    #[test]
    fn test_datetime_text_is_preserved() {
        assert_eq!(
            normalize_text("2024-05-01 20:57:45"),
            "2024-05-01 20:57:45"
        );
    }

    #[test]
    fn test_numbers_lose_formatting_variance() {
        assert_eq!(normalize_text("3.0"), "3");
        assert_eq!(normalize_text("3.50"), "3.5");
        assert_eq!(normalize_text("-2.0"), "-2");
        assert_eq!(normalize_text("0.25"), "0.25");
        assert_eq!(normalize_text("1e3"), "1000");
    }

    #[test]
    fn test_free_text_is_trimmed() {
        assert_eq!(normalize_text("  Kitchen  "), "Kitchen");
        assert_eq!(normalize_text("FALL_DETECTED"), "FALL_DETECTED");
        assert_eq!(normalize_text("inf"), "inf");
    }

    #[test]
    fn test_idempotence() {
        let inputs = [
            "20:57:45.000+05:00",
            "3.0",
            "nan",
            "  Kitchen  ",
            "2024-05-01 20:57:45",
            "12:03",
            "23.5",
            "FALL_DETECTED",
            "",
        ];
        for input in inputs {
            let once = normalize_text(input);
            assert_eq!(normalize_text(&once), once, "not idempotent for {input:?}");
        }
    }

    #[test]
    fn test_normalize_cell_variants() {
        assert_eq!(normalize_cell(&Value::Null), "");
        assert_eq!(normalize_cell(&json!(true)), "true");
        assert_eq!(normalize_cell(&json!(3.0)), "3");
        assert_eq!(normalize_cell(&json!(23.5)), "23.5");
        assert_eq!(normalize_cell(&json!("  7.0 ")), "7");
    }
}
