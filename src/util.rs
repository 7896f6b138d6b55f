// Utility helpers for value coercion, rounding, and number formatting.
//
// This module centralizes all the "dirty" JSON/number handling so the rest
// of the code can assume clean, typed values.
use num_format::{Locale, ToFormattedString};
use serde_json::Value;

/// Coerce a raw JSON value into a non-negative counter.
///
/// Backend payloads are inconsistent about numeric typing: the same counter
/// arrives as a JSON number in one feed and as a string (sometimes with
/// thousands separators) in another.
///
/// - Integer numbers are used directly; negatives clamp to 0.
/// - Float numbers are rounded; non-finite or negative values become 0.
/// - Strings are trimmed, stripped of `","`, and parsed; anything containing
///   alphabetic characters is rejected.
/// - `null`, booleans, arrays, and objects all coerce to 0.
pub fn count_from_value(v: Option<&Value>) -> u64 {
    let Some(v) = v else { return 0 };
    match v {
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                u
            } else if let Some(i) = n.as_i64() {
                i.max(0) as u64
            } else if let Some(f) = n.as_f64() {
                if f.is_finite() && f > 0.0 {
                    f.round() as u64
                } else {
                    0
                }
            } else {
                0
            }
        }
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() || s.chars().any(|c| c.is_ascii_alphabetic()) {
                return 0;
            }
            let s = s.replace(',', "");
            match s.parse::<i64>() {
                Ok(i) => i.max(0) as u64,
                Err(_) => s
                    .parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite() && *f > 0.0)
                    .map(|f| f.round() as u64)
                    .unwrap_or(0),
            }
        }
        _ => 0,
    }
}

/// Extract a non-empty identity string from a raw JSON value.
///
/// Strings are trimmed; whitespace-only strings count as missing. Numeric
/// ids are accepted and stringified (some feeds send counsellor ids as
/// numbers). Everything else is treated as missing.
pub fn text_from_value(v: Option<&Value>) -> Option<String> {
    match v? {
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                None
            } else {
                Some(s.to_string())
            }
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Round a non-negative percentage to one decimal place, half-up.
pub fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    // Thin wrapper around `num-format` for integer-like values, used for
    // counts in console messages and table cells (e.g., `9,855`).
    n.to_formatted_string(&Locale::en)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn counts_accept_numbers_and_numeric_strings() {
        assert_eq!(count_from_value(Some(&json!(42))), 42);
        assert_eq!(count_from_value(Some(&json!("42"))), 42);
        assert_eq!(count_from_value(Some(&json!("1,204"))), 1204);
        assert_eq!(count_from_value(Some(&json!(" 7 "))), 7);
    }

    #[test]
    fn counts_clamp_negatives_and_reject_junk() {
        assert_eq!(count_from_value(Some(&json!(-3))), 0);
        assert_eq!(count_from_value(Some(&json!("-3"))), 0);
        assert_eq!(count_from_value(Some(&json!("n/a"))), 0);
        assert_eq!(count_from_value(Some(&json!(null))), 0);
        assert_eq!(count_from_value(Some(&json!([1, 2]))), 0);
        assert_eq!(count_from_value(None), 0);
    }

    #[test]
    fn text_trims_and_rejects_blank() {
        assert_eq!(text_from_value(Some(&json!("  Priya  "))), Some("Priya".to_string()));
        assert_eq!(text_from_value(Some(&json!("   "))), None);
        assert_eq!(text_from_value(Some(&json!(1042))), Some("1042".to_string()));
        assert_eq!(text_from_value(Some(&json!(null))), None);
    }

    #[test]
    fn round1_is_half_up() {
        assert_eq!(round1(33.25), 33.3);
        assert_eq!(round1(33.24), 33.2);
        assert_eq!(round1(0.0), 0.0);
        assert_eq!(round1(50.0), 50.0);
    }
}
