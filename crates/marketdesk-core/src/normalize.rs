//! Coercion of loosely typed upstream numerics into finite `f64` values.
//!
//! Upstream providers report numbers as JSON numbers, numeric strings, the literal
//! `"None"`, or not at all. Absence and malformed input both collapse to zero; callers
//! that must tell "reported as zero" from "not reported" use [`parse_finite`] instead.

use serde_json::Value;

/// Returns the finite number carried by `value`, or `None` when it is absent or malformed.
pub fn parse_finite(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64().filter(|parsed| parsed.is_finite()),
        Value::String(text) => parse_numeric_text(text),
        Value::Null | Value::Bool(_) | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Same as [`parse_finite`] but tolerates a trailing `%`, as in `"1.2345%"`.
pub fn parse_percent(value: &Value) -> Option<f64> {
    match value {
        Value::String(text) => {
            let trimmed = text.trim();
            parse_numeric_text(trimmed.strip_suffix('%').unwrap_or(trimmed))
        }
        other => parse_finite(other),
    }
}

/// Total conversion: absent, `null`, `"none"`, blank and unparseable input all yield `0`.
pub fn to_number(value: Option<&Value>) -> f64 {
    value.and_then(parse_finite).unwrap_or(0.0)
}

/// Whether a field counts as reported: not `null`, not blank, not the literal `"none"`.
pub fn is_reported(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(text)) => !is_blank_or_none(text),
        Some(_) => true,
    }
}

fn parse_numeric_text(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if is_blank_or_none(trimmed) {
        return None;
    }
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|parsed| parsed.is_finite())
}

fn is_blank_or_none(text: &str) -> bool {
    let trimmed = text.trim();
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none")
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn absent_and_placeholder_inputs_become_zero() {
        assert_eq!(to_number(None), 0.0);
        assert_eq!(to_number(Some(&Value::Null)), 0.0);
        assert_eq!(to_number(Some(&json!("None"))), 0.0);
        assert_eq!(to_number(Some(&json!("none"))), 0.0);
        assert_eq!(to_number(Some(&json!(""))), 0.0);
        assert_eq!(to_number(Some(&json!("   "))), 0.0);
        assert_eq!(to_number(Some(&json!("abc"))), 0.0);
    }

    #[test]
    fn numeric_strings_and_numbers_pass_through() {
        assert_eq!(to_number(Some(&json!("42.5"))), 42.5);
        assert_eq!(to_number(Some(&json!(" 42.5 "))), 42.5);
        assert_eq!(to_number(Some(&json!(42.5))), 42.5);
        assert_eq!(to_number(Some(&json!("-1.5e3"))), -1500.0);
    }

    #[test]
    fn non_finite_text_is_rejected() {
        assert_eq!(parse_finite(&json!("NaN")), None);
        assert_eq!(parse_finite(&json!("inf")), None);
        assert_eq!(parse_finite(&json!("-Infinity")), None);
        assert_eq!(to_number(Some(&json!("NaN"))), 0.0);
    }

    #[test]
    fn structured_values_are_not_numbers() {
        assert_eq!(parse_finite(&json!(true)), None);
        assert_eq!(parse_finite(&json!([1.0])), None);
        assert_eq!(parse_finite(&json!({ "v": 1.0 })), None);
    }

    #[test]
    fn percent_strings_drop_their_suffix() {
        assert_eq!(parse_percent(&json!("1.2345%")), Some(1.2345));
        assert_eq!(parse_percent(&json!("-0.5 %")), Some(-0.5));
        assert_eq!(parse_percent(&json!(0.75)), Some(0.75));
        assert_eq!(parse_percent(&json!("%")), None);
    }

    #[test]
    fn reported_means_present_and_meaningful() {
        assert!(!is_reported(None));
        assert!(!is_reported(Some(&Value::Null)));
        assert!(!is_reported(Some(&json!(" None "))));
        assert!(!is_reported(Some(&json!(""))));
        assert!(is_reported(Some(&json!("AAPL"))));
        assert!(is_reported(Some(&json!(0))));
        assert!(is_reported(Some(&json!([]))));
    }
}
