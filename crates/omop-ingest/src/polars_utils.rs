//! Polars AnyValue utility functions.
//!
//! Helpers for reading string and integer cells back out of linked frames.

use polars::prelude::AnyValue;

/// Converts an AnyValue to a String, keeping Null distinct from empty text.
pub fn any_to_optional_string(value: AnyValue<'_>) -> Option<String> {
    match value {
        AnyValue::Null => None,
        AnyValue::Int8(v) => Some(v.to_string()),
        AnyValue::Int16(v) => Some(v.to_string()),
        AnyValue::Int32(v) => Some(v.to_string()),
        AnyValue::Int64(v) => Some(v.to_string()),
        AnyValue::UInt8(v) => Some(v.to_string()),
        AnyValue::UInt16(v) => Some(v.to_string()),
        AnyValue::UInt32(v) => Some(v.to_string()),
        AnyValue::UInt64(v) => Some(v.to_string()),
        AnyValue::Float32(v) => Some(format_numeric(f64::from(v))),
        AnyValue::Float64(v) => Some(format_numeric(v)),
        AnyValue::String(s) => Some(s.to_string()),
        AnyValue::StringOwned(s) => Some(s.to_string()),
        other => Some(other.to_string()),
    }
}

/// Formats a floating-point number as a string without trailing zeros.
fn format_numeric(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        v.to_string()
    }
}

/// Converts an AnyValue to i64, returning None for non-integer or null values.
pub fn any_to_i64(value: AnyValue<'_>) -> Option<i64> {
    match value {
        AnyValue::Null => None,
        AnyValue::Int8(v) => Some(i64::from(v)),
        AnyValue::Int16(v) => Some(i64::from(v)),
        AnyValue::Int32(v) => Some(i64::from(v)),
        AnyValue::Int64(v) => Some(v),
        AnyValue::UInt8(v) => Some(i64::from(v)),
        AnyValue::UInt16(v) => Some(i64::from(v)),
        AnyValue::UInt32(v) => Some(i64::from(v)),
        AnyValue::UInt64(v) => i64::try_from(v).ok(),
        AnyValue::String(s) => s.trim().parse::<i64>().ok(),
        AnyValue::StringOwned(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_stays_distinct() {
        assert_eq!(any_to_optional_string(AnyValue::Null), None);
        assert_eq!(
            any_to_optional_string(AnyValue::String("")),
            Some(String::new())
        );
    }

    #[test]
    fn numbers_render_without_float_noise() {
        assert_eq!(
            any_to_optional_string(AnyValue::Float64(5.0)).as_deref(),
            Some("5")
        );
        assert_eq!(
            any_to_optional_string(AnyValue::Float64(36.6)).as_deref(),
            Some("36.6")
        );
        assert_eq!(any_to_i64(AnyValue::String(" 12 ")), Some(12));
        assert_eq!(any_to_i64(AnyValue::Int64(-3)), Some(-3));
    }
}
