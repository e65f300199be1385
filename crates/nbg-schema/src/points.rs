//! Points input handling

use crate::error::SchemaError;
use serde_json::Value;

/// Validate a points string typed by a user
///
/// # Errors
/// - [`SchemaError::EmptyPoints`] for blank input
/// - [`SchemaError::NonNumericPoints`] when the input is not a number
/// - [`SchemaError::NegativePoints`] when the value is below zero
pub fn validate_points(input: &str) -> Result<f64, SchemaError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(SchemaError::EmptyPoints);
    }
    let value = parse_number(trimmed).ok_or(SchemaError::NonNumericPoints)?;
    if value < 0.0 {
        return Err(SchemaError::NegativePoints);
    }
    Ok(value)
}

/// Parse a points string, falling back to 0 for junk and clamping at 0
#[must_use]
pub fn parse_points(input: &str) -> f64 {
    parse_number(input.trim()).map_or(0.0, |v| v.max(0.0))
}

/// Coerce a stored `points` value into a usable non-negative number
///
/// Numbers and numeric strings are accepted; anything else becomes 0.
#[must_use]
pub fn coerce_points(value: Option<&Value>) -> f64 {
    let number = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => parse_number(s.trim()),
        _ => None,
    };
    number.filter(|n| n.is_finite()).map_or(0.0, |n| n.max(0.0))
}

fn parse_number(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}
