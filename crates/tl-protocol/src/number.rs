//! Numeric line encoding
//!
//! Temperatures and thresholds travel as plain decimal text. Parsing is
//! strict: surrounding whitespace is ignored, but trailing garbage, `NaN`
//! and infinities are rejected.

use crate::error::ProtocolError;

/// Parse a protocol line holding a single finite decimal number
pub fn parse_number(line: &str) -> Result<f64, ProtocolError> {
    let trimmed = line.trim();
    let value: f64 = trimmed
        .parse()
        .map_err(|_| ProtocolError::InvalidNumber(trimmed.to_string()))?;

    if !value.is_finite() {
        return Err(ProtocolError::NonFinite(trimmed.to_string()));
    }

    Ok(value)
}

/// Format a threshold the way the controller writes it: one fractional digit
pub fn format_threshold(value: f64) -> String {
    format!("{:.1}", value)
}

/// Format a temperature reading for the node's reply line.
///
/// Whole numbers keep a `.0` suffix so the line always reads as a decimal.
pub fn format_reading(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_number_accepts_decimals() {
        assert_eq!(parse_number("23.7").unwrap(), 23.7);
        assert_eq!(parse_number(" 42 ").unwrap(), 42.0);
        assert_eq!(parse_number("-5.5").unwrap(), -5.5);
    }

    #[test]
    fn test_parse_number_rejects_garbage() {
        for line in ["", "hot", "42.0abc", "get temp", "4 2"] {
            assert!(
                matches!(parse_number(line), Err(ProtocolError::InvalidNumber(_))),
                "line {:?} should be rejected",
                line
            );
        }
    }

    #[test]
    fn test_parse_number_rejects_non_finite() {
        for line in ["NaN", "inf", "-infinity"] {
            assert!(matches!(parse_number(line), Err(ProtocolError::NonFinite(_))));
        }
    }

    #[test]
    fn test_format_reading() {
        assert_eq!(format_reading(23.7), "23.7");
        assert_eq!(format_reading(42.0), "42.0");
        assert_eq!(format_reading(48.312), "48.312");
    }

    #[test]
    fn test_format_threshold() {
        assert_eq!(format_threshold(50.0), "50.0");
        assert_eq!(format_threshold(40.04), "40.0");
    }
}
