//! Numeric data line parsing

use thiserror::Error;

/// Why a data line was rejected
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseFault {
    /// The line did not split into exactly two comma-separated fields
    #[error("expected 2 comma-separated fields, found {0}")]
    FieldCount(usize),

    /// A field is not a floating-point number
    #[error("invalid number in field {index}: {field:?}")]
    InvalidNumber {
        /// Zero-based field position
        index: usize,
        /// Raw field text
        field: String,
    },
}

/// Parse `"<float>,<float>"` into a pair
///
/// Fields may carry surrounding whitespace. Nothing is returned unless both
/// fields parse.
pub fn parse_pair(line: &str) -> Result<(f64, f64), ParseFault> {
    let mut fields = line.split(',');
    let (Some(a), Some(b), None) = (fields.next(), fields.next(), fields.next()) else {
        return Err(ParseFault::FieldCount(line.split(',').count()));
    };

    Ok((parse_field(0, a)?, parse_field(1, b)?))
}

fn parse_field(index: usize, field: &str) -> Result<f64, ParseFault> {
    field
        .trim()
        .parse::<f64>()
        .map_err(|_| ParseFault::InvalidNumber {
            index,
            field: field.to_string(),
        })
}
