//! Validation for points, query rectangles and identifiers.

use crate::codec::low_order_mask;
use crate::error::{IndexError, Result};
use crate::record::DELIMITER;

/// Validates that `coords` has `dimensions` components, each fitting in `precision` bits.
///
/// # Examples
///
/// ```
/// use lexspace::compute::validation::validate_coordinates;
///
/// assert!(validate_coordinates(&[255, 0], 2, 8).is_ok());
///
/// // Needs 9 bits
/// assert!(validate_coordinates(&[256, 0], 2, 8).is_err());
///
/// // Wrong arity
/// assert!(validate_coordinates(&[1, 2, 3], 2, 8).is_err());
/// ```
pub fn validate_coordinates(coords: &[u64], dimensions: usize, precision: u32) -> Result<()> {
    validate_arity(coords.len(), dimensions)?;

    let max = low_order_mask(precision);
    if let Some(&value) = coords.iter().find(|&&c| c > max) {
        return Err(IndexError::OutOfRange { value, precision });
    }

    Ok(())
}

/// Validates that a point or rectangle has one component per dimension.
pub fn validate_arity(got: usize, expected: usize) -> Result<()> {
    if got != expected {
        return Err(IndexError::DimensionMismatch { expected, got });
    }
    Ok(())
}

/// Validates the text form of an identifier before it is written into a record.
///
/// Empty identifiers and identifiers containing the record delimiter cannot be
/// parsed back out of a stored record.
pub fn validate_identifier_text(text: &str) -> Result<()> {
    if text.is_empty() {
        return Err(IndexError::InvalidInput(
            "Identifier cannot be empty".into(),
        ));
    }

    if text.contains(DELIMITER) {
        return Err(IndexError::InvalidInput(format!(
            "Identifier '{}' cannot contain delimiter '{}'",
            text, DELIMITER
        )));
    }

    Ok(())
}
