//! Range decomposition.
//!
//! A query rectangle is covered by a grid of aligned hyper-cubes of side
//! `2^exponent`. Inside one such cube every point shares the same high-order
//! interleaved bits, so all of its records sit in one contiguous stretch of
//! the ordered set: from the key of the cube's low corner to the key of its
//! high corner. Each cube therefore becomes exactly one lexicographic scan.

use crate::codec::{ZCodec, low_order_mask};
use crate::compute::validation::{validate_arity, validate_coordinates};
use crate::error::{IndexError, Result};
use crate::record::DELIMITER;
use crate::storage::{LexBound, LexRange};
use crate::types::{DimVec, Point, QueryRect};
use bytes::Bytes;

/// One grid cell of a decomposition and the scan that reads it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellScan {
    /// Low corner of the cell.
    pub start: Point,
    /// High corner of the cell, inclusive.
    pub end: Point,
    /// Lexicographic range holding every record whose key lies in the cell.
    pub range: LexRange,
}

/// `value >> shift`, zero once every bit has been shifted out.
#[inline]
fn cell_index(value: u64, shift: u32) -> u64 {
    value.checked_shr(shift).unwrap_or(0)
}

/// First and last cell index covering `(low, high)`.
#[inline]
fn cell_span((low, high): (u64, u64), shift: u32) -> (u64, u64) {
    (cell_index(low, shift), cell_index(high, shift))
}

/// Per-dimension `(first, last)` grid cell indices touched by `rect`.
fn cell_bounds(rect: &QueryRect, exponent: u32) -> DimVec<(u64, u64)> {
    rect.ranges()
        .iter()
        .map(|&range| cell_span(range, exponent))
        .collect()
}

/// Number of grid cells (and so scans) needed to cover `rect` at `exponent`.
///
/// Saturates instead of overflowing for huge, fine-grained decompositions.
pub fn cell_count(rect: &QueryRect, exponent: u32) -> u128 {
    cell_bounds(rect, exponent)
        .iter()
        .fold(1u128, |acc, &(first, last)| {
            acc.saturating_mul(u128::from(last.abs_diff(first)) + 1)
        })
}

/// Builds the scan range for a cell given the keys of its two corners.
///
/// The end bound carries a trailing `0xff` byte so that every record sharing
/// the high corner's key is included whatever its coordinate and identifier
/// suffix.
pub fn cell_range(start_key: &str, end_key: &str) -> LexRange {
    let mut start = Vec::with_capacity(start_key.len() + 1);
    start.extend_from_slice(start_key.as_bytes());
    start.push(DELIMITER as u8);

    let mut end = Vec::with_capacity(end_key.len() + 2);
    end.extend_from_slice(end_key.as_bytes());
    end.push(DELIMITER as u8);
    end.push(0xff);

    LexRange::new(
        LexBound::Inclusive(Bytes::from(start)),
        LexBound::Inclusive(Bytes::from(end)),
    )
}

/// Decomposes a normalized rectangle into one scan per grid cell of side `2^exponent`.
///
/// Cells are visited in odometer order: the last dimension advances fastest,
/// carrying into earlier dimensions. The cells are pairwise disjoint and
/// their union is the smallest grid-aligned box containing `rect`.
///
/// # Errors
///
/// `DimensionMismatch` if `rect` does not match the codec, `OutOfRange` if a
/// bound needs more than `precision` bits, `InvalidInput` if a pair is not
/// ordered low to high or `exponent` exceeds the precision.
///
/// # Examples
///
/// ```rust
/// use lexspace::codec::{KeyEncoding, ZCodec};
/// use lexspace::compute::decompose::decompose;
/// use lexspace::QueryRect;
///
/// let codec = ZCodec::new(2, 8, KeyEncoding::Hex);
/// let rect = QueryRect::from([(3, 9), (0, 2)]);
///
/// // Cells of side 4: x spans cells 0..=2, y spans cell 0
/// let scans = decompose(&codec, &rect, 2).unwrap();
/// assert_eq!(scans.len(), 3);
/// assert_eq!(scans[2].start.coords(), &[8, 0]);
/// assert_eq!(scans[2].end.coords(), &[11, 3]);
/// ```
pub fn decompose(codec: &ZCodec, rect: &QueryRect, exponent: u32) -> Result<Vec<CellScan>> {
    validate_arity(rect.dimensions(), codec.dimensions())?;
    if exponent > codec.precision() {
        return Err(IndexError::InvalidInput(format!(
            "Exponent {} exceeds {}-bit precision",
            exponent,
            codec.precision()
        )));
    }
    if let Some(&(low, high)) = rect.ranges().iter().find(|&&(low, high)| low > high) {
        return Err(IndexError::InvalidInput(format!(
            "Range bounds out of order: {} > {}",
            low, high
        )));
    }
    let lows: DimVec<u64> = rect.ranges().iter().map(|&(low, _)| low).collect();
    let highs: DimVec<u64> = rect.ranges().iter().map(|&(_, high)| high).collect();
    validate_coordinates(&lows, codec.dimensions(), codec.precision())?;
    validate_coordinates(&highs, codec.dimensions(), codec.precision())?;

    let bounds = cell_bounds(rect, exponent);
    let mask = low_order_mask(exponent);
    let mut scans = Vec::new();
    let mut current: DimVec<u64> = bounds.iter().map(|&(first, _)| first).collect();

    loop {
        let start: DimVec<u64> = current
            .iter()
            .map(|&cell| cell.checked_shl(exponent).unwrap_or(0))
            .collect();
        let end: DimVec<u64> = start.iter().map(|&corner| corner | mask).collect();

        let range = cell_range(&codec.encode(&start)?, &codec.encode(&end)?);
        log::debug!(
            "Logical cell {:?} from {:?} to {:?}, lex range {:?}..={:?}",
            current.as_slice(),
            start.as_slice(),
            end.as_slice(),
            range.start.to_arg(),
            range.end.to_arg()
        );
        scans.push(CellScan {
            start: Point::new(start),
            end: Point::new(end),
            range,
        });

        // Advance the odometer; stop once every digit has wrapped.
        let mut dim = current.len();
        loop {
            if dim == 0 {
                return Ok(scans);
            }
            dim -= 1;
            if current[dim] < bounds[dim].1 {
                current[dim] += 1;
                break;
            }
            current[dim] = bounds[dim].0;
        }
    }
}
