//! Z-order (Morton) key codec.
//!
//! A point's coordinates are interleaved bit by bit, most significant bit
//! first: bit `i` of dimension 0, then bit `i` of dimension 1, and so on down
//! to bit 0 of the last dimension. The resulting `precision * dimensions` bit
//! number is rendered as a fixed-width string so that byte order of keys
//! equals numeric order of the interleaved values.

use crate::compute::validation::validate_coordinates;
use crate::error::{IndexError, Result};
use crate::types::Point;
use serde::{Deserialize, Serialize};

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

/// Textual rendering of an interleaved key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum KeyEncoding {
    /// Lower-case base 16, `ceil(bits / 4)` characters.
    #[default]
    Hex,
    /// One `'0'` / `'1'` character per interleaved bit.
    Binary,
}

/// Mask selecting the `length` low-order bits of a coordinate.
#[inline]
pub(crate) const fn low_order_mask(length: u32) -> u64 {
    if length < u64::BITS {
        (1 << length) - 1
    } else {
        u64::MAX
    }
}

/// Interleaving codec for a fixed dimensionality and precision.
///
/// # Examples
///
/// ```rust
/// use lexspace::codec::{KeyEncoding, ZCodec};
///
/// let codec = ZCodec::new(2, 4, KeyEncoding::Binary);
/// // x = 0b0011, y = 0b0101 -> 00 01 10 11
/// assert_eq!(codec.encode(&[3, 5]).unwrap(), "00011011");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZCodec {
    dimensions: usize,
    precision: u32,
    encoding: KeyEncoding,
}

impl ZCodec {
    /// Creates a codec. `precision` must be in `1..=64`; this is checked by
    /// [`crate::IndexConfig::validate`] before an index builds its codec.
    pub fn new(dimensions: usize, precision: u32, encoding: KeyEncoding) -> Self {
        debug_assert!((1..=64).contains(&precision));
        Self {
            dimensions,
            precision,
            encoding,
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn precision(&self) -> u32 {
        self.precision
    }

    pub fn encoding(&self) -> KeyEncoding {
        self.encoding
    }

    /// Number of significant bits in an interleaved key.
    pub fn key_bits(&self) -> usize {
        self.precision as usize * self.dimensions
    }

    /// Length in characters of every encoded key.
    pub fn key_width(&self) -> usize {
        match self.encoding {
            KeyEncoding::Hex => self.key_bits().div_ceil(4),
            KeyEncoding::Binary => self.key_bits(),
        }
    }

    /// Largest coordinate value representable at this precision.
    pub fn max_coordinate(&self) -> u64 {
        low_order_mask(self.precision)
    }

    /// Interleaves `coords` into a fixed-width sortable key.
    ///
    /// Fails with `DimensionMismatch` if `coords` has the wrong arity and with
    /// `OutOfRange` if any coordinate needs more than `precision` bits.
    pub fn encode(&self, coords: &[u64]) -> Result<String> {
        validate_coordinates(coords, self.dimensions, self.precision)?;

        let mut key = Vec::with_capacity(self.key_width());
        match self.encoding {
            KeyEncoding::Binary => {
                for bit in (0..self.precision).rev() {
                    for &c in coords {
                        key.push(if (c >> bit) & 1 == 1 { b'1' } else { b'0' });
                    }
                }
            }
            KeyEncoding::Hex => {
                // Left-pad with zero bits so the total is a whole number of nibbles.
                let mut pending = (self.key_width() * 4 - self.key_bits()) as u32;
                let mut nibble = 0usize;
                for bit in (0..self.precision).rev() {
                    for &c in coords {
                        nibble = (nibble << 1) | ((c >> bit) & 1) as usize;
                        pending += 1;
                        if pending == 4 {
                            key.push(HEX_DIGITS[nibble]);
                            nibble = 0;
                            pending = 0;
                        }
                    }
                }
                debug_assert_eq!(pending, 0);
            }
        }

        // Only ASCII digits were pushed.
        String::from_utf8(key).map_err(|e| IndexError::InvalidInput(e.to_string()))
    }

    /// Recovers the coordinates of an encoded key.
    ///
    /// Not needed for querying (records carry their raw coordinates) but
    /// useful when inspecting keys or grid-cell bounds.
    pub fn decode(&self, key: &str) -> Result<Point> {
        if key.len() != self.key_width() {
            return Err(IndexError::MalformedRecord(format!(
                "Encoded key '{}' has length {}, expected {}",
                key,
                key.len(),
                self.key_width()
            )));
        }

        let bits_per_char = match self.encoding {
            KeyEncoding::Hex => 4,
            KeyEncoding::Binary => 1,
        };
        let padding = self.key_width() * bits_per_char - self.key_bits();

        let mut coords = vec![0u64; self.dimensions];
        let mut position = 0usize;
        for ch in key.chars() {
            let value = ch.to_digit(1 << bits_per_char).ok_or_else(|| {
                IndexError::MalformedRecord(format!("Invalid digit '{}' in key '{}'", ch, key))
            })?;
            for shift in (0..bits_per_char).rev() {
                let bit = u64::from((value >> shift) & 1);
                if position >= padding {
                    let k = position - padding;
                    let dim = k % self.dimensions;
                    let level = self.precision as usize - 1 - k / self.dimensions;
                    coords[dim] |= bit << level;
                } else if bit == 1 {
                    return Err(IndexError::MalformedRecord(format!(
                        "Key '{}' has bits set in its padding",
                        key
                    )));
                }
                position += 1;
            }
        }

        Ok(Point::from(coords))
    }
}
