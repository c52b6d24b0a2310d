//! Stored record format.
//!
//! Each indexed point is held in the ordered store as a single member string:
//!
//! ```text
//! <interleaved key>:<coord 0>:<coord 1>:...:<coord D-1>:<identifier>
//! ```
//!
//! The key prefix gives the member its place on the Z-order curve; the raw
//! decimal coordinates let query results be filtered exactly without
//! decoding the key; the identifier comes last.

use crate::codec::ZCodec;
use crate::compute::validation::validate_identifier_text;
use crate::error::{IndexError, Result};
use crate::types::{Entry, Identifier, Point};
use bytes::Bytes;
use std::fmt;

/// Field separator inside a stored record.
pub const DELIMITER: char = ':';

/// Builds and parses stored records for one index shape.
#[derive(Debug, Clone, Copy)]
pub struct RecordFormat {
    codec: ZCodec,
}

impl RecordFormat {
    pub fn new(codec: ZCodec) -> Self {
        Self { codec }
    }

    pub fn codec(&self) -> &ZCodec {
        &self.codec
    }

    /// Builds the record for `coords` tagged with `id`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use lexspace::codec::{KeyEncoding, ZCodec};
    /// use lexspace::record::RecordFormat;
    ///
    /// let format = RecordFormat::new(ZCodec::new(2, 4, KeyEncoding::Hex));
    /// let record = format.format(&[3, 5], &"Josh").unwrap();
    /// assert_eq!(&record[..], b"1b:3:5:Josh");
    /// ```
    pub fn format<I: fmt::Display + ?Sized>(&self, coords: &[u64], id: &I) -> Result<Bytes> {
        let id_text = id.to_string();
        validate_identifier_text(&id_text)?;

        let mut record = self.codec.encode(coords)?;
        for c in coords {
            record.push(DELIMITER);
            record.push_str(&c.to_string());
        }
        record.push(DELIMITER);
        record.push_str(&id_text);

        Ok(Bytes::from(record))
    }

    /// Splits a record into its coordinates and the identifier text.
    pub fn parse_fields<'a>(&self, record: &'a [u8]) -> Result<(Point, &'a str)> {
        let text = std::str::from_utf8(record).map_err(|e| {
            IndexError::MalformedRecord(format!("Record is not valid UTF-8: {}", e))
        })?;

        let dimensions = self.codec.dimensions();
        let fields: Vec<&str> = text.split(DELIMITER).collect();
        if fields.len() != dimensions + 2 {
            return Err(IndexError::MalformedRecord(format!(
                "Record '{}' has {} fields, expected {}",
                text,
                fields.len(),
                dimensions + 2
            )));
        }

        let coords = fields[1..=dimensions]
            .iter()
            .map(|field| {
                field.parse::<u64>().map_err(|_| {
                    IndexError::MalformedRecord(format!(
                        "Record '{}' has non-numeric coordinate '{}'",
                        text, field
                    ))
                })
            })
            .collect::<Result<Vec<u64>>>()?;

        Ok((Point::from(coords), fields[dimensions + 1]))
    }

    /// Parses a record back into an entry.
    pub fn parse<I: Identifier>(&self, record: &[u8]) -> Result<Entry<I>> {
        let (point, id_text) = self.parse_fields(record)?;
        let id = parse_identifier(id_text)?;
        Ok(Entry { point, id })
    }
}

pub(crate) fn parse_identifier<I: Identifier>(text: &str) -> Result<I> {
    text.parse::<I>().map_err(|_| {
        IndexError::MalformedRecord(format!("Cannot parse identifier '{}'", text))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::KeyEncoding;

    fn format_2d() -> RecordFormat {
        RecordFormat::new(ZCodec::new(2, 64, KeyEncoding::Hex))
    }

    #[test]
    fn test_format_layout() {
        let record = format_2d().format(&[45, 120000], &"Josh").unwrap();
        let text = std::str::from_utf8(&record).unwrap();
        let fields: Vec<&str> = text.split(':').collect();
        assert_eq!(fields.len(), 4);
        assert_eq!(fields[0].len(), 32);
        assert_eq!(&fields[1..], &["45", "120000", "Josh"]);
    }

    #[test]
    fn test_parse_entry() {
        let format = format_2d();
        let record = format.format(&[50, 110000], &"Pamela".to_string()).unwrap();
        let entry: Entry<String> = format.parse(&record).unwrap();
        assert_eq!(entry.point, Point::new([50, 110000]));
        assert_eq!(entry.id, "Pamela");
    }

    #[test]
    fn test_numeric_identifiers() {
        let format = format_2d();
        let record = format.format(&[1, 2], &17u32).unwrap();
        let entry: Entry<u32> = format.parse(&record).unwrap();
        assert_eq!(entry.id, 17);
    }

    #[test]
    fn test_format_rejects_wrong_arity() {
        assert!(matches!(
            format_2d().format(&[1], &"x"),
            Err(IndexError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_format_rejects_delimiter_in_identifier() {
        assert!(matches!(
            format_2d().format(&[1, 2], &"a:b"),
            Err(IndexError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_parse_rejects_wrong_field_count() {
        let format = format_2d();
        assert!(matches!(
            format.parse_fields(b"00:1:Josh"),
            Err(IndexError::MalformedRecord(_))
        ));
        assert!(matches!(
            format.parse_fields(b"00:1:2:3:Josh"),
            Err(IndexError::MalformedRecord(_))
        ));
    }

    #[test]
    fn test_parse_rejects_bad_coordinates() {
        let format = format_2d();
        assert!(format.parse_fields(b"00:1:-2:Josh").is_err());
        assert!(format.parse_fields(b"00:x:2:Josh").is_err());
        let not_utf8 = [0xff, b':', b'1', b':', b'2', b':', b'a'];
        assert!(format.parse_fields(&not_utf8).is_err());
    }

    #[test]
    fn test_parse_rejects_unparseable_identifier() {
        let format = format_2d();
        let record = format.format(&[1, 2], &"Josh").unwrap();
        assert!(format.parse::<u32>(&record).is_err());
    }
}
