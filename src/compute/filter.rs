//! Exact filtering of scan results.
//!
//! Grid cells cover a superset of the query rectangle, so scans return
//! records lying just outside it. Each record carries its raw coordinates,
//! which are checked against the rectangle as the caller gave it.

use crate::error::Result;
use crate::record::{RecordFormat, parse_identifier};
use crate::types::{Entry, Identifier, QueryRect};
use bytes::Bytes;

/// Keeps the records whose coordinates lie inside `rect` and parses them into entries.
///
/// `rect` must be normalized. A record that cannot be parsed fails the whole
/// call with `MalformedRecord`.
pub fn filter_records<I, R>(
    format: &RecordFormat,
    rect: &QueryRect,
    records: R,
) -> Result<Vec<Entry<I>>>
where
    I: Identifier,
    R: IntoIterator<Item = Bytes>,
{
    let mut entries = Vec::new();
    let mut rejected = 0usize;

    for record in records {
        let (point, id_text) = format.parse_fields(&record)?;
        if !rect.contains(&point) {
            log::trace!("Filtered out {} at {}", id_text, point);
            rejected += 1;
            continue;
        }
        let id = parse_identifier(id_text)?;
        entries.push(Entry { point, id });
    }

    log::debug!(
        "Kept {} records, filtered {} outside {:?}",
        entries.len(),
        rejected,
        rect.ranges()
    );
    Ok(entries)
}
