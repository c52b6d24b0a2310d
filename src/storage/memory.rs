//! In-memory ordered store implementation.

use super::{
    LexBound, LexRange, OrderedStore, ReadOp, ReadReply, StorageStats, StoreResult, WriteOp,
};
use bytes::Bytes;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;
use std::ops::Bound;

#[derive(Default)]
struct MemoryInner {
    sets: FxHashMap<Bytes, BTreeSet<Bytes>>,
    maps: FxHashMap<Bytes, FxHashMap<Bytes, Bytes>>,
    operations_count: u64,
    batch_count: u64,
}

impl MemoryInner {
    fn apply(&mut self, op: &WriteOp) {
        match op {
            WriteOp::InsertOrdered { set, member } => {
                self.sets
                    .entry(set.clone())
                    .or_default()
                    .insert(member.clone());
            }
            WriteOp::RemoveOrdered { set, member } => {
                if let Some(members) = self.sets.get_mut(set) {
                    members.remove(member);
                    if members.is_empty() {
                        self.sets.remove(set);
                    }
                }
            }
            WriteOp::MapSet { map, field, value } => {
                self.maps
                    .entry(map.clone())
                    .or_default()
                    .insert(field.clone(), value.clone());
            }
            WriteOp::MapDelete { map, field } => {
                if let Some(fields) = self.maps.get_mut(map) {
                    fields.remove(field);
                    if fields.is_empty() {
                        self.maps.remove(map);
                    }
                }
            }
        }
        self.operations_count += 1;
    }

    fn scan(&self, set: &[u8], range: &LexRange) -> Vec<Bytes> {
        let Some(members) = self.sets.get(set) else {
            return Vec::new();
        };
        let Some(bounds) = btree_bounds(range) else {
            return Vec::new();
        };
        members.range::<[u8], _>(bounds).cloned().collect()
    }

    fn get(&self, map: &[u8], field: &[u8]) -> Option<Bytes> {
        self.maps
            .get(map)
            .and_then(|fields| fields.get(field).cloned())
    }
}

/// In-memory ordered store using a `BTreeSet` per ordered set
///
/// Reads and writes go through one `RwLock`; an atomic batch is applied
/// entirely under the write lock, so no reader observes half of it.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryInner>,
}

impl MemoryStore {
    /// Create a new, empty in-memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// All members of `set` in order.
    pub fn members(&self, set: &[u8]) -> Vec<Bytes> {
        self.inner
            .read()
            .sets
            .get(set)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of members in `set`.
    pub fn cardinality(&self, set: &[u8]) -> usize {
        self.inner.read().sets.get(set).map_or(0, BTreeSet::len)
    }

    /// All fields of `map`, unordered.
    pub fn map_entries(&self, map: &[u8]) -> Vec<(Bytes, Bytes)> {
        self.inner
            .read()
            .maps
            .get(map)
            .map(|fields| {
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Drop every set and map.
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.sets.clear();
        inner.maps.clear();
    }

    pub fn stats(&self) -> StorageStats {
        let inner = self.inner.read();
        let member_bytes: usize = inner
            .sets
            .values()
            .flat_map(|members| members.iter())
            .map(Bytes::len)
            .sum();
        let map_bytes: usize = inner
            .maps
            .values()
            .flat_map(|fields| fields.iter())
            .map(|(k, v)| k.len() + v.len())
            .sum();

        StorageStats {
            set_count: inner.sets.len(),
            member_count: inner.sets.values().map(BTreeSet::len).sum(),
            map_entry_count: inner.maps.values().map(|fields| fields.len()).sum(),
            size_bytes: member_bytes + map_bytes,
            operations_count: inner.operations_count,
            batch_count: inner.batch_count,
        }
    }
}

/// Translates a lex range into `BTreeSet::range` bounds, or `None` when the
/// range is empty (an inverted range would make `range` panic).
fn btree_bounds(range: &LexRange) -> Option<(Bound<&[u8]>, Bound<&[u8]>)> {
    let start = match &range.start {
        LexBound::Inclusive(b) => Bound::Included(b.as_ref()),
        LexBound::Exclusive(b) => Bound::Excluded(b.as_ref()),
        LexBound::Min => Bound::Unbounded,
        LexBound::Max => return None,
    };
    let end = match &range.end {
        LexBound::Inclusive(b) => Bound::Included(b.as_ref()),
        LexBound::Exclusive(b) => Bound::Excluded(b.as_ref()),
        LexBound::Min => return None,
        LexBound::Max => Bound::Unbounded,
    };

    fn keys<'k>(bound: &Bound<&'k [u8]>) -> Option<&'k [u8]> {
        match *bound {
            Bound::Included(k) | Bound::Excluded(k) => Some(k),
            Bound::Unbounded => None,
        }
    }
    if let (Some(s), Some(e)) = (keys(&start), keys(&end)) {
        let both_inclusive =
            matches!(start, Bound::Included(_)) && matches!(end, Bound::Included(_));
        if s > e || (s == e && !both_inclusive) {
            return None;
        }
    }

    Some((start, end))
}

impl OrderedStore for MemoryStore {
    fn insert_ordered(&self, set: &[u8], member: &[u8]) -> StoreResult<()> {
        self.inner.write().apply(&WriteOp::InsertOrdered {
            set: Bytes::copy_from_slice(set),
            member: Bytes::copy_from_slice(member),
        });
        Ok(())
    }

    fn remove_ordered(&self, set: &[u8], member: &[u8]) -> StoreResult<()> {
        self.inner.write().apply(&WriteOp::RemoveOrdered {
            set: Bytes::copy_from_slice(set),
            member: Bytes::copy_from_slice(member),
        });
        Ok(())
    }

    fn scan_by_lex(&self, set: &[u8], range: &LexRange) -> StoreResult<Vec<Bytes>> {
        Ok(self.inner.read().scan(set, range))
    }

    fn map_get(&self, map: &[u8], field: &[u8]) -> StoreResult<Option<Bytes>> {
        Ok(self.inner.read().get(map, field))
    }

    fn map_set(&self, map: &[u8], field: &[u8], value: &[u8]) -> StoreResult<()> {
        self.inner.write().apply(&WriteOp::MapSet {
            map: Bytes::copy_from_slice(map),
            field: Bytes::copy_from_slice(field),
            value: Bytes::copy_from_slice(value),
        });
        Ok(())
    }

    fn map_delete(&self, map: &[u8], field: &[u8]) -> StoreResult<()> {
        self.inner.write().apply(&WriteOp::MapDelete {
            map: Bytes::copy_from_slice(map),
            field: Bytes::copy_from_slice(field),
        });
        Ok(())
    }

    /// All reads see the same snapshot.
    fn pipeline(&self, ops: &[ReadOp]) -> StoreResult<Vec<ReadReply>> {
        let inner = self.inner.read();
        Ok(ops
            .iter()
            .map(|op| match op {
                ReadOp::ScanByLex { set, range } => ReadReply::Members(inner.scan(set, range)),
                ReadOp::MapGet { map, field } => ReadReply::Value(inner.get(map, field)),
            })
            .collect())
    }

    fn atomic_batch(&self, ops: &[WriteOp]) -> StoreResult<()> {
        let mut inner = self.inner.write();
        for op in ops {
            inner.apply(op);
        }
        inner.batch_count += 1;
        Ok(())
    }
}
