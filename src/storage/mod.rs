//! Ordered store abstraction for lexspace
//!
//! The index never owns its data. It talks to an external store that keeps
//! named sets of byte-string members in lexicographic order, plus named
//! field/value maps, through the [`OrderedStore`] trait. Any store offering
//! lexicographic range scans and atomic multi-command batches (a Redis sorted
//! set with `ZRANGEBYLEX` and `MULTI`, an ordered KV engine with write
//! batches, ...) can back an index.

use bytes::Bytes;
use std::sync::Arc;
use thiserror::Error;

mod memory;

pub use memory::MemoryStore;

/// Failure reported by a store adapter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The store could not be reached or did not answer in time.
    #[error("Store unreachable: {0}")]
    Unavailable(String),
    /// An atomic batch was rejected and none of its operations were applied.
    #[error("Batch aborted: {0}")]
    Aborted(String),
    /// The store answered with something the caller did not ask for.
    #[error("Unexpected reply: {0}")]
    UnexpectedReply(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// One end of a lexicographic range.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LexBound {
    /// Members greater (or less) than or equal to the given bytes.
    Inclusive(Bytes),
    /// Members strictly greater (or less) than the given bytes.
    Exclusive(Bytes),
    /// Before every member.
    Min,
    /// After every member.
    Max,
}

impl LexBound {
    pub fn inclusive(bytes: impl Into<Bytes>) -> Self {
        Self::Inclusive(bytes.into())
    }

    pub fn exclusive(bytes: impl Into<Bytes>) -> Self {
        Self::Exclusive(bytes.into())
    }

    /// Redis `ZRANGEBYLEX` argument form: `[bytes`, `(bytes`, `-` or `+`.
    pub fn to_arg(&self) -> Bytes {
        let (marker, bytes): (u8, &[u8]) = match self {
            Self::Inclusive(b) => (b'[', &b[..]),
            Self::Exclusive(b) => (b'(', &b[..]),
            Self::Min => (b'-', &[]),
            Self::Max => (b'+', &[]),
        };
        let mut arg = Vec::with_capacity(1 + bytes.len());
        arg.push(marker);
        arg.extend_from_slice(bytes);
        Bytes::from(arg)
    }
}

/// A lexicographic range of set members, bounds as given.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LexRange {
    pub start: LexBound,
    pub end: LexBound,
}

impl LexRange {
    pub fn new(start: LexBound, end: LexBound) -> Self {
        Self { start, end }
    }

    /// Whether `member` falls inside this range.
    pub fn contains(&self, member: &[u8]) -> bool {
        let after_start = match &self.start {
            LexBound::Inclusive(b) => member >= b.as_ref(),
            LexBound::Exclusive(b) => member > b.as_ref(),
            LexBound::Min => true,
            LexBound::Max => false,
        };
        let before_end = match &self.end {
            LexBound::Inclusive(b) => member <= b.as_ref(),
            LexBound::Exclusive(b) => member < b.as_ref(),
            LexBound::Min => false,
            LexBound::Max => true,
        };
        after_start && before_end
    }
}

/// Read operation for pipelined execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOp {
    /// All members of `set` inside `range`, in lexicographic order.
    ScanByLex { set: Bytes, range: LexRange },
    /// The value of `field` in `map`.
    MapGet { map: Bytes, field: Bytes },
}

/// Reply to a [`ReadOp`], in the same position as the op that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadReply {
    Members(Vec<Bytes>),
    Value(Option<Bytes>),
}

impl ReadReply {
    pub fn into_members(self) -> StoreResult<Vec<Bytes>> {
        match self {
            Self::Members(members) => Ok(members),
            Self::Value(_) => Err(StoreError::UnexpectedReply(
                "expected members, got a map value".into(),
            )),
        }
    }

    pub fn into_value(self) -> StoreResult<Option<Bytes>> {
        match self {
            Self::Value(value) => Ok(value),
            Self::Members(_) => Err(StoreError::UnexpectedReply(
                "expected a map value, got members".into(),
            )),
        }
    }
}

/// Write operation for atomic batch processing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    /// Add `member` to the ordered `set`. Adding an existing member is a no-op.
    InsertOrdered { set: Bytes, member: Bytes },
    /// Remove `member` from `set` if present.
    RemoveOrdered { set: Bytes, member: Bytes },
    /// Set `field` of `map` to `value`, replacing any previous value.
    MapSet {
        map: Bytes,
        field: Bytes,
        value: Bytes,
    },
    /// Remove `field` from `map` if present.
    MapDelete { map: Bytes, field: Bytes },
}

/// Trait for ordered store implementations
///
/// Member order is defined by content alone (byte-wise lexicographic); there
/// are no scores. Implementations must be usable from several threads; the
/// index adds no locking of its own.
pub trait OrderedStore: Send + Sync {
    /// Add `member` to `set`. Idempotent.
    fn insert_ordered(&self, set: &[u8], member: &[u8]) -> StoreResult<()>;

    /// Remove `member` from `set`. No-op if absent.
    fn remove_ordered(&self, set: &[u8], member: &[u8]) -> StoreResult<()>;

    /// All members of `set` inside `range`, in lexicographic order.
    fn scan_by_lex(&self, set: &[u8], range: &LexRange) -> StoreResult<Vec<Bytes>>;

    fn map_get(&self, map: &[u8], field: &[u8]) -> StoreResult<Option<Bytes>>;

    fn map_set(&self, map: &[u8], field: &[u8], value: &[u8]) -> StoreResult<()>;

    fn map_delete(&self, map: &[u8], field: &[u8]) -> StoreResult<()>;

    /// Execute several reads in one round trip, one reply per op in issuing order.
    ///
    /// The default runs the ops one by one. Network-backed stores should
    /// override it with real pipelining.
    fn pipeline(&self, ops: &[ReadOp]) -> StoreResult<Vec<ReadReply>> {
        ops.iter()
            .map(|op| match op {
                ReadOp::ScanByLex { set, range } => {
                    self.scan_by_lex(set, range).map(ReadReply::Members)
                }
                ReadOp::MapGet { map, field } => self.map_get(map, field).map(ReadReply::Value),
            })
            .collect()
    }

    /// Apply all `ops` so that they become visible together, or apply none.
    fn atomic_batch(&self, ops: &[WriteOp]) -> StoreResult<()>;
}

impl<T: OrderedStore + ?Sized> OrderedStore for Arc<T> {
    fn insert_ordered(&self, set: &[u8], member: &[u8]) -> StoreResult<()> {
        (**self).insert_ordered(set, member)
    }

    fn remove_ordered(&self, set: &[u8], member: &[u8]) -> StoreResult<()> {
        (**self).remove_ordered(set, member)
    }

    fn scan_by_lex(&self, set: &[u8], range: &LexRange) -> StoreResult<Vec<Bytes>> {
        (**self).scan_by_lex(set, range)
    }

    fn map_get(&self, map: &[u8], field: &[u8]) -> StoreResult<Option<Bytes>> {
        (**self).map_get(map, field)
    }

    fn map_set(&self, map: &[u8], field: &[u8], value: &[u8]) -> StoreResult<()> {
        (**self).map_set(map, field, value)
    }

    fn map_delete(&self, map: &[u8], field: &[u8]) -> StoreResult<()> {
        (**self).map_delete(map, field)
    }

    fn pipeline(&self, ops: &[ReadOp]) -> StoreResult<Vec<ReadReply>> {
        (**self).pipeline(ops)
    }

    fn atomic_batch(&self, ops: &[WriteOp]) -> StoreResult<()> {
        (**self).atomic_batch(ops)
    }
}

/// Storage statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorageStats {
    /// Number of non-empty ordered sets
    pub set_count: usize,
    /// Total members across all ordered sets
    pub member_count: usize,
    /// Total fields across all maps
    pub map_entry_count: usize,
    /// Size of all members, fields and values in bytes
    pub size_bytes: usize,
    /// Number of operations performed, batched ones included
    pub operations_count: u64,
    /// Number of atomic batches applied
    pub batch_count: u64,
}
