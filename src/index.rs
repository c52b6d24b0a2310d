//! The multi-dimensional index over an ordered store.
//!
//! Points are stored as self-describing records in one lexicographically
//! ordered set per namespace, next to a map from identifier to record that
//! makes identifier-keyed removal and update possible. Range queries are
//! answered by a handful of pipelined lexicographic scans followed by an
//! exact coordinate filter.

use crate::batch::WriteBatch;
use crate::builder::IndexBuilder;
use crate::codec::ZCodec;
use crate::compute::decompose::{CellScan, cell_count, decompose};
use crate::compute::filter::filter_records;
use crate::compute::planner::{QueryPlan, QueryPlanner};
use crate::compute::validation::validate_arity;
use crate::config::IndexConfig;
use crate::error::{IndexError, Result};
use crate::namespace::Namespace;
use crate::record::RecordFormat;
use crate::storage::{OrderedStore, ReadOp, StoreError};
use crate::types::{Entry, Identifier, QueryRect};
use bytes::Bytes;
use std::borrow::Borrow;
use std::fmt;
use std::marker::PhantomData;

/// A Z-order range index bound to one namespace of an ordered store.
///
/// The index holds no state of its own besides its configuration: every
/// operation goes straight to the store, so several indexes (in one process
/// or many) can share the same namespace.
///
/// Methods that take an identifier accept any `&Q` the identifier type `I`
/// borrows as, the way `HashMap::get` does. A `String` index takes both
/// `&str` and `&String`; an index of `u32` identifiers only takes `&u32`:
///
/// ```compile_fail
/// use lexspace::{MemoryStore, SpatialIndex};
///
/// let index: SpatialIndex<MemoryStore, u32> =
///     SpatialIndex::new(MemoryStore::new(), "ids", 1).unwrap();
/// index.index(&[1], "seven").unwrap();
/// ```
///
/// # Examples
///
/// ```rust
/// use lexspace::{MemoryStore, QueryRect, SpatialIndex};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let index: SpatialIndex<_> = SpatialIndex::new(MemoryStore::new(), "people", 2)?;
///
/// // (age, salary)
/// index.index(&[45, 120_000], "Josh")?;
/// index.index(&[50, 110_000], "Pamela")?;
///
/// let hits = index.query(&QueryRect::from([(40, 50), (100_000, 115_000)]))?;
/// assert_eq!(hits.len(), 1);
/// assert_eq!(hits[0].id, "Pamela");
/// # Ok(())
/// # }
/// ```
pub struct SpatialIndex<S, I = String> {
    store: S,
    namespace: Namespace,
    config: IndexConfig,
    format: RecordFormat,
    planner: QueryPlanner,
    _identifier: PhantomData<fn() -> I>,
}

impl<S: OrderedStore, I: Identifier> SpatialIndex<S, I> {
    /// Most scans [`query_with_exponent`](Self::query_with_exponent) will
    /// issue for one query.
    pub const MAX_EXPLICIT_SCANS: u128 = 1 << 16;

    /// Create an index with full 64-bit precision and default settings.
    ///
    /// # Arguments
    ///
    /// * `store` - The ordered store holding the records
    /// * `namespace` - Name of the ordered set; the identifier map is `<namespace>:hash`
    /// * `dimensions` - Number of coordinates per point
    pub fn new(store: S, namespace: &str, dimensions: usize) -> Result<Self> {
        Self::with_config(store, namespace, IndexConfig::new(dimensions))
    }

    /// Create an index whose coordinates use `precision` bits.
    pub fn with_precision(
        store: S,
        namespace: &str,
        dimensions: usize,
        precision: u32,
    ) -> Result<Self> {
        Self::with_config(
            store,
            namespace,
            IndexConfig::new(dimensions).with_precision(precision),
        )
    }

    /// Create an index from a full configuration.
    ///
    /// # Errors
    ///
    /// `Config` if the configuration is invalid, `InvalidInput` if the
    /// namespace name is.
    pub fn with_config(store: S, namespace: &str, config: IndexConfig) -> Result<Self> {
        config.validate().map_err(IndexError::Config)?;
        let namespace = Namespace::new(namespace)?;
        let codec = ZCodec::new(config.dimensions, config.precision, config.encoding);

        log::debug!(
            "Opened index '{}' with {} dimensions at {}-bit precision",
            namespace,
            config.dimensions,
            config.precision
        );

        Ok(Self {
            store,
            format: RecordFormat::new(codec),
            planner: QueryPlanner::new(config.precision, config.fanout_ceiling),
            namespace,
            config,
            _identifier: PhantomData,
        })
    }

    /// Start building an index.
    pub fn builder(namespace: &str, dimensions: usize) -> IndexBuilder {
        IndexBuilder::new(namespace, dimensions)
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    pub fn codec(&self) -> &ZCodec {
        self.format.codec()
    }

    pub fn dimensions(&self) -> usize {
        self.config.dimensions
    }

    pub fn precision(&self) -> u32 {
        self.config.precision
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Add `id` at `point`.
    ///
    /// The record and the identifier mapping are written in one atomic
    /// batch. If `id` is already indexed elsewhere its old record is
    /// removed in the same batch, so each identifier keeps exactly one
    /// record.
    ///
    /// # Arguments
    ///
    /// * `point` - One coordinate per dimension, each below `2^precision`
    /// * `id` - Identifier of the point; must not be empty or contain `:`
    ///
    /// # Errors
    ///
    /// `DimensionMismatch`, `OutOfRange` or `InvalidInput` for bad input,
    /// `StoreUnavailable` if the store fails. Nothing is written on error.
    pub fn index<Q>(&self, point: &[u64], id: &Q) -> Result<()>
    where
        I: Borrow<Q>,
        Q: fmt::Display + ?Sized,
    {
        let id_text = id.to_string();
        let record = self.format.format(point, &id_text)?;
        let previous = self.lookup(&id_text)?;

        let mut batch = WriteBatch::new(&self.namespace);
        if let Some(old) = previous.filter(|old| *old != record) {
            log::debug!("Re-indexing '{}' in '{}'", id_text, self.namespace);
            batch.remove_record(old);
        }
        batch.insert_record(record.clone()).bind(&id_text, record);
        batch.commit(&self.store)
    }

    /// Remove the record for `id` at `point` from the ordered set.
    ///
    /// The identifier mapping is left untouched, so a later
    /// [`unindex_by_id`](Self::unindex_by_id) still finds the stale mapping
    /// and clears it. Removing a record that does not exist is a no-op.
    pub fn unindex<Q>(&self, point: &[u64], id: &Q) -> Result<()>
    where
        I: Borrow<Q>,
        Q: fmt::Display + ?Sized,
    {
        let record = self.format.format(point, id)?;
        self.store.remove_ordered(self.namespace.set_key(), &record)?;
        Ok(())
    }

    /// Remove `id` using only its identifier.
    ///
    /// # Errors
    ///
    /// `NotFound` if `id` has no mapping.
    pub fn unindex_by_id<Q>(&self, id: &Q) -> Result<()>
    where
        I: Borrow<Q>,
        Q: fmt::Display + ?Sized,
    {
        let id_text = id.to_string();
        let record = self
            .lookup(&id_text)?
            .ok_or_else(|| IndexError::NotFound(id_text.clone()))?;

        let mut batch = WriteBatch::new(&self.namespace);
        batch.remove_record(record).unbind(&id_text);
        batch.commit(&self.store)
    }

    /// Move an already indexed `id` to `point`.
    ///
    /// Removal of the old record and insertion of the new one happen in one
    /// atomic batch: a concurrent query sees the point either before or
    /// after the move, never twice and never missing.
    ///
    /// # Errors
    ///
    /// `NotFound` if `id` is not indexed. Validation errors for `point` are
    /// reported before the store is touched.
    pub fn update<Q>(&self, point: &[u64], id: &Q) -> Result<()>
    where
        I: Borrow<Q>,
        Q: fmt::Display + ?Sized,
    {
        let id_text = id.to_string();
        let record = self.format.format(point, &id_text)?;
        let old = self
            .lookup(&id_text)?
            .ok_or_else(|| IndexError::NotFound(id_text.clone()))?;

        let mut batch = WriteBatch::new(&self.namespace);
        batch
            .remove_record(old)
            .unbind(&id_text)
            .insert_record(record.clone())
            .bind(&id_text, record);
        batch.commit(&self.store)
    }

    /// The entry currently indexed for `id`.
    pub fn get<Q>(&self, id: &Q) -> Result<Option<Entry<I>>>
    where
        I: Borrow<Q>,
        Q: fmt::Display + ?Sized,
    {
        self.lookup(&id.to_string())?
            .map(|record| self.format.parse(&record))
            .transpose()
    }

    /// Whether `id` has an identifier mapping.
    pub fn contains<Q>(&self, id: &Q) -> Result<bool>
    where
        I: Borrow<Q>,
        Q: fmt::Display + ?Sized,
    {
        Ok(self.lookup(&id.to_string())?.is_some())
    }

    /// All entries whose point lies inside `rect`, bounds inclusive.
    ///
    /// Each range may be given in either order. Upper bounds beyond the
    /// coordinate domain are clamped to it; a range lying entirely beyond
    /// it matches nothing. Results come in scan order, not sorted by any
    /// coordinate.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use lexspace::{MemoryStore, QueryRect, SpatialIndex};
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let store = MemoryStore::new();
    /// let index: SpatialIndex<_> = SpatialIndex::with_precision(store, "grid", 2, 8)?;
    /// index.index(&[10, 20], "a")?;
    ///
    /// // Swapped bounds and an upper bound past 255 are both fine
    /// let hits = index.query(&QueryRect::from([(15, 5), (0, 1000)]))?;
    /// assert_eq!(hits.len(), 1);
    /// # Ok(())
    /// # }
    /// ```
    pub fn query(&self, rect: &QueryRect) -> Result<Vec<Entry<I>>> {
        let Some(rect) = self.prepare(rect)? else {
            return Ok(Vec::new());
        };
        let plan = self.planner.plan(self.codec(), &rect)?;
        self.execute(&rect, &plan.scans)
    }

    /// Like [`query`](Self::query) but with a caller-chosen cell exponent.
    ///
    /// Mostly useful to compare plans. Any exponent up to the precision
    /// returns the same entries, as long as the rectangle splits into at
    /// most [`MAX_EXPLICIT_SCANS`](Self::MAX_EXPLICIT_SCANS) cells.
    ///
    /// # Errors
    ///
    /// `InvalidInput` if the decomposition needs more scans than that. The
    /// store is not called in that case.
    pub fn query_with_exponent(&self, rect: &QueryRect, exponent: u32) -> Result<Vec<Entry<I>>> {
        let Some(rect) = self.prepare(rect)? else {
            return Ok(Vec::new());
        };
        let cells = cell_count(&rect, exponent);
        if cells > Self::MAX_EXPLICIT_SCANS {
            return Err(IndexError::InvalidInput(format!(
                "Exponent {} needs {} scans, limit is {}",
                exponent,
                cells,
                Self::MAX_EXPLICIT_SCANS
            )));
        }
        let scans = decompose(self.codec(), &rect, exponent)?;
        self.execute(&rect, &scans)
    }

    /// The scans [`query`](Self::query) would issue for `rect`.
    ///
    /// `None` when the rectangle lies outside the coordinate domain.
    pub fn plan(&self, rect: &QueryRect) -> Result<Option<QueryPlan>> {
        self.prepare(rect)?
            .map(|rect| self.planner.plan(self.codec(), &rect))
            .transpose()
    }

    fn lookup(&self, id_text: &str) -> Result<Option<Bytes>> {
        Ok(self
            .store
            .map_get(self.namespace.map_key(), id_text.as_bytes())?)
    }

    /// Normalizes `rect` and fits it to the coordinate domain.
    fn prepare(&self, rect: &QueryRect) -> Result<Option<QueryRect>> {
        validate_arity(rect.dimensions(), self.dimensions())?;
        let max = self.config.max_coordinate();
        let rect = rect.normalized();

        if rect.ranges().iter().any(|&(low, _)| low > max) {
            log::debug!(
                "Query {:?} lies outside the {}-bit domain",
                rect.ranges(),
                self.precision()
            );
            return Ok(None);
        }
        if rect.ranges().iter().all(|&(_, high)| high <= max) {
            return Ok(Some(rect));
        }

        log::warn!(
            "Clamping query bounds {:?} to maximum coordinate {}",
            rect.ranges(),
            max
        );
        Ok(Some(QueryRect::new(
            rect.ranges().iter().map(|&(low, high)| (low, high.min(max))),
        )))
    }

    /// Issues all scans in one pipeline and filters the combined result.
    fn execute(&self, rect: &QueryRect, scans: &[CellScan]) -> Result<Vec<Entry<I>>> {
        let ops: Vec<ReadOp> = scans
            .iter()
            .map(|scan| ReadOp::ScanByLex {
                set: self.namespace.set_key().clone(),
                range: scan.range.clone(),
            })
            .collect();

        let replies = self.store.pipeline(&ops)?;
        if replies.len() != ops.len() {
            return Err(StoreError::UnexpectedReply(format!(
                "Expected {} replies, got {}",
                ops.len(),
                replies.len()
            ))
            .into());
        }

        let mut records = Vec::new();
        for reply in replies {
            records.extend(reply.into_members()?);
        }
        log::debug!(
            "{} scans on '{}' returned {} candidate records",
            ops.len(),
            self.namespace,
            records.len()
        );

        filter_records(&self.format, rect, records)
    }
}

impl<S, I> fmt::Debug for SpatialIndex<S, I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpatialIndex")
            .field("namespace", &self.namespace)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::KeyEncoding;
    use crate::storage::MemoryStore;
    use crate::types::Point;
    use std::sync::Arc;

    fn people() -> SpatialIndex<MemoryStore> {
        let index = SpatialIndex::new(MemoryStore::new(), "people", 2).unwrap();
        index.index(&[45, 120_000], "Josh").unwrap();
        index.index(&[50, 110_000], "Pamela").unwrap();
        index.index(&[30, 102_000], "Angela").unwrap();
        index
    }

    fn ids(entries: &[Entry<String>]) -> Vec<String> {
        let mut ids: Vec<String> = entries.iter().map(|e| e.id.clone()).collect();
        ids.sort();
        ids
    }

    #[test]
    fn test_index_writes_record_and_mapping() {
        let index = people();
        let store = index.store();
        assert_eq!(store.cardinality(b"people"), 3);

        let record = store.map_get(b"people:hash", b"Josh").unwrap().unwrap();
        assert!(record.ends_with(b":45:120000:Josh"));
        assert_eq!(record.len(), 32 + ":45:120000:Josh".len());
        let members = store.members(b"people");
        assert_eq!(members.iter().filter(|m| **m == record).count(), 1);
    }

    #[test]
    fn test_query_filters_exactly() {
        let index = people();
        let hits = index
            .query(&QueryRect::from([(40, 50), (100_000, 115_000)]))
            .unwrap();
        assert_eq!(ids(&hits), vec!["Pamela"]);
        assert_eq!(hits[0].point, Point::new([50, 110_000]));

        let hits = index
            .query(&QueryRect::from([(0, 100), (0, 200_000)]))
            .unwrap();
        assert_eq!(ids(&hits), vec!["Angela", "Josh", "Pamela"]);
    }

    #[test]
    fn test_query_bounds_are_inclusive_and_unordered() {
        let index = people();
        let hits = index
            .query(&QueryRect::from([(45, 45), (120_000, 120_000)]))
            .unwrap();
        assert_eq!(ids(&hits), vec!["Josh"]);

        let hits = index
            .query(&QueryRect::from([(50, 40), (115_000, 100_000)]))
            .unwrap();
        assert_eq!(ids(&hits), vec!["Pamela"]);
    }

    #[test]
    fn test_unindex_by_id_then_not_found() {
        let index = people();
        index.unindex_by_id("Josh").unwrap();
        assert!(!index.contains("Josh").unwrap());
        assert_eq!(index.store().cardinality(b"people"), 2);

        assert!(matches!(
            index.unindex_by_id("Josh"),
            Err(IndexError::NotFound(id)) if id == "Josh"
        ));
    }

    #[test]
    fn test_unindex_leaves_mapping() {
        let index = people();
        index.unindex(&[45, 120_000], "Josh").unwrap();
        let hits = index.query(&QueryRect::singleton(&[45, 120_000])).unwrap();
        assert!(hits.is_empty());
        assert!(index.contains("Josh").unwrap());

        // The stale mapping still drives a clean removal.
        index.unindex_by_id("Josh").unwrap();
        assert!(!index.contains("Josh").unwrap());

        // Unknown records are a no-op.
        index.unindex(&[1, 1], "Nobody").unwrap();
    }

    #[test]
    fn test_update_moves_point() {
        let index = people();
        index.update(&[42, 105_000], "Josh").unwrap();

        let hits = index
            .query(&QueryRect::from([(40, 50), (100_000, 115_000)]))
            .unwrap();
        assert_eq!(ids(&hits), vec!["Josh", "Pamela"]);
        assert_eq!(index.store().cardinality(b"people"), 3);
        assert_eq!(
            index.get("Josh").unwrap().unwrap().point,
            Point::new([42, 105_000])
        );
    }

    #[test]
    fn test_update_unknown_id() {
        let index = people();
        assert!(matches!(
            index.update(&[1, 1], "Nobody"),
            Err(IndexError::NotFound(_))
        ));
        assert_eq!(index.store().cardinality(b"people"), 3);
    }

    #[test]
    fn test_reindex_replaces_old_record() {
        let index = people();
        index.index(&[46, 121_000], "Josh").unwrap();
        assert_eq!(index.store().cardinality(b"people"), 3);
        let hits = index.query(&QueryRect::singleton(&[45, 120_000])).unwrap();
        assert!(hits.is_empty());

        // Same point again is idempotent.
        index.index(&[46, 121_000], "Josh").unwrap();
        assert_eq!(index.store().cardinality(b"people"), 3);
    }

    #[test]
    fn test_invalid_input_writes_nothing() {
        let index: SpatialIndex<_> =
            SpatialIndex::with_precision(MemoryStore::new(), "t", 2, 8).unwrap();
        assert!(matches!(
            index.index(&[1, 2, 3], "a"),
            Err(IndexError::DimensionMismatch { expected: 2, got: 3 })
        ));
        assert!(matches!(
            index.index(&[256, 0], "a"),
            Err(IndexError::OutOfRange { value: 256, precision: 8 })
        ));
        assert!(matches!(
            index.index(&[1, 2], "a:b"),
            Err(IndexError::InvalidInput(_))
        ));
        assert!(matches!(
            index.query(&QueryRect::from([(0, 1)])),
            Err(IndexError::DimensionMismatch { .. })
        ));
        assert_eq!(index.store().stats().operations_count, 0);
    }

    #[test]
    fn test_out_of_domain_query_is_empty_or_clamped() {
        let index: SpatialIndex<_> =
            SpatialIndex::with_precision(MemoryStore::new(), "t", 2, 8).unwrap();
        index.index(&[255, 255], "corner").unwrap();

        let outside = QueryRect::from([(256, 300), (0, 10)]);
        assert!(index.query(&outside).unwrap().is_empty());
        assert!(index.plan(&outside).unwrap().is_none());

        let hits = index
            .query(&QueryRect::from([(200, 1000), (200, u64::MAX)]))
            .unwrap();
        assert_eq!(ids(&hits), vec!["corner"]);
    }

    #[test]
    fn test_every_exponent_agrees() {
        let index: SpatialIndex<_> =
            SpatialIndex::with_precision(MemoryStore::new(), "t", 2, 8).unwrap();
        for x in (0..256u64).step_by(17) {
            for y in (0..256u64).step_by(23) {
                index.index(&[x, y], &format!("p{}x{}", x, y)).unwrap();
            }
        }
        let rect = QueryRect::from([(30, 140), (10, 90)]);
        let expected = ids(&index.query(&rect).unwrap());
        assert!(!expected.is_empty());
        for exponent in 0..=8 {
            let hits = index.query_with_exponent(&rect, exponent).unwrap();
            assert_eq!(ids(&hits), expected);
        }
    }

    #[test]
    fn test_explicit_exponent_scan_limit() {
        let index = people();
        let before = index.store().stats();

        // Exponent 0 on the full salary axis would need one scan per value.
        let rect = QueryRect::from([(0, 100), (0, u64::MAX)]);
        assert!(matches!(
            index.query_with_exponent(&rect, 0),
            Err(IndexError::InvalidInput(_))
        ));
        assert_eq!(index.store().stats(), before);

        let hits = index.query_with_exponent(&rect, 64).unwrap();
        assert_eq!(ids(&hits), vec!["Angela", "Josh", "Pamela"]);

        // Exactly at the limit is still allowed.
        let rect = QueryRect::from([(0, 255), (0, 255)]);
        assert_eq!(
            cell_count(&rect, 0),
            SpatialIndex::<MemoryStore>::MAX_EXPLICIT_SCANS
        );
        let hits = index.query_with_exponent(&rect, 0).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn test_identifier_arguments_borrow() {
        let index = people();
        let owned = String::from("Pamela");
        assert!(index.contains(&owned).unwrap());
        assert!(index.contains("Pamela").unwrap());

        index.update(&[51, 110_000], &owned).unwrap();
        assert_eq!(index.get("Pamela").unwrap().unwrap().point[0], 51);
        index.unindex_by_id(owned.as_str()).unwrap();
        assert!(!index.contains(&owned).unwrap());
    }

    #[test]
    fn test_numeric_identifiers() {
        let index: SpatialIndex<MemoryStore, u32> =
            SpatialIndex::new(MemoryStore::new(), "ids", 3).unwrap();
        index.index(&[1, 2, 3], &7u32).unwrap();
        index.index(&[4, 5, 6], &8u32).unwrap();

        let hits = index
            .query(&QueryRect::from([(0, 2), (0, 2), (0, 3)]))
            .unwrap();
        assert_eq!(hits, vec![Entry::new(Point::new([1, 2, 3]), 7)]);
        assert!(index.contains(&8u32).unwrap());
    }

    #[test]
    fn test_binary_encoding_answers_same_queries() {
        let config = IndexConfig::new(2)
            .with_precision(16)
            .with_encoding(KeyEncoding::Binary);
        let index: SpatialIndex<_> =
            SpatialIndex::with_config(MemoryStore::new(), "bin", config).unwrap();
        index.index(&[300, 400], "a").unwrap();
        index.index(&[301, 900], "b").unwrap();

        let record = index.store().map_get(b"bin:hash", b"a").unwrap().unwrap();
        assert_eq!(record.len(), 32 + ":300:400:a".len());

        let hits = index
            .query(&QueryRect::from([(250, 350), (350, 450)]))
            .unwrap();
        assert_eq!(ids(&hits), vec!["a"]);
    }

    #[test]
    fn test_shared_store_namespaces_are_isolated() {
        let store = Arc::new(MemoryStore::new());
        let a: SpatialIndex<_> = SpatialIndex::new(Arc::clone(&store), "a", 2).unwrap();
        let b: SpatialIndex<_> = SpatialIndex::new(Arc::clone(&store), "b", 2).unwrap();
        a.index(&[1, 1], "x").unwrap();

        let rect = QueryRect::from([(0, 10), (0, 10)]);
        assert!(b.query(&rect).unwrap().is_empty());
        assert!(!b.contains("x").unwrap());
        assert_eq!(a.query(&rect).unwrap().len(), 1);
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(matches!(
            SpatialIndex::<_, String>::new(MemoryStore::new(), "t", 0),
            Err(IndexError::Config(_))
        ));
        assert!(matches!(
            SpatialIndex::<_, String>::with_precision(MemoryStore::new(), "t", 2, 65),
            Err(IndexError::Config(_))
        ));
        assert!(matches!(
            SpatialIndex::<_, String>::new(MemoryStore::new(), "", 2),
            Err(IndexError::InvalidInput(_))
        ));
    }
}
