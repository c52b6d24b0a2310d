//! Multi-dimensional range indexing on top of a lexicographically ordered store.
//!
//! Points with unsigned integer coordinates are interleaved into Z-order keys
//! and kept in an ordered set; rectangle queries become a few lexicographic
//! range scans plus an exact filter.
//!
//! ```rust
//! use lexspace::{MemoryStore, QueryRect, SpatialIndex};
//!
//! let index: SpatialIndex<_> = SpatialIndex::new(MemoryStore::new(), "people", 2)?;
//! index.index(&[45, 120_000], "Josh")?;
//! index.index(&[50, 110_000], "Pamela")?;
//!
//! let hits = index.query(&QueryRect::from([(40, 50), (100_000, 115_000)]))?;
//! assert_eq!(hits[0].id, "Pamela");
//!
//! index.update(&[42, 105_000], "Josh")?;
//! index.unindex_by_id("Pamela")?;
//! # Ok::<(), lexspace::IndexError>(())
//! ```

mod batch;
pub mod builder;
pub mod codec;
pub mod compute;
pub mod config;
pub mod error;
pub mod index;
pub mod namespace;
pub mod record;
pub mod storage;
pub mod types;

pub use builder::IndexBuilder;
pub use codec::{KeyEncoding, ZCodec};
pub use compute::planner::QueryPlan;
pub use config::IndexConfig;
pub use error::{IndexError, Result};
pub use index::SpatialIndex;
pub use namespace::Namespace;
pub use record::RecordFormat;
pub use storage::{
    LexBound, LexRange, MemoryStore, OrderedStore, ReadOp, ReadReply, StorageStats, StoreError,
    StoreResult, WriteOp,
};
pub use types::{Entry, Identifier, Point, QueryRect};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common imports
pub mod prelude {

    pub use crate::{IndexBuilder, IndexError, Result, SpatialIndex};

    pub use crate::{Entry, Identifier, Point, QueryRect};

    pub use crate::{IndexConfig, KeyEncoding};

    pub use crate::{MemoryStore, OrderedStore, StoreError};
}
