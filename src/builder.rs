//! Index builder for flexible configuration
//!
//! This module provides a builder pattern for creating indexes with
//! non-default precision, planner fanout or key encoding.

use crate::codec::KeyEncoding;
use crate::config::IndexConfig;
use crate::error::Result;
use crate::index::SpatialIndex;
use crate::storage::OrderedStore;
use crate::types::Identifier;

/// Builder for index configuration.
///
/// # Examples
///
/// ```rust
/// use lexspace::{IndexBuilder, KeyEncoding, MemoryStore, SpatialIndex};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let index: SpatialIndex<_> = IndexBuilder::new("sensors", 3)
///     .precision(20)
///     .fanout_ceiling(64)
///     .encoding(KeyEncoding::Binary)
///     .build(MemoryStore::new())?;
///
/// assert_eq!(index.precision(), 20);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct IndexBuilder {
    namespace: String,
    config: IndexConfig,
}

impl IndexBuilder {
    /// Create a new builder with the default configuration for `dimensions`.
    pub fn new(namespace: &str, dimensions: usize) -> Self {
        Self {
            namespace: namespace.to_owned(),
            config: IndexConfig::new(dimensions),
        }
    }

    /// Bits per coordinate, 1 to 64.
    pub fn precision(mut self, precision: u32) -> Self {
        self.config = self.config.with_precision(precision);
        self
    }

    /// The planner coarsens its grid until a query needs fewer scans than this.
    pub fn fanout_ceiling(mut self, ceiling: u64) -> Self {
        self.config = self.config.with_fanout_ceiling(ceiling);
        self
    }

    pub fn encoding(mut self, encoding: KeyEncoding) -> Self {
        self.config = self.config.with_encoding(encoding);
        self
    }

    /// Replace the whole configuration, e.g. one loaded with
    /// [`IndexConfig::from_json`].
    pub fn config(mut self, config: IndexConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the index on `store`.
    ///
    /// # Errors
    ///
    /// `Config` if the configuration is invalid, `InvalidInput` if the
    /// namespace name is.
    pub fn build<S, I>(self, store: S) -> Result<SpatialIndex<S, I>>
    where
        S: OrderedStore,
        I: Identifier,
    {
        SpatialIndex::with_config(store, &self.namespace, self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IndexError;
    use crate::storage::MemoryStore;

    #[test]
    fn test_builder_defaults() {
        let index: SpatialIndex<_> = IndexBuilder::new("t", 2).build(MemoryStore::new()).unwrap();
        assert_eq!(index.dimensions(), 2);
        assert_eq!(index.precision(), IndexConfig::DEFAULT_PRECISION);
        assert_eq!(
            index.config().fanout_ceiling,
            IndexConfig::DEFAULT_FANOUT_CEILING
        );
        assert_eq!(index.codec().encoding(), KeyEncoding::Hex);
    }

    #[test]
    fn test_builder_overrides() {
        let index: SpatialIndex<_> = IndexBuilder::new("t", 3)
            .precision(10)
            .fanout_ceiling(5)
            .encoding(KeyEncoding::Binary)
            .build(MemoryStore::new())
            .unwrap();
        assert_eq!(index.precision(), 10);
        assert_eq!(index.config().fanout_ceiling, 5);
        assert_eq!(index.codec().key_width(), 30);
    }

    #[test]
    fn test_builder_with_config() {
        let config = IndexConfig::new(4).with_precision(16);
        let index: SpatialIndex<_> = SpatialIndex::<MemoryStore>::builder("t", 1)
            .config(config.clone())
            .build(MemoryStore::new())
            .unwrap();
        assert_eq!(index.config(), &config);
    }

    #[test]
    fn test_builder_rejects_invalid_config() {
        let result: Result<SpatialIndex<_>> = IndexBuilder::new("t", 2)
            .precision(0)
            .build(MemoryStore::new());
        assert!(matches!(result, Err(IndexError::Config(_))));

        let result: Result<SpatialIndex<_>> = IndexBuilder::new("t", 2)
            .fanout_ceiling(0)
            .build(MemoryStore::new());
        assert!(matches!(result, Err(IndexError::Config(_))));
    }
}
