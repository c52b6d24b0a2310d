//! Atomic write batches.

use crate::error::Result;
use crate::namespace::Namespace;
use crate::storage::{OrderedStore, WriteOp};
use bytes::Bytes;

/// Atomic batch against one namespace. All operations succeed or all fail.
///
/// Keeps the ordered set and the identifier map in step: every mutation of
/// an index is expressed as one batch touching both.
pub(crate) struct WriteBatch<'a> {
    namespace: &'a Namespace,
    operations: Vec<WriteOp>,
}

impl<'a> WriteBatch<'a> {
    pub(crate) fn new(namespace: &'a Namespace) -> Self {
        Self {
            namespace,
            operations: Vec::with_capacity(4),
        }
    }

    pub(crate) fn insert_record(&mut self, record: Bytes) -> &mut Self {
        self.operations.push(WriteOp::InsertOrdered {
            set: self.namespace.set_key().clone(),
            member: record,
        });
        self
    }

    pub(crate) fn remove_record(&mut self, record: Bytes) -> &mut Self {
        self.operations.push(WriteOp::RemoveOrdered {
            set: self.namespace.set_key().clone(),
            member: record,
        });
        self
    }

    /// Point `id` at `record` in the identifier map.
    pub(crate) fn bind(&mut self, id: &str, record: Bytes) -> &mut Self {
        self.operations.push(WriteOp::MapSet {
            map: self.namespace.map_key().clone(),
            field: Bytes::copy_from_slice(id.as_bytes()),
            value: record,
        });
        self
    }

    pub(crate) fn unbind(&mut self, id: &str) -> &mut Self {
        self.operations.push(WriteOp::MapDelete {
            map: self.namespace.map_key().clone(),
            field: Bytes::copy_from_slice(id.as_bytes()),
        });
        self
    }

    #[cfg(test)]
    pub(crate) fn operations(&self) -> &[WriteOp] {
        &self.operations
    }

    pub(crate) fn commit<S: OrderedStore + ?Sized>(self, store: &S) -> Result<()> {
        log::trace!(
            "Committing {} operations to '{}'",
            self.operations.len(),
            self.namespace
        );
        store.atomic_batch(&self.operations)?;
        Ok(())
    }
}
