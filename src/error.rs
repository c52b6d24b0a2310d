//! Error types for lexspace.

use crate::storage::StoreError;
use thiserror::Error;

/// Errors produced by the spatial index.
#[derive(Error, Debug)]
pub enum IndexError {
    /// A point or query rectangle does not have one component per dimension.
    #[error("Dimension mismatch: index has {expected} dimensions, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// A coordinate does not fit in the configured number of bits.
    #[error("Coordinate {value} out of range for {precision}-bit precision")]
    OutOfRange { value: u64, precision: u32 },

    /// Identifier-keyed removal or update of an identifier that is not indexed.
    #[error("Identifier not found: {0}")]
    NotFound(String),

    /// A stored record could not be parsed back into coordinates and identifier.
    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    /// The external ordered store failed or timed out.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, IndexError>;
