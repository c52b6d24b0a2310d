//! Compute layer for query processing.
//!
//! Pure functions over points and rectangles, independent of any store:
//! - Range decomposition into grid cells and lexicographic scans
//! - Query planning (grid granularity selection)
//! - Exact filtering of scan results
//! - Input validation

pub mod decompose;
pub mod filter;
pub mod planner;
pub mod validation;
