//! Core value types: points, query rectangles and index entries.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use std::hash::Hash;
use std::ops::Deref;
use std::str::FromStr;

/// Inline capacity for per-dimension vectors. Most indexes have 2 to 4 dimensions.
pub(crate) const INLINE_DIMS: usize = 4;

pub(crate) type DimVec<T> = SmallVec<[T; INLINE_DIMS]>;

/// Caller-supplied identifier attached to each indexed point.
///
/// The identifier is stored in its `Display` form and recovered with `FromStr`,
/// so the two must round-trip. Its text must not contain the record delimiter.
pub trait Identifier: fmt::Display + FromStr + Clone + Eq + Hash {}

impl<T> Identifier for T where T: fmt::Display + FromStr + Clone + Eq + Hash {}

/// A point in D-dimensional unsigned integer space.
///
/// # Examples
///
/// ```rust
/// use lexspace::Point;
///
/// let p = Point::new([45, 120_000]);
/// assert_eq!(p.dimensions(), 2);
/// assert_eq!(p[1], 120_000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Point(DimVec<u64>);

impl Point {
    pub fn new<C: IntoIterator<Item = u64>>(coords: C) -> Self {
        Self(coords.into_iter().collect())
    }

    /// Number of coordinates in this point.
    pub fn dimensions(&self) -> usize {
        self.0.len()
    }

    pub fn coords(&self) -> &[u64] {
        &self.0
    }
}

impl Deref for Point {
    type Target = [u64];

    fn deref(&self) -> &[u64] {
        &self.0
    }
}

impl From<Vec<u64>> for Point {
    fn from(coords: Vec<u64>) -> Self {
        Self(SmallVec::from_vec(coords))
    }
}

impl<const N: usize> From<[u64; N]> for Point {
    fn from(coords: [u64; N]) -> Self {
        Self::new(coords)
    }
}

impl From<&[u64]> for Point {
    fn from(coords: &[u64]) -> Self {
        Self(SmallVec::from_slice(coords))
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, c) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", c)?;
        }
        write!(f, ")")
    }
}

/// An axis-aligned hyper-rectangle given as one inclusive `(low, high)` pair per dimension.
///
/// Pairs may be given in either order; [`QueryRect::normalized`] swaps them so
/// that `low <= high` on every axis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRect(DimVec<(u64, u64)>);

impl QueryRect {
    pub fn new<R: IntoIterator<Item = (u64, u64)>>(ranges: R) -> Self {
        Self(ranges.into_iter().collect())
    }

    /// The degenerate rectangle containing exactly `point`.
    pub fn singleton(point: &[u64]) -> Self {
        Self(point.iter().map(|&c| (c, c)).collect())
    }

    pub fn dimensions(&self) -> usize {
        self.0.len()
    }

    pub fn ranges(&self) -> &[(u64, u64)] {
        &self.0
    }

    /// Returns a copy with every pair ordered as `(low, high)`.
    pub fn normalized(&self) -> Self {
        Self(
            self.0
                .iter()
                .map(|&(a, b)| if a <= b { (a, b) } else { (b, a) })
                .collect(),
        )
    }

    /// Whether `coords` lies inside the rectangle on every axis, bounds inclusive.
    ///
    /// Expects a normalized rectangle of the same dimensionality.
    pub fn contains(&self, coords: &[u64]) -> bool {
        coords.len() == self.0.len()
            && self
                .0
                .iter()
                .zip(coords)
                .all(|(&(low, high), &c)| low <= c && c <= high)
    }
}

impl<const N: usize> From<[(u64, u64); N]> for QueryRect {
    fn from(ranges: [(u64, u64); N]) -> Self {
        Self::new(ranges)
    }
}

impl From<Vec<(u64, u64)>> for QueryRect {
    fn from(ranges: Vec<(u64, u64)>) -> Self {
        Self(SmallVec::from_vec(ranges))
    }
}

/// A query hit: the raw coordinates and identifier of an indexed point.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Entry<I> {
    pub point: Point,
    pub id: I,
}

impl<I> Entry<I> {
    pub fn new(point: impl Into<Point>, id: I) -> Self {
        Self {
            point: point.into(),
            id,
        }
    }
}
