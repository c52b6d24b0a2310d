//! Query planning: choosing the grid granularity for a rectangle.

use crate::codec::ZCodec;
use crate::compute::decompose::{CellScan, cell_count, decompose};
use crate::error::Result;
use crate::types::QueryRect;

/// The scans needed to answer one rectangle query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPlan {
    /// Grid cells have side `2^exponent`.
    pub exponent: u32,
    pub scans: Vec<CellScan>,
}

impl QueryPlan {
    pub fn scan_count(&self) -> usize {
        self.scans.len()
    }
}

/// Picks the cell size for each query so the number of scans stays bounded.
///
/// The first guess sizes cells after the narrowest side of the rectangle, so
/// that side is covered by one or two cells. When the other sides are much
/// longer that guess can need a huge number of cells; the exponent then
/// grows until fewer than `fanout_ceiling` cells remain. Larger cells mean
/// fewer scans but more records outside the rectangle to filter away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryPlanner {
    precision: u32,
    fanout_ceiling: u64,
}

impl QueryPlanner {
    pub fn new(precision: u32, fanout_ceiling: u64) -> Self {
        Self {
            precision,
            fanout_ceiling,
        }
    }

    pub fn fanout_ceiling(&self) -> u64 {
        self.fanout_ceiling
    }

    /// Chooses the exponent for a normalized rectangle.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use lexspace::compute::planner::QueryPlanner;
    /// use lexspace::QueryRect;
    ///
    /// let planner = QueryPlanner::new(64, 20);
    /// // Narrowest side spans 11 values: 11 > 2^3, 11 <= 2^4
    /// let rect = QueryRect::from([(40, 50), (100_000, 115_000)]);
    /// assert!(planner.choose_exponent(&rect) >= 4);
    /// ```
    pub fn choose_exponent(&self, rect: &QueryRect) -> u32 {
        let min_span = rect
            .ranges()
            .iter()
            .map(|&(low, high)| u128::from(high.abs_diff(low)) + 1)
            .min()
            .unwrap_or(1);

        // Halve the narrowest span until it is at most 2: the number of
        // halvings plus one.
        let mut exponent = 1;
        while exponent < self.precision && min_span > 1u128 << exponent {
            exponent += 1;
        }

        while exponent < self.precision
            && cell_count(rect, exponent) >= u128::from(self.fanout_ceiling)
        {
            exponent += 1;
        }

        exponent
    }

    /// Chooses the exponent for `rect` and decomposes it into scans.
    pub fn plan(&self, codec: &ZCodec, rect: &QueryRect) -> Result<QueryPlan> {
        let exponent = self.choose_exponent(rect);
        let scans = decompose(codec, rect, exponent)?;
        log::debug!(
            "Planned {} scans at exponent {} for {:?}",
            scans.len(),
            exponent,
            rect.ranges()
        );
        Ok(QueryPlan { exponent, scans })
    }
}
