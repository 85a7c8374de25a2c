//! Deleted time ranges and the forward-only cursor that checks timestamps against them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PageError;
use crate::types::Timestamp;

/// Closed timestamp interval `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    pub min: Timestamp,
    pub max: Timestamp,
}

impl TimeRange {
    pub fn new(min: Timestamp, max: Timestamp) -> Self {
        Self { min, max }
    }

    #[inline]
    pub fn contains(&self, time: Timestamp) -> bool {
        self.min <= time && time <= self.max
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.min, self.max)
    }
}

/// Parses `min:max` (both inclusive).
impl FromStr for TimeRange {
    type Err = PageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || PageError::ConfigError(format!("invalid time range {:?}, expected min:max", s));
        let (min, max) = s.split_once(':').ok_or_else(bad)?;
        let min = min.trim().parse::<Timestamp>().map_err(|_| bad())?;
        let max = max.trim().parse::<Timestamp>().map_err(|_| bad())?;
        if min > max {
            return Err(PageError::ConfigError(format!(
                "invalid time range {:?}: min > max",
                s
            )));
        }
        Ok(TimeRange::new(min, max))
    }
}

/// Deleted intervals plus a scan cursor.
///
/// Intervals must be sorted ascending by `max` and pairwise non-overlapping; this is not
/// verified. Queries must arrive with non-decreasing timestamps: the cursor never moves
/// back, so a descending scan over the same cursor misses deletions.
#[derive(Debug, Clone, Default)]
pub struct DeletionCursor {
    intervals: Vec<TimeRange>,
    cursor: usize,
}

impl DeletionCursor {
    pub fn new(intervals: Vec<TimeRange>) -> Self {
        Self {
            intervals,
            cursor: 0,
        }
    }

    pub fn intervals(&self) -> &[TimeRange] {
        &self.intervals
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// Whether `time` falls inside a deleted interval, advancing past intervals that end
    /// before it.
    #[inline]
    pub fn is_deleted(&mut self, time: Timestamp) -> bool {
        while let Some(range) = self.intervals.get(self.cursor) {
            if range.contains(time) {
                return true;
            } else if range.max < time {
                self.cursor += 1;
            } else {
                return false;
            }
        }
        false
    }
}
