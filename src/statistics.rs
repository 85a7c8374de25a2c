//! Page-level statistics and page header. Computed by the writer; only read here.

use serde::{Deserialize, Serialize};

use crate::error::PageError;
use crate::types::{Timestamp, Value};

/// Aggregate statistics over one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    /// Number of rows in the page.
    pub count: u64,
    /// Smallest timestamp in the page.
    pub start_time: Timestamp,
    /// Largest timestamp in the page.
    pub end_time: Timestamp,
    /// Smallest value, if the writer recorded one.
    pub min_value: Option<Value>,
    /// Largest value, if the writer recorded one.
    pub max_value: Option<Value>,
}

impl Statistics {
    pub fn new(count: u64, start_time: Timestamp, end_time: Timestamp) -> Self {
        Self {
            count,
            start_time,
            end_time,
            min_value: None,
            max_value: None,
        }
    }

    pub fn with_value_range(mut self, min: Value, max: Value) -> Self {
        self.min_value = Some(min);
        self.max_value = Some(max);
        self
    }
}

/// Header of a single page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageHeader {
    pub uncompressed_size: usize,
    pub compressed_size: usize,
    pub statistics: Option<Statistics>,
    /// Set when the page overlaps a deletion or an unsequenced write.
    pub modified: bool,
}

impl PageHeader {
    pub fn new(uncompressed_size: usize, compressed_size: usize, statistics: Statistics) -> Self {
        Self {
            uncompressed_size,
            compressed_size,
            statistics: Some(statistics),
            modified: false,
        }
    }

    pub fn statistics(&self) -> Option<&Statistics> {
        self.statistics.as_ref()
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }
}

/// Anything exposing page statistics to a filter's whole-page check.
///
/// Single-column pages return the same statistics for values and time.
pub trait StatisticsSource {
    fn statistics(&self) -> Option<&Statistics>;

    fn time_statistics(&self) -> Option<&Statistics>;

    /// Statistics of the measurement at `index`. Pages with one value column accept only 0.
    fn measurement_statistics(&self, index: usize) -> Result<Option<&Statistics>, PageError>;
}

impl StatisticsSource for Statistics {
    fn statistics(&self) -> Option<&Statistics> {
        Some(self)
    }

    fn time_statistics(&self) -> Option<&Statistics> {
        Some(self)
    }

    fn measurement_statistics(&self, index: usize) -> Result<Option<&Statistics>, PageError> {
        check_single_measurement(index)?;
        Ok(Some(self))
    }
}

pub(crate) fn check_single_measurement(index: usize) -> Result<(), PageError> {
    if index != 0 {
        return Err(PageError::InvalidArgument(format!(
            "Non-aligned page only has one measurement, but measurement index is {}",
            index
        )));
    }
    Ok(())
}
