//! Legacy row container: an append-only typed array of `(time, value)` pairs.
//!
//! Rows are stored in the order they are put. After [`BatchData::flip`] the batch is
//! read-only and readable through a cursor; ascending batches read front to back,
//! descending batches back to front.

use crate::block::Column;
use crate::error::PageError;
use crate::types::{Binary, DataType, Timestamp, Value};

#[derive(Debug, Clone, PartialEq)]
pub struct BatchData {
    data_type: DataType,
    ascending: bool,
    times: Vec<Timestamp>,
    values: Column,
    flipped: bool,
    /// Number of rows already consumed by the read cursor.
    read_count: usize,
}

macro_rules! typed_put {
    ($name:ident, $ty:ty, $variant:ident, $actual:expr) => {
        #[inline]
        pub fn $name(&mut self, time: Timestamp, value: $ty) -> Result<(), PageError> {
            self.check_writable()?;
            match &mut self.values {
                Column::$variant(v) => {
                    v.push(value);
                    self.times.push(time);
                    Ok(())
                }
                _ => Err(PageError::TypeMismatch {
                    expected: self.data_type,
                    actual: $actual,
                }),
            }
        }
    };
}

impl BatchData {
    /// Creates an empty batch for `data_type`. `ascending` only selects the read direction.
    pub fn new(data_type: DataType, ascending: bool) -> Result<Self, PageError> {
        let kind = data_type.require_kind()?;
        Ok(Self {
            data_type,
            ascending,
            times: Vec::new(),
            values: Column::with_capacity(kind, 0),
            flipped: false,
            read_count: 0,
        })
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn is_ascending(&self) -> bool {
        self.ascending
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn is_flipped(&self) -> bool {
        self.flipped
    }

    fn check_writable(&self) -> Result<(), PageError> {
        if self.flipped {
            return Err(PageError::Internal(
                "BatchData is read-only after flip".to_string(),
            ));
        }
        Ok(())
    }

    typed_put!(put_boolean, bool, Boolean, DataType::Boolean);
    typed_put!(put_int, i32, Int32, DataType::Int32);
    typed_put!(put_long, i64, Int64, DataType::Int64);
    typed_put!(put_float, f32, Float, DataType::Float);
    typed_put!(put_double, f64, Double, DataType::Double);
    typed_put!(put_binary, Binary, Binary, DataType::Text);

    /// Ends the write phase and rewinds the read cursor.
    pub fn flip(mut self) -> Self {
        self.flipped = true;
        self.read_count = 0;
        self
    }

    /// Storage index of the row under the read cursor.
    fn cursor_index(&self) -> Option<usize> {
        if self.read_count >= self.times.len() {
            return None;
        }
        if self.ascending {
            Some(self.read_count)
        } else {
            Some(self.times.len() - 1 - self.read_count)
        }
    }

    pub fn has_current(&self) -> bool {
        self.flipped && self.cursor_index().is_some()
    }

    pub fn next(&mut self) {
        if self.has_current() {
            self.read_count += 1;
        }
    }

    pub fn current_time(&self) -> Option<Timestamp> {
        self.cursor_index().map(|i| self.times[i])
    }

    pub fn current_value(&self) -> Option<Value> {
        self.cursor_index().and_then(|i| self.values.get(i))
    }

    /// Time of the row at storage position `index` (put order).
    pub fn time_at(&self, index: usize) -> Option<Timestamp> {
        self.times.get(index).copied()
    }

    /// Value of the row at storage position `index` (put order).
    pub fn value_at(&self, index: usize) -> Option<Value> {
        self.values.get(index)
    }

    /// Rows in read order, independent of the cursor.
    pub fn iter(&self) -> impl Iterator<Item = (Timestamp, Value)> + '_ {
        let n = self.times.len();
        (0..n).filter_map(move |k| {
            let i = if self.ascending { k } else { n - 1 - k };
            self.values.get(i).map(|v| (self.times[i], v))
        })
    }

    /// Rows in put (decode) order.
    pub fn rows(&self) -> Vec<(Timestamp, Value)> {
        (0..self.times.len())
            .filter_map(|i| self.values.get(i).map(|v| (self.times[i], v)))
            .collect()
    }
}
