//! Columnar row batches: a time column plus typed value columns, assembled via builders.

use crate::error::PageError;
use crate::types::{Binary, DataType, Timestamp, Value, ValueKind};

/// Typed storage for one value column.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Boolean(Vec<bool>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    Float(Vec<f32>),
    Double(Vec<f64>),
    Binary(Vec<Binary>),
}

impl Column {
    pub fn with_capacity(kind: ValueKind, capacity: usize) -> Self {
        match kind {
            ValueKind::Boolean => Column::Boolean(Vec::with_capacity(capacity)),
            ValueKind::Int32 => Column::Int32(Vec::with_capacity(capacity)),
            ValueKind::Int64 => Column::Int64(Vec::with_capacity(capacity)),
            ValueKind::Float => Column::Float(Vec::with_capacity(capacity)),
            ValueKind::Double => Column::Double(Vec::with_capacity(capacity)),
            ValueKind::Binary => Column::Binary(Vec::with_capacity(capacity)),
        }
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Column::Boolean(_) => ValueKind::Boolean,
            Column::Int32(_) => ValueKind::Int32,
            Column::Int64(_) => ValueKind::Int64,
            Column::Float(_) => ValueKind::Float,
            Column::Double(_) => ValueKind::Double,
            Column::Binary(_) => ValueKind::Binary,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Column::Boolean(v) => v.len(),
            Column::Int32(v) => v.len(),
            Column::Int64(v) => v.len(),
            Column::Float(v) => v.len(),
            Column::Double(v) => v.len(),
            Column::Binary(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Value at `index` as a runtime-typed [`Value`].
    pub fn get(&self, index: usize) -> Option<Value> {
        match self {
            Column::Boolean(v) => v.get(index).copied().map(Value::Boolean),
            Column::Int32(v) => v.get(index).copied().map(Value::Int32),
            Column::Int64(v) => v.get(index).copied().map(Value::Int64),
            Column::Float(v) => v.get(index).copied().map(Value::Float),
            Column::Double(v) => v.get(index).copied().map(Value::Double),
            Column::Binary(v) => v.get(index).cloned().map(Value::Binary),
        }
    }
}

/// Builder for the time column.
#[derive(Debug, Default)]
pub struct TimeColumnBuilder {
    times: Vec<Timestamp>,
}

impl TimeColumnBuilder {
    #[inline]
    pub fn write_long(&mut self, time: Timestamp) {
        self.times.push(time);
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}

/// Builder for one typed value column. Writing a value of another kind is an error.
#[derive(Debug)]
pub struct ColumnBuilder {
    data_type: DataType,
    column: Column,
}

macro_rules! typed_write {
    ($name:ident, $ty:ty, $variant:ident, $actual:expr) => {
        #[inline]
        pub fn $name(&mut self, value: $ty) -> Result<(), PageError> {
            match &mut self.column {
                Column::$variant(v) => {
                    v.push(value);
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

impl ColumnBuilder {
    pub fn new(data_type: DataType, capacity: usize) -> Result<Self, PageError> {
        let kind = data_type.require_kind()?;
        Ok(Self {
            data_type,
            column: Column::with_capacity(kind, capacity),
        })
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn len(&self) -> usize {
        self.column.len()
    }

    pub fn is_empty(&self) -> bool {
        self.column.is_empty()
    }

    typed_write!(write_boolean, bool, Boolean, DataType::Boolean);
    typed_write!(write_int, i32, Int32, DataType::Int32);
    typed_write!(write_long, i64, Int64, DataType::Int64);
    typed_write!(write_float, f32, Float, DataType::Float);
    typed_write!(write_double, f64, Double, DataType::Double);
    typed_write!(write_binary, Binary, Binary, DataType::Text);
}

/// Collects rows into a [`TsBlock`]. Each row is one time entry plus one entry in every
/// value column, committed with [`TsBlockBuilder::declare_position`].
#[derive(Debug)]
pub struct TsBlockBuilder {
    time_builder: TimeColumnBuilder,
    value_builders: Vec<ColumnBuilder>,
    position_count: usize,
}

impl TsBlockBuilder {
    pub fn new(expected_entries: usize, data_types: &[DataType]) -> Result<Self, PageError> {
        let value_builders = data_types
            .iter()
            .map(|dt| ColumnBuilder::new(*dt, expected_entries))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            time_builder: TimeColumnBuilder {
                times: Vec::with_capacity(expected_entries),
            },
            value_builders,
            position_count: 0,
        })
    }

    pub fn time_column_builder(&mut self) -> &mut TimeColumnBuilder {
        &mut self.time_builder
    }

    pub fn column_builder(&mut self, index: usize) -> Result<&mut ColumnBuilder, PageError> {
        let count = self.value_builders.len();
        self.value_builders.get_mut(index).ok_or_else(|| {
            PageError::InvalidArgument(format!(
                "Column index {} out of range for block with {} value columns",
                index, count
            ))
        })
    }

    #[inline]
    pub fn declare_position(&mut self) {
        self.position_count += 1;
    }

    pub fn position_count(&self) -> usize {
        self.position_count
    }

    pub fn is_empty(&self) -> bool {
        self.position_count == 0
    }

    /// Finishes the block. Every column must hold exactly `position_count` entries.
    pub fn build(self) -> Result<TsBlock, PageError> {
        if self.time_builder.len() != self.position_count {
            return Err(PageError::Internal(format!(
                "Time column has {} entries, {} positions declared",
                self.time_builder.len(),
                self.position_count
            )));
        }
        let mut value_columns = Vec::with_capacity(self.value_builders.len());
        for (i, b) in self.value_builders.into_iter().enumerate() {
            if b.len() != self.position_count {
                return Err(PageError::Internal(format!(
                    "Value column {} has {} entries, {} positions declared",
                    i,
                    b.len(),
                    self.position_count
                )));
            }
            value_columns.push(b.column);
        }
        Ok(TsBlock {
            time_column: self.time_builder.times,
            value_columns,
        })
    }
}

/// Immutable columnar batch of rows.
#[derive(Debug, Clone, PartialEq)]
pub struct TsBlock {
    time_column: Vec<Timestamp>,
    value_columns: Vec<Column>,
}

impl TsBlock {
    pub fn position_count(&self) -> usize {
        self.time_column.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time_column.is_empty()
    }

    pub fn time_column(&self) -> &[Timestamp] {
        &self.time_column
    }

    pub fn value_column_count(&self) -> usize {
        self.value_columns.len()
    }

    pub fn column(&self, index: usize) -> Option<&Column> {
        self.value_columns.get(index)
    }

    /// `(time, value)` rows of the given value column, in position order.
    pub fn rows(&self, column: usize) -> Vec<(Timestamp, Value)> {
        let Some(col) = self.value_columns.get(column) else {
            return Vec::new();
        };
        self.time_column
            .iter()
            .enumerate()
            .filter_map(|(i, t)| col.get(i).map(|v| (*t, v)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_checks_declared_positions() {
        let mut b = TsBlockBuilder::new(4, &[DataType::Int32]).unwrap();
        b.time_column_builder().write_long(10);
        b.column_builder(0).unwrap().write_int(1).unwrap();
        b.declare_position();
        b.time_column_builder().write_long(20);
        b.column_builder(0).unwrap().write_int(2).unwrap();
        b.declare_position();
        let block = b.build().unwrap();
        assert_eq!(block.position_count(), 2);
        assert_eq!(block.time_column(), &[10, 20]);
        assert_eq!(block.rows(0), vec![(10, Value::Int32(1)), (20, Value::Int32(2))]);
        assert!(block.rows(1).is_empty());
    }

    #[test]
    fn undeclared_row_fails_build() {
        let mut b = TsBlockBuilder::new(0, &[DataType::Double]).unwrap();
        b.time_column_builder().write_long(1);
        b.column_builder(0).unwrap().write_double(1.0).unwrap();
        assert!(matches!(b.build(), Err(PageError::Internal(_))));
    }

    #[test]
    fn typed_writers_reject_other_kinds() {
        let mut b = TsBlockBuilder::new(1, &[DataType::Date]).unwrap();
        let col = b.column_builder(0).unwrap();
        assert!(col.write_int(19000).is_ok());
        assert!(matches!(
            col.write_long(1),
            Err(PageError::TypeMismatch {
                expected: DataType::Date,
                actual: DataType::Int64
            })
        ));
        assert!(b.column_builder(1).is_err());
    }

    #[test]
    fn unsupported_column_type() {
        assert!(matches!(
            TsBlockBuilder::new(1, &[DataType::Vector]),
            Err(PageError::UnsupportedType(DataType::Vector))
        ));
    }
}
