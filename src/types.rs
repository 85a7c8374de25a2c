use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::PageError;

/// Timestamp type (signed, unit defined by the writer; usually milliseconds since epoch).
pub type Timestamp = i64;

/// Declared data type of a page's value stream.
///
/// Several types share a physical representation: DATE is stored as INT32, TIMESTAMP as
/// INT64 and TEXT/BLOB/STRING as length-prefixed bytes. VECTOR and UNKNOWN have no decode
/// path on a single-column page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataType {
    Boolean,
    Int32,
    Int64,
    Float,
    Double,
    Text,
    Vector,
    Unknown,
    Timestamp,
    Date,
    Blob,
    String,
}

impl DataType {
    /// Physical kind used to decode and store values of this type, if any.
    pub fn value_kind(self) -> Option<ValueKind> {
        match self {
            DataType::Boolean => Some(ValueKind::Boolean),
            DataType::Int32 | DataType::Date => Some(ValueKind::Int32),
            DataType::Int64 | DataType::Timestamp => Some(ValueKind::Int64),
            DataType::Float => Some(ValueKind::Float),
            DataType::Double => Some(ValueKind::Double),
            DataType::Text | DataType::Blob | DataType::String => Some(ValueKind::Binary),
            DataType::Vector | DataType::Unknown => None,
        }
    }

    pub(crate) fn require_kind(self) -> Result<ValueKind, PageError> {
        self.value_kind().ok_or(PageError::UnsupportedType(self))
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::Boolean => "BOOLEAN",
            DataType::Int32 => "INT32",
            DataType::Int64 => "INT64",
            DataType::Float => "FLOAT",
            DataType::Double => "DOUBLE",
            DataType::Text => "TEXT",
            DataType::Vector => "VECTOR",
            DataType::Unknown => "UNKNOWN",
            DataType::Timestamp => "TIMESTAMP",
            DataType::Date => "DATE",
            DataType::Blob => "BLOB",
            DataType::String => "STRING",
        };
        f.write_str(name)
    }
}

/// Physical value representation. One decode/filter/write path exists per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Boolean,
    Int32,
    Int64,
    Float,
    Double,
    Binary,
}

impl ValueKind {
    /// Canonical data type for this kind, used in error messages.
    pub fn data_type(self) -> DataType {
        match self {
            ValueKind::Boolean => DataType::Boolean,
            ValueKind::Int32 => DataType::Int32,
            ValueKind::Int64 => DataType::Int64,
            ValueKind::Float => DataType::Float,
            ValueKind::Double => DataType::Double,
            ValueKind::Binary => DataType::Text,
        }
    }
}

/// Owned variable-length byte string (TEXT, BLOB and STRING values).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Binary(pub Vec<u8>);

impl Binary {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Binary(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for Binary {
    fn from(s: &str) -> Self {
        Binary(s.as_bytes().to_vec())
    }
}

impl fmt::Display for Binary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

/// A single typed value, used where the kind is only known at runtime
/// (statistics, filter operands, batch reads).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Boolean(bool),
    Int32(i32),
    Int64(i64),
    Float(f32),
    Double(f64),
    Binary(Binary),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Boolean(_) => ValueKind::Boolean,
            Value::Int32(_) => ValueKind::Int32,
            Value::Int64(_) => ValueKind::Int64,
            Value::Float(_) => ValueKind::Float,
            Value::Double(_) => ValueKind::Double,
            Value::Binary(_) => ValueKind::Binary,
        }
    }

    /// Compares two values of the same kind. Values of different kinds, and NaN floats,
    /// are unordered.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
            (Value::Int32(a), Value::Int32(b)) => Some(a.cmp(b)),
            (Value::Int64(a), Value::Int64(b)) => Some(a.cmp(b)),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::Double(a), Value::Double(b)) => a.partial_cmp(b),
            (Value::Binary(a), Value::Binary(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Parses a literal for the given data type, e.g. a filter operand from config.
    pub fn parse(data_type: DataType, literal: &str) -> Result<Value, PageError> {
        let bad = |e: &dyn fmt::Display| {
            PageError::ConfigError(format!("invalid {} literal {:?}: {}", data_type, literal, e))
        };
        let kind = data_type.require_kind()?;
        let s = literal.trim();
        Ok(match kind {
            ValueKind::Boolean => Value::Boolean(s.parse::<bool>().map_err(|e| bad(&e))?),
            ValueKind::Int32 => Value::Int32(s.parse::<i32>().map_err(|e| bad(&e))?),
            ValueKind::Int64 => Value::Int64(s.parse::<i64>().map_err(|e| bad(&e))?),
            ValueKind::Float => Value::Float(s.parse::<f32>().map_err(|e| bad(&e))?),
            ValueKind::Double => Value::Double(s.parse::<f64>().map_err(|e| bad(&e))?),
            ValueKind::Binary => Value::Binary(Binary::from(literal)),
        })
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Boolean(v) => write!(f, "{}", v),
            Value::Int32(v) => write!(f, "{}", v),
            Value::Int64(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::Binary(v) => write!(f, "{}", v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn physical_kinds_cover_aliases() {
        assert_eq!(DataType::Date.value_kind(), Some(ValueKind::Int32));
        assert_eq!(DataType::Timestamp.value_kind(), Some(ValueKind::Int64));
        assert_eq!(DataType::Blob.value_kind(), Some(ValueKind::Binary));
        assert_eq!(DataType::String.value_kind(), Some(ValueKind::Binary));
        assert_eq!(DataType::Vector.value_kind(), None);
        assert!(matches!(
            DataType::Unknown.require_kind(),
            Err(PageError::UnsupportedType(DataType::Unknown))
        ));
    }

    #[test]
    fn compare_rejects_mixed_kinds_and_nan() {
        assert_eq!(
            Value::Int32(1).compare(&Value::Int32(2)),
            Some(Ordering::Less)
        );
        assert_eq!(Value::Int32(1).compare(&Value::Int64(1)), None);
        assert_eq!(Value::Double(f64::NAN).compare(&Value::Double(0.0)), None);
    }

    #[test]
    fn parse_literals() {
        assert_eq!(Value::parse(DataType::Int32, " 42 ").unwrap(), Value::Int32(42));
        assert_eq!(
            Value::parse(DataType::Text, "abc").unwrap(),
            Value::Binary(Binary::from("abc"))
        );
        assert!(matches!(
            Value::parse(DataType::Int64, "x"),
            Err(PageError::ConfigError(_))
        ));
    }

    #[test]
    fn display_matches_type_names() {
        assert_eq!(DataType::Int32.to_string(), "INT32");
        assert_eq!(DataType::Timestamp.to_string(), "TIMESTAMP");
    }
}
