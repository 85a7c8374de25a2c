//! Value stream codecs: the decoder contract consumed by the page reader, the built-in
//! PLAIN and DELTA_VARINT codecs, and a page assembler used to produce page bytes.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::buffer::{write_var_u64, PageBuffer};
use crate::error::PageError;
use crate::statistics::{PageHeader, Statistics};
use crate::types::{Binary, DataType, Timestamp, Value, ValueKind};

// --- Public API ---

/// Encoding of a time or value stream. Serde: upper-case string (e.g. `"PLAIN"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TsEncoding {
    /// Little-endian fixed width; BOOLEAN as one byte; binary as varint length + bytes.
    Plain,
    /// Zigzag varint of the first value, then zigzag varint deltas. INT32/INT64 only.
    DeltaVarint,
}

impl TsEncoding {
    /// Creates a decoder for a stream of `data_type` values in this encoding.
    pub fn decoder(self, data_type: DataType) -> Result<Box<dyn Decoder>, PageError> {
        let kind = data_type.require_kind()?;
        match self {
            TsEncoding::Plain => Ok(Box::new(PlainDecoder::new())),
            TsEncoding::DeltaVarint => match kind {
                ValueKind::Int32 | ValueKind::Int64 => Ok(Box::new(DeltaVarintDecoder::new())),
                _ => Err(PageError::UnsupportedType(data_type)),
            },
        }
    }

    /// Creates an encoder for a stream of `data_type` values in this encoding.
    pub fn encoder(self, data_type: DataType) -> Result<Box<dyn Encoder>, PageError> {
        let kind = data_type.require_kind()?;
        match self {
            TsEncoding::Plain => Ok(Box::new(PlainEncoder)),
            TsEncoding::DeltaVarint => match kind {
                ValueKind::Int32 | ValueKind::Int64 => Ok(Box::new(DeltaVarintEncoder::default())),
                _ => Err(PageError::UnsupportedType(data_type)),
            },
        }
    }
}

impl fmt::Display for TsEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TsEncoding::Plain => f.write_str("PLAIN"),
            TsEncoding::DeltaVarint => f.write_str("DELTA_VARINT"),
        }
    }
}

/// Stateful decoder over one stream.
///
/// Each `read_*` advances `buffer`. Asking for a kind the decoder cannot produce is a
/// `Decode` error; reading past the end of the stream is a `Decode` error as well.
pub trait Decoder: fmt::Debug + Send {
    fn name(&self) -> &'static str;

    /// Whether `buffer` still holds at least one encoded value.
    fn has_next(&mut self, buffer: &PageBuffer) -> Result<bool, PageError>;

    fn read_boolean(&mut self, _buffer: &mut PageBuffer) -> Result<bool, PageError> {
        Err(unsupported_read(self.name(), DataType::Boolean))
    }

    fn read_int(&mut self, _buffer: &mut PageBuffer) -> Result<i32, PageError> {
        Err(unsupported_read(self.name(), DataType::Int32))
    }

    fn read_long(&mut self, _buffer: &mut PageBuffer) -> Result<i64, PageError> {
        Err(unsupported_read(self.name(), DataType::Int64))
    }

    fn read_float(&mut self, _buffer: &mut PageBuffer) -> Result<f32, PageError> {
        Err(unsupported_read(self.name(), DataType::Float))
    }

    fn read_double(&mut self, _buffer: &mut PageBuffer) -> Result<f64, PageError> {
        Err(unsupported_read(self.name(), DataType::Double))
    }

    fn read_binary(&mut self, _buffer: &mut PageBuffer) -> Result<Binary, PageError> {
        Err(unsupported_read(self.name(), DataType::Text))
    }
}

/// Stateful encoder producing one stream.
pub trait Encoder: fmt::Debug + Send {
    fn encode(&mut self, value: &Value, out: &mut Vec<u8>) -> Result<(), PageError>;
}

fn unsupported_read(decoder: &str, requested: DataType) -> PageError {
    PageError::Decode(format!("{} decoder cannot read {}", decoder, requested))
}

// --- PLAIN ---

#[derive(Debug, Default)]
pub struct PlainDecoder;

impl PlainDecoder {
    pub fn new() -> Self {
        PlainDecoder
    }
}

impl Decoder for PlainDecoder {
    fn name(&self) -> &'static str {
        "PLAIN"
    }

    fn has_next(&mut self, buffer: &PageBuffer) -> Result<bool, PageError> {
        Ok(buffer.has_remaining())
    }

    fn read_boolean(&mut self, buffer: &mut PageBuffer) -> Result<bool, PageError> {
        match buffer.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(PageError::Decode(format!("Invalid boolean byte {}", other))),
        }
    }

    fn read_int(&mut self, buffer: &mut PageBuffer) -> Result<i32, PageError> {
        Ok(i32::from_le_bytes(buffer.read_array()?))
    }

    fn read_long(&mut self, buffer: &mut PageBuffer) -> Result<i64, PageError> {
        Ok(i64::from_le_bytes(buffer.read_array()?))
    }

    fn read_float(&mut self, buffer: &mut PageBuffer) -> Result<f32, PageError> {
        Ok(f32::from_le_bytes(buffer.read_array()?))
    }

    fn read_double(&mut self, buffer: &mut PageBuffer) -> Result<f64, PageError> {
        Ok(f64::from_le_bytes(buffer.read_array()?))
    }

    fn read_binary(&mut self, buffer: &mut PageBuffer) -> Result<Binary, PageError> {
        let len = buffer.read_unsigned_var_int()? as usize;
        Ok(Binary(buffer.read_bytes(len)?.to_vec()))
    }
}

#[derive(Debug, Default)]
pub struct PlainEncoder;

impl Encoder for PlainEncoder {
    fn encode(&mut self, value: &Value, out: &mut Vec<u8>) -> Result<(), PageError> {
        match value {
            Value::Boolean(v) => out.push(u8::from(*v)),
            Value::Int32(v) => out.extend_from_slice(&v.to_le_bytes()),
            Value::Int64(v) => out.extend_from_slice(&v.to_le_bytes()),
            Value::Float(v) => out.extend_from_slice(&v.to_le_bytes()),
            Value::Double(v) => out.extend_from_slice(&v.to_le_bytes()),
            Value::Binary(v) => {
                let len: u32 = v
                    .len()
                    .try_into()
                    .map_err(|_| PageError::Internal("Binary value too large".to_string()))?;
                write_var_u64(out, len as u64);
                out.extend_from_slice(v.as_bytes());
            }
        }
        Ok(())
    }
}

// --- DELTA_VARINT ---

#[inline]
fn zigzag_encode(v: i64) -> u64 {
    ((v << 1) ^ (v >> 63)) as u64
}

#[inline]
fn zigzag_decode(v: u64) -> i64 {
    ((v >> 1) as i64) ^ -((v & 1) as i64)
}

#[derive(Debug, Default)]
pub struct DeltaVarintDecoder {
    previous: Option<i64>,
}

impl DeltaVarintDecoder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Decoder for DeltaVarintDecoder {
    fn name(&self) -> &'static str {
        "DELTA_VARINT"
    }

    fn has_next(&mut self, buffer: &PageBuffer) -> Result<bool, PageError> {
        Ok(buffer.has_remaining())
    }

    fn read_int(&mut self, buffer: &mut PageBuffer) -> Result<i32, PageError> {
        let v = self.read_long(buffer)?;
        i32::try_from(v)
            .map_err(|_| PageError::Decode(format!("Delta-decoded value {} overflows INT32", v)))
    }

    fn read_long(&mut self, buffer: &mut PageBuffer) -> Result<i64, PageError> {
        let raw = zigzag_decode(buffer.read_var_u64()?);
        let v = match self.previous {
            None => raw,
            Some(prev) => prev.wrapping_add(raw),
        };
        self.previous = Some(v);
        Ok(v)
    }
}

#[derive(Debug, Default)]
pub struct DeltaVarintEncoder {
    previous: Option<i64>,
}

impl Encoder for DeltaVarintEncoder {
    fn encode(&mut self, value: &Value, out: &mut Vec<u8>) -> Result<(), PageError> {
        let v = match value {
            Value::Int32(v) => *v as i64,
            Value::Int64(v) => *v,
            other => {
                return Err(PageError::TypeMismatch {
                    expected: DataType::Int64,
                    actual: other.kind().data_type(),
                })
            }
        };
        let raw = match self.previous {
            None => v,
            Some(prev) => v.wrapping_sub(prev),
        };
        write_var_u64(out, zigzag_encode(raw));
        self.previous = Some(v);
        Ok(())
    }
}

// --- Page assembly ---

/// Assembles `[varint timeLen][time stream][value stream]` page bytes and a header whose
/// statistics describe the pushed rows.
#[derive(Debug)]
pub struct PageBuilder {
    data_type: DataType,
    kind: ValueKind,
    time_encoder: Box<dyn Encoder>,
    value_encoder: Box<dyn Encoder>,
    time_bytes: Vec<u8>,
    value_bytes: Vec<u8>,
    count: u64,
    start_time: Timestamp,
    end_time: Timestamp,
    min_value: Option<Value>,
    max_value: Option<Value>,
    /// A NaN was pushed; the page gets no value range.
    unordered: bool,
}

impl PageBuilder {
    pub fn new(
        data_type: DataType,
        time_encoding: TsEncoding,
        value_encoding: TsEncoding,
    ) -> Result<Self, PageError> {
        Ok(Self {
            data_type,
            kind: data_type.require_kind()?,
            time_encoder: time_encoding.encoder(DataType::Int64)?,
            value_encoder: value_encoding.encoder(data_type)?,
            time_bytes: Vec::new(),
            value_bytes: Vec::new(),
            count: 0,
            start_time: 0,
            end_time: 0,
            min_value: None,
            max_value: None,
            unordered: false,
        })
    }

    pub fn push(&mut self, time: Timestamp, value: Value) -> Result<(), PageError> {
        if value.kind() != self.kind {
            return Err(PageError::TypeMismatch {
                expected: self.data_type,
                actual: value.kind().data_type(),
            });
        }
        self.time_encoder
            .encode(&Value::Int64(time), &mut self.time_bytes)?;
        self.value_encoder.encode(&value, &mut self.value_bytes)?;

        if self.count == 0 {
            self.start_time = time;
            self.end_time = time;
        } else {
            self.start_time = self.start_time.min(time);
            self.end_time = self.end_time.max(time);
        }
        self.count += 1;

        if matches!(value, Value::Float(v) if v.is_nan())
            || matches!(value, Value::Double(v) if v.is_nan())
        {
            self.unordered = true;
            self.min_value = None;
            self.max_value = None;
        }
        if self.unordered {
            return Ok(());
        }
        if self
            .min_value
            .as_ref()
            .map_or(true, |m| value.compare(m) == Some(Ordering::Less))
        {
            self.min_value = Some(value.clone());
        }
        if self
            .max_value
            .as_ref()
            .map_or(true, |m| value.compare(m) == Some(Ordering::Greater))
        {
            self.max_value = Some(value);
        }
        Ok(())
    }

    pub fn len(&self) -> u64 {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Returns the uncompressed page bytes and a header describing them.
    pub fn finish(self) -> Result<(Vec<u8>, PageHeader), PageError> {
        let time_len: u32 = self
            .time_bytes
            .len()
            .try_into()
            .map_err(|_| PageError::Internal("Time stream too large".to_string()))?;
        let mut page = Vec::with_capacity(5 + self.time_bytes.len() + self.value_bytes.len());
        write_var_u64(&mut page, time_len as u64);
        page.extend_from_slice(&self.time_bytes);
        page.extend_from_slice(&self.value_bytes);

        let statistics = Statistics {
            count: self.count,
            start_time: self.start_time,
            end_time: self.end_time,
            min_value: self.min_value,
            max_value: self.max_value,
        };
        let header = PageHeader::new(page.len(), page.len(), statistics);
        Ok((page, header))
    }
}
