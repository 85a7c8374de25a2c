//! Forward-only byte views over page data and the time/value splitter.

use std::sync::Arc;

use crate::error::PageError;

/// A read-once view over a region of shared page bytes.
///
/// The view is bounded to `[position, limit)` and only ever moves forward. Cloning the
/// underlying bytes is avoided: sub-views share the same `Arc<[u8]>`.
#[derive(Debug, Clone)]
pub struct PageBuffer {
    data: Arc<[u8]>,
    position: usize,
    limit: usize,
}

impl PageBuffer {
    /// Creates a view over all of `data`.
    pub fn new(data: impl Into<Arc<[u8]>>) -> Self {
        let data = data.into();
        let limit = data.len();
        Self {
            data,
            position: 0,
            limit,
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Number of unread bytes.
    pub fn remaining(&self) -> usize {
        self.limit - self.position
    }

    pub fn has_remaining(&self) -> bool {
        self.position < self.limit
    }

    /// Consumes and returns the next `len` bytes.
    pub fn read_bytes(&mut self, len: usize) -> Result<&[u8], PageError> {
        if len > self.remaining() {
            return Err(PageError::Decode(format!(
                "Truncated page stream: wanted {} bytes at offset {}, {} remaining",
                len,
                self.position,
                self.remaining()
            )));
        }
        let start = self.position;
        self.position += len;
        Ok(&self.data[start..self.position])
    }

    pub fn read_u8(&mut self) -> Result<u8, PageError> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], PageError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    /// Reads an unsigned LEB128 varint that must fit in `u32`.
    pub fn read_unsigned_var_int(&mut self) -> Result<u32, PageError> {
        let v = self.read_var_u64()?;
        if v > u32::MAX as u64 {
            return Err(PageError::Decode("Varint does not fit in u32".to_string()));
        }
        Ok(v as u32)
    }

    /// Reads an unsigned LEB128 varint of up to 10 bytes.
    pub fn read_var_u64(&mut self) -> Result<u64, PageError> {
        let mut out: u64 = 0;
        let mut shift: u32 = 0;
        for _ in 0..10 {
            let byte = self
                .read_u8()
                .map_err(|_| PageError::Decode("Truncated varint".to_string()))?;
            out |= ((byte & 0x7F) as u64) << shift;
            if (byte & 0x80) == 0 {
                return Ok(out);
            }
            shift = shift.saturating_add(7);
        }
        Err(PageError::Decode("Varint too long".to_string()))
    }

    /// Returns a view over the next `len` bytes without consuming them from `self`.
    fn slice(&self, len: usize) -> PageBuffer {
        PageBuffer {
            data: Arc::clone(&self.data),
            position: self.position,
            limit: self.position + len,
        }
    }
}

/// Splits uncompressed page bytes `[varint timeLen][time stream][value stream]` into a
/// time view and a value view.
pub fn split_page_data(page_data: PageBuffer) -> Result<(PageBuffer, PageBuffer), PageError> {
    let mut page_data = page_data;
    let time_len = page_data.read_unsigned_var_int()? as usize;
    if time_len > page_data.remaining() {
        return Err(PageError::Decode(format!(
            "Time stream length {} exceeds page size {}",
            time_len,
            page_data.remaining()
        )));
    }
    let time_buffer = page_data.slice(time_len);
    let mut value_buffer = page_data;
    value_buffer.position += time_len;
    Ok((time_buffer, value_buffer))
}

pub fn write_var_u64(buf: &mut Vec<u8>, mut v: u64) {
    while v >= 0x80 {
        buf.push((v as u8) | 0x80);
        v >>= 7;
    }
    buf.push(v as u8);
}

pub fn write_unsigned_var_int(buf: &mut Vec<u8>, v: u32) {
    write_var_u64(buf, v as u64);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(time: &[u8], value: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        write_unsigned_var_int(&mut out, time.len() as u32);
        out.extend_from_slice(time);
        out.extend_from_slice(value);
        out
    }

    #[test]
    fn split_bounds_time_and_value_views() {
        let bytes = page(&[1, 2, 3], &[9, 8]);
        let (mut time, mut value) = split_page_data(PageBuffer::new(bytes)).unwrap();
        assert_eq!(time.remaining(), 3);
        assert_eq!(value.remaining(), 2);
        assert_eq!(time.read_bytes(3).unwrap(), &[1, 2, 3]);
        assert!(!time.has_remaining());
        assert_eq!(value.read_bytes(2).unwrap(), &[9, 8]);
    }

    #[test]
    fn split_handles_multi_byte_length_prefix() {
        let time = vec![7u8; 300];
        let bytes = page(&time, &[1]);
        assert_eq!(bytes.len(), 2 + 300 + 1);
        let (time_view, value_view) = split_page_data(PageBuffer::new(bytes)).unwrap();
        assert_eq!(time_view.remaining(), 300);
        assert_eq!(value_view.remaining(), 1);
    }

    #[test]
    fn split_rejects_oversized_length_prefix() {
        let mut bytes = Vec::new();
        write_unsigned_var_int(&mut bytes, 10);
        bytes.extend_from_slice(&[0, 1, 2]);
        let err = split_page_data(PageBuffer::new(bytes)).unwrap_err();
        assert!(matches!(err, PageError::Decode(_)), "got {err:?}");
    }

    #[test]
    fn split_rejects_empty_page() {
        let err = split_page_data(PageBuffer::new(Vec::new())).unwrap_err();
        assert!(matches!(err, PageError::Decode(_)));
    }

    #[test]
    fn read_past_limit_is_a_decode_error() {
        let (mut time, _) = split_page_data(PageBuffer::new(page(&[1], &[2, 3, 4]))).unwrap();
        time.read_u8().unwrap();
        assert!(matches!(time.read_u8(), Err(PageError::Decode(_))));
    }

    #[test]
    fn varint_rejects_overlong_encoding() {
        let mut buf = PageBuffer::new(vec![0xFFu8; 11]);
        assert!(matches!(buf.read_var_u64(), Err(PageError::Decode(_))));
    }
}
