//! Page decompression and deferred (lazy) page materialization.

use std::fmt;
use std::io;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::PageError;
use crate::statistics::PageHeader;

/// Per-page compression. Serde: upper-case string (e.g. `"LZ4"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PageCompression {
    #[default]
    Uncompressed,
    /// LZ4 block format without a size prefix; the size comes from the page header.
    Lz4,
    /// Zstandard single frame.
    Zstd,
}

impl PageCompression {
    pub fn decompressor(self) -> Arc<dyn PageDecompressor> {
        match self {
            PageCompression::Uncompressed => Arc::new(NoDecompressor),
            PageCompression::Lz4 => Arc::new(Lz4Decompressor),
            PageCompression::Zstd => Arc::new(ZstdDecompressor),
        }
    }
}

impl fmt::Display for PageCompression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageCompression::Uncompressed => f.write_str("UNCOMPRESSED"),
            PageCompression::Lz4 => f.write_str("LZ4"),
            PageCompression::Zstd => f.write_str("ZSTD"),
        }
    }
}

/// Turns stored page bytes back into `[varint timeLen][time][value]` bytes.
pub trait PageDecompressor: fmt::Debug + Send + Sync {
    fn compression(&self) -> PageCompression;

    /// Decompresses `compressed` into exactly `uncompressed_size` bytes.
    fn uncompress(&self, compressed: &[u8], uncompressed_size: usize) -> io::Result<Vec<u8>>;
}

#[derive(Debug)]
pub struct NoDecompressor;

impl PageDecompressor for NoDecompressor {
    fn compression(&self) -> PageCompression {
        PageCompression::Uncompressed
    }

    fn uncompress(&self, compressed: &[u8], _uncompressed_size: usize) -> io::Result<Vec<u8>> {
        Ok(compressed.to_vec())
    }
}

#[derive(Debug)]
pub struct Lz4Decompressor;

impl PageDecompressor for Lz4Decompressor {
    fn compression(&self) -> PageCompression {
        PageCompression::Lz4
    }

    fn uncompress(&self, compressed: &[u8], uncompressed_size: usize) -> io::Result<Vec<u8>> {
        lz4_flex::block::decompress(compressed, uncompressed_size).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("LZ4 decompress failed: {}", e),
            )
        })
    }
}

#[derive(Debug)]
pub struct ZstdDecompressor;

impl PageDecompressor for ZstdDecompressor {
    fn compression(&self) -> PageCompression {
        PageCompression::Zstd
    }

    fn uncompress(&self, compressed: &[u8], uncompressed_size: usize) -> io::Result<Vec<u8>> {
        zstd::bulk::decompress(compressed, uncompressed_size).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Zstd decompress failed: {}", e),
            )
        })
    }
}

/// Compresses uncompressed page bytes. Used to produce fixtures and page files.
pub fn compress(compression: PageCompression, page: &[u8]) -> Result<Vec<u8>, PageError> {
    match compression {
        PageCompression::Uncompressed => Ok(page.to_vec()),
        PageCompression::Lz4 => Ok(lz4_flex::block::compress(page)),
        PageCompression::Zstd => zstd::bulk::compress(page, 3)
            .map_err(|e| PageError::Internal(format!("Zstd compress failed: {}", e))),
    }
}

/// Handle to a still-compressed page inside a larger chunk buffer.
///
/// The page occupies `compressed_size` bytes (from the page header) starting at `offset`.
#[derive(Debug, Clone)]
pub struct LazyLoadPageData {
    chunk_data: Arc<[u8]>,
    offset: usize,
    decompressor: Arc<dyn PageDecompressor>,
}

impl LazyLoadPageData {
    pub fn new(
        chunk_data: impl Into<Arc<[u8]>>,
        offset: usize,
        decompressor: Arc<dyn PageDecompressor>,
    ) -> Self {
        Self {
            chunk_data: chunk_data.into(),
            offset,
            decompressor,
        }
    }

    pub fn compression(&self) -> PageCompression {
        self.decompressor.compression()
    }

    /// Decompresses the page described by `header`.
    ///
    /// Range and size violations are reported as `InvalidData` I/O errors so that all
    /// materialization failures surface as one error kind.
    pub fn uncompress_page_data(&self, header: &PageHeader) -> Result<Vec<u8>, PageError> {
        let end = self
            .offset
            .checked_add(header.compressed_size)
            .filter(|end| *end <= self.chunk_data.len())
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!(
                        "Compressed page [{}, +{}) exceeds chunk of {} bytes",
                        self.offset,
                        header.compressed_size,
                        self.chunk_data.len()
                    ),
                )
            })?;
        let compressed = &self.chunk_data[self.offset..end];
        let page = self
            .decompressor
            .uncompress(compressed, header.uncompressed_size)?;
        if page.len() != header.uncompressed_size {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "Decompressed page is {} bytes, header declares {}",
                    page.len(),
                    header.uncompressed_size
                ),
            )
            .into());
        }
        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statistics::Statistics;

    fn header_for(raw: &[u8], stored: &[u8]) -> PageHeader {
        PageHeader::new(raw.len(), stored.len(), Statistics::new(0, 0, 0))
    }

    #[test]
    fn lz4_and_zstd_materialize_from_chunk_offset() {
        let raw: Vec<u8> = (0..2048u32).map(|i| (i % 7) as u8).collect();
        for compression in [
            PageCompression::Uncompressed,
            PageCompression::Lz4,
            PageCompression::Zstd,
        ] {
            let stored = compress(compression, &raw).unwrap();
            let mut chunk = vec![0xAAu8; 13];
            chunk.extend_from_slice(&stored);
            chunk.extend_from_slice(&[0xBB; 5]);

            let lazy = LazyLoadPageData::new(chunk, 13, compression.decompressor());
            assert_eq!(lazy.compression(), compression);
            let page = lazy.uncompress_page_data(&header_for(&raw, &stored)).unwrap();
            assert_eq!(page, raw, "{}", compression);
        }
    }

    #[test]
    fn out_of_range_page_is_io_error() {
        let lazy = LazyLoadPageData::new(vec![0u8; 4], 2, PageCompression::Uncompressed.decompressor());
        let header = PageHeader::new(8, 8, Statistics::new(0, 0, 0));
        let err = lazy.uncompress_page_data(&header).unwrap_err();
        assert!(matches!(err, PageError::Io(ref e) if e.kind() == io::ErrorKind::InvalidData));
    }

    #[test]
    fn corrupt_lz4_is_io_error() {
        let raw = vec![1u8; 64];
        let mut stored = compress(PageCompression::Lz4, &raw).unwrap();
        stored.truncate(stored.len() / 2);
        let lazy = LazyLoadPageData::new(stored.clone(), 0, PageCompression::Lz4.decompressor());
        let err = lazy.uncompress_page_data(&header_for(&raw, &stored)).unwrap_err();
        assert!(matches!(err, PageError::Io(_)), "got {err:?}");
    }

    #[test]
    fn size_mismatch_is_rejected() {
        let raw = vec![3u8; 10];
        let lazy = LazyLoadPageData::new(raw.clone(), 0, PageCompression::Uncompressed.decompressor());
        let header = PageHeader::new(11, 10, Statistics::new(0, 0, 0));
        assert!(matches!(lazy.uncompress_page_data(&header), Err(PageError::Io(_))));
    }
}
