//! Standalone page container file: one page plus everything needed to decode it.
//!
//! Layout (little-endian): magic[8], version u32, header_len u32, bincode
//! [`PageFileHeader`], page_len u64, crc32 u32 over the stored page bytes, page bytes.

use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use crc32fast::Hasher as Crc32;
use serde::{Deserialize, Serialize};

use crate::compression::{LazyLoadPageData, PageCompression};
use crate::encoding::TsEncoding;
use crate::error::PageError;
use crate::reader::PageReader;
use crate::statistics::PageHeader;
use crate::types::DataType;

pub const PAGE_FILE_MAGIC: &[u8; 8] = b"TSPAGE01";
const PAGE_FILE_VERSION: u32 = 1;

/// Refuse header blobs larger than this when reading.
const MAX_HEADER_LEN: usize = 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageFileHeader {
    pub data_type: DataType,
    pub time_encoding: TsEncoding,
    pub value_encoding: TsEncoding,
    pub compression: PageCompression,
    pub page_header: PageHeader,
}

/// A page file loaded into memory.
#[derive(Debug, Clone)]
pub struct PageFile {
    pub header: PageFileHeader,
    /// Page bytes as stored (compressed unless `compression` is uncompressed).
    pub page_bytes: Vec<u8>,
}

impl PageFile {
    /// Builds a reader for this page. Compressed pages are materialized lazily.
    pub fn into_reader(self) -> Result<PageReader, PageError> {
        let h = self.header;
        let value_decoder = h.value_encoding.decoder(h.data_type)?;
        let time_decoder = h.time_encoding.decoder(DataType::Int64)?;
        match h.compression {
            PageCompression::Uncompressed => PageReader::new(
                Some(h.page_header),
                self.page_bytes,
                h.data_type,
                value_decoder,
                time_decoder,
            ),
            compression => Ok(PageReader::lazy(
                h.page_header,
                LazyLoadPageData::new(self.page_bytes, 0, compression.decompressor()),
                h.data_type,
                value_decoder,
                time_decoder,
            )),
        }
    }
}

/// Writes a page file atomically (temp file, fsync, rename).
pub fn write_page_file<P: AsRef<Path>>(
    path: P,
    header: &PageFileHeader,
    page_bytes: &[u8],
) -> Result<(), PageError> {
    let path = path.as_ref();
    let header_bytes = bincode::serialize(header)?;
    let header_len: u32 = header_bytes
        .len()
        .try_into()
        .map_err(|_| PageError::Internal("Page file header too large".to_string()))?;

    let mut hasher = Crc32::new();
    hasher.update(page_bytes);
    let crc = hasher.finalize();

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "page".to_string());
    let tmp_path = path.with_file_name(format!(".tmp_{}", file_name));

    let written = write_framed(&tmp_path, &header_bytes, header_len, crc, page_bytes)
        .and_then(|()| fs::rename(&tmp_path, path).map_err(PageError::from));
    if written.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    written
}

fn write_framed(
    tmp_path: &Path,
    header_bytes: &[u8],
    header_len: u32,
    crc: u32,
    page_bytes: &[u8],
) -> Result<(), PageError> {
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(tmp_path)?;
    let mut w = BufWriter::new(file);
    w.write_all(PAGE_FILE_MAGIC)?;
    w.write_all(&PAGE_FILE_VERSION.to_le_bytes())?;
    w.write_all(&header_len.to_le_bytes())?;
    w.write_all(header_bytes)?;
    w.write_all(&(page_bytes.len() as u64).to_le_bytes())?;
    w.write_all(&crc.to_le_bytes())?;
    w.write_all(page_bytes)?;
    w.flush()?;
    w.get_ref().sync_data()?;
    Ok(())
}

/// Reads and verifies a page file.
pub fn read_page_file<P: AsRef<Path>>(path: P) -> Result<PageFile, PageError> {
    let path = path.as_ref();
    let mut reader = BufReader::new(File::open(path)?);

    let mut magic = [0u8; 8];
    reader.read_exact(&mut magic)?;
    if &magic != PAGE_FILE_MAGIC {
        return Err(PageError::Corruption {
            details: format!("Bad page file magic in {:?}", path),
        });
    }
    let mut b4 = [0u8; 4];
    reader.read_exact(&mut b4)?;
    let version = u32::from_le_bytes(b4);
    if version != PAGE_FILE_VERSION {
        return Err(PageError::Corruption {
            details: format!("Unsupported page file version {} in {:?}", version, path),
        });
    }
    reader.read_exact(&mut b4)?;
    let header_len = u32::from_le_bytes(b4) as usize;
    if header_len > MAX_HEADER_LEN {
        return Err(PageError::Corruption {
            details: format!("Oversized page file header ({} bytes) in {:?}", header_len, path),
        });
    }
    let mut header_bytes = vec![0u8; header_len];
    reader.read_exact(&mut header_bytes)?;
    let header: PageFileHeader = bincode::deserialize(&header_bytes)?;

    let mut b8 = [0u8; 8];
    reader.read_exact(&mut b8)?;
    let page_len = u64::from_le_bytes(b8) as usize;
    reader.read_exact(&mut b4)?;
    let expected_crc = u32::from_le_bytes(b4);

    let mut page_bytes = Vec::new();
    reader.read_to_end(&mut page_bytes)?;
    if page_bytes.len() != page_len {
        return Err(PageError::Corruption {
            details: format!(
                "Truncated page in {:?}: expected {} bytes, found {}",
                path,
                page_len,
                page_bytes.len()
            ),
        });
    }
    let mut hasher = Crc32::new();
    hasher.update(&page_bytes);
    if hasher.finalize() != expected_crc {
        return Err(PageError::Corruption {
            details: format!("Page CRC mismatch in {:?}", path),
        });
    }

    Ok(PageFile { header, page_bytes })
}
