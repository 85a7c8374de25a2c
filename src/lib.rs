#![doc = include_str!("../README.md")]
// Declare modules
pub mod batch;
pub mod block;
pub mod buffer;
pub mod compression;
pub mod encoding;
pub mod error;
pub mod filter;
pub mod page_file;
pub mod pagination;
pub mod reader;
pub mod statistics;
pub mod telemetry;
pub mod tombstone;
pub mod types;

/// Legacy row container produced by the batch scan.
pub use crate::batch::BatchData;
/// Columnar output produced by the paginated scan.
pub use crate::block::{Column, TsBlock, TsBlockBuilder};
/// Compression codecs and the lazily materialized page body.
pub use crate::compression::{LazyLoadPageData, PageCompression, PageDecompressor};
/// Stream decoders and the fixture page builder.
pub use crate::encoding::{Decoder, PageBuilder, TsEncoding};
/// Error type for page operations.
pub use crate::error::PageError;
/// Record filters.
pub use crate::filter::{CompareOp, Filter, TimeFilter, ValueFilter};
/// Standalone page files.
pub use crate::page_file::{read_page_file, write_page_file, PageFile, PageFileHeader};
/// Offset/limit state shared with the caller.
pub use crate::pagination::PaginationController;
/// Main entry point: decodes one page into filtered rows.
pub use crate::reader::{PageReader, ReaderConfig};
/// Page header and statistics.
pub use crate::statistics::{PageHeader, Statistics, StatisticsSource};
/// Structured event hook for observability.
pub use crate::telemetry::{PageEvent, PageEventListener};
/// Deleted time ranges.
pub use crate::tombstone::TimeRange;
/// Logical data types and runtime values.
pub use crate::types::{Binary, DataType, Timestamp, Value, ValueKind};
