//! Page reader: decodes one single-column page into `(time, value)` rows, drops rows in
//! deleted time ranges or rejected by the record filter, and emits the survivors either as
//! a [`BatchData`] or, subject to offset/limit pagination, as a [`TsBlock`].
//!
//! Both outputs pull from one row producer. The value kind is resolved once per scan and
//! the decode/filter/write path is monomorphized for it.

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Instant;

use crate::batch::BatchData;
use crate::block::{ColumnBuilder, TsBlock, TsBlockBuilder};
use crate::buffer::{split_page_data, PageBuffer};
use crate::compression::LazyLoadPageData;
use crate::encoding::Decoder;
use crate::error::PageError;
use crate::filter::{self, Filter};
use crate::pagination::PaginationController;
use crate::statistics::{check_single_measurement, PageHeader, Statistics, StatisticsSource};
use crate::telemetry::{noop_event_listener, page_metrics, PageEvent, PageEventListener, ScanOutput};
use crate::tombstone::{DeletionCursor, TimeRange};
use crate::types::{Binary, DataType, Timestamp, ValueKind};

/// Default upper bound on a lazily materialized page (512 MiB).
pub const DEFAULT_MAX_UNCOMPRESSED_PAGE_SIZE: usize = 512 * 1024 * 1024;

/// Configuration options for a [`PageReader`].
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    /// Pages whose header declares a larger uncompressed size are refused before
    /// decompression.
    pub max_uncompressed_page_size: usize,
    /// Structured event hook for observability (no-op by default).
    pub event_listener: Arc<dyn PageEventListener>,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            max_uncompressed_page_size: DEFAULT_MAX_UNCOMPRESSED_PAGE_SIZE,
            event_listener: noop_event_listener(),
        }
    }
}

/// Page bytes, either still compressed or already split into the two streams.
#[derive(Debug)]
enum PageData {
    Unloaded(LazyLoadPageData),
    Loaded {
        time_buffer: PageBuffer,
        value_buffer: PageBuffer,
    },
}

/// Reader over one page of a single measurement.
///
/// Filters, pagination and deletions may be configured before the first scan. Each scan
/// consumes the page streams: scanning the same reader again yields no rows.
///
/// A reader is owned by one caller at a time; it holds no locks.
#[derive(Debug)]
pub struct PageReader {
    page_header: Option<PageHeader>,
    data_type: DataType,
    value_decoder: Box<dyn Decoder>,
    time_decoder: Box<dyn Decoder>,
    data: PageData,
    record_filter: Option<Box<dyn Filter>>,
    pagination: PaginationController,
    deletions: Option<DeletionCursor>,
    config: ReaderConfig,
}

impl PageReader {
    /// Creates a reader over uncompressed page bytes, splitting them immediately.
    pub fn new(
        page_header: Option<PageHeader>,
        page_data: impl Into<Arc<[u8]>>,
        data_type: DataType,
        value_decoder: Box<dyn Decoder>,
        time_decoder: Box<dyn Decoder>,
    ) -> Result<Self, PageError> {
        let (time_buffer, value_buffer) = split_page_data(PageBuffer::new(page_data))?;
        Ok(Self {
            page_header,
            data_type,
            value_decoder,
            time_decoder,
            data: PageData::Loaded {
                time_buffer,
                value_buffer,
            },
            record_filter: None,
            pagination: PaginationController::unlimited(),
            deletions: None,
            config: ReaderConfig::default(),
        })
    }

    /// Creates a reader whose page is decompressed and split on first scan.
    pub fn lazy(
        page_header: PageHeader,
        page_data: LazyLoadPageData,
        data_type: DataType,
        value_decoder: Box<dyn Decoder>,
        time_decoder: Box<dyn Decoder>,
    ) -> Self {
        Self {
            page_header: Some(page_header),
            data_type,
            value_decoder,
            time_decoder,
            data: PageData::Unloaded(page_data),
            record_filter: None,
            pagination: PaginationController::unlimited(),
            deletions: None,
            config: ReaderConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ReaderConfig) -> Self {
        self.config = config;
        self
    }

    /// Builder form of [`PageReader::add_record_filter`].
    pub fn with_record_filter(mut self, filter: Box<dyn Filter>) -> Self {
        self.add_record_filter(filter);
        self
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn page_header(&self) -> Option<&PageHeader> {
        self.page_header.as_ref()
    }

    /// Whether the page streams are available (always true for eagerly split pages).
    pub fn is_loaded(&self) -> bool {
        matches!(self.data, PageData::Loaded { .. })
    }

    /// ANDs `filter` with the current record filter.
    pub fn add_record_filter(&mut self, filter: Box<dyn Filter>) {
        self.record_filter = Some(filter::and(self.record_filter.take(), filter));
    }

    pub fn record_filter(&self) -> Option<&dyn Filter> {
        self.record_filter.as_deref()
    }

    /// Replaces the pagination state used by [`PageReader::all_satisfied_data`].
    pub fn set_limit_offset(&mut self, pagination: PaginationController) {
        self.pagination = pagination;
    }

    pub fn pagination(&self) -> &PaginationController {
        &self.pagination
    }

    /// Sets the deleted intervals, sorted ascending by `max` and non-overlapping.
    /// Resets the deletion cursor.
    pub fn set_delete_interval_list(&mut self, intervals: Vec<TimeRange>) {
        self.deletions = Some(DeletionCursor::new(intervals));
    }

    pub fn delete_interval_list(&self) -> Option<&[TimeRange]> {
        self.deletions.as_ref().map(|d| d.intervals())
    }

    pub fn is_modified(&self) -> bool {
        self.page_header.as_ref().map_or(false, |h| h.is_modified())
    }

    /// Single-column pages never contain nulls.
    pub fn has_null_value(&self, _measurement_index: usize) -> bool {
        false
    }

    /// Output layout is fixed by the page's own data type; nothing to prepare.
    pub fn init_block_builder(&mut self, _data_types: &[DataType]) {}

    /// Whether `time` is inside a deleted interval. Advances the deletion cursor, so
    /// timestamps must be queried in non-decreasing order.
    pub fn is_deleted(&mut self, time: Timestamp) -> bool {
        self.deletions.as_mut().map_or(false, |d| d.is_deleted(time))
    }

    /// Decodes every surviving row into a flipped [`BatchData`]. Pagination is not applied.
    ///
    /// `ascending` selects the batch's read direction; rows are stored in decode order.
    /// The returned batch may be empty. Consumes the page streams.
    pub fn all_satisfied_page_data(&mut self, ascending: bool) -> Result<BatchData, PageError> {
        self.uncompress_data_if_necessary()?;
        let kind = self.data_type.require_kind()?;
        let mut batch = BatchData::new(self.data_type, ascending)?;
        let all_satisfy = self.all_satisfy();

        let (mut rows, _) = self.scan_parts(all_satisfy)?;
        let mut sink = BatchSink { batch: &mut batch };
        drive(kind, &mut rows, &mut sink)?;
        let rows_decoded = rows.rows_decoded;

        self.report_scan(
            ScanOutput::Batch,
            rows_decoded,
            batch.len() as u64,
            all_satisfy,
            false,
        );
        Ok(batch.flip())
    }

    /// Decodes surviving rows into a [`TsBlock`], honoring the current pagination state:
    /// rows first consume the offset, then the limit; the scan stops at the first
    /// surviving row once the limit is exhausted. Consumes the page streams.
    pub fn all_satisfied_data(&mut self) -> Result<TsBlock, PageError> {
        self.uncompress_data_if_necessary()?;
        let kind = self.data_type.require_kind()?;

        let mut expected = self
            .page_header
            .as_ref()
            .and_then(|h| h.statistics())
            .map_or(0, |s| s.count);
        if let Some(limit) = self.pagination.cur_limit() {
            expected = expected.min(limit);
        }
        // Header counts are untrusted; each row takes at least one time-stream byte.
        let page_rows = match &self.data {
            PageData::Loaded { time_buffer, .. } => time_buffer.remaining(),
            PageData::Unloaded(_) => 0,
        };
        let expected = usize::try_from(expected)
            .unwrap_or(usize::MAX)
            .min(page_rows);
        let mut builder = TsBlockBuilder::new(expected, &[self.data_type])?;
        let all_satisfy = self.all_satisfy();

        let (mut rows, pagination) = self.scan_parts(all_satisfy)?;
        let mut sink = BlockSink {
            builder: &mut builder,
            pagination,
            emitted: 0,
        };
        let limit_reached = drive(kind, &mut rows, &mut sink)?;
        let (rows_decoded, rows_emitted) = (rows.rows_decoded, sink.emitted);

        self.report_scan(
            ScanOutput::Block,
            rows_decoded,
            rows_emitted,
            all_satisfy,
            limit_reached,
        );
        builder.build()
    }

    fn all_satisfy(&self) -> bool {
        self.record_filter
            .as_ref()
            .map_or(true, |f| f.all_satisfy(self))
    }

    /// Decompresses and splits a lazily loaded page. No-op once loaded; on failure the
    /// page stays unloaded and the next scan retries.
    fn uncompress_data_if_necessary(&mut self) -> Result<(), PageError> {
        let PageData::Unloaded(lazy) = &self.data else {
            return Ok(());
        };
        let header = self.page_header.as_ref().ok_or_else(|| {
            PageError::Internal("Lazily loaded page has no page header".to_string())
        })?;
        if header.uncompressed_size > self.config.max_uncompressed_page_size {
            return Err(PageError::Corruption {
                details: format!(
                    "Refusing to materialize page of {} bytes (max {})",
                    header.uncompressed_size, self.config.max_uncompressed_page_size
                ),
            });
        }

        let compression = lazy.compression();
        let started = Instant::now();
        let result = lazy
            .uncompress_page_data(header)
            .and_then(|raw| split_page_data(PageBuffer::new(raw)));
        match result {
            Ok((time_buffer, value_buffer)) => {
                page_metrics::record_materialize(started.elapsed(), header.uncompressed_size as u64);
                self.config.event_listener.on_event(PageEvent::PageMaterialized {
                    compression,
                    compressed_size: header.compressed_size,
                    uncompressed_size: header.uncompressed_size,
                });
                self.data = PageData::Loaded {
                    time_buffer,
                    value_buffer,
                };
                Ok(())
            }
            Err(e) => {
                self.config
                    .event_listener
                    .on_event(PageEvent::PageMaterializeFailed {
                        compression,
                        error: e.to_string(),
                    });
                Err(e)
            }
        }
    }

    /// Borrows the loaded streams as a row producer, plus the pagination state.
    fn scan_parts(
        &mut self,
        all_satisfy: bool,
    ) -> Result<(SatisfiedRows<'_>, &mut PaginationController), PageError> {
        let PageData::Loaded {
            time_buffer,
            value_buffer,
        } = &mut self.data
        else {
            return Err(PageError::Internal(
                "Page data accessed before materialization".to_string(),
            ));
        };
        let rows = SatisfiedRows {
            time_decoder: &mut *self.time_decoder,
            value_decoder: &mut *self.value_decoder,
            time_buffer,
            value_buffer,
            deletions: self.deletions.as_mut(),
            filter: self.record_filter.as_deref(),
            all_satisfy,
            rows_decoded: 0,
        };
        Ok((rows, &mut self.pagination))
    }

    fn report_scan(
        &self,
        output: ScanOutput,
        rows_decoded: u64,
        rows_emitted: u64,
        all_satisfy: bool,
        limit_reached: bool,
    ) {
        page_metrics::record_scan(rows_decoded, rows_emitted);
        self.config.event_listener.on_event(PageEvent::PageScanned {
            data_type: self.data_type,
            output,
            rows_decoded,
            rows_emitted,
            all_satisfy,
            limit_reached,
        });
    }
}

impl StatisticsSource for PageReader {
    fn statistics(&self) -> Option<&Statistics> {
        self.page_header.as_ref().and_then(|h| h.statistics())
    }

    fn time_statistics(&self) -> Option<&Statistics> {
        self.statistics()
    }

    fn measurement_statistics(&self, index: usize) -> Result<Option<&Statistics>, PageError> {
        check_single_measurement(index)?;
        Ok(self.statistics())
    }
}

// --- Shared row producer ---

/// Pulls decoded rows that are neither deleted nor rejected by the filter.
struct SatisfiedRows<'a> {
    time_decoder: &'a mut dyn Decoder,
    value_decoder: &'a mut dyn Decoder,
    time_buffer: &'a mut PageBuffer,
    value_buffer: &'a mut PageBuffer,
    deletions: Option<&'a mut DeletionCursor>,
    filter: Option<&'a dyn Filter>,
    all_satisfy: bool,
    rows_decoded: u64,
}

impl SatisfiedRows<'_> {
    #[inline]
    fn next_row<V: PageValue>(&mut self) -> Result<Option<(Timestamp, V)>, PageError> {
        while self.time_decoder.has_next(self.time_buffer)? {
            let time = self.time_decoder.read_long(self.time_buffer)?;
            // The value is always decoded to keep both streams aligned.
            let value = V::decode(self.value_decoder, self.value_buffer)?;
            self.rows_decoded += 1;

            if let Some(deletions) = self.deletions.as_mut() {
                if deletions.is_deleted(time) {
                    continue;
                }
            }
            let accepted = self.all_satisfy
                || self
                    .filter
                    .map_or(true, |f| V::satisfy(f, time, &value));
            if accepted {
                return Ok(Some((time, value)));
            }
        }
        Ok(None)
    }
}

/// Runs the producer into `sink` with the path for `kind`. Returns true if the sink
/// stopped the scan early.
fn drive<S: RowSink>(
    kind: ValueKind,
    rows: &mut SatisfiedRows<'_>,
    sink: &mut S,
) -> Result<bool, PageError> {
    match kind {
        ValueKind::Boolean => drain::<bool, S>(rows, sink),
        ValueKind::Int32 => drain::<i32, S>(rows, sink),
        ValueKind::Int64 => drain::<i64, S>(rows, sink),
        ValueKind::Float => drain::<f32, S>(rows, sink),
        ValueKind::Double => drain::<f64, S>(rows, sink),
        ValueKind::Binary => drain::<Binary, S>(rows, sink),
    }
}

fn drain<V: PageValue, S: RowSink>(
    rows: &mut SatisfiedRows<'_>,
    sink: &mut S,
) -> Result<bool, PageError> {
    while let Some((time, value)) = rows.next_row::<V>()? {
        if sink.accept(time, value)?.is_break() {
            return Ok(true);
        }
    }
    Ok(false)
}

// --- Per-kind decode/filter/write ---

trait PageValue: Sized {
    fn decode(decoder: &mut dyn Decoder, buffer: &mut PageBuffer) -> Result<Self, PageError>;

    fn satisfy(filter: &dyn Filter, time: Timestamp, value: &Self) -> bool;

    fn put(batch: &mut BatchData, time: Timestamp, value: Self) -> Result<(), PageError>;

    fn write(column: &mut ColumnBuilder, value: Self) -> Result<(), PageError>;
}

macro_rules! copy_page_value {
    ($ty:ty, $read:ident, $satisfy:ident, $put:ident, $write:ident) => {
        impl PageValue for $ty {
            #[inline]
            fn decode(decoder: &mut dyn Decoder, buffer: &mut PageBuffer) -> Result<Self, PageError> {
                decoder.$read(buffer)
            }

            #[inline]
            fn satisfy(filter: &dyn Filter, time: Timestamp, value: &Self) -> bool {
                filter.$satisfy(time, *value)
            }

            #[inline]
            fn put(batch: &mut BatchData, time: Timestamp, value: Self) -> Result<(), PageError> {
                batch.$put(time, value)
            }

            #[inline]
            fn write(column: &mut ColumnBuilder, value: Self) -> Result<(), PageError> {
                column.$write(value)
            }
        }
    };
}

copy_page_value!(bool, read_boolean, satisfy_boolean, put_boolean, write_boolean);
copy_page_value!(i32, read_int, satisfy_integer, put_int, write_int);
copy_page_value!(i64, read_long, satisfy_long, put_long, write_long);
copy_page_value!(f32, read_float, satisfy_float, put_float, write_float);
copy_page_value!(f64, read_double, satisfy_double, put_double, write_double);

impl PageValue for Binary {
    #[inline]
    fn decode(decoder: &mut dyn Decoder, buffer: &mut PageBuffer) -> Result<Self, PageError> {
        decoder.read_binary(buffer)
    }

    #[inline]
    fn satisfy(filter: &dyn Filter, time: Timestamp, value: &Self) -> bool {
        filter.satisfy_binary(time, value)
    }

    #[inline]
    fn put(batch: &mut BatchData, time: Timestamp, value: Self) -> Result<(), PageError> {
        batch.put_binary(time, value)
    }

    #[inline]
    fn write(column: &mut ColumnBuilder, value: Self) -> Result<(), PageError> {
        column.write_binary(value)
    }
}

// --- Sinks ---

trait RowSink {
    fn accept<V: PageValue>(
        &mut self,
        time: Timestamp,
        value: V,
    ) -> Result<ControlFlow<()>, PageError>;
}

/// Appends every row; never stops early.
struct BatchSink<'a> {
    batch: &'a mut BatchData,
}

impl RowSink for BatchSink<'_> {
    #[inline]
    fn accept<V: PageValue>(
        &mut self,
        time: Timestamp,
        value: V,
    ) -> Result<ControlFlow<()>, PageError> {
        V::put(self.batch, time, value)?;
        Ok(ControlFlow::Continue(()))
    }
}

/// Skips rows while offset remains, writes rows while limit remains, then stops.
struct BlockSink<'a> {
    builder: &'a mut TsBlockBuilder,
    pagination: &'a mut PaginationController,
    emitted: u64,
}

impl RowSink for BlockSink<'_> {
    #[inline]
    fn accept<V: PageValue>(
        &mut self,
        time: Timestamp,
        value: V,
    ) -> Result<ControlFlow<()>, PageError> {
        if self.pagination.has_cur_offset() {
            self.pagination.consume_offset();
            return Ok(ControlFlow::Continue(()));
        }
        if !self.pagination.has_cur_limit() {
            return Ok(ControlFlow::Break(()));
        }
        self.builder.time_column_builder().write_long(time);
        V::write(self.builder.column_builder(0)?, value)?;
        self.builder.declare_position();
        self.pagination.consume_limit();
        self.emitted += 1;
        Ok(ControlFlow::Continue(()))
    }
}
