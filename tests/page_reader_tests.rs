use std::sync::Arc;

use tspage::compression::compress;
use tspage::filter::{OrFilter, TimeFilter};
use tspage::telemetry::{PageEvent, PageEventListener};
use tspage::{
    Binary, CompareOp, DataType, Filter, LazyLoadPageData, PageBuilder, PageCompression,
    PageError, PageHeader, PageReader, PaginationController, ReaderConfig, StatisticsSource,
    TimeRange, Timestamp, TsEncoding, Value, ValueFilter,
};

fn build_page(
    data_type: DataType,
    value_encoding: TsEncoding,
    rows: &[(Timestamp, Value)],
) -> (Vec<u8>, PageHeader) {
    let mut b = PageBuilder::new(data_type, TsEncoding::DeltaVarint, value_encoding).unwrap();
    for (t, v) in rows {
        b.push(*t, v.clone()).unwrap();
    }
    b.finish().unwrap()
}

fn open(
    bytes: Vec<u8>,
    header: PageHeader,
    data_type: DataType,
    value_encoding: TsEncoding,
) -> PageReader {
    PageReader::new(
        Some(header),
        bytes,
        data_type,
        value_encoding.decoder(data_type).unwrap(),
        TsEncoding::DeltaVarint.decoder(DataType::Int64).unwrap(),
    )
    .unwrap()
}

fn three_int32_rows() -> (Vec<u8>, PageHeader) {
    build_page(
        DataType::Int32,
        TsEncoding::Plain,
        &[
            (10, Value::Int32(1)),
            (20, Value::Int32(2)),
            (30, Value::Int32(3)),
        ],
    )
}

#[test]
fn deleted_point_is_excluded() {
    let (bytes, header) = three_int32_rows();
    let mut r = open(bytes, header, DataType::Int32, TsEncoding::Plain);
    r.set_delete_interval_list(vec![TimeRange::new(20, 20)]);

    let block = r.all_satisfied_data().unwrap();
    assert_eq!(block.position_count(), 2);
    assert_eq!(
        block.rows(0),
        vec![(10, Value::Int32(1)), (30, Value::Int32(3))]
    );
}

#[test]
fn limit_one_stops_after_first_accepted_row() {
    let (bytes, header) = three_int32_rows();
    let mut r = open(bytes, header, DataType::Int32, TsEncoding::Plain)
        .with_record_filter(Box::new(ValueFilter::gt(Value::Int32(1))));
    r.set_limit_offset(PaginationController::new(0, Some(1)));

    let block = r.all_satisfied_data().unwrap();
    assert_eq!(block.rows(0), vec![(20, Value::Int32(2))]);
    assert_eq!(r.pagination().cur_limit(), Some(0));
}

#[test]
fn second_scan_of_same_page_yields_nothing() {
    // Page streams are consumed by a scan; re-reading requires fresh page bytes.
    let (bytes, header) = three_int32_rows();
    let mut r = open(bytes.clone(), header.clone(), DataType::Int32, TsEncoding::Plain);
    assert_eq!(r.all_satisfied_data().unwrap().position_count(), 3);
    assert!(r.all_satisfied_data().unwrap().is_empty());
    assert!(r.all_satisfied_page_data(true).unwrap().is_empty());

    let mut fresh = open(bytes, header, DataType::Int32, TsEncoding::Plain);
    assert_eq!(fresh.all_satisfied_page_data(true).unwrap().len(), 3);
}

/// Claims every page satisfies it but rejects every row.
#[derive(Debug)]
struct LyingFilter;

impl Filter for LyingFilter {
    fn all_satisfy(&self, _source: &dyn StatisticsSource) -> bool {
        true
    }
    fn satisfy_boolean(&self, _time: Timestamp, _value: bool) -> bool {
        false
    }
    fn satisfy_integer(&self, _time: Timestamp, _value: i32) -> bool {
        false
    }
    fn satisfy_long(&self, _time: Timestamp, _value: i64) -> bool {
        false
    }
    fn satisfy_float(&self, _time: Timestamp, _value: f32) -> bool {
        false
    }
    fn satisfy_double(&self, _time: Timestamp, _value: f64) -> bool {
        false
    }
    fn satisfy_binary(&self, _time: Timestamp, _value: &Binary) -> bool {
        false
    }
}

#[test]
fn inconsistent_filter_admits_rows_its_predicate_rejects() {
    // The reader trusts `all_satisfy`; a filter that lies about it gets every row.
    let (bytes, header) = three_int32_rows();
    let mut r = open(bytes.clone(), header.clone(), DataType::Int32, TsEncoding::Plain)
        .with_record_filter(Box::new(LyingFilter));
    assert_eq!(r.all_satisfied_data().unwrap().position_count(), 3);

    // Tombstones still apply on the fast-accept path.
    let mut r = open(bytes, header, DataType::Int32, TsEncoding::Plain)
        .with_record_filter(Box::new(LyingFilter));
    r.set_delete_interval_list(vec![TimeRange::new(10, 10)]);
    assert_eq!(r.all_satisfied_page_data(true).unwrap().len(), 2);
}

#[test]
fn batch_output_ignores_pagination() {
    let (bytes, header) = three_int32_rows();
    let mut r = open(bytes, header, DataType::Int32, TsEncoding::Plain);
    r.set_limit_offset(PaginationController::new(1, Some(1)));
    let batch = r.all_satisfied_page_data(true).unwrap();
    assert_eq!(batch.len(), 3);
    assert_eq!(r.pagination().cur_offset(), 1);
    assert_eq!(r.pagination().cur_limit(), Some(1));
}

#[test]
fn offset_past_end_and_zero_limit_give_empty_blocks() {
    let (bytes, header) = three_int32_rows();
    let mut r = open(bytes.clone(), header.clone(), DataType::Int32, TsEncoding::Plain);
    r.set_limit_offset(PaginationController::new(5, None));
    assert!(r.all_satisfied_data().unwrap().is_empty());
    assert_eq!(r.pagination().cur_offset(), 2);

    let mut r = open(bytes, header, DataType::Int32, TsEncoding::Plain);
    r.set_limit_offset(PaginationController::new(0, Some(0)));
    assert!(r.all_satisfied_data().unwrap().is_empty());
}

#[test]
fn pagination_carries_over_between_pages() {
    let (bytes, header) = three_int32_rows();
    let mut first = open(bytes.clone(), header.clone(), DataType::Int32, TsEncoding::Plain);
    first.set_limit_offset(PaginationController::new(2, Some(2)));
    assert_eq!(first.all_satisfied_data().unwrap().rows(0), vec![(30, Value::Int32(3))]);

    let remaining = *first.pagination();
    assert_eq!(remaining.cur_offset(), 0);
    assert_eq!(remaining.cur_limit(), Some(1));

    let mut second = open(bytes, header, DataType::Int32, TsEncoding::Plain);
    second.set_limit_offset(remaining);
    assert_eq!(second.all_satisfied_data().unwrap().rows(0), vec![(10, Value::Int32(1))]);
}

#[test]
fn descending_batch_reads_back_to_front() {
    let (bytes, header) = build_page(
        DataType::Double,
        TsEncoding::Plain,
        &[
            (30, Value::Double(3.5)),
            (20, Value::Double(2.5)),
            (10, Value::Double(1.5)),
        ],
    );
    let mut r = open(bytes, header, DataType::Double, TsEncoding::Plain);
    let mut batch = r.all_satisfied_page_data(false).unwrap();
    assert!(!batch.is_ascending());
    assert_eq!(batch.rows()[0], (30, Value::Double(3.5)));
    assert_eq!(batch.current_time(), Some(10));
    batch.next();
    assert_eq!(batch.current_value(), Some(Value::Double(2.5)));
}

#[test]
fn descending_page_misses_deletions_behind_the_cursor() {
    // The deletion cursor only moves forward; descending timestamps defeat it.
    let (bytes, header) = build_page(
        DataType::Int64,
        TsEncoding::DeltaVarint,
        &[(30, Value::Int64(3)), (20, Value::Int64(2)), (10, Value::Int64(1))],
    );
    let mut r = open(bytes, header, DataType::Int64, TsEncoding::DeltaVarint);
    r.set_delete_interval_list(vec![TimeRange::new(10, 10), TimeRange::new(30, 30)]);
    let batch = r.all_satisfied_page_data(false).unwrap();
    let times: Vec<Timestamp> = batch.rows().iter().map(|(t, _)| *t).collect();
    assert_eq!(times, vec![20, 10]);
}

#[test]
fn every_supported_type_decodes() {
    let cases: Vec<(DataType, TsEncoding, Vec<Value>)> = vec![
        (
            DataType::Boolean,
            TsEncoding::Plain,
            vec![Value::Boolean(true), Value::Boolean(false)],
        ),
        (
            DataType::Date,
            TsEncoding::DeltaVarint,
            vec![Value::Int32(19_000), Value::Int32(19_001)],
        ),
        (
            DataType::Timestamp,
            TsEncoding::DeltaVarint,
            vec![Value::Int64(-5), Value::Int64(i64::MAX)],
        ),
        (
            DataType::Float,
            TsEncoding::Plain,
            vec![Value::Float(0.25), Value::Float(-8.0)],
        ),
        (
            DataType::String,
            TsEncoding::Plain,
            vec![Value::Binary(Binary::from("a")), Value::Binary(Binary::from(""))],
        ),
        (
            DataType::Blob,
            TsEncoding::Plain,
            vec![Value::Binary(Binary::new(vec![0u8, 255, 7]))],
        ),
    ];

    for (data_type, encoding, values) in cases {
        let rows: Vec<(Timestamp, Value)> = values
            .into_iter()
            .enumerate()
            .map(|(i, v)| (i as Timestamp * 7, v))
            .collect();
        let (bytes, header) = build_page(data_type, encoding, &rows);
        let mut r = open(bytes.clone(), header.clone(), data_type, encoding);
        assert_eq!(r.all_satisfied_data().unwrap().rows(0), rows, "{}", data_type);
        let mut r = open(bytes, header, data_type, encoding);
        assert_eq!(r.all_satisfied_page_data(true).unwrap().rows(), rows, "{}", data_type);
    }
}

#[test]
fn unsupported_types_error_even_when_empty() {
    let (bytes, header) = build_page(DataType::Int32, TsEncoding::Plain, &[]);
    for data_type in [DataType::Vector, DataType::Unknown] {
        let mut r = PageReader::new(
            Some(header.clone()),
            bytes.clone(),
            data_type,
            Box::new(tspage::encoding::PlainDecoder::new()),
            TsEncoding::DeltaVarint.decoder(DataType::Int64).unwrap(),
        )
        .unwrap();
        assert!(matches!(
            r.all_satisfied_data(),
            Err(PageError::UnsupportedType(dt)) if dt == data_type
        ));
        assert!(matches!(
            r.all_satisfied_page_data(true),
            Err(PageError::UnsupportedType(_))
        ));
    }
}

#[test]
fn stacked_filters_are_anded() {
    let rows: Vec<(Timestamp, Value)> = (0..10).map(|i| (i * 10, Value::Int64(i))).collect();
    let (bytes, header) = build_page(DataType::Int64, TsEncoding::Plain, &rows);
    let mut r = open(bytes, header, DataType::Int64, TsEncoding::Plain);
    r.add_record_filter(Box::new(TimeFilter::between(20, 70)));
    r.add_record_filter(Box::new(OrFilter::new(
        Box::new(ValueFilter::new(CompareOp::LtEq, Value::Int64(3))),
        Box::new(ValueFilter::eq(Value::Int64(6))),
    )));
    let block = r.all_satisfied_data().unwrap();
    assert_eq!(block.time_column(), &[20, 30, 60]);
}

#[derive(Debug, Default)]
struct CountingListener {
    events: std::sync::Mutex<Vec<PageEvent>>,
}

impl PageEventListener for CountingListener {
    fn on_event(&self, event: PageEvent) {
        self.events.lock().unwrap().push(event);
    }
}

#[test]
fn compressed_pages_materialize_on_first_scan() {
    let rows: Vec<(Timestamp, Value)> = (0..500)
        .map(|i| (1_700_000_000_000 + i * 1_000, Value::Double(i as f64 / 4.0)))
        .collect();
    let (raw, header) = build_page(DataType::Double, TsEncoding::Plain, &rows);

    for compression in [PageCompression::Lz4, PageCompression::Zstd] {
        let stored = compress(compression, &raw).unwrap();
        let mut header = header.clone();
        header.compressed_size = stored.len();

        // Page bytes sit at an offset inside a larger chunk buffer.
        let mut chunk = vec![0xAAu8; 16];
        chunk.extend_from_slice(&stored);
        chunk.extend_from_slice(&[0xBB; 8]);

        let listener = Arc::new(CountingListener::default());
        let mut r = PageReader::lazy(
            header,
            LazyLoadPageData::new(chunk, 16, compression.decompressor()),
            DataType::Double,
            TsEncoding::Plain.decoder(DataType::Double).unwrap(),
            TsEncoding::DeltaVarint.decoder(DataType::Int64).unwrap(),
        )
        .with_config(ReaderConfig {
            event_listener: listener.clone(),
            ..ReaderConfig::default()
        });
        r.set_limit_offset(PaginationController::new(100, Some(50)));

        assert!(!r.is_loaded());
        let block = r.all_satisfied_data().unwrap();
        assert!(r.is_loaded());
        assert_eq!(block.rows(0), rows[100..150].to_vec(), "{}", compression);

        let events = listener.events.lock().unwrap();
        assert!(matches!(
            events[0],
            PageEvent::PageMaterialized { compression: c, .. } if c == compression
        ));
        assert!(matches!(
            events[1],
            PageEvent::PageScanned { rows_emitted: 50, limit_reached: true, .. }
        ));
    }
}

#[test]
fn malformed_length_prefix_is_rejected_at_construction() {
    // timeLen = 100 but only two bytes follow.
    let bytes = vec![100u8, 1, 2];
    let (_, header) = three_int32_rows();
    let result = PageReader::new(
        Some(header),
        bytes,
        DataType::Int32,
        TsEncoding::Plain.decoder(DataType::Int32).unwrap(),
        TsEncoding::DeltaVarint.decoder(DataType::Int64).unwrap(),
    );
    assert!(matches!(result, Err(PageError::Decode(_))));
}

#[test]
fn nan_row_defeats_fast_accept() {
    let rows = [
        (10, Value::Double(1.0)),
        (20, Value::Double(f64::NAN)),
        (30, Value::Double(5.0)),
    ];
    let (bytes, header) = build_page(DataType::Double, TsEncoding::Plain, &rows);
    let filter = || Box::new(ValueFilter::gt(Value::Double(0.0)));

    let mut with_stats = open(bytes.clone(), header, DataType::Double, TsEncoding::Plain)
        .with_record_filter(filter());
    let mut per_row = PageReader::new(
        None,
        bytes,
        DataType::Double,
        TsEncoding::Plain.decoder(DataType::Double).unwrap(),
        TsEncoding::DeltaVarint.decoder(DataType::Int64).unwrap(),
    )
    .unwrap()
    .with_record_filter(filter());

    let times = |r: &mut PageReader| -> Vec<Timestamp> {
        r.all_satisfied_data()
            .unwrap()
            .rows(0)
            .into_iter()
            .map(|(t, _)| t)
            .collect()
    };
    assert_eq!(times(&mut with_stats), vec![10, 30]);
    assert_eq!(times(&mut per_row), vec![10, 30]);
}
