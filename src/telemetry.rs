use std::sync::Arc;
use std::time::Duration;

use crate::compression::PageCompression;
use crate::types::DataType;

/// Structured, in-process event hook for observability.
///
/// The page reader is a library component and never prints. Callers provide an
/// implementation that forwards these events to their own logging or tracing sink.
pub trait PageEventListener: std::fmt::Debug + Send + Sync + 'static {
    fn on_event(&self, event: PageEvent);
}

/// Which output a scan produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutput {
    Batch,
    Block,
}

/// Structured events emitted by the page reader.
#[derive(Debug, Clone, PartialEq)]
pub enum PageEvent {
    PageMaterialized {
        compression: PageCompression,
        compressed_size: usize,
        uncompressed_size: usize,
    },
    PageMaterializeFailed {
        compression: PageCompression,
        error: String,
    },
    PageScanned {
        data_type: DataType,
        output: ScanOutput,
        rows_decoded: u64,
        rows_emitted: u64,
        all_satisfy: bool,
        limit_reached: bool,
    },
}

#[derive(Debug)]
pub struct NoopEventListener;

impl PageEventListener for NoopEventListener {
    #[inline]
    fn on_event(&self, _event: PageEvent) {}
}

pub fn noop_event_listener() -> Arc<dyn PageEventListener> {
    Arc::new(NoopEventListener)
}

/// Metrics emitted through the `metrics` facade.
///
/// Library-safe: recording is a no-op until the application installs a recorder.
pub mod page_metrics {
    use super::*;

    use ::metrics::{describe_counter, describe_histogram, Unit};

    // Counters are exposed as `<name>_total` by Prometheus exporters.
    pub const ROWS_DECODED: &str = "tspage_rows_decoded";
    pub const ROWS_EMITTED: &str = "tspage_rows_emitted";
    pub const PAGES_MATERIALIZED: &str = "tspage_pages_materialized";
    pub const MATERIALIZE_BYTES: &str = "tspage_materialize_bytes";
    pub const MATERIALIZE_DURATION_SECONDS: &str = "tspage_materialize_duration_seconds";

    #[inline]
    pub fn record_scan(rows_decoded: u64, rows_emitted: u64) {
        if rows_decoded > 0 {
            ::metrics::counter!(ROWS_DECODED).increment(rows_decoded);
        }
        if rows_emitted > 0 {
            ::metrics::counter!(ROWS_EMITTED).increment(rows_emitted);
        }
    }

    #[inline]
    pub fn record_materialize(duration: Duration, uncompressed_bytes: u64) {
        ::metrics::counter!(PAGES_MATERIALIZED).increment(1);
        ::metrics::counter!(MATERIALIZE_BYTES).increment(uncompressed_bytes);
        ::metrics::histogram!(MATERIALIZE_DURATION_SECONDS).record(duration.as_secs_f64());
    }

    /// Registers descriptions for all metrics. Call once after installing a recorder.
    pub fn describe_all() {
        describe_counter!(
            ROWS_DECODED,
            Unit::Count,
            "Rows decoded from page streams, before tombstone, predicate and pagination filtering."
        );
        describe_counter!(
            ROWS_EMITTED,
            Unit::Count,
            "Rows written to a batch or block output."
        );
        describe_counter!(
            PAGES_MATERIALIZED,
            Unit::Count,
            "Pages decompressed on first access."
        );
        describe_counter!(
            MATERIALIZE_BYTES,
            Unit::Bytes,
            "Uncompressed bytes produced by lazy page materialization."
        );
        describe_histogram!(
            MATERIALIZE_DURATION_SECONDS,
            Unit::Seconds,
            "Time spent decompressing and splitting a lazily loaded page."
        );
    }
}
