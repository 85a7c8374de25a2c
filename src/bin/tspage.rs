//! Command-line page scanner.
//!
//! Loads scan settings from (in precedence order): defaults, config file, environment
//! variables (`TSPAGE_*`), and CLI flags. Reads one page file, applies deletions, the
//! record filter and pagination, and prints surviving rows as `time,value` lines followed
//! by a `rows=N` summary.

use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use config::{Config, Environment, File};
use tspage::filter::{CompareOp, ValueFilter};
use tspage::reader::DEFAULT_MAX_UNCOMPRESSED_PAGE_SIZE;
use tspage::telemetry::{noop_event_listener, PageEvent, PageEventListener};
use tspage::{read_page_file, PageError, PaginationController, ReaderConfig, TimeRange, Value};

// ---------- CLI ----------

/// Which reader output to scan into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// Row container; pagination is not applied.
    Batch,
    /// Columnar block with offset/limit.
    Block,
}

impl std::fmt::Display for OutputMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputMode::Batch => f.write_str("batch"),
            OutputMode::Block => f.write_str("block"),
        }
    }
}

/// Scan a time-series page file.
#[derive(Parser, Debug)]
#[command(name = "tspage", version, about)]
pub struct Cli {
    /// Page file to scan. Not required with --validate-config.
    pub page: Option<PathBuf>,

    /// Path to config file (TOML). If omitted, no file is loaded unless default path exists.
    #[arg(long, env = "TSPAGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Do not load any config file; use defaults + env + CLI only.
    #[arg(long, default_value_t = false)]
    pub no_config: bool,

    /// Load and validate config (file + env + CLI), print effective settings, then exit.
    #[arg(long, default_value_t = false)]
    pub validate_config: bool,

    /// Rows to skip before emitting (block output only).
    #[arg(long)]
    pub offset: Option<u64>,

    /// Maximum rows to emit (block output only).
    #[arg(long)]
    pub limit: Option<u64>,

    /// Read direction of batch output.
    #[arg(long)]
    pub ascending: Option<bool>,

    #[arg(long, value_enum)]
    pub output: Option<OutputMode>,

    /// Deleted time range `min:max` (inclusive). Repeatable; replaces configured deletions.
    #[arg(long = "delete", value_name = "MIN:MAX")]
    pub deletions: Vec<TimeRange>,

    /// Filter operator applied to values (gt, gt_eq, lt, lt_eq, eq, not_eq).
    #[arg(long)]
    pub filter_op: Option<String>,

    /// Filter operand, parsed with the page's data type.
    #[arg(long)]
    pub filter_value: Option<String>,

    /// Refuse to materialize pages larger than this many bytes.
    #[arg(long)]
    pub max_uncompressed_page_size: Option<usize>,

    /// Print reader events to stderr.
    #[arg(long, default_value_t = false)]
    pub trace_events: bool,
}

// ---------- File/env config (all optional for partial config) ----------

/// Record filter as read from config. The operand stays a string until the page's data
/// type is known.
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct FilterFileConfig {
    pub op: CompareOp,
    pub value: String,
}

/// Top-level config as read from file + env. Every field optional for layering.
#[derive(Debug, Default, serde::Deserialize)]
pub struct ScanFileConfig {
    pub offset: Option<u64>,
    pub limit: Option<u64>,
    pub ascending: Option<bool>,
    pub output: Option<OutputMode>,
    pub deletions: Option<Vec<TimeRange>>,
    pub filter: Option<FilterFileConfig>,
    pub max_uncompressed_page_size: Option<usize>,
}

/// Effective scan settings after layering.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub offset: u64,
    pub limit: Option<u64>,
    pub ascending: bool,
    pub output: OutputMode,
    pub deletions: Vec<TimeRange>,
    pub filter: Option<FilterFileConfig>,
    pub max_uncompressed_page_size: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: None,
            ascending: true,
            output: OutputMode::Block,
            deletions: Vec::new(),
            filter: None,
            max_uncompressed_page_size: DEFAULT_MAX_UNCOMPRESSED_PAGE_SIZE,
        }
    }
}

/// Load merged scan settings. CLI overrides file/env.
fn load_scan_options(cli: &Cli) -> Result<ScanOptions, String> {
    let mut builder = Config::builder();

    if !cli.no_config {
        if let Some(ref path) = cli.config {
            if !path.exists() {
                return Err(format!("config file not found: {}", path.display()));
            }
            builder = builder.add_source(File::from(path.as_path()).required(false));
        } else {
            let default_path = PathBuf::from("tspage.toml");
            if default_path.exists() {
                builder = builder.add_source(File::from(default_path.as_path()).required(false));
            }
        }
    }

    builder = builder.add_source(
        Environment::with_prefix("TSPAGE")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
            .ignore_empty(true),
    );

    let merged = builder.build().map_err(|e| e.to_string())?;
    let partial: ScanFileConfig = merged.try_deserialize().map_err(|e| e.to_string())?;

    let mut options = ScanOptions::default();
    merge_into_options(&mut options, partial)?;
    merge_cli(&mut options, cli)?;
    Ok(options)
}

/// Merge file/env partial config onto defaults. Only overwrites fields that are `Some`.
fn merge_into_options(base: &mut ScanOptions, partial: ScanFileConfig) -> Result<(), String> {
    if let Some(n) = partial.offset {
        base.offset = n;
    }
    if let Some(n) = partial.limit {
        base.limit = Some(n);
    }
    if let Some(b) = partial.ascending {
        base.ascending = b;
    }
    if let Some(o) = partial.output {
        base.output = o;
    }
    if let Some(d) = partial.deletions {
        check_deletions(&d)?;
        base.deletions = d;
    }
    if let Some(f) = partial.filter {
        base.filter = Some(f);
    }
    if let Some(n) = partial.max_uncompressed_page_size {
        base.max_uncompressed_page_size = n;
    }
    Ok(())
}

fn merge_cli(base: &mut ScanOptions, cli: &Cli) -> Result<(), String> {
    if let Some(n) = cli.offset {
        base.offset = n;
    }
    if let Some(n) = cli.limit {
        base.limit = Some(n);
    }
    if let Some(b) = cli.ascending {
        base.ascending = b;
    }
    if let Some(o) = cli.output {
        base.output = o;
    }
    if !cli.deletions.is_empty() {
        check_deletions(&cli.deletions)?;
        base.deletions = cli.deletions.clone();
    }
    match (&cli.filter_op, &cli.filter_value) {
        (Some(op), Some(value)) => {
            base.filter = Some(FilterFileConfig {
                op: parse_compare_op(op)?,
                value: value.clone(),
            });
        }
        (None, None) => {}
        _ => return Err("--filter-op and --filter-value must be given together".to_string()),
    }
    if let Some(n) = cli.max_uncompressed_page_size {
        base.max_uncompressed_page_size = n;
    }
    Ok(())
}

fn parse_compare_op(s: &str) -> Result<CompareOp, String> {
    match s.trim() {
        "gt" | ">" => Ok(CompareOp::Gt),
        "gt_eq" | ">=" => Ok(CompareOp::GtEq),
        "lt" | "<" => Ok(CompareOp::Lt),
        "lt_eq" | "<=" => Ok(CompareOp::LtEq),
        "eq" | "=" => Ok(CompareOp::Eq),
        "not_eq" | "!=" => Ok(CompareOp::NotEq),
        other => Err(format!("invalid filter op {:?}", other)),
    }
}

/// Deletions must be well-formed, sorted by `max` and non-overlapping.
fn check_deletions(ranges: &[TimeRange]) -> Result<(), String> {
    for r in ranges {
        if r.min > r.max {
            return Err(format!("invalid deletion {}: min > max", r));
        }
    }
    for pair in ranges.windows(2) {
        if pair[1].min <= pair[0].max {
            return Err(format!(
                "deletions must be sorted and non-overlapping: {} then {}",
                pair[0], pair[1]
            ));
        }
    }
    Ok(())
}

// ---------- Scan ----------

/// Forwards reader events to stderr.
#[derive(Debug)]
struct StderrEventListener;

impl PageEventListener for StderrEventListener {
    fn on_event(&self, event: PageEvent) {
        eprintln!("event: {:?}", event);
    }
}

fn run_scan(page: &Path, options: &ScanOptions, trace_events: bool) -> Result<u64, PageError> {
    let file = read_page_file(page)?;
    let data_type = file.header.data_type;

    let event_listener: Arc<dyn PageEventListener> = if trace_events {
        Arc::new(StderrEventListener)
    } else {
        noop_event_listener()
    };
    let mut reader = file.into_reader()?.with_config(ReaderConfig {
        max_uncompressed_page_size: options.max_uncompressed_page_size,
        event_listener,
    });

    if let Some(ref f) = options.filter {
        let operand = Value::parse(data_type, &f.value)?;
        reader.add_record_filter(Box::new(ValueFilter::new(f.op, operand)));
    }
    if !options.deletions.is_empty() {
        reader.set_delete_interval_list(options.deletions.clone());
    }
    reader.set_limit_offset(PaginationController::new(options.offset, options.limit));

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let mut rows = 0u64;
    match options.output {
        OutputMode::Batch => {
            let batch = reader.all_satisfied_page_data(options.ascending)?;
            for (time, value) in batch.iter() {
                writeln!(out, "{},{}", time, value)?;
                rows += 1;
            }
        }
        OutputMode::Block => {
            let block = reader.all_satisfied_data()?;
            for (time, value) in block.rows(0) {
                writeln!(out, "{},{}", time, value)?;
                rows += 1;
            }
        }
    }
    writeln!(out, "rows={}", rows)?;
    out.flush()?;
    Ok(rows)
}

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();
    let options = load_scan_options(&cli).map_err(|e| {
        eprintln!("config error: {}", e);
        e
    })?;

    if cli.validate_config {
        println!("offset={}", options.offset);
        match options.limit {
            Some(n) => println!("limit={}", n),
            None => println!("limit=unlimited"),
        }
        println!("ascending={}", options.ascending);
        println!("output={}", options.output);
        let deletions: Vec<String> = options.deletions.iter().map(|r| r.to_string()).collect();
        println!("deletions={}", deletions.join(","));
        match options.filter {
            Some(ref f) => println!("filter={} {}", f.op, f.value),
            None => println!("filter=none"),
        }
        println!(
            "max_uncompressed_page_size={}",
            options.max_uncompressed_page_size
        );
        return Ok(());
    }

    let Some(ref page) = cli.page else {
        let msg = "no page file given".to_string();
        eprintln!("usage error: {}", msg);
        return Err(msg.into());
    };

    run_scan(page, &options, cli.trace_events).map_err(|e| {
        eprintln!("scan failed: {}", e);
        e
    })?;
    Ok(())
}
