//! End-to-end ingestion run: source file to both sinks.

use chrono::Utc;
use log::{info, warn};

use variantstore_core::config::StoreConfig;
use variantstore_core::{Result, VariantStoreError};

use crate::batch_writer::{DualSinkWriter, DEFAULT_BATCH_SIZE};
use crate::csq::CsqSchema;
use crate::parquet_sink::ParquetSink;
use crate::parser::{parse_record, ParseContext, RowOutcome};
use crate::search_sink::SearchIndex;
use crate::storage::VcfSourceReader;

/// Parameters of one ingestion run.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Project the rows are ingested into.
    pub project_id: String,
    /// Path of the source VCF (plain, `.gz` or `.bgz`).
    pub vcf_path: String,
    /// Store layout.
    pub store: StoreConfig,
    /// Rows buffered per dual-sink flush.
    pub batch_size: usize,
    /// Highest tolerated skipped-row fraction before the run aborts.
    /// Zero (the default) aborts on the first malformed row.
    pub max_error_rate: f64,
    /// BGZF decompression worker threads.
    pub threads: usize,
}

impl IngestConfig {
    /// Builds a run configuration with default batching and the fatal
    /// malformed-row policy.
    pub fn new(project_id: impl Into<String>, vcf_path: impl Into<String>, store: StoreConfig) -> Self {
        IngestConfig {
            project_id: project_id.into(),
            vcf_path: vcf_path.into(),
            store,
            batch_size: DEFAULT_BATCH_SIZE,
            max_error_rate: 0.0,
            threads: 1,
        }
    }
}

/// Counters of one completed run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    /// Data lines scanned.
    pub total_rows: u64,
    /// Rows written to both sinks.
    pub ingested_rows: u64,
    /// Rows skipped as malformed.
    pub skipped_rows: u64,
}

/// Runs one ingestion: reads the header, streams the data lines through
/// the parser and the dual-sink writer, and enforces the error budget.
///
/// # Errors
///
/// A missing or malformed CSQ declaration is fatal before any row is
/// read. A skipped-row fraction above `max_error_rate` aborts with
/// [`VariantStoreError::MalformedRecord`] naming the row that tipped it.
/// Sink failures propagate from the batch writer.
pub fn run_ingest(config: &IngestConfig) -> Result<IngestStats> {
    let mut reader = VcfSourceReader::open_with_threads(&config.vcf_path, config.threads)?;
    let header = reader.read_header()?;
    let csq_schema = CsqSchema::from_header(&header)?;
    info!(
        "ingesting {} into project {} ({} annotation fields)",
        config.vcf_path,
        config.project_id,
        csq_schema.fields().len()
    );

    let ctx = ParseContext {
        project_id: config.project_id.clone(),
        year_month: Utc::now().format("%Y_%m").to_string(),
    };
    let parquet = ParquetSink::new(&config.store, &config.project_id, &csq_schema);
    let search = SearchIndex::open_or_create(config.store.project_index_dir(&config.project_id))?;
    let mut writer = DualSinkWriter::new(&parquet, &search, config.batch_size);

    let mut total_rows = 0u64;
    let mut skipped_rows = 0u64;
    for result in reader.records() {
        let record = result?;
        total_rows += 1;
        match parse_record(&record, &header, &csq_schema, &ctx, total_rows) {
            RowOutcome::Parsed(parsed) => writer.push(*parsed)?,
            RowOutcome::Skipped { row, reason } => {
                warn!("skipping row {}: {}", row, reason);
                skipped_rows += 1;
                let rate = skipped_rows as f64 / total_rows as f64;
                if rate > config.max_error_rate {
                    return Err(VariantStoreError::MalformedRecord { row, reason });
                }
            }
        }
    }
    let ingested_rows = writer.finish()?;

    let stats = IngestStats {
        total_rows,
        ingested_rows,
        skipped_rows,
    };
    info!(
        "ingest finished: {} scanned, {} ingested, {} skipped",
        stats.total_rows, stats.ingested_rows, stats.skipped_rows
    );
    Ok(stats)
}
