//! Dual-sink batch writer.
//!
//! Parsed rows buffer up to the batch size; a flush writes the columnar
//! store first and the search index second. Failing the columnar write
//! aborts the batch before the index sees it, so the index never refers
//! to rows the store does not have. A search failure after a successful
//! columnar write is surfaced with the affected identifiers and left to
//! the reconciliation pass; there is no rollback.

use log::info;

use variantstore_core::{Result, SearchDocument, VariantRecord};

use crate::parquet_sink::ParquetSink;
use crate::parser::ParsedVariant;
use crate::search_sink::SearchIndex;

/// Default number of rows buffered before a flush.
pub const DEFAULT_BATCH_SIZE: usize = 5000;

/// Buffers parsed variants and flushes them to both sinks in order.
pub struct DualSinkWriter<'a> {
    parquet: &'a ParquetSink,
    search: &'a SearchIndex,
    batch_size: usize,
    records: Vec<VariantRecord>,
    documents: Vec<SearchDocument>,
    flushed_rows: u64,
}

impl<'a> DualSinkWriter<'a> {
    /// Creates a writer over the two sinks.
    pub fn new(parquet: &'a ParquetSink, search: &'a SearchIndex, batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        DualSinkWriter {
            parquet,
            search,
            batch_size,
            records: Vec::with_capacity(batch_size),
            documents: Vec::with_capacity(batch_size),
            flushed_rows: 0,
        }
    }

    /// Rows flushed to the sinks so far.
    pub fn flushed_rows(&self) -> u64 {
        self.flushed_rows
    }

    /// Buffers one parsed variant, flushing when the batch is full.
    pub fn push(&mut self, parsed: ParsedVariant) -> Result<()> {
        self.records.push(parsed.record);
        self.documents.push(parsed.document);
        if self.records.len() >= self.batch_size {
            self.flush()?;
        }
        Ok(())
    }

    /// Flushes the buffered batch: columnar first, then search.
    pub fn flush(&mut self) -> Result<()> {
        if self.records.is_empty() {
            return Ok(());
        }
        let count = self.records.len();
        self.parquet.write_batch(&self.records)?;
        self.search.upsert_batch(&self.documents)?;
        self.flushed_rows += count as u64;
        info!("flushed batch of {} rows ({} total)", count, self.flushed_rows);
        self.records.clear();
        self.documents.clear();
        Ok(())
    }

    /// Flushes the tail batch and returns the total row count.
    pub fn finish(mut self) -> Result<u64> {
        self.flush()?;
        Ok(self.flushed_rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use variantstore_core::config::StoreConfig;
    use variantstore_core::model::CsqMap;

    use crate::csq::CsqSchema;

    fn parsed_variant(pos: u32) -> ParsedVariant {
        let record = VariantRecord {
            project_id: "p1".to_string(),
            chrom: "chr1".to_string(),
            pos,
            ref_allele: "A".to_string(),
            alt_allele: "T".to_string(),
            variant_id: format!("chr1:{}:a>t", pos),
            rsid: None,
            qual: None,
            filters: "PASS".to_string(),
            csq: CsqMap(vec![("Allele".to_string(), Some("t".to_string()))]),
            year_month: "2026_08".to_string(),
        };
        let document = SearchDocument::from_record(&record);
        ParsedVariant { record, document }
    }

    #[test]
    fn test_flush_on_batch_boundary_and_finish() {
        let tmp = tempfile::tempdir().unwrap();
        let config = StoreConfig::new(tmp.path().join("data"), tmp.path().join("index"));
        let schema = CsqSchema::from_description("Format: Allele").unwrap();
        let parquet = ParquetSink::new(&config, "p1", &schema);
        let search = SearchIndex::open_or_create(config.project_index_dir("p1")).unwrap();

        let mut writer = DualSinkWriter::new(&parquet, &search, 2);
        writer.push(parsed_variant(100)).unwrap();
        assert_eq!(writer.flushed_rows(), 0);
        writer.push(parsed_variant(200)).unwrap();
        assert_eq!(writer.flushed_rows(), 2);
        writer.push(parsed_variant(300)).unwrap();
        let total = writer.finish().unwrap();
        assert_eq!(total, 3);
        assert_eq!(search.all_variant_ids().unwrap().len(), 3);
    }
}
