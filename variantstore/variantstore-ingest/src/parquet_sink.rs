//! Columnar sink: partitioned Parquet under the project data directory.
//!
//! Layout is hive-style, `{data_root}/{project}/chrom={chrom}/year_month={YYYY_MM}/part-{uuid}.parquet`.
//! The partition keys are carried by the directory names only and are not
//! repeated as file columns. Writes are append-only; re-ingesting a
//! variant appends a new physical row and deduplication happens at read
//! time through the search index.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::path::PathBuf;
use std::sync::Arc;

use datafusion::arrow::array::{ArrayRef, Float64Builder, StringBuilder, StructArray, UInt32Builder};
use datafusion::arrow::datatypes::{DataType, Field, Fields, Schema, SchemaRef};
use datafusion::arrow::record_batch::RecordBatch;
use datafusion::parquet::arrow::ArrowWriter;
use datafusion::parquet::basic::Compression;
use datafusion::parquet::file::properties::WriterProperties;
use log::debug;
use uuid::Uuid;

use variantstore_core::config::StoreConfig;
use variantstore_core::{Result, VariantRecord, VariantStoreError};

use crate::csq::CsqSchema;

fn columnar_err(e: impl std::fmt::Display) -> VariantStoreError {
    VariantStoreError::ColumnarWrite(e.to_string())
}

/// Builds the Arrow schema of one data file. The annotation columns are
/// nested under a single `csq` struct whose children follow the header
/// declaration order.
pub fn file_schema(csq_fields: &[String]) -> SchemaRef {
    let csq_children: Fields = csq_fields
        .iter()
        .map(|name| Field::new(name, DataType::Utf8, true))
        .collect();
    Arc::new(Schema::new(vec![
        Field::new("project_id", DataType::Utf8, false),
        Field::new("pos", DataType::UInt32, false),
        Field::new("ref", DataType::Utf8, false),
        Field::new("alt", DataType::Utf8, false),
        Field::new("variant_id", DataType::Utf8, false),
        Field::new("rsid", DataType::Utf8, true),
        Field::new("qual", DataType::Float64, true),
        Field::new("filters", DataType::Utf8, false),
        Field::new("csq", DataType::Struct(csq_children), false),
    ]))
}

/// Append-only Parquet writer for one project.
pub struct ParquetSink {
    project_dir: PathBuf,
    schema: SchemaRef,
    csq_fields: Vec<String>,
}

impl ParquetSink {
    /// Creates a sink rooted at the project's data directory.
    pub fn new(config: &StoreConfig, project_id: &str, csq_schema: &CsqSchema) -> Self {
        let csq_fields = csq_schema.fields().to_vec();
        ParquetSink {
            project_dir: config.project_data_dir(project_id),
            schema: file_schema(&csq_fields),
            csq_fields,
        }
    }

    /// The project data directory this sink writes under.
    pub fn project_dir(&self) -> &PathBuf {
        &self.project_dir
    }

    /// Writes one batch, splitting it into one file per touched
    /// partition. Returns the paths of the files written.
    ///
    /// # Errors
    ///
    /// Any filesystem or encoder failure maps to
    /// [`VariantStoreError::ColumnarWrite`]; nothing has been handed to
    /// the search sink at that point, so a failed batch leaves the index
    /// untouched.
    pub fn write_batch(&self, records: &[VariantRecord]) -> Result<Vec<PathBuf>> {
        let mut partitions: BTreeMap<(String, String), Vec<&VariantRecord>> = BTreeMap::new();
        for record in records {
            partitions
                .entry((record.chrom.clone(), record.year_month.clone()))
                .or_default()
                .push(record);
        }

        let mut written = Vec::with_capacity(partitions.len());
        for ((chrom, year_month), rows) in partitions {
            let dir = self
                .project_dir
                .join(format!("chrom={}", chrom))
                .join(format!("year_month={}", year_month));
            fs::create_dir_all(&dir).map_err(columnar_err)?;
            let path = dir.join(format!("part-{}.parquet", Uuid::new_v4()));

            let batch = self.build_batch(&rows)?;
            let file = File::create(&path).map_err(columnar_err)?;
            let props = WriterProperties::builder()
                .set_compression(Compression::SNAPPY)
                .build();
            let mut writer =
                ArrowWriter::try_new(file, self.schema.clone(), Some(props)).map_err(columnar_err)?;
            writer.write(&batch).map_err(columnar_err)?;
            writer.close().map_err(columnar_err)?;

            debug!(
                "wrote {} rows to {} (chrom={}, year_month={})",
                rows.len(),
                path.display(),
                chrom,
                year_month
            );
            written.push(path);
        }
        Ok(written)
    }

    fn build_batch(&self, rows: &[&VariantRecord]) -> Result<RecordBatch> {
        let mut project_id = StringBuilder::new();
        let mut pos = UInt32Builder::new();
        let mut ref_allele = StringBuilder::new();
        let mut alt_allele = StringBuilder::new();
        let mut variant_id = StringBuilder::new();
        let mut rsid = StringBuilder::new();
        let mut qual = Float64Builder::new();
        let mut filters = StringBuilder::new();
        let mut csq_builders: Vec<StringBuilder> = self
            .csq_fields
            .iter()
            .map(|_| StringBuilder::new())
            .collect();

        for record in rows {
            project_id.append_value(&record.project_id);
            pos.append_value(record.pos);
            ref_allele.append_value(&record.ref_allele);
            alt_allele.append_value(&record.alt_allele);
            variant_id.append_value(&record.variant_id);
            rsid.append_option(record.rsid.as_deref());
            qual.append_option(record.qual);
            filters.append_value(&record.filters);
            for (name, builder) in self.csq_fields.iter().zip(csq_builders.iter_mut()) {
                builder.append_option(record.csq.get(name));
            }
        }

        let csq_children: Fields = self
            .csq_fields
            .iter()
            .map(|name| Field::new(name, DataType::Utf8, true))
            .collect();
        let csq_arrays: Vec<ArrayRef> = csq_builders
            .into_iter()
            .map(|mut b| Arc::new(b.finish()) as ArrayRef)
            .collect();
        let csq = StructArray::new(csq_children, csq_arrays, None);

        let columns: Vec<ArrayRef> = vec![
            Arc::new(project_id.finish()),
            Arc::new(pos.finish()),
            Arc::new(ref_allele.finish()),
            Arc::new(alt_allele.finish()),
            Arc::new(variant_id.finish()),
            Arc::new(rsid.finish()),
            Arc::new(qual.finish()),
            Arc::new(filters.finish()),
            Arc::new(csq),
        ];
        RecordBatch::try_new(self.schema.clone(), columns).map_err(columnar_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use variantstore_core::model::CsqMap;

    fn sample_record(chrom: &str, pos: u32) -> VariantRecord {
        let csq = CsqMap(vec![
            ("Allele".to_string(), Some("t".to_string())),
            ("Consequence".to_string(), Some("missense_variant".to_string())),
        ]);
        VariantRecord {
            project_id: "p1".to_string(),
            chrom: chrom.to_string(),
            pos,
            ref_allele: "A".to_string(),
            alt_allele: "T".to_string(),
            variant_id: format!("{}:{}:a>t", chrom, pos),
            rsid: None,
            qual: Some(30.0),
            filters: "PASS".to_string(),
            csq,
            year_month: "2026_08".to_string(),
        }
    }

    #[test]
    fn test_write_batch_splits_by_partition() {
        let schema = CsqSchema::from_description("Format: Allele|Consequence").unwrap();
        let tmp = tempfile::tempdir().unwrap();
        let config = StoreConfig::new(tmp.path().join("data"), tmp.path().join("index"));
        let sink = ParquetSink::new(&config, "p1", &schema);

        let records = vec![
            sample_record("chr1", 100),
            sample_record("chr1", 200),
            sample_record("chr2", 300),
        ];
        let written = sink.write_batch(&records).unwrap();
        assert_eq!(written.len(), 2);
        assert!(written[0]
            .to_string_lossy()
            .contains("p1/chrom=chr1/year_month=2026_08/part-"));
        assert!(written[1].to_string_lossy().contains("chrom=chr2"));
    }

    #[test]
    fn test_write_batch_appends_new_files() {
        let schema = CsqSchema::from_description("Format: Allele|Consequence").unwrap();
        let tmp = tempfile::tempdir().unwrap();
        let config = StoreConfig::new(tmp.path().join("data"), tmp.path().join("index"));
        let sink = ParquetSink::new(&config, "p1", &schema);

        let records = vec![sample_record("chr1", 100)];
        let first = sink.write_batch(&records).unwrap();
        let second = sink.write_batch(&records).unwrap();
        assert_ne!(first, second);
        assert!(first[0].exists());
        assert!(second[0].exists());
    }
}
