//! Hydration of search hits from the columnar store.
//!
//! The search index carries identifiers and the query projection only;
//! full rows live in the partitioned Parquet store. Hydration registers
//! a hive-partitioned listing table over the project directory and pulls
//! the rows whose identifiers the executor returned.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use datafusion::arrow::array::{Array, AsArray, StructArray};
use datafusion::arrow::datatypes::{DataType, Float64Type, UInt32Type};
use datafusion::arrow::record_batch::RecordBatch;
use datafusion::datasource::file_format::parquet::ParquetFormat;
use datafusion::datasource::listing::{
    ListingOptions, ListingTable, ListingTableConfig, ListingTableUrl,
};
use datafusion::prelude::{cast, col, lit, DataFrame, Expr, SessionContext};
use log::debug;

use variantstore_core::config::StoreConfig;
use variantstore_core::model::CsqMap;
use variantstore_core::{Result, VariantRecord, VariantStoreError};

fn store_err(e: impl std::fmt::Display) -> VariantStoreError {
    VariantStoreError::Store(e.to_string())
}

/// Read access to the partitioned Parquet store.
///
/// The DataFusion session is created once with the store and injected
/// wherever rows are needed; nothing here touches process-global state.
pub struct ColumnarStore {
    root: PathBuf,
    ctx: SessionContext,
}

impl ColumnarStore {
    /// Creates a store over the configured data root.
    pub fn new(config: &StoreConfig) -> Self {
        ColumnarStore {
            root: config.data_root.clone(),
            ctx: SessionContext::new(),
        }
    }

    async fn project_frame(&self, project_id: &str) -> Result<Option<DataFrame>> {
        let dir = self.root.join(project_id);
        if !dir.is_dir() {
            return Ok(None);
        }
        let table_url =
            ListingTableUrl::parse(format!("file://{}/", dir.display())).map_err(store_err)?;
        let options = ListingOptions::new(Arc::new(ParquetFormat::default()))
            .with_file_extension(".parquet")
            .with_table_partition_cols(vec![
                ("chrom".to_string(), DataType::Utf8),
                ("year_month".to_string(), DataType::Utf8),
            ]);
        let file_schema = options
            .infer_schema(&self.ctx.state(), &table_url)
            .await
            .map_err(store_err)?;
        let table_config = ListingTableConfig::new(table_url)
            .with_listing_options(options)
            .with_schema(file_schema);
        let table = ListingTable::try_new(table_config).map_err(store_err)?;
        let df = self
            .ctx
            .read_table(Arc::new(table))
            .map_err(store_err)?
            .select(vec![
                // Partition columns come back dictionary-encoded and the
                // string file columns as Utf8View; cast both to plain Utf8
                // so the row readers see one layout.
                cast(col("project_id"), DataType::Utf8).alias("project_id"),
                cast(col("chrom"), DataType::Utf8).alias("chrom"),
                col("pos"),
                cast(col("ref"), DataType::Utf8).alias("ref"),
                cast(col("alt"), DataType::Utf8).alias("alt"),
                cast(col("variant_id"), DataType::Utf8).alias("variant_id"),
                cast(col("rsid"), DataType::Utf8).alias("rsid"),
                col("qual"),
                cast(col("filters"), DataType::Utf8).alias("filters"),
                col("csq"),
                cast(col("year_month"), DataType::Utf8).alias("year_month"),
            ])
            .map_err(store_err)?;
        Ok(Some(df))
    }

    /// Fetches one row per distinct identifier, in store order.
    ///
    /// Identifiers with no surviving row are silently absent; a project
    /// with no columnar data yields an empty result. Re-ingested
    /// identifiers have several physical rows; the first one scanned
    /// wins.
    pub async fn fetch_by_ids(
        &self,
        project_id: &str,
        ids: &[String],
    ) -> Result<Vec<VariantRecord>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let Some(df) = self.project_frame(project_id).await? else {
            return Ok(Vec::new());
        };
        let id_list: Vec<Expr> = ids.iter().map(|id| lit(id.as_str())).collect();
        let df = df
            .filter(col("variant_id").in_list(id_list, false))
            .map_err(store_err)?;
        let batches = df.collect().await.map_err(store_err)?;

        let mut seen: HashSet<String> = HashSet::new();
        let mut records = Vec::new();
        for batch in &batches {
            for row in 0..batch.num_rows() {
                let record = record_from_row(batch, row);
                if seen.insert(record.variant_id.clone()) {
                    records.push(record);
                }
            }
        }
        debug!(
            "hydrated {} of {} requested ids for project {}",
            records.len(),
            ids.len(),
            project_id
        );
        Ok(records)
    }

    /// Fetches a single variant row.
    ///
    /// # Errors
    ///
    /// Returns [`VariantStoreError::NotFound`] when the identifier has no
    /// row in the project.
    pub async fn get_variant(&self, project_id: &str, variant_id: &str) -> Result<VariantRecord> {
        let id = variant_id.to_string();
        let rows = self
            .fetch_by_ids(project_id, std::slice::from_ref(&id))
            .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| VariantStoreError::NotFound(variant_id.to_string()))
    }
}

fn optional_string(batch: &RecordBatch, column: usize, row: usize) -> Option<String> {
    let values = batch.column(column).as_string::<i32>();
    if values.is_null(row) {
        None
    } else {
        Some(values.value(row).to_string())
    }
}

fn required_string(batch: &RecordBatch, column: usize, row: usize) -> String {
    batch.column(column).as_string::<i32>().value(row).to_string()
}

fn csq_from_struct(csq: &StructArray, row: usize) -> CsqMap {
    let mut entries = Vec::with_capacity(csq.num_columns());
    for (field, column) in csq.fields().iter().zip(csq.columns()) {
        let value = column.as_string_opt::<i32>().and_then(|values| {
            if values.is_null(row) {
                None
            } else {
                Some(values.value(row).to_string())
            }
        });
        entries.push((field.name().clone(), value));
    }
    CsqMap(entries)
}

fn record_from_row(batch: &RecordBatch, row: usize) -> VariantRecord {
    let positions = batch.column(2).as_primitive::<UInt32Type>();
    let quals = batch.column(7).as_primitive::<Float64Type>();
    let csq = batch.column(9).as_struct();
    VariantRecord {
        project_id: required_string(batch, 0, row),
        chrom: required_string(batch, 1, row),
        pos: positions.value(row),
        ref_allele: required_string(batch, 3, row),
        alt_allele: required_string(batch, 4, row),
        variant_id: required_string(batch, 5, row),
        rsid: optional_string(batch, 6, row),
        qual: if quals.is_null(row) {
            None
        } else {
            Some(quals.value(row))
        },
        filters: required_string(batch, 8, row),
        csq: csq_from_struct(csq, row),
        year_month: required_string(batch, 10, row),
    }
}
