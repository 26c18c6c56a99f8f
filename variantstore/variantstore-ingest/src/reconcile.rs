//! Reconciliation between the columnar store and the search index.
//!
//! The dual-sink write is not atomic: a crash (or a reported search
//! failure) between the Parquet write and the index commit leaves rows
//! that exist in the store but not in the index. This pass re-derives
//! the missing search documents from the columnar rows and upserts them.

use std::collections::HashSet;
use std::sync::Arc;

use datafusion::arrow::array::{Array, AsArray};
use datafusion::arrow::datatypes::{DataType, UInt32Type};
use datafusion::datasource::file_format::parquet::ParquetFormat;
use datafusion::datasource::listing::{
    ListingOptions, ListingTable, ListingTableConfig, ListingTableUrl,
};
use datafusion::prelude::{cast, col, SessionContext};
use log::info;

use variantstore_core::config::StoreConfig;
use variantstore_core::model::{CsqProjection, CSQ_CONSEQUENCE, CSQ_IMPACT, CSQ_SYMBOL};
use variantstore_core::{Result, SearchDocument, VariantStoreError};

use crate::search_sink::SearchIndex;

fn store_err(e: impl std::fmt::Display) -> VariantStoreError {
    VariantStoreError::Store(e.to_string())
}

/// Counters of one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    /// Distinct identifiers found in the columnar store.
    pub columnar_ids: usize,
    /// Identifiers present in the search index before the pass.
    pub indexed_ids: usize,
    /// Documents re-upserted into the index.
    pub repaired: usize,
}

/// Diffs the project's columnar identifiers against its search index
/// and re-upserts the documents the index is missing.
///
/// A project with no columnar data yet reconciles to all-zero stats.
pub async fn reconcile_project(config: &StoreConfig, project_id: &str) -> Result<ReconcileStats> {
    let index = SearchIndex::open_or_create(config.project_index_dir(project_id))?;
    let indexed: HashSet<String> = index.all_variant_ids()?.into_iter().collect();

    let data_dir = config.project_data_dir(project_id);
    if !data_dir.is_dir() {
        return Ok(ReconcileStats {
            indexed_ids: indexed.len(),
            ..ReconcileStats::default()
        });
    }

    let ctx = SessionContext::new();
    let table_url =
        ListingTableUrl::parse(format!("file://{}/", data_dir.display())).map_err(store_err)?;
    let options = ListingOptions::new(Arc::new(ParquetFormat::default()))
        .with_file_extension(".parquet")
        .with_table_partition_cols(vec![
            ("chrom".to_string(), DataType::Utf8),
            ("year_month".to_string(), DataType::Utf8),
        ]);
    let file_schema = options
        .infer_schema(&ctx.state(), &table_url)
        .await
        .map_err(store_err)?;
    let table_config = ListingTableConfig::new(table_url)
        .with_listing_options(options)
        .with_schema(file_schema);
    let table = ListingTable::try_new(table_config).map_err(store_err)?;

    // Partition columns come back dictionary-encoded and string file
    // columns as Utf8View; cast both to plain Utf8 before reading.
    let df = ctx
        .read_table(Arc::new(table))
        .map_err(store_err)?
        .select(vec![
            cast(col("variant_id"), DataType::Utf8).alias("variant_id"),
            cast(col("chrom"), DataType::Utf8).alias("chrom"),
            col("pos"),
            col("csq"),
        ])
        .map_err(store_err)?;
    let batches = df.collect().await.map_err(store_err)?;

    let mut seen: HashSet<String> = HashSet::new();
    let mut missing: Vec<SearchDocument> = Vec::new();
    for batch in &batches {
        let variant_ids = batch.column(0).as_string::<i32>();
        let chroms = batch.column(1).as_string::<i32>();
        let positions = batch.column(2).as_primitive::<UInt32Type>();
        let csq = batch.column(3).as_struct();

        for row in 0..batch.num_rows() {
            let variant_id = variant_ids.value(row).to_string();
            if !seen.insert(variant_id.clone()) {
                continue;
            }
            if indexed.contains(&variant_id) {
                continue;
            }
            missing.push(SearchDocument {
                variant_id,
                chrom: chroms.value(row).to_string(),
                pos: positions.value(row),
                csq: CsqProjection {
                    symbol: struct_string(csq, CSQ_SYMBOL, row),
                    consequence: struct_string(csq, CSQ_CONSEQUENCE, row),
                    impact: struct_string(csq, CSQ_IMPACT, row),
                },
                clinvar: Default::default(),
                population: Default::default(),
            });
        }
    }

    let repaired = missing.len();
    index.upsert_batch(&missing)?;
    info!(
        "reconciled project {}: {} columnar ids, {} indexed, {} repaired",
        project_id,
        seen.len(),
        indexed.len(),
        repaired
    );
    Ok(ReconcileStats {
        columnar_ids: seen.len(),
        indexed_ids: indexed.len(),
        repaired,
    })
}

fn struct_string(
    csq: &datafusion::arrow::array::StructArray,
    child: &str,
    row: usize,
) -> Option<String> {
    let column = csq.column_by_name(child)?;
    let values = column.as_string_opt::<i32>()?;
    if values.is_null(row) {
        None
    } else {
        Some(values.value(row).to_string())
    }
}
