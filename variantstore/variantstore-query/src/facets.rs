//! Facet aggregation over a compiled filter.
//!
//! Facets are configured, not caller-supplied: each one is a terms
//! aggregation over a declared fast field with a per-facet term cap.
//! Terms beyond the cap are silently absent; callers needing exhaustive
//! counts must query the columnar store instead.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{json, Value as JsonValue};
use tantivy::aggregation::agg_req::Aggregations;
use tantivy::aggregation::AggregationCollector;
use tantivy::Index;

use variantstore_core::config::FacetSettings;
use variantstore_core::filter::FilterGroup;
use variantstore_core::{Result, VariantStoreError};

use crate::compiler::compile;

/// One term bucket of a facet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FacetBucket {
    /// The term.
    pub value: String,
    /// Number of matching documents carrying the term.
    pub count: u64,
}

fn store_err(e: impl std::fmt::Display) -> VariantStoreError {
    VariantStoreError::Store(e.to_string())
}

/// Computes every configured facet under the given filter.
///
/// Buckets come back ordered by descending count (ties by term), each
/// facet truncated at its configured cap.
pub fn aggregate(
    index: &Index,
    filter: Option<&FilterGroup>,
    settings: &FacetSettings,
) -> Result<BTreeMap<String, Vec<FacetBucket>>> {
    let schema = index.schema();
    let query = compile(&schema, filter)?;

    let mut request = serde_json::Map::new();
    for spec in &settings.facets {
        request.insert(
            spec.name.clone(),
            json!({"terms": {"field": spec.field, "size": spec.cap}}),
        );
    }
    let aggregations: Aggregations =
        serde_json::from_value(JsonValue::Object(request)).map_err(store_err)?;
    let collector = AggregationCollector::from_aggs(aggregations, Default::default());

    let reader = index.reader().map_err(store_err)?;
    let results = reader
        .searcher()
        .search(&query, &collector)
        .map_err(store_err)?;
    let rendered = serde_json::to_value(&results).map_err(store_err)?;

    let mut facets = BTreeMap::new();
    for spec in &settings.facets {
        let buckets = rendered
            .get(&spec.name)
            .and_then(|f| f.get("buckets"))
            .and_then(JsonValue::as_array)
            .map(|buckets| {
                buckets
                    .iter()
                    .filter_map(|bucket| {
                        let value = match bucket.get("key")? {
                            JsonValue::String(s) => s.clone(),
                            other => other.to_string(),
                        };
                        let count = bucket.get("doc_count")?.as_u64()?;
                        Some(FacetBucket { value, count })
                    })
                    .collect()
            })
            .unwrap_or_default();
        facets.insert(spec.name.clone(), buckets);
    }
    Ok(facets)
}
