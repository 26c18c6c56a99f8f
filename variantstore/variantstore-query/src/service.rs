//! Query-side facade combining the search index and the columnar store.

use std::collections::{BTreeMap, HashMap};

use tantivy::Index;

use variantstore_core::config::{FacetSettings, StoreConfig};
use variantstore_core::filter::{FilterGroup, PageRequest, SortField};
use variantstore_core::{Result, VariantRecord, VariantStoreError};

use crate::executor::execute_filter;
use crate::facets::{aggregate, FacetBucket};
use crate::hydrate::ColumnarStore;

/// One page of fully hydrated results.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantPage {
    /// Full match count, independent of pagination.
    pub total: usize,
    /// Resume token for the next page.
    pub next_cursor: Option<String>,
    /// Hydrated rows, in result order. Identifiers whose columnar row
    /// disappeared mid-flight are omitted.
    pub items: Vec<VariantRecord>,
}

/// Query entry point holding the injected store handles.
pub struct QueryService {
    config: StoreConfig,
    columnar: ColumnarStore,
    facet_settings: FacetSettings,
}

impl QueryService {
    /// Builds a service over the given store layout.
    pub fn new(config: StoreConfig, facet_settings: FacetSettings) -> Self {
        let columnar = ColumnarStore::new(&config);
        QueryService {
            config,
            columnar,
            facet_settings,
        }
    }

    fn open_index(&self, project_id: &str) -> Result<Index> {
        let dir = self.config.project_index_dir(project_id);
        if !dir.is_dir() {
            return Err(VariantStoreError::NotFound(format!(
                "project {}",
                project_id
            )));
        }
        Index::open_in_dir(&dir).map_err(|e| VariantStoreError::Store(e.to_string()))
    }

    /// Runs a filter query and hydrates the resulting page.
    pub async fn filter_query(
        &self,
        project_id: &str,
        filter: Option<&FilterGroup>,
        sort: &[SortField],
        page: &PageRequest,
    ) -> Result<VariantPage> {
        let index = self.open_index(project_id)?;
        let search_page = execute_filter(&index, filter, sort, page)?;

        let rows = self
            .columnar
            .fetch_by_ids(project_id, &search_page.ids)
            .await?;
        let mut by_id: HashMap<String, VariantRecord> = rows
            .into_iter()
            .map(|r| (r.variant_id.clone(), r))
            .collect();
        let items = search_page
            .ids
            .iter()
            .filter_map(|id| by_id.remove(id))
            .collect();
        Ok(VariantPage {
            total: search_page.total,
            next_cursor: search_page.next_cursor,
            items,
        })
    }

    /// Computes the configured facets under a filter.
    pub fn facets(
        &self,
        project_id: &str,
        filter: Option<&FilterGroup>,
    ) -> Result<BTreeMap<String, Vec<FacetBucket>>> {
        let index = self.open_index(project_id)?;
        aggregate(&index, filter, &self.facet_settings)
    }

    /// Fetches a single variant row by identifier.
    pub async fn get_variant(&self, project_id: &str, variant_id: &str) -> Result<VariantRecord> {
        self.columnar.get_variant(project_id, variant_id).await
    }

    /// Fetches the rows for an explicit identifier list, e.g. an export.
    pub async fn fetch_by_ids(
        &self,
        project_id: &str,
        ids: &[String],
    ) -> Result<Vec<VariantRecord>> {
        self.columnar.fetch_by_ids(project_id, ids).await
    }
}
