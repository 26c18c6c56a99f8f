//! Store layout and facet configuration.
//!
//! Store clients are constructed once at process start from this
//! configuration and passed into each component; there is no lazily
//! initialized process-wide connection state.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Default search index name prefix.
pub const DEFAULT_INDEX_NAME: &str = "variants";

/// Filesystem layout of the two sinks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Root directory of the partitioned Parquet store.
    pub data_root: PathBuf,
    /// Root directory under which per-project search indexes live.
    pub index_root: PathBuf,
    /// Index name prefix; a project's index directory is
    /// `{index_root}/{index_name}-{project_id}` lowercased.
    pub index_name: String,
}

impl StoreConfig {
    /// Builds a configuration with the default index name.
    pub fn new(data_root: impl Into<PathBuf>, index_root: impl Into<PathBuf>) -> Self {
        StoreConfig {
            data_root: data_root.into(),
            index_root: index_root.into(),
            index_name: DEFAULT_INDEX_NAME.to_string(),
        }
    }

    /// Directory holding a project's Parquet partitions.
    pub fn project_data_dir(&self, project_id: &str) -> PathBuf {
        self.data_root.join(project_id)
    }

    /// Directory holding a project's search index.
    pub fn project_index_dir(&self, project_id: &str) -> PathBuf {
        self.index_root
            .join(format!("{}-{}", self.index_name, project_id).to_lowercase())
    }
}

/// One configured facet: a grouped distinct-value count over a declared
/// field, truncated at `cap` terms.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacetSpec {
    /// Facet name in the response, e.g. `"by_gene"`.
    pub name: String,
    /// Indexed field the terms are grouped over.
    pub field: String,
    /// Maximum number of terms returned; terms beyond the cap are
    /// silently omitted.
    pub cap: usize,
}

/// The set of facets computed for a project.
///
/// Caps are a configuration concern, not a per-call parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacetSettings {
    /// Declared facets, in response order.
    pub facets: Vec<FacetSpec>,
}

impl Default for FacetSettings {
    fn default() -> Self {
        FacetSettings {
            facets: vec![
                FacetSpec {
                    name: "by_gene".to_string(),
                    field: "csq.symbol".to_string(),
                    cap: 10_000,
                },
                FacetSpec {
                    name: "by_consequence".to_string(),
                    field: "csq.consequence".to_string(),
                    cap: 10_000,
                },
                FacetSpec {
                    name: "by_clinsig".to_string(),
                    field: "clinvar.clinsig".to_string(),
                    cap: 1_000,
                },
            ],
        }
    }
}
