//! Query side of the variant store.
//!
//! A caller-supplied filter tree compiles to a native search query, runs
//! against the per-project index with cursor pagination under a total
//! order, and the winning identifiers are hydrated from the partitioned
//! Parquet store. Facets are terms aggregations over the same compiled
//! filter.

#![warn(missing_docs)]

pub mod compiler;
pub mod cursor;
pub mod executor;
pub mod facets;
pub mod hydrate;
pub mod service;

pub use compiler::compile;
pub use cursor::{Cursor, SortValue};
pub use executor::{execute_filter, SearchPage};
pub use facets::{aggregate, FacetBucket};
pub use hydrate::ColumnarStore;
pub use service::{QueryService, VariantPage};
