//! Core types for the variant store
//!
//! This crate is the leaf of the workspace: it defines the data model shared
//! by the ingestion pipeline and the query layer, the derived variant
//! identity, the client-facing filter vocabulary, the error taxonomy and the
//! store configuration. It has no I/O of its own.
//!
//! ## Modules
//!
//! - [`identity`]: deterministic variant key derivation
//! - [`model`]: `VariantRecord` (columnar, authoritative) and
//!   `SearchDocument` (search sink projection)
//! - [`filter`]: nested boolean filter trees, paging and sort requests
//! - [`error`]: the shared error enum
//! - [`config`]: store layout and facet configuration

#![warn(missing_docs)]

/// Store layout and facet configuration.
pub mod config;
/// Shared error taxonomy.
pub mod error;
/// Client-facing filter, paging and sort request types.
pub mod filter;
/// Deterministic variant key derivation.
pub mod identity;
/// Authoritative record and search document model.
pub mod model;

pub use error::{Result, VariantStoreError};
pub use identity::derive_variant_id;
pub use model::{CsqMap, SearchDocument, VariantRecord};
