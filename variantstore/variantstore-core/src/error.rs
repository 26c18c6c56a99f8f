//! Shared error taxonomy.
//!
//! Parsing and sink failures are run-fatal for an ingestion job; query
//! compilation and lookup failures are per-request and leave all other
//! state untouched. Engine errors (Arrow, DataFusion, tantivy) are carried
//! as messages so this leaf crate stays free of heavyweight dependencies.

use thiserror::Error;

/// Convenience alias used across the workspace.
pub type Result<T> = std::result::Result<T, VariantStoreError>;

/// Everything that can go wrong in the variant store.
#[derive(Debug, Error)]
pub enum VariantStoreError {
    /// The source header carries no annotation layout declaration; without
    /// it annotation values cannot be positionally mapped. Fatal for the
    /// ingestion run.
    #[error("malformed VCF header: {0}")]
    MalformedHeader(String),

    /// A data row could not be parsed and the configured error budget is
    /// exhausted. Fatal for the ingestion run.
    #[error("malformed record at row {row}: {reason}")]
    MalformedRecord {
        /// 1-based data-row ordinal within the source.
        row: u64,
        /// Human-readable parse failure.
        reason: String,
    },

    /// The columnar store rejected a batch write. The in-flight batch is
    /// aborted before the search sink is touched.
    #[error("columnar sink write failed: {0}")]
    ColumnarWrite(String),

    /// The search sink rejected part or all of an upsert batch. The
    /// columnar write is not rolled back; retry policy is the caller's.
    #[error("search sink write failed for {} document(s)", ids.len())]
    SearchWrite {
        /// Identifiers of the documents that were not indexed.
        ids: Vec<String>,
        /// Underlying sink message.
        message: String,
    },

    /// A filter clause uses an operator outside the supported set.
    #[error("unsupported filter operator: {0}")]
    UnsupportedOperator(String),

    /// A filter or sort references a field that is not indexed.
    #[error("unknown field: {0}")]
    UnknownField(String),

    /// A filter clause operand does not fit the field it targets (wrong
    /// JSON type, or a list where a scalar is required).
    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    /// The supplied pagination cursor could not be decoded.
    #[error("invalid cursor: {0}")]
    InvalidCursor(String),

    /// A single-row lookup matched no identifier.
    #[error("variant not found: {0}")]
    NotFound(String),

    /// Underlying store or index failure outside a batch write.
    #[error("store error: {0}")]
    Store(String),

    /// Source file I/O failure.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl VariantStoreError {
    /// True for errors that identify a caller mistake rather than a store
    /// failure (used by the HTTP layer for status mapping).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            VariantStoreError::UnsupportedOperator(_)
                | VariantStoreError::UnknownField(_)
                | VariantStoreError::InvalidFilter(_)
                | VariantStoreError::InvalidCursor(_)
                | VariantStoreError::NotFound(_)
        )
    }
}
