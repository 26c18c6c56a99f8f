//! Pagination cursors.
//!
//! A cursor is the typed sort-key tuple of the last hit of the previous
//! page, JSON-encoded. It is opaque to callers and only meaningful for
//! the same filter and sort it was produced under.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use variantstore_core::filter::{SortField, SortOrder};
use variantstore_core::{Result, VariantStoreError};

/// One harvested sort-key component.
///
/// The ordering is total: within a type it is the natural order (floats
/// via `total_cmp`), across types missing values sort first and the
/// remaining kinds by a fixed rank. Mixed kinds only occur when a field
/// is absent from a document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", content = "v", rename_all = "lowercase")]
pub enum SortValue {
    /// Field absent from the document.
    Null,
    /// Unsigned integer component.
    U64(u64),
    /// Float component.
    F64(f64),
    /// String component.
    Str(String),
}

impl SortValue {
    fn rank(&self) -> u8 {
        match self {
            SortValue::Null => 0,
            SortValue::U64(_) => 1,
            SortValue::F64(_) => 2,
            SortValue::Str(_) => 3,
        }
    }
}

impl Ord for SortValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (SortValue::Null, SortValue::Null) => Ordering::Equal,
            (SortValue::U64(a), SortValue::U64(b)) => a.cmp(b),
            (SortValue::F64(a), SortValue::F64(b)) => a.total_cmp(b),
            (SortValue::Str(a), SortValue::Str(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for SortValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for SortValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SortValue {}

/// Compares two key tuples under the effective sort directions.
pub fn compare_keys(a: &[SortValue], b: &[SortValue], sort: &[SortField]) -> Ordering {
    for (i, spec) in sort.iter().enumerate() {
        let ordering = match (a.get(i), b.get(i)) {
            (Some(x), Some(y)) => x.cmp(y),
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
        };
        let ordering = match spec.order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// Resume token: the sort-key tuple of the last returned hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cursor {
    /// Key components, one per effective sort field.
    pub keys: Vec<SortValue>,
}

impl Cursor {
    /// Encodes the cursor into its opaque wire form.
    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| VariantStoreError::InvalidCursor(e.to_string()))
    }

    /// Decodes a caller-supplied cursor.
    ///
    /// # Errors
    ///
    /// Returns [`VariantStoreError::InvalidCursor`] for anything that is
    /// not a cursor this store produced.
    pub fn decode(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| VariantStoreError::InvalidCursor(e.to_string()))
    }
}
