//! Client-facing filter, paging and sort request types.
//!
//! A filter is a recursively composable boolean expression tree over
//! indexed fields. Clause operators are kept as raw strings so that an
//! unknown operator surfaces as an [`UnsupportedOperator`] error at
//! compilation time, with the offending operator named, rather than as an
//! opaque deserialization failure.
//!
//! [`UnsupportedOperator`]: crate::error::VariantStoreError::UnsupportedOperator

use serde::{Deserialize, Serialize};

/// Upper bound on a single result page.
pub const MAX_PAGE_SIZE: usize = 200;
/// Page size used when the caller does not specify one.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// A single predicate over one indexed field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterClause {
    /// Indexed field name, e.g. `"csq.consequence"`.
    pub field: String,
    /// Operator: one of `eq`, `in`, `lt`, `lte`, `gt`, `gte`, `match`.
    pub op: String,
    /// Scalar operand, or a list for `in`.
    pub value: serde_json::Value,
}

/// Boolean combinator for a filter group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupOp {
    /// Conjunction: every operand is required.
    #[serde(rename = "AND", alias = "and")]
    And,
    /// Disjunction: at least one operand is required.
    #[serde(rename = "OR", alias = "or")]
    Or,
}

/// A recursively composable boolean filter tree.
///
/// A group with no clauses and no sub-groups compiles to "match
/// everything", never to "match nothing".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterGroup {
    /// Boolean combinator applied to the clauses and sub-groups.
    pub op: GroupOp,
    /// Leaf predicates, in insertion order.
    #[serde(default)]
    pub clauses: Vec<FilterClause>,
    /// Nested groups, in insertion order.
    #[serde(default)]
    pub groups: Vec<FilterGroup>,
}

impl FilterGroup {
    /// True when the group constrains nothing at any depth.
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty() && self.groups.iter().all(FilterGroup::is_empty)
    }
}

/// Sort direction for one sort field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Ascending.
    #[default]
    Asc,
    /// Descending.
    Desc,
}

/// One element of a caller-supplied sort.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortField {
    /// Indexed field name.
    pub field: String,
    /// Direction; ascending when omitted.
    #[serde(default)]
    pub order: SortOrder,
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

/// Cursor-based page request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Requested page size; clamped to `[1, MAX_PAGE_SIZE]` by the
    /// executor.
    #[serde(default = "default_page_size")]
    pub size: usize,
    /// Opaque resume token from the previous page, if any.
    #[serde(default)]
    pub cursor: Option<String>,
}

impl Default for PageRequest {
    fn default() -> Self {
        PageRequest {
            size: DEFAULT_PAGE_SIZE,
            cursor: None,
        }
    }
}
