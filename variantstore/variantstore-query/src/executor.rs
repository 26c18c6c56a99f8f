//! Filter execution with total-order cursor pagination.
//!
//! Matching documents are harvested per segment as (sort-key tuple,
//! variant identifier) pairs read from fast fields, merged, ordered under
//! the effective sort and sliced at the requested page. The effective
//! sort always ends on an ascending `variant_id`, so the order is total
//! and a cursor resumes at exactly one position regardless of ties in
//! the caller's sort fields.

use std::cmp::Ordering;

use tantivy::collector::{Collector, SegmentCollector};
use tantivy::columnar::{Column, StrColumn};
use tantivy::schema::{FieldType, Schema};
use tantivy::{DocId, Index, Score, SegmentOrdinal, SegmentReader};

use variantstore_core::filter::{FilterGroup, PageRequest, SortField, SortOrder, MAX_PAGE_SIZE};
use variantstore_core::{Result, VariantStoreError};

use crate::compiler::compile;
use crate::cursor::{compare_keys, Cursor, SortValue};

/// Field every effective sort ends on.
const TIEBREAKER_FIELD: &str = "variant_id";

/// One page of matching identifiers, in result order.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchPage {
    /// Full match count, independent of pagination.
    pub total: usize,
    /// Resume token for the next page; absent when this page is empty.
    pub next_cursor: Option<String>,
    /// Identifiers of the page's hits.
    pub ids: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
enum FieldKind {
    Str,
    U64,
    F64,
}

fn field_kind(schema: &Schema, name: &str) -> Result<FieldKind> {
    let field = schema
        .get_field(name)
        .map_err(|_| VariantStoreError::UnknownField(name.to_string()))?;
    match schema.get_field_entry(field).field_type() {
        FieldType::Str(_) => Ok(FieldKind::Str),
        FieldType::U64(_) => Ok(FieldKind::U64),
        FieldType::F64(_) => Ok(FieldKind::F64),
        _ => Err(VariantStoreError::UnknownField(name.to_string())),
    }
}

fn store_err(e: impl std::fmt::Display) -> VariantStoreError {
    VariantStoreError::Store(e.to_string())
}

/// Appends the ascending identifier tiebreaker unless the caller's sort
/// already ends on it.
fn effective_sort(sort: &[SortField]) -> Vec<SortField> {
    let mut effective = sort.to_vec();
    let ends_on_id = effective
        .last()
        .is_some_and(|s| s.field == TIEBREAKER_FIELD);
    if !ends_on_id {
        effective.push(SortField {
            field: TIEBREAKER_FIELD.to_string(),
            order: SortOrder::Asc,
        });
    }
    effective
}

enum ColumnReader {
    Str(Option<StrColumn>),
    U64(Option<Column<u64>>),
    F64(Option<Column<f64>>),
}

struct SortKeyCollector {
    fields: Vec<(String, FieldKind)>,
}

struct SortKeySegmentCollector {
    variant_id: Option<StrColumn>,
    columns: Vec<ColumnReader>,
    buf: Vec<u8>,
    hits: Vec<(Vec<SortValue>, String)>,
}

fn read_str(column: &Option<StrColumn>, doc: DocId, buf: &mut Vec<u8>) -> Option<String> {
    let column = column.as_ref()?;
    let ord = column.term_ords(doc).next()?;
    buf.clear();
    match column.ord_to_bytes(ord, buf) {
        Ok(true) => Some(String::from_utf8_lossy(buf).into_owned()),
        _ => None,
    }
}

impl Collector for SortKeyCollector {
    type Fruit = Vec<(Vec<SortValue>, String)>;
    type Child = SortKeySegmentCollector;

    fn for_segment(
        &self,
        _segment_local_id: SegmentOrdinal,
        segment: &SegmentReader,
    ) -> tantivy::Result<Self::Child> {
        let fast = segment.fast_fields();
        let variant_id = fast.str(TIEBREAKER_FIELD)?;
        let mut columns = Vec::with_capacity(self.fields.len());
        for (name, kind) in &self.fields {
            let reader = match kind {
                FieldKind::Str => ColumnReader::Str(fast.str(name)?),
                FieldKind::U64 => ColumnReader::U64(fast.column_opt(name)?),
                FieldKind::F64 => ColumnReader::F64(fast.column_opt(name)?),
            };
            columns.push(reader);
        }
        Ok(SortKeySegmentCollector {
            variant_id,
            columns,
            buf: Vec::new(),
            hits: Vec::new(),
        })
    }

    fn requires_scoring(&self) -> bool {
        false
    }

    fn merge_fruits(&self, segment_fruits: Vec<Self::Fruit>) -> tantivy::Result<Self::Fruit> {
        Ok(segment_fruits.into_iter().flatten().collect())
    }
}

impl SegmentCollector for SortKeySegmentCollector {
    type Fruit = Vec<(Vec<SortValue>, String)>;

    fn collect(&mut self, doc: DocId, _score: Score) {
        let Some(variant_id) = read_str(&self.variant_id, doc, &mut self.buf) else {
            return;
        };
        let mut key = Vec::with_capacity(self.columns.len());
        for column in &self.columns {
            let value = match column {
                ColumnReader::Str(col) => read_str(col, doc, &mut self.buf)
                    .map(SortValue::Str)
                    .unwrap_or(SortValue::Null),
                ColumnReader::U64(col) => col
                    .as_ref()
                    .and_then(|c| c.first(doc))
                    .map(SortValue::U64)
                    .unwrap_or(SortValue::Null),
                ColumnReader::F64(col) => col
                    .as_ref()
                    .and_then(|c| c.first(doc))
                    .map(SortValue::F64)
                    .unwrap_or(SortValue::Null),
            };
            key.push(value);
        }
        self.hits.push((key, variant_id));
    }

    fn harvest(self) -> Self::Fruit {
        self.hits
    }
}

/// Runs a filter and returns one page of identifiers.
///
/// `page.size` is clamped to `[1, 200]`. The cursor must stem from the
/// same sort; a tuple of the wrong width is rejected as
/// [`VariantStoreError::InvalidCursor`].
pub fn execute_filter(
    index: &Index,
    filter: Option<&FilterGroup>,
    sort: &[SortField],
    page: &PageRequest,
) -> Result<SearchPage> {
    let schema = index.schema();
    let query = compile(&schema, filter)?;

    let effective = effective_sort(sort);
    let fields = effective
        .iter()
        .map(|s| Ok((s.field.clone(), field_kind(&schema, &s.field)?)))
        .collect::<Result<Vec<_>>>()?;

    let reader = index.reader().map_err(store_err)?;
    let searcher = reader.searcher();
    let mut hits = searcher
        .search(&query, &SortKeyCollector { fields })
        .map_err(store_err)?;
    let total = hits.len();

    hits.sort_by(|a, b| compare_keys(&a.0, &b.0, &effective));

    let start = match &page.cursor {
        Some(raw) => {
            let cursor = Cursor::decode(raw)?;
            if cursor.keys.len() != effective.len() {
                return Err(VariantStoreError::InvalidCursor(
                    "cursor does not match the requested sort".to_string(),
                ));
            }
            hits.partition_point(|h| {
                compare_keys(&h.0, &cursor.keys, &effective) != Ordering::Greater
            })
        }
        None => 0,
    };

    let size = page.size.clamp(1, MAX_PAGE_SIZE);
    let end = start.saturating_add(size).min(hits.len());
    let start = start.min(hits.len());
    let page_hits = &hits[start..end];

    let next_cursor = match page_hits.last() {
        Some((keys, _)) => Some(Cursor { keys: keys.clone() }.encode()?),
        None => None,
    };
    Ok(SearchPage {
        total,
        next_cursor,
        ids: page_hits.iter().map(|(_, id)| id.clone()).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_sort_appends_tiebreaker() {
        let sort = vec![SortField {
            field: "pos".to_string(),
            order: SortOrder::Desc,
        }];
        let effective = effective_sort(&sort);
        assert_eq!(effective.len(), 2);
        assert_eq!(effective[1].field, "variant_id");
        assert_eq!(effective[1].order, SortOrder::Asc);
    }

    #[test]
    fn test_effective_sort_keeps_trailing_identifier() {
        let sort = vec![SortField {
            field: "variant_id".to_string(),
            order: SortOrder::Desc,
        }];
        assert_eq!(effective_sort(&sort), sort);
    }

    #[test]
    fn test_empty_sort_gets_identifier_only() {
        let effective = effective_sort(&[]);
        assert_eq!(effective.len(), 1);
        assert_eq!(effective[0].field, "variant_id");
    }
}
