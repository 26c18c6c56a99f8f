//! Filter tree to search query compilation.
//!
//! The filter tree compiles recursively: AND groups put every operand
//! under `Must`, OR groups under `Should` (a boolean query whose clauses
//! are all `Should` requires at least one of them to match). Terms are
//! typed from the index schema, so an operand that does not fit its
//! field fails the whole request; there is no partial compilation.

use std::ops::Bound;

use serde_json::Value as JsonValue;
use tantivy::query::{
    AllQuery, BooleanQuery, FuzzyTermQuery, Occur, Query, RangeQuery, TermQuery, TermSetQuery,
};
use tantivy::schema::{Field, FieldType, IndexRecordOption, Schema};
use tantivy::Term;

use variantstore_core::filter::{FilterClause, FilterGroup, GroupOp};
use variantstore_core::{Result, VariantStoreError};

/// Edit distance used by the approximate `match` operator.
const MATCH_FUZZY_DISTANCE: u8 = 1;

/// Compiles a filter tree against an index schema.
///
/// An absent or unconstraining filter compiles to match-everything.
pub fn compile(schema: &Schema, filter: Option<&FilterGroup>) -> Result<Box<dyn Query>> {
    match filter {
        Some(group) if !group.is_empty() => compile_group(schema, group),
        _ => Ok(Box::new(AllQuery)),
    }
}

fn compile_group(schema: &Schema, group: &FilterGroup) -> Result<Box<dyn Query>> {
    let occur = match group.op {
        GroupOp::And => Occur::Must,
        GroupOp::Or => Occur::Should,
    };
    // Clauses before sub-groups, both in insertion order, so structurally
    // identical filters always compile to the same query.
    let mut operands: Vec<(Occur, Box<dyn Query>)> = Vec::new();
    for clause in &group.clauses {
        operands.push((occur, compile_clause(schema, clause)?));
    }
    for sub in &group.groups {
        // An unconstraining sub-group matches everything. It has to stay
        // an operand: under OR it widens the match to all documents.
        if sub.is_empty() {
            operands.push((occur, Box::new(AllQuery)));
        } else {
            operands.push((occur, compile_group(schema, sub)?));
        }
    }
    if operands.is_empty() {
        return Ok(Box::new(AllQuery));
    }
    Ok(Box::new(BooleanQuery::new(operands)))
}

fn compile_clause(schema: &Schema, clause: &FilterClause) -> Result<Box<dyn Query>> {
    let field = schema
        .get_field(&clause.field)
        .map_err(|_| VariantStoreError::UnknownField(clause.field.clone()))?;
    let field_type = schema.get_field_entry(field).field_type().clone();

    match clause.op.as_str() {
        "eq" => {
            let term = typed_term(field, &field_type, &clause.value, &clause.field)?;
            Ok(Box::new(TermQuery::new(term, IndexRecordOption::Basic)))
        }
        "in" => {
            let values = clause.value.as_array().ok_or_else(|| {
                VariantStoreError::InvalidFilter(format!(
                    "`in` on {} requires a list operand",
                    clause.field
                ))
            })?;
            let terms = values
                .iter()
                .map(|value| typed_term(field, &field_type, value, &clause.field))
                .collect::<Result<Vec<_>>>()?;
            Ok(Box::new(TermSetQuery::new(terms)))
        }
        "lt" => {
            let term = typed_term(field, &field_type, &clause.value, &clause.field)?;
            Ok(Box::new(RangeQuery::new(Bound::Unbounded, Bound::Excluded(term))))
        }
        "lte" => {
            let term = typed_term(field, &field_type, &clause.value, &clause.field)?;
            Ok(Box::new(RangeQuery::new(Bound::Unbounded, Bound::Included(term))))
        }
        "gt" => {
            let term = typed_term(field, &field_type, &clause.value, &clause.field)?;
            Ok(Box::new(RangeQuery::new(Bound::Excluded(term), Bound::Unbounded)))
        }
        "gte" => {
            let term = typed_term(field, &field_type, &clause.value, &clause.field)?;
            Ok(Box::new(RangeQuery::new(Bound::Included(term), Bound::Unbounded)))
        }
        // Approximate by contract: fuzzy single-term match over the raw
        // (untokenized) field.
        "match" => {
            if !matches!(field_type, FieldType::Str(_)) {
                return Err(VariantStoreError::InvalidFilter(format!(
                    "`match` on non-string field {}",
                    clause.field
                )));
            }
            let needle = clause.value.as_str().ok_or_else(|| {
                VariantStoreError::InvalidFilter(format!(
                    "`match` on {} requires a string operand",
                    clause.field
                ))
            })?;
            Ok(Box::new(FuzzyTermQuery::new(
                Term::from_field_text(field, needle),
                MATCH_FUZZY_DISTANCE,
                true,
            )))
        }
        other => Err(VariantStoreError::UnsupportedOperator(other.to_string())),
    }
}

fn typed_term(
    field: Field,
    field_type: &FieldType,
    value: &JsonValue,
    field_name: &str,
) -> Result<Term> {
    let term = match field_type {
        FieldType::Str(_) => value.as_str().map(|s| Term::from_field_text(field, s)),
        FieldType::U64(_) => value.as_u64().map(|v| Term::from_field_u64(field, v)),
        FieldType::F64(_) => value.as_f64().map(|v| Term::from_field_f64(field, v)),
        _ => None,
    };
    term.ok_or_else(|| {
        VariantStoreError::InvalidFilter(format!(
            "operand {} does not fit field {}",
            value, field_name
        ))
    })
}
