//! Data model shared by the columnar store and the search sink.
//!
//! A [`VariantRecord`] is the authoritative, full-attribute row written to
//! the columnar store. A [`SearchDocument`] is the lean projection indexed
//! by the search sink; both carry the same derived `variant_id`, and the
//! search sink can always be rebuilt from the columnar store (it is never
//! the source of truth).

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// The reserved INFO key carrying consequence annotations.
pub const CSQ_KEY: &str = "CSQ";

/// CSQ sub-field holding the gene symbol.
pub const CSQ_SYMBOL: &str = "SYMBOL";
/// CSQ sub-field holding the predicted consequence.
pub const CSQ_CONSEQUENCE: &str = "Consequence";
/// CSQ sub-field holding the impact classification.
pub const CSQ_IMPACT: &str = "IMPACT";

/// An insertion-ordered mapping from annotation field name to optional
/// value.
///
/// Key order follows the header-declared annotation layout, and the map
/// serializes as a JSON object in that order. Values are `None` when the
/// annotation entry had no value at that position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CsqMap(pub Vec<(String, Option<String>)>);

impl CsqMap {
    /// Looks up an annotation value by field name.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(name, _)| name == field)
            .and_then(|(_, value)| value.as_deref())
    }

    /// The annotation field names, in header-declared order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(name, _)| name.as_str())
    }
}

impl Serialize for CsqMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, value) in &self.0 {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for CsqMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct CsqMapVisitor;

        impl<'de> Visitor<'de> for CsqMapVisitor {
            type Value = CsqMap;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of annotation field names to optional values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((name, value)) = access.next_entry::<String, Option<String>>()? {
                    entries.push((name, value));
                }
                Ok(CsqMap(entries))
            }
        }

        deserializer.deserialize_map(CsqMapVisitor)
    }
}

/// The authoritative variant row persisted in the columnar store.
///
/// Immutable once written: there is no in-place update path, and
/// re-ingesting a variant with the same identifier appends a second
/// physical row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantRecord {
    /// Owning project.
    pub project_id: String,
    /// Chromosome name as it appears in the source.
    pub chrom: String,
    /// 1-based variant position.
    pub pos: u32,
    /// Reference allele.
    #[serde(rename = "ref")]
    pub ref_allele: String,
    /// Alternate allele (single-ALT simplification: the first one).
    #[serde(rename = "alt")]
    pub alt_allele: String,
    /// Derived identifier, `lowercase("{chrom}:{pos}:{ref}>{alt}")`.
    pub variant_id: String,
    /// Source identifier column; `None` when the source marks `"."`.
    pub rsid: Option<String>,
    /// Quality score; `None` when the source marks `"."` or is empty.
    pub qual: Option<f64>,
    /// Raw filter-status token.
    pub filters: String,
    /// Annotation values keyed by header-declared field name.
    pub csq: CsqMap,
    /// Ingestion-time partition key, `YYYY_MM`.
    pub year_month: String,
}

/// The annotation projection indexed for a search document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CsqProjection {
    /// Gene symbol.
    pub symbol: Option<String>,
    /// Predicted consequence term.
    pub consequence: Option<String>,
    /// Impact classification.
    pub impact: Option<String>,
}

/// The lean document written to the search sink.
///
/// `variant_id` is the document's unique key, which makes re-indexing
/// idempotent (last write wins). The `clinvar` and `population` groups are
/// placeholders for later enrichment passes and are absent at ingestion
/// time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchDocument {
    /// Unique document key, shared with the columnar row.
    pub variant_id: String,
    /// Chromosome name.
    pub chrom: String,
    /// 1-based variant position.
    pub pos: u32,
    /// Indexed annotation fields.
    pub csq: CsqProjection,
    /// Reserved for clinical-significance enrichment.
    #[serde(default)]
    pub clinvar: serde_json::Map<String, serde_json::Value>,
    /// Reserved for population-frequency enrichment.
    #[serde(default)]
    pub population: serde_json::Map<String, serde_json::Value>,
}

impl SearchDocument {
    /// Projects a search document out of an authoritative record.
    pub fn from_record(record: &VariantRecord) -> Self {
        SearchDocument {
            variant_id: record.variant_id.clone(),
            chrom: record.chrom.clone(),
            pos: record.pos,
            csq: CsqProjection {
                symbol: record.csq.get(CSQ_SYMBOL).map(str::to_string),
                consequence: record.csq.get(CSQ_CONSEQUENCE).map(str::to_string),
                impact: record.csq.get(CSQ_IMPACT).map(str::to_string),
            },
            clinvar: serde_json::Map::new(),
            population: serde_json::Map::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_csq() -> CsqMap {
        CsqMap(vec![
            ("Allele".to_string(), Some("T".to_string())),
            (
                "Consequence".to_string(),
                Some("missense_variant".to_string()),
            ),
            ("IMPACT".to_string(), Some("MODERATE".to_string())),
            ("SYMBOL".to_string(), None),
        ])
    }

    #[test]
    fn test_csq_map_preserves_order() {
        let csq = sample_csq();
        let names: Vec<&str> = csq.field_names().collect();
        assert_eq!(names, vec!["Allele", "Consequence", "IMPACT", "SYMBOL"]);
    }

    #[test]
    fn test_csq_map_serde_round_trip() {
        let csq = sample_csq();
        let json = serde_json::to_string(&csq).unwrap();
        assert_eq!(
            json,
            r#"{"Allele":"T","Consequence":"missense_variant","IMPACT":"MODERATE","SYMBOL":null}"#
        );
        let back: CsqMap = serde_json::from_str(&json).unwrap();
        assert_eq!(csq, back);
    }

    #[test]
    fn test_search_document_projection() {
        let record = VariantRecord {
            project_id: "p1".to_string(),
            chrom: "chr1".to_string(),
            pos: 100,
            ref_allele: "A".to_string(),
            alt_allele: "T".to_string(),
            variant_id: "chr1:100:a>t".to_string(),
            rsid: None,
            qual: Some(30.0),
            filters: "PASS".to_string(),
            csq: sample_csq(),
            year_month: "2026_08".to_string(),
        };
        let doc = SearchDocument::from_record(&record);
        assert_eq!(doc.variant_id, "chr1:100:a>t");
        assert_eq!(doc.csq.consequence.as_deref(), Some("missense_variant"));
        assert_eq!(doc.csq.impact.as_deref(), Some("MODERATE"));
        assert_eq!(doc.csq.symbol, None);
        assert!(doc.clinvar.is_empty());
    }
}
