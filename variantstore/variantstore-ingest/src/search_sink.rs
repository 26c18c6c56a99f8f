//! Search sink: a per-project tantivy index keyed by variant identity.
//!
//! The index holds the query projection only; the Parquet store stays
//! authoritative. All string fields are raw (untokenized) and fast so the
//! query side can filter, sort and facet on them directly.

use std::fs;
use std::path::Path;

use log::debug;
use tantivy::directory::MmapDirectory;
use tantivy::schema::{Field, Schema, FAST, INDEXED, STORED, STRING};
use tantivy::{Index, IndexWriter, TantivyDocument, Term};

use variantstore_core::{Result, SearchDocument, VariantStoreError};

/// Heap given to the index writer for one upsert batch.
const WRITER_HEAP_BYTES: usize = 50_000_000;

/// Builds the variant document mapping.
///
/// `clinvar.*` and `population.*` fields are part of the mapping from the
/// start so later enrichment passes can fill them without reindexing.
pub fn variant_index_schema() -> Schema {
    let mut builder = Schema::builder();
    builder.add_text_field("variant_id", STRING | FAST | STORED);
    builder.add_text_field("chrom", STRING | FAST);
    builder.add_u64_field("pos", INDEXED | FAST);
    builder.add_text_field("csq.symbol", STRING | FAST);
    builder.add_text_field("csq.consequence", STRING | FAST);
    builder.add_text_field("csq.impact", STRING | FAST);
    builder.add_text_field("clinvar.clinsig", STRING | FAST);
    builder.add_text_field("clinvar.review_status", STRING | FAST);
    builder.add_f64_field("population.gnomad_af", INDEXED | FAST);
    builder.add_f64_field("population.gnomad_popmax_af", INDEXED | FAST);
    builder.add_text_field("population.gnomad_popmax_pop", STRING | FAST);
    builder.build()
}

struct VariantFields {
    variant_id: Field,
    chrom: Field,
    pos: Field,
    csq_symbol: Field,
    csq_consequence: Field,
    csq_impact: Field,
    clinvar_clinsig: Field,
    clinvar_review_status: Field,
    population_gnomad_af: Field,
    population_gnomad_popmax_af: Field,
    population_gnomad_popmax_pop: Field,
}

fn store_err(e: impl std::fmt::Display) -> VariantStoreError {
    VariantStoreError::Store(e.to_string())
}

impl VariantFields {
    fn resolve(schema: &Schema) -> Result<Self> {
        Ok(VariantFields {
            variant_id: schema.get_field("variant_id").map_err(store_err)?,
            chrom: schema.get_field("chrom").map_err(store_err)?,
            pos: schema.get_field("pos").map_err(store_err)?,
            csq_symbol: schema.get_field("csq.symbol").map_err(store_err)?,
            csq_consequence: schema.get_field("csq.consequence").map_err(store_err)?,
            csq_impact: schema.get_field("csq.impact").map_err(store_err)?,
            clinvar_clinsig: schema.get_field("clinvar.clinsig").map_err(store_err)?,
            clinvar_review_status: schema
                .get_field("clinvar.review_status")
                .map_err(store_err)?,
            population_gnomad_af: schema
                .get_field("population.gnomad_af")
                .map_err(store_err)?,
            population_gnomad_popmax_af: schema
                .get_field("population.gnomad_popmax_af")
                .map_err(store_err)?,
            population_gnomad_popmax_pop: schema
                .get_field("population.gnomad_popmax_pop")
                .map_err(store_err)?,
        })
    }
}

/// One project's search index, opened at a fixed directory.
pub struct SearchIndex {
    index: Index,
    fields: VariantFields,
}

impl SearchIndex {
    /// Opens the index at `dir`, creating it with the variant mapping
    /// when the directory is empty.
    pub fn open_or_create<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        let directory = MmapDirectory::open(dir).map_err(store_err)?;
        let index = Index::open_or_create(directory, variant_index_schema()).map_err(store_err)?;
        let fields = VariantFields::resolve(&index.schema())?;
        debug!("search index ready at {}", dir.display());
        Ok(SearchIndex { index, fields })
    }

    /// The underlying tantivy index, for the query side.
    pub fn index(&self) -> &Index {
        &self.index
    }

    /// Upserts a batch: for each document the previous version (same
    /// `variant_id`) is deleted before the new one is added, then the
    /// batch is committed.
    ///
    /// # Errors
    ///
    /// A writer failure surfaces as [`VariantStoreError::SearchWrite`]
    /// carrying every identifier of the batch; nothing is retried here.
    pub fn upsert_batch(&self, documents: &[SearchDocument]) -> Result<()> {
        if documents.is_empty() {
            return Ok(());
        }
        let batch_ids = || documents.iter().map(|d| d.variant_id.clone()).collect();
        let write_err = |e: tantivy::TantivyError| VariantStoreError::SearchWrite {
            ids: batch_ids(),
            message: e.to_string(),
        };

        let mut writer: IndexWriter = self.index.writer(WRITER_HEAP_BYTES).map_err(write_err)?;
        for document in documents {
            writer.delete_term(Term::from_field_text(
                self.fields.variant_id,
                &document.variant_id,
            ));
            writer.add_document(self.build_document(document)).map_err(write_err)?;
        }
        writer.commit().map_err(write_err)?;
        debug!("upserted {} search documents", documents.len());
        Ok(())
    }

    fn build_document(&self, document: &SearchDocument) -> TantivyDocument {
        let mut doc = TantivyDocument::new();
        doc.add_text(self.fields.variant_id, &document.variant_id);
        doc.add_text(self.fields.chrom, &document.chrom);
        doc.add_u64(self.fields.pos, u64::from(document.pos));
        if let Some(symbol) = &document.csq.symbol {
            doc.add_text(self.fields.csq_symbol, symbol);
        }
        if let Some(consequence) = &document.csq.consequence {
            doc.add_text(self.fields.csq_consequence, consequence);
        }
        if let Some(impact) = &document.csq.impact {
            doc.add_text(self.fields.csq_impact, impact);
        }
        if let Some(clinsig) = document.clinvar.get("clinsig").and_then(|v| v.as_str()) {
            doc.add_text(self.fields.clinvar_clinsig, clinsig);
        }
        if let Some(status) = document
            .clinvar
            .get("review_status")
            .and_then(|v| v.as_str())
        {
            doc.add_text(self.fields.clinvar_review_status, status);
        }
        if let Some(af) = document.population.get("gnomad_af").and_then(|v| v.as_f64()) {
            doc.add_f64(self.fields.population_gnomad_af, af);
        }
        if let Some(af) = document
            .population
            .get("gnomad_popmax_af")
            .and_then(|v| v.as_f64())
        {
            doc.add_f64(self.fields.population_gnomad_popmax_af, af);
        }
        if let Some(pop) = document
            .population
            .get("gnomad_popmax_pop")
            .and_then(|v| v.as_str())
        {
            doc.add_text(self.fields.population_gnomad_popmax_pop, pop);
        }
        doc
    }

    /// Every live variant identifier in the index, gathered from the
    /// per-segment fast fields. Used by the reconciliation pass.
    pub fn all_variant_ids(&self) -> Result<Vec<String>> {
        let reader = self.index.reader().map_err(store_err)?;
        let searcher = reader.searcher();
        let mut ids = Vec::new();
        let mut bytes = Vec::new();
        for segment_reader in searcher.segment_readers() {
            let Some(column) = segment_reader
                .fast_fields()
                .str("variant_id")
                .map_err(store_err)?
            else {
                continue;
            };
            for doc_id in segment_reader.doc_ids_alive() {
                if let Some(ord) = column.term_ords(doc_id).next() {
                    bytes.clear();
                    if column.ord_to_bytes(ord, &mut bytes).map_err(store_err)? {
                        ids.push(String::from_utf8_lossy(&bytes).into_owned());
                    }
                }
            }
        }
        Ok(ids)
    }
}
