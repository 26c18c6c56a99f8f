//! Conversion of raw VCF data lines into canonical record/document pairs.
//!
//! Row-level parse failures are isolated into a [`RowOutcome`] instead of
//! aborting the scan; the pipeline decides whether the run proceeds based
//! on its configured error budget.

use variantstore_core::model::CSQ_KEY;
use variantstore_core::{derive_variant_id, SearchDocument, VariantRecord};

use noodles_vcf as vcf;
use noodles_vcf::variant::record::info::field::{value::Array as ValueArray, Value};
use noodles_vcf::variant::record::{AlternateBases as _, Filters as _, Ids as _};

use crate::csq::CsqSchema;

/// One parsed data line: the authoritative record plus its search
/// projection.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedVariant {
    /// Row for the columnar store.
    pub record: VariantRecord,
    /// Document for the search sink.
    pub document: SearchDocument,
}

/// The outcome of parsing a single data line.
#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    /// The line parsed cleanly.
    Parsed(Box<ParsedVariant>),
    /// The line could not be parsed; the reason is kept for the error
    /// budget and the run log.
    Skipped {
        /// 1-based data-row ordinal within the source.
        row: u64,
        /// Parse failure description.
        reason: String,
    },
}

/// Run-constant inputs shared by every parsed row.
#[derive(Debug, Clone)]
pub struct ParseContext {
    /// Owning project.
    pub project_id: String,
    /// Ingestion month, `YYYY_MM`.
    pub year_month: String,
}

fn skipped(row: u64, reason: impl Into<String>) -> RowOutcome {
    RowOutcome::Skipped {
        row,
        reason: reason.into(),
    }
}

/// Parses one data line into a [`ParsedVariant`].
///
/// Semantics: 1-based position must parse; the first alternate allele is
/// used (single-ALT simplification); a source identifier of `"."` maps to
/// no rsid; quality `"."`/empty maps to `None`; only the first
/// comma-separated CSQ entry is bound, positionally, against the
/// header-declared field order.
pub fn parse_record(
    record: &vcf::Record,
    header: &vcf::Header,
    schema: &CsqSchema,
    ctx: &ParseContext,
    row: u64,
) -> RowOutcome {
    let chrom = record.reference_sequence_name().to_string();

    let pos = match record.variant_start() {
        Some(Ok(position)) => match u32::try_from(position.get()) {
            Ok(pos) => pos,
            Err(_) => return skipped(row, format!("position {} out of range", position)),
        },
        Some(Err(e)) => return skipped(row, format!("invalid position: {}", e)),
        None => return skipped(row, "missing position"),
    };

    let ref_allele = record.reference_bases().to_string();

    let alt_allele = match record.alternate_bases().iter().next() {
        Some(Ok(alt)) => alt.to_string(),
        Some(Err(e)) => return skipped(row, format!("invalid alternate allele: {}", e)),
        None => return skipped(row, "missing alternate allele"),
    };

    let rsid = record.ids().iter().next().map(str::to_string);

    let qual = match record.quality_score().transpose() {
        Ok(value) => value.map(f64::from),
        Err(e) => return skipped(row, format!("invalid quality score: {}", e)),
    };

    let filters: String = {
        let filters = record.filters();
        let raw: Vec<&str> = filters
            .iter(header)
            .map(|result| result.unwrap_or("."))
            .collect();
        raw.join(";")
    };

    let csq = match first_csq_entry(record, header) {
        Ok(Some(entry)) => schema.zip_entry(&entry),
        Ok(None) => schema.empty_map(),
        Err(reason) => return skipped(row, reason),
    };

    let variant_id = derive_variant_id(&chrom, pos, &ref_allele, &alt_allele);

    let record = VariantRecord {
        project_id: ctx.project_id.clone(),
        chrom,
        pos,
        ref_allele,
        alt_allele,
        variant_id,
        rsid,
        qual,
        filters,
        csq,
        year_month: ctx.year_month.clone(),
    };
    let document = SearchDocument::from_record(&record);

    RowOutcome::Parsed(Box::new(ParsedVariant { record, document }))
}

/// Extracts the first comma-separated CSQ entry from the INFO blob, or
/// `None` when the record carries no annotation.
fn first_csq_entry(
    record: &vcf::Record,
    header: &vcf::Header,
) -> std::result::Result<Option<String>, String> {
    let info = record.info();
    for result in info.iter(header) {
        let (key, value) = match result {
            Ok(entry) => entry,
            Err(e) => return Err(format!("invalid INFO field: {}", e)),
        };
        if key != CSQ_KEY {
            continue;
        }
        return match value {
            Some(Value::String(s)) => Ok(s.split(',').next().map(str::to_string)),
            Some(Value::Array(ValueArray::String(values))) => match values.iter().next() {
                Some(Ok(Some(entry))) => Ok(Some(entry.to_string())),
                Some(Err(e)) => Err(format!("invalid {} value: {}", CSQ_KEY, e)),
                _ => Ok(None),
            },
            _ => Ok(None),
        };
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "\
##fileformat=VCFv4.3
##INFO=<ID=DP,Number=1,Type=Integer,Description=\"Depth\">
##INFO=<ID=CSQ,Number=.,Type=String,Description=\"VEP. Format: Allele|Consequence|IMPACT\">
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO
";

    fn parse_line(line: &str) -> (vcf::Header, CsqSchema, RowOutcome) {
        let source = format!("{}{}\n", HEADER, line);
        let mut reader = vcf::io::Reader::new(source.as_bytes());
        let header = reader.read_header().unwrap();
        let schema = CsqSchema::from_header(&header).unwrap();
        let record = reader
            .records()
            .next()
            .expect("one data line")
            .expect("line reads");
        let ctx = ParseContext {
            project_id: "p1".to_string(),
            year_month: "2026_08".to_string(),
        };
        let outcome = parse_record(&record, &header, &schema, &ctx, 1);
        (header, schema, outcome)
    }

    fn parsed(outcome: RowOutcome) -> ParsedVariant {
        match outcome {
            RowOutcome::Parsed(pv) => *pv,
            RowOutcome::Skipped { reason, .. } => panic!("unexpected skip: {}", reason),
        }
    }

    #[test]
    fn test_parse_basic_line() {
        let (_, _, outcome) =
            parse_line("chr1\t100\t.\tA\tT\t30\tPASS\tCSQ=T|missense_variant|MODERATE");
        let pv = parsed(outcome);
        assert_eq!(pv.record.variant_id, "chr1:100:a>t");
        assert_eq!(pv.record.chrom, "chr1");
        assert_eq!(pv.record.pos, 100);
        assert_eq!(pv.record.rsid, None);
        assert_eq!(pv.record.qual, Some(30.0));
        assert_eq!(pv.record.filters, "PASS");
        assert_eq!(pv.record.csq.get("Consequence"), Some("missense_variant"));
        assert_eq!(pv.document.variant_id, pv.record.variant_id);
        assert_eq!(
            pv.document.csq.consequence.as_deref(),
            Some("missense_variant")
        );
        assert_eq!(pv.document.csq.impact.as_deref(), Some("MODERATE"));
    }

    #[test]
    fn test_parse_keeps_rsid_and_missing_qual() {
        let (_, _, outcome) = parse_line("chr2\t55\trs42\tG\tC\t.\tPASS\tCSQ=C|stop_gained|HIGH");
        let pv = parsed(outcome);
        assert_eq!(pv.record.rsid.as_deref(), Some("rs42"));
        assert_eq!(pv.record.qual, None);
    }

    #[test]
    fn test_parse_uses_first_annotation_entry_only() {
        let (_, _, outcome) = parse_line(
            "chr1\t100\t.\tA\tT\t30\tPASS\tCSQ=T|missense_variant|MODERATE,T|intron_variant|LOW",
        );
        let pv = parsed(outcome);
        assert_eq!(pv.record.csq.get("Consequence"), Some("missense_variant"));
    }

    #[test]
    fn test_parse_uses_first_alternate_allele() {
        let (_, _, outcome) = parse_line("chr1\t100\t.\tA\tT,G\t30\tPASS\tDP=5");
        let pv = parsed(outcome);
        assert_eq!(pv.record.alt_allele, "T");
        assert_eq!(pv.record.variant_id, "chr1:100:a>t");
    }

    #[test]
    fn test_parse_skips_position_beyond_u32() {
        let (_, _, outcome) = parse_line("chr1\t4294967296\t.\tA\tT\t30\tPASS\tDP=5");
        match outcome {
            RowOutcome::Skipped { row, reason } => {
                assert_eq!(row, 1);
                assert!(reason.contains("out of range"), "reason: {}", reason);
            }
            RowOutcome::Parsed(pv) => panic!("truncated position accepted: {}", pv.record.pos),
        }
    }

    #[test]
    fn test_parse_without_annotation_blob() {
        let (_, schema, outcome) = parse_line("chr1\t100\t.\tA\tT\t30\tPASS\tDP=5");
        let pv = parsed(outcome);
        assert_eq!(pv.record.csq, schema.empty_map());
        assert_eq!(pv.document.csq.consequence, None);
    }
}
