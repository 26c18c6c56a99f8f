//! Export rendering.

use variantstore_core::VariantRecord;

const CSV_COLUMNS: &[&str] = &[
    "variant_id",
    "chrom",
    "pos",
    "ref",
    "alt",
    "rsid",
    "qual",
    "filters",
    "csq",
    "project_id",
    "year_month",
];

fn csv_escape(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Renders rows as CSV. Nested annotation values are carried as one JSON
/// object column.
pub fn render_csv(records: &[VariantRecord]) -> String {
    let mut out = String::new();
    out.push_str(&CSV_COLUMNS.join(","));
    out.push('\n');
    for record in records {
        let csq = serde_json::to_string(&record.csq).unwrap_or_else(|_| "{}".to_string());
        let fields = [
            csv_escape(&record.variant_id),
            csv_escape(&record.chrom),
            record.pos.to_string(),
            csv_escape(&record.ref_allele),
            csv_escape(&record.alt_allele),
            record.rsid.as_deref().map(csv_escape).unwrap_or_default(),
            record.qual.map(|q| q.to_string()).unwrap_or_default(),
            csv_escape(&record.filters),
            csv_escape(&csq),
            csv_escape(&record.project_id),
            csv_escape(&record.year_month),
        ];
        out.push_str(&fields.join(","));
        out.push('\n');
    }
    out
}
