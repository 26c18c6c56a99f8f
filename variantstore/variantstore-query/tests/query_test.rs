use std::fs;
use std::path::Path;

use serde_json::json;
use variantstore_core::config::{FacetSettings, FacetSpec, StoreConfig};
use variantstore_core::filter::{FilterGroup, PageRequest, SortField, SortOrder};
use variantstore_core::VariantStoreError;
use variantstore_ingest::{run_ingest, IngestConfig};
use variantstore_query::QueryService;

const VCF_HEADER: &str = "\
##fileformat=VCFv4.3
##INFO=<ID=CSQ,Number=.,Type=String,Description=\"Consequence annotations from Ensembl VEP. Format: Allele|Consequence|IMPACT|SYMBOL\">
##FILTER=<ID=PASS,Description=\"All filters passed\">
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO
";

const DATA_LINES: &[&str] = &[
    "chr1\t100\trs1\tA\tT\t30\tPASS\tCSQ=T|missense_variant|MODERATE|BRCA1",
    "chr1\t200\t.\tG\tC\t25\tPASS\tCSQ=C|stop_gained|HIGH|BRCA1",
    "chr1\t300\t.\tT\tA\t20\tPASS\tCSQ=A|intron_variant|MODIFIER|TP53",
    "chr2\t150\t.\tC\tG\t15\tPASS\tCSQ=G|missense_variant|MODERATE|EGFR",
    "chr2\t250\t.\tA\tG\t10\tPASS\tCSQ=G|synonymous_variant|LOW|EGFR",
];

fn ingest_fixture(dir: &Path) -> StoreConfig {
    let vcf = dir.join("input.vcf");
    let mut content = VCF_HEADER.to_string();
    for line in DATA_LINES {
        content.push_str(line);
        content.push('\n');
    }
    fs::write(&vcf, content).unwrap();
    let store = StoreConfig::new(dir.join("data"), dir.join("index"));
    let config = IngestConfig::new("p1", vcf.to_string_lossy(), store.clone());
    run_ingest(&config).unwrap();
    store
}

fn filter(value: serde_json::Value) -> FilterGroup {
    serde_json::from_value(value).unwrap()
}

#[tokio::test]
async fn test_unfiltered_query_returns_everything() {
    let tmp = tempfile::tempdir().unwrap();
    let service = QueryService::new(ingest_fixture(tmp.path()), FacetSettings::default());

    let page = service
        .filter_query("p1", None, &[], &PageRequest::default())
        .await
        .unwrap();
    assert_eq!(page.total, 5);
    assert_eq!(page.items.len(), 5);
    // Hydrated rows carry the full record.
    let first = &page.items[0];
    assert_eq!(first.variant_id, "chr1:100:a>t");
    assert_eq!(first.rsid.as_deref(), Some("rs1"));
    assert_eq!(first.csq.get("SYMBOL"), Some("BRCA1"));
}

#[tokio::test]
async fn test_empty_filter_equals_no_filter() {
    let tmp = tempfile::tempdir().unwrap();
    let service = QueryService::new(ingest_fixture(tmp.path()), FacetSettings::default());

    let unfiltered = service
        .filter_query("p1", None, &[], &PageRequest::default())
        .await
        .unwrap();
    let empty = filter(json!({"op": "AND"}));
    let filtered = service
        .filter_query("p1", Some(&empty), &[], &PageRequest::default())
        .await
        .unwrap();
    assert_eq!(unfiltered.total, filtered.total);
    let ids = |page: &variantstore_query::VariantPage| -> Vec<String> {
        page.items.iter().map(|r| r.variant_id.clone()).collect()
    };
    assert_eq!(ids(&unfiltered), ids(&filtered));
}

#[tokio::test]
async fn test_nested_filter_narrows_matches() {
    let tmp = tempfile::tempdir().unwrap();
    let service = QueryService::new(ingest_fixture(tmp.path()), FacetSettings::default());

    let tree = filter(json!({
        "op": "AND",
        "clauses": [{"field": "chrom", "op": "eq", "value": "chr1"}],
        "groups": [{
            "op": "OR",
            "clauses": [
                {"field": "csq.impact", "op": "eq", "value": "HIGH"},
                {"field": "csq.impact", "op": "eq", "value": "MODERATE"}
            ]
        }]
    }));
    let page = service
        .filter_query("p1", Some(&tree), &[], &PageRequest::default())
        .await
        .unwrap();
    assert_eq!(page.total, 2);
    let mut ids: Vec<_> = page.items.iter().map(|r| r.variant_id.as_str()).collect();
    ids.sort();
    assert_eq!(ids, vec!["chr1:100:a>t", "chr1:200:g>c"]);
}

#[tokio::test]
async fn test_empty_subgroup_under_or_matches_everything() {
    let tmp = tempfile::tempdir().unwrap();
    let service = QueryService::new(ingest_fixture(tmp.path()), FacetSettings::default());

    // The unconstraining sub-group widens the OR to every document.
    let tree = filter(json!({
        "op": "OR",
        "clauses": [{"field": "chrom", "op": "eq", "value": "chr1"}],
        "groups": [{"op": "AND"}]
    }));
    let page = service
        .filter_query("p1", Some(&tree), &[], &PageRequest::default())
        .await
        .unwrap();
    assert_eq!(page.total, 5);
}

#[tokio::test]
async fn test_range_filter_on_position() {
    let tmp = tempfile::tempdir().unwrap();
    let service = QueryService::new(ingest_fixture(tmp.path()), FacetSettings::default());

    let tree = filter(json!({
        "op": "AND",
        "clauses": [
            {"field": "pos", "op": "gte", "value": 150},
            {"field": "pos", "op": "lt", "value": 300}
        ]
    }));
    let page = service
        .filter_query("p1", Some(&tree), &[], &PageRequest::default())
        .await
        .unwrap();
    let mut ids: Vec<_> = page.items.iter().map(|r| r.variant_id.as_str()).collect();
    ids.sort();
    assert_eq!(ids, vec!["chr1:200:g>c", "chr2:150:c>g", "chr2:250:a>g"]);
}

#[tokio::test]
async fn test_cursor_pagination_visits_every_hit_once() {
    let tmp = tempfile::tempdir().unwrap();
    let service = QueryService::new(ingest_fixture(tmp.path()), FacetSettings::default());

    let mut cursor: Option<String> = None;
    let mut seen: Vec<String> = Vec::new();
    loop {
        let page = service
            .filter_query(
                "p1",
                None,
                &[],
                &PageRequest {
                    size: 2,
                    cursor: cursor.clone(),
                },
            )
            .await
            .unwrap();
        assert_eq!(page.total, 5);
        if page.items.is_empty() {
            assert!(page.next_cursor.is_none());
            break;
        }
        seen.extend(page.items.iter().map(|r| r.variant_id.clone()));
        cursor = page.next_cursor;
    }
    let mut deduped = seen.clone();
    deduped.sort();
    deduped.dedup();
    assert_eq!(seen.len(), 5);
    assert_eq!(deduped.len(), 5);
}

#[tokio::test]
async fn test_sort_by_position_descending() {
    let tmp = tempfile::tempdir().unwrap();
    let service = QueryService::new(ingest_fixture(tmp.path()), FacetSettings::default());

    let sort = vec![SortField {
        field: "pos".to_string(),
        order: SortOrder::Desc,
    }];
    let page = service
        .filter_query("p1", None, &sort, &PageRequest::default())
        .await
        .unwrap();
    let positions: Vec<u32> = page.items.iter().map(|r| r.pos).collect();
    assert_eq!(positions, vec![300, 250, 200, 150, 100]);
}

#[tokio::test]
async fn test_facets_count_terms_and_honor_caps() {
    let tmp = tempfile::tempdir().unwrap();
    let store = ingest_fixture(tmp.path());

    let service = QueryService::new(store.clone(), FacetSettings::default());
    let facets = service.facets("p1", None).unwrap();
    let by_gene = &facets["by_gene"];
    assert_eq!(
        by_gene
            .iter()
            .find(|b| b.value == "BRCA1")
            .map(|b| b.count),
        Some(2)
    );
    assert_eq!(by_gene.len(), 3);
    assert_eq!(facets["by_consequence"].len(), 4);

    // A cap of one keeps only the top bucket.
    let capped = QueryService::new(
        store,
        FacetSettings {
            facets: vec![FacetSpec {
                name: "by_gene".to_string(),
                field: "csq.symbol".to_string(),
                cap: 1,
            }],
        },
    );
    let facets = capped.facets("p1", None).unwrap();
    assert_eq!(facets["by_gene"].len(), 1);
}

#[tokio::test]
async fn test_unknown_sort_field_is_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let service = QueryService::new(ingest_fixture(tmp.path()), FacetSettings::default());

    let sort = vec![SortField {
        field: "bogus".to_string(),
        order: SortOrder::Asc,
    }];
    let err = service
        .filter_query("p1", None, &sort, &PageRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(err, VariantStoreError::UnknownField(f) if f == "bogus"));
}

#[tokio::test]
async fn test_single_variant_lookup() {
    let tmp = tempfile::tempdir().unwrap();
    let service = QueryService::new(ingest_fixture(tmp.path()), FacetSettings::default());

    let record = service.get_variant("p1", "chr2:150:c>g").await.unwrap();
    assert_eq!(record.project_id, "p1");
    assert_eq!(record.chrom, "chr2");
    assert_eq!(record.pos, 150);
    assert_eq!(record.ref_allele, "C");
    assert_eq!(record.alt_allele, "G");
    assert_eq!(record.filters, "PASS");
    assert_eq!(record.csq.get("SYMBOL"), Some("EGFR"));

    assert!(matches!(
        service.get_variant("p1", "chr9:1:a>c").await,
        Err(VariantStoreError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_unknown_project_is_not_found() {
    let tmp = tempfile::tempdir().unwrap();
    let service = QueryService::new(ingest_fixture(tmp.path()), FacetSettings::default());

    assert!(matches!(
        service
            .filter_query("nope", None, &[], &PageRequest::default())
            .await,
        Err(VariantStoreError::NotFound(_))
    ));
}
