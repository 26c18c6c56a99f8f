use std::fs;
use std::path::Path;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::json;
use tower::ServiceExt;

use variantstore_api::{router, AppState, AuditLog};
use variantstore_core::config::{FacetSettings, StoreConfig};
use variantstore_ingest::{run_ingest, IngestConfig};
use variantstore_query::QueryService;

const VCF_HEADER: &str = "\
##fileformat=VCFv4.3
##INFO=<ID=CSQ,Number=.,Type=String,Description=\"Consequence annotations from Ensembl VEP. Format: Allele|Consequence|IMPACT|SYMBOL\">
##FILTER=<ID=PASS,Description=\"All filters passed\">
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO
";

fn make_app(dir: &Path) -> Router {
    let vcf = dir.join("input.vcf");
    let mut content = VCF_HEADER.to_string();
    for line in [
        "chr1\t100\trs1\tA\tT\t30\tPASS\tCSQ=T|missense_variant|MODERATE|BRCA1",
        "chr1\t200\t.\tG\tC\t25\tPASS\tCSQ=C|stop_gained|HIGH|TP53",
    ] {
        content.push_str(line);
        content.push('\n');
    }
    fs::write(&vcf, content).unwrap();
    let store = StoreConfig::new(dir.join("data"), dir.join("index"));
    run_ingest(&IngestConfig::new("p1", vcf.to_string_lossy(), store.clone())).unwrap();

    router(AppState {
        service: Arc::new(QueryService::new(store, FacetSettings::default())),
        audit: Arc::new(AuditLog::new(dir.join("audit.ndjson"))),
    })
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_healthz() {
    let tmp = tempfile::tempdir().unwrap();
    let app = make_app(tmp.path());
    let response = app
        .oneshot(Request::builder().uri("/api/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "ok");
}

#[tokio::test]
async fn test_filter_query_endpoint() {
    let tmp = tempfile::tempdir().unwrap();
    let app = make_app(tmp.path());
    let response = app
        .oneshot(post_json(
            "/api/filter/query",
            json!({
                "project_id": "p1",
                "filters": {
                    "op": "AND",
                    "clauses": [{"field": "csq.impact", "op": "eq", "value": "HIGH"}]
                },
                "page": {"size": 10}
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["items"][0]["variant_id"], "chr1:200:g>c");
    assert_eq!(body["items"][0]["csq"]["SYMBOL"], "TP53");
}

#[tokio::test]
async fn test_unsupported_operator_is_bad_request() {
    let tmp = tempfile::tempdir().unwrap();
    let app = make_app(tmp.path());
    let response = app
        .oneshot(post_json(
            "/api/filter/query",
            json!({
                "project_id": "p1",
                "filters": {
                    "op": "AND",
                    "clauses": [{"field": "chrom", "op": "regex", "value": "chr.*"}]
                }
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_variant_lookup_and_missing_variant() {
    let tmp = tempfile::tempdir().unwrap();
    let app = make_app(tmp.path());

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/variant/p1/chr1:100:a%3Et")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["rsid"], "rs1");
    assert_eq!(body["pos"], 100);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/variant/p1/chr9:1:a%3Ec")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_facets_endpoint() {
    let tmp = tempfile::tempdir().unwrap();
    let app = make_app(tmp.path());
    let response = app
        .oneshot(post_json("/api/facets", json!({"project_id": "p1"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let genes = body["by_gene"].as_array().unwrap();
    assert_eq!(genes.len(), 2);
}

#[tokio::test]
async fn test_export_csv_appends_audit_event() {
    let tmp = tempfile::tempdir().unwrap();
    let app = make_app(tmp.path());
    let response = app
        .oneshot(post_json(
            "/api/export",
            json!({
                "project_id": "p1",
                "variant_ids": ["chr1:100:a>t", "chr1:200:g>c"],
                "format": "CSV",
                "export_id": "exp-1",
                "metadata": {"requested_by": "tester"}
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE].to_str().unwrap(),
        "text/csv"
    );
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let csv = String::from_utf8(bytes.to_vec()).unwrap();
    assert_eq!(csv.lines().count(), 3);

    let audit = fs::read_to_string(tmp.path().join("audit.ndjson")).unwrap();
    let event: serde_json::Value = serde_json::from_str(audit.lines().next().unwrap()).unwrap();
    assert_eq!(event["export_id"], "exp-1");
    assert_eq!(event["variant_count"], 2);
    assert_eq!(event["format"], "CSV");
}
