//! HTTP surface: router, request/response payloads and status mapping.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use log::{error, warn};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use variantstore_core::filter::{FilterGroup, PageRequest, SortField};
use variantstore_core::{VariantRecord, VariantStoreError};
use variantstore_query::{FacetBucket, QueryService};

use crate::audit::{AuditEvent, AuditLog};
use crate::export::render_csv;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    /// Query facade over both stores.
    pub service: Arc<QueryService>,
    /// Export audit trail.
    pub audit: Arc<AuditLog>,
}

/// Builds the service router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/healthz", get(healthz))
        .route("/api/filter/query", post(filter_query))
        .route("/api/facets", post(facets))
        .route("/api/variant/{project_id}/{variant_id}", get(get_variant))
        .route("/api/export", post(export))
        .with_state(state)
}

type ApiError = (StatusCode, String);

fn map_error(e: VariantStoreError) -> ApiError {
    let status = if matches!(e, VariantStoreError::NotFound(_)) {
        StatusCode::NOT_FOUND
    } else if e.is_client_error() {
        StatusCode::BAD_REQUEST
    } else {
        error!("request failed: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, e.to_string())
}

async fn healthz() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Filter query payload.
#[derive(Debug, Deserialize)]
pub struct FilterQueryRequest {
    /// Project to query.
    pub project_id: String,
    /// Optional filter tree; absent means unconstrained.
    #[serde(default)]
    pub filters: Option<FilterGroup>,
    /// Caller sort; the ascending identifier tiebreaker is appended
    /// server-side.
    #[serde(default)]
    pub sort: Vec<SortField>,
    /// Page size and resume cursor.
    #[serde(default)]
    pub page: PageRequest,
}

/// Filter query result page.
#[derive(Debug, Serialize)]
pub struct FilterQueryResponse {
    /// Full match count.
    pub total: usize,
    /// Resume token, absent on an empty page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
    /// Hydrated rows in result order.
    pub items: Vec<VariantRecord>,
}

async fn filter_query(
    State(state): State<AppState>,
    Json(request): Json<FilterQueryRequest>,
) -> Result<Json<FilterQueryResponse>, ApiError> {
    let page = state
        .service
        .filter_query(
            &request.project_id,
            request.filters.as_ref(),
            &request.sort,
            &request.page,
        )
        .await
        .map_err(map_error)?;
    Ok(Json(FilterQueryResponse {
        total: page.total,
        next_cursor: page.next_cursor,
        items: page.items,
    }))
}

/// Facets payload.
#[derive(Debug, Deserialize)]
pub struct FacetsRequest {
    /// Project to aggregate over.
    pub project_id: String,
    /// Optional filter tree restricting the aggregated documents.
    #[serde(default)]
    pub filters: Option<FilterGroup>,
}

async fn facets(
    State(state): State<AppState>,
    Json(request): Json<FacetsRequest>,
) -> Result<Json<BTreeMap<String, Vec<FacetBucket>>>, ApiError> {
    let facets = state
        .service
        .facets(&request.project_id, request.filters.as_ref())
        .map_err(map_error)?;
    Ok(Json(facets))
}

async fn get_variant(
    State(state): State<AppState>,
    Path((project_id, variant_id)): Path<(String, String)>,
) -> Result<Json<VariantRecord>, ApiError> {
    let record = state
        .service
        .get_variant(&project_id, &variant_id)
        .await
        .map_err(map_error)?;
    Ok(Json(record))
}

/// Requested export output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExportFormat {
    /// JSON body with the hydrated rows.
    Json,
    /// CSV body, annotation column as a JSON object string.
    Csv,
}

/// Export payload.
#[derive(Debug, Deserialize)]
pub struct ExportRequest {
    /// Project to export from.
    pub project_id: String,
    /// Explicit identifier list.
    pub variant_ids: Vec<String>,
    /// Output format.
    pub format: ExportFormat,
    /// Caller-supplied export identifier; generated when absent.
    #[serde(default)]
    pub export_id: Option<String>,
    /// Opaque metadata recorded in the audit trail.
    #[serde(default)]
    pub metadata: serde_json::Value,
}

async fn export(
    State(state): State<AppState>,
    Json(request): Json<ExportRequest>,
) -> Result<Response, ApiError> {
    let rows = state
        .service
        .fetch_by_ids(&request.project_id, &request.variant_ids)
        .await
        .map_err(map_error)?;

    let export_id = request
        .export_id
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let event = AuditEvent::new(
        export_id.clone(),
        request.project_id.clone(),
        request.variant_ids.len(),
        format!("{:?}", request.format).to_uppercase(),
        request.metadata.clone(),
    );
    // The export itself is not gated on the audit trail.
    if let Err(e) = state.audit.append(&event) {
        warn!("audit append failed for export {}: {}", export_id, e);
    }

    match request.format {
        ExportFormat::Json => Ok(Json(serde_json::json!({
            "export_id": export_id,
            "items": rows,
        }))
        .into_response()),
        ExportFormat::Csv => Ok((
            [(header::CONTENT_TYPE, "text/csv")],
            render_csv(&rows),
        )
            .into_response()),
    }
}
