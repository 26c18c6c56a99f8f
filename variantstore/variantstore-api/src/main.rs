use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use log::info;

use variantstore_api::{router, AppState, AuditLog};
use variantstore_core::config::{FacetSettings, StoreConfig, DEFAULT_INDEX_NAME};
use variantstore_query::QueryService;

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let data_root = env_or("DATA_ROOT", "./data/parquet");
    let index_root = env_or("INDEX_ROOT", "./data/index");
    let mut store = StoreConfig::new(data_root, index_root);
    store.index_name = env_or("INDEX_NAME", DEFAULT_INDEX_NAME);
    let audit_path = env_or("AUDIT_LOG", "./data/export_audit.ndjson");
    let bind_addr = env_or("BIND_ADDR", "0.0.0.0:8080");

    let state = AppState {
        service: Arc::new(QueryService::new(store, FacetSettings::default())),
        audit: Arc::new(AuditLog::new(audit_path)),
    };
    let app = router(state);

    let addr: SocketAddr = bind_addr
        .parse()
        .with_context(|| format!("invalid BIND_ADDR: {}", bind_addr))?;
    info!("variant store api listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
