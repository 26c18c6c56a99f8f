//! Export audit trail.
//!
//! Every export call appends one JSON line to the audit file. The trail
//! is best-effort from the caller's point of view: a failed append is
//! logged and the export still succeeds.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use chrono::Utc;
use serde::Serialize;

use variantstore_core::Result;

/// One audit event, serialized as a single NDJSON line.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    /// Caller-supplied or generated export identifier.
    pub export_id: String,
    /// Project the export was taken from.
    pub project_id: String,
    /// Number of identifiers requested.
    pub variant_count: usize,
    /// Requested output format.
    pub format: String,
    /// Opaque caller metadata.
    pub metadata: serde_json::Value,
    /// Event time, RFC 3339.
    pub timestamp: String,
}

impl AuditEvent {
    /// Stamps an event with the current time.
    pub fn new(
        export_id: String,
        project_id: String,
        variant_count: usize,
        format: String,
        metadata: serde_json::Value,
    ) -> Self {
        AuditEvent {
            export_id,
            project_id,
            variant_count,
            format,
            metadata,
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// Append-only NDJSON audit log.
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    /// Creates a log writing to `path`; the file is created on first
    /// append.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        AuditLog { path: path.into() }
    }

    /// Appends one event as a JSON line.
    pub fn append(&self, event: &AuditEvent) -> Result<()> {
        let line = serde_json::to_string(event)
            .map_err(|e| variantstore_core::VariantStoreError::Store(e.to_string()))?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", line)?;
        Ok(())
    }
}
