//! HTTP service for the variant store.

#![warn(missing_docs)]

pub mod audit;
pub mod export;
pub mod http;

pub use audit::{AuditEvent, AuditLog};
pub use http::{router, AppState};
