//! VCF ingestion for the variant store.
//!
//! The pipeline streams a VEP-annotated VCF through a row parser into two
//! sinks: an append-only partitioned Parquet store (authoritative) and a
//! per-project search index (query projection), in that order. A
//! reconciliation pass repairs the index when the second write was lost.

#![warn(missing_docs)]

pub mod batch_writer;
pub mod csq;
pub mod parquet_sink;
pub mod parser;
pub mod pipeline;
pub mod reconcile;
pub mod search_sink;
pub mod storage;

pub use batch_writer::{DualSinkWriter, DEFAULT_BATCH_SIZE};
pub use csq::CsqSchema;
pub use parquet_sink::ParquetSink;
pub use parser::{parse_record, ParseContext, ParsedVariant, RowOutcome};
pub use pipeline::{run_ingest, IngestConfig, IngestStats};
pub use reconcile::{reconcile_project, ReconcileStats};
pub use search_sink::{variant_index_schema, SearchIndex};
pub use storage::{VcfCompressionType, VcfSourceReader};
