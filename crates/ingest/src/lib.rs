//! Video Ingestion Pipeline
//!
//! This crate is a unified, re-exporting facade over the ingestion
//! system's focused crates: content-addressed artifacts, the three
//! external stores (blob, relational lineage, vector index), the
//! microservice registry client, the stage-by-stage task framework and
//! flow orchestrator, and the cascading deleter / status reporter.
//!
//! # Architecture
//!
//! - `ingest_error` - per-crate error kinds plus the aggregate `IngestError`
//! - `ingest_core` - content addressing, frame sampling, the ASR-overlap rule
//! - `ingest_storage` - the blob store (`BlobStore`)
//! - `ingest_database` - the relational lineage tracker (`LineageTracker`)
//! - `ingest_registry` - microservice discovery and the base HTTP client
//! - `ingest_vector` - the vector index client and its three collections
//! - `ingest_artifact` - the nine artifact types and the persistence visitor
//! - `ingest_pipeline` - the task framework, the nine stages, and the flow orchestrator
//! - `ingest_management` - the cascading deleter and status reporter
//!
//! This crate (`ingest`) re-exports everything for convenience; a
//! consumer that only needs one layer (e.g. just the artifact model)
//! can depend on that crate directly instead.

#![forbid(unsafe_code)]

pub use ingest_artifact::*;
pub use ingest_core::*;
pub use ingest_database::*;
pub use ingest_error::*;
pub use ingest_management::*;
pub use ingest_pipeline::*;
pub use ingest_registry::*;
pub use ingest_storage::*;
pub use ingest_vector::*;
