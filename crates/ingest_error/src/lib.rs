//! Error types for the video ingestion pipeline.
//!
//! This crate provides the foundation error types used throughout the
//! ingestion workspace.
//!
//! # Error Hierarchy
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - All errors use `#[track_caller]` for automatic location capture
//!
//! # Examples
//!
//! ```
//! use ingest_error::{IngestResult, HttpError};
//!
//! fn fetch_data() -> IngestResult<String> {
//!     Err(HttpError::new("Connection refused"))?
//! }
//!
//! match fetch_data() {
//!     Ok(data) => println!("Got: {}", data),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod artifact;
mod config;
#[cfg(feature = "database")]
mod database;
mod error;
mod http;
mod json;
mod registry;
mod storage;
mod vector;

pub use artifact::{ArtifactError, ArtifactErrorKind};
pub use config::ConfigError;
#[cfg(feature = "database")]
pub use database::{DatabaseError, DatabaseErrorKind};
pub use error::{IngestError, IngestErrorKind, IngestResult};
pub use http::HttpError;
pub use json::JsonError;
pub use registry::{RegistryError, RegistryErrorKind};
pub use storage::{StorageError, StorageErrorKind};
pub use vector::{VectorError, VectorErrorKind};
