//! Bucketed blob storage for the video ingestion pipeline (spec §3.3,
//! §4.3): a [`BlobStore`] trait with an S3/MinIO-compatible production
//! backend and a filesystem backend for tests and local development.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod filesystem;
mod s3;
mod store;

pub use filesystem::FileSystemBlobStore;
pub use s3::{S3BlobStore, S3Config};
pub use store::BlobStore;
