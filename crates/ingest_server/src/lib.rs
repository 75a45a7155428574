//! HTTP entry point for the video ingestion pipeline.

#![forbid(unsafe_code)]

pub mod context;
pub mod error;
pub mod routes;
pub mod settings;
pub mod telemetry;

pub use context::AppContext;
pub use routes::build_router;
pub use settings::AppSettings;
