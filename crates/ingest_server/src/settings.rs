//! Process configuration (spec §4.7's "config surface" generalised to
//! the whole server): one `AppSettings` loaded from environment
//! variables, with a `.env` file merged in first for local development.

use ingest_error::{ConfigError, IngestResult};
use serde::Deserialize;

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_pool_size() -> u32 {
    10
}

fn default_bucket() -> String {
    "ingest".to_string()
}

fn default_backend() -> String {
    "s3".to_string()
}

fn default_vector_batch_size() -> usize {
    32
}

/// Address and port a downstream microservice is reachable at.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAddress {
    /// Hostname or IP.
    pub host: String,
    /// Port.
    pub port: u16,
}

/// The six downstream model-serving microservices the pipeline stages
/// call through [`ingest_registry::ServiceClient`].
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAddresses {
    /// Shot-detection service.
    pub shot_detect: ServiceAddress,
    /// Speech recognition service.
    pub asr: ServiceAddress,
    /// Segment-captioning LLM service.
    pub segment_caption: ServiceAddress,
    /// Image-captioning LLM service.
    pub image_caption: ServiceAddress,
    /// Image-embedding service.
    pub image_embedding: ServiceAddress,
    /// Text-embedding service, shared by both caption-embedding stages.
    pub text_embedding: ServiceAddress,
}

/// Every setting the server needs to construct its [`crate::context::AppContext`].
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    /// Host the HTTP server binds to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port the HTTP server binds to.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Postgres connection string for the lineage tracker.
    pub database_url: String,
    /// Connection pool size.
    #[serde(default = "default_pool_size")]
    pub database_pool_size: u32,

    /// `"s3"` or `"filesystem"`.
    #[serde(default = "default_backend")]
    pub storage_backend: String,
    /// Bucket every artifact is written under.
    #[serde(default = "default_bucket")]
    pub storage_bucket: String,
    /// S3/MinIO endpoint, required when `storage_backend = "s3"`.
    pub s3_endpoint: Option<String>,
    /// S3 region; MinIO ignores the value but the SDK requires one.
    #[serde(default = "default_s3_region")]
    pub s3_region: String,
    /// S3 access key.
    pub s3_access_key: Option<String>,
    /// S3 secret key.
    pub s3_secret_key: Option<String>,
    /// Base directory, required when `storage_backend = "filesystem"`.
    pub filesystem_base_path: Option<String>,

    /// Qdrant URL for the vector index client.
    pub vector_index_url: String,
    /// Rows accumulated per `insert` call in each VectorIngest stage
    /// (spec §4.8.9: per-stage configurable batch size).
    #[serde(default = "default_vector_batch_size")]
    pub vector_batch_size: usize,

    /// Addresses for every downstream microservice.
    pub services: ServiceAddresses,
}

fn default_s3_region() -> String {
    "us-east-1".to_string()
}

impl AppSettings {
    /// Load settings from `.env` (if present) and the process
    /// environment, prefixed `INGEST__` with `__` as the nested-field
    /// separator (e.g. `INGEST__SERVICES__ASR__HOST`).
    pub fn load() -> IngestResult<Self> {
        dotenvy::dotenv().ok();

        let settings = config::Config::builder()
            .add_source(
                config::Environment::with_prefix("INGEST")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| ConfigError::new(e.to_string()))?;

        settings
            .try_deserialize()
            .map_err(|e| ConfigError::new(e.to_string()).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        assert_eq!(default_host(), "0.0.0.0");
        assert_eq!(default_port(), 8080);
        assert_eq!(default_pool_size(), 10);
        assert_eq!(default_bucket(), "ingest");
        assert_eq!(default_backend(), "s3");
        assert_eq!(default_s3_region(), "us-east-1");
        assert_eq!(default_vector_batch_size(), 32);
    }
}
