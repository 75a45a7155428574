//! Service discovery (spec §4.4, §6.5).
//!
//! The Python implementation polls Consul and falls back to the last
//! address it saw if the health check itself fails to answer, which
//! can hand a caller a dead address. `get_healthy` here fails closed:
//! any failure to confirm health is treated as "no healthy instance",
//! never as "assume the last one is still fine".

use std::collections::HashMap;
use std::time::Duration;

use tracing::debug;

/// Resolves a named service to a live `(host, port)` pair.
#[async_trait::async_trait]
pub trait ServiceRegistry: Send + Sync {
    /// Return a healthy address for `service_name`, or `None` if no
    /// instance currently answers its health check.
    async fn get_healthy(&self, service_name: &str) -> Option<(String, u16)>;
}

/// A registry backed by a static address table and an HTTP health
/// check against each candidate, in place of a real Consul client
/// (spec's reference deployment used Consul; no Rust client for it
/// exists in this workspace's dependency stack, so health is polled
/// directly over HTTP instead).
pub struct HttpServiceRegistry {
    client: reqwest::Client,
    services: HashMap<String, (String, u16)>,
    health_path: String,
    health_timeout: Duration,
}

impl HttpServiceRegistry {
    /// Build a registry from a static `name -> (host, port)` table.
    pub fn new(services: HashMap<String, (String, u16)>) -> Self {
        Self {
            client: reqwest::Client::new(),
            services,
            health_path: "/health".to_string(),
            health_timeout: Duration::from_secs(2),
        }
    }

    /// Override the health check path (default `/health`).
    pub fn with_health_path(mut self, path: impl Into<String>) -> Self {
        self.health_path = path.into();
        self
    }

    /// Override the per-check timeout (default 2s).
    pub fn with_health_timeout(mut self, timeout: Duration) -> Self {
        self.health_timeout = timeout;
        self
    }
}

#[async_trait::async_trait]
impl ServiceRegistry for HttpServiceRegistry {
    #[tracing::instrument(skip(self))]
    async fn get_healthy(&self, service_name: &str) -> Option<(String, u16)> {
        let (host, port) = self.services.get(service_name)?.clone();
        let url = format!("http://{host}:{port}{}", self.health_path);

        let result = tokio::time::timeout(self.health_timeout, self.client.get(&url).send()).await;
        match result {
            Ok(Ok(response)) if response.status().is_success() => Some((host, port)),
            Ok(Ok(response)) => {
                debug!(service_name, status = %response.status(), "health check failed");
                None
            }
            Ok(Err(e)) => {
                debug!(service_name, error = %e, "health check transport error");
                None
            }
            Err(_) => {
                debug!(service_name, "health check timed out");
                None
            }
        }
    }
}
