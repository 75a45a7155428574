//! Base microservice client (spec §4.4): resolves a service through a
//! [`ServiceRegistry`], issues the request, and retries transient
//! failures with exponential backoff. 4xx responses are never
//! retried — the Python implementation retried every failure
//! including client errors, which just hammered a broken request
//! until it ran out of attempts.

use std::sync::Arc;
use std::time::Duration;

use ingest_error::{IngestResult, RegistryError, RegistryErrorKind};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_retry2::strategy::{jitter, ExponentialBackoff};
use tokio_retry2::{Retry, RetryError};
use tracing::{info, warn};

use crate::registry::ServiceRegistry;

/// Status payload returned by a service's `/status` endpoint.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ServiceStatus {
    /// Models currently loaded in the service.
    pub loaded_models: Vec<String>,
    /// Whether the service is accepting work.
    pub ready: bool,
}

/// Per-client request tuning. Defaults mirror the retry strategy a
/// retryable [`RegistryErrorKind`] carries; setting either override
/// forces that value across every error kind, matching the CLI
/// override knobs in the model client this is grounded on.
#[derive(Debug, Clone, Default)]
pub struct ClientOverrides {
    /// Fixed initial backoff in milliseconds, overriding the
    /// per-error-kind default.
    pub retry_backoff_ms: Option<u64>,
    /// Fixed retry count, overriding the per-error-kind default.
    pub max_retries: Option<usize>,
    /// Disable retries entirely; the first failure is returned as-is.
    pub no_retry: bool,
}

/// A client bound to one named microservice, resolved through a
/// [`ServiceRegistry`] on every call so a restarted or rescheduled
/// instance is picked up without restarting the pipeline process.
pub struct ServiceClient {
    registry: Arc<dyn ServiceRegistry>,
    service_name: String,
    http: reqwest::Client,
    overrides: ClientOverrides,
}

impl ServiceClient {
    /// Build a client for `service_name`, resolved through `registry`.
    pub fn new(registry: Arc<dyn ServiceRegistry>, service_name: impl Into<String>) -> Self {
        Self {
            registry,
            service_name: service_name.into(),
            http: reqwest::Client::new(),
            overrides: ClientOverrides::default(),
        }
    }

    /// Apply request-retry overrides.
    pub fn with_overrides(mut self, overrides: ClientOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    async fn base_url(&self) -> IngestResult<String> {
        match self.registry.get_healthy(&self.service_name).await {
            Some((host, port)) => Ok(format!("http://{host}:{port}")),
            None => Err(RegistryError::new(RegistryErrorKind::ServiceUnavailable(
                self.service_name.clone(),
            ))
            .into()),
        }
    }

    /// POST `body` to `endpoint` and decode the JSON response,
    /// retrying transient failures with exponential backoff.
    #[tracing::instrument(skip(self, body), fields(service = %self.service_name, endpoint))]
    pub async fn invoke<B, R>(&self, endpoint: &str, body: &B) -> IngestResult<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        if self.overrides.no_retry {
            return self.invoke_once(endpoint, body).await.map_err(|e| e.into());
        }

        let first = self.invoke_once(endpoint, body).await;
        let (initial_ms, max_delay_secs, max_retries) = match &first {
            Ok(_) => return first.map_err(Into::into),
            Err(e) => {
                if !e.is_retryable() {
                    warn!(error = %e, "permanent registry error, failing immediately");
                    return Err(e.clone().into());
                }
                let (mut init_ms, delay_secs, mut retries) = e.retry_strategy_params();
                if let Some(override_backoff) = self.overrides.retry_backoff_ms {
                    init_ms = override_backoff;
                }
                if let Some(override_retries) = self.overrides.max_retries {
                    retries = override_retries;
                }
                info!(
                    error = %e,
                    service = %self.service_name,
                    initial_backoff_ms = init_ms,
                    max_retries = retries,
                    max_delay_secs = delay_secs,
                    "service call failed, retrying with backoff"
                );
                (init_ms, delay_secs, retries)
            }
        };

        let retry_strategy = ExponentialBackoff::from_millis(initial_ms)
            .factor(2)
            .max_delay(Duration::from_secs(max_delay_secs))
            .map(jitter)
            .take(max_retries);

        Retry::spawn(retry_strategy, || async {
            match self.invoke_once(endpoint, body).await {
                Ok(value) => Ok(value),
                Err(e) => {
                    if e.is_retryable() {
                        warn!(error = %e, "service call failed, will retry");
                        Err(RetryError::Transient {
                            err: e,
                            retry_after: None,
                        })
                    } else {
                        warn!(error = %e, "permanent registry error, failing immediately");
                        Err(RetryError::Permanent(e))
                    }
                }
            }
        })
        .await
        .map_err(|e| e.into())
    }

    async fn invoke_once<B, R>(&self, endpoint: &str, body: &B) -> Result<R, RegistryError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let base = self
            .base_url()
            .await
            .map_err(|_| RegistryError::new(RegistryErrorKind::ServiceUnavailable(self.service_name.clone())))?;
        let url = format!("{base}{endpoint}");

        let response = self.http.post(&url).json(body).send().await.map_err(|e| {
            if e.is_timeout() {
                RegistryError::new(RegistryErrorKind::Timeout(30))
            } else {
                RegistryError::new(RegistryErrorKind::Transport(e.to_string()))
            }
        })?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        if status.is_client_error() {
            return Err(RegistryError::new(RegistryErrorKind::ClientError {
                status: status.as_u16(),
                body: text,
            }));
        }
        if status.is_server_error() {
            return Err(RegistryError::new(RegistryErrorKind::ServerError {
                status: status.as_u16(),
                body: text,
            }));
        }

        serde_json::from_str(&text)
            .map_err(|e| RegistryError::new(RegistryErrorKind::InvalidResponse(e.to_string())))
    }

    /// Load a model into the service.
    pub async fn load_model(&self, model_id: &str) -> IngestResult<()> {
        #[derive(serde::Serialize)]
        struct Req<'a> {
            model_id: &'a str,
        }
        #[derive(serde::Deserialize)]
        struct Ack {}
        self.invoke::<_, Ack>("/models/load", &Req { model_id }).await?;
        Ok(())
    }

    /// Unload a model from the service.
    pub async fn unload_model(&self, model_id: &str) -> IngestResult<()> {
        #[derive(serde::Serialize)]
        struct Req<'a> {
            model_id: &'a str,
        }
        #[derive(serde::Deserialize)]
        struct Ack {}
        self.invoke::<_, Ack>("/models/unload", &Req { model_id }).await?;
        Ok(())
    }

    /// List models currently loaded by the service.
    pub async fn list_models(&self) -> IngestResult<Vec<String>> {
        let status = self.get_status().await?;
        Ok(status.loaded_models)
    }

    /// Fetch the service's current status.
    pub async fn get_status(&self) -> IngestResult<ServiceStatus> {
        #[derive(serde::Serialize)]
        struct Empty {}
        self.invoke("/status", &Empty {}).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AlwaysDown;

    #[async_trait::async_trait]
    impl ServiceRegistry for AlwaysDown {
        async fn get_healthy(&self, _service_name: &str) -> Option<(String, u16)> {
            None
        }
    }

    #[tokio::test]
    async fn unavailable_service_fails_without_retrying() {
        let client = ServiceClient::new(Arc::new(AlwaysDown), "asr");
        let result: IngestResult<ServiceStatus> = client.get_status().await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn no_retry_override_fails_on_first_attempt() {
        let client = ServiceClient::new(Arc::new(AlwaysDown), "asr").with_overrides(ClientOverrides {
            no_retry: true,
            ..Default::default()
        });
        let result: IngestResult<ServiceStatus> = client.get_status().await;
        assert!(result.is_err());
    }
}
