//! Service registry and microservice client error types.

/// Conditions the base microservice client can encounter.
///
/// Spec §4.4: a 4xx is non-retryable; transport failures and 5xx are
/// retried with backoff up to `max_retries`.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
pub enum RegistryErrorKind {
    /// No healthy instance of the named service was found and no
    /// fallback URL is configured.
    #[display("no healthy instance of service '{}' available", _0)]
    ServiceUnavailable(#[error(not(source))] String),
    /// The underlying HTTP transport failed (connect/read/timeout).
    #[display("transport error: {}", _0)]
    Transport(#[error(not(source))] String),
    /// The service responded with a 4xx status; not retried.
    #[display("client error ({}): {}", status, body)]
    ClientError {
        /// HTTP status code.
        status: u16,
        /// Response body (truncated).
        body: String,
    },
    /// The service responded with a 5xx status; retried.
    #[display("server error ({}): {}", status, body)]
    ServerError {
        /// HTTP status code.
        status: u16,
        /// Response body (truncated).
        body: String,
    },
    /// Per-request deadline was exceeded.
    #[display("request timed out after {}s", _0)]
    Timeout(#[error(not(source))] u64),
    /// Response body did not match the expected schema.
    #[display("invalid response: {}", _0)]
    InvalidResponse(#[error(not(source))] String),
    /// A model must be loaded before this operation; it was not.
    #[display("model not loaded for service '{}'", _0)]
    ModelNotLoaded(#[error(not(source))] String),
}

impl RegistryErrorKind {
    /// Whether this error should trigger a retry attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RegistryErrorKind::Transport(_)
                | RegistryErrorKind::ServerError { .. }
                | RegistryErrorKind::Timeout(_)
        )
    }

    /// Retry strategy parameters: `(initial_backoff_ms, max_delay_secs, max_retries)`.
    pub fn retry_strategy_params(&self) -> (u64, u64, usize) {
        match self {
            RegistryErrorKind::ServerError { status: 503, .. } => (2000, 60, 5),
            RegistryErrorKind::ServerError { .. } => (1000, 30, 3),
            RegistryErrorKind::Transport(_) => (500, 20, 3),
            RegistryErrorKind::Timeout(_) => (1000, 30, 3),
            _ => (1000, 10, 0),
        }
    }
}

/// Registry/client error with source location.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Registry Error: {kind} at line {line} in {file}")]
pub struct RegistryError {
    /// Kind of failure.
    #[error(source)]
    pub kind: RegistryErrorKind,
    /// Line number where the error occurred.
    pub line: u32,
    /// File where the error occurred.
    pub file: &'static str,
}

impl RegistryError {
    /// Create a new RegistryError with the given kind at the current location.
    #[track_caller]
    pub fn new(kind: RegistryErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Whether this error should trigger a retry attempt.
    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    /// Retry strategy parameters: `(initial_backoff_ms, max_delay_secs, max_retries)`.
    pub fn retry_strategy_params(&self) -> (u64, u64, usize) {
        self.kind.retry_strategy_params()
    }
}
