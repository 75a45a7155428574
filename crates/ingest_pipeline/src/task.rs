//! The uniform task lifecycle (spec §4.7): every stage implements
//! `preprocess` → `execute` → `postprocess`, so the orchestrator never
//! needs stage-specific knowledge beyond an input type.

use std::pin::Pin;

use futures::{Stream, StreamExt};
use ingest_artifact::{Payload, PersistenceVisitor};
use ingest_error::IngestResult;

/// A lazily-produced `execute` result for one descriptor: either the
/// artifact already exists (skip — no service call, no persist) or
/// fresh payload ready to persist.
pub enum Outcome {
    /// `exists(artifact)` was true; nothing to do downstream.
    Skipped,
    /// The external service produced this payload; `postprocess` must
    /// persist it.
    Produced(Payload),
}

/// One `execute` yield: a descriptor paired with its outcome.
pub struct WorkItem<D> {
    /// The descriptor this outcome belongs to.
    pub descriptor: D,
    /// What `execute` produced for it.
    pub outcome: Outcome,
}

/// A boxed, possibly-async-generated sequence of work items, matching
/// spec §4.7's "lazy sequence" (an async generator in the source;
/// `async_stream::stream!` + `Pin<Box<dyn Stream>>` is the idiomatic
/// Rust equivalent).
pub type WorkStream<'a, D> = Pin<Box<dyn Stream<Item = IngestResult<WorkItem<D>>> + Send + 'a>>;

/// A pipeline stage. `Input` is whatever `preprocess` needs to build
/// descriptors (a video id, a list of segments, …); `Descriptor` is the
/// artifact-to-be plus whatever context `execute`/`postprocess` need
/// to act on it.
#[async_trait::async_trait]
pub trait Task: Send + Sync {
    /// What `preprocess` consumes.
    type Input: Send + 'static;
    /// What flows through `execute`/`postprocess`.
    type Descriptor: Send + Sync + Clone + 'static;

    /// Build the list of output descriptors. No external service calls;
    /// may read small parent payloads from the blob store to materialise
    /// descriptors (e.g. ImageExtract reading a segments json).
    async fn preprocess(&self, input: Self::Input) -> IngestResult<Vec<Self::Descriptor>>;

    /// For each descriptor: skip if already persisted, otherwise call
    /// the external service and yield its payload.
    fn execute<'a>(&'a self, descriptors: Vec<Self::Descriptor>) -> WorkStream<'a, Self::Descriptor>;

    /// Persist a produced payload, or pass a skipped descriptor through
    /// unchanged.
    async fn postprocess(&self, item: WorkItem<Self::Descriptor>) -> IngestResult<Self::Descriptor>;

    /// Drive the full `preprocess` → `execute` → `postprocess` pipeline
    /// for one input, returning every resulting descriptor in
    /// completion order.
    async fn run(&self, input: Self::Input) -> IngestResult<Vec<Self::Descriptor>> {
        let descriptors = self.preprocess(input).await?;
        let mut stream = self.execute(descriptors);
        let mut out = Vec::new();
        while let Some(item) = stream.next().await {
            out.push(self.postprocess(item?).await?);
        }
        Ok(out)
    }
}

/// Shared helper every stage's `postprocess` delegates to: skipped
/// descriptors pass through untouched, produced ones get persisted.
pub async fn persist_outcome<D>(
    visitor: &PersistenceVisitor,
    artifact: &ingest_artifact::Artifact,
    descriptor: D,
    outcome: Outcome,
) -> IngestResult<D> {
    match outcome {
        Outcome::Skipped => Ok(descriptor),
        Outcome::Produced(payload) => {
            visitor.persist(artifact, payload).await?;
            Ok(descriptor)
        }
    }
}

/// Per-task configuration (spec §4.7: "model_name, device, batch_size,
/// numeric tunables, retry overrides").
#[derive(Debug, Clone)]
pub struct TaskConfig {
    /// Name of the model the backing service should load.
    pub model_name: String,
    /// Execution device the service should use.
    pub device: ingest_core::Device,
    /// Batch size for stages that batch service calls.
    pub batch_size: usize,
    /// Per-task override for the client's retry/backoff parameters.
    pub retry_backoff_ms: Option<u64>,
    /// Per-task override for the client's max retry count.
    pub max_retries: Option<usize>,
}

impl TaskConfig {
    /// Build a config for `model_name` with the given device, defaults
    /// otherwise.
    pub fn new(model_name: impl Into<String>, device: ingest_core::Device) -> Self {
        Self {
            model_name: model_name.into(),
            device,
            batch_size: 1,
            retry_backoff_ms: None,
            max_retries: None,
        }
    }

    /// Set the batch size.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Translate this config's retry fields into client overrides.
    pub fn client_overrides(&self) -> ingest_registry::ClientOverrides {
        ingest_registry::ClientOverrides {
            retry_backoff_ms: self.retry_backoff_ms,
            max_retries: self.max_retries,
            no_retry: false,
        }
    }
}
