//! The pipeline crate (spec §4.7-4.11): the uniform task lifecycle,
//! the nine concrete stages built on it, and the flow orchestrator that
//! wires them into the ingestion DAG.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod codec;
pub mod common;
pub mod contracts;
pub mod frame;
pub mod orchestrator;
pub mod probe;
pub mod stages;
pub mod task;

pub use common::VideoRef;
pub use orchestrator::{FlowOrchestrator, ProgressEvent, StageName, VideoSubmission};
pub use task::{Outcome, Task, TaskConfig, WorkItem, WorkStream};
