//! Cascading deleter and status reporter (spec §4.9-§4.10): the two
//! read/write paths the management HTTP surface exposes, built
//! entirely on the lineage tracker, blob store, and vector client the
//! pipeline crates already provide.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod deleter;
mod status;

pub use deleter::{CascadeDeleter, DeleteReport};
pub use status::{StatusReporter, VideoStatus, VideoStatusMetadata, ALL_STAGES};
