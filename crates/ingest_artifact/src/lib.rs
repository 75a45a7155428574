//! Artifact model and cross-store persistence visitor (spec §3.1,
//! §4.1): the nine content-addressed artifact types pipeline stages
//! produce, and the single choke point (`PersistenceVisitor`) that
//! checks idempotency and commits their output across the blob store,
//! lineage tracker, and vector index.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod artifact;
mod visitor;

pub use artifact::{
    Artifact, AsrArtifact, AsrToken, AutoshotArtifact, ImageArtifact, ImageCaptionArtifact,
    ImageEmbeddingArtifact, SegmentCaptionArtifact, SegmentCaptionEmbeddingArtifact,
    TextCaptionEmbeddingArtifact, VideoArtifact,
};
pub use visitor::{Payload, PersistenceVisitor, StoreContext};
