//! VectorIngest stages (spec §4.8.9): for each embedding artifact,
//! resolve its blob and any associated caption text, and upsert a row
//! into the matching Qdrant collection. Three artifact kinds, three
//! collections, one shared shape.

use std::sync::Arc;

use async_stream::stream;
use ingest_artifact::Payload;
use ingest_error::{IngestResult, StorageError, StorageErrorKind};
use ingest_storage::BlobStore;
use ingest_vector::{
    ImageEmbeddingRow, SegmentCaptionEmbeddingRow, TextImageCaptionEmbeddingRow, VectorIndexClient,
    IMAGE_EMBEDDING, SEGMENT_CAPTION_EMBEDDING, TEXT_IMAGE_CAPTION_EMBEDDING,
};

use crate::codec::decode_embedding;
use crate::task::{Outcome, Task, WorkItem, WorkStream};

/// Builds a stable blob locator string for a collection's scalar
/// `minio_url`-style fields; this workspace has no public CDN in
/// front of the blob store, so the locator is `<bucket>/<key>`.
fn object_locator(bucket: &str, key: &str) -> String {
    format!("{bucket}/{key}")
}

async fn fetch_embedding(blob_store: &Arc<dyn BlobStore>, bucket: &str, key: &str) -> IngestResult<Vec<f32>> {
    let bytes = blob_store
        .get_object(bucket, key)
        .await?
        .ok_or_else(|| StorageError::new(StorageErrorKind::NotFound(key.to_string())))?;
    decode_embedding(&bytes)
}

async fn fetch_text(blob_store: &Arc<dyn BlobStore>, bucket: &str, key: &str, field: &str) -> IngestResult<String> {
    let value = blob_store
        .get_json(bucket, key)
        .await?
        .ok_or_else(|| StorageError::new(StorageErrorKind::NotFound(key.to_string())))?;
    Ok(value[field].as_str().unwrap_or_default().to_string())
}

/// One Image embedding ready to be upserted.
#[derive(Debug, Clone)]
pub struct ImageEmbeddingIngestInput {
    /// The `ImageEmbedding` artifact's content-addressed id.
    pub artifact_id: String,
    /// The video this embedding belongs to.
    pub video_id: String,
    /// Tenant bucket.
    pub user_bucket: String,
    /// Frame index within the video.
    pub frame_index: i64,
    /// Frame timestamp in seconds.
    pub timestamp: f64,
    /// Blob key the embedding was written under.
    pub embedding_object_key: String,
    /// Blob key the source frame's WebP bytes were written under.
    pub image_object_key: String,
}

/// Upserts rows into the `image_embedding` collection, `batch_size`
/// rows per `insert` call (spec §4.8.9).
pub struct ImageVectorIngestTask {
    blob_store: Arc<dyn BlobStore>,
    vector: Arc<VectorIndexClient>,
    batch_size: usize,
}

impl ImageVectorIngestTask {
    /// Build the stage over the shared blob store and vector client.
    pub fn new(blob_store: Arc<dyn BlobStore>, vector: Arc<VectorIndexClient>, batch_size: usize) -> Self {
        Self { blob_store, vector, batch_size: batch_size.max(1) }
    }
}

#[async_trait::async_trait]
impl Task for ImageVectorIngestTask {
    type Input = Vec<ImageEmbeddingIngestInput>;
    type Descriptor = ImageEmbeddingIngestInput;

    async fn preprocess(&self, input: Self::Input) -> IngestResult<Vec<Self::Descriptor>> {
        Ok(input)
    }

    fn execute<'a>(&'a self, descriptors: Vec<Self::Descriptor>) -> WorkStream<'a, Self::Descriptor> {
        Box::pin(stream! {
            for chunk in descriptors.chunks(self.batch_size) {
                let mut rows = Vec::new();
                let mut produced = Vec::new();
                for descriptor in chunk {
                    match self
                        .vector
                        .exists_by(IMAGE_EMBEDDING, &descriptor.artifact_id, &descriptor.video_id, &descriptor.user_bucket)
                        .await
                    {
                        Ok(true) => yield Ok(WorkItem { descriptor: descriptor.clone(), outcome: Outcome::Skipped }),
                        Ok(false) => {
                            match fetch_embedding(&self.blob_store, &descriptor.user_bucket, &descriptor.embedding_object_key).await {
                                Ok(embedding) => {
                                    rows.push(ImageEmbeddingRow {
                                        artifact_id: descriptor.artifact_id.clone(),
                                        embedding,
                                        related_video_id: descriptor.video_id.clone(),
                                        minio_url: object_locator(&descriptor.user_bucket, &descriptor.image_object_key),
                                        user_bucket: descriptor.user_bucket.clone(),
                                        frame_index: descriptor.frame_index,
                                        timestamp: descriptor.timestamp,
                                    });
                                    produced.push(descriptor.clone());
                                }
                                Err(e) => yield Err(e),
                            }
                        }
                        Err(e) => yield Err(e),
                    }
                }
                if rows.is_empty() {
                    continue;
                }
                let dim = rows[0].embedding.len() as u64;
                if let Err(e) = self.vector.ensure_collection(IMAGE_EMBEDDING, dim).await {
                    yield Err(e);
                    continue;
                }
                let batch: Vec<_> = rows.into_iter().map(Into::into).collect();
                match self.vector.insert(IMAGE_EMBEDDING, batch).await {
                    Ok(()) => {
                        for descriptor in produced {
                            yield Ok(WorkItem { descriptor, outcome: Outcome::Produced(Payload::None) });
                        }
                    }
                    Err(e) => yield Err(e),
                }
            }
        })
    }

    async fn postprocess(&self, item: WorkItem<Self::Descriptor>) -> IngestResult<Self::Descriptor> {
        Ok(item.descriptor)
    }
}

/// One image-caption embedding ready to be upserted.
#[derive(Debug, Clone)]
pub struct TextImageCaptionIngestInput {
    /// The `TextCaptionEmbedding` artifact's content-addressed id.
    pub artifact_id: String,
    /// The video this caption belongs to.
    pub video_id: String,
    /// Tenant bucket.
    pub user_bucket: String,
    /// Frame index the caption describes.
    pub frame_index: i64,
    /// Frame timestamp in seconds.
    pub timestamp: f64,
    /// Blob key the embedding was written under.
    pub embedding_object_key: String,
    /// Blob key the `ImageCaption` json was written under.
    pub caption_object_key: String,
    /// Blob key the source frame's WebP bytes were written under.
    pub image_object_key: String,
}

/// Upserts rows into the `text_image_caption_embedding` collection,
/// `batch_size` rows per `insert` call (spec §4.8.9).
pub struct TextImageCaptionVectorIngestTask {
    blob_store: Arc<dyn BlobStore>,
    vector: Arc<VectorIndexClient>,
    batch_size: usize,
}

impl TextImageCaptionVectorIngestTask {
    /// Build the stage over the shared blob store and vector client.
    pub fn new(blob_store: Arc<dyn BlobStore>, vector: Arc<VectorIndexClient>, batch_size: usize) -> Self {
        Self { blob_store, vector, batch_size: batch_size.max(1) }
    }
}

#[async_trait::async_trait]
impl Task for TextImageCaptionVectorIngestTask {
    type Input = Vec<TextImageCaptionIngestInput>;
    type Descriptor = TextImageCaptionIngestInput;

    async fn preprocess(&self, input: Self::Input) -> IngestResult<Vec<Self::Descriptor>> {
        Ok(input)
    }

    fn execute<'a>(&'a self, descriptors: Vec<Self::Descriptor>) -> WorkStream<'a, Self::Descriptor> {
        Box::pin(stream! {
            for chunk in descriptors.chunks(self.batch_size) {
                let mut rows = Vec::new();
                let mut produced = Vec::new();
                for descriptor in chunk {
                    match self
                        .vector
                        .exists_by(TEXT_IMAGE_CAPTION_EMBEDDING, &descriptor.artifact_id, &descriptor.video_id, &descriptor.user_bucket)
                        .await
                    {
                        Ok(true) => yield Ok(WorkItem { descriptor: descriptor.clone(), outcome: Outcome::Skipped }),
                        Ok(false) => {
                            let embedding = fetch_embedding(&self.blob_store, &descriptor.user_bucket, &descriptor.embedding_object_key).await;
                            let caption = fetch_text(&self.blob_store, &descriptor.user_bucket, &descriptor.caption_object_key, "caption").await;
                            match (embedding, caption) {
                                (Ok(embedding), Ok(caption)) => {
                                    rows.push(TextImageCaptionEmbeddingRow {
                                        artifact_id: descriptor.artifact_id.clone(),
                                        embedding,
                                        frame_index: descriptor.frame_index,
                                        timestamp: descriptor.timestamp,
                                        related_video_id: descriptor.video_id.clone(),
                                        caption: caption.chars().take(10_000).collect(),
                                        caption_minio_url: object_locator(&descriptor.user_bucket, &descriptor.caption_object_key),
                                        user_bucket: descriptor.user_bucket.clone(),
                                        image_minio_url: object_locator(&descriptor.user_bucket, &descriptor.image_object_key),
                                    });
                                    produced.push(descriptor.clone());
                                }
                                (Err(e), _) | (_, Err(e)) => yield Err(e),
                            }
                        }
                        Err(e) => yield Err(e),
                    }
                }
                if rows.is_empty() {
                    continue;
                }
                let dim = rows[0].embedding.len() as u64;
                if let Err(e) = self.vector.ensure_collection(TEXT_IMAGE_CAPTION_EMBEDDING, dim).await {
                    yield Err(e);
                    continue;
                }
                let batch: Vec<_> = rows.into_iter().map(Into::into).collect();
                match self.vector.insert(TEXT_IMAGE_CAPTION_EMBEDDING, batch).await {
                    Ok(()) => {
                        for descriptor in produced {
                            yield Ok(WorkItem { descriptor, outcome: Outcome::Produced(Payload::None) });
                        }
                    }
                    Err(e) => yield Err(e),
                }
            }
        })
    }

    async fn postprocess(&self, item: WorkItem<Self::Descriptor>) -> IngestResult<Self::Descriptor> {
        Ok(item.descriptor)
    }
}

/// One segment-caption embedding ready to be upserted.
#[derive(Debug, Clone)]
pub struct SegmentCaptionIngestInput {
    /// The `SegmentCaptionEmbedding` artifact's content-addressed id.
    pub artifact_id: String,
    /// The video this segment belongs to.
    pub video_id: String,
    /// Tenant bucket.
    pub user_bucket: String,
    /// First frame of the segment.
    pub start_frame: i64,
    /// Last frame of the segment.
    pub end_frame: i64,
    /// Segment start time in seconds.
    pub start_time: f64,
    /// Segment end time in seconds.
    pub end_time: f64,
    /// Blob key the embedding was written under.
    pub embedding_object_key: String,
    /// Blob key the `SegmentCaption` json was written under.
    pub caption_object_key: String,
}

/// Upserts rows into the `segment_caption_embedding` collection,
/// `batch_size` rows per `insert` call (spec §4.8.9).
pub struct SegmentCaptionVectorIngestTask {
    blob_store: Arc<dyn BlobStore>,
    vector: Arc<VectorIndexClient>,
    batch_size: usize,
}

impl SegmentCaptionVectorIngestTask {
    /// Build the stage over the shared blob store and vector client.
    pub fn new(blob_store: Arc<dyn BlobStore>, vector: Arc<VectorIndexClient>, batch_size: usize) -> Self {
        Self { blob_store, vector, batch_size: batch_size.max(1) }
    }
}

#[async_trait::async_trait]
impl Task for SegmentCaptionVectorIngestTask {
    type Input = Vec<SegmentCaptionIngestInput>;
    type Descriptor = SegmentCaptionIngestInput;

    async fn preprocess(&self, input: Self::Input) -> IngestResult<Vec<Self::Descriptor>> {
        Ok(input)
    }

    fn execute<'a>(&'a self, descriptors: Vec<Self::Descriptor>) -> WorkStream<'a, Self::Descriptor> {
        Box::pin(stream! {
            for chunk in descriptors.chunks(self.batch_size) {
                let mut rows = Vec::new();
                let mut produced = Vec::new();
                for descriptor in chunk {
                    match self
                        .vector
                        .exists_by(SEGMENT_CAPTION_EMBEDDING, &descriptor.artifact_id, &descriptor.video_id, &descriptor.user_bucket)
                        .await
                    {
                        Ok(true) => yield Ok(WorkItem { descriptor: descriptor.clone(), outcome: Outcome::Skipped }),
                        Ok(false) => {
                            let embedding = fetch_embedding(&self.blob_store, &descriptor.user_bucket, &descriptor.embedding_object_key).await;
                            let caption = fetch_text(&self.blob_store, &descriptor.user_bucket, &descriptor.caption_object_key, "caption").await;
                            match (embedding, caption) {
                                (Ok(embedding), Ok(caption)) => {
                                    rows.push(SegmentCaptionEmbeddingRow {
                                        artifact_id: descriptor.artifact_id.clone(),
                                        embedding,
                                        start_frame: descriptor.start_frame,
                                        end_frame: descriptor.end_frame,
                                        start_time: descriptor.start_time,
                                        end_time: descriptor.end_time,
                                        related_video_id: descriptor.video_id.clone(),
                                        caption: caption.chars().take(10_000).collect(),
                                        segment_caption_minio_url: object_locator(&descriptor.user_bucket, &descriptor.caption_object_key),
                                        user_bucket: descriptor.user_bucket.clone(),
                                    });
                                    produced.push(descriptor.clone());
                                }
                                (Err(e), _) | (_, Err(e)) => yield Err(e),
                            }
                        }
                        Err(e) => yield Err(e),
                    }
                }
                if rows.is_empty() {
                    continue;
                }
                let dim = rows[0].embedding.len() as u64;
                if let Err(e) = self.vector.ensure_collection(SEGMENT_CAPTION_EMBEDDING, dim).await {
                    yield Err(e);
                    continue;
                }
                let batch: Vec<_> = rows.into_iter().map(Into::into).collect();
                match self.vector.insert(SEGMENT_CAPTION_EMBEDDING, batch).await {
                    Ok(()) => {
                        for descriptor in produced {
                            yield Ok(WorkItem { descriptor, outcome: Outcome::Produced(Payload::None) });
                        }
                    }
                    Err(e) => yield Err(e),
                }
            }
        })
    }

    async fn postprocess(&self, item: WorkItem<Self::Descriptor>) -> IngestResult<Self::Descriptor> {
        Ok(item.descriptor)
    }
}
