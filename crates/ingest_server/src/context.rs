//! Dependency wiring (spec §4.1/§4.11): build every backend, every
//! stage, the orchestrator, and the management layer from one
//! [`AppSettings`], so `main` only has to call [`AppContext::build`].

use std::sync::Arc;

use ingest_artifact::PersistenceVisitor;
use ingest_core::Device;
use ingest_database::{build_pool, LineageTracker};
use ingest_error::IngestResult;
use ingest_management::{CascadeDeleter, StatusReporter};
use ingest_pipeline::frame::FfmpegFrameExtractor;
use ingest_pipeline::probe::FfprobeVideoProbe;
use ingest_pipeline::stages::asr::AsrTask;
use ingest_pipeline::stages::image_caption::ImageCaptionTask;
use ingest_pipeline::stages::image_embedding::ImageEmbeddingTask;
use ingest_pipeline::stages::image_extract::ImageExtractTask;
use ingest_pipeline::stages::ingest::IngestTask;
use ingest_pipeline::stages::segment_caption::SegmentCaptionTask;
use ingest_pipeline::stages::shot_detect::ShotDetectTask;
use ingest_pipeline::stages::text_embedding::{CaptionKind, TextEmbeddingTask};
use ingest_pipeline::stages::vector_ingest::{
    ImageVectorIngestTask, SegmentCaptionVectorIngestTask, TextImageCaptionVectorIngestTask,
};
use ingest_pipeline::task::TaskConfig;
use ingest_pipeline::FlowOrchestrator;
use ingest_registry::{HttpServiceRegistry, ServiceClient, ServiceRegistry};
use ingest_storage::{BlobStore, FileSystemBlobStore, S3BlobStore, S3Config};
use ingest_vector::{VectorIndexClient, IMAGE_EMBEDDING, SEGMENT_CAPTION_EMBEDDING, TEXT_IMAGE_CAPTION_EMBEDDING};

use crate::settings::AppSettings;

/// Dimensionality of the embedding vectors the image/text models
/// produce. Fixed at server startup since the collections are created
/// once here rather than on first insert (spec §4.6: collections are
/// provisioned ahead of traffic).
const EMBEDDING_DIM: u64 = 512;

fn build_blob_store(settings: &AppSettings) -> IngestResult<Arc<dyn BlobStore>> {
    match settings.storage_backend.as_str() {
        "filesystem" => {
            let base_path = settings
                .filesystem_base_path
                .clone()
                .unwrap_or_else(|| "./data/blobs".to_string());
            Ok(Arc::new(FileSystemBlobStore::new(base_path)?))
        }
        _ => {
            let config = S3Config {
                endpoint: settings.s3_endpoint.clone().unwrap_or_default(),
                region: settings.s3_region.clone(),
                access_key: settings.s3_access_key.clone().unwrap_or_default(),
                secret_key: settings.s3_secret_key.clone().unwrap_or_default(),
            };
            Ok(Arc::new(S3BlobStore::new(config)))
        }
    }
}

fn build_registry(settings: &AppSettings) -> Arc<dyn ServiceRegistry> {
    let services = &settings.services;
    let table = std::collections::HashMap::from([
        ("shot_detect".to_string(), (services.shot_detect.host.clone(), services.shot_detect.port)),
        ("asr".to_string(), (services.asr.host.clone(), services.asr.port)),
        ("segment_caption".to_string(), (services.segment_caption.host.clone(), services.segment_caption.port)),
        ("image_caption".to_string(), (services.image_caption.host.clone(), services.image_caption.port)),
        ("image_embedding".to_string(), (services.image_embedding.host.clone(), services.image_embedding.port)),
        ("text_embedding".to_string(), (services.text_embedding.host.clone(), services.text_embedding.port)),
    ]);
    Arc::new(HttpServiceRegistry::new(table))
}

/// Everything an HTTP handler needs: the orchestrator that drives a
/// submitted video through the full DAG, and the management layer
/// (deleter, status reporter) the `/management` routes call.
pub struct AppContext {
    /// Drives one video through the nine-stage ingestion DAG.
    pub orchestrator: FlowOrchestrator,
    /// Cascading deleter (spec §4.9).
    pub deleter: CascadeDeleter,
    /// Status reporter (spec §4.10).
    pub status: StatusReporter,
    /// Lineage tracker, kept directly for the startup migration run.
    pub lineage: LineageTracker,
    /// Vector index client, kept directly for startup collection setup.
    pub vector: Arc<VectorIndexClient>,
}

impl AppContext {
    /// Build every backend and stage from `settings`. Does not run
    /// migrations or provision vector collections; call
    /// [`AppContext::initialize`] after construction.
    pub fn build(settings: &AppSettings) -> IngestResult<Self> {
        let pool = build_pool(&settings.database_url, settings.database_pool_size)?;
        let lineage = LineageTracker::new(pool);

        let blob_store = build_blob_store(settings)?;
        let bucket = settings.storage_bucket.clone();
        let visitor = PersistenceVisitor::new(blob_store.clone(), lineage.clone(), bucket.clone());

        let vector = Arc::new(VectorIndexClient::connect(&settings.vector_index_url)?);
        let registry = build_registry(settings);

        let service = |name: &str| ServiceClient::new(registry.clone(), name.to_string());

        let ingest_task = IngestTask::new(visitor.clone(), Arc::new(FfprobeVideoProbe));
        let shot_detect = ShotDetectTask::new(
            visitor.clone(),
            service("shot_detect"),
            TaskConfig::new("shot-detect", Device::Cpu),
        );
        let asr = AsrTask::new(visitor.clone(), service("asr"), TaskConfig::new("asr", Device::Cpu));
        let image_extract = ImageExtractTask::new(visitor.clone(), Arc::new(FfmpegFrameExtractor), 5);
        let segment_caption = SegmentCaptionTask::new(
            visitor.clone(),
            service("segment_caption"),
            TaskConfig::new("segment-caption", Device::Cpu),
            Arc::new(FfmpegFrameExtractor),
            3,
        );
        let image_caption = ImageCaptionTask::new(
            visitor.clone(),
            service("image_caption"),
            TaskConfig::new("image-caption", Device::Cpu),
        );
        let image_embedding = ImageEmbeddingTask::new(
            visitor.clone(),
            service("image_embedding"),
            TaskConfig::new("image-embedding", Device::Cuda),
        );
        let text_image_caption_embedding = TextEmbeddingTask::new(
            visitor.clone(),
            service("text_embedding"),
            TaskConfig::new("text-embedding", Device::Cuda),
            CaptionKind::ImageCaption,
        );
        let segment_caption_embedding = TextEmbeddingTask::new(
            visitor.clone(),
            service("text_embedding"),
            TaskConfig::new("text-embedding", Device::Cuda),
            CaptionKind::SegmentCaption,
        );
        let image_vector_ingest =
            ImageVectorIngestTask::new(blob_store.clone(), vector.clone(), settings.vector_batch_size);
        let text_image_caption_vector_ingest = TextImageCaptionVectorIngestTask::new(
            blob_store.clone(),
            vector.clone(),
            settings.vector_batch_size,
        );
        let segment_caption_vector_ingest = SegmentCaptionVectorIngestTask::new(
            blob_store.clone(),
            vector.clone(),
            settings.vector_batch_size,
        );

        let orchestrator = FlowOrchestrator::new(
            lineage.clone(),
            ingest_task,
            shot_detect,
            asr,
            image_extract,
            segment_caption,
            image_caption,
            image_embedding,
            text_image_caption_embedding,
            segment_caption_embedding,
            image_vector_ingest,
            text_image_caption_vector_ingest,
            segment_caption_vector_ingest,
        );

        let deleter = CascadeDeleter::new(lineage.clone(), blob_store.clone(), bucket, vector.clone());
        let status = StatusReporter::new(lineage.clone(), vector.clone());

        Ok(Self { orchestrator, deleter, status, lineage, vector })
    }

    /// Run pending migrations and provision the three vector
    /// collections. Split from [`AppContext::build`] so a unit test can
    /// build a context without touching either external store.
    pub async fn initialize(&self) -> IngestResult<()> {
        self.lineage.initialize().await?;
        self.vector.ensure_collection(IMAGE_EMBEDDING, EMBEDDING_DIM).await?;
        self.vector.ensure_collection(TEXT_IMAGE_CAPTION_EMBEDDING, EMBEDDING_DIM).await?;
        self.vector.ensure_collection(SEGMENT_CAPTION_EMBEDDING, EMBEDDING_DIM).await?;
        self.vector.ensure_loaded(IMAGE_EMBEDDING).await?;
        self.vector.ensure_loaded(TEXT_IMAGE_CAPTION_EMBEDDING).await?;
        self.vector.ensure_loaded(SEGMENT_CAPTION_EMBEDDING).await?;
        Ok(())
    }
}
