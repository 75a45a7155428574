//! Wire shapes for the fixed per-service microservice contract
//! (spec §6.3). Every ML service exposes `/load`, `/unload`, `/models`,
//! `/status`, and a service-specific `/infer`; these types are the
//! `/infer` request/response pairs.

use serde::{Deserialize, Serialize};

/// Request body for the shot-boundary service.
#[derive(Debug, Clone, Serialize)]
pub struct ShotDetectRequest<'a> {
    /// URL of the source video.
    pub s3_minio_url: &'a str,
    /// Free-form metadata passed through to the service.
    pub metadata: serde_json::Value,
}

/// Response from the shot-boundary service.
#[derive(Debug, Clone, Deserialize)]
pub struct ShotDetectResponse {
    /// Ordered `(start_frame, end_frame)` shot boundaries.
    pub scenes: Vec<(i64, i64)>,
    /// Number of scenes detected.
    pub total_scenes: usize,
    /// Service-reported status string.
    pub status: String,
}

/// Request body for the ASR service.
#[derive(Debug, Clone, Serialize)]
pub struct AsrRequest<'a> {
    /// URL of the source video.
    pub video_minio_url: &'a str,
    /// Free-form metadata passed through to the service.
    pub metadata: serde_json::Value,
    /// Optional per-call tuning.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<serde_json::Value>,
}

/// Response from the ASR service.
#[derive(Debug, Clone, Deserialize)]
pub struct AsrResponse {
    /// The transcription result.
    pub result: AsrResult,
    /// Service-reported status string.
    pub status: String,
}

/// The transcription payload nested under `AsrResponse::result`.
#[derive(Debug, Clone, Deserialize)]
pub struct AsrResult {
    /// Timestamped tokens, in temporal order (service contract).
    pub tokens: Vec<AsrResponseToken>,
    /// Wall-clock seconds the service spent transcribing.
    pub processing_time_seconds: f64,
    /// Duration of the transcribed audio, in seconds.
    pub audio_duration_seconds: f64,
}

/// One token in an ASR response.
#[derive(Debug, Clone, Deserialize)]
pub struct AsrResponseToken {
    /// The transcribed text.
    pub text: String,
    /// Start time in seconds.
    pub start: f64,
    /// End time in seconds.
    pub end: f64,
    /// Start frame index.
    pub start_frame: i64,
    /// End frame index.
    pub end_frame: i64,
}

/// Request body for an LLM captioning call.
#[derive(Debug, Clone, Serialize)]
pub struct LlmRequest<'a> {
    /// The fixed prompt template, already filled in.
    pub prompt: &'a str,
    /// Base64-encoded WebP images accompanying the prompt.
    pub image_base64: Vec<String>,
    /// Free-form metadata passed through to the service.
    pub metadata: serde_json::Value,
}

/// Response from an LLM captioning call.
#[derive(Debug, Clone, Deserialize)]
pub struct LlmResponse {
    /// The generated caption text.
    pub answer: String,
    /// Name of the model that produced the answer.
    pub model_name: String,
    /// Service-reported status string.
    pub status: String,
    /// Input token count, if the service reports one.
    pub input_tokens: Option<u64>,
    /// Output token count, if the service reports one.
    pub output_tokens: Option<u64>,
}

/// Request body for the image-embedding service. At least one of
/// `image_base64`/`text_input` must be present (spec §6.3).
#[derive(Debug, Clone, Serialize, Default)]
pub struct ImageEmbedRequest {
    /// Base64-encoded WebP images to embed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_base64: Option<Vec<String>>,
    /// Raw text to embed in the same vector space.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_input: Option<Vec<String>>,
    /// Free-form metadata passed through to the service.
    pub metadata: serde_json::Value,
}

/// Response from the image-embedding service.
#[derive(Debug, Clone, Deserialize)]
pub struct ImageEmbedResponse {
    /// Embeddings for each input image, in input order, if requested.
    pub image_embeddings: Option<Vec<Vec<f32>>>,
    /// Embeddings for each input text, in input order, if requested.
    pub text_embeddings: Option<Vec<Vec<f32>>>,
    /// Echoed request metadata.
    pub metadata: serde_json::Value,
    /// Service-reported status string.
    pub status: String,
}

/// Request body for the text-embedding service.
#[derive(Debug, Clone, Serialize)]
pub struct TextEmbedRequest {
    /// Texts to embed, in order.
    pub texts: Vec<String>,
    /// Free-form metadata passed through to the service.
    pub metadata: serde_json::Value,
}

/// Response from the text-embedding service.
#[derive(Debug, Clone, Deserialize)]
pub struct TextEmbedResponse {
    /// Embeddings, in the same order as the request's `texts`.
    pub embeddings: Vec<Vec<f32>>,
    /// Echoed input texts.
    pub texts: Vec<String>,
    /// Echoed request metadata.
    pub metadata: serde_json::Value,
    /// Service-reported status string.
    pub status: String,
}
