//! RAII-ish model lifecycle bracketing (SPEC_FULL.md §A.6): load a
//! model, run a closure, and unload it afterward even if the closure
//! fails, instead of leaving a loaded model behind on error.

use std::future::Future;

use ingest_error::IngestResult;

use crate::client::ServiceClient;

/// Load `model_id` on `client`, run `f`, and unload the model
/// regardless of whether `f` succeeded. The unload failure (if any)
/// is logged but never masks `f`'s own result.
pub async fn scoped_model<F, Fut, T>(
    client: &ServiceClient,
    model_id: &str,
    f: F,
) -> IngestResult<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = IngestResult<T>>,
{
    client.load_model(model_id).await?;

    let result = f().await;

    if let Err(e) = client.unload_model(model_id).await {
        tracing::warn!(model_id, error = %e, "failed to unload model after use");
    }

    result
}
