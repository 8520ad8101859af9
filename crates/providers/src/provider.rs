//! The generation provider seam between the session manager and a runtime.

use anyhow::Result;
use shared::generation_api::{ModelHandle, SamplingConfig, StreamChunk};
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

/// Callback for fractional model-resolution progress (0.0..=1.0).
pub type ProgressFn = Box<dyn Fn(f64) + Send + Sync>;

/// A model runtime the session manager can stream tokens from.
///
/// Note: Uses async_trait for object safety
#[async_trait::async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Make sure `model` is loadable, pulling it if needed. Potentially slow;
    /// reports download progress through `progress`.
    async fn resolve_model(&self, model: &str, progress: ProgressFn) -> Result<ModelHandle>;

    /// Stream generated text for `prompt` into `tx`, one chunk per send, in
    /// order.
    ///
    /// Contract: if the request fails *before* any chunk is produced, this
    /// returns `Err(...)`. Once streaming has started, failures are reported
    /// as `StreamChunk::Error` and the method returns `Ok(())`. The provider
    /// checks `cancel` between chunks and stops promptly once it fires; it
    /// does not send `Done` for a cancelled stream.
    async fn generate_stream(
        &self,
        handle: &ModelHandle,
        prompt: &str,
        sampling: &SamplingConfig,
        tx: UnboundedSender<StreamChunk>,
        cancel: CancellationToken,
    ) -> Result<()>;
}
