//! Local sentence-embedding provider backed by `fastembed`.
//!
//! The ONNX model is loaded on first use, then shared read-only by every
//! request. Inference is CPU-bound and runs on the blocking thread pool.
//!
//! This module is only available when the `fastembed` feature is enabled.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};

/// Output size of `all-MiniLM-L6-v2`.
const MINILM_DIMENSIONS: usize = 384;

fn map_err(message: impl Into<String>) -> RagError {
    RagError::EmbeddingError { provider: "fastembed".into(), message: message.into() }
}

fn default_cache_dir() -> PathBuf {
    std::env::var("FASTEMBED_CACHE_PATH")
        .ok()
        .or_else(|| std::env::var("HOME").ok().map(|home| format!("{home}/.cache/fastembed")))
        .unwrap_or_else(|| ".fastembed_cache".to_string())
        .into()
}

/// An [`EmbeddingProvider`] running a sentence-transformer model in process.
///
/// Defaults to `all-MiniLM-L6-v2` (384 dimensions). Model files are cached
/// under `FASTEMBED_CACHE_PATH`, falling back to `~/.cache/fastembed`.
///
/// # Example
///
/// ```rust,ignore
/// use subject_rag::local::LocalEmbeddingProvider;
///
/// let provider = LocalEmbeddingProvider::new();
/// let vectors = provider.embed_batch(&["first chunk", "second chunk"]).await?;
/// ```
pub struct LocalEmbeddingProvider {
    model: EmbeddingModel,
    dimensions: usize,
    cache_dir: PathBuf,
    handle: OnceCell<Arc<TextEmbedding>>,
}

impl Default for LocalEmbeddingProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalEmbeddingProvider {
    /// Create a provider for `all-MiniLM-L6-v2`.
    pub fn new() -> Self {
        Self::with_model(EmbeddingModel::AllMiniLML6V2, MINILM_DIMENSIONS)
    }

    /// Create a provider for another fastembed model of the given output size.
    pub fn with_model(model: EmbeddingModel, dimensions: usize) -> Self {
        Self { model, dimensions, cache_dir: default_cache_dir(), handle: OnceCell::new() }
    }

    /// Set the model cache directory.
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = dir.into();
        self
    }

    async fn model(&self) -> Result<Arc<TextEmbedding>> {
        self.handle
            .get_or_try_init(|| async {
                info!(model = ?self.model, cache_dir = %self.cache_dir.display(), "loading embedding model");
                let options = InitOptions::new(self.model.clone())
                    .with_cache_dir(self.cache_dir.clone())
                    .with_show_download_progress(false);
                let model = tokio::task::spawn_blocking(move || TextEmbedding::try_new(options))
                    .await
                    .map_err(|e| map_err(format!("model loading task failed: {e}")))?
                    .map_err(|e| map_err(format!("failed to initialize model: {e}")))?;
                Ok::<_, RagError>(Arc::new(model))
            })
            .await
            .cloned()
    }
}

#[async_trait]
impl EmbeddingProvider for LocalEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| map_err("model returned no embedding"))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let model = self.model().await?;
        let owned: Vec<String> = texts.iter().map(|t| t.to_string()).collect();

        debug!(provider = "fastembed", batch_size = owned.len(), "embedding batch");
        tokio::task::spawn_blocking(move || model.embed(owned, None))
            .await
            .map_err(|e| map_err(format!("embedding task failed: {e}")))?
            .map_err(|e| map_err(format!("failed to generate embeddings: {e}")))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
