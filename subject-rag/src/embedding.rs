//! Embedding provider trait for chunk and query vectors.

use async_trait::async_trait;

use crate::error::Result;

/// A provider that maps text to fixed-dimension vectors.
///
/// Implementations must be deterministic for a fixed model and preserve
/// input order in [`embed_batch`](EmbeddingProvider::embed_batch). A
/// document's chunks are embedded in one batch; questions go through
/// [`embed`](EmbeddingProvider::embed).
///
/// # Example
///
/// ```rust,ignore
/// use subject_rag::EmbeddingProvider;
///
/// let vectors = provider.embed_batch(&["first chunk", "second chunk"]).await?;
/// assert!(vectors.iter().all(|v| v.len() == provider.dimensions()));
/// ```
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed one text, typically a question.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed several texts, returning one vector per input in input order.
    ///
    /// Falls back to one [`embed`](EmbeddingProvider::embed) call per text.
    /// Backends with a native batch endpoint should override it.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }

    /// Length of every vector this provider returns.
    fn dimensions(&self) -> usize;
}
