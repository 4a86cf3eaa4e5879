//! Vector store trait for storing and searching vector embeddings.

use async_trait::async_trait;

use crate::document::{Chunk, SearchResult};
use crate::error::Result;

/// A storage backend for named collections of embedded [`Chunk`]s.
///
/// One collection holds one subject's chunks. Implementations must be safe
/// to share between concurrent requests: an [`upsert`](VectorStore::upsert)
/// batch becomes visible to searches all at once or not at all.
///
/// # Example
///
/// ```rust,ignore
/// use subject_rag::{VectorStore, InMemoryVectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.create_collection("subject_abc", 384).await?;
/// store.upsert("subject_abc", &chunks).await?;
/// let results = store.search("subject_abc", &query_embedding, 5).await?;
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create a named collection. No-op if it already exists.
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()>;

    /// Delete a named collection and all its data. No-op if it does not exist.
    async fn delete_collection(&self, name: &str) -> Result<()>;

    /// Insert or replace chunks in a collection as one atomic batch.
    /// Chunks must have embeddings set.
    async fn upsert(&self, collection: &str, chunks: &[Chunk]) -> Result<()>;

    /// Search for the `top_k` nearest chunks to the given embedding.
    ///
    /// Returns results ordered by ascending distance.
    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchResult>>;

    /// Number of chunks in a collection; 0 if it does not exist.
    async fn count(&self, collection: &str) -> Result<usize>;
}
