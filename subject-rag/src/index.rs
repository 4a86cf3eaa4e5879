//! Per-subject vector index.
//!
//! [`SubjectIndex`] maps each subject to one vector store collection named
//! `subject_{subject_id}`, embeds chunks and queries through the configured
//! [`EmbeddingProvider`], and applies the read-path policy that a failed
//! query degrades to an empty result.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, error, info, warn};

use crate::document::{Chunk, DocumentMetadata, RetrievedChunk};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

/// Longest collection name accepted by the common vector store backends.
const MAX_COLLECTION_NAME_LEN: usize = 63;

/// Derive the collection name for a subject.
///
/// # Errors
///
/// Returns [`RagError::InvalidSubjectId`] if the id is empty, contains
/// characters other than ASCII alphanumerics, `-` and `_`, or yields a name
/// longer than 63 characters.
pub fn collection_name(subject_id: &str) -> Result<String> {
    let valid_chars =
        subject_id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    let name = format!("subject_{subject_id}");
    if subject_id.is_empty() || !valid_chars || name.len() > MAX_COLLECTION_NAME_LEN {
        return Err(RagError::InvalidSubjectId(subject_id.to_string()));
    }
    Ok(name)
}

/// A vector index holding one collection per subject.
///
/// Collections are created on first write or query. Writes fail loudly;
/// queries never do: any failure on the read path is logged, counted in
/// [`degraded_queries`](SubjectIndex::degraded_queries) and reported as an
/// empty result.
pub struct SubjectIndex {
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
    degraded_queries: AtomicU64,
}

impl SubjectIndex {
    /// Create an index over the given embedder and vector store.
    pub fn new(
        embedding_provider: Arc<dyn EmbeddingProvider>,
        vector_store: Arc<dyn VectorStore>,
    ) -> Self {
        Self { embedding_provider, vector_store, degraded_queries: AtomicU64::new(0) }
    }

    /// Return a reference to the embedding provider.
    pub fn embedding_provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedding_provider
    }

    /// Return a reference to the vector store.
    pub fn vector_store(&self) -> &Arc<dyn VectorStore> {
        &self.vector_store
    }

    /// Number of queries that degraded to an empty result since creation.
    pub fn degraded_queries(&self) -> u64 {
        self.degraded_queries.load(Ordering::Relaxed)
    }

    async fn get_or_create(&self, subject_id: &str) -> Result<String> {
        let name = collection_name(subject_id)?;
        self.vector_store.create_collection(&name, self.embedding_provider.dimensions()).await?;
        Ok(name)
    }

    /// Embed and store a document's chunks in its subject's collection.
    ///
    /// Chunk `i` gets the id `{document_id}_chunk_{i}` and the document
    /// metadata plus `chunk_index` and `document_id`. All chunks are written
    /// in one batch. Returns the number of chunks added; an empty slice adds
    /// nothing and touches neither the embedder nor the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the subject id is invalid, or if embedding or
    /// storage fails.
    pub async fn add(
        &self,
        subject_id: &str,
        document_id: &str,
        chunks: &[String],
        metadata: &DocumentMetadata,
    ) -> Result<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }
        let collection = self.get_or_create(subject_id).await?;

        let texts: Vec<&str> = chunks.iter().map(String::as_str).collect();
        let embeddings = self.embedding_provider.embed_batch(&texts).await.map_err(|e| {
            error!(subject_id, document_id, error = %e, "embedding failed during indexing");
            e
        })?;
        if embeddings.len() != chunks.len() {
            return Err(RagError::EmbeddingError {
                provider: "embedder".to_string(),
                message: format!(
                    "expected {} embeddings, received {}",
                    chunks.len(),
                    embeddings.len()
                ),
            });
        }

        let records: Vec<Chunk> = chunks
            .iter()
            .zip(embeddings)
            .enumerate()
            .map(|(i, (text, embedding))| Chunk {
                id: Chunk::chunk_id(document_id, i),
                text: text.clone(),
                embedding,
                metadata: metadata.to_chunk_payload(document_id, i),
                document_id: document_id.to_string(),
            })
            .collect();

        self.vector_store.upsert(&collection, &records).await.map_err(|e| {
            error!(subject_id, document_id, error = %e, "upsert failed during indexing");
            e
        })?;

        let chunk_count = records.len();
        info!(subject_id, document_id, chunk_count, "indexed document");
        Ok(chunk_count)
    }

    /// Retrieve up to `n_results` chunks nearest to `query_text`, ascending by distance.
    ///
    /// An empty collection returns an empty result without embedding the
    /// query. The neighbor count is clamped to the collection size.
    pub async fn query(
        &self,
        subject_id: &str,
        query_text: &str,
        n_results: usize,
    ) -> Vec<RetrievedChunk> {
        match self.try_query(subject_id, query_text, n_results).await {
            Ok(results) => results,
            Err(e) => {
                self.degraded_queries.fetch_add(1, Ordering::Relaxed);
                warn!(subject_id, error = %e, "query failed, degrading to empty result");
                Vec::new()
            }
        }
    }

    async fn try_query(
        &self,
        subject_id: &str,
        query_text: &str,
        n_results: usize,
    ) -> Result<Vec<RetrievedChunk>> {
        let collection = self.get_or_create(subject_id).await?;

        let available = self.vector_store.count(&collection).await?;
        let top_k = n_results.min(available);
        if top_k == 0 {
            debug!(subject_id, available, "nothing to search");
            return Ok(Vec::new());
        }

        let query_embedding = self.embedding_provider.embed(query_text).await?;
        let results = self.vector_store.search(&collection, &query_embedding, top_k).await?;

        debug!(subject_id, top_k, result_count = results.len(), "query completed");
        Ok(results.into_iter().map(RetrievedChunk::from).collect())
    }

    /// Delete a subject's collection. Deleting a missing collection is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the subject id is invalid or the backend fails.
    pub async fn delete_collection(&self, subject_id: &str) -> Result<()> {
        let collection = collection_name(subject_id)?;
        self.vector_store.delete_collection(&collection).await?;
        info!(subject_id, "deleted subject collection");
        Ok(())
    }

    /// Number of chunks indexed for a subject.
    pub async fn count(&self, subject_id: &str) -> Result<usize> {
        let collection = collection_name(subject_id)?;
        self.vector_store.count(&collection).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collection_names_are_prefixed() {
        assert_eq!(collection_name("abc-123_x").unwrap(), "subject_abc-123_x");
        let uuid = "550e8400-e29b-41d4-a716-446655440000";
        assert_eq!(collection_name(uuid).unwrap(), format!("subject_{uuid}"));
    }

    #[test]
    fn rejects_unusable_ids() {
        assert!(collection_name("").is_err());
        assert!(collection_name("../etc").is_err());
        assert!(collection_name("has space").is_err());
        assert!(collection_name(&"a".repeat(60)).is_err());
    }
}
