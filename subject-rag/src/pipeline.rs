//! Subject chatbot orchestrator.
//!
//! The [`SubjectChatbot`] is the entry point an outer service calls. It
//! composes a [`Retriever`] and an [`AnswerSynthesizer`] for questions, and
//! a [`Chunker`] plus the [`SubjectIndex`] for document ingestion.
//!
//! # Example
//!
//! ```rust,ignore
//! use subject_rag::{InMemorySubjectRegistry, InMemoryVectorStore, RagConfig, SubjectChatbot};
//!
//! let chatbot = SubjectChatbot::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(my_embedder))
//!     .vector_store(Arc::new(InMemoryVectorStore::new()))
//!     .generator(Arc::new(my_generator))
//!     .registry(Arc::new(InMemorySubjectRegistry::new()))
//!     .build()?;
//!
//! chatbot.ingest_upload(&subject.id, "notes.txt", &bytes).await?;
//! let answer = chatbot.answer_question(&subject.id, "What is osmosis?").await?;
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info};
use uuid::Uuid;

use crate::chunking::{Chunker, SentenceWindowChunker};
use crate::config::RagConfig;
use crate::document::{Answer, DocumentMetadata, DocumentRecord, FileType, RetrievedChunk};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generation::TextGenerator;
use crate::index::SubjectIndex;
use crate::ingest::{IngestReport, TextExtractor, validate_upload};
use crate::retriever::Retriever;
use crate::subjects::SubjectRegistry;
use crate::synthesizer::{AnswerSynthesizer, NO_INFORMATION_ANSWER};
use crate::vectorstore::VectorStore;

/// Collect distinct source filenames in first-seen order.
///
/// Chunks whose metadata has no filename are skipped.
pub fn collect_sources(chunks: &[RetrievedChunk]) -> Vec<String> {
    let mut seen = HashSet::new();
    chunks
        .iter()
        .filter_map(|c| c.metadata.filename.as_deref())
        .filter(|filename| seen.insert(*filename))
        .map(str::to_string)
        .collect()
}

/// Answers questions against a subject's documents and indexes new uploads.
///
/// Construct one via [`SubjectChatbot::builder()`]. The chatbot keeps no
/// per-request state; share it behind an `Arc`.
pub struct SubjectChatbot {
    config: RagConfig,
    registry: Arc<dyn SubjectRegistry>,
    index: Arc<SubjectIndex>,
    retriever: Retriever,
    synthesizer: AnswerSynthesizer,
    chunker: Arc<dyn Chunker>,
    extractor: Arc<dyn TextExtractor>,
}

impl SubjectChatbot {
    /// Create a new [`SubjectChatbotBuilder`].
    pub fn builder() -> SubjectChatbotBuilder {
        SubjectChatbotBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return a reference to the subject registry.
    pub fn registry(&self) -> &Arc<dyn SubjectRegistry> {
        &self.registry
    }

    /// Return a reference to the subject index.
    pub fn index(&self) -> &Arc<SubjectIndex> {
        &self.index
    }

    /// Answer a question using the configured number of retrieved chunks.
    ///
    /// # Errors
    ///
    /// Returns an error only if answer generation fails.
    pub async fn answer_question(&self, subject_id: &str, question: &str) -> Result<Answer> {
        self.answer_question_with(subject_id, question, self.config.n_results).await
    }

    /// Answer a question from up to `n_results` retrieved chunks.
    ///
    /// When nothing is retrieved the sentinel answer is returned with no
    /// sources and the generation model is not called.
    ///
    /// # Errors
    ///
    /// Returns an error only if answer generation fails.
    pub async fn answer_question_with(
        &self,
        subject_id: &str,
        question: &str,
        n_results: usize,
    ) -> Result<Answer> {
        let chunks = self.retriever.retrieve(subject_id, question, n_results).await;
        if chunks.is_empty() {
            info!(subject_id, result_count = 0, "no context found for question");
            return Ok(Answer { answer: NO_INFORMATION_ANSWER.to_string(), sources: Vec::new() });
        }

        let context = self.synthesizer.build_context(&chunks);
        let answer = self.synthesizer.generate(question, &context).await.map_err(|e| {
            error!(subject_id, error = %e, "answer generation failed");
            e
        })?;
        let sources = collect_sources(&chunks);

        info!(subject_id, result_count = chunks.len(), source_count = sources.len(), "answered question");
        Ok(Answer { answer, sources })
    }

    /// Validate, extract, chunk and index an uploaded file.
    ///
    /// # Errors
    ///
    /// Returns a client error ([`RagError::is_client_error`]) for an unknown
    /// subject, unsupported type, oversized content, failed extraction or a
    /// document without text; other errors come from embedding, storage or
    /// the registry.
    pub async fn ingest_upload(
        &self,
        subject_id: &str,
        filename: &str,
        content: &[u8],
    ) -> Result<IngestReport> {
        self.require_subject(subject_id).await?;
        let file_type = validate_upload(filename, content.len(), self.config.max_file_size_bytes())?;
        let text = self.extractor.extract(file_type, content)?;
        self.ingest_text(subject_id, filename, file_type, &text).await
    }

    /// Chunk and index already-extracted document text.
    ///
    /// # Errors
    ///
    /// See [`ingest_upload`](SubjectChatbot::ingest_upload).
    pub async fn ingest_text(
        &self,
        subject_id: &str,
        filename: &str,
        file_type: FileType,
        text: &str,
    ) -> Result<IngestReport> {
        self.require_subject(subject_id).await?;
        if text.trim().is_empty() {
            return Err(RagError::EmptyDocument(format!(
                "no text could be extracted from '{filename}'"
            )));
        }

        let chunks = self.chunker.chunk(text);
        if chunks.is_empty() {
            return Err(RagError::EmptyDocument(format!(
                "no valid chunks created from '{filename}'"
            )));
        }

        let document_id = Uuid::new_v4().to_string();
        let metadata = DocumentMetadata {
            filename: filename.to_string(),
            file_type,
            subject_id: subject_id.to_string(),
        };
        let chunks_created = self.index.add(subject_id, &document_id, &chunks, &metadata).await?;

        let record = DocumentRecord {
            id: document_id.clone(),
            filename: filename.to_string(),
            file_type,
            uploaded_at: Utc::now(),
        };
        if !self.registry.attach_document(subject_id, record).await? {
            // The subject was deleted mid-upload; drop the collection we just refilled.
            self.index.delete_collection(subject_id).await?;
            return Err(RagError::SubjectNotFound(subject_id.to_string()));
        }

        info!(subject_id, document.id = %document_id, chunks_created, "ingested document");
        Ok(IngestReport {
            document_id,
            subject_id: subject_id.to_string(),
            filename: filename.to_string(),
            file_type,
            chunks_created,
        })
    }

    /// Delete a subject together with its vector collection.
    ///
    /// The registry record goes first, so an upload racing with the delete
    /// fails to attach and drops the chunks it wrote. Returns `false` if the
    /// subject does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry or collection deletion fails.
    pub async fn delete_subject(&self, subject_id: &str) -> Result<bool> {
        if !self.registry.delete(subject_id).await? {
            return Ok(false);
        }
        self.index.delete_collection(subject_id).await?;
        info!(subject_id, "deleted subject");
        Ok(true)
    }

    async fn require_subject(&self, subject_id: &str) -> Result<()> {
        match self.registry.get(subject_id).await? {
            Some(_) => Ok(()),
            None => Err(RagError::SubjectNotFound(subject_id.to_string())),
        }
    }
}

/// Builder for constructing a [`SubjectChatbot`].
///
/// `config`, `embedding_provider`, `vector_store`, `generator` and `registry`
/// are required. The chunker defaults to a [`SentenceWindowChunker`] sized
/// from the config, and the extractor to [`PlainTextExtractor`](crate::PlainTextExtractor) (or
/// `PdfTextExtractor` with the `pdf` feature).
///
/// # Example
///
/// ```rust,ignore
/// let chatbot = SubjectChatbot::builder()
///     .config(RagConfig::default())
///     .embedding_provider(Arc::new(embedder))
///     .vector_store(Arc::new(store))
///     .generator(Arc::new(generator))
///     .registry(Arc::new(registry))
///     .text_extractor(Arc::new(pdf_extractor))  // optional
///     .build()?;
/// ```
#[derive(Default)]
pub struct SubjectChatbotBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    generator: Option<Arc<dyn TextGenerator>>,
    registry: Option<Arc<dyn SubjectRegistry>>,
    chunker: Option<Arc<dyn Chunker>>,
    extractor: Option<Arc<dyn TextExtractor>>,
}

impl SubjectChatbotBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the vector store backend.
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    /// Set the answer generation model.
    pub fn generator(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Set the subject registry.
    pub fn registry(mut self, registry: Arc<dyn SubjectRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Override the document chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Override the text extractor used by [`SubjectChatbot::ingest_upload`].
    pub fn text_extractor(mut self, extractor: Arc<dyn TextExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    /// Build the [`SubjectChatbot`], validating that all required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if any required field is missing.
    pub fn build(self) -> Result<SubjectChatbot> {
        let config =
            self.config.ok_or_else(|| RagError::ConfigError("config is required".to_string()))?;
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::ConfigError("embedding_provider is required".to_string()))?;
        let vector_store = self
            .vector_store
            .ok_or_else(|| RagError::ConfigError("vector_store is required".to_string()))?;
        let generator = self
            .generator
            .ok_or_else(|| RagError::ConfigError("generator is required".to_string()))?;
        let registry = self
            .registry
            .ok_or_else(|| RagError::ConfigError("registry is required".to_string()))?;

        let chunker = self
            .chunker
            .unwrap_or_else(|| Arc::new(SentenceWindowChunker::from_config(&config)));
        let extractor = self.extractor.unwrap_or_else(default_extractor);

        let index = Arc::new(SubjectIndex::new(embedding_provider, vector_store));
        let retriever = Retriever::new(Arc::clone(&registry), Arc::clone(&index));
        let synthesizer = AnswerSynthesizer::new(generator, &config);

        Ok(SubjectChatbot { config, registry, index, retriever, synthesizer, chunker, extractor })
    }
}

#[cfg(feature = "pdf")]
fn default_extractor() -> Arc<dyn TextExtractor> {
    Arc::new(crate::pdf::PdfTextExtractor)
}

#[cfg(not(feature = "pdf"))]
fn default_extractor() -> Arc<dyn TextExtractor> {
    Arc::new(crate::ingest::PlainTextExtractor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::ChunkMetadata;

    fn retrieved(text: &str, filename: Option<&str>) -> RetrievedChunk {
        RetrievedChunk {
            text: text.to_string(),
            metadata: ChunkMetadata {
                filename: filename.map(str::to_string),
                ..ChunkMetadata::default()
            },
            distance: 0.1,
        }
    }

    #[test]
    fn sources_dedup_in_first_seen_order() {
        let chunks = vec![
            retrieved("a1", Some("A.pdf")),
            retrieved("b1", Some("B.pdf")),
            retrieved("a2", Some("A.pdf")),
            retrieved("x", None),
            retrieved("c1", Some("C.txt")),
        ];
        assert_eq!(collect_sources(&chunks), vec!["A.pdf", "B.pdf", "C.txt"]);
    }

    #[test]
    fn builder_rejects_missing_components() {
        let result = SubjectChatbot::builder().config(RagConfig::default()).build();
        assert!(matches!(result, Err(RagError::ConfigError(_))));
    }
}
