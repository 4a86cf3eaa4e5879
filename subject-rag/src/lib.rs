//! # subject-rag
//!
//! Subject-scoped document question answering with Retrieval-Augmented Generation.
//!
//! ## Overview
//!
//! Documents are uploaded into subjects. Each subject owns one vector
//! collection, so a question asked in a subject only ever sees chunks of that
//! subject's documents. This crate provides:
//!
//! - [`SentenceWindowChunker`] - overlapping, sentence-aware text chunking
//! - [`SubjectIndex`] - per-subject collections over an [`EmbeddingProvider`] and a [`VectorStore`]
//! - [`Retriever`] - top-k context retrieval that degrades to empty on failure
//! - [`AnswerSynthesizer`] - grounded prompt construction and bounded generation
//! - [`SubjectChatbot`] - the orchestrator tying ingestion and answering together
//! - [`SubjectRegistry`] - subject and document records, in memory or in a JSON file
//!
//! ## Backends
//!
//! | Feature | Module | Provides |
//! |---------|--------|----------|
//! | `openai` | `openai` | OpenAI-compatible embeddings and chat generation |
//! | `qdrant` | `qdrant` | Qdrant vector store |
//! | `fastembed` | `local` | In-process sentence-transformer embeddings |
//! | `pdf` | `pdf` | PDF text extraction |
//!
//! [`InMemoryVectorStore`] is always available.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use subject_rag::{InMemorySubjectRegistry, InMemoryVectorStore, RagConfig, SubjectChatbot};
//!
//! let registry = Arc::new(InMemorySubjectRegistry::new());
//! let subject = registry.create("Biology", Some("Cell biology notes")).await?;
//!
//! let chatbot = SubjectChatbot::builder()
//!     .config(RagConfig::from_env()?)
//!     .embedding_provider(Arc::new(embedder))
//!     .vector_store(Arc::new(InMemoryVectorStore::new()))
//!     .generator(Arc::new(generator))
//!     .registry(registry)
//!     .build()?;
//!
//! chatbot.ingest_upload(&subject.id, "cells.txt", &bytes).await?;
//! let answer = chatbot.answer_question(&subject.id, "What is a ribosome?").await?;
//! println!("{} (sources: {:?})", answer.answer, answer.sources);
//! ```

pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod index;
pub mod ingest;
pub mod inmemory;
pub mod pipeline;
pub mod retriever;
pub mod subjects;
pub mod synthesizer;
pub mod vectorstore;

#[cfg(feature = "fastembed")]
pub mod local;
#[cfg(feature = "openai")]
pub mod openai;
#[cfg(feature = "pdf")]
pub mod pdf;
#[cfg(feature = "qdrant")]
pub mod qdrant;

pub use chunking::{Chunker, SentenceWindowChunker, chunk_text};
pub use config::{GenerationParams, RagConfig, RagConfigBuilder};
pub use document::{
    Answer, Chunk, ChunkMetadata, DocumentMetadata, DocumentRecord, FileType, RetrievedChunk,
    SearchResult, Subject,
};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use generation::TextGenerator;
pub use index::{SubjectIndex, collection_name};
pub use ingest::{IngestReport, PlainTextExtractor, TextExtractor};
pub use inmemory::InMemoryVectorStore;
pub use pipeline::{SubjectChatbot, SubjectChatbotBuilder};
pub use retriever::Retriever;
pub use subjects::{InMemorySubjectRegistry, JsonFileSubjectRegistry, SubjectRegistry};
pub use synthesizer::{AnswerSynthesizer, NO_INFORMATION_ANSWER};
pub use vectorstore::VectorStore;

#[cfg(feature = "fastembed")]
pub use local::LocalEmbeddingProvider;
#[cfg(feature = "openai")]
pub use openai::{OpenAICompatibleGenerator, OpenAIEmbeddingProvider};
#[cfg(feature = "pdf")]
pub use pdf::PdfTextExtractor;
#[cfg(feature = "qdrant")]
pub use qdrant::QdrantVectorStore;
