//! Error types for the `subject-rag` crate.

use thiserror::Error;

/// Errors that can occur in subject RAG operations.
#[derive(Debug, Error)]
pub enum RagError {
    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred in the vector store backend.
    #[error("Vector store error ({backend}): {message}")]
    VectorStoreError {
        /// The vector store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// The answer generation model failed or timed out.
    #[error("Generation error ({model}): {message}")]
    GenerationError {
        /// The generation model that produced the error.
        model: String,
        /// A description of the failure.
        message: String,
    },

    /// A subject identifier cannot be mapped to a collection name.
    #[error("Invalid subject id: '{0}'")]
    InvalidSubjectId(String),

    /// The subject does not exist in the registry.
    #[error("Subject not found: {0}")]
    SubjectNotFound(String),

    /// The uploaded file type is not supported.
    #[error("Unsupported file type: '{0}' (only pdf and txt files are supported)")]
    UnsupportedFileType(String),

    /// The uploaded file exceeds the configured size limit.
    #[error("File size {size_bytes} bytes exceeds maximum of {max_bytes} bytes")]
    FileTooLarge {
        /// Size of the rejected upload.
        size_bytes: usize,
        /// Configured maximum.
        max_bytes: usize,
    },

    /// No text or no chunks could be produced from a document.
    #[error("Empty document: {0}")]
    EmptyDocument(String),

    /// Text extraction from a file failed.
    #[error("Extraction error: {0}")]
    ExtractionError(String),

    /// The subject registry failed to load or persist.
    #[error("Registry error: {0}")]
    RegistryError(String),

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl RagError {
    /// Whether the error was caused by caller input rather than a backend failure.
    ///
    /// A boundary layer maps these to client errors and everything else to
    /// server errors.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            RagError::InvalidSubjectId(_)
                | RagError::SubjectNotFound(_)
                | RagError::UnsupportedFileType(_)
                | RagError::FileTooLarge { .. }
                | RagError::EmptyDocument(_)
                | RagError::ExtractionError(_)
        )
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
