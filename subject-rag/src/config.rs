//! Configuration for the subject RAG pipeline.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Decoding knobs passed to the answer generation model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationParams {
    /// Prompts longer than this many tokens are truncated by the model backend.
    pub max_input_tokens: usize,
    /// Upper bound on generated tokens.
    pub max_output_tokens: usize,
    /// Beam width for backends that support beam search.
    pub num_beams: usize,
    /// Stop beam search once every beam has finished.
    pub early_stopping: bool,
    /// Sampling temperature.
    pub temperature: f32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_input_tokens: 512,
            max_output_tokens: 150,
            num_beams: 4,
            early_stopping: true,
            temperature: 0.7,
        }
    }
}

/// Configuration parameters for the subject RAG pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagConfig {
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Number of overlapping characters between consecutive chunks.
    pub chunk_overlap: usize,
    /// Number of chunks retrieved per question.
    pub n_results: usize,
    /// Maximum number of retrieved chunks placed in the prompt context.
    pub max_context_chunks: usize,
    /// Upload size limit in megabytes.
    pub max_file_size_mb: usize,
    /// Upper bound on a single generation call, in seconds.
    pub generation_timeout_secs: u64,
    /// Decoding parameters for the generation model.
    pub generation: GenerationParams,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 50,
            n_results: 5,
            max_context_chunks: 5,
            max_file_size_mb: 10,
            generation_timeout_secs: 120,
            generation: GenerationParams::default(),
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// Load configuration from `RAG_*` environment variables on top of the defaults.
    ///
    /// Recognized variables: `RAG_CHUNK_SIZE`, `RAG_CHUNK_OVERLAP`,
    /// `RAG_N_RESULTS`, `RAG_MAX_FILE_SIZE_MB`, `RAG_GENERATION_TIMEOUT_SECS`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if a variable cannot be parsed or the
    /// resulting configuration is invalid.
    pub fn from_env() -> Result<Self> {
        let mut builder = Self::builder();
        if let Some(v) = env_var("RAG_CHUNK_SIZE")? {
            builder = builder.chunk_size(v);
        }
        if let Some(v) = env_var("RAG_CHUNK_OVERLAP")? {
            builder = builder.chunk_overlap(v);
        }
        if let Some(v) = env_var("RAG_N_RESULTS")? {
            builder = builder.n_results(v);
        }
        if let Some(v) = env_var("RAG_MAX_FILE_SIZE_MB")? {
            builder = builder.max_file_size_mb(v);
        }
        if let Some(v) = env_var("RAG_GENERATION_TIMEOUT_SECS")? {
            builder = builder.generation_timeout_secs(v);
        }
        builder.build()
    }

    /// Upload size limit in bytes.
    pub fn max_file_size_bytes(&self) -> usize {
        self.max_file_size_mb.saturating_mul(1024 * 1024)
    }

    /// Generation timeout as a [`Duration`].
    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation_timeout_secs)
    }
}

fn env_var<T: FromStr>(name: &str) -> Result<Option<T>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| RagError::ConfigError(format!("{name} has an invalid value: '{raw}'"))),
        Err(_) => Ok(None),
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the maximum chunk size in characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks in characters.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Set the number of chunks retrieved per question.
    pub fn n_results(mut self, n: usize) -> Self {
        self.config.n_results = n;
        self
    }

    /// Set how many retrieved chunks are placed in the prompt context.
    pub fn max_context_chunks(mut self, n: usize) -> Self {
        self.config.max_context_chunks = n;
        self
    }

    /// Set the upload size limit in megabytes.
    pub fn max_file_size_mb(mut self, mb: usize) -> Self {
        self.config.max_file_size_mb = mb;
        self
    }

    /// Set the generation timeout in seconds.
    pub fn generation_timeout_secs(mut self, secs: u64) -> Self {
        self.config.generation_timeout_secs = secs;
        self
    }

    /// Replace the generation parameters.
    pub fn generation(mut self, params: GenerationParams) -> Self {
        self.config.generation = params;
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if:
    /// - `chunk_size == 0`
    /// - `chunk_overlap >= chunk_size`
    /// - `n_results == 0` or `max_context_chunks == 0`
    /// - `num_beams == 0` or `max_output_tokens == 0`
    pub fn build(self) -> Result<RagConfig> {
        let config = self.config;
        if config.chunk_size == 0 {
            return Err(RagError::ConfigError("chunk_size must be greater than zero".to_string()));
        }
        if config.chunk_overlap >= config.chunk_size {
            return Err(RagError::ConfigError(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                config.chunk_overlap, config.chunk_size
            )));
        }
        if config.n_results == 0 {
            return Err(RagError::ConfigError("n_results must be greater than zero".to_string()));
        }
        if config.max_context_chunks == 0 {
            return Err(RagError::ConfigError(
                "max_context_chunks must be greater than zero".to_string(),
            ));
        }
        if config.generation.num_beams == 0 {
            return Err(RagError::ConfigError("num_beams must be greater than zero".to_string()));
        }
        if config.generation.max_output_tokens == 0 {
            return Err(RagError::ConfigError(
                "max_output_tokens must be greater than zero".to_string(),
            ));
        }
        Ok(config)
    }
}
