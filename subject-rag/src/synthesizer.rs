//! Answer synthesis from retrieved context.
//!
//! [`AnswerSynthesizer`] turns retrieved chunks into a numbered context
//! block, wraps it in an instruction prompt and asks a [`TextGenerator`] for
//! an answer. Missing context and degenerate model output both resolve to
//! [`NO_INFORMATION_ANSWER`].

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, warn};

use crate::config::{GenerationParams, RagConfig};
use crate::document::RetrievedChunk;
use crate::error::{RagError, Result};
use crate::generation::TextGenerator;

/// Answer returned when the subject documents hold nothing relevant.
pub const NO_INFORMATION_ANSWER: &str = "No information found in the subject documents.";

/// Generated answers shorter than this (after trimming) are discarded.
const MIN_ANSWER_CHARS: usize = 3;

/// Number the first `max_chunks` chunks into a prompt context block.
///
/// Returns an empty string when there are no chunks.
pub fn build_context<S: AsRef<str>>(chunks: &[S], max_chunks: usize) -> String {
    if chunks.is_empty() {
        return String::new();
    }

    let mut context = String::from("Context:\n");
    for (i, chunk) in chunks.iter().take(max_chunks).enumerate() {
        context.push_str(&format!("{}. {}\n\n", i + 1, chunk.as_ref()));
    }
    context
}

/// Build the instruction prompt asking for an answer grounded in `context`.
pub fn build_prompt(question: &str, context: &str) -> String {
    format!(
        "Based on the following context, answer the question. If the context doesn't contain \
         relevant information, say \"{NO_INFORMATION_ANSWER}\"\n\n{context}\n\nQuestion: {question}\nAnswer:"
    )
}

/// Replace empty or near-empty model output with the sentinel answer.
pub fn normalize_answer(raw: &str) -> String {
    let answer = raw.trim();
    if answer.chars().count() < MIN_ANSWER_CHARS {
        return NO_INFORMATION_ANSWER.to_string();
    }
    answer.to_string()
}

/// Produces grounded answers from retrieved chunks.
pub struct AnswerSynthesizer {
    generator: Arc<dyn TextGenerator>,
    params: GenerationParams,
    max_context_chunks: usize,
    timeout: Duration,
}

impl AnswerSynthesizer {
    /// Create a synthesizer using the generation settings from `config`.
    pub fn new(generator: Arc<dyn TextGenerator>, config: &RagConfig) -> Self {
        Self {
            generator,
            params: config.generation.clone(),
            max_context_chunks: config.max_context_chunks,
            timeout: config.generation_timeout(),
        }
    }

    /// Build the context block for the retrieved chunks.
    pub fn build_context(&self, chunks: &[RetrievedChunk]) -> String {
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        build_context(&texts, self.max_context_chunks)
    }

    /// Answer `question` from `context`.
    ///
    /// An empty context returns [`NO_INFORMATION_ANSWER`] without calling the
    /// model.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::GenerationError`] if the model fails or exceeds
    /// the configured timeout.
    pub async fn generate(&self, question: &str, context: &str) -> Result<String> {
        if context.is_empty() {
            return Ok(NO_INFORMATION_ANSWER.to_string());
        }

        let prompt = build_prompt(question, context);
        let model = self.generator.model_name().to_string();
        debug!(model = %model, prompt_len = prompt.len(), "generating answer");

        let raw = tokio::time::timeout(self.timeout, self.generator.generate(&prompt, &self.params))
            .await
            .map_err(|_| {
                error!(model = %model, timeout_secs = self.timeout.as_secs(), "generation timed out");
                RagError::GenerationError {
                    model: model.clone(),
                    message: format!("timed out after {}s", self.timeout.as_secs()),
                }
            })?
            .map_err(|e| {
                error!(model = %model, error = %e, "generation failed");
                e
            })?;

        let answer = normalize_answer(&raw);
        if answer == NO_INFORMATION_ANSWER && raw.trim() != NO_INFORMATION_ANSWER {
            warn!(model = %model, raw_len = raw.len(), "degenerate model output replaced");
        }
        Ok(answer)
    }
}
