//! Text generation trait for answer synthesis.

use async_trait::async_trait;

use crate::config::GenerationParams;
use crate::error::Result;

/// A sequence-generation model that produces one answer per prompt.
///
/// Implementations load their model once and reuse it for every call; the
/// same instance may serve concurrent requests. Backends honor the subset of
/// [`GenerationParams`] they support, but must bound the output length.
///
/// # Example
///
/// ```rust,ignore
/// use subject_rag::{GenerationParams, TextGenerator};
///
/// let answer = generator.generate(&prompt, &GenerationParams::default()).await?;
/// ```
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a completion for `prompt`.
    async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String>;

    /// Model identifier used in logs and errors.
    fn model_name(&self) -> &str;
}
