//! Subject-aware retrieval.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::document::RetrievedChunk;
use crate::index::SubjectIndex;
use crate::subjects::SubjectRegistry;

/// Fetches the chunks nearest to a question from a subject's index.
///
/// The registry is consulted first: an unknown subject, or one with no
/// documents, returns nothing without embedding the question or touching
/// the index.
pub struct Retriever {
    registry: Arc<dyn SubjectRegistry>,
    index: Arc<SubjectIndex>,
}

impl Retriever {
    /// Create a retriever that checks subjects in `registry` before querying `index`.
    pub fn new(registry: Arc<dyn SubjectRegistry>, index: Arc<SubjectIndex>) -> Self {
        Self { registry, index }
    }

    /// Retrieve up to `n_results` chunks ordered by ascending distance.
    pub async fn retrieve(
        &self,
        subject_id: &str,
        question: &str,
        n_results: usize,
    ) -> Vec<RetrievedChunk> {
        let subject = match self.registry.get(subject_id).await {
            Ok(subject) => subject,
            Err(e) => {
                warn!(subject_id, error = %e, "subject lookup failed, treating as empty");
                None
            }
        };
        if !subject.is_some_and(|s| s.has_documents()) {
            debug!(subject_id, "subject has no documents, skipping retrieval");
            return Vec::new();
        }

        self.index.query(subject_id, question, n_results).await
    }
}
