//! # Subject Chat Example
//!
//! Demonstrates the subject-scoped pipeline: create two subjects, upload a
//! document into each, then ask questions that only see their own subject.
//!
//! Uses `InMemoryVectorStore`, `InMemorySubjectRegistry`, a deterministic
//! `MockEmbeddingProvider` and an extractive `EchoGenerator`, so it runs with
//! **zero API keys**.
//!
//! Run: `cargo run --example subject_chat`

use std::sync::Arc;

use subject_rag::{
    EmbeddingProvider, GenerationParams, InMemorySubjectRegistry, InMemoryVectorStore, RagConfig,
    SubjectChatbot, SubjectRegistry, TextGenerator,
};
use tracing_subscriber::EnvFilter;

// ---------------------------------------------------------------------------
// MockEmbeddingProvider: bag-of-words hashing so overlapping words score close
// ---------------------------------------------------------------------------

struct MockEmbeddingProvider {
    dimensions: usize,
}

#[async_trait::async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed(&self, text: &str) -> subject_rag::Result<Vec<f32>> {
        let mut emb = vec![0.0f32; self.dimensions];
        for word in text.split(|c: char| !c.is_alphanumeric()).filter(|w| w.len() > 2) {
            let hash = word
                .to_lowercase()
                .bytes()
                .fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
            emb[(hash % self.dimensions as u64) as usize] += 1.0;
        }
        Ok(emb)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

// ---------------------------------------------------------------------------
// EchoGenerator: answers with the first numbered context entry
// ---------------------------------------------------------------------------

struct EchoGenerator;

#[async_trait::async_trait]
impl TextGenerator for EchoGenerator {
    async fn generate(
        &self,
        prompt: &str,
        _params: &GenerationParams,
    ) -> subject_rag::Result<String> {
        Ok(prompt
            .lines()
            .find_map(|line| line.strip_prefix("1. "))
            .unwrap_or_default()
            .to_string())
    }

    fn model_name(&self) -> &str {
        "echo"
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    // -- 1. Configure and build the chatbot -------------------------------
    // Small chunks make the sentence-aware splitting visible in the output.
    let config = RagConfig::builder().chunk_size(120).chunk_overlap(20).n_results(3).build()?;
    let registry = Arc::new(InMemorySubjectRegistry::new());

    let chatbot = SubjectChatbot::builder()
        .config(config)
        .embedding_provider(Arc::new(MockEmbeddingProvider { dimensions: 128 }))
        .vector_store(Arc::new(InMemoryVectorStore::new()))
        .generator(Arc::new(EchoGenerator))
        .registry(registry.clone())
        .build()?;

    // -- 2. Create subjects -----------------------------------------------
    let biology = registry.create("Biology", Some("Cell biology notes")).await?;
    let history = registry.create("History", None).await?;

    // -- 3. Upload one document per subject ---------------------------------
    let uploads = [
        (
            &biology,
            "cells.txt",
            "Mitochondria produce energy for the cell through respiration. \
             Ribosomes assemble proteins from amino acids. \
             The nucleus stores the genetic material of the cell.",
        ),
        (
            &history,
            "treaties.txt",
            "The Treaty of Westphalia ended the Thirty Years War in 1648. \
             The Congress of Vienna redrew the map of Europe in 1815.",
        ),
    ];

    for (subject, filename, text) in uploads {
        let report = chatbot.ingest_upload(&subject.id, filename, text.as_bytes()).await?;
        println!("{} / {} → {} chunk(s)", subject.name, filename, report.chunks_created);
    }

    // -- 4. Ask questions ---------------------------------------------------
    let questions = [
        (&biology, "Which organelle produces energy?"),
        (&biology, "When did the Thirty Years War end?"),
        (&history, "When did the Thirty Years War end?"),
    ];

    for (subject, question) in questions {
        let answer = chatbot.answer_question(&subject.id, question).await?;
        println!("\n[{}] {question}", subject.name);
        println!("  answer:  {}", answer.answer);
        println!("  sources: {:?}", answer.sources);
    }

    // -- 5. Delete a subject and ask again --------------------------------
    chatbot.delete_subject(&history.id).await?;
    let answer = chatbot.answer_question(&history.id, "When did the Thirty Years War end?").await?;
    println!("\n[deleted History] answer: {}", answer.answer);

    println!("\nDone.");
    Ok(())
}
