//! # Subject Chat with an OpenAI-compatible server
//!
//! Indexes a text file into a subject and answers a question with real
//! embedding and chat models. Works against the hosted API or any local
//! OpenAI-compatible server (Ollama, llama.cpp, vLLM).
//!
//! Hosted: `OPENAI_API_KEY=sk-... cargo run --example subject_chat_openai --features openai -- notes.txt "question"`
//!
//! Local: set `OPENAI_BASE_URL=http://localhost:11434/v1`, plus
//! `EMBEDDING_MODEL`, `EMBEDDING_DIMENSIONS` and `CHAT_MODEL`.

use std::sync::Arc;

use anyhow::Context;
use subject_rag::openai::{OpenAICompatibleGenerator, OpenAIEmbeddingProvider};
use subject_rag::{
    InMemorySubjectRegistry, InMemoryVectorStore, RagConfig, SubjectChatbot, SubjectRegistry,
    TextGenerator,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let mut args = std::env::args().skip(1);
    let path = args.next().context("usage: subject_chat_openai <file.txt> <question>")?;
    let question = args.next().context("missing question")?;

    let (embedder, generator) = match std::env::var("OPENAI_BASE_URL") {
        Ok(base_url) => {
            let embedding_model =
                std::env::var("EMBEDDING_MODEL").unwrap_or_else(|_| "nomic-embed-text".into());
            let dimensions: usize = std::env::var("EMBEDDING_DIMENSIONS")
                .unwrap_or_else(|_| "768".into())
                .parse()
                .context("EMBEDDING_DIMENSIONS must be an integer")?;
            let chat_model = std::env::var("CHAT_MODEL").unwrap_or_else(|_| "llama3.2".into());
            (
                OpenAIEmbeddingProvider::local(&base_url, embedding_model, dimensions),
                OpenAICompatibleGenerator::local(&base_url, chat_model),
            )
        }
        Err(_) => (OpenAIEmbeddingProvider::from_env()?, OpenAICompatibleGenerator::from_env()?),
    };
    info!(model = generator.model_name(), "using OpenAI-compatible backend");

    let registry = Arc::new(InMemorySubjectRegistry::new());
    let chatbot = SubjectChatbot::builder()
        .config(RagConfig::from_env()?)
        .embedding_provider(Arc::new(embedder))
        .vector_store(Arc::new(InMemoryVectorStore::new()))
        .generator(Arc::new(generator))
        .registry(registry.clone())
        .build()?;

    let subject = registry.create("Notes", None).await?;
    let content = tokio::fs::read(&path).await.with_context(|| format!("failed to read {path}"))?;
    let filename = std::path::Path::new(&path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(path.as_str())
        .to_string();

    let report = chatbot.ingest_upload(&subject.id, &filename, &content).await?;
    info!(chunks = report.chunks_created, document_id = %report.document_id, "indexed upload");

    let answer = chatbot.answer_question(&subject.id, &question).await?;
    println!("{}", answer.answer);
    if !answer.sources.is_empty() {
        println!("\nSources: {}", answer.sources.join(", "));
    }
    Ok(())
}
