//! End-to-end tests for the subject chatbot using stub models.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use subject_rag::{
    DocumentMetadata, DocumentRecord, EmbeddingProvider, FileType, GenerationParams,
    InMemorySubjectRegistry, InMemoryVectorStore, JsonFileSubjectRegistry, NO_INFORMATION_ANSWER,
    RagConfig, RagError, Result, Subject, SubjectChatbot, SubjectIndex, SubjectRegistry,
    TextGenerator, VectorStore,
};
use tokio::sync::{Notify, Semaphore};

/// Embeds text as its a–z letter counts, so shared letters mean small distances.
#[derive(Default)]
struct LetterEmbedder {
    embed_calls: AtomicUsize,
    batch_calls: AtomicUsize,
}

fn letter_counts(text: &str) -> Vec<f32> {
    let mut v = vec![0.0; 26];
    for c in text.chars().filter(char::is_ascii_lowercase) {
        v[(c as u8 - b'a') as usize] += 1.0;
    }
    v
}

#[async_trait]
impl EmbeddingProvider for LetterEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_calls.fetch_add(1, Ordering::SeqCst);
        Ok(letter_counts(text))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| letter_counts(t)).collect())
    }

    fn dimensions(&self) -> usize {
        26
    }
}

impl LetterEmbedder {
    fn total_calls(&self) -> usize {
        self.embed_calls.load(Ordering::SeqCst) + self.batch_calls.load(Ordering::SeqCst)
    }
}

/// Embeds documents fine but fails every single-text query.
struct QueryFailingEmbedder;

#[async_trait]
impl EmbeddingProvider for QueryFailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(RagError::EmbeddingError { provider: "stub".into(), message: "offline".into() })
    }

    fn dimensions(&self) -> usize {
        26
    }
}

/// Returns a fixed reply after an optional delay and records every prompt.
struct StubGenerator {
    reply: String,
    delay: Option<Duration>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl StubGenerator {
    fn replying(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            delay: None,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn slow(delay: Duration) -> Self {
        Self { delay: Some(delay), ..Self::replying("too late") }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn last_prompt(&self) -> String {
        self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl TextGenerator for StubGenerator {
    async fn generate(&self, prompt: &str, _params: &GenerationParams) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.reply.clone())
    }

    fn model_name(&self) -> &str {
        "stub"
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Gate {
    Delete,
    Attach,
}

/// In-memory registry that parks one kind of mutation until released.
struct GatedRegistry {
    inner: InMemorySubjectRegistry,
    gate: Gate,
    entered: Notify,
    release: Semaphore,
}

impl GatedRegistry {
    fn new(gate: Gate) -> Self {
        Self {
            inner: InMemorySubjectRegistry::new(),
            gate,
            entered: Notify::new(),
            release: Semaphore::new(0),
        }
    }

    async fn pause_on(&self, op: Gate) {
        if op == self.gate {
            self.entered.notify_one();
            self.release.acquire().await.unwrap().forget();
        }
    }
}

#[async_trait]
impl SubjectRegistry for GatedRegistry {
    async fn create(&self, name: &str, description: Option<&str>) -> Result<Subject> {
        self.inner.create(name, description).await
    }

    async fn get(&self, subject_id: &str) -> Result<Option<Subject>> {
        self.inner.get(subject_id).await
    }

    async fn list(&self) -> Result<Vec<Subject>> {
        self.inner.list().await
    }

    async fn delete(&self, subject_id: &str) -> Result<bool> {
        self.pause_on(Gate::Delete).await;
        self.inner.delete(subject_id).await
    }

    async fn attach_document(&self, subject_id: &str, document: DocumentRecord) -> Result<bool> {
        self.pause_on(Gate::Attach).await;
        self.inner.attach_document(subject_id, document).await
    }
}

async fn gated_chatbot(registry: Arc<GatedRegistry>) -> (SubjectChatbot, Subject) {
    let subject = registry.create("Physics", None).await.unwrap();
    let chatbot = SubjectChatbot::builder()
        .config(RagConfig::default())
        .embedding_provider(Arc::new(LetterEmbedder::default()))
        .vector_store(Arc::new(InMemoryVectorStore::new()))
        .generator(Arc::new(StubGenerator::replying("Force is mass times acceleration.")))
        .registry(registry)
        .build()
        .unwrap();
    (chatbot, subject)
}

struct Harness {
    chatbot: SubjectChatbot,
    embedder: Arc<LetterEmbedder>,
    generator: Arc<StubGenerator>,
    store: Arc<InMemoryVectorStore>,
    subject: Subject,
}

async fn harness_with(config: RagConfig, generator: StubGenerator) -> Harness {
    let embedder = Arc::new(LetterEmbedder::default());
    let generator = Arc::new(generator);
    let store = Arc::new(InMemoryVectorStore::new());
    let registry = Arc::new(InMemorySubjectRegistry::new());
    let subject = registry.create("Biology", Some("cells")).await.unwrap();

    let chatbot = SubjectChatbot::builder()
        .config(config)
        .embedding_provider(embedder.clone())
        .vector_store(store.clone())
        .generator(generator.clone())
        .registry(registry)
        .build()
        .unwrap();

    Harness { chatbot, embedder, generator, store, subject }
}

async fn harness() -> Harness {
    harness_with(RagConfig::default(), StubGenerator::replying("Ribosomes make proteins.")).await
}

impl Harness {
    async fn ingest(&self, filename: &str, text: &str) {
        let file_type = FileType::from_filename(filename).unwrap();
        self.chatbot.ingest_text(&self.subject.id, filename, file_type, text).await.unwrap();
    }
}

#[tokio::test]
async fn subject_without_documents_answers_sentinel_without_model_calls() {
    let h = harness().await;

    let answer = h.chatbot.answer_question(&h.subject.id, "What is a cell?").await.unwrap();

    assert_eq!(answer.answer, NO_INFORMATION_ANSWER);
    assert!(answer.sources.is_empty());
    assert_eq!(h.embedder.total_calls(), 0);
    assert_eq!(h.generator.calls(), 0);
}

#[tokio::test]
async fn unknown_subject_answers_sentinel() {
    let h = harness().await;
    let answer = h.chatbot.answer_question("no-such-subject", "anything").await.unwrap();
    assert_eq!(answer.answer, NO_INFORMATION_ANSWER);
    assert_eq!(h.generator.calls(), 0);
}

#[tokio::test]
async fn sources_are_distinct_in_relevance_order() {
    let h = harness().await;
    h.ingest("A.pdf", "aaaa").await;
    h.ingest("A.pdf", "aaab").await;
    h.ingest("A.pdf", "aabb").await;
    h.ingest("B.pdf", "abbb").await;

    let answer = h.chatbot.answer_question(&h.subject.id, "aaaa").await.unwrap();

    assert_eq!(answer.answer, "Ribosomes make proteins.");
    assert_eq!(answer.sources, vec!["A.pdf", "B.pdf"]);
    assert_eq!(h.generator.calls(), 1);

    let prompt = h.generator.last_prompt();
    assert!(prompt.contains("Context:\n1. aaaa\n\n2. aaab\n\n3. aabb\n\n4. abbb\n\n"));
    assert!(prompt.ends_with("Question: aaaa\nAnswer:"));
}

#[tokio::test]
async fn context_is_capped_at_max_context_chunks() {
    let h = harness().await;
    for (i, text) in ["one", "two", "three", "four", "five", "six", "seven"].iter().enumerate() {
        h.ingest(&format!("doc{i}.txt"), text).await;
    }

    let answer = h.chatbot.answer_question_with(&h.subject.id, "numbers", 7).await.unwrap();

    let prompt = h.generator.last_prompt();
    assert!(prompt.contains("\n5. "));
    assert!(!prompt.contains("\n6. "));
    assert_eq!(answer.sources.len(), 7);
}

#[tokio::test]
async fn degenerate_model_output_becomes_sentinel() {
    for reply in ["", "ok", "   "] {
        let h = harness_with(RagConfig::default(), StubGenerator::replying(reply)).await;
        h.ingest("notes.txt", "mitochondria produce energy").await;

        let answer = h.chatbot.answer_question(&h.subject.id, "energy").await.unwrap();

        assert_eq!(answer.answer, NO_INFORMATION_ANSWER);
        assert_eq!(answer.sources, vec!["notes.txt"]);
        assert_eq!(h.generator.calls(), 1);
    }
}

#[tokio::test]
async fn deleted_subject_behaves_as_empty() {
    let h = harness().await;
    h.ingest("notes.txt", "osmosis moves water").await;
    assert_eq!(h.chatbot.index().count(&h.subject.id).await.unwrap(), 1);

    assert!(h.chatbot.delete_subject(&h.subject.id).await.unwrap());

    assert_eq!(h.chatbot.index().count(&h.subject.id).await.unwrap(), 0);
    assert!(h.chatbot.registry().get(&h.subject.id).await.unwrap().is_none());
    let answer = h.chatbot.answer_question(&h.subject.id, "osmosis").await.unwrap();
    assert_eq!(answer.answer, NO_INFORMATION_ANSWER);
    assert_eq!(h.generator.calls(), 0);

    assert!(!h.chatbot.delete_subject(&h.subject.id).await.unwrap());
}

#[tokio::test]
async fn adding_no_chunks_is_a_no_op() {
    let h = harness().await;
    let metadata = DocumentMetadata {
        filename: "empty.txt".into(),
        file_type: FileType::Txt,
        subject_id: h.subject.id.clone(),
    };

    let added = h.chatbot.index().add(&h.subject.id, "doc-1", &[], &metadata).await.unwrap();

    assert_eq!(added, 0);
    assert_eq!(h.embedder.total_calls(), 0);
    assert_eq!(h.chatbot.index().count(&h.subject.id).await.unwrap(), 0);
}

#[tokio::test]
async fn add_writes_ids_and_metadata() {
    let h = harness().await;
    let metadata = DocumentMetadata {
        filename: "cells.txt".into(),
        file_type: FileType::Txt,
        subject_id: h.subject.id.clone(),
    };
    let chunks = vec!["alpha".to_string(), "beta".to_string()];

    let added = h.chatbot.index().add(&h.subject.id, "doc-7", &chunks, &metadata).await.unwrap();
    assert_eq!(added, 2);
    assert_eq!(h.embedder.batch_calls.load(Ordering::SeqCst), 1);

    let collection = format!("subject_{}", h.subject.id);
    let results = h.store.search(&collection, &letter_counts("beta"), 1).await.unwrap();
    let chunk = &results[0].chunk;
    assert_eq!(chunk.id, "doc-7_chunk_1");
    assert_eq!(chunk.metadata["filename"], "cells.txt");
    assert_eq!(chunk.metadata["file_type"], "txt");
    assert_eq!(chunk.metadata["chunk_index"], "1");
    assert_eq!(chunk.metadata["document_id"], "doc-7");
    assert_eq!(chunk.metadata["subject_id"], h.subject.id);
}

#[tokio::test]
async fn query_on_empty_subject_skips_embedding() {
    let h = harness().await;
    let results = h.chatbot.index().query(&h.subject.id, "anything", 5).await;
    assert!(results.is_empty());
    assert_eq!(h.embedder.total_calls(), 0);
    assert_eq!(h.chatbot.index().degraded_queries(), 0);
}

#[tokio::test]
async fn query_is_clamped_to_collection_size() {
    let h = harness().await;
    h.ingest("a.txt", "apple").await;
    h.ingest("b.txt", "banana").await;

    let results = h.chatbot.index().query(&h.subject.id, "apple", 10).await;

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].text, "apple");
    assert!(results[0].distance <= results[1].distance);
    assert_eq!(results[0].metadata.filename.as_deref(), Some("a.txt"));
    assert_eq!(results[0].metadata.chunk_index, Some(0));
}

#[tokio::test]
async fn failed_query_degrades_to_empty_and_is_counted() {
    let h = harness().await;
    h.ingest("notes.txt", "photosynthesis").await;

    let failing = SubjectIndex::new(Arc::new(QueryFailingEmbedder), h.store.clone());
    let results = failing.query(&h.subject.id, "light", 5).await;
    assert!(results.is_empty());
    assert_eq!(failing.degraded_queries(), 1);

    let results = failing.query("bad id!", "light", 5).await;
    assert!(results.is_empty());
    assert_eq!(failing.degraded_queries(), 2);
}

#[tokio::test]
async fn upload_validation_errors_are_client_errors() {
    let config = RagConfig::builder().max_file_size_mb(1).build().unwrap();
    let h = harness_with(config, StubGenerator::replying("unused answer")).await;
    let id = h.subject.id.as_str();

    let err = h.chatbot.ingest_upload("missing", "a.txt", b"text").await.unwrap_err();
    assert!(matches!(err, RagError::SubjectNotFound(_)));

    let err = h.chatbot.ingest_upload(id, "notes.docx", b"text").await.unwrap_err();
    assert!(matches!(err, RagError::UnsupportedFileType(_)));

    let oversized = vec![b'a'; 1024 * 1024 + 1];
    let err = h.chatbot.ingest_upload(id, "big.txt", &oversized).await.unwrap_err();
    assert!(matches!(err, RagError::FileTooLarge { .. }));

    let err = h.chatbot.ingest_upload(id, "scan.pdf", b"%PDF-1.7").await.unwrap_err();
    assert!(matches!(err, RagError::ExtractionError(_)));

    let err = h.chatbot.ingest_upload(id, "blank.txt", b"  \n\t ").await.unwrap_err();
    assert!(matches!(err, RagError::EmptyDocument(_)));
    assert!(err.is_client_error());

    assert_eq!(h.embedder.total_calls(), 0);
    assert_eq!(h.chatbot.registry().document_count(id).await.unwrap(), 0);
}

#[tokio::test]
async fn upload_indexes_and_records_document() {
    let config = RagConfig::builder().chunk_size(40).chunk_overlap(5).build().unwrap();
    let h = harness_with(config, StubGenerator::replying("Cells divide by mitosis.")).await;
    let text = "Cells divide by mitosis. Mitosis has phases. Prophase comes first. \
                Metaphase aligns chromosomes.";

    let report = h.chatbot.ingest_upload(&h.subject.id, "Cells.TXT", text.as_bytes()).await.unwrap();

    assert_eq!(report.file_type, FileType::Txt);
    assert_eq!(report.filename, "Cells.TXT");
    assert!(report.chunks_created > 1);
    assert_eq!(h.chatbot.index().count(&h.subject.id).await.unwrap(), report.chunks_created);

    let subject = h.chatbot.registry().get(&h.subject.id).await.unwrap().unwrap();
    assert_eq!(subject.documents.len(), 1);
    assert_eq!(subject.documents[0].id, report.document_id);

    let answer = h.chatbot.answer_question(&h.subject.id, "mitosis").await.unwrap();
    assert_eq!(answer.sources, vec!["Cells.TXT"]);
}

#[tokio::test]
async fn subjects_do_not_share_context() {
    let h = harness().await;
    let other = h.chatbot.registry().create("History", None).await.unwrap();
    h.ingest("bio.txt", "enzymes catalyse reactions").await;
    h.chatbot
        .ingest_text(&other.id, "war.txt", FileType::Txt, "treaties ended wars")
        .await
        .unwrap();

    let answer = h.chatbot.answer_question(&other.id, "enzymes").await.unwrap();

    assert_eq!(answer.sources, vec!["war.txt"]);
    assert!(!h.generator.last_prompt().contains("enzymes catalyse"));
}

#[tokio::test(start_paused = true)]
async fn slow_generation_times_out() {
    let config = RagConfig::builder().generation_timeout_secs(1).build().unwrap();
    let h = harness_with(config, StubGenerator::slow(Duration::from_secs(30))).await;
    h.ingest("notes.txt", "krebs cycle").await;

    let err = h.chatbot.answer_question(&h.subject.id, "krebs").await.unwrap_err();

    assert!(matches!(err, RagError::GenerationError { .. }));
    assert!(!err.is_client_error());
}

#[tokio::test]
async fn cascade_delete_persists_in_json_registry() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("subjects.json");
    let registry = Arc::new(JsonFileSubjectRegistry::open(&path).await.unwrap());
    let subject = registry.create("Chemistry", None).await.unwrap();

    let chatbot = SubjectChatbot::builder()
        .config(RagConfig::default())
        .embedding_provider(Arc::new(LetterEmbedder::default()))
        .vector_store(Arc::new(InMemoryVectorStore::new()))
        .generator(Arc::new(StubGenerator::replying("Atoms bond.")))
        .registry(registry)
        .build()
        .unwrap();

    chatbot.ingest_text(&subject.id, "atoms.txt", FileType::Txt, "covalent bonds").await.unwrap();
    let reopened = JsonFileSubjectRegistry::open(&path).await.unwrap();
    assert_eq!(reopened.document_count(&subject.id).await.unwrap(), 1);

    assert!(chatbot.delete_subject(&subject.id).await.unwrap());
    let reopened = JsonFileSubjectRegistry::open(&path).await.unwrap();
    assert!(reopened.get(&subject.id).await.unwrap().is_none());
    assert_eq!(chatbot.index().count(&subject.id).await.unwrap(), 0);
}

#[tokio::test]
async fn upload_during_subject_delete_leaves_no_vectors() {
    let registry = Arc::new(GatedRegistry::new(Gate::Delete));
    let (chatbot, subject) = gated_chatbot(registry.clone()).await;

    let deleting = chatbot.delete_subject(&subject.id);
    let uploading = async {
        registry.entered.notified().await;
        let result =
            chatbot.ingest_text(&subject.id, "late.txt", FileType::Txt, "late notes").await;
        registry.release.add_permits(1);
        result
    };
    let (deleted, uploaded) = tokio::join!(deleting, uploading);

    assert!(deleted.unwrap());
    assert_eq!(uploaded.unwrap().chunks_created, 1);
    assert!(registry.get(&subject.id).await.unwrap().is_none());
    assert_eq!(chatbot.index().count(&subject.id).await.unwrap(), 0);
}

#[tokio::test]
async fn upload_finishing_after_subject_delete_drops_its_vectors() {
    let registry = Arc::new(GatedRegistry::new(Gate::Attach));
    let (chatbot, subject) = gated_chatbot(registry.clone()).await;

    let uploading = chatbot.ingest_text(&subject.id, "late.txt", FileType::Txt, "late notes");
    let deleting = async {
        registry.entered.notified().await;
        let deleted = chatbot.delete_subject(&subject.id).await;
        registry.release.add_permits(1);
        deleted
    };
    let (uploaded, deleted) = tokio::join!(uploading, deleting);

    assert!(deleted.unwrap());
    assert!(matches!(uploaded, Err(RagError::SubjectNotFound(_))));
    assert_eq!(chatbot.index().count(&subject.id).await.unwrap(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_uploads_become_visible_whole() {
    // Each upload splits into exactly three 10-char sentences.
    let config = RagConfig::builder().chunk_size(10).chunk_overlap(0).build().unwrap();
    let h = harness_with(config, StubGenerator::replying("unused answer")).await;
    let chatbot = Arc::new(h.chatbot);
    let subject_id = h.subject.id.clone();

    let uploads: Vec<_> = (0..8)
        .map(|i| {
            let chatbot = Arc::clone(&chatbot);
            let subject_id = subject_id.clone();
            tokio::spawn(async move {
                let filename = format!("doc{i}.txt");
                let text = "aaaaaaaaa.bbbbbbbbb.ccccccccc.";
                chatbot.ingest_text(&subject_id, &filename, FileType::Txt, text).await
            })
        })
        .collect();

    let reader = {
        let chatbot = Arc::clone(&chatbot);
        let subject_id = subject_id.clone();
        tokio::spawn(async move {
            let mut observed = Vec::new();
            for _ in 0..200 {
                observed.push(chatbot.index().count(&subject_id).await.unwrap());
                observed.push(chatbot.index().query(&subject_id, "aaaa", 100).await.len());
                tokio::task::yield_now().await;
            }
            observed
        })
    };

    for upload in uploads {
        assert_eq!(upload.await.unwrap().unwrap().chunks_created, 3);
    }
    let observed = reader.await.unwrap();
    assert!(observed.iter().all(|n| n % 3 == 0), "partial document visible: {observed:?}");
    assert_eq!(chatbot.index().count(&subject_id).await.unwrap(), 24);
    assert_eq!(chatbot.index().degraded_queries(), 0);
}
