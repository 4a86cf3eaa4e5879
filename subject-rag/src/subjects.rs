//! Subject registry: the collaborator that owns subject records.
//!
//! The pipeline only needs [`SubjectRegistry::get`] on the read path; the
//! write path and cascade deletion use the rest. Two implementations are
//! provided: [`InMemorySubjectRegistry`] and [`JsonFileSubjectRegistry`],
//! which persists every mutation to a pretty-printed JSON file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, error};
use uuid::Uuid;

use crate::document::{DocumentRecord, Subject};
use crate::error::{RagError, Result};

/// Storage for subjects and the documents attached to them.
#[async_trait]
pub trait SubjectRegistry: Send + Sync {
    /// Create a subject with a generated id.
    async fn create(&self, name: &str, description: Option<&str>) -> Result<Subject>;

    /// Look up a subject by id.
    async fn get(&self, subject_id: &str) -> Result<Option<Subject>>;

    /// All subjects, in no particular order.
    async fn list(&self) -> Result<Vec<Subject>>;

    /// Remove a subject. Returns `false` if it did not exist.
    async fn delete(&self, subject_id: &str) -> Result<bool>;

    /// Append a document reference to a subject. Returns `false` if the subject does not exist.
    async fn attach_document(&self, subject_id: &str, document: DocumentRecord) -> Result<bool>;

    /// Number of documents attached to a subject; 0 if it does not exist.
    async fn document_count(&self, subject_id: &str) -> Result<usize> {
        Ok(self.get(subject_id).await?.map_or(0, |s| s.documents.len()))
    }
}

fn new_subject(name: &str, description: Option<&str>) -> Subject {
    Subject {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        description: description.map(str::to_string),
        created_at: Utc::now(),
        documents: Vec::new(),
    }
}

/// A [`SubjectRegistry`] kept entirely in memory.
#[derive(Debug, Default)]
pub struct InMemorySubjectRegistry {
    subjects: RwLock<HashMap<String, Subject>>,
}

impl InMemorySubjectRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SubjectRegistry for InMemorySubjectRegistry {
    async fn create(&self, name: &str, description: Option<&str>) -> Result<Subject> {
        let subject = new_subject(name, description);
        self.subjects.write().await.insert(subject.id.clone(), subject.clone());
        Ok(subject)
    }

    async fn get(&self, subject_id: &str) -> Result<Option<Subject>> {
        Ok(self.subjects.read().await.get(subject_id).cloned())
    }

    async fn list(&self) -> Result<Vec<Subject>> {
        Ok(self.subjects.read().await.values().cloned().collect())
    }

    async fn delete(&self, subject_id: &str) -> Result<bool> {
        Ok(self.subjects.write().await.remove(subject_id).is_some())
    }

    async fn attach_document(&self, subject_id: &str, document: DocumentRecord) -> Result<bool> {
        let mut subjects = self.subjects.write().await;
        match subjects.get_mut(subject_id) {
            Some(subject) => {
                subject.documents.push(document);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// A [`SubjectRegistry`] persisted as a single JSON file.
///
/// The file maps subject id to subject record. It is read once by
/// [`open`](JsonFileSubjectRegistry::open) and rewritten after every
/// mutation while the write lock is held. A mutation is applied to a copy,
/// and the in-memory state only changes once the file write succeeds.
#[derive(Debug)]
pub struct JsonFileSubjectRegistry {
    path: PathBuf,
    subjects: RwLock<HashMap<String, Subject>>,
}

impl JsonFileSubjectRegistry {
    /// Open the registry at `path`. A missing file starts an empty registry.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::RegistryError`] if the file exists but cannot be
    /// read or parsed.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let subjects = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                RagError::RegistryError(format!("failed to parse {}: {e}", path.display()))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                return Err(RagError::RegistryError(format!(
                    "failed to read {}: {e}",
                    path.display()
                )));
            }
        };
        debug!(path = %path.display(), subject_count = subjects.len(), "opened subject registry");
        Ok(Self { path, subjects: RwLock::new(subjects) })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, subjects: &HashMap<String, Subject>) -> Result<()> {
        let json = serde_json::to_vec_pretty(subjects)
            .map_err(|e| RagError::RegistryError(format!("failed to serialize subjects: {e}")))?;
        tokio::fs::write(&self.path, json).await.map_err(|e| {
            error!(path = %self.path.display(), error = %e, "failed to persist subjects");
            RagError::RegistryError(format!("failed to write {}: {e}", self.path.display()))
        })
    }
}

#[async_trait]
impl SubjectRegistry for JsonFileSubjectRegistry {
    async fn create(&self, name: &str, description: Option<&str>) -> Result<Subject> {
        let subject = new_subject(name, description);
        let mut subjects = self.subjects.write().await;
        let mut next = subjects.clone();
        next.insert(subject.id.clone(), subject.clone());
        self.persist(&next).await?;
        *subjects = next;
        Ok(subject)
    }

    async fn get(&self, subject_id: &str) -> Result<Option<Subject>> {
        Ok(self.subjects.read().await.get(subject_id).cloned())
    }

    async fn list(&self) -> Result<Vec<Subject>> {
        Ok(self.subjects.read().await.values().cloned().collect())
    }

    async fn delete(&self, subject_id: &str) -> Result<bool> {
        let mut subjects = self.subjects.write().await;
        let mut next = subjects.clone();
        if next.remove(subject_id).is_none() {
            return Ok(false);
        }
        self.persist(&next).await?;
        *subjects = next;
        Ok(true)
    }

    async fn attach_document(&self, subject_id: &str, document: DocumentRecord) -> Result<bool> {
        let mut subjects = self.subjects.write().await;
        let mut next = subjects.clone();
        let Some(subject) = next.get_mut(subject_id) else {
            return Ok(false);
        };
        subject.documents.push(document);
        self.persist(&next).await?;
        *subjects = next;
        Ok(true)
    }
}
