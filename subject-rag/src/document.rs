//! Data types for subjects, documents, chunks, and retrieval results.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Metadata key holding the original upload filename.
pub const META_FILENAME: &str = "filename";
/// Metadata key holding the file type (`pdf` or `txt`).
pub const META_FILE_TYPE: &str = "file_type";
/// Metadata key holding the owning subject id.
pub const META_SUBJECT_ID: &str = "subject_id";
/// Metadata key holding the 0-based chunk position within its document.
pub const META_CHUNK_INDEX: &str = "chunk_index";
/// Metadata key holding the source document id.
pub const META_DOCUMENT_ID: &str = "document_id";

/// Supported upload formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Pdf,
    Txt,
}

impl FileType {
    /// Detect the file type from a filename's extension (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns [`RagError::UnsupportedFileType`] for anything other than
    /// `.pdf` and `.txt`.
    pub fn from_filename(filename: &str) -> Result<Self> {
        let extension = std::path::Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        extension.parse().map_err(|_| RagError::UnsupportedFileType(filename.to_string()))
    }

    /// Lowercase extension without the dot, as stored in chunk metadata.
    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Pdf => "pdf",
            FileType::Txt => "txt",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FileType {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pdf" => Ok(FileType::Pdf),
            "txt" => Ok(FileType::Txt),
            other => Err(RagError::UnsupportedFileType(other.to_string())),
        }
    }
}

/// A reference to an uploaded document, stored inside its [`Subject`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentRecord {
    /// Generated document identifier.
    pub id: String,
    /// Original upload filename.
    pub filename: String,
    /// Detected file type.
    pub file_type: FileType,
    /// Upload timestamp.
    pub uploaded_at: DateTime<Utc>,
}

/// A user-defined topic grouping uploaded documents and one vector collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Subject {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub documents: Vec<DocumentRecord>,
}

impl Subject {
    /// Whether any documents are attached to this subject.
    pub fn has_documents(&self) -> bool {
        !self.documents.is_empty()
    }
}

/// Per-document metadata supplied by the ingestion boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentMetadata {
    pub filename: String,
    pub file_type: FileType,
    pub subject_id: String,
}

impl DocumentMetadata {
    /// Expand into the per-chunk payload stored in the vector store.
    pub(crate) fn to_chunk_payload(
        &self,
        document_id: &str,
        chunk_index: usize,
    ) -> HashMap<String, String> {
        HashMap::from([
            (META_FILENAME.to_string(), self.filename.clone()),
            (META_FILE_TYPE.to_string(), self.file_type.to_string()),
            (META_SUBJECT_ID.to_string(), self.subject_id.clone()),
            (META_CHUNK_INDEX.to_string(), chunk_index.to_string()),
            (META_DOCUMENT_ID.to_string(), document_id.to_string()),
        ])
    }
}

/// Typed view of a retrieved chunk's metadata.
///
/// Every field is optional: entries written by other tools may lack any of
/// them, and missing fields are skipped rather than treated as errors.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_type: Option<FileType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_index: Option<usize>,
}

impl From<&HashMap<String, String>> for ChunkMetadata {
    fn from(map: &HashMap<String, String>) -> Self {
        Self {
            filename: map.get(META_FILENAME).cloned(),
            file_type: map.get(META_FILE_TYPE).and_then(|v| v.parse().ok()),
            subject_id: map.get(META_SUBJECT_ID).cloned(),
            document_id: map.get(META_DOCUMENT_ID).cloned(),
            chunk_index: map.get(META_CHUNK_INDEX).and_then(|v| v.parse().ok()),
        }
    }
}

/// A stored segment of a document with its vector embedding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Unique identifier, `{document_id}_chunk_{i}`.
    pub id: String,
    /// The text content of the chunk.
    pub text: String,
    /// The vector embedding for this chunk's text.
    pub embedding: Vec<f32>,
    /// String key/value payload stored alongside the vector.
    pub metadata: HashMap<String, String>,
    /// The ID of the parent document.
    pub document_id: String,
}

impl Chunk {
    /// Build the chunk identifier for position `index` of `document_id`.
    pub fn chunk_id(document_id: &str, index: usize) -> String {
        format!("{document_id}_chunk_{index}")
    }
}

/// A [`Chunk`] returned by a vector store search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// Distance from the query vector (lower is more similar).
    pub distance: f32,
}

/// One entry of a retrieval result: chunk text, typed metadata, and distance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievedChunk {
    /// Chunk text as it was indexed.
    pub text: String,
    /// Source document metadata of the chunk.
    pub metadata: ChunkMetadata,
    /// Cosine distance to the question; smaller is closer.
    pub distance: f32,
}

impl From<SearchResult> for RetrievedChunk {
    fn from(result: SearchResult) -> Self {
        Self {
            metadata: ChunkMetadata::from(&result.chunk.metadata),
            text: result.chunk.text,
            distance: result.distance,
        }
    }
}

/// The answer to a question plus the distinct source filenames it drew on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Answer {
    /// Generated answer, or the no-information sentinel.
    pub answer: String,
    /// Distinct filenames of the chunks used, in retrieval order.
    pub sources: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_type_from_extension() {
        assert_eq!(FileType::from_filename("notes.TXT").unwrap(), FileType::Txt);
        assert_eq!(FileType::from_filename("a.b.pdf").unwrap(), FileType::Pdf);
        assert!(matches!(
            FileType::from_filename("slides.pptx"),
            Err(RagError::UnsupportedFileType(_))
        ));
        assert!(FileType::from_filename("README").is_err());
    }

    #[test]
    fn chunk_metadata_skips_missing_and_malformed_fields() {
        let map = HashMap::from([
            (META_FILENAME.to_string(), "A.pdf".to_string()),
            (META_CHUNK_INDEX.to_string(), "not-a-number".to_string()),
        ]);
        let meta = ChunkMetadata::from(&map);
        assert_eq!(meta.filename.as_deref(), Some("A.pdf"));
        assert_eq!(meta.chunk_index, None);
        assert_eq!(meta.file_type, None);
    }

    #[test]
    fn payload_carries_chunk_position() {
        let meta = DocumentMetadata {
            filename: "A.pdf".into(),
            file_type: FileType::Pdf,
            subject_id: "s1".into(),
        };
        let payload = meta.to_chunk_payload("doc", 3);
        let typed = ChunkMetadata::from(&payload);
        assert_eq!(typed.chunk_index, Some(3));
        assert_eq!(typed.document_id.as_deref(), Some("doc"));
        assert_eq!(typed.file_type, Some(FileType::Pdf));
        assert_eq!(Chunk::chunk_id("doc", 3), "doc_chunk_3");
    }
}
