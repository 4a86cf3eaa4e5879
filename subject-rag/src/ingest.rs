//! Upload validation and text extraction for the document write path.

use serde::{Deserialize, Serialize};

use crate::document::FileType;
use crate::error::{RagError, Result};

/// Extracts plain text from uploaded file content.
///
/// [`PlainTextExtractor`] handles text files only. The `pdf` feature adds
/// `PdfTextExtractor`, which also reads PDF uploads.
pub trait TextExtractor: Send + Sync {
    /// Extract the text of a file of the given type.
    fn extract(&self, file_type: FileType, content: &[u8]) -> Result<String>;
}

/// A [`TextExtractor`] for plain-text uploads.
///
/// Rejects PDF content with [`RagError::ExtractionError`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract(&self, file_type: FileType, content: &[u8]) -> Result<String> {
        match file_type {
            FileType::Txt => Ok(decode_text(content)),
            FileType::Pdf => {
                Err(RagError::ExtractionError("no PDF extractor is configured".to_string()))
            }
        }
    }
}

/// Decode text file content as UTF-8, falling back to Latin-1.
///
/// Latin-1 maps every byte to a char, so decoding never fails.
pub fn decode_text(content: &[u8]) -> String {
    match std::str::from_utf8(content) {
        Ok(text) => text.to_string(),
        Err(_) => content.iter().map(|&b| char::from(b)).collect(),
    }
}

/// Check an upload's type and size before any processing.
///
/// # Errors
///
/// Returns [`RagError::UnsupportedFileType`] for anything but `.pdf` and
/// `.txt`, and [`RagError::FileTooLarge`] if `size_bytes > max_bytes`.
pub fn validate_upload(filename: &str, size_bytes: usize, max_bytes: usize) -> Result<FileType> {
    let file_type = FileType::from_filename(filename)?;
    if size_bytes > max_bytes {
        return Err(RagError::FileTooLarge { size_bytes, max_bytes });
    }
    Ok(file_type)
}

/// Summary of a successfully indexed document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngestReport {
    /// Generated id of the indexed document.
    pub document_id: String,
    /// Subject the document was attached to.
    pub subject_id: String,
    /// Filename as uploaded.
    pub filename: String,
    /// Detected file type.
    pub file_type: FileType,
    /// Number of chunks embedded and stored.
    pub chunks_created: usize,
}
