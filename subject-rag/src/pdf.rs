//! PDF text extraction backed by [`lopdf`].

use tracing::debug;

use crate::document::FileType;
use crate::error::{RagError, Result};
use crate::ingest::{TextExtractor, decode_text};

/// A [`TextExtractor`] that reads PDF uploads with `lopdf`.
///
/// Page texts are joined with `\n` in page order and the result is trimmed.
/// Text files are decoded like [`PlainTextExtractor`](crate::PlainTextExtractor)
/// does. When the `pdf` feature is enabled this is the default extractor of
/// [`SubjectChatbot`](crate::SubjectChatbot).
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfTextExtractor;

impl PdfTextExtractor {
    fn extract_pdf(content: &[u8]) -> Result<String> {
        let document = lopdf::Document::load_mem(content)
            .map_err(|e| RagError::ExtractionError(format!("failed to parse PDF: {e}")))?;

        let pages = document.get_pages();
        let mut texts = Vec::with_capacity(pages.len());
        for &page in pages.keys() {
            let text = document.extract_text(&[page]).map_err(|e| {
                RagError::ExtractionError(format!("failed to read text of page {page}: {e}"))
            })?;
            texts.push(text);
        }

        debug!(page_count = texts.len(), "extracted PDF text");
        Ok(texts.join("\n").trim().to_string())
    }
}

impl TextExtractor for PdfTextExtractor {
    fn extract(&self, file_type: FileType, content: &[u8]) -> Result<String> {
        match file_type {
            FileType::Txt => Ok(decode_text(content)),
            FileType::Pdf => Self::extract_pdf(content),
        }
    }
}
