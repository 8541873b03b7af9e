//! Turning uploaded files into plain text.

use std::path::Path;

use tracing::{debug, info, warn};

use crate::error::{AssistantError, Result};

const PDF_MAGIC: &[u8] = b"%PDF-";

/// Supported upload formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Pdf,
    Text,
}

impl FileKind {
    /// Detect the format from the file name, falling back to the content.
    pub fn detect(name: &str, bytes: &[u8]) -> Self {
        let is_pdf_name = Path::new(name)
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
        if is_pdf_name || bytes.starts_with(PDF_MAGIC) { FileKind::Pdf } else { FileKind::Text }
    }
}

/// Extract the full text of an uploaded PDF or plain-text file.
///
/// PDF pages are parsed on the blocking thread pool and joined with line
/// breaks; pages without extractable text are skipped. Anything that is not
/// a PDF must be valid UTF-8.
///
/// # Errors
///
/// Returns [`AssistantError::Extraction`] for unreadable input and for
/// documents without any text.
pub async fn extract_text(name: &str, bytes: Vec<u8>) -> Result<String> {
    let kind = FileKind::detect(name, &bytes);
    debug!(name, ?kind, bytes = bytes.len(), "extracting text");

    let text = match kind {
        FileKind::Pdf => {
            let owned_name = name.to_string();
            tokio::task::spawn_blocking(move || extract_pdf_sync(&owned_name, &bytes))
                .await
                .map_err(|e| extraction_error(name, format!("PDF extraction task failed: {e}")))??
        }
        FileKind::Text => String::from_utf8(bytes)
            .map_err(|e| extraction_error(name, format!("file is not valid UTF-8 text: {e}")))?,
    };

    if text.trim().is_empty() {
        return Err(extraction_error(name, "no text could be extracted".to_string()));
    }
    info!(name, ?kind, chars = text.chars().count(), "extracted document text");
    Ok(text)
}

fn extract_pdf_sync(name: &str, bytes: &[u8]) -> Result<String> {
    let doc = lopdf::Document::load_mem(bytes)
        .map_err(|e| extraction_error(name, format!("could not parse PDF: {e}")))?;

    let mut text = String::new();
    for (page_number, _page_id) in doc.get_pages() {
        match doc.extract_text(&[page_number]) {
            Ok(page_text) => {
                if !text.is_empty() && !page_text.is_empty() {
                    text.push('\n');
                }
                text.push_str(&page_text);
            }
            Err(e) => warn!(name, page_number, error = %e, "skipping page without extractable text"),
        }
    }
    Ok(text)
}

fn extraction_error(name: &str, message: String) -> AssistantError {
    AssistantError::Extraction { name: name.to_string(), message }
}
