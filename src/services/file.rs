//! Text extraction from uploaded documents.

use std::path::Path;

use tracing::debug;

use crate::error::{Error, Result};

/// Extracts raw text content from an uploaded document.
///
/// Only plain-text formats are handled locally; everything downstream of the
/// extracted text is delegated to the AI collaborator.
pub struct FileProcessor;

impl FileProcessor {
    pub fn new() -> Self {
        Self
    }

    /// Extract the text content of the file at `path`.
    ///
    /// The file extension decides the extraction strategy. Unsupported
    /// extensions and documents with no extractable text are extraction
    /// errors, surfaced to the client as a 422.
    pub async fn extract_text(&self, path: &Path) -> Result<String> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .unwrap_or_default();

        let text = match extension.as_str() {
            "txt" | "md" | "markdown" | "text" => {
                let bytes = tokio::fs::read(path).await?;
                String::from_utf8_lossy(&bytes).into_owned()
            }
            other => {
                return Err(Error::Extraction(format!(
                    "Unsupported file type: '.{other}'"
                )));
            }
        };

        if text.trim().is_empty() {
            return Err(Error::Extraction(
                "Document contains no extractable text".to_string(),
            ));
        }

        debug!(chars = text.len(), "Extracted document text");
        Ok(text)
    }
}

impl Default for FileProcessor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_extract_text_from_txt() {
        let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        file.write_all(b"Chapter one.\nChapter two.").unwrap();

        let processor = FileProcessor::new();
        let text = processor.extract_text(file.path()).await.unwrap();
        assert_eq!(text, "Chapter one.\nChapter two.");
    }

    #[tokio::test]
    async fn test_extract_text_rejects_unsupported_extension() {
        let file = tempfile::Builder::new().suffix(".exe").tempfile().unwrap();

        let processor = FileProcessor::new();
        let err = processor.extract_text(file.path()).await.unwrap_err();
        assert!(matches!(err, Error::Extraction(_)));
        assert!(err.to_string().contains(".exe"));
    }

    #[tokio::test]
    async fn test_extract_text_rejects_empty_document() {
        let file = tempfile::Builder::new().suffix(".md").tempfile().unwrap();

        let processor = FileProcessor::new();
        let err = processor.extract_text(file.path()).await.unwrap_err();
        assert!(matches!(err, Error::Extraction(_)));
    }
}
