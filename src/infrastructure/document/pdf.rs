use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use crate::domain::{DocumentExtractor, DomainError};

/// PDF text extraction on the blocking pool
#[derive(Debug, Default, Clone)]
pub struct PdfTextExtractor;

impl PdfTextExtractor {
    pub fn new() -> Self {
        Self
    }

    fn extract_blocking(data: &[u8]) -> Result<String, DomainError> {
        if !data.starts_with(b"%PDF") {
            return Err(DomainError::validation("Uploaded file is not a valid PDF"));
        }

        let text = pdf_extract::extract_text_from_mem(data)
            .map_err(|e| DomainError::validation(format!("Could not read PDF: {}", e)))?;

        let text = text.trim().to_string();
        if text.is_empty() {
            return Err(DomainError::validation(
                "No readable text found in the uploaded PDF",
            ));
        }

        Ok(text)
    }
}

#[async_trait]
impl DocumentExtractor for PdfTextExtractor {
    async fn extract_text(&self, data: Bytes) -> Result<String, DomainError> {
        let size = data.len();
        let text = tokio::task::spawn_blocking(move || Self::extract_blocking(&data))
            .await
            .map_err(|e| {
                // pdf-extract panics on some malformed documents
                if e.is_panic() {
                    DomainError::validation("Could not read PDF")
                } else {
                    DomainError::internal(format!("PDF extraction task failed: {}", e))
                }
            })??;

        debug!(bytes = size, chars = text.len(), "Extracted PDF text");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rejects_non_pdf() {
        let err = PdfTextExtractor::new()
            .extract_text(Bytes::from_static(b"hello world"))
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_rejects_corrupt_pdf() {
        let err = PdfTextExtractor::new()
            .extract_text(Bytes::from_static(b"%PDF-1.4\ngarbage"))
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::Validation { .. }));
    }
}
