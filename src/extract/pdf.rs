use super::TextExtractor;
use crate::error::AppError;

#[derive(Debug, Default, Clone, Copy)]
pub struct PdfExtractor;

impl TextExtractor for PdfExtractor {
    /// Text of every page, in page order. Pages without text contribute
    /// nothing.
    fn extract(&self, data: &[u8]) -> Result<String, AppError> {
        let pages = pdf_extract::extract_text_from_mem_by_pages(data)
            .map_err(|e| AppError::Extraction(format!("unreadable PDF: {}", e)))?;

        tracing::debug!("Extracted {} PDF pages", pages.len());
        Ok(pages.concat())
    }
}
