pub mod image;
pub mod pdf;

use crate::error::AppError;

pub use self::image::{ImageExtractor, TesseractOcr};
pub use self::pdf::PdfExtractor;

/// Turns an uploaded document into plain text. Implementations may block;
/// callers run them off the async executor.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, data: &[u8]) -> Result<String, AppError>;
}

/// Text input is used as-is, but must be present and non-empty.
pub fn from_plain_text(text: Option<String>) -> Result<String, AppError> {
    match text {
        Some(text) if !text.trim().is_empty() => Ok(text),
        Some(_) => Err(AppError::InvalidRequest("Text cannot be empty".into())),
        None => Err(AppError::InvalidRequest("Missing 'text' field".into())),
    }
}
