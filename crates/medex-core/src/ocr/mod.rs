//! OCR stage: page normalization, the recognizer boundary, and page aggregation.

mod aggregate;
mod preprocessing;
mod tesseract;

pub use aggregate::{aggregate, AggregatedText, PAGE_SEPARATOR};
pub use preprocessing::{ImageNormalizer, NormalizedImage};
pub use tesseract::TesseractRecognizer;

use serde::{Deserialize, Serialize};

use crate::error::RecognitionError;

/// Text recognized on one page, in the reading order the engine reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecognizedText {
    /// Page number the text came from.
    pub page: u32,
    /// Raw recognized text.
    pub text: String,
}

impl RecognizedText {
    pub fn new(page: u32, text: impl Into<String>) -> Self {
        Self {
            page,
            text: text.into(),
        }
    }
}

/// Boundary to an external text recognition engine.
///
/// Implementations pass the engine output through unchanged: no retries and
/// no text correction. A call may block for a long time; timeouts are the
/// caller's concern.
pub trait TextRecognizer: Send + Sync {
    /// Recognize the text on one normalized page.
    fn recognize(
        &self,
        image: &NormalizedImage,
        language: &str,
    ) -> Result<RecognizedText, RecognitionError>;
}
