//! Joining per-page recognized text into one document text.

use super::RecognizedText;

/// Marker placed between consecutive pages.
///
/// A form feed on its own line; the field parser treats it as a hard
/// boundary for value capture.
pub const PAGE_SEPARATOR: &str = "\n\u{000C}\n";

/// Text of a whole document, pages joined in the order given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatedText {
    text: String,
    page_count: usize,
}

impl AggregatedText {
    /// Wrap text that did not come from page aggregation (single page).
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            page_count: 1,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

/// Concatenate page texts in the given order with [`PAGE_SEPARATOR`] between them.
///
/// Content is appended as is: nothing is trimmed, deduplicated, or reordered.
pub fn aggregate(pages: &[RecognizedText]) -> AggregatedText {
    let capacity = pages.iter().map(|p| p.text.len()).sum::<usize>()
        + PAGE_SEPARATOR.len() * pages.len().saturating_sub(1);
    let mut text = String::with_capacity(capacity);

    for (i, page) in pages.iter().enumerate() {
        if i > 0 {
            text.push_str(PAGE_SEPARATOR);
        }
        text.push_str(&page.text);
    }

    AggregatedText {
        text,
        page_count: pages.len(),
    }
}
