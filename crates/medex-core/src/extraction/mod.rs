//! Field extraction from aggregated document text.

mod anchors;
mod assembler;
mod patient_details;
pub mod patterns;
mod prescription;

pub use assembler::{assemble, missing_fields};
pub use patient_details::PatientDetailsParser;
pub use prescription::PrescriptionParser;

use std::collections::BTreeMap;

use crate::error::ParseError;
use crate::models::config::ParsingConfig;
use crate::models::document::DocumentType;

/// Field name to captured value. A missing key means the field's anchor was
/// not found; an empty value means the anchor was found with nothing after it.
pub type RawFields = BTreeMap<String, String>;

/// Trait for document-type specific field parsers.
///
/// Parsers are pure: the same text always yields the same fields.
pub trait FieldParser: Send + Sync {
    /// Document type this parser handles.
    fn document_type(&self) -> DocumentType;

    /// Locate labelled fields in `text` and capture their values.
    fn parse(&self, text: &str) -> Result<RawFields, ParseError>;
}

/// Select the parser for a document type.
pub fn parser_for(document_type: DocumentType, config: &ParsingConfig) -> Box<dyn FieldParser> {
    match document_type {
        DocumentType::Prescription => Box::new(PrescriptionParser::new(config.max_value_chars)),
        DocumentType::PatientDetails => Box::new(PatientDetailsParser::new(config.max_value_chars)),
    }
}
