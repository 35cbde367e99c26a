//! Prescription field parser.

use lazy_static::lazy_static;
use tracing::info;

use super::anchors::{AnchorSet, CaptureMode, FieldSpec};
use super::patterns::{keep, refine_refill};
use super::{FieldParser, RawFields};
use crate::error::ParseError;
use crate::models::document::DocumentType;

static FIELDS: [FieldSpec; 5] = [
    FieldSpec {
        name: "patient_name",
        labels: &["patient name", "patient's name", "name"],
        mode: CaptureMode::Line,
        refine: keep,
    },
    FieldSpec {
        name: "patient_address",
        labels: &["patient address", "address", "addr"],
        mode: CaptureMode::Joined,
        refine: keep,
    },
    FieldSpec {
        name: "medicines",
        labels: &["medicines", "medicine", "medications", "medication", "drugs", "rx"],
        mode: CaptureMode::Joined,
        refine: keep,
    },
    FieldSpec {
        name: "refill",
        labels: &["refills", "refill", "repeats"],
        mode: CaptureMode::Line,
        refine: refine_refill,
    },
    FieldSpec {
        name: "directions",
        labels: &["directions", "direction", "instructions", "sig"],
        mode: CaptureMode::Block,
        refine: keep,
    },
];

/// Labels that commonly sit next to prescription fields and end a capture.
const STOP_LABELS: [&str; 9] = [
    "date",
    "date of birth",
    "dob",
    "age",
    "phone",
    "tel",
    "signature",
    "doctor",
    "physician",
];

lazy_static! {
    static ref ANCHORS: AnchorSet =
        AnchorSet::compile(&FIELDS, &STOP_LABELS).unwrap();
}

/// Parser for prescriptions: patient name and address, medicines, refills, directions.
pub struct PrescriptionParser {
    max_value_chars: usize,
}

impl PrescriptionParser {
    /// Create a parser capturing at most `max_value_chars` per field.
    pub fn new(max_value_chars: usize) -> Self {
        Self { max_value_chars }
    }
}

impl FieldParser for PrescriptionParser {
    fn document_type(&self) -> DocumentType {
        DocumentType::Prescription
    }

    fn parse(&self, text: &str) -> Result<RawFields, ParseError> {
        if text.trim().is_empty() {
            return Err(ParseError::NoText);
        }

        info!("Parsing prescription from {} characters of text", text.len());
        Ok(ANCHORS.scan(text, self.max_value_chars))
    }
}
