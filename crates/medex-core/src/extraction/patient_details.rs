//! Patient intake form field parser.

use lazy_static::lazy_static;
use tracing::info;

use super::anchors::{AnchorSet, CaptureMode, FieldSpec};
use super::patterns::{keep, refine_phone, refine_yes_no};
use super::{FieldParser, RawFields};
use crate::error::ParseError;
use crate::models::document::DocumentType;

static FIELDS: [FieldSpec; 5] = [
    FieldSpec {
        name: "patient_name",
        labels: &["patient name", "full name", "name"],
        mode: CaptureMode::Line,
        refine: keep,
    },
    FieldSpec {
        name: "phone_no",
        labels: &[
            "phone number",
            "phone no",
            "phone",
            "telephone",
            "tel",
            "mobile",
            "cell",
            "contact number",
        ],
        mode: CaptureMode::Line,
        refine: refine_phone,
    },
    FieldSpec {
        name: "has_insurance",
        labels: &[
            "do you have insurance",
            "health insurance",
            "insurance",
            "insured",
        ],
        mode: CaptureMode::Line,
        refine: refine_yes_no,
    },
    FieldSpec {
        name: "vaccination_status",
        labels: &[
            "have you had the hepatitis b vaccination",
            "hepatitis b vaccination",
            "vaccination status",
            "vaccination",
            "vaccinated",
        ],
        mode: CaptureMode::Line,
        refine: refine_yes_no,
    },
    FieldSpec {
        name: "medical_problems",
        labels: &[
            "list any medical problems",
            "medical problems",
            "medical history",
            "problems",
            "conditions",
        ],
        mode: CaptureMode::Block,
        refine: keep,
    },
];

/// Labels found on intake forms that are not part of the record.
const STOP_LABELS: [&str; 10] = [
    "date",
    "birth date",
    "date of birth",
    "dob",
    "age",
    "gender",
    "weight",
    "height",
    "email",
    "address",
];

lazy_static! {
    static ref ANCHORS: AnchorSet =
        AnchorSet::compile(&FIELDS, &STOP_LABELS).unwrap();
}

/// Parser for patient intake forms: name, phone, insurance, vaccination, medical problems.
pub struct PatientDetailsParser {
    max_value_chars: usize,
}

impl PatientDetailsParser {
    /// Create a parser capturing at most `max_value_chars` per field.
    pub fn new(max_value_chars: usize) -> Self {
        Self { max_value_chars }
    }
}

impl FieldParser for PatientDetailsParser {
    fn document_type(&self) -> DocumentType {
        DocumentType::PatientDetails
    }

    fn parse(&self, text: &str) -> Result<RawFields, ParseError> {
        if text.trim().is_empty() {
            return Err(ParseError::NoText);
        }

        info!("Parsing patient details from {} characters of text", text.len());
        Ok(ANCHORS.scan(text, self.max_value_chars))
    }
}
