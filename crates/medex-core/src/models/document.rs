//! Document type tags supplied by the caller.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::MedexError;

/// Canonical field names of a prescription record, in export order.
pub const PRESCRIPTION_FIELDS: [&str; 5] = [
    "patient_name",
    "patient_address",
    "medicines",
    "refill",
    "directions",
];

/// Canonical field names of a patient details record, in export order.
pub const PATIENT_DETAILS_FIELDS: [&str; 5] = [
    "patient_name",
    "phone_no",
    "has_insurance",
    "vaccination_status",
    "medical_problems",
];

/// Type of scanned document. Selects the field parser and record schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    /// Medical prescription.
    Prescription,
    /// Patient intake form.
    PatientDetails,
}

impl DocumentType {
    /// All supported document types.
    pub const ALL: [DocumentType; 2] = [DocumentType::Prescription, DocumentType::PatientDetails];

    /// The tag string callers use for this type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Prescription => "prescription",
            Self::PatientDetails => "patient_details",
        }
    }

    /// Canonical schema (field names) for this type.
    pub fn schema(&self) -> &'static [&'static str] {
        match self {
            Self::Prescription => &PRESCRIPTION_FIELDS,
            Self::PatientDetails => &PATIENT_DETAILS_FIELDS,
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentType {
    type Err = MedexError;

    /// Tags are matched exactly. Unknown tags are an error, never a default.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "prescription" => Ok(Self::Prescription),
            "patient_details" => Ok(Self::PatientDetails),
            other => Err(MedexError::UnsupportedFormat(other.to_string())),
        }
    }
}
