//! Structured records produced by the extraction pipeline.
//!
//! Each document type has a fixed record struct, so the key set of a
//! finished record is known statically. An empty string means the field
//! was not found in the document.

use serde::{Deserialize, Serialize};

use super::document::DocumentType;
use crate::error::MedexError;

/// Fields extracted from a prescription.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PrescriptionRecord {
    pub patient_name: String,
    pub patient_address: String,
    pub medicines: String,
    pub refill: String,
    pub directions: String,
}

/// Fields extracted from a patient intake form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatientDetailsRecord {
    pub patient_name: String,
    pub phone_no: String,
    pub has_insurance: String,
    pub vaccination_status: String,
    pub medical_problems: String,
}

impl PrescriptionRecord {
    fn slot(&self, field: &str) -> Option<&String> {
        match field {
            "patient_name" => Some(&self.patient_name),
            "patient_address" => Some(&self.patient_address),
            "medicines" => Some(&self.medicines),
            "refill" => Some(&self.refill),
            "directions" => Some(&self.directions),
            _ => None,
        }
    }

    fn slot_mut(&mut self, field: &str) -> Option<&mut String> {
        match field {
            "patient_name" => Some(&mut self.patient_name),
            "patient_address" => Some(&mut self.patient_address),
            "medicines" => Some(&mut self.medicines),
            "refill" => Some(&mut self.refill),
            "directions" => Some(&mut self.directions),
            _ => None,
        }
    }
}

impl PatientDetailsRecord {
    fn slot(&self, field: &str) -> Option<&String> {
        match field {
            "patient_name" => Some(&self.patient_name),
            "phone_no" => Some(&self.phone_no),
            "has_insurance" => Some(&self.has_insurance),
            "vaccination_status" => Some(&self.vaccination_status),
            "medical_problems" => Some(&self.medical_problems),
            _ => None,
        }
    }

    fn slot_mut(&mut self, field: &str) -> Option<&mut String> {
        match field {
            "patient_name" => Some(&mut self.patient_name),
            "phone_no" => Some(&mut self.phone_no),
            "has_insurance" => Some(&mut self.has_insurance),
            "vaccination_status" => Some(&mut self.vaccination_status),
            "medical_problems" => Some(&mut self.medical_problems),
            _ => None,
        }
    }
}

/// A finished record for one document.
///
/// Serializes as a flat JSON object with exactly the schema keys of its
/// document type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldRecord {
    Prescription(PrescriptionRecord),
    PatientDetails(PatientDetailsRecord),
}

impl FieldRecord {
    /// A record of the given type with every field empty.
    pub fn empty(document_type: DocumentType) -> Self {
        match document_type {
            DocumentType::Prescription => Self::Prescription(PrescriptionRecord::default()),
            DocumentType::PatientDetails => Self::PatientDetails(PatientDetailsRecord::default()),
        }
    }

    /// Document type this record belongs to.
    pub fn document_type(&self) -> DocumentType {
        match self {
            Self::Prescription(_) => DocumentType::Prescription,
            Self::PatientDetails(_) => DocumentType::PatientDetails,
        }
    }

    /// Column names for tabular export, in schema order.
    pub fn headers(&self) -> &'static [&'static str] {
        self.document_type().schema()
    }

    /// Values in schema order, one per header.
    pub fn values(&self) -> Vec<&str> {
        self.headers()
            .iter()
            .map(|name| self.get(name).unwrap_or_default())
            .collect()
    }

    /// Named fields for display and review, in schema order.
    pub fn fields(&self) -> Vec<(&'static str, &str)> {
        self.headers()
            .iter()
            .map(|name| (*name, self.get(name).unwrap_or_default()))
            .collect()
    }

    /// Get a field value by name.
    pub fn get(&self, field: &str) -> Option<&str> {
        let value = match self {
            Self::Prescription(r) => r.slot(field),
            Self::PatientDetails(r) => r.slot(field),
        };
        value.map(String::as_str)
    }

    /// Replace a field value, e.g. after a reviewer corrected it.
    pub fn set(&mut self, field: &str, value: impl Into<String>) -> Result<(), MedexError> {
        let document_type = self.document_type();
        let slot = match self {
            Self::Prescription(r) => r.slot_mut(field),
            Self::PatientDetails(r) => r.slot_mut(field),
        };

        match slot {
            Some(slot) => {
                *slot = value.into();
                Ok(())
            }
            None => Err(MedexError::UnknownField {
                document_type: document_type.to_string(),
                field: field.to_string(),
            }),
        }
    }

    /// Names of fields that are empty.
    pub fn empty_fields(&self) -> Vec<&'static str> {
        self.fields()
            .into_iter()
            .filter(|(_, value)| value.is_empty())
            .map(|(name, _)| name)
            .collect()
    }
}
