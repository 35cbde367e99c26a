//! Assembly of raw parser output into fixed-schema records.

use tracing::warn;

use super::RawFields;
use crate::models::document::DocumentType;
use crate::models::record::FieldRecord;

/// Build the record for `document_type` from raw parser output.
///
/// Every schema field is present in the result; fields the parser did not
/// find are empty. Keys outside the schema are dropped.
pub fn assemble(raw: &RawFields, document_type: DocumentType) -> FieldRecord {
    let mut record = FieldRecord::empty(document_type);

    for (field, value) in raw {
        if record.set(field, value.as_str()).is_err() {
            warn!("Dropping field {:?} not in the {} schema", field, document_type);
        }
    }

    record
}

/// Schema fields whose anchor the parser never found.
pub fn missing_fields(raw: &RawFields, document_type: DocumentType) -> Vec<&'static str> {
    document_type
        .schema()
        .iter()
        .copied()
        .filter(|field| !raw.contains_key(*field))
        .collect()
}
