//! Error types for the medex-core library.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the medex library.
///
/// Every variant is an all-or-nothing pipeline failure. A field whose
/// anchor was never found is not an error; it ends up as an empty value
/// in the assembled record.
#[derive(Error, Debug)]
pub enum MedexError {
    /// Source document or page image is missing, unreadable, or empty.
    #[error("input error: {0}")]
    Input(#[from] InputError),

    /// The external text recognizer is unavailable or rejected the input.
    #[error("recognition error: {0}")]
    Recognition(#[from] RecognitionError),

    /// The aggregated text could not be parsed.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// The document type tag is not one of the supported values.
    #[error("unsupported document type: {0:?} (expected \"prescription\" or \"patient_details\")")]
    UnsupportedFormat(String),

    /// A record edit named a field outside the record's schema.
    #[error("{document_type} records have no field {field:?}")]
    UnknownField { document_type: String, field: String },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors related to the source document and its page images.
#[derive(Error, Debug)]
pub enum InputError {
    /// The document file does not exist.
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    /// The document exists but could not be read or decoded.
    #[error("failed to read {path}: {reason}")]
    Unreadable { path: PathBuf, reason: String },

    /// The file extension is not a PDF or a supported image format.
    #[error("unsupported file type: {0}")]
    UnsupportedFile(String),

    /// The document has no pages.
    #[error("document has no pages")]
    NoPages,

    /// A page image has zero width or height.
    #[error("page {0} is an empty image")]
    EmptyImage(u32),

    /// The external rasterizer failed.
    #[error("rasterizer failed: {0}")]
    Rasterizer(String),
}

/// Errors raised by the text recognizer adapter.
#[derive(Error, Debug)]
pub enum RecognitionError {
    /// The recognition engine could not be started.
    #[error("recognition engine unavailable at {path}: {reason}")]
    EngineUnavailable { path: String, reason: String },

    /// The engine ran but rejected the input.
    #[error("recognition engine rejected page {page} (exit code {code}): {stderr}")]
    Rejected { page: u32, code: i32, stderr: String },

    /// Failed to hand the image over to the engine.
    #[error("failed to prepare page {page} for recognition: {reason}")]
    Handoff { page: u32, reason: String },
}

/// Errors related to field parsing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The aggregated text is empty or whitespace only.
    #[error("no text to parse")]
    NoText,
}

/// Result type for the medex library.
pub type Result<T> = std::result::Result<T, MedexError>;
