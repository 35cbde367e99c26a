//! Core library for medical document field extraction.
//!
//! This crate provides:
//! - Document loading (PDF rasterization via pdftoppm, image files)
//! - Page normalization and text recognition via tesseract
//! - Label-anchored field parsing for prescriptions and patient intake forms
//! - Fixed-schema records ready for JSON or spreadsheet export

pub mod error;
pub mod extraction;
pub mod models;
pub mod ocr;
pub mod pdf;
pub mod pipeline;

pub use error::{MedexError, Result};
pub use extraction::{FieldParser, RawFields, assemble, missing_fields, parser_for};
pub use models::{DocumentType, FieldRecord, MedexConfig, PatientDetailsRecord, PrescriptionRecord};
pub use ocr::{
    AggregatedText, ImageNormalizer, NormalizedImage, RecognizedText, TesseractRecognizer,
    TextRecognizer, aggregate,
};
pub use pdf::{DocumentLoader, Page, PdftoppmRasterizer, Rasterizer};
pub use pipeline::{ExtractionPipeline, ExtractionPipelineBuilder, ExtractionResult};
