//! End-to-end extraction: document file to structured record.

use std::path::Path;
use std::time::Instant;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{InputError, MedexError, Result};
use crate::extraction::{assemble, missing_fields, parser_for};
use crate::models::config::MedexConfig;
use crate::models::document::DocumentType;
use crate::models::record::FieldRecord;
use crate::ocr::{
    aggregate, AggregatedText, ImageNormalizer, RecognizedText, TesseractRecognizer,
    TextRecognizer,
};
use crate::pdf::{DocumentLoader, Page, Rasterizer};

/// Result of extracting one document.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionResult {
    /// Assembled record with every schema field present.
    pub record: FieldRecord,
    /// Aggregated text the record was parsed from.
    pub raw_text: String,
    /// Number of pages that contributed text.
    pub page_count: usize,
    /// Schema fields whose label was not found.
    pub missing_fields: Vec<&'static str>,
    /// Extraction warnings.
    pub warnings: Vec<String>,
    /// Processing time in milliseconds.
    pub processing_time_ms: u64,
    /// When the extraction finished.
    pub extracted_at: DateTime<Utc>,
}

/// Builder for [`ExtractionPipeline`].
///
/// Anything not set explicitly is created from the configuration:
/// pdftoppm for PDFs, tesseract for recognition.
#[derive(Default)]
pub struct ExtractionPipelineBuilder {
    config: MedexConfig,
    rasterizer: Option<Box<dyn Rasterizer>>,
    recognizer: Option<Box<dyn TextRecognizer>>,
    normalizer: Option<ImageNormalizer>,
}

impl ExtractionPipelineBuilder {
    /// Use the given configuration.
    pub fn with_config(mut self, config: MedexConfig) -> Self {
        self.config = config;
        self
    }

    /// Use a custom rasterizer.
    pub fn with_rasterizer(mut self, rasterizer: impl Rasterizer + 'static) -> Self {
        self.rasterizer = Some(Box::new(rasterizer));
        self
    }

    /// Use a custom text recognizer.
    pub fn with_recognizer(mut self, recognizer: impl TextRecognizer + 'static) -> Self {
        self.recognizer = Some(Box::new(recognizer));
        self
    }

    /// Use a custom image normalizer.
    pub fn with_normalizer(mut self, normalizer: ImageNormalizer) -> Self {
        self.normalizer = Some(normalizer);
        self
    }

    /// Validate the configuration and build the pipeline.
    pub fn build(self) -> Result<ExtractionPipeline> {
        self.config.validate()?;

        let pool = ThreadPoolBuilder::new()
            .num_threads(self.config.ocr.workers)
            .thread_name(|i| format!("medex-ocr-{i}"))
            .build()
            .map_err(|e| MedexError::Config(format!("failed to build worker pool: {e}")))?;

        let rasterizer = self.rasterizer.unwrap_or_else(|| {
            Box::new(DocumentLoader::from_config(&self.config.raster)) as Box<dyn Rasterizer>
        });
        let recognizer = self.recognizer.unwrap_or_else(|| {
            Box::new(TesseractRecognizer::new(self.config.ocr.clone())) as Box<dyn TextRecognizer>
        });
        let normalizer = self
            .normalizer
            .unwrap_or_else(|| ImageNormalizer::with_config(self.config.preprocessing.clone()));

        Ok(ExtractionPipeline {
            config: self.config,
            rasterizer,
            recognizer,
            normalizer,
            pool,
        })
    }
}

/// Runs documents through rasterization, normalization, recognition,
/// aggregation, parsing and assembly.
///
/// Each call owns its intermediate values, so one pipeline can serve
/// concurrent callers.
pub struct ExtractionPipeline {
    config: MedexConfig,
    rasterizer: Box<dyn Rasterizer>,
    recognizer: Box<dyn TextRecognizer>,
    normalizer: ImageNormalizer,
    pool: ThreadPool,
}

impl ExtractionPipeline {
    /// Start building a pipeline.
    pub fn builder() -> ExtractionPipelineBuilder {
        ExtractionPipelineBuilder::default()
    }

    /// Build a pipeline with default components for `config`.
    pub fn new(config: MedexConfig) -> Result<Self> {
        Self::builder().with_config(config).build()
    }

    /// Configuration in use.
    pub fn config(&self) -> &MedexConfig {
        &self.config
    }

    /// Extract a record from the document at `path`.
    ///
    /// `document_type` is checked before any page is touched.
    pub fn extract(&self, path: &Path, document_type: &str) -> Result<ExtractionResult> {
        let document_type: DocumentType = document_type.parse()?;
        let start = Instant::now();

        info!("Extracting {} from {}", document_type, path.display());
        let pages = self.rasterizer.rasterize(path)?;

        self.run(&pages, document_type, start)
    }

    /// Extract a record from already rasterized pages.
    pub fn extract_pages(
        &self,
        pages: &[Page],
        document_type: DocumentType,
    ) -> Result<ExtractionResult> {
        self.run(pages, document_type, Instant::now())
    }

    /// Extract a record from text that was recognized elsewhere.
    pub fn extract_text(&self, text: &str, document_type: DocumentType) -> Result<ExtractionResult> {
        let text = AggregatedText::from_text(text);
        self.finish(text, document_type, Instant::now())
    }

    /// Normalize and recognize every page on the worker pool, in page order.
    pub fn recognize_pages(&self, pages: &[Page]) -> Result<Vec<RecognizedText>> {
        let language = self.config.ocr.language.as_str();

        self.pool.install(|| {
            pages
                .par_iter()
                .map(|page| -> Result<RecognizedText> {
                    let normalized = self.normalizer.normalize(page)?;
                    let text = self.recognizer.recognize(&normalized, language)?;
                    debug!("Page {}: {} characters recognized", page.number, text.text.len());
                    Ok(text)
                })
                .collect::<Result<Vec<_>>>()
        })
    }

    fn run(
        &self,
        pages: &[Page],
        document_type: DocumentType,
        start: Instant,
    ) -> Result<ExtractionResult> {
        if pages.is_empty() {
            return Err(InputError::NoPages.into());
        }
        let recognized = self.recognize_pages(pages)?;
        self.finish(aggregate(&recognized), document_type, start)
    }

    fn finish(
        &self,
        text: AggregatedText,
        document_type: DocumentType,
        start: Instant,
    ) -> Result<ExtractionResult> {
        let parser = parser_for(document_type, &self.config.parsing);
        let raw = parser.parse(text.as_str())?;

        let record = assemble(&raw, document_type);
        let missing = missing_fields(&raw, document_type);

        let mut warnings = Vec::new();
        for field in &missing {
            warnings.push(format!("{field} not found"));
        }
        for (field, value) in &raw {
            if value.is_empty() {
                warnings.push(format!("{field} label found but value is empty"));
            }
        }
        if !warnings.is_empty() {
            warn!("{} extraction: {}", document_type, warnings.join("; "));
        }

        let processing_time_ms = start.elapsed().as_millis() as u64;
        info!(
            "Extracted {} with {}/{} fields in {}ms",
            document_type,
            document_type.schema().len() - missing.len(),
            document_type.schema().len(),
            processing_time_ms
        );

        Ok(ExtractionResult {
            record,
            page_count: text.page_count(),
            raw_text: text.into_string(),
            missing_fields: missing,
            warnings,
            processing_time_ms,
            extracted_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ParseError, RecognitionError};
    use crate::ocr::NormalizedImage;
    use image::{DynamicImage, GrayImage, Luma};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Produces `count` blank pages and counts calls.
    struct FakeRasterizer {
        count: u32,
        calls: Arc<AtomicUsize>,
    }

    impl Rasterizer for FakeRasterizer {
        fn rasterize(&self, _path: &Path) -> crate::pdf::Result<Vec<Page>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.count == 0 {
                return Err(InputError::NoPages);
            }
            Ok((1..=self.count)
                .map(|n| Page::new(n, DynamicImage::ImageLuma8(GrayImage::from_pixel(8, 8, Luma([255])))))
                .collect())
        }
    }

    /// Returns scripted text per page; earlier pages finish last.
    struct FakeRecognizer {
        texts: Vec<&'static str>,
        calls: Arc<AtomicUsize>,
    }

    impl TextRecognizer for FakeRecognizer {
        fn recognize(
            &self,
            image: &NormalizedImage,
            _language: &str,
        ) -> std::result::Result<RecognizedText, RecognitionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let index = (image.page() - 1) as usize;
            std::thread::sleep(Duration::from_millis(((self.texts.len() - index) * 10) as u64));
            Ok(RecognizedText::new(image.page(), self.texts[index]))
        }
    }

    struct Counters {
        raster: Arc<AtomicUsize>,
        ocr: Arc<AtomicUsize>,
    }

    fn pipeline(texts: Vec<&'static str>) -> (ExtractionPipeline, Counters) {
        let counters = Counters {
            raster: Arc::new(AtomicUsize::new(0)),
            ocr: Arc::new(AtomicUsize::new(0)),
        };
        let mut config = MedexConfig::default();
        config.ocr.workers = 4;

        let pipeline = ExtractionPipeline::builder()
            .with_config(config)
            .with_rasterizer(FakeRasterizer {
                count: texts.len() as u32,
                calls: counters.raster.clone(),
            })
            .with_recognizer(FakeRecognizer {
                texts,
                calls: counters.ocr.clone(),
            })
            .build()
            .unwrap();
        (pipeline, counters)
    }

    #[test]
    fn test_unsupported_type_fails_before_any_work() {
        let (pipeline, counters) = pipeline(vec!["Name: Jane"]);

        let err = pipeline.extract(Path::new("scan.pdf"), "invoice").unwrap_err();

        assert!(matches!(err, MedexError::UnsupportedFormat(ref tag) if tag == "invoice"));
        assert_eq!(counters.raster.load(Ordering::SeqCst), 0);
        assert_eq!(counters.ocr.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_single_page_prescription() {
        let (pipeline, counters) = pipeline(vec![
            "Name: Jane Doe\nAddress: 12 Elm St\nRx: Amoxicillin 500mg\nRefill: 2\nDirections: Take twice daily",
        ]);

        let result = pipeline.extract(Path::new("rx.pdf"), "prescription").unwrap();

        assert_eq!(
            result.record.values(),
            vec!["Jane Doe", "12 Elm St", "Amoxicillin 500mg", "2", "Take twice daily"]
        );
        assert_eq!(result.page_count, 1);
        assert!(result.missing_fields.is_empty());
        assert!(result.warnings.is_empty());
        assert_eq!(counters.ocr.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_page_order_restored_after_parallel_recognition() {
        let (pipeline, _) = pipeline(vec!["Name: Jane Doe", "Rx: Ibuprofen", "Refill: 3 times"]);

        let result = pipeline.extract(Path::new("rx.pdf"), "prescription").unwrap();

        assert_eq!(
            result.raw_text,
            "Name: Jane Doe\n\u{c}\nRx: Ibuprofen\n\u{c}\nRefill: 3 times"
        );
        assert_eq!(result.page_count, 3);
        assert_eq!(result.record.get("patient_name"), Some("Jane Doe"));
        assert_eq!(result.record.get("medicines"), Some("Ibuprofen"));
        assert_eq!(result.record.get("refill"), Some("3"));
    }

    #[test]
    fn test_missing_fields_reported() {
        let (pipeline, _) = pipeline(vec!["Name: John Roe\nPhone: 555-1234"]);

        let result = pipeline.extract(Path::new("form.png"), "patient_details").unwrap();

        assert_eq!(
            result.record.values(),
            vec!["John Roe", "555-1234", "", "", ""]
        );
        assert_eq!(
            result.missing_fields,
            vec!["has_insurance", "vaccination_status", "medical_problems"]
        );
        assert_eq!(result.warnings.len(), 3);
    }

    #[test]
    fn test_blank_recognition_is_parse_error() {
        let (pipeline, _) = pipeline(vec!["   ", "\n"]);

        let err = pipeline.extract(Path::new("blank.pdf"), "prescription").unwrap_err();
        assert!(matches!(err, MedexError::Parse(ParseError::NoText)));
    }

    #[test]
    fn test_rasterizer_failure_propagates() {
        let (pipeline, counters) = pipeline(vec![]);

        let err = pipeline.extract(Path::new("empty.pdf"), "prescription").unwrap_err();
        assert!(matches!(err, MedexError::Input(InputError::NoPages)));
        assert_eq!(counters.ocr.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_no_pages_is_input_error() {
        let (pipeline, counters) = pipeline(vec!["Name: Jane"]);

        let err = pipeline.extract_pages(&[], DocumentType::Prescription).unwrap_err();
        assert!(matches!(err, MedexError::Input(InputError::NoPages)));
        assert_eq!(counters.ocr.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_extract_text_skips_ocr() {
        let (pipeline, counters) = pipeline(vec![]);

        let result = pipeline
            .extract_text("Name: Kathy Crawford\nInsurance: no", DocumentType::PatientDetails)
            .unwrap();

        assert_eq!(result.record.get("has_insurance"), Some("No"));
        assert_eq!(counters.raster.load(Ordering::SeqCst), 0);
        assert_eq!(counters.ocr.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = MedexConfig::default();
        config.ocr.workers = 0;
        assert!(matches!(
            ExtractionPipeline::new(config),
            Err(MedexError::Config(_))
        ));
    }
}
