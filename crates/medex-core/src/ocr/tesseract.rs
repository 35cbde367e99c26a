//! Tesseract command-line adapter.

use std::process::Command;

use image::ImageFormat;
use tracing::{debug, trace};

use super::{NormalizedImage, RecognizedText, TextRecognizer};
use crate::error::RecognitionError;
use crate::models::config::OcrConfig;

/// Recognizer that runs the `tesseract` executable on each page.
pub struct TesseractRecognizer {
    config: OcrConfig,
}

impl TesseractRecognizer {
    /// Create a recognizer from explicit configuration.
    pub fn new(config: OcrConfig) -> Self {
        Self { config }
    }

    /// Check if the configured engine can be executed.
    pub fn is_available(&self) -> bool {
        Command::new(&self.config.engine_path)
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }
}

impl TextRecognizer for TesseractRecognizer {
    fn recognize(
        &self,
        image: &NormalizedImage,
        language: &str,
    ) -> Result<RecognizedText, RecognitionError> {
        let page = image.page();
        let handoff = |e: &dyn std::fmt::Display| RecognitionError::Handoff {
            page,
            reason: e.to_string(),
        };

        let file = tempfile::Builder::new()
            .prefix("medex-page-")
            .suffix(".png")
            .tempfile()
            .map_err(|e| handoff(&e))?;
        image
            .image()
            .save_with_format(file.path(), ImageFormat::Png)
            .map_err(|e| handoff(&e))?;

        // tesseract <image> stdout -l <lang> [--psm N]
        let mut command = Command::new(&self.config.engine_path);
        command.arg(file.path()).arg("stdout").arg("-l").arg(language);
        if let Some(psm) = self.config.page_segmentation_mode {
            command.arg("--psm").arg(psm.to_string());
        }

        debug!("Recognizing page {} with {}", page, self.config.engine_path.display());

        let output = command
            .output()
            .map_err(|e| RecognitionError::EngineUnavailable {
                path: self.config.engine_path.display().to_string(),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(RecognitionError::Rejected {
                page,
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        trace!("Page {} recognized {} chars", page, text.len());

        Ok(RecognizedText::new(page, text))
    }
}
