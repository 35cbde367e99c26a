//! Configuration structures for the extraction pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::MedexError;

/// Largest accepted `preprocessing.upscale` factor.
pub const MAX_UPSCALE: f32 = 4.0;

/// Main configuration for the medex pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MedexConfig {
    /// Text recognition configuration.
    pub ocr: OcrConfig,

    /// Page rasterization configuration.
    pub raster: RasterConfig,

    /// Image normalization configuration.
    pub preprocessing: PreprocessingConfig,

    /// Field parsing configuration.
    pub parsing: ParsingConfig,
}

/// Text recognition engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Path to the tesseract executable.
    pub engine_path: PathBuf,

    /// Language hint passed to the engine.
    pub language: String,

    /// Tesseract page segmentation mode (`--psm`), engine default if unset.
    pub page_segmentation_mode: Option<u8>,

    /// Number of pages normalized and recognized concurrently.
    pub workers: usize,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            engine_path: PathBuf::from("tesseract"),
            language: "eng".to_string(),
            page_segmentation_mode: None,
            workers: 2,
        }
    }
}

/// PDF rasterization configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RasterConfig {
    /// Path to the pdftoppm executable.
    pub rasterizer_path: PathBuf,

    /// DPI for rendering PDF pages to images.
    pub dpi: u32,

    /// Maximum pages to rasterize (0 = unlimited).
    pub max_pages: u32,
}

impl Default for RasterConfig {
    fn default() -> Self {
        Self {
            rasterizer_path: PathBuf::from("pdftoppm"),
            dpi: 300,
            max_pages: 0,
        }
    }
}

/// Binarization strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Binarization {
    /// Single global threshold chosen by Otsu's method.
    Otsu,
    /// Local mean threshold, better for uneven lighting on phone scans.
    Adaptive,
}

/// Image normalization configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessingConfig {
    /// Binarization strategy.
    pub binarization: Binarization,

    /// Neighbourhood size for adaptive thresholding (odd, pixels).
    pub adaptive_block_size: u32,

    /// Offset subtracted from the local mean in adaptive thresholding.
    pub adaptive_offset: i32,

    /// Remove isolated single-pixel specks after binarization.
    pub despeckle: bool,

    /// Upscale factor applied before thresholding. Values below 1.0 are ignored.
    pub upscale: f32,
}

impl Default for PreprocessingConfig {
    fn default() -> Self {
        Self {
            binarization: Binarization::Adaptive,
            adaptive_block_size: 31,
            adaptive_offset: 10,
            despeckle: true,
            upscale: 1.0,
        }
    }
}

/// Field parsing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParsingConfig {
    /// Maximum characters captured for a single field value.
    pub max_value_chars: usize,
}

impl Default for ParsingConfig {
    fn default() -> Self {
        Self {
            max_value_chars: 256,
        }
    }
}

impl MedexConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }

    /// Check values that would otherwise fail deep inside the pipeline.
    pub fn validate(&self) -> Result<(), MedexError> {
        if self.ocr.workers == 0 {
            return Err(MedexError::Config("ocr.workers must be at least 1".to_string()));
        }
        if self.ocr.language.trim().is_empty() {
            return Err(MedexError::Config("ocr.language must not be empty".to_string()));
        }
        if self.raster.dpi == 0 {
            return Err(MedexError::Config("raster.dpi must be positive".to_string()));
        }
        if self.preprocessing.binarization == Binarization::Adaptive
            && self.preprocessing.adaptive_block_size < 3
        {
            return Err(MedexError::Config(
                "preprocessing.adaptive_block_size must be at least 3".to_string(),
            ));
        }
        if !self.preprocessing.upscale.is_finite() || self.preprocessing.upscale > MAX_UPSCALE {
            return Err(MedexError::Config(format!(
                "preprocessing.upscale must be at most {MAX_UPSCALE}"
            )));
        }
        if self.parsing.max_value_chars == 0 {
            return Err(MedexError::Config(
                "parsing.max_value_chars must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(MedexConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: MedexConfig =
            serde_json::from_str(r#"{"ocr": {"language": "deu"}}"#).unwrap();
        assert_eq!(config.ocr.language, "deu");
        assert_eq!(config.ocr.engine_path, PathBuf::from("tesseract"));
        assert_eq!(config.raster.dpi, 300);
    }

    #[test]
    fn test_zero_workers_rejected() {
        let mut config = MedexConfig::default();
        config.ocr.workers = 0;
        assert!(matches!(config.validate(), Err(MedexError::Config(_))));
    }

    #[test]
    fn test_upscale_bounded() {
        let mut config = MedexConfig::default();
        config.preprocessing.upscale = MAX_UPSCALE;
        assert!(config.validate().is_ok());

        config.preprocessing.upscale = 1e6;
        assert!(matches!(config.validate(), Err(MedexError::Config(_))));

        config.preprocessing.upscale = f32::NAN;
        assert!(matches!(config.validate(), Err(MedexError::Config(_))));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = MedexConfig::default();
        config.preprocessing.binarization = Binarization::Otsu;
        config.save(&path).unwrap();

        let loaded = MedexConfig::from_file(&path).unwrap();
        assert_eq!(loaded.preprocessing.binarization, Binarization::Otsu);
    }
}
