//! PDF rasterization through poppler's `pdftoppm`, plus direct image loading.

use std::path::{Path, PathBuf};
use std::process::Command;

use lopdf::Document;
use tracing::{debug, info, warn};

use super::{Page, Rasterizer, Result};
use crate::error::InputError;
use crate::models::config::RasterConfig;

/// Image extensions loaded directly as a single page.
const IMAGE_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "tif", "tiff", "bmp"];

/// Rasterizer that shells out to `pdftoppm`.
pub struct PdftoppmRasterizer {
    config: RasterConfig,
}

impl PdftoppmRasterizer {
    /// Create a rasterizer from explicit configuration.
    pub fn new(config: RasterConfig) -> Self {
        Self { config }
    }

    /// Check that the PDF parses and has pages before spending time rendering it.
    fn inspect(&self, path: &Path) -> Result<u32> {
        let mut doc = Document::load(path).map_err(|e| InputError::Unreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        if doc.is_encrypted() {
            if doc.decrypt("").is_err() {
                return Err(InputError::Unreadable {
                    path: path.to_path_buf(),
                    reason: "PDF is encrypted".to_string(),
                });
            }
            debug!("Decrypted PDF with empty password");
        }

        let page_count = doc.get_pages().len() as u32;
        if page_count == 0 {
            return Err(InputError::NoPages);
        }

        debug!("Loaded PDF with {} pages", page_count);
        Ok(page_count)
    }

    /// Check if the configured pdftoppm binary can be executed.
    pub fn is_available(&self) -> bool {
        Command::new(&self.config.rasterizer_path)
            .arg("-v")
            .output()
            .is_ok()
    }
}

impl Rasterizer for PdftoppmRasterizer {
    fn rasterize(&self, path: &Path) -> Result<Vec<Page>> {
        if !path.exists() {
            return Err(InputError::NotFound(path.to_path_buf()));
        }

        let page_count = self.inspect(path)?;
        let temp_dir = tempfile::tempdir().map_err(|e| InputError::Rasterizer(e.to_string()))?;
        let output_prefix = temp_dir.path().join("page");

        info!(
            "Rasterizing {} ({} pages, {} dpi)",
            path.display(),
            page_count,
            self.config.dpi
        );

        let mut command = Command::new(&self.config.rasterizer_path);
        command.arg("-png").arg("-r").arg(self.config.dpi.to_string());
        if self.config.max_pages > 0 {
            command.arg("-l").arg(self.config.max_pages.to_string());
        }
        let output = command
            .arg(path)
            .arg(&output_prefix)
            .output()
            .map_err(|e| {
                InputError::Rasterizer(format!(
                    "failed to run {}: {}",
                    self.config.rasterizer_path.display(),
                    e
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(InputError::Rasterizer(stderr.trim().to_string()));
        }

        let mut rendered: Vec<(u32, PathBuf)> = std::fs::read_dir(temp_dir.path())
            .map_err(|e| InputError::Rasterizer(e.to_string()))?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter_map(|p| rendered_page_number(&p).map(|n| (n, p)))
            .collect();

        // pdftoppm zero-pads by page count, so sort numerically rather than by name.
        rendered.sort_by_key(|(number, _)| *number);

        if rendered.is_empty() {
            return Err(InputError::Rasterizer("pdftoppm produced no images".to_string()));
        }

        let mut pages = Vec::with_capacity(rendered.len());
        for (number, image_path) in rendered {
            let image = image::open(&image_path).map_err(|e| InputError::Unreadable {
                path: image_path.clone(),
                reason: e.to_string(),
            })?;
            pages.push(Page::new(number, image));
        }

        debug!("Rendered {} pages", pages.len());
        Ok(pages)
    }
}

/// Parse the page number out of a pdftoppm output name such as `page-07.png`.
fn rendered_page_number(path: &Path) -> Option<u32> {
    if path.extension().and_then(|e| e.to_str()) != Some("png") {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    let (_, number) = stem.rsplit_once('-')?;
    number.parse().ok()
}

/// Chooses how to turn a file into pages based on its extension.
///
/// PDFs go through the configured rasterizer; image files become a single page.
pub struct DocumentLoader<R: Rasterizer> {
    pdf: R,
}

impl<R: Rasterizer> DocumentLoader<R> {
    pub fn new(pdf: R) -> Self {
        Self { pdf }
    }
}

impl DocumentLoader<PdftoppmRasterizer> {
    /// Loader backed by `pdftoppm` with the given configuration.
    pub fn from_config(config: &RasterConfig) -> Self {
        Self::new(PdftoppmRasterizer::new(config.clone()))
    }
}

impl<R: Rasterizer> Rasterizer for DocumentLoader<R> {
    fn rasterize(&self, path: &Path) -> Result<Vec<Page>> {
        if !path.exists() {
            return Err(InputError::NotFound(path.to_path_buf()));
        }

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        if extension == "pdf" {
            return self.pdf.rasterize(path);
        }

        if IMAGE_EXTENSIONS.contains(&extension.as_str()) {
            let image = image::open(path).map_err(|e| InputError::Unreadable {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
            return Ok(vec![Page::new(1, image)]);
        }

        warn!("Refusing to rasterize {}", path.display());
        Err(InputError::UnsupportedFile(extension))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, RgbImage};

    struct NoPdf;

    impl Rasterizer for NoPdf {
        fn rasterize(&self, _path: &Path) -> Result<Vec<Page>> {
            panic!("PDF rasterizer must not be called for images");
        }
    }

    #[test]
    fn test_rendered_page_number() {
        assert_eq!(rendered_page_number(Path::new("/tmp/x/page-1.png")), Some(1));
        assert_eq!(rendered_page_number(Path::new("/tmp/x/page-010.png")), Some(10));
        assert_eq!(rendered_page_number(Path::new("/tmp/x/page-1.ppm")), None);
        assert_eq!(rendered_page_number(Path::new("/tmp/x/notes.png")), None);
    }

    #[test]
    fn test_missing_file() {
        let loader = DocumentLoader::new(NoPdf);
        let err = loader.rasterize(Path::new("/definitely/not/here.pdf")).unwrap_err();
        assert!(matches!(err, InputError::NotFound(_)));
    }

    #[test]
    fn test_image_file_is_single_page() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.png");
        DynamicImage::ImageRgb8(RgbImage::new(8, 6)).save(&path).unwrap();

        let pages = DocumentLoader::new(NoPdf).rasterize(&path).unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].number, 1);
        assert_eq!((pages[0].image.width(), pages[0].image.height()), (8, 6));
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.docx");
        std::fs::write(&path, b"not a scan").unwrap();

        let err = DocumentLoader::new(NoPdf).rasterize(&path).unwrap_err();
        assert!(matches!(err, InputError::UnsupportedFile(ext) if ext == "docx"));
    }

    #[test]
    fn test_corrupt_pdf_is_input_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"%PDF-1.4 this is not really a pdf").unwrap();

        let rasterizer = PdftoppmRasterizer::new(RasterConfig::default());
        let err = rasterizer.rasterize(&path).unwrap_err();
        assert!(matches!(err, InputError::Unreadable { .. }));
    }
}
