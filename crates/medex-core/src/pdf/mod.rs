//! Document rasterization: turning a source file into ordered page images.

mod rasterizer;

pub use rasterizer::{DocumentLoader, PdftoppmRasterizer};

use std::path::Path;

use image::DynamicImage;

use crate::error::InputError;

/// Result type for rasterization.
pub type Result<T> = std::result::Result<T, InputError>;

/// One rasterized sheet of a document.
#[derive(Debug, Clone)]
pub struct Page {
    /// Page number (1-indexed, document order).
    pub number: u32,
    /// Rendered page image.
    pub image: DynamicImage,
}

impl Page {
    pub fn new(number: u32, image: DynamicImage) -> Self {
        Self { number, image }
    }
}

/// Trait for rasterizer implementations.
///
/// Implementations return pages in document order, numbered from 1.
pub trait Rasterizer: Send + Sync {
    /// Rasterize every page of the document at `path`.
    fn rasterize(&self, path: &Path) -> Result<Vec<Page>>;
}
