//! Page image normalization for OCR.

use image::imageops::{self, FilterType};
use image::{GrayImage, Luma};
use imageproc::contrast::{otsu_level, stretch_contrast_mut};
use tracing::debug;

use crate::error::InputError;
use crate::models::config::{Binarization, PreprocessingConfig};
use crate::pdf::Page;

const INK: u8 = 0;
const PAPER: u8 = 255;

/// A binarized page image ready for the recognizer.
///
/// Created once by [`ImageNormalizer::normalize`] and never modified afterwards.
#[derive(Debug, Clone)]
pub struct NormalizedImage {
    page: u32,
    image: GrayImage,
}

impl NormalizedImage {
    /// Page number the image was derived from.
    pub fn page(&self) -> u32 {
        self.page
    }

    /// The normalized pixels.
    pub fn image(&self) -> &GrayImage {
        &self.image
    }

    /// Image dimensions (width, height).
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

/// Converts rasterized pages into high-contrast black-on-white images.
///
/// Steps always run in the same order: grayscale, optional upscale,
/// contrast stretch, binarization, despeckle. The page is never cropped
/// and never shrunk.
#[derive(Debug, Clone, Default)]
pub struct ImageNormalizer {
    config: PreprocessingConfig,
}

impl ImageNormalizer {
    /// Create a normalizer with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a normalizer from explicit configuration.
    pub fn with_config(config: PreprocessingConfig) -> Self {
        Self { config }
    }

    /// Normalize one page.
    pub fn normalize(&self, page: &Page) -> Result<NormalizedImage, InputError> {
        let (width, height) = (page.image.width(), page.image.height());
        if width == 0 || height == 0 {
            return Err(InputError::EmptyImage(page.number));
        }

        let mut gray = page.image.to_luma8();

        if self.config.upscale > 1.0 {
            let new_width = (width as f32 * self.config.upscale).round() as u32;
            let new_height = (height as f32 * self.config.upscale).round() as u32;
            gray = imageops::resize(&gray, new_width, new_height, FilterType::CatmullRom);
        }

        stretch_contrast(&mut gray);

        let mut binary = match self.config.binarization {
            Binarization::Otsu => otsu_threshold(&gray),
            Binarization::Adaptive => adaptive_threshold(
                &gray,
                self.config.adaptive_block_size,
                self.config.adaptive_offset,
            ),
        };

        if self.config.despeckle {
            binary = despeckle(&binary);
        }

        debug!(
            "Normalized page {} ({}x{} -> {}x{}, {:?})",
            page.number,
            width,
            height,
            binary.width(),
            binary.height(),
            self.config.binarization
        );

        Ok(NormalizedImage {
            page: page.number,
            image: binary,
        })
    }
}

/// Linearly map the darkest pixel to 0 and the lightest to 255.
fn stretch_contrast(image: &mut GrayImage) {
    let (min, max) = image
        .pixels()
        .fold((u8::MAX, u8::MIN), |(lo, hi), p| (lo.min(p[0]), hi.max(p[0])));

    if max > min {
        stretch_contrast_mut(image, min, max, INK, PAPER);
    }
}

fn otsu_threshold(image: &GrayImage) -> GrayImage {
    // A uniform page has no ink to separate; keep it as blank paper.
    if is_uniform(image) {
        return GrayImage::from_pixel(image.width(), image.height(), Luma([PAPER]));
    }

    let level = otsu_level(image);
    let mut result = image.clone();
    for pixel in result.pixels_mut() {
        pixel[0] = if pixel[0] > level { PAPER } else { INK };
    }
    result
}

/// Local-mean thresholding over a `block_size` square window, using a
/// summed-area table so the cost does not grow with the window.
fn adaptive_threshold(image: &GrayImage, block_size: u32, offset: i32) -> GrayImage {
    let (width, height) = image.dimensions();
    let (w, h) = (width as usize, height as usize);

    let mut integral = vec![0u64; (w + 1) * (h + 1)];
    for y in 0..h {
        let mut row_sum = 0u64;
        for x in 0..w {
            row_sum += image.get_pixel(x as u32, y as u32)[0] as u64;
            integral[(y + 1) * (w + 1) + (x + 1)] = integral[y * (w + 1) + (x + 1)] + row_sum;
        }
    }

    let half = (block_size / 2) as usize;
    let mut result = GrayImage::new(width, height);

    for y in 0..h {
        let y0 = y.saturating_sub(half);
        let y1 = (y + half + 1).min(h);
        for x in 0..w {
            let x0 = x.saturating_sub(half);
            let x1 = (x + half + 1).min(w);

            let sum = integral[y1 * (w + 1) + x1] + integral[y0 * (w + 1) + x0]
                - integral[y0 * (w + 1) + x1]
                - integral[y1 * (w + 1) + x0];
            let count = ((y1 - y0) * (x1 - x0)) as u64;

            let mean = (sum / count) as i32;
            let value = image.get_pixel(x as u32, y as u32)[0] as i32;
            let output = if value > mean - offset { PAPER } else { INK };
            result.put_pixel(x as u32, y as u32, Luma([output]));
        }
    }

    result
}

/// Flip pixels that share their colour with none of their eight neighbours.
///
/// Strokes one pixel wide always have a same-coloured neighbour, so they survive.
fn despeckle(image: &GrayImage) -> GrayImage {
    let (width, height) = image.dimensions();
    let mut result = image.clone();

    for y in 0..height {
        for x in 0..width {
            let value = image.get_pixel(x, y)[0];
            let mut has_neighbours = false;
            let mut same = 0;

            for dy in -1i64..=1 {
                for dx in -1i64..=1 {
                    if dx == 0 && dy == 0 {
                        continue;
                    }
                    let nx = x as i64 + dx;
                    let ny = y as i64 + dy;
                    if nx < 0 || ny < 0 || nx >= width as i64 || ny >= height as i64 {
                        continue;
                    }
                    has_neighbours = true;
                    if image.get_pixel(nx as u32, ny as u32)[0] == value {
                        same += 1;
                    }
                }
            }

            if has_neighbours && same == 0 {
                let flipped = if value == INK { PAPER } else { INK };
                result.put_pixel(x, y, Luma([flipped]));
            }
        }
    }

    result
}

fn is_uniform(image: &GrayImage) -> bool {
    let mut pixels = image.pixels();
    match pixels.next() {
        Some(first) => pixels.all(|p| p[0] == first[0]),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, RgbImage, Rgb};

    fn page_from(image: GrayImage) -> Page {
        Page::new(1, DynamicImage::ImageLuma8(image))
    }

    /// Light gray paper with a darker gray horizontal stroke one pixel thick.
    fn faint_stroke_page() -> Page {
        let mut image = GrayImage::from_pixel(60, 40, Luma([200]));
        for x in 10..50 {
            image.put_pixel(x, 20, Luma([120]));
        }
        page_from(image)
    }

    #[test]
    fn test_empty_image_is_input_error() {
        let page = Page::new(3, DynamicImage::ImageRgb8(RgbImage::new(0, 10)));
        let err = ImageNormalizer::new().normalize(&page).unwrap_err();
        assert!(matches!(err, InputError::EmptyImage(3)));
    }

    #[test]
    fn test_output_is_binary_and_same_size() {
        let mut rgb = RgbImage::from_pixel(50, 30, Rgb([230, 220, 210]));
        for x in 5..45 {
            rgb.put_pixel(x, 15, Rgb([40, 40, 90]));
        }
        let page = Page::new(1, DynamicImage::ImageRgb8(rgb));

        for binarization in [Binarization::Otsu, Binarization::Adaptive] {
            let normalizer = ImageNormalizer::with_config(PreprocessingConfig {
                binarization,
                ..Default::default()
            });
            let normalized = normalizer.normalize(&page).unwrap();
            assert_eq!(normalized.dimensions(), (50, 30));
            assert!(normalized.image().pixels().all(|p| p[0] == INK || p[0] == PAPER));
        }
    }

    #[test]
    fn test_thin_stroke_survives() {
        for binarization in [Binarization::Otsu, Binarization::Adaptive] {
            let normalizer = ImageNormalizer::with_config(PreprocessingConfig {
                binarization,
                ..Default::default()
            });
            let normalized = normalizer.normalize(&faint_stroke_page()).unwrap();
            let image = normalized.image();

            assert!((10..50).all(|x| image.get_pixel(x, 20)[0] == INK));
            assert_eq!(image.get_pixel(5, 5)[0], PAPER);
            assert_eq!(image.get_pixel(30, 30)[0], PAPER);
        }
    }

    #[test]
    fn test_isolated_speck_removed() {
        let mut image = GrayImage::from_pixel(20, 20, Luma([PAPER]));
        image.put_pixel(10, 10, Luma([INK]));
        for x in 2..8 {
            image.put_pixel(x, 3, Luma([INK]));
        }

        let cleaned = despeckle(&image);
        assert_eq!(cleaned.get_pixel(10, 10)[0], PAPER);
        assert!((2..8).all(|x| cleaned.get_pixel(x, 3)[0] == INK));
    }

    #[test]
    fn test_blank_page_stays_blank() {
        let page = page_from(GrayImage::from_pixel(16, 16, Luma([250])));
        for binarization in [Binarization::Otsu, Binarization::Adaptive] {
            let normalizer = ImageNormalizer::with_config(PreprocessingConfig {
                binarization,
                ..Default::default()
            });
            let normalized = normalizer.normalize(&page).unwrap();
            assert!(normalized.image().pixels().all(|p| p[0] == PAPER));
        }
    }

    #[test]
    fn test_contrast_stretched_to_full_range() {
        let mut image = GrayImage::from_pixel(4, 1, Luma([100]));
        image.put_pixel(3, 0, Luma([180]));
        stretch_contrast(&mut image);
        assert_eq!(image.get_pixel(0, 0)[0], INK);
        assert_eq!(image.get_pixel(3, 0)[0], PAPER);

        let mut flat = GrayImage::from_pixel(4, 1, Luma([120]));
        stretch_contrast(&mut flat);
        assert!(flat.pixels().all(|p| p[0] == 120));
    }

    #[test]
    fn test_upscale_never_shrinks() {
        let page = faint_stroke_page();

        let up = ImageNormalizer::with_config(PreprocessingConfig {
            upscale: 2.0,
            ..Default::default()
        });
        assert_eq!(up.normalize(&page).unwrap().dimensions(), (120, 80));

        let down = ImageNormalizer::with_config(PreprocessingConfig {
            upscale: 0.5,
            ..Default::default()
        });
        assert_eq!(down.normalize(&page).unwrap().dimensions(), (60, 40));
    }

    #[test]
    fn test_deterministic() {
        let normalizer = ImageNormalizer::new();
        let page = faint_stroke_page();
        let a = normalizer.normalize(&page).unwrap();
        let b = normalizer.normalize(&page).unwrap();
        assert_eq!(a.image().as_raw(), b.image().as_raw());
    }
}
