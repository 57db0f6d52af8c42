//! Upload preparation: downscale and re-encode as WebP.
//!
//! Every image the admin uploads goes through here first. Anything wider
//! than [`MAX_WIDTH`] is scaled down (aspect ratio kept, Lanczos3), and
//! product uploads also get a [`THUMB_WIDTH`] thumbnail for the grid.
//!
//! Decoding and encoding are CPU-bound, so the async entry points run on
//! the blocking pool.

use std::io::Cursor;

use image::{DynamicImage, ImageFormat, imageops::FilterType};
use thiserror::Error;

/// Widest image stored.
pub const MAX_WIDTH: u32 = 1200;

/// Width of product thumbnails.
pub const THUMB_WIDTH: u32 = 400;

/// Content type of every processed image.
pub const WEBP_CONTENT_TYPE: &str = "image/webp";

/// Errors that can occur while processing an upload.
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("arquivo vazio")]
    Empty,
    #[error("formato não suportado ({0})")]
    Decode(#[source] image::ImageError),
    #[error("falha ao gerar WebP ({0})")]
    Encode(#[source] image::ImageError),
    #[error("processamento interrompido")]
    Aborted,
}

/// A re-encoded image ready for upload.
#[derive(Debug, Clone)]
pub struct ProcessedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// A product upload: the full image and its thumbnail.
#[derive(Debug, Clone)]
pub struct ProductImage {
    pub full: ProcessedImage,
    pub thumb: ProcessedImage,
}

fn decode(bytes: &[u8]) -> Result<DynamicImage, ImageError> {
    if bytes.is_empty() {
        return Err(ImageError::Empty);
    }
    image::load_from_memory(bytes).map_err(ImageError::Decode)
}

/// Scale down to `max_width` if wider; never upscales.
fn fit_width(image: &DynamicImage, max_width: u32) -> DynamicImage {
    if image.width() <= max_width {
        image.clone()
    } else {
        image.resize(max_width, u32::MAX, FilterType::Lanczos3)
    }
}

fn encode_webp(image: &DynamicImage) -> Result<ProcessedImage, ImageError> {
    // The WebP encoder takes 8-bit RGB(A) only.
    let rgba = DynamicImage::ImageRgba8(image.to_rgba8());
    let mut bytes = Cursor::new(Vec::new());
    rgba.write_to(&mut bytes, ImageFormat::WebP)
        .map_err(ImageError::Encode)?;

    Ok(ProcessedImage {
        bytes: bytes.into_inner(),
        width: rgba.width(),
        height: rgba.height(),
    })
}

/// Downscale to `max_width` and encode as WebP.
///
/// # Errors
///
/// Returns an error if the bytes are not a supported image.
pub fn optimize(bytes: &[u8], max_width: u32) -> Result<ProcessedImage, ImageError> {
    let image = decode(bytes)?;
    encode_webp(&fit_width(&image, max_width))
}

/// Prepare a product image and its thumbnail from one decode.
///
/// # Errors
///
/// Returns an error if the bytes are not a supported image.
pub fn optimize_product(bytes: &[u8]) -> Result<ProductImage, ImageError> {
    let image = decode(bytes)?;
    let full = fit_width(&image, MAX_WIDTH);
    let thumb = fit_width(&full, THUMB_WIDTH);

    Ok(ProductImage {
        full: encode_webp(&full)?,
        thumb: encode_webp(&thumb)?,
    })
}

/// [`optimize`] on the blocking pool.
///
/// # Errors
///
/// Returns an error if the bytes are not a supported image.
pub async fn optimize_upload(bytes: Vec<u8>, max_width: u32) -> Result<ProcessedImage, ImageError> {
    tokio::task::spawn_blocking(move || optimize(&bytes, max_width))
        .await
        .map_err(|_| ImageError::Aborted)?
}

/// [`optimize_product`] on the blocking pool.
///
/// # Errors
///
/// Returns an error if the bytes are not a supported image.
pub async fn optimize_product_upload(bytes: Vec<u8>) -> Result<ProductImage, ImageError> {
    tokio::task::spawn_blocking(move || optimize_product(&bytes))
        .await
        .map_err(|_| ImageError::Aborted)?
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use image::{Rgb, RgbImage};

    use super::*;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let image = RgbImage::from_pixel(width, height, Rgb([200, 40, 40]));
        let mut bytes = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(image)
            .write_to(&mut bytes, ImageFormat::Png)
            .unwrap();
        bytes.into_inner()
    }

    fn is_webp(bytes: &[u8]) -> bool {
        bytes.len() > 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP"
    }

    #[test]
    fn test_wide_image_is_scaled_down() {
        let processed = optimize(&png(2400, 1200), MAX_WIDTH).unwrap();
        assert_eq!(processed.width, 1200);
        assert_eq!(processed.height, 600);
        assert!(is_webp(&processed.bytes));
    }

    #[test]
    fn test_small_image_keeps_its_size() {
        let processed = optimize(&png(300, 200), MAX_WIDTH).unwrap();
        assert_eq!((processed.width, processed.height), (300, 200));
        assert!(is_webp(&processed.bytes));
    }

    #[test]
    fn test_product_image_has_thumbnail() {
        let product = optimize_product(&png(1600, 800)).unwrap();
        assert_eq!(product.full.width, 1200);
        assert_eq!(product.thumb.width, 400);
        assert_eq!(product.thumb.height, 200);
    }

    #[test]
    fn test_rejects_non_images() {
        assert!(matches!(optimize(b"", MAX_WIDTH), Err(ImageError::Empty)));
        assert!(matches!(
            optimize(b"definitely not an image", MAX_WIDTH),
            Err(ImageError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn test_blocking_pool_wrapper() {
        let processed = optimize_upload(png(50, 50), MAX_WIDTH).await.unwrap();
        assert_eq!(processed.width, 50);
    }
}
