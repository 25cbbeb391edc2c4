//! Pure Rust backend using the `image` crate.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, BMP, WebP) | `image::load_from_memory` |
//! | Resize | `DynamicImage::resize_exact` with `Lanczos3` |
//! | Encode → WebP | `image` WebP encoder (lossless, RGBA8) |

use super::backend::{BackendError, Dimensions, EncodedImage, ImageBackend};
use super::calculations::fit_to_width;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::io::Cursor;

#[derive(Debug, Default, Clone, Copy)]
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl ImageBackend for RustBackend {
    fn identify(&self, bytes: &[u8]) -> Result<Dimensions, BackendError> {
        let (width, height) = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| BackendError::Decode(e.to_string()))?
            .into_dimensions()
            .map_err(|e| BackendError::Decode(e.to_string()))?;
        Ok(Dimensions { width, height })
    }

    fn encode_web(&self, bytes: &[u8], target_width: u32) -> Result<EncodedImage, BackendError> {
        let img =
            image::load_from_memory(bytes).map_err(|e| BackendError::Decode(e.to_string()))?;
        let (width, height) = fit_to_width((img.width(), img.height()), target_width);
        let resized = if (width, height) == (img.width(), img.height()) {
            img
        } else {
            img.resize_exact(width, height, FilterType::Lanczos3)
        };

        // The WebP encoder only takes 8-bit L/LA/RGB/RGBA buffers.
        let rgba = DynamicImage::ImageRgba8(resized.to_rgba8());
        let mut out = Cursor::new(Vec::new());
        rgba.write_to(&mut out, ImageFormat::WebP)
            .map_err(|e| BackendError::Encode(e.to_string()))?;

        Ok(EncodedImage {
            bytes: out.into_inner(),
            width,
            height,
        })
    }
}
