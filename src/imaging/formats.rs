//! MIME classification for ingestion and conversion.

use crate::models::asset::WEB_VARIANT_MIME;
use image::ImageFormat;

/// Raster sources the WebP encoder accepts.
const CONVERTIBLE: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/pjpeg",
    "image/png",
    "image/tiff",
    "image/bmp",
    "image/x-ms-bmp",
];

/// Whether an asset can get a web variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Convertibility {
    Convertible,
    /// Already stored in the web format.
    AlreadyTarget,
    /// Vector, animated, or non-image sources.
    Unsupported,
}

pub fn convertibility(mime: &str) -> Convertibility {
    if mime == WEB_VARIANT_MIME {
        Convertibility::AlreadyTarget
    } else if CONVERTIBLE.contains(&mime) {
        Convertibility::Convertible
    } else {
        Convertibility::Unsupported
    }
}

/// MIME type of a recognised raster payload, from its magic bytes.
pub fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
    let format = image::guess_format(bytes).ok()?;
    match format {
        ImageFormat::Jpeg
        | ImageFormat::Png
        | ImageFormat::Gif
        | ImageFormat::WebP
        | ImageFormat::Tiff
        | ImageFormat::Bmp => Some(format.to_mime_type()),
        _ => None,
    }
}
