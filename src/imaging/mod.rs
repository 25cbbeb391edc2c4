//! Image inspection and web-variant encoding.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Sniff** | `image::guess_format` |
//! | **Identify** | `ImageReader::into_dimensions` (header only) |
//! | **Encode → WebP** | Lanczos3 downscale + `image` WebP encoder |
//!
//! The module is split into:
//! - **Calculations**: pure dimension math
//! - **Formats**: which MIME types may be converted
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]

pub mod backend;
mod calculations;
pub mod formats;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, EncodedImage, ImageBackend};
pub use calculations::fit_to_width;
pub use formats::{Convertibility, convertibility, sniff_mime};
pub use rust_backend::RustBackend;
