//! Image processing backend trait and shared types.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend). Tests elsewhere may
//! substitute their own backend through the same trait.

use crate::errors::LibraryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("failed to decode image: {0}")]
    Decode(String),
    #[error("failed to encode image: {0}")]
    Encode(String),
}

impl From<BackendError> for LibraryError {
    fn from(err: BackendError) -> Self {
        LibraryError::Processing(err.to_string())
    }
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Output of a web encode.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Operations the library needs from an image codec.
///
/// Both calls are CPU bound and synchronous; async callers run them on the
/// blocking pool.
pub trait ImageBackend: Send + Sync {
    /// Natural dimensions, reading as little of the payload as possible.
    fn identify(&self, bytes: &[u8]) -> Result<Dimensions, BackendError>;

    /// Decode, downscale to at most `target_width` and encode as WebP.
    fn encode_web(&self, bytes: &[u8], target_width: u32) -> Result<EncodedImage, BackendError>;
}
