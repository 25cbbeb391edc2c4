//! Incoming files and per-file ingestion outcomes.

use super::asset::Asset;
use crate::errors::{ErrorKind, LibraryError};
use bytes::Bytes;
use serde::Serialize;

/// One file handed to ingestion.
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    /// Content type claimed by the client, if any.
    pub declared_mime: Option<String>,
    pub bytes: Bytes,
}

impl Upload {
    pub fn new(filename: impl Into<String>, declared_mime: Option<&str>, bytes: impl Into<Bytes>) -> Self {
        Self {
            filename: filename.into(),
            declared_mime: declared_mime.map(str::to_string),
            bytes: bytes.into(),
        }
    }
}

/// Result for one file of a multi-file upload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase", tag = "status")]
pub enum UploadOutcome {
    #[serde(rename_all = "camelCase")]
    Ingested { filename: String, asset: Asset },
    #[serde(rename_all = "camelCase")]
    Failed {
        filename: String,
        reason: ErrorKind,
        message: String,
    },
}

impl UploadOutcome {
    pub fn from_result(filename: String, result: Result<Asset, LibraryError>) -> Self {
        match result {
            Ok(asset) => Self::Ingested { filename, asset },
            Err(err) => Self::Failed {
                filename,
                reason: err.kind(),
                message: err.to_string(),
            },
        }
    }

    pub fn asset(&self) -> Option<&Asset> {
        match self {
            Self::Ingested { asset, .. } => Some(asset),
            Self::Failed { .. } => None,
        }
    }

    pub fn failure(&self) -> Option<ErrorKind> {
        match self {
            Self::Ingested { .. } => None,
            Self::Failed { reason, .. } => Some(*reason),
        }
    }
}
