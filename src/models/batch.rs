//! Batch operation requests and per-item outcomes.

use super::asset::{FolderId, TagId};
use crate::errors::{ErrorKind, LibraryError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An action applied to every asset in a selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOp {
    /// Set (or with `None` clear) the folder.
    Move { folder_id: Option<FolderId> },
    /// Replace the full tag set.
    Tag { tag_ids: Vec<TagId> },
    Delete,
    /// Build a web variant; `None` uses the configured width.
    ConvertToWebFormat { width: Option<u32> },
    /// Enumerate retrieval URLs, optionally with base64 bytes.
    Download { inline: bool },
}

impl BatchOp {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Move { .. } => "move",
            Self::Tag { .. } => "tag",
            Self::Delete => "delete",
            Self::ConvertToWebFormat { .. } => "convertToWebFormat",
            Self::Download { .. } => "download",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BatchOpName {
    Move,
    Tag,
    Delete,
    #[serde(alias = "convert")]
    ConvertToWebFormat,
    Download,
}

/// Wire shape of `POST /assets/batch`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRequest {
    pub op: BatchOpName,
    pub asset_ids: Vec<Uuid>,
    #[serde(default)]
    pub params: BatchParams,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchParams {
    pub folder_id: Option<FolderId>,
    pub tag_ids: Option<Vec<TagId>>,
    pub width: Option<u32>,
    #[serde(default)]
    pub inline: bool,
}

impl BatchRequest {
    /// Validate the op-specific params and produce the typed operation.
    pub fn into_op(self) -> Result<(BatchOp, Vec<Uuid>), LibraryError> {
        let op = match self.op {
            BatchOpName::Move => BatchOp::Move {
                folder_id: self.params.folder_id,
            },
            BatchOpName::Tag => BatchOp::Tag {
                tag_ids: self.params.tag_ids.ok_or_else(|| {
                    LibraryError::InvalidInput("tag batch requires `params.tagIds`".into())
                })?,
            },
            BatchOpName::Delete => BatchOp::Delete,
            BatchOpName::ConvertToWebFormat => BatchOp::ConvertToWebFormat {
                width: self.params.width,
            },
            BatchOpName::Download => BatchOp::Download {
                inline: self.params.inline,
            },
        };
        Ok((op, self.asset_ids))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchFailure {
    pub id: Uuid,
    pub reason: ErrorKind,
    pub message: String,
}

impl BatchFailure {
    pub fn from_error(id: Uuid, err: &LibraryError) -> Self {
        Self {
            id,
            reason: err.kind(),
            message: err.to_string(),
        }
    }
}

/// A retrieval handle returned by the download operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadItem {
    pub id: Uuid,
    pub filename: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub url: String,
    /// Base64 of the original bytes when inline delivery was requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

/// Outcome of a batch. Both lists follow the order of the requested ids.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    pub succeeded: Vec<Uuid>,
    pub failed: Vec<BatchFailure>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub downloads: Vec<DownloadItem>,
}
