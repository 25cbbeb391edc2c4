//! Folders and tags: organisational entities that assets reference by id.

use super::asset::{FolderId, TagId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A folder groups assets; an asset sits in at most one folder.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    pub id: FolderId,

    /// Not required to be unique.
    pub name: String,

    pub created_at: DateTime<Utc>,

    /// Assets currently referencing this folder.
    pub asset_count: i64,
}

/// A tag, many-to-many with assets.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: TagId,

    pub name: String,

    pub created_at: DateTime<Utc>,

    pub asset_count: i64,
}
