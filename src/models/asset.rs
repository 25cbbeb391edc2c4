//! Represents an uploaded original and its derived renditions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use std::{fmt, str::FromStr};
use uuid::Uuid;

pub type FolderId = i64;
pub type TagId = i64;

/// MIME type of every generated web variant.
pub const WEB_VARIANT_MIME: &str = "image/webp";

/// A single uploaded original tracked by the library.
///
/// `checksum`, `mime_type`, `size_bytes` and the dimensions are fixed at
/// ingestion; only a replace ingestion recomputes them. Folder and tag ids are
/// plain lookups, never ownership.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub id: Uuid,

    /// Lowercase hex SHA-256 of the original bytes.
    pub checksum: String,

    /// Display name, editable.
    pub filename: String,

    pub mime_type: String,

    pub size_bytes: i64,

    pub width: Option<u32>,

    pub height: Option<u32>,

    pub folder_id: Option<FolderId>,

    /// Path of the original relative to the storage root.
    #[serde(skip)]
    pub storage_key: String,

    /// Ascending, without duplicates.
    pub tag_ids: Vec<TagId>,

    pub variants: Vec<Variant>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Asset {
    /// URL the original bytes are served from.
    pub fn original_url(&self) -> String {
        format!("/assets/{}/original", self.id)
    }

    pub fn family(&self) -> &str {
        mime_family(&self.mime_type)
    }
}

/// The `assets` table row; tags and variants live in their own tables.
#[derive(Clone, FromRow, Debug)]
pub(crate) struct AssetRow {
    pub id: Uuid,
    pub checksum: String,
    pub filename: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub folder_id: Option<FolderId>,
    pub storage_key: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AssetRow {
    pub(crate) fn into_asset(self, tag_ids: Vec<TagId>, variants: Vec<Variant>) -> Asset {
        Asset {
            id: self.id,
            checksum: self.checksum,
            filename: self.filename,
            mime_type: self.mime_type,
            size_bytes: self.size_bytes,
            width: self.width,
            height: self.height,
            folder_id: self.folder_id,
            storage_key: self.storage_key,
            tag_ids,
            variants,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// A derived rendition of an asset. Rebuilt wholesale, never patched.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    pub asset_id: Uuid,

    /// Purpose and size class, e.g. `web-640`. Unique per asset.
    pub kind: String,

    pub mime_type: String,

    /// Path relative to the storage root.
    #[serde(skip)]
    pub storage_key: String,

    pub size_bytes: i64,

    pub width: Option<u32>,

    pub height: Option<u32>,

    pub created_at: DateTime<Utc>,
}

impl Variant {
    pub fn url(&self) -> String {
        format!("/assets/{}/variants/{}", self.asset_id, self.kind)
    }

    /// Width class of a web variant, `None` for any other kind.
    pub fn web_kind(&self) -> Option<VariantKind> {
        self.kind.parse().ok()
    }
}

/// Identifies a compressed web rendition at a target width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VariantKind {
    pub width: u32,
}

impl VariantKind {
    const PREFIX: &'static str = "web-";

    pub fn web(width: u32) -> Self {
        Self { width }
    }
}

impl fmt::Display for VariantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", Self::PREFIX, self.width)
    }
}

impl FromStr for VariantKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let width = s
            .strip_prefix(Self::PREFIX)
            .and_then(|w| w.parse::<u32>().ok())
            .filter(|w| *w > 0)
            .ok_or_else(|| format!("unknown variant kind `{}`", s))?;
        Ok(Self { width })
    }
}

/// Facts derived from an original's bytes during ingestion.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetContent {
    pub checksum: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Everything the store needs to create an asset record.
#[derive(Debug, Clone)]
pub struct NewAsset {
    pub filename: String,
    pub content: AssetContent,
}

/// Partial metadata update. Absent fields are untouched; `folderId: null`
/// clears the folder.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetPatch {
    pub filename: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub folder_id: Option<Option<FolderId>>,
    pub tag_ids: Option<Vec<TagId>>,
}

impl AssetPatch {
    pub fn is_empty(&self) -> bool {
        self.filename.is_none() && self.folder_id.is_none() && self.tag_ids.is_none()
    }
}

/// Distinguishes `"field": null` from a missing field.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Asset annotated for list and detail views.
#[derive(Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AssetSummary {
    #[serde(flatten)]
    pub asset: Asset,

    /// Other assets sharing this checksum; absent when the index is unavailable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duplicate_count: Option<usize>,

    pub preview_url: String,
}

/// Top-level MIME family (`image`, `video`, ...), lowercase.
pub fn mime_family(mime: &str) -> &str {
    mime.split('/').next().unwrap_or(mime)
}

/// Lower-case and strip parameters: `Image/JPEG; q=1` becomes `image/jpeg`.
pub fn normalize_mime(raw: &str) -> String {
    raw.split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}
