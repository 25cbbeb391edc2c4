//! Filter, sort and pagination shapes for asset listings.

use super::asset::{FolderId, TagId};
use serde::{Deserialize, Serialize};

/// Persisted-layer filters plus the in-memory `format` facet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssetFilter {
    /// Case-insensitive substring of the filename.
    pub search: Option<String>,
    pub folder_id: Option<FolderId>,
    pub tag_id: Option<TagId>,
    /// MIME family such as `image` or `video`.
    pub format: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Newest,
    Oldest,
}

/// One page of results.
///
/// `total` and `total_pages` come from the persisted filter (search, folder,
/// tag). The `format` facet only narrows `items` on the fetched page.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
    pub total: u64,
    pub total_pages: u64,
}

impl Pagination {
    pub fn new(page: u32, page_size: u32, total: u64) -> Self {
        let total_pages = total.div_ceil(u64::from(page_size.max(1)));
        Self {
            page,
            page_size,
            total,
            total_pages,
        }
    }

    /// Row offset for a 1-based page.
    pub fn offset(page: u32, page_size: u32) -> u64 {
        u64::from(page.max(1) - 1) * u64::from(page_size)
    }
}
