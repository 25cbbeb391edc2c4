//! Paginated, filtered asset listings.
//!
//! Two layers: the store applies search, folder and tag in SQL and owns the
//! authoritative `total`; the `format` facet (MIME family) then narrows the
//! fetched page in memory. Each item is annotated with its duplicate count
//! and preview URL.

use crate::{
    config::LibraryConfig,
    errors::LibraryResult,
    models::{
        asset::{Asset, AssetSummary},
        query::{AssetFilter, Page, Pagination, SortOrder},
    },
    services::{asset_store::AssetStore, variant_generator::preview_url},
};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

#[derive(Clone)]
pub struct QueryEngine {
    store: AssetStore,
    config: Arc<LibraryConfig>,
}

impl QueryEngine {
    pub fn new(store: AssetStore, config: Arc<LibraryConfig>) -> Self {
        Self { store, config }
    }

    pub async fn list(
        &self,
        filter: &AssetFilter,
        sort: SortOrder,
        page: Option<u32>,
        page_size: Option<u32>,
    ) -> LibraryResult<Page<AssetSummary>> {
        let page = page.unwrap_or(1).max(1);
        let page_size = self.config.page_size(page_size);
        let (assets, total) = self.store.list(filter, sort, page, page_size).await?;

        self.ensure_dedup_index().await;
        let format = filter
            .format
            .as_deref()
            .map(|f| f.trim().to_ascii_lowercase())
            .filter(|f| !f.is_empty() && f != "all");
        let items = assets
            .into_iter()
            .filter(|asset| format.as_deref().is_none_or(|f| matches_format(asset, f)))
            .map(|asset| self.summarize(asset))
            .collect();

        Ok(Page {
            items,
            pagination: Pagination::new(page, page_size, total),
        })
    }

    /// A single asset with its annotations.
    pub async fn get(&self, id: Uuid) -> LibraryResult<AssetSummary> {
        let asset = self.store.get(id).await?;
        self.ensure_dedup_index().await;
        Ok(self.summarize(asset))
    }

    pub fn summarize(&self, asset: Asset) -> AssetSummary {
        let duplicate_count = self.store.dedup().duplicate_count(asset.id, &asset.checksum);
        let preview_url = preview_url(&asset);
        AssetSummary {
            asset,
            duplicate_count,
            preview_url,
        }
    }

    /// Lazily rebuild the dedup index if it is unknown. Failure only means
    /// annotations stay absent for this response.
    async fn ensure_dedup_index(&self) {
        if self.store.dedup().is_available() {
            return;
        }
        if let Err(err) = self.store.rebuild_dedup_index().await {
            warn!("dedup index unavailable, omitting duplicate counts: {}", err);
        }
    }
}

/// `image` matches the family, `image/png` matches exactly.
fn matches_format(asset: &Asset, format: &str) -> bool {
    let format = format.trim_end_matches("/*").trim_end_matches('/');
    if format.contains('/') {
        asset.mime_type == format
    } else {
        asset.family() == format
    }
}
