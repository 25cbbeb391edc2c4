//! Batch operations over a selection of assets.
//!
//! Items run on a bounded worker pool. The per-item timeout bounds each
//! item's slow step (encoding, reading bytes) rather than the whole item, so
//! a timed-out item never leaves a half-applied write behind. One item's
//! failure never stops the rest; the call itself only fails when the store
//! is unreachable or the operation's parameters are invalid.

use crate::{
    config::LibraryConfig,
    errors::{LibraryError, LibraryResult},
    models::{
        asset::{AssetPatch, VariantKind},
        batch::{BatchFailure, BatchOp, BatchResult, DownloadItem},
    },
    services::{asset_store::AssetStore, variant_generator::VariantGenerator, with_timeout},
};
use base64::{Engine as _, engine::general_purpose};
use futures::{StreamExt, stream};
use std::{collections::HashSet, sync::Arc};
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Clone)]
pub struct BatchExecutor {
    store: AssetStore,
    generator: VariantGenerator,
    config: Arc<LibraryConfig>,
}

enum ItemOutput {
    Done,
    Download(DownloadItem),
}

impl BatchExecutor {
    pub fn new(store: AssetStore, generator: VariantGenerator, config: Arc<LibraryConfig>) -> Self {
        Self {
            store,
            generator,
            config,
        }
    }

    /// Apply `op` to every id. Repeated ids are processed once, at their
    /// first position; result lists follow that order.
    pub async fn execute(&self, op: &BatchOp, asset_ids: &[Uuid]) -> LibraryResult<BatchResult> {
        let op = self.prepare(op).await?;

        let mut seen = HashSet::new();
        let ids: Vec<Uuid> = asset_ids
            .iter()
            .copied()
            .filter(|id| seen.insert(*id))
            .collect();

        let outcomes: Vec<(Uuid, LibraryResult<ItemOutput>)> = stream::iter(ids)
            .map(|id| {
                let op = &op;
                async move { (id, self.run_item(op, id).await) }
            })
            .buffered(self.config.batch_concurrency.max(1))
            .collect()
            .await;

        let mut result = BatchResult::default();
        for (id, outcome) in outcomes {
            match outcome {
                Ok(ItemOutput::Done) => result.succeeded.push(id),
                Ok(ItemOutput::Download(item)) => {
                    result.succeeded.push(id);
                    result.downloads.push(item);
                }
                Err(err) => {
                    debug!(asset_id = %id, op = op.name(), "batch item failed: {}", err);
                    result.failed.push(BatchFailure::from_error(id, &err));
                }
            }
        }

        info!(
            op = op.name(),
            succeeded = result.succeeded.len(),
            failed = result.failed.len(),
            "batch finished"
        );
        Ok(result)
    }

    /// Systemic checks, done once before any item runs.
    async fn prepare(&self, op: &BatchOp) -> LibraryResult<BatchOp> {
        sqlx::query("SELECT 1").execute(&*self.store.db).await?;
        match op {
            BatchOp::Move {
                folder_id: Some(folder_id),
            } => {
                self.store.ensure_folder_exists(*folder_id).await?;
                Ok(op.clone())
            }
            BatchOp::Tag { tag_ids } => Ok(BatchOp::Tag {
                tag_ids: self.store.ensure_tags_exist(tag_ids).await?,
            }),
            BatchOp::ConvertToWebFormat { width: Some(0) } => Err(LibraryError::InvalidInput(
                "conversion width must be at least 1".into(),
            )),
            _ => Ok(op.clone()),
        }
    }

    async fn run_item(&self, op: &BatchOp, id: Uuid) -> LibraryResult<ItemOutput> {
        match op {
            BatchOp::Move { folder_id } => {
                let patch = AssetPatch {
                    folder_id: Some(*folder_id),
                    ..AssetPatch::default()
                };
                self.store.apply_patch(id, patch).await?;
                Ok(ItemOutput::Done)
            }
            BatchOp::Tag { tag_ids } => {
                let patch = AssetPatch {
                    tag_ids: Some(tag_ids.clone()),
                    ..AssetPatch::default()
                };
                self.store.apply_patch(id, patch).await?;
                Ok(ItemOutput::Done)
            }
            BatchOp::Delete => {
                if self.store.delete(id).await? {
                    Ok(ItemOutput::Done)
                } else {
                    Err(LibraryError::asset_not_found(id))
                }
            }
            BatchOp::ConvertToWebFormat { width } => {
                let kind = VariantKind::web(width.unwrap_or(self.config.web_variant_width));
                self.generator.generate(id, kind).await?;
                Ok(ItemOutput::Done)
            }
            BatchOp::Download { inline } => {
                let asset = self.store.get(id).await?;
                let data = if *inline {
                    let read = self.store.read(&asset.storage_key);
                    let bytes = with_timeout(self.config.item_timeout, read).await?;
                    Some(general_purpose::STANDARD.encode(bytes))
                } else {
                    None
                };
                Ok(ItemOutput::Download(DownloadItem {
                    url: asset.original_url(),
                    id: asset.id,
                    filename: asset.filename,
                    mime_type: asset.mime_type,
                    size_bytes: asset.size_bytes,
                    data,
                }))
            }
        }
    }
}
