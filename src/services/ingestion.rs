//! Ingestion pipeline: validate → store original → checksum → dedup index.
//!
//! Validation (allowed MIME prefix, then size ceiling) happens before any
//! byte reaches disk. Dimension probing is best effort: a file whose header
//! cannot be read is still ingested, just without `width`/`height`.

use crate::{
    config::LibraryConfig,
    errors::{LibraryError, LibraryResult},
    imaging::{ImageBackend, sniff_mime},
    models::{
        asset::{Asset, AssetContent, NewAsset, mime_family, normalize_mime},
        upload::{Upload, UploadOutcome},
    },
    services::{asset_store::AssetStore, with_timeout},
};
use bytes::Bytes;
use futures::{StreamExt, stream};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

const FALLBACK_MIME: &str = "application/octet-stream";
const FALLBACK_FILENAME: &str = "untitled";

#[derive(Clone)]
pub struct IngestionPipeline {
    store: AssetStore,
    backend: Arc<dyn ImageBackend>,
    config: Arc<LibraryConfig>,
}

impl IngestionPipeline {
    pub fn new(
        store: AssetStore,
        backend: Arc<dyn ImageBackend>,
        config: Arc<LibraryConfig>,
    ) -> Self {
        Self {
            store,
            backend,
            config,
        }
    }

    /// Check type and size, returning the effective MIME type.
    ///
    /// The sniffed raster format wins over the declared type; otherwise the
    /// declared type (normalised) is used.
    pub fn validate(&self, bytes: &[u8], declared_mime: Option<&str>) -> LibraryResult<String> {
        let declared = declared_mime
            .map(normalize_mime)
            .filter(|mime| !mime.is_empty());
        let mime = sniff_mime(bytes)
            .map(str::to_string)
            .or(declared)
            .unwrap_or_else(|| FALLBACK_MIME.to_string());

        if !self.config.allows_mime(&mime) {
            return Err(LibraryError::InvalidFormat { mime });
        }
        let size = bytes.len() as u64;
        if size > self.config.max_upload_bytes {
            return Err(LibraryError::TooLarge {
                size,
                limit: self.config.max_upload_bytes,
            });
        }
        Ok(mime)
    }

    /// Ingest one file as a new asset.
    pub async fn ingest(
        &self,
        bytes: Bytes,
        filename: &str,
        declared_mime: Option<&str>,
    ) -> LibraryResult<Asset> {
        let mime = self.validate(&bytes, declared_mime)?;
        let filename = clean_filename(filename);
        let content = self.describe(bytes.clone(), mime).await?;
        let asset = self
            .store
            .create(NewAsset { filename, content }, bytes)
            .await?;
        info!(
            asset_id = %asset.id,
            filename = %asset.filename,
            mime = %asset.mime_type,
            size_bytes = asset.size_bytes,
            "asset ingested"
        );
        Ok(asset)
    }

    /// Replace the bytes behind an existing asset, keeping its id.
    pub async fn replace(
        &self,
        asset_id: Uuid,
        bytes: Bytes,
        declared_mime: Option<&str>,
    ) -> LibraryResult<Asset> {
        let mime = self.validate(&bytes, declared_mime)?;
        let content = self.describe(bytes.clone(), mime).await?;
        self.store.replace_content(asset_id, content, bytes).await
    }

    /// Ingest several files independently, in parallel up to the configured
    /// concurrency. Outcomes follow the input order.
    pub async fn ingest_many(&self, uploads: Vec<Upload>) -> Vec<UploadOutcome> {
        let total = uploads.len();
        let outcomes: Vec<UploadOutcome> = stream::iter(uploads)
            .map(|upload| async move {
                let result = self
                    .ingest(
                        upload.bytes.clone(),
                        &upload.filename,
                        upload.declared_mime.as_deref(),
                    )
                    .await;
                if let Err(err) = &result {
                    debug!(filename = %upload.filename, "upload rejected: {}", err);
                }
                UploadOutcome::from_result(clean_filename(&upload.filename), result)
            })
            .buffered(self.config.batch_concurrency.max(1))
            .collect()
            .await;

        let failed = outcomes.iter().filter(|o| o.failure().is_some()).count();
        info!(total, failed, "multi-file upload finished");
        outcomes
    }

    /// Checksum and (for images) natural dimensions, off the async runtime.
    ///
    /// This is the only step bounded by the item timeout: nothing has been
    /// written yet, so giving up here leaves no trace.
    async fn describe(&self, bytes: Bytes, mime: String) -> LibraryResult<AssetContent> {
        let backend = Arc::clone(&self.backend);
        let described = tokio::task::spawn_blocking(move || {
            let checksum = format!("{:x}", Sha256::digest(&bytes));
            let dimensions = if mime_family(&mime) == "image" {
                match backend.identify(&bytes) {
                    Ok(dims) => Some(dims),
                    Err(err) => {
                        warn!(mime = %mime, "could not read image dimensions: {}", err);
                        None
                    }
                }
            } else {
                None
            };
            AssetContent {
                checksum,
                size_bytes: bytes.len() as i64,
                width: dimensions.map(|d| d.width),
                height: dimensions.map(|d| d.height),
                mime_type: mime,
            }
        });
        with_timeout(self.config.item_timeout, async {
            described
                .await
                .map_err(|err| LibraryError::Processing(format!("ingestion task failed: {}", err)))
        })
        .await
    }
}

/// Last path component, trimmed; browsers may send `C:\fakepath\x.jpg`.
fn clean_filename(raw: &str) -> String {
    let name = raw
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    if name.is_empty() {
        FALLBACK_FILENAME.to_string()
    } else {
        name.to_string()
    }
}
