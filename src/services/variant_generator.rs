//! Builds web renditions of stored originals.
//!
//! Variants are keyed by kind per asset, so generating the same kind twice
//! overwrites the earlier rendition instead of adding a second one.

use crate::{
    errors::{LibraryError, LibraryResult},
    imaging::{Convertibility, ImageBackend, convertibility},
    models::asset::{Asset, Variant, VariantKind, WEB_VARIANT_MIME},
    services::{asset_store::AssetStore, with_timeout},
};
use std::{sync::Arc, time::Duration};
use tracing::info;
use uuid::Uuid;

#[derive(Clone)]
pub struct VariantGenerator {
    store: AssetStore,
    backend: Arc<dyn ImageBackend>,
    /// Bound on reading and encoding one original.
    timeout: Duration,
}

impl VariantGenerator {
    pub fn new(store: AssetStore, backend: Arc<dyn ImageBackend>, timeout: Duration) -> Self {
        Self {
            store,
            backend,
            timeout,
        }
    }

    /// Encode `asset_id` as a web variant of `kind`, replacing any existing
    /// variant of the same kind.
    ///
    /// Fails with `UnsupportedFormat` for vector, animated and non-image
    /// sources and with `NoOpConversion` when the original is already WebP.
    /// A replace that lands during the encode wins: the rendition of the old
    /// bytes is dropped and the call fails with `Conflict`.
    pub async fn generate(&self, asset_id: Uuid, kind: VariantKind) -> LibraryResult<Variant> {
        let asset = self.store.get(asset_id).await?;
        ensure_convertible(&asset.mime_type)?;

        let encoded = with_timeout(self.timeout, async {
            let bytes = self.store.read(&asset.storage_key).await?;
            let backend = Arc::clone(&self.backend);
            tokio::task::spawn_blocking(move || backend.encode_web(&bytes, kind.width))
                .await
                .map_err(|err| LibraryError::Processing(format!("encoder task failed: {}", err)))?
                .map_err(LibraryError::from)
        })
        .await?;

        let variant = self
            .store
            .put_variant(
                asset_id,
                &asset.checksum,
                kind,
                encoded.bytes,
                (encoded.width, encoded.height),
            )
            .await?;
        info!(
            asset_id = %asset_id,
            kind = %variant.kind,
            size_bytes = variant.size_bytes,
            "variant generated"
        );
        Ok(variant)
    }
}

/// Check a source MIME type against the conversion rules.
pub fn ensure_convertible(mime: &str) -> LibraryResult<()> {
    match convertibility(mime) {
        Convertibility::Convertible => Ok(()),
        Convertibility::AlreadyTarget => Err(LibraryError::NoOpConversion {
            mime: mime.to_string(),
        }),
        Convertibility::Unsupported => Err(LibraryError::UnsupportedFormat {
            mime: mime.to_string(),
        }),
    }
}

/// The variant a preview should use: the smallest web variant, if any.
///
/// Ties on size go to the narrower width, then to the kind name, so the
/// choice only depends on the variant list.
pub fn preferred_preview(asset: &Asset) -> Option<&Variant> {
    asset
        .variants
        .iter()
        .filter(|v| v.mime_type == WEB_VARIANT_MIME)
        .filter_map(|v| v.web_kind().map(|kind| (v, kind)))
        .min_by(|(a, a_kind), (b, b_kind)| {
            a.size_bytes
                .cmp(&b.size_bytes)
                .then(a_kind.width.cmp(&b_kind.width))
                .then_with(|| a.kind.cmp(&b.kind))
        })
        .map(|(v, _)| v)
}

/// URL to show as an asset's preview, falling back to the original.
pub fn preview_url(asset: &Asset) -> String {
    preferred_preview(asset)
        .map(Variant::url)
        .unwrap_or_else(|| asset.original_url())
}
