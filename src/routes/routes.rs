//! Defines routes for the media library API.
//!
//! ## Structure
//! - **Asset collection**
//!   - `GET    /assets` -> list (query, folderId, tagId, format, sort, page, pageSize)
//!   - `POST   /assets` -> multipart upload of one file
//!   - `POST   /assets/bulk` -> multipart upload of many files
//!   - `POST   /assets/batch` -> move / tag / delete / convert / download
//!
//! - **Single asset**
//!   - `GET    /assets/{id}` -> asset with duplicate annotation
//!   - `PUT    /assets/{id}` -> replace bytes, keep id
//!   - `PATCH  /assets/{id}` -> filename / folder / tags
//!   - `DELETE /assets/{id}` -> idempotent delete
//!   - `GET    /assets/{id}/original`, `GET /assets/{id}/variants/{kind}` -> bytes
//!   - `POST   /assets/{id}/convert-webformat` -> generate a web variant
//!
//! - **Taxonomy**: `/folders`, `/folders/{id}`, `/tags`, `/tags/{id}`
//! - **Maintenance**: `/healthz`, `/readyz`, `POST /dedup/rebuild`

use crate::{
    handlers::{
        asset_handlers::{
            convert_asset, delete_asset, get_asset, get_original, get_variant, list_assets,
            rebuild_dedup, replace_asset, run_batch, update_asset, upload_asset,
            upload_assets_bulk,
        },
        health_handlers::{healthz, readyz},
        taxonomy_handlers::{
            create_folder, create_tag, delete_folder, delete_tag, list_folders, list_tags,
        },
    },
    services::library::MediaLibrary,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
};

/// Room for multipart framing on top of the file itself.
const MULTIPART_OVERHEAD: u64 = 1024 * 1024;

/// Most full-size files one bulk request may carry.
pub const BULK_MAX_FILES: u64 = 32;

/// Build the router for every library endpoint.
///
/// The request body limit follows `max_upload_bytes` so that an oversize
/// file reaches ingestion and is rejected there as `TooLarge`. Bulk bodies
/// are capped at [`BULK_MAX_FILES`] such files; each part is additionally
/// capped while it is read.
pub fn routes(max_upload_bytes: u64) -> Router<MediaLibrary> {
    let per_file = max_upload_bytes.saturating_add(MULTIPART_OVERHEAD);
    let body_limit = usize::try_from(per_file).unwrap_or(usize::MAX);
    let bulk_limit =
        usize::try_from(per_file.saturating_mul(BULK_MAX_FILES)).unwrap_or(usize::MAX);

    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/dedup/rebuild", post(rebuild_dedup))
        // Asset collection
        .route(
            "/assets",
            get(list_assets)
                .post(upload_asset)
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .route(
            "/assets/bulk",
            post(upload_assets_bulk).layer(DefaultBodyLimit::max(bulk_limit)),
        )
        .route("/assets/batch", post(run_batch))
        // Single asset
        .route(
            "/assets/{id}",
            get(get_asset)
                .put(replace_asset)
                .patch(update_asset)
                .delete(delete_asset)
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/assets/{id}/original", get(get_original))
        .route("/assets/{id}/variants/{kind}", get(get_variant))
        .route("/assets/{id}/convert-webformat", post(convert_asset))
        // Taxonomy
        .route("/folders", get(list_folders).post(create_folder))
        .route("/folders/{id}", delete(delete_folder))
        .route("/tags", get(list_tags).post(create_tag))
        .route("/tags/{id}", delete(delete_tag))
}
