//! HTTP handlers for assets, variants and batches.
//! Uploads arrive as multipart; stored bytes are streamed back without
//! buffering. Every library concern is delegated to `MediaLibrary`.

use crate::{
    errors::AppError,
    models::{
        asset::{Asset, AssetPatch},
        batch::BatchRequest,
        query::{AssetFilter, SortOrder},
        upload::Upload,
    },
    services::library::MediaLibrary,
};
use axum::{
    Json,
    body::Body,
    extract::{
        Multipart, Path, Query, State,
        multipart::{Field, MultipartError},
    },
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use bytes::{Bytes, BytesMut};
use serde::Deserialize;
use serde_json::json;
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use uuid::Uuid;

/// Multipart part carrying file bytes.
const FILE_FIELD: &str = "file";
/// Optional text part overriding the part's own filename.
const FILENAME_FIELD: &str = "filename";

/// Query params accepted by `GET /assets`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListAssetsQuery {
    pub query: Option<String>,
    /// Alias of `query`.
    pub search: Option<String>,
    pub folder_id: Option<i64>,
    pub tag_id: Option<i64>,
    pub format: Option<String>,
    pub sort: Option<SortOrder>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ConvertQuery {
    pub width: Option<u32>,
}

/// POST `/assets`: ingest one multipart file.
pub async fn upload_asset(
    State(library): State<MediaLibrary>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let upload = read_uploads(multipart, library.config().max_upload_bytes)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| AppError::bad_request("multipart body has no `file` part"))?;

    let asset = library.upload(upload).await?;
    Ok((StatusCode::CREATED, Json(asset)))
}

/// POST `/assets/bulk`: ingest every `file` part, one outcome per part.
pub async fn upload_assets_bulk(
    State(library): State<MediaLibrary>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let uploads = read_uploads(multipart, library.config().max_upload_bytes).await?;
    if uploads.is_empty() {
        return Err(AppError::bad_request("multipart body has no `file` part"));
    }
    Ok(Json(library.upload_many(uploads).await))
}

/// PUT `/assets/{id}`: replace the bytes, keeping the id.
pub async fn replace_asset(
    State(library): State<MediaLibrary>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Json<Asset>, AppError> {
    let upload = read_uploads(multipart, library.config().max_upload_bytes)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| AppError::bad_request("multipart body has no `file` part"))?;

    let asset = library
        .replace(id, upload.bytes, upload.declared_mime.as_deref())
        .await?;
    Ok(Json(asset))
}

/// PATCH `/assets/{id}`: filename, folder and tag edits.
pub async fn update_asset(
    State(library): State<MediaLibrary>,
    Path(id): Path<Uuid>,
    Json(patch): Json<AssetPatch>,
) -> Result<Json<Asset>, AppError> {
    Ok(Json(library.update(id, patch).await?))
}

/// DELETE `/assets/{id}`: always 204, missing ids included.
pub async fn delete_asset(
    State(library): State<MediaLibrary>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    library.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET `/assets`
pub async fn list_assets(
    State(library): State<MediaLibrary>,
    Query(q): Query<ListAssetsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let filter = AssetFilter {
        search: q.query.or(q.search),
        folder_id: q.folder_id,
        tag_id: q.tag_id,
        format: q.format,
    };
    let page = library
        .list(&filter, q.sort.unwrap_or_default(), q.page, q.page_size)
        .await?;
    Ok(Json(page))
}

/// GET `/assets/{id}`: the asset with its duplicate annotation.
pub async fn get_asset(
    State(library): State<MediaLibrary>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(library.get(id).await?))
}

/// GET `/assets/{id}/original` as a streaming response.
pub async fn get_original(
    State(library): State<MediaLibrary>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let (asset, file) = library.open_original(id).await?;
    let mut response = stream_file(file);
    set_content_headers(
        response.headers_mut(),
        &asset.mime_type,
        asset.size_bytes,
        Some(&asset.checksum),
    );
    Ok(response)
}

/// GET `/assets/{id}/variants/{kind}` as a streaming response.
pub async fn get_variant(
    State(library): State<MediaLibrary>,
    Path((id, kind)): Path<(Uuid, String)>,
) -> Result<Response, AppError> {
    let (variant, file) = library.open_variant(id, &kind).await?;
    let mut response = stream_file(file);
    set_content_headers(
        response.headers_mut(),
        &variant.mime_type,
        variant.size_bytes,
        None,
    );
    Ok(response)
}

/// POST `/assets/{id}/convert-webformat?width=`
pub async fn convert_asset(
    State(library): State<MediaLibrary>,
    Path(id): Path<Uuid>,
    Query(q): Query<ConvertQuery>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(library.convert(id, q.width).await?))
}

/// POST `/assets/batch`
pub async fn run_batch(
    State(library): State<MediaLibrary>,
    Json(request): Json<BatchRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (op, asset_ids) = request.into_op()?;
    Ok(Json(library.run_batch(&op, &asset_ids).await?))
}

/// POST `/dedup/rebuild`
pub async fn rebuild_dedup(
    State(library): State<MediaLibrary>,
) -> Result<impl IntoResponse, AppError> {
    let checksums = library.rebuild_dedup_index().await?;
    Ok(Json(json!({ "checksums": checksums })))
}

/// Collect `file` parts in request order, holding at most
/// `max_file_bytes + 1` bytes of each.
async fn read_uploads(mut multipart: Multipart, max_file_bytes: u64) -> Result<Vec<Upload>, AppError> {
    let mut uploads = Vec::new();
    let mut filename_override = None;

    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some(FILE_FIELD) => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = read_capped(&mut field, max_file_bytes).await?;
                uploads.push(Upload::new(filename, content_type.as_deref(), bytes));
            }
            Some(FILENAME_FIELD) => {
                filename_override = Some(field.text().await.map_err(multipart_error)?);
            }
            _ => {}
        }
    }

    // A lone file may be renamed by the form; bulk uploads keep part names.
    if let (Some(name), [upload]) = (filename_override, uploads.as_mut_slice()) {
        if !name.trim().is_empty() {
            upload.filename = name;
        }
    }
    Ok(uploads)
}

/// Read a part chunk by chunk, keeping one byte past `limit` and draining
/// the rest. Ingestion then still checks the type first and rejects the
/// size, without an oversize part ever being buffered whole.
async fn read_capped(field: &mut Field<'_>, limit: u64) -> Result<Bytes, AppError> {
    let cap = usize::try_from(limit.saturating_add(1)).unwrap_or(usize::MAX);
    let mut buf = BytesMut::new();
    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        let room = cap.saturating_sub(buf.len());
        buf.extend_from_slice(&chunk[..chunk.len().min(room)]);
    }
    Ok(buf.freeze())
}

fn multipart_error(err: MultipartError) -> AppError {
    AppError::new(err.status(), err.body_text())
}

fn stream_file(file: File) -> Response {
    let mut response = Response::new(Body::from_stream(ReaderStream::new(file)));
    *response.status_mut() = StatusCode::OK;
    response
}

fn set_content_headers(headers: &mut HeaderMap, mime: &str, length: i64, etag: Option<&str>) {
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(mime)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length.max(0)));

    if let Some(etag) = etag {
        let quoted = format!("\"{}\"", etag);
        if let Ok(value) = HeaderValue::from_str(&quoted) {
            headers.insert(header::ETAG, value);
        }
    }
}
