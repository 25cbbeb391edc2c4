//! Folder and tag endpoints.

use crate::{
    errors::AppError,
    models::asset::{FolderId, TagId},
    services::library::MediaLibrary,
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;

/// Body of `POST /folders` and `POST /tags`.
#[derive(Debug, Deserialize)]
pub struct CreateTaxonomyReq {
    pub name: String,
}

/// GET `/folders`
pub async fn list_folders(
    State(library): State<MediaLibrary>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(library.list_folders().await?))
}

/// POST `/folders`
pub async fn create_folder(
    State(library): State<MediaLibrary>,
    Json(payload): Json<CreateTaxonomyReq>,
) -> Result<impl IntoResponse, AppError> {
    let folder = library.create_folder(&payload.name).await?;
    Ok((StatusCode::CREATED, Json(folder)))
}

/// DELETE `/folders/{id}`: member assets become folder-less.
pub async fn delete_folder(
    State(library): State<MediaLibrary>,
    Path(id): Path<FolderId>,
) -> Result<StatusCode, AppError> {
    library.delete_folder(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET `/tags`
pub async fn list_tags(State(library): State<MediaLibrary>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(library.list_tags().await?))
}

/// POST `/tags`
pub async fn create_tag(
    State(library): State<MediaLibrary>,
    Json(payload): Json<CreateTaxonomyReq>,
) -> Result<impl IntoResponse, AppError> {
    let tag = library.create_tag(&payload.name).await?;
    Ok((StatusCode::CREATED, Json(tag)))
}

/// DELETE `/tags/{id}`: the tag is detached from every asset first.
pub async fn delete_tag(
    State(library): State<MediaLibrary>,
    Path(id): Path<TagId>,
) -> Result<StatusCode, AppError> {
    library.delete_tag(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
