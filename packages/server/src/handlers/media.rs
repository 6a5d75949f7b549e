use axum::{
    Json,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use classifieds_common::StorageConfig;
use sea_orm::*;
use tracing::instrument;

use crate::entity::media;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::media::{
    MediaResponse, ReorderMediaRequest, ReorderMediaResponse, UploadMediaResponse,
};
use crate::services::media::{MediaService, UploadedFile};
use crate::state::AppState;
use crate::utils::ownership::find_media;

/// Multipart field carrying the uploaded files.
const UPLOAD_FIELD: &str = "files";

/// Files accepted in one upload request before the body limit trips.
const MAX_FILES_PER_REQUEST: u64 = 10;

pub fn media_upload_body_limit(storage: &StorageConfig) -> DefaultBodyLimit {
    let max = storage.max_file_size.saturating_mul(MAX_FILES_PER_REQUEST);
    DefaultBodyLimit::max(usize::try_from(max).unwrap_or(usize::MAX))
}

fn service(state: &AppState) -> MediaService<'_> {
    MediaService::new(
        &state.db,
        state.media_store.as_ref(),
        state.config.storage.max_file_size,
    )
}

#[utoipa::path(
    get,
    path = "/api/v1/media",
    tag = "Media",
    operation_id = "listMedia",
    summary = "List all media",
    description = "Returns every media item grouped by listing, each group in display order.",
    responses(
        (status = 200, description = "All media", body = Vec<MediaResponse>),
    ),
)]
#[instrument(skip(state))]
pub async fn list_media(
    State(state): State<AppState>,
) -> Result<Json<Vec<MediaResponse>>, AppError> {
    let items = media::Entity::find()
        .order_by_asc(media::Column::ListingId)
        .order_by_asc(media::Column::Position)
        .order_by_asc(media::Column::Id)
        .all(&state.db)
        .await?;
    Ok(Json(items.into_iter().map(MediaResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/api/v1/media/{id}",
    tag = "Media",
    operation_id = "getMedia",
    summary = "Get a media item by ID",
    params(("id" = i32, Path, description = "Media ID")),
    responses(
        (status = 200, description = "Media descriptor", body = MediaResponse),
        (status = 404, description = "Media not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn get_media(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<MediaResponse>, AppError> {
    Ok(Json(find_media(&state.db, id).await?.into()))
}

#[utoipa::path(
    post,
    path = "/api/v1/listings/{id}/media",
    tag = "Media",
    operation_id = "uploadMedia",
    summary = "Upload media to a listing",
    description = "Stores one or more files sent as repeated `files` multipart parts. \
        Allowed extensions: png, jpg, jpeg, gif, mp4, mov, avi. New items are appended \
        after the listing's existing media. If any file is rejected, nothing is stored.",
    params(("id" = i32, Path, description = "Listing ID")),
    request_body(content_type = "multipart/form-data", description = "One or more `files` parts"),
    responses(
        (status = 201, description = "Media uploaded", body = UploadMediaResponse),
        (status = 400, description = "No files, a part without a filename, or file too large (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the listing owner (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "User or listing not found (NOT_FOUND)", body = ErrorBody),
        (status = 415, description = "File type not allowed (UNSUPPORTED_MEDIA_TYPE)", body = ErrorBody),
        (status = 500, description = "File could not be stored (STORAGE_ERROR)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, multipart), fields(user_id = auth_user.user_id))]
pub async fn upload_media(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(listing_id): Path<i32>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Multipart error: {e}")))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Failed to read file: {e}")))?;
        files.push(UploadedFile {
            filename,
            data: data.to_vec(),
        });
    }

    let created = service(&state)
        .upload(auth_user.user_id, listing_id, files)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(UploadMediaResponse {
            message: "Files uploaded successfully!".into(),
            media: created.into_iter().map(MediaResponse::from).collect(),
        }),
    ))
}

#[utoipa::path(
    put,
    path = "/api/v1/listings/{id}/media/order",
    tag = "Media",
    operation_id = "reorderMedia",
    summary = "Reorder a listing's media",
    description = "Assigns each listed media item its array index as display order. \
        IDs that do not belong to the listing are skipped. A list whose length differs \
        from the listing's media count is still applied and flagged with `count_mismatch`.",
    params(("id" = i32, Path, description = "Listing ID")),
    request_body = ReorderMediaRequest,
    responses(
        (status = 200, description = "Order applied", body = ReorderMediaResponse),
        (status = 400, description = "Missing or malformed media_ids (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the listing owner (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "User or listing not found (NOT_FOUND)", body = ErrorBody),
        (status = 500, description = "Order could not be saved (INTERNAL_ERROR)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id))]
pub async fn reorder_media(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(listing_id): Path<i32>,
    AppJson(payload): AppJson<ReorderMediaRequest>,
) -> Result<Json<ReorderMediaResponse>, AppError> {
    let media_ids = payload
        .media_ids
        .ok_or_else(|| AppError::Validation("Missing required field: media_ids".into()))?;

    let outcome = service(&state)
        .reorder(auth_user.user_id, listing_id, &media_ids)
        .await?;

    Ok(Json(ReorderMediaResponse {
        message: format!(
            "Media order updated successfully. {} items updated.",
            outcome.updated_count
        ),
        updated_count: outcome.updated_count,
        count_mismatch: outcome.count_mismatch,
    }))
}

#[utoipa::path(
    delete,
    path = "/api/v1/media/{id}",
    tag = "Media",
    operation_id = "deleteMedia",
    summary = "Delete a media item",
    description = "Removes the stored file and the media record. A missing file does not prevent the record from being deleted.",
    params(("id" = i32, Path, description = "Media ID")),
    responses(
        (status = 204, description = "Media deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the listing owner (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Media or listing not found (NOT_FOUND)", body = ErrorBody),
        (status = 429, description = "Too many requests (RATE_LIMITED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn delete_media(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    state.rate_limiter.check(
        "delete_media",
        &state.config.rate_limit.delete_media,
        &auth_user.user_id.to_string(),
    )?;
    service(&state).delete(auth_user.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
