use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use sea_orm::*;
use tracing::instrument;

use crate::entity::user;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::user::{UpdateUserRequest, UserResponse};
use crate::services::cascade;
use crate::state::AppState;
use crate::utils::hash;
use crate::utils::ownership::find_user;

#[utoipa::path(
    get,
    path = "/api/v1/users",
    tag = "Users",
    operation_id = "listUsers",
    summary = "List users",
    responses(
        (status = 200, description = "All users", body = Vec<UserResponse>),
    ),
)]
#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    let users = user::Entity::find()
        .order_by_asc(user::Column::Id)
        .all(&state.db)
        .await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    tag = "Users",
    operation_id = "getUser",
    summary = "Get a user by ID",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "User details", body = UserResponse),
        (status = 404, description = "User not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<UserResponse>, AppError> {
    let user = find_user(&state.db, id).await?;
    Ok(Json(user.into()))
}

#[utoipa::path(
    get,
    path = "/api/v1/user",
    tag = "Users",
    operation_id = "getCurrentUser",
    summary = "Get the current user",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "User not found (NOT_FOUND)", body = ErrorBody),
        (status = 429, description = "Too many requests (RATE_LIMITED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn get_current_user(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<UserResponse>, AppError> {
    state.rate_limiter.check(
        "current_user",
        &state.config.rate_limit.current_user,
        &auth_user.user_id.to_string(),
    )?;
    let user = find_user(&state.db, auth_user.user_id).await?;
    Ok(Json(user.into()))
}

#[utoipa::path(
    put,
    path = "/api/v1/user",
    tag = "Users",
    operation_id = "updateCurrentUser",
    summary = "Update the current user",
    description = "Applies only the fields present in the body. Username and email stay unique; a non-empty password is re-hashed.",
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated user", body = UserResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "User not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Username or email taken (CONFLICT)", body = ErrorBody),
        (status = 429, description = "Too many requests (RATE_LIMITED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id))]
pub async fn update_current_user(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<UpdateUserRequest>,
) -> Result<Json<UserResponse>, AppError> {
    state.rate_limiter.check(
        "update_user",
        &state.config.rate_limit.update_user,
        &auth_user.user_id.to_string(),
    )?;
    if payload == UpdateUserRequest::default() {
        return Err(AppError::Validation("No data provided for update".into()));
    }

    let existing = find_user(&state.db, auth_user.user_id).await?;
    let mut active: user::ActiveModel = existing.clone().into();

    if let Some(username) = payload.username.map(|u| u.trim().to_string()) {
        if username.is_empty() {
            return Err(AppError::Validation("Username cannot be empty".into()));
        }
        if username != existing.username {
            ensure_unique(&state.db, user::Column::Username, &username, existing.id).await?;
            active.username = Set(username);
        }
    }
    if let Some(email) = payload.email.map(|e| e.trim().to_string()) {
        if !email.contains('@') {
            return Err(AppError::Validation("Invalid email address".into()));
        }
        if email != existing.email {
            ensure_unique(&state.db, user::Column::Email, &email, existing.id).await?;
            active.email = Set(email);
        }
    }
    if let Some(password) = payload.password.filter(|p| !p.is_empty()) {
        let hash = hash::hash_password(&password)
            .map_err(|e| AppError::Internal(format!("Password hash error: {}", e)))?;
        active.password_hash = Set(hash);
    }
    if let Some(first_name) = payload.first_name {
        active.first_name = Set(first_name);
    }
    if let Some(last_name) = payload.last_name {
        active.last_name = Set(last_name);
    }
    if let Some(phone_number) = payload.phone_number {
        active.phone_number = Set(phone_number);
    }
    active.updated_at = Set(Utc::now());

    let updated = active.update(&state.db).await.map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            AppError::Conflict("Username or email already exists".into())
        }
        _ => AppError::from(e),
    })?;

    Ok(Json(updated.into()))
}

#[utoipa::path(
    delete,
    path = "/api/v1/user",
    tag = "Users",
    operation_id = "deleteCurrentUser",
    summary = "Delete the current user",
    description = "Deletes the account together with all of its listings, their media records and stored files.",
    responses(
        (status = 204, description = "User deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "User not found (NOT_FOUND)", body = ErrorBody),
        (status = 429, description = "Too many requests (RATE_LIMITED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn delete_current_user(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    state.rate_limiter.check(
        "delete_user",
        &state.config.rate_limit.delete_user,
        &auth_user.user_id.to_string(),
    )?;
    cascade::delete_user(&state.db, state.media_store.as_ref(), auth_user.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn ensure_unique(
    db: &DatabaseConnection,
    column: user::Column,
    value: &str,
    own_id: i32,
) -> Result<(), AppError> {
    let taken = user::Entity::find()
        .filter(column.eq(value))
        .filter(user::Column::Id.ne(own_id))
        .count(db)
        .await?;
    if taken > 0 {
        let what = match column {
            user::Column::Email => "Email",
            _ => "Username",
        };
        return Err(AppError::Conflict(format!("{what} already exists")));
    }
    Ok(())
}
