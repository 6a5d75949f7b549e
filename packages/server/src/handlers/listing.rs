use std::collections::HashMap;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use sea_orm::prelude::Expr;
use sea_orm::sea_query::{Func, LikeExpr};
use sea_orm::*;
use tracing::instrument;

use crate::entity::{listing, media, user};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::listing::*;
use crate::models::media::MediaResponse;
use crate::models::shared::{Pagination, escape_like};
use crate::models::user::UserResponse;
use crate::services::cascade;
use crate::services::media::listing_media;
use crate::state::AppState;
use crate::utils::ownership::{find_listing, find_user, require_listing_owner};

/// Case-insensitive substring match on a text column.
fn contains_ci(column: listing::Column, term: &str) -> Condition {
    Condition::all().add(
        Expr::expr(Func::lower(Expr::col(column)))
            .like(LikeExpr::new(format!("%{}%", escape_like(term).to_lowercase())).escape('\\')),
    )
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

#[utoipa::path(
    get,
    path = "/api/v1/listings",
    tag = "Listings",
    operation_id = "listListings",
    summary = "Browse listings",
    description = "Returns listings newest first. `q` matches title or description, `category` and `location` match case-insensitive substrings, `min_price`/`max_price` bound the price.",
    params(ListingListQuery),
    responses(
        (status = 200, description = "Matching listings", body = ListingListResponse),
        (status = 400, description = "Invalid price filter (VALIDATION_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, query))]
pub async fn list_listings(
    State(state): State<AppState>,
    Query(query): Query<ListingListQuery>,
) -> Result<Json<ListingListResponse>, AppError> {
    let min_price = parse_price_filter("min_price", query.min_price.as_deref())?;
    let max_price = parse_price_filter("max_price", query.max_price.as_deref())?;

    let page = Ord::max(query.page.unwrap_or(1), 1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);

    let mut select = listing::Entity::find();

    if let Some(q) = non_blank(&query.q) {
        select = select.filter(
            Condition::any()
                .add(contains_ci(listing::Column::Title, q))
                .add(contains_ci(listing::Column::Description, q)),
        );
    }
    if let Some(category) = non_blank(&query.category) {
        select = select.filter(contains_ci(listing::Column::Category, category));
    }
    if let Some(location) = non_blank(&query.location) {
        select = select.filter(contains_ci(listing::Column::Location, location));
    }
    if let Some(min) = min_price {
        select = select.filter(listing::Column::Price.gte(min));
    }
    if let Some(max) = max_price {
        select = select.filter(listing::Column::Price.lte(max));
    }

    let total = select
        .clone()
        .paginate(&state.db, per_page)
        .num_items()
        .await?;
    let total_pages = total.div_ceil(per_page);

    let listings = select
        .order_by_desc(listing::Column::PostedAt)
        .order_by_desc(listing::Column::Id)
        .offset(Some((page - 1) * per_page))
        .limit(Some(per_page))
        .all(&state.db)
        .await?;

    Ok(Json(ListingListResponse {
        data: with_relations(&state.db, listings).await?,
        pagination: Pagination {
            page,
            per_page,
            total,
            total_pages,
        },
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/listings/{id}",
    tag = "Listings",
    operation_id = "getListing",
    summary = "Get a listing by ID",
    params(("id" = i32, Path, description = "Listing ID")),
    responses(
        (status = 200, description = "Listing with author and media", body = ListingResponse),
        (status = 404, description = "Listing not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn get_listing(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ListingResponse>, AppError> {
    let listing = find_listing(&state.db, id).await?;
    Ok(Json(single_with_relations(&state.db, listing).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/listings",
    tag = "Listings",
    operation_id = "createListing",
    summary = "Create a listing",
    description = "Creates a listing owned by the current user. `title` and `description` are required.",
    request_body = CreateListingRequest,
    responses(
        (status = 201, description = "Listing created", body = ListingResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "User not found (NOT_FOUND)", body = ErrorBody),
        (status = 429, description = "Too many requests (RATE_LIMITED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id))]
pub async fn create_listing(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateListingRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.rate_limiter.check(
        "create_listing",
        &state.config.rate_limit.create_listing,
        &auth_user.user_id.to_string(),
    )?;
    validate_create_listing(&payload)?;

    let author = find_user(&state.db, auth_user.user_id).await?;

    let now = Utc::now();
    let model = listing::ActiveModel {
        user_id: Set(author.id),
        title: Set(payload.title.unwrap_or_default().trim().to_string()),
        description: Set(payload.description.unwrap_or_default()),
        price: Set(payload.price),
        category: Set(payload.category),
        location: Set(payload.location),
        posted_at: Set(now),
        valid_until: Set(payload.valid_until),
        is_active: Set(payload.is_active.unwrap_or(true)),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    tracing::info!(listing_id = model.id, "Listing created");

    Ok((
        StatusCode::CREATED,
        Json(ListingResponse::from_parts(model, Some(author.into()), Vec::new())),
    ))
}

#[utoipa::path(
    put,
    path = "/api/v1/listings/{id}",
    tag = "Listings",
    operation_id = "updateListing",
    summary = "Update a listing",
    description = "Applies only the fields present in the body. Only the owner may update a listing.",
    params(("id" = i32, Path, description = "Listing ID")),
    request_body = UpdateListingRequest,
    responses(
        (status = 200, description = "Updated listing", body = ListingResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the owner (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "User or listing not found (NOT_FOUND)", body = ErrorBody),
        (status = 429, description = "Too many requests (RATE_LIMITED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id))]
pub async fn update_listing(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateListingRequest>,
) -> Result<Json<ListingResponse>, AppError> {
    state.rate_limiter.check(
        "update_listing",
        &state.config.rate_limit.update_listing,
        &auth_user.user_id.to_string(),
    )?;
    validate_update_listing(&payload)?;

    let (_, existing) = require_listing_owner(&state.db, auth_user.user_id, id).await?;
    let mut active: listing::ActiveModel = existing.into();

    if let Some(ref title) = payload.title {
        active.title = Set(title.trim().to_string());
    }
    if let Some(description) = payload.description {
        active.description = Set(description);
    }
    if let Some(price) = payload.price {
        active.price = Set(price);
    }
    if let Some(category) = payload.category {
        active.category = Set(category);
    }
    if let Some(location) = payload.location {
        active.location = Set(location);
    }
    if let Some(valid_until) = payload.valid_until {
        active.valid_until = Set(valid_until);
    }
    if let Some(is_active) = payload.is_active {
        active.is_active = Set(is_active);
    }
    active.updated_at = Set(Utc::now());

    let model = active.update(&state.db).await?;
    Ok(Json(single_with_relations(&state.db, model).await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/listings/{id}",
    tag = "Listings",
    operation_id = "deleteListing",
    summary = "Delete a listing",
    description = "Deletes the listing, its media records and its stored media files. Only the owner may delete a listing.",
    params(("id" = i32, Path, description = "Listing ID")),
    responses(
        (status = 204, description = "Listing deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the owner (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "User or listing not found (NOT_FOUND)", body = ErrorBody),
        (status = 429, description = "Too many requests (RATE_LIMITED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn delete_listing(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    state.rate_limiter.check(
        "delete_listing",
        &state.config.rate_limit.delete_listing,
        &auth_user.user_id.to_string(),
    )?;
    cascade::delete_listing(&state.db, state.media_store.as_ref(), auth_user.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn single_with_relations(
    db: &DatabaseConnection,
    listing: listing::Model,
) -> Result<ListingResponse, AppError> {
    let author = user::Entity::find_by_id(listing.user_id)
        .one(db)
        .await?
        .map(UserResponse::from);
    let media = listing_media(db, listing.id)
        .await?
        .into_iter()
        .map(MediaResponse::from)
        .collect();
    Ok(ListingResponse::from_parts(listing, author, media))
}

/// Attach authors and ordered media to a page of listings with two queries.
async fn with_relations(
    db: &DatabaseConnection,
    listings: Vec<listing::Model>,
) -> Result<Vec<ListingResponse>, AppError> {
    if listings.is_empty() {
        return Ok(Vec::new());
    }

    let user_ids: Vec<i32> = listings.iter().map(|l| l.user_id).collect();
    let listing_ids: Vec<i32> = listings.iter().map(|l| l.id).collect();

    let authors: HashMap<i32, user::Model> = user::Entity::find()
        .filter(user::Column::Id.is_in(user_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

    let mut media_by_listing: HashMap<i32, Vec<MediaResponse>> = HashMap::new();
    for item in media::Entity::find()
        .filter(media::Column::ListingId.is_in(listing_ids))
        .order_by_asc(media::Column::Position)
        .order_by_asc(media::Column::Id)
        .all(db)
        .await?
    {
        media_by_listing
            .entry(item.listing_id)
            .or_default()
            .push(item.into());
    }

    Ok(listings
        .into_iter()
        .map(|l| {
            let author = authors.get(&l.user_id).cloned().map(UserResponse::from);
            let media = media_by_listing.remove(&l.id).unwrap_or_default();
            ListingResponse::from_parts(l, author, media)
        })
        .collect())
}
