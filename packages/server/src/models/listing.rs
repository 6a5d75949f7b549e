use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::media::MediaResponse;
use super::shared::{double_option, is_blank, validate_price};
use super::user::UserResponse;
use crate::entity::listing;
use crate::error::AppError;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateListingRequest {
    #[schema(example = "Mountain bike")]
    pub title: Option<String>,
    #[schema(example = "Barely used, 21 gears.")]
    pub description: Option<String>,
    #[schema(example = 250.0)]
    pub price: Option<f64>,
    #[schema(example = "Sports")]
    pub category: Option<String>,
    #[schema(example = "Berlin")]
    pub location: Option<String>,
    pub valid_until: Option<DateTime<Utc>>,
    /// Defaults to `true`.
    pub is_active: Option<bool>,
}

pub fn validate_create_listing(payload: &CreateListingRequest) -> Result<(), AppError> {
    if is_blank(payload.title.as_deref()) || is_blank(payload.description.as_deref()) {
        return Err(AppError::Validation(
            "Missing required fields: title and description".into(),
        ));
    }
    validate_title(payload.title.as_deref())?;
    validate_price(payload.price)
}

/// Partial listing update. `price`, `category`, `location` and `valid_until`
/// accept `null` to clear the value.
#[derive(Deserialize, Default, PartialEq, utoipa::ToSchema)]
pub struct UpdateListingRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<f64>)]
    pub price: Option<Option<f64>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub category: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub location: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<DateTime<Utc>>)]
    pub valid_until: Option<Option<DateTime<Utc>>>,
    pub is_active: Option<bool>,
}

pub fn validate_update_listing(payload: &UpdateListingRequest) -> Result<(), AppError> {
    if *payload == UpdateListingRequest::default() {
        return Err(AppError::Validation("No data provided for update".into()));
    }
    if payload.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
        return Err(AppError::Validation("Title cannot be empty".into()));
    }
    if payload
        .description
        .as_deref()
        .is_some_and(|d| d.trim().is_empty())
    {
        return Err(AppError::Validation("Description cannot be empty".into()));
    }
    validate_title(payload.title.as_deref())?;
    validate_price(payload.price.flatten())
}

fn validate_title(title: Option<&str>) -> Result<(), AppError> {
    if title.is_some_and(|t| t.trim().chars().count() > 120) {
        return Err(AppError::Validation(
            "Title must be at most 120 characters".into(),
        ));
    }
    Ok(())
}

/// Query parameters for browsing listings. Prices arrive as strings so a
/// malformed value can be reported by name.
#[derive(Deserialize, Default, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListingListQuery {
    /// Case-insensitive match against title or description.
    pub q: Option<String>,
    pub category: Option<String>,
    /// Case-insensitive substring match.
    pub location: Option<String>,
    #[param(example = "10")]
    pub min_price: Option<String>,
    #[param(example = "500")]
    pub max_price: Option<String>,
    /// Page number, starting at 1.
    pub page: Option<u64>,
    /// Items per page (max 100, default 20).
    pub per_page: Option<u64>,
}

/// Parse an optional price filter. Blank means absent.
pub fn parse_price_filter(name: &str, raw: Option<&str>) -> Result<Option<f64>, AppError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => s
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(Some)
            .ok_or_else(|| AppError::Validation(format!("Invalid {name} format"))),
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ListingResponse {
    pub id: i32,
    pub user_id: i32,
    pub title: String,
    pub description: String,
    pub price: Option<f64>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub posted_at: DateTime<Utc>,
    pub valid_until: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub updated_at: DateTime<Utc>,
    /// Absent when the owning user no longer exists.
    pub author: Option<UserResponse>,
    /// Attached media sorted by display order.
    pub media: Vec<MediaResponse>,
}

impl ListingResponse {
    pub fn from_parts(
        model: listing::Model,
        author: Option<UserResponse>,
        media: Vec<MediaResponse>,
    ) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            title: model.title,
            description: model.description,
            price: model.price,
            category: model.category,
            location: model.location,
            posted_at: model.posted_at,
            valid_until: model.valid_until,
            is_active: model.is_active,
            updated_at: model.updated_at,
            author,
            media,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ListingListResponse {
    pub data: Vec<ListingResponse>,
    pub pagination: super::shared::Pagination,
}
