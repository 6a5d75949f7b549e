use sea_orm::{ConnectionTrait, EntityTrait};

use crate::entity::{listing, media, user};
use crate::error::AppError;

/// Look up a user by ID, returning 404 if not found.
pub async fn find_user<C: ConnectionTrait>(db: &C, id: i32) -> Result<user::Model, AppError> {
    user::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))
}

/// Look up a listing by ID, returning 404 if not found.
pub async fn find_listing<C: ConnectionTrait>(
    db: &C,
    id: i32,
) -> Result<listing::Model, AppError> {
    listing::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Listing not found".into()))
}

/// Look up a media item by ID, returning 404 if not found.
pub async fn find_media<C: ConnectionTrait>(db: &C, id: i32) -> Result<media::Model, AppError> {
    media::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Media not found".into()))
}

/// Returns `PermissionDenied` unless `principal` owns `listing`.
pub fn ensure_owner(listing: &listing::Model, principal: i32) -> Result<(), AppError> {
    if listing.user_id == principal {
        Ok(())
    } else {
        Err(AppError::PermissionDenied)
    }
}

/// Resolve the acting user and a listing they own.
///
/// Checks run in a fixed order so callers get a stable error: unknown
/// principal (404), unknown listing (404), then ownership (403).
pub async fn require_listing_owner<C: ConnectionTrait>(
    db: &C,
    principal: i32,
    listing_id: i32,
) -> Result<(user::Model, listing::Model), AppError> {
    let owner = find_user(db, principal).await?;
    let listing = find_listing(db, listing_id).await?;
    ensure_owner(&listing, owner.id)?;
    Ok((owner, listing))
}

/// Resolve a media item whose listing the principal owns.
///
/// A media row whose listing is gone reports 404 rather than failing hard.
pub async fn require_media_owner<C: ConnectionTrait>(
    db: &C,
    principal: i32,
    media_id: i32,
) -> Result<(listing::Model, media::Model), AppError> {
    let item = find_media(db, media_id).await?;
    let listing = listing::Entity::find_by_id(item.listing_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Associated listing not found".into()))?;
    ensure_owner(&listing, principal)?;
    Ok((listing, item))
}

