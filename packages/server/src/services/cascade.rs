//! Owner-driven deletes that reach through listings down to media.
//!
//! Catalog rows are removed in one transaction. Stored files are removed
//! afterwards on a best-effort basis, so a storage failure can leave orphaned
//! files but never orphaned rows.

use classifieds_common::MediaStore;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QuerySelect, TransactionTrait,
};
use tracing::{debug, info};

use crate::entity::{listing, media, user};
use crate::error::AppError;
use crate::utils::ownership::{find_user, require_listing_owner};

/// Delete a listing owned by `principal`, its media rows and its media directory.
pub async fn delete_listing(
    db: &DatabaseConnection,
    store: &dyn MediaStore,
    principal: i32,
    listing_id: i32,
) -> Result<(), AppError> {
    require_listing_owner(db, principal, listing_id).await?;

    let txn = db.begin().await?;
    let removed_media = media::Entity::delete_many()
        .filter(media::Column::ListingId.eq(listing_id))
        .exec(&txn)
        .await?
        .rows_affected;
    listing::Entity::delete_by_id(listing_id).exec(&txn).await?;
    txn.commit().await?;

    remove_directories(store, &[listing_id]).await;
    info!(listing_id, removed_media, "Listing deleted");
    Ok(())
}

/// Delete a user account with all of its listings and their media.
pub async fn delete_user(
    db: &DatabaseConnection,
    store: &dyn MediaStore,
    user_id: i32,
) -> Result<(), AppError> {
    find_user(db, user_id).await?;

    let txn = db.begin().await?;
    let listing_ids: Vec<i32> = listing::Entity::find()
        .filter(listing::Column::UserId.eq(user_id))
        .select_only()
        .column(listing::Column::Id)
        .into_tuple::<i32>()
        .all(&txn)
        .await?;

    if !listing_ids.is_empty() {
        media::Entity::delete_many()
            .filter(media::Column::ListingId.is_in(listing_ids.clone()))
            .exec(&txn)
            .await?;
        listing::Entity::delete_many()
            .filter(listing::Column::UserId.eq(user_id))
            .exec(&txn)
            .await?;
    }
    user::Entity::delete_by_id(user_id).exec(&txn).await?;
    txn.commit().await?;

    remove_directories(store, &listing_ids).await;
    info!(user_id, listings = listing_ids.len(), "User deleted");
    Ok(())
}

async fn remove_directories(store: &dyn MediaStore, listing_ids: &[i32]) {
    for &listing_id in listing_ids {
        if !store.remove_listing(listing_id).await {
            debug!(listing_id, "No media directory to remove");
        }
    }
}
