use std::collections::HashMap;

use chrono::Utc;
use classifieds_common::media::{classify, identifier};
use classifieds_common::{MediaKind, MediaStore};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tracing::{info, warn};

use crate::entity::media;
use crate::error::AppError;
use crate::utils::ownership::{require_listing_owner, require_media_owner};

/// One file part taken from an upload request.
pub struct UploadedFile {
    /// Client-supplied name. Only its extension is used.
    pub filename: String,
    pub data: Vec<u8>,
}

/// Result of applying a client-supplied media order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReorderOutcome {
    pub updated_count: usize,
    /// The submitted list length differed from the listing's media count.
    pub count_mismatch: bool,
}

/// Upload, ordering and deletion of listing media.
///
/// Each operation resolves the acting user and checks listing ownership
/// before touching storage or the catalog.
pub struct MediaService<'a> {
    db: &'a DatabaseConnection,
    store: &'a dyn MediaStore,
    max_file_size: u64,
}

impl<'a> MediaService<'a> {
    pub fn new(
        db: &'a DatabaseConnection,
        store: &'a dyn MediaStore,
        max_file_size: u64,
    ) -> Self {
        Self {
            db,
            store,
            max_file_size,
        }
    }

    /// Store `files` under `listing_id` and catalog them after any existing media.
    ///
    /// Either every file is stored and cataloged, or none is: on failure the
    /// catalog transaction is rolled back and files already written by this
    /// call are removed again.
    pub async fn upload(
        &self,
        principal: i32,
        listing_id: i32,
        files: Vec<UploadedFile>,
    ) -> Result<Vec<media::Model>, AppError> {
        require_listing_owner(self.db, principal, listing_id).await?;

        if files.is_empty() {
            return Err(AppError::Validation("No file part in the request".into()));
        }
        let blank = files
            .iter()
            .filter(|f| f.filename.trim().is_empty())
            .count();
        if blank == files.len() {
            return Err(AppError::Validation("No selected file".into()));
        }
        if blank > 0 {
            return Err(AppError::Validation(
                "No selected file for one of the uploads".into(),
            ));
        }

        let txn = self.db.begin().await?;
        let mut saved = Vec::with_capacity(files.len());

        let created = match self.store_files(&txn, listing_id, files, &mut saved).await {
            Ok(created) => created,
            Err(e) => {
                if let Err(rb) = txn.rollback().await {
                    warn!(listing_id, error = %rb, "Failed to roll back media upload");
                }
                self.discard(listing_id, &saved).await;
                return Err(e);
            }
        };

        if let Err(e) = txn.commit().await {
            self.discard(listing_id, &saved).await;
            return Err(e.into());
        }

        info!(listing_id, count = created.len(), "Media uploaded");
        Ok(created)
    }

    async fn store_files(
        &self,
        txn: &DatabaseTransaction,
        listing_id: i32,
        files: Vec<UploadedFile>,
        saved: &mut Vec<(MediaKind, String)>,
    ) -> Result<Vec<media::Model>, AppError> {
        let mut position = next_position(txn, listing_id).await?;
        let mut created = Vec::with_capacity(files.len());

        for file in files {
            let class = classify(&file.filename)?;
            if file.data.len() as u64 > self.max_file_size {
                return Err(AppError::Validation(format!(
                    "File {} exceeds the maximum size of {} bytes",
                    file.filename, self.max_file_size
                )));
            }

            let stored = identifier::stored_filename(&class.extension);
            self.store.ensure_directory(listing_id, class.kind).await?;
            self.store
                .save(listing_id, class.kind, &stored, &file.data)
                .await?;
            saved.push((class.kind, stored.clone()));

            let model = media::ActiveModel {
                listing_id: Set(listing_id),
                filename: Set(stored),
                file_extension: Set(class.extension),
                mimetype: Set(class.mimetype.to_string()),
                media_type: Set(class.kind.to_string()),
                position: Set(position),
                uploaded_at: Set(Utc::now()),
                ..Default::default()
            }
            .insert(txn)
            .await?;
            created.push(model);

            position = position
                .checked_add(1)
                .ok_or_else(|| AppError::Internal("Media position overflow".into()))?;
        }

        Ok(created)
    }

    async fn discard(&self, listing_id: i32, saved: &[(MediaKind, String)]) {
        for (kind, filename) in saved {
            if !self.store.delete(listing_id, *kind, filename).await {
                warn!(listing_id, filename, "Could not remove file from failed upload");
            }
        }
    }

    /// Assign each listed media item its index in `media_ids` as display order.
    ///
    /// Ids unknown to the listing are skipped. Items already at the right
    /// position are left alone and not counted.
    pub async fn reorder(
        &self,
        principal: i32,
        listing_id: i32,
        media_ids: &[i64],
    ) -> Result<ReorderOutcome, AppError> {
        require_listing_owner(self.db, principal, listing_id).await?;

        let mut current: HashMap<i32, i32> = media::Entity::find()
            .filter(media::Column::ListingId.eq(listing_id))
            .select_only()
            .column(media::Column::Id)
            .column(media::Column::Position)
            .into_tuple::<(i32, i32)>()
            .all(self.db)
            .await?
            .into_iter()
            .collect();

        let count_mismatch = media_ids.len() != current.len();
        if count_mismatch {
            warn!(
                listing_id,
                submitted = media_ids.len(),
                existing = current.len(),
                "Reorder list length does not match listing media count"
            );
        }

        let txn = self.db.begin().await?;
        let mut updated_count = 0;

        for (index, &raw_id) in media_ids.iter().enumerate() {
            // Ids outside the key range cannot name a row; treat them as unknown.
            let entry = i32::try_from(raw_id)
                .ok()
                .and_then(|id| current.get_mut(&id).map(|position| (id, position)));
            let Some((media_id, position)) = entry else {
                warn!(listing_id, media_id = raw_id, "Skipping media not attached to listing");
                continue;
            };
            let target = i32::try_from(index)
                .map_err(|_| AppError::Validation("Too many media items to reorder".into()))?;
            if *position == target {
                continue;
            }

            media::Entity::update_many()
                .filter(media::Column::Id.eq(media_id))
                .col_expr(media::Column::Position, Expr::value(target))
                .exec(&txn)
                .await
                .map_err(|e| AppError::Internal(format!("Failed to update media order: {e}")))?;
            *position = target;
            updated_count += 1;
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to commit media order: {e}")))?;

        info!(listing_id, updated_count, "Media reordered");
        Ok(ReorderOutcome {
            updated_count,
            count_mismatch,
        })
    }

    /// Remove a media item's file and catalog row.
    ///
    /// A file that cannot be removed is logged; the row is deleted regardless.
    pub async fn delete(&self, principal: i32, media_id: i32) -> Result<(), AppError> {
        let (listing, item) = require_media_owner(self.db, principal, media_id).await?;

        match item.media_type.parse::<MediaKind>() {
            Ok(kind) => {
                if !self.store.delete(listing.id, kind, &item.filename).await {
                    warn!(media_id, filename = %item.filename, "Media file was not removed");
                }
            }
            Err(e) => warn!(media_id, error = %e, "Skipping file removal"),
        }

        media::Entity::delete_by_id(item.id).exec(self.db).await?;
        info!(media_id, listing_id = listing.id, "Media deleted");
        Ok(())
    }
}

/// Media of a listing in display order. Ties fall back to insertion order.
pub async fn listing_media<C: ConnectionTrait>(
    db: &C,
    listing_id: i32,
) -> Result<Vec<media::Model>, AppError> {
    Ok(media::Entity::find()
        .filter(media::Column::ListingId.eq(listing_id))
        .order_by_asc(media::Column::Position)
        .order_by_asc(media::Column::Id)
        .all(db)
        .await?)
}

/// Next free display position in a listing: one past the current maximum.
async fn next_position<C: ConnectionTrait>(db: &C, listing_id: i32) -> Result<i32, AppError> {
    let max_pos: Option<i32> = media::Entity::find()
        .filter(media::Column::ListingId.eq(listing_id))
        .select_only()
        .column_as(media::Column::Position.max(), "max_pos")
        .into_tuple::<Option<i32>>()
        .one(db)
        .await?
        .flatten();
    max_pos
        .unwrap_or(-1)
        .checked_add(1)
        .ok_or_else(|| {
            AppError::Internal(format!("Media position overflow in listing {listing_id}"))
        })
}
