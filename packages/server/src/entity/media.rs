use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "media")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(indexed)]
    pub listing_id: i32,
    #[sea_orm(belongs_to, from = "listing_id", to = "id", on_delete = "Cascade")]
    pub listing: HasOne<super::listing::Entity>,

    /// Generated `<uuid>.<ext>` name on disk, never the uploaded name.
    pub filename: String,
    pub file_extension: String,
    pub mimetype: String,
    /// `photo` or `video`; also the storage subdirectory.
    pub media_type: String,
    /// Display order within the listing. Not unique.
    pub position: i32,

    pub uploaded_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
