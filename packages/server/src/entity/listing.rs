use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "listing")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Owner. Never changes after creation.
    pub user_id: i32,
    #[sea_orm(belongs_to, from = "user_id", to = "id", on_delete = "Cascade")]
    pub author: HasOne<super::user::Entity>,

    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub price: Option<f64>,
    pub category: Option<String>,
    pub location: Option<String>,

    pub posted_at: DateTimeUtc,
    pub valid_until: Option<DateTimeUtc>,
    pub is_active: bool,
    pub updated_at: DateTimeUtc,

    #[sea_orm(has_many)]
    pub media: HasMany<super::media::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}
