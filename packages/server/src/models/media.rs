use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::media;

/// Public path prefix under which stored media files are served.
pub const MEDIA_URL_PREFIX: &str = "/media";

/// Public URL of a stored media file.
pub fn media_url(listing_id: i32, media_type: &str, filename: &str) -> String {
    format!("{MEDIA_URL_PREFIX}/{listing_id}/{media_type}/{filename}")
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct MediaResponse {
    pub id: i32,
    pub listing_id: i32,
    /// Generated on-disk filename.
    #[schema(example = "0f8fad5b-d9cb-469f-a165-70867728950e.jpg")]
    pub filename: String,
    #[schema(example = "jpg")]
    pub file_extension: String,
    #[schema(example = "image/jpeg")]
    pub mimetype: String,
    /// `photo` or `video`.
    #[schema(example = "photo")]
    pub media_type: String,
    /// Display position within the listing, lowest first.
    #[serde(rename = "order")]
    #[schema(example = 0)]
    pub position: i32,
    pub uploaded_at: DateTime<Utc>,
    #[schema(example = "/media/7/photo/0f8fad5b-d9cb-469f-a165-70867728950e.jpg")]
    pub url: String,
}

impl From<media::Model> for MediaResponse {
    fn from(m: media::Model) -> Self {
        let url = media_url(m.listing_id, &m.media_type, &m.filename);
        Self {
            id: m.id,
            listing_id: m.listing_id,
            filename: m.filename,
            file_extension: m.file_extension,
            mimetype: m.mimetype,
            media_type: m.media_type,
            position: m.position,
            uploaded_at: m.uploaded_at,
            url,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct UploadMediaResponse {
    #[schema(example = "Files uploaded successfully!")]
    pub message: String,
    pub media: Vec<MediaResponse>,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct ReorderMediaRequest {
    /// Media IDs in the desired display order. Unknown IDs are skipped.
    #[schema(example = json!([12, 9, 10]))]
    pub media_ids: Option<Vec<i64>>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ReorderMediaResponse {
    #[schema(example = "Media order updated successfully. 2 items updated.")]
    pub message: String,
    pub updated_count: usize,
    /// Set when the submitted list length differs from the listing's media count.
    pub count_mismatch: bool,
}
