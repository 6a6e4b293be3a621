use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "post_attachment")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Generated storage name inside the `files` bucket.
    #[sea_orm(unique)]
    pub filename: String,
    /// Name the uploader's file had; offered again on download.
    pub original_filename: String,
    pub content_type: Option<String>,
    /// Purposefully denormalized to avoid touching the blob store for listings.
    pub size: i64,

    pub post_id: i32,
    #[sea_orm(belongs_to, from = "post_id", to = "id")]
    pub post: HasOne<super::post::Entity>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
