use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Identity assigned by the identity provider. Never changes.
    #[sea_orm(unique)]
    pub external_id: String,

    // Display attributes, refreshed on every login.
    pub username: String,
    pub avatar: Option<String>,
    pub discriminator: Option<String>,

    /// Whether the user may create posts and comments. Only moderators flip it.
    pub can_post: bool,

    #[sea_orm(has_many)]
    pub posts: HasMany<super::post::Entity>,

    #[sea_orm(has_many)]
    pub comments: HasMany<super::comment::Entity>,

    pub created_at: DateTimeUtc,
    pub last_login_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
