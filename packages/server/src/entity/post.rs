use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle of a post.
///
/// `Purged` is terminal and never stored: a purged post has no row left.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum PostState {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "hidden")]
    Hidden,
    #[sea_orm(string_value = "purged")]
    Purged,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModerationAction {
    Hide,
    Restore,
    Purge,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("cannot {action:?} a post that is {from:?}")]
pub struct InvalidTransition {
    pub from: PostState,
    pub action: ModerationAction,
}

impl PostState {
    /// Apply a moderation action. Hiding a hidden post and restoring an active
    /// one are no-ops; nothing leaves `Purged`.
    pub fn apply(self, action: ModerationAction) -> Result<PostState, InvalidTransition> {
        match (self, action) {
            (PostState::Purged, _) => Err(InvalidTransition {
                from: self,
                action,
            }),
            (_, ModerationAction::Hide) => Ok(PostState::Hidden),
            (_, ModerationAction::Restore) => Ok(PostState::Active),
            (_, ModerationAction::Purge) => Ok(PostState::Purged),
        }
    }

    pub fn is_listed(&self) -> bool {
        matches!(self, PostState::Active)
    }
}

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "post")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub content: String,
    pub state: PostState,

    pub user_id: i32,
    #[sea_orm(belongs_to, from = "user_id", to = "id")]
    pub user: HasOne<super::user::Entity>,

    #[sea_orm(has_many)]
    pub comments: HasMany<super::comment::Entity>,
    #[sea_orm(has_many)]
    pub likes: HasMany<super::post_like::Entity>,
    #[sea_orm(has_many)]
    pub images: HasMany<super::post_image::Entity>,
    #[sea_orm(has_many)]
    pub attachments: HasMany<super::post_attachment::Entity>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
