use common::storage::{BlobKey, BlobStore, Bucket};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QuerySelect, Set,
};

use crate::entity::post::{ModerationAction, PostState};
use crate::entity::{comment, comment_like, post, post_attachment, post_image, post_like, user};
use crate::error::AppError;

pub struct ModerationService<'a, C: ConnectionTrait> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> ModerationService<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    /// Hide or restore a post. Rows are kept either way.
    pub async fn transition(
        &self,
        post_id: i32,
        action: ModerationAction,
    ) -> Result<post::Model, AppError> {
        let found = find_post(self.conn, post_id).await?;
        let next = found
            .state
            .apply(action)
            .map_err(|e| AppError::Validation(e.to_string()))?;
        if next == PostState::Purged {
            return Err(AppError::Internal("purge must go through ModerationService::purge".into()));
        }
        if next == found.state {
            return Ok(found);
        }

        let mut active: post::ActiveModel = found.into();
        active.state = Set(next);
        let updated = active.update(self.conn).await?;
        tracing::info!(post_id, state = ?updated.state, "Post state changed");
        Ok(updated)
    }

    /// Permanently delete a post, everything that depends on it and its
    /// media files. Dependent rows go first, the post row last.
    pub async fn purge(&self, post_id: i32, blob_store: &dyn BlobStore) -> Result<(), AppError> {
        let found = find_post(self.conn, post_id).await?;
        found
            .state
            .apply(ModerationAction::Purge)
            .map_err(|e| AppError::Validation(e.to_string()))?;

        let comment_ids: Vec<i32> = comment::Entity::find()
            .select_only()
            .column(comment::Column::Id)
            .filter(comment::Column::PostId.eq(post_id))
            .into_tuple()
            .all(self.conn)
            .await?;
        if !comment_ids.is_empty() {
            comment_like::Entity::delete_many()
                .filter(comment_like::Column::CommentId.is_in(comment_ids))
                .exec(self.conn)
                .await?;
        }
        comment::Entity::delete_many()
            .filter(comment::Column::PostId.eq(post_id))
            .exec(self.conn)
            .await?;
        post_like::Entity::delete_many()
            .filter(post_like::Column::PostId.eq(post_id))
            .exec(self.conn)
            .await?;

        let images: Vec<String> = post_image::Entity::find()
            .select_only()
            .column(post_image::Column::Filename)
            .filter(post_image::Column::PostId.eq(post_id))
            .into_tuple()
            .all(self.conn)
            .await?;
        let files: Vec<String> = post_attachment::Entity::find()
            .select_only()
            .column(post_attachment::Column::Filename)
            .filter(post_attachment::Column::PostId.eq(post_id))
            .into_tuple()
            .all(self.conn)
            .await?;
        post_image::Entity::delete_many()
            .filter(post_image::Column::PostId.eq(post_id))
            .exec(self.conn)
            .await?;
        post_attachment::Entity::delete_many()
            .filter(post_attachment::Column::PostId.eq(post_id))
            .exec(self.conn)
            .await?;

        let keys = images
            .into_iter()
            .map(|name| BlobKey::new(Bucket::Images, name))
            .chain(files.into_iter().map(|name| BlobKey::new(Bucket::Files, name)));
        for key in keys {
            match key {
                Ok(key) => {
                    blob_store.delete(&key).await?;
                }
                // Nothing can be stored under an invalid name.
                Err(e) => tracing::warn!(post_id, error = %e, "Skipping invalid media name"),
            }
        }

        post::Entity::delete_by_id(post_id).exec(self.conn).await?;
        tracing::info!(post_id, "Post purged");
        Ok(())
    }

    /// Delete a comment and its likes. Returns the post it belonged to.
    pub async fn delete_comment(&self, comment_id: i32) -> Result<i32, AppError> {
        let found = comment::Entity::find_by_id(comment_id)
            .one(self.conn)
            .await?
            .ok_or_else(|| AppError::NotFound("Comment not found".into()))?;

        comment_like::Entity::delete_many()
            .filter(comment_like::Column::CommentId.eq(comment_id))
            .exec(self.conn)
            .await?;
        comment::Entity::delete_by_id(comment_id)
            .exec(self.conn)
            .await?;
        Ok(found.post_id)
    }

    /// Flip a user's posting permission.
    pub async fn toggle_posting(&self, user_id: i32) -> Result<user::Model, AppError> {
        let found = user::Entity::find_by_id(user_id)
            .one(self.conn)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".into()))?;

        let can_post = !found.can_post;
        let mut active: user::ActiveModel = found.into();
        active.can_post = Set(can_post);
        let updated = active.update(self.conn).await?;
        tracing::info!(user_id, can_post, "Posting permission changed");
        Ok(updated)
    }
}

pub async fn find_post<C: ConnectionTrait>(db: &C, id: i32) -> Result<post::Model, AppError> {
    post::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".into()))
}
