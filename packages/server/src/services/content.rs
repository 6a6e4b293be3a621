//! Write side for regular users: posts, comments and likes.

use chrono::Utc;
use common::storage::{BlobKey, BlobStore, Bucket};
use sea_orm::{ActiveModelTrait, ConnectionTrait, DbErr, EntityTrait, Set};

use crate::entity::post::PostState;
use crate::entity::{comment, comment_like, post, post_attachment, post_image, post_like};
use crate::error::AppError;
use crate::utils::filename::storage_name;

/// Maximum title length, in characters.
pub const MAX_TITLE_CHARS: usize = 256;

/// A file received with a new post, already read into memory.
#[derive(Debug, Clone)]
pub struct NewUpload {
    pub original_filename: String,
    /// Media type declared by the client, if any.
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Image,
    File,
}

impl UploadKind {
    fn bucket(self) -> Bucket {
        match self {
            UploadKind::Image => Bucket::Images,
            UploadKind::File => Bucket::Files,
        }
    }
}

/// Raster formats shown inline. Anything else (HTML, SVG, ...) is only ever
/// offered as a download.
const INLINE_IMAGE_TYPES: [&str; 4] = ["image/png", "image/jpeg", "image/gif", "image/webp"];

/// Decide where an upload goes and which media type to record for it.
///
/// The declared type wins unless it is missing or the generic
/// `application/octet-stream`; then the type is guessed from the filename.
/// A file is an image only when that type is an inline raster type and the
/// filename's extension agrees with it.
pub fn classify(original_filename: &str, declared: Option<&str>) -> (UploadKind, Option<String>) {
    let declared = declared
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_ascii_lowercase());
    let content_type = match declared {
        Some(ct) if !ct.is_empty() && ct != "application/octet-stream" => Some(ct),
        _ => mime_guess::from_path(original_filename)
            .first()
            .map(|m| m.essence_str().to_string()),
    };

    let kind = match content_type.as_deref() {
        Some(ct)
            if INLINE_IMAGE_TYPES.contains(&ct)
                && mime_guess::from_path(original_filename)
                    .iter()
                    .any(|guess| guess.essence_str() == ct) =>
        {
            UploadKind::Image
        }
        _ => UploadKind::File,
    };
    (kind, content_type)
}

/// Why a new post was refused. Each maps to the notice shown to the author.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostRejection {
    NotAllowed,
    MissingTitle,
    Empty,
    TitleTooLong,
}

impl PostRejection {
    pub fn message(&self) -> &'static str {
        match self {
            PostRejection::NotAllowed => "You don't have permission to post.",
            PostRejection::MissingTitle => "Post needs a title!",
            PostRejection::Empty => "Post cannot be empty!",
            PostRejection::TitleTooLong => "Title must be at most 256 characters.",
        }
    }
}

/// Check a new post before anything is written. Order matters: the first
/// failing rule decides the notice.
pub fn validate_new_post(
    can_post: bool,
    title: &str,
    content: &str,
    file_count: usize,
) -> Result<(), PostRejection> {
    if !can_post {
        return Err(PostRejection::NotAllowed);
    }
    if title.trim().is_empty() {
        return Err(PostRejection::MissingTitle);
    }
    if content.trim().is_empty() && file_count == 0 {
        return Err(PostRejection::Empty);
    }
    if title.trim().chars().count() > MAX_TITLE_CHARS {
        return Err(PostRejection::TitleTooLong);
    }
    Ok(())
}

/// A post inserted but not yet committed, and the blobs written for it.
pub struct CreatedPost {
    pub post: post::Model,
    pub blobs: Vec<BlobKey>,
}

pub struct ContentService<'a, C: ConnectionTrait> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> ContentService<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    /// Insert a post and its media. Run inside a transaction: on error the
    /// caller rolls back, and any blob written so far has already been removed.
    pub async fn create_post(
        &self,
        blob_store: &dyn BlobStore,
        author_id: i32,
        title: &str,
        content: &str,
        uploads: Vec<NewUpload>,
    ) -> Result<CreatedPost, AppError> {
        let post = post::ActiveModel {
            title: Set(title.trim().to_string()),
            content: Set(content.to_string()),
            state: Set(PostState::Active),
            user_id: Set(author_id),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(self.conn)
        .await?;

        let mut blobs = Vec::with_capacity(uploads.len());
        for upload in uploads {
            if let Err(e) = self.store_upload(blob_store, post.id, upload, &mut blobs).await {
                discard_blobs(blob_store, &blobs).await;
                return Err(e);
            }
        }

        tracing::info!(post_id = post.id, files = blobs.len(), "Post created");
        Ok(CreatedPost { post, blobs })
    }

    async fn store_upload(
        &self,
        blob_store: &dyn BlobStore,
        post_id: i32,
        upload: NewUpload,
        written: &mut Vec<BlobKey>,
    ) -> Result<(), AppError> {
        let (kind, content_type) =
            classify(&upload.original_filename, upload.content_type.as_deref());
        let filename = storage_name(&upload.original_filename);
        let key = BlobKey::new(kind.bucket(), filename.clone())?;

        let size = blob_store.put(&key, &upload.bytes).await?;
        written.push(key);

        let now = Utc::now();
        match kind {
            UploadKind::Image => {
                post_image::ActiveModel {
                    filename: Set(filename),
                    content_type: Set(content_type.unwrap_or_default()),
                    post_id: Set(post_id),
                    created_at: Set(now),
                    ..Default::default()
                }
                .insert(self.conn)
                .await?;
            }
            UploadKind::File => {
                post_attachment::ActiveModel {
                    filename: Set(filename),
                    original_filename: Set(upload.original_filename),
                    content_type: Set(content_type),
                    size: Set(i64::try_from(size).unwrap_or(i64::MAX)),
                    post_id: Set(post_id),
                    created_at: Set(now),
                    ..Default::default()
                }
                .insert(self.conn)
                .await?;
            }
        }
        Ok(())
    }

    /// Add a comment to an existing post.
    pub async fn add_comment(
        &self,
        post_id: i32,
        author_id: i32,
        content: &str,
    ) -> Result<comment::Model, DbErr> {
        comment::ActiveModel {
            content: Set(content.trim().to_string()),
            post_id: Set(post_id),
            user_id: Set(author_id),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(self.conn)
        .await
    }

    /// Flip the user's like on a post. Returns whether the post is now liked.
    pub async fn toggle_post_like(&self, post_id: i32, user_id: i32) -> Result<bool, DbErr> {
        let removed = post_like::Entity::delete_by_id((post_id, user_id))
            .exec(self.conn)
            .await?;
        if removed.rows_affected > 0 {
            return Ok(false);
        }

        post_like::Entity::insert(post_like::ActiveModel {
            post_id: Set(post_id),
            user_id: Set(user_id),
            created_at: Set(Utc::now()),
        })
        .exec_without_returning(self.conn)
        .await?;
        Ok(true)
    }

    /// Flip the user's like on a comment. Returns whether the comment is now liked.
    pub async fn toggle_comment_like(&self, comment_id: i32, user_id: i32) -> Result<bool, DbErr> {
        let removed = comment_like::Entity::delete_by_id((comment_id, user_id))
            .exec(self.conn)
            .await?;
        if removed.rows_affected > 0 {
            return Ok(false);
        }

        comment_like::Entity::insert(comment_like::ActiveModel {
            comment_id: Set(comment_id),
            user_id: Set(user_id),
            created_at: Set(Utc::now()),
        })
        .exec_without_returning(self.conn)
        .await?;
        Ok(true)
    }
}

/// Best-effort removal of blobs whose rows never got committed.
pub async fn discard_blobs(blob_store: &dyn BlobStore, keys: &[BlobKey]) {
    for key in keys {
        if let Err(e) = blob_store.delete(key).await {
            tracing::warn!(key = %key, error = %e, "Failed to remove orphaned blob");
        }
    }
}
