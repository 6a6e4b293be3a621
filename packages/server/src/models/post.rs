use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::post::PostState;
use crate::error::AppError;

use super::shared::Pagination;

/// Query parameters for post listings.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PostListQuery {
    #[param(example = 1)]
    pub page: Option<u64>,
    #[param(example = 20)]
    pub per_page: Option<u64>,
    /// Sort order: `newest` (default), `oldest`, `most_liked`, `most_commented`.
    #[param(example = "newest")]
    pub sort: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PostSort {
    #[default]
    Newest,
    Oldest,
    MostLiked,
    MostCommented,
}

impl PostSort {
    pub fn parse(value: Option<&str>) -> Result<Self, AppError> {
        match value.map(str::trim) {
            None | Some("") | Some("newest") => Ok(PostSort::Newest),
            Some("oldest") => Ok(PostSort::Oldest),
            Some("most_liked") => Ok(PostSort::MostLiked),
            Some("most_commented") => Ok(PostSort::MostCommented),
            Some(_) => Err(AppError::Validation(
                "sort must be one of: newest, oldest, most_liked, most_commented".into(),
            )),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PostSort::Newest => "newest",
            PostSort::Oldest => "oldest",
            PostSort::MostLiked => "most_liked",
            PostSort::MostCommented => "most_commented",
        }
    }
}

/// Validated listing parameters.
#[derive(Clone, Copy, Debug)]
pub struct ListParams {
    pub page: u64,
    pub per_page: u64,
    pub sort: PostSort,
}

impl ListParams {
    /// Rows to skip for this page. `None` when the page lies beyond anything
    /// SQL `OFFSET` can address.
    pub fn offset(&self) -> Option<u64> {
        (self.page - 1)
            .checked_mul(self.per_page)
            .filter(|offset| i64::try_from(*offset).is_ok())
    }
}

impl TryFrom<&PostListQuery> for ListParams {
    type Error = AppError;

    fn try_from(query: &PostListQuery) -> Result<Self, Self::Error> {
        Ok(Self {
            page: Ord::max(query.page.unwrap_or(1), 1),
            per_page: query.per_page.unwrap_or(20).clamp(1, 100),
            sort: PostSort::parse(query.sort.as_deref())?,
        })
    }
}

#[derive(Clone, Debug, Serialize, utoipa::ToSchema)]
pub struct AuthorView {
    #[schema(example = 1)]
    pub id: i32,
    #[schema(example = "wumpus")]
    pub username: String,
    pub avatar_url: String,
}

#[derive(Clone, Debug, Serialize, utoipa::ToSchema)]
pub struct ImageView {
    /// Storage name of the image.
    pub filename: String,
    #[schema(example = "/uploads/images/3f2a..._cat.png")]
    pub url: String,
}

#[derive(Clone, Debug, Serialize, utoipa::ToSchema)]
pub struct AttachmentView {
    pub id: i32,
    /// Name the file had when it was uploaded.
    #[schema(example = "notes.pdf")]
    pub original_filename: String,
    pub content_type: Option<String>,
    /// Size in bytes.
    pub size: i64,
    pub url: String,
}

/// A post as shown in listings.
#[derive(Clone, Debug, Serialize, utoipa::ToSchema)]
pub struct PostSummary {
    #[schema(example = 1)]
    pub id: i32,
    #[schema(example = "Hello")]
    pub title: String,
    /// Raw body text.
    #[schema(example = "hello #world")]
    pub content: String,
    /// Body rendered as HTML with tag links.
    pub content_html: String,
    #[schema(value_type = String, example = "active")]
    pub state: PostState,
    pub author: AuthorView,
    pub like_count: u64,
    pub comment_count: u64,
    /// Whether the current viewer likes the post. Always false for anonymous viewers.
    pub liked: bool,
    pub images: Vec<ImageView>,
    pub attachments: Vec<AttachmentView>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, utoipa::ToSchema)]
pub struct CommentView {
    pub id: i32,
    pub content: String,
    pub author: AuthorView,
    pub like_count: u64,
    pub liked: bool,
    pub created_at: DateTime<Utc>,
}

/// A post with its comments, oldest comment first.
#[derive(Clone, Debug, Serialize, utoipa::ToSchema)]
pub struct PostDetail {
    pub post: PostSummary,
    pub comments: Vec<CommentView>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct PostListResponse {
    pub data: Vec<PostSummary>,
    pub pagination: Pagination,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct PostTagsResponse {
    #[schema(example = 1)]
    pub post_id: i32,
    /// Hashtags in order of appearance, duplicates preserved.
    #[schema(example = json!(["world", "world"]))]
    pub tags: Vec<String>,
}
