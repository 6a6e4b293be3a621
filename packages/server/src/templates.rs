//! Askama page templates.

use askama::Template;
use axum::response::{Html, IntoResponse, Response};
use axum_extra::extract::cookie::CookieJar;

use crate::error::AppError;
use crate::extractors::auth::AuthUser;
use crate::models::post::{CommentView, PostSort, PostSummary};
use crate::models::shared::Pagination;

/// Who is looking at the page.
pub struct Viewer {
    pub username: String,
    pub avatar_url: String,
    pub is_moderator: bool,
    pub can_post: bool,
}

impl From<&AuthUser> for Viewer {
    fn from(auth: &AuthUser) -> Self {
        Self {
            username: auth.user.username.clone(),
            avatar_url: auth.avatar_url(),
            is_moderator: auth.is_moderator,
            can_post: auth.user.can_post,
        }
    }
}

/// A sort choice offered above listings.
pub struct SortOption {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

pub fn sort_options(current: PostSort) -> Vec<SortOption> {
    [
        (PostSort::Newest, "Newest"),
        (PostSort::Oldest, "Oldest"),
        (PostSort::MostLiked, "Most liked"),
        (PostSort::MostCommented, "Most commented"),
    ]
    .into_iter()
    .map(|(sort, label)| SortOption {
        value: sort.as_str(),
        label,
        selected: sort == current,
    })
    .collect()
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub viewer: Option<Viewer>,
    pub notice: Option<String>,
    pub posts: Vec<PostSummary>,
    pub pagination: Pagination,
    pub sort: &'static str,
    pub sorts: Vec<SortOption>,
}

#[derive(Template)]
#[template(path = "post.html")]
pub struct PostTemplate {
    pub viewer: Option<Viewer>,
    pub notice: Option<String>,
    pub post: PostSummary,
    pub comments: Vec<CommentView>,
    pub hidden: bool,
}

#[derive(Template)]
#[template(path = "tagged_posts.html")]
pub struct TaggedPostsTemplate {
    pub viewer: Option<Viewer>,
    pub notice: Option<String>,
    pub tag: String,
    pub posts: Vec<PostSummary>,
    pub pagination: Pagination,
    pub sort: &'static str,
    pub sorts: Vec<SortOption>,
}

pub struct UserRow {
    pub id: i32,
    pub username: String,
    pub avatar_url: String,
    pub can_post: bool,
    pub is_moderator: bool,
}

#[derive(Template)]
#[template(path = "moderation.html")]
pub struct ModerationTemplate {
    pub viewer: Option<Viewer>,
    pub notice: Option<String>,
    pub hidden_posts: Vec<PostSummary>,
    pub users: Vec<UserRow>,
}

impl IndexTemplate {
    pub fn new(
        viewer: Option<Viewer>,
        notice: Option<String>,
        posts: Vec<PostSummary>,
        pagination: Pagination,
        sort: PostSort,
    ) -> Self {
        Self {
            viewer,
            notice,
            posts,
            pagination,
            sort: sort.as_str(),
            sorts: sort_options(sort),
        }
    }
}

/// Render a page. `jar` carries the removal of the notice shown on it.
pub fn render_page<T: Template>(jar: CookieJar, page: T) -> Result<Response, AppError> {
    Ok((jar, Html(page.render()?)).into_response())
}
