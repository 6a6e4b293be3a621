//! Read-only JSON API. Public: no session is consulted, so `liked` is always false.

use axum::Json;
use axum::extract::{Path, State};
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::form::AppQuery;
use crate::models::post::{
    ListParams, PostDetail, PostListQuery, PostListResponse, PostTagsResponse,
};
use crate::services::feed::FeedService;
use crate::services::moderation::find_post;
use crate::state::AppState;
use crate::utils::hashtag::extract_tags;

#[utoipa::path(
    get,
    path = "/posts",
    tag = "Posts",
    operation_id = "listPosts",
    summary = "List active posts",
    description = "Returns a paginated list of active posts. Hidden posts are never listed.",
    params(PostListQuery),
    responses(
        (status = 200, description = "Paginated post list", body = PostListResponse),
        (status = 400, description = "Invalid query (VALIDATION_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, query))]
pub async fn list_posts(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<PostListQuery>,
) -> Result<Json<PostListResponse>, AppError> {
    let params = ListParams::try_from(&query)?;
    let (data, pagination) = FeedService::new(&state.db).list(None, params, None).await?;
    Ok(Json(PostListResponse { data, pagination }))
}

#[utoipa::path(
    get,
    path = "/posts/{id}",
    tag = "Posts",
    operation_id = "getPost",
    summary = "Get a post with its comments",
    description = "Hidden posts are returned too; check `state`.",
    params(("id" = i32, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Post details", body = PostDetail),
        (status = 404, description = "Post not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(id))]
pub async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<PostDetail>, AppError> {
    FeedService::new(&state.db)
        .detail(id, None)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Post not found".into()))
}

#[utoipa::path(
    get,
    path = "/posts/{id}/tags",
    tag = "Posts",
    operation_id = "getPostTags",
    summary = "Hashtags used in a post",
    params(("id" = i32, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Tags in order of appearance", body = PostTagsResponse),
        (status = 404, description = "Post not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(id))]
pub async fn get_post_tags(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<PostTagsResponse>, AppError> {
    let found = find_post(&state.db, id).await?;
    Ok(Json(PostTagsResponse {
        post_id: found.id,
        tags: extract_tags(&found.content),
    }))
}

#[utoipa::path(
    get,
    path = "/tags/{tag}",
    tag = "Tags",
    operation_id = "listTaggedPosts",
    summary = "List active posts mentioning a hashtag",
    description = "Case-insensitive substring match on `#tag` in the post body.",
    params(
        ("tag" = String, Path, description = "Tag without the leading `#`"),
        PostListQuery,
    ),
    responses(
        (status = 200, description = "Paginated post list", body = PostListResponse),
        (status = 400, description = "Invalid query (VALIDATION_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, query), fields(tag))]
pub async fn list_tagged_posts(
    State(state): State<AppState>,
    Path(tag): Path<String>,
    AppQuery(query): AppQuery<PostListQuery>,
) -> Result<Json<PostListResponse>, AppError> {
    let params = ListParams::try_from(&query)?;
    let (data, pagination) = FeedService::new(&state.db)
        .list(Some(&tag), params, None)
        .await?;
    Ok(Json(PostListResponse { data, pagination }))
}
