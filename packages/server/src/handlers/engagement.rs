use axum::extract::{Path, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::CookieJar;
use sea_orm::{EntityTrait, TransactionTrait};
use serde::Deserialize;
use tracing::instrument;

use crate::entity::comment;
use crate::error::AppError;
use crate::extractors::auth::AuthUser;
use crate::extractors::form::AppForm;
use crate::services::content::ContentService;
use crate::services::moderation::find_post;
use crate::state::AppState;
use crate::utils::notice;

#[derive(Deserialize)]
pub struct CommentForm {
    #[serde(default)]
    pub comment: String,
}

#[instrument(skip(state, auth_user, jar, form), fields(post_id, user_id = auth_user.id()))]
pub async fn add_comment(
    auth_user: AuthUser,
    State(state): State<AppState>,
    jar: CookieJar,
    Path(post_id): Path<i32>,
    AppForm(form): AppForm<CommentForm>,
) -> Result<Response, AppError> {
    let back = format!("/post/{post_id}");

    let txn = state.db.begin().await?;
    find_post(&txn, post_id).await?;

    if !auth_user.can_post() {
        return Ok(notice::redirect(jar, "You don't have permission to post.", &back));
    }
    if form.comment.trim().is_empty() {
        return Ok(notice::redirect(jar, "Comment cannot be empty.", &back));
    }

    ContentService::new(&txn)
        .add_comment(post_id, auth_user.id(), &form.comment)
        .await?;
    txn.commit().await?;

    Ok(Redirect::to(&back).into_response())
}

#[instrument(skip(state, auth_user), fields(post_id, user_id = auth_user.id()))]
pub async fn like_post(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<i32>,
) -> Result<Redirect, AppError> {
    let txn = state.db.begin().await?;
    find_post(&txn, post_id).await?;
    ContentService::new(&txn)
        .toggle_post_like(post_id, auth_user.id())
        .await?;
    txn.commit().await?;

    Ok(Redirect::to(&format!("/post/{post_id}")))
}

#[instrument(skip(state, auth_user), fields(comment_id, user_id = auth_user.id()))]
pub async fn like_comment(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(comment_id): Path<i32>,
) -> Result<Redirect, AppError> {
    let txn = state.db.begin().await?;
    let found = comment::Entity::find_by_id(comment_id)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Comment not found".into()))?;
    ContentService::new(&txn)
        .toggle_comment_like(comment_id, auth_user.id())
        .await?;
    txn.commit().await?;

    Ok(Redirect::to(&format!("/post/{}", found.post_id)))
}
