use axum::extract::{Path, State};
use axum::response::Response;
use axum_extra::extract::cookie::CookieJar;
use sea_orm::TransactionTrait;
use tracing::instrument;

use crate::entity::post::ModerationAction;
use crate::error::AppError;
use crate::extractors::auth::AuthUser;
use crate::services::moderation::ModerationService;
use crate::state::AppState;
use crate::utils::notice;

/// Soft delete. Non-moderators get a notice rather than an error page.
#[instrument(skip(state, auth_user, jar), fields(post_id, user_id = auth_user.id()))]
pub async fn delete_post(
    auth_user: AuthUser,
    State(state): State<AppState>,
    jar: CookieJar,
    Path(post_id): Path<i32>,
) -> Result<Response, AppError> {
    if !auth_user.is_moderator {
        return Ok(notice::redirect(jar, "You don't have permission to do that.", "/"));
    }

    let txn = state.db.begin().await?;
    ModerationService::new(&txn)
        .transition(post_id, ModerationAction::Hide)
        .await?;
    txn.commit().await?;

    Ok(notice::redirect(jar, "Post deleted.", "/"))
}

#[instrument(skip(state, auth_user, jar), fields(post_id, user_id = auth_user.id()))]
pub async fn restore_post(
    auth_user: AuthUser,
    State(state): State<AppState>,
    jar: CookieJar,
    Path(post_id): Path<i32>,
) -> Result<Response, AppError> {
    auth_user.require_moderator()?;

    let txn = state.db.begin().await?;
    ModerationService::new(&txn)
        .transition(post_id, ModerationAction::Restore)
        .await?;
    txn.commit().await?;

    Ok(notice::redirect(jar, "Post restored.", "/moderation"))
}

/// Hard delete: the post, its comments, likes and media are gone for good.
#[instrument(skip(state, auth_user, jar), fields(post_id, user_id = auth_user.id()))]
pub async fn purge_post(
    auth_user: AuthUser,
    State(state): State<AppState>,
    jar: CookieJar,
    Path(post_id): Path<i32>,
) -> Result<Response, AppError> {
    auth_user.require_moderator()?;

    let txn = state.db.begin().await?;
    ModerationService::new(&txn)
        .purge(post_id, &*state.blob_store)
        .await?;
    txn.commit().await?;

    Ok(notice::redirect(
        jar,
        "Post and media permanently deleted.",
        "/moderation",
    ))
}

#[instrument(skip(state, auth_user, jar), fields(comment_id, user_id = auth_user.id()))]
pub async fn delete_comment(
    auth_user: AuthUser,
    State(state): State<AppState>,
    jar: CookieJar,
    Path(comment_id): Path<i32>,
) -> Result<Response, AppError> {
    auth_user.require_moderator()?;

    let txn = state.db.begin().await?;
    let post_id = ModerationService::new(&txn)
        .delete_comment(comment_id)
        .await?;
    txn.commit().await?;

    Ok(notice::redirect(
        jar,
        "Comment deleted.",
        &format!("/post/{post_id}"),
    ))
}

#[instrument(skip(state, auth_user, jar), fields(target_id, user_id = auth_user.id()))]
pub async fn toggle_post_permission(
    auth_user: AuthUser,
    State(state): State<AppState>,
    jar: CookieJar,
    Path(target_id): Path<i32>,
) -> Result<Response, AppError> {
    auth_user.require_moderator()?;

    let txn = state.db.begin().await?;
    let target = ModerationService::new(&txn)
        .toggle_posting(target_id)
        .await?;
    txn.commit().await?;

    let verb = if target.can_post { "enabled" } else { "disabled" };
    Ok(notice::redirect(
        jar,
        &format!("Posting {verb} for {}.", target.username),
        "/moderation",
    ))
}
