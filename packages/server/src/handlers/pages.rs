use axum::extract::{Path, State};
use axum::response::Response;
use axum_extra::extract::cookie::CookieJar;
use sea_orm::{EntityTrait, QueryOrder};
use tracing::instrument;

use crate::entity::user;
use crate::error::AppError;
use crate::extractors::auth::{AuthUser, MaybeUser};
use crate::extractors::form::AppQuery;
use crate::identity::avatar_url;
use crate::models::post::{ListParams, PostListQuery};
use crate::services::feed::FeedService;
use crate::state::AppState;
use crate::templates::{
    IndexTemplate, ModerationTemplate, PostTemplate, TaggedPostsTemplate, UserRow, Viewer,
    render_page, sort_options,
};
use crate::utils::notice;

#[instrument(skip(state, viewer, jar, query))]
pub async fn index(
    MaybeUser(viewer): MaybeUser,
    State(state): State<AppState>,
    jar: CookieJar,
    AppQuery(query): AppQuery<PostListQuery>,
) -> Result<Response, AppError> {
    let params = ListParams::try_from(&query)?;
    let (posts, pagination) = FeedService::new(&state.db)
        .list(None, params, viewer.as_ref().map(AuthUser::id))
        .await?;

    let (jar, notice) = notice::take(jar);
    render_page(
        jar,
        IndexTemplate::new(
            viewer.as_ref().map(Viewer::from),
            notice,
            posts,
            pagination,
            params.sort,
        ),
    )
}

/// Hidden posts stay reachable by id and are shown with a banner.
#[instrument(skip(state, viewer, jar), fields(id))]
pub async fn view_post(
    MaybeUser(viewer): MaybeUser,
    State(state): State<AppState>,
    jar: CookieJar,
    Path(id): Path<i32>,
) -> Result<Response, AppError> {
    let detail = FeedService::new(&state.db)
        .detail(id, viewer.as_ref().map(AuthUser::id))
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".into()))?;

    let (jar, notice) = notice::take(jar);
    render_page(
        jar,
        PostTemplate {
            viewer: viewer.as_ref().map(Viewer::from),
            notice,
            hidden: !detail.post.state.is_listed(),
            post: detail.post,
            comments: detail.comments,
        },
    )
}

#[instrument(skip(state, viewer, jar, query), fields(tag))]
pub async fn tagged_posts(
    MaybeUser(viewer): MaybeUser,
    State(state): State<AppState>,
    jar: CookieJar,
    Path(tag): Path<String>,
    AppQuery(query): AppQuery<PostListQuery>,
) -> Result<Response, AppError> {
    let params = ListParams::try_from(&query)?;
    let (posts, pagination) = FeedService::new(&state.db)
        .list(Some(&tag), params, viewer.as_ref().map(AuthUser::id))
        .await?;

    let (jar, notice) = notice::take(jar);
    render_page(
        jar,
        TaggedPostsTemplate {
            viewer: viewer.as_ref().map(Viewer::from),
            notice,
            tag,
            posts,
            pagination,
            sort: params.sort.as_str(),
            sorts: sort_options(params.sort),
        },
    )
}

#[instrument(skip(state, auth_user, jar))]
pub async fn moderation(
    auth_user: AuthUser,
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    auth_user.require_moderator()?;

    let hidden_posts = FeedService::new(&state.db).hidden().await?;
    let users = user::Entity::find()
        .order_by_asc(user::Column::Username)
        .order_by_asc(user::Column::Id)
        .all(&state.db)
        .await?
        .into_iter()
        .map(|u| UserRow {
            id: u.id,
            avatar_url: avatar_url(&u.external_id, u.avatar.as_deref(), u.discriminator.as_deref()),
            can_post: u.can_post,
            is_moderator: state.policy.is_moderator(&u),
            username: u.username,
        })
        .collect();

    let (jar, notice) = notice::take(jar);
    render_page(
        jar,
        ModerationTemplate {
            viewer: Some(Viewer::from(&auth_user)),
            notice,
            hidden_posts,
            users,
        },
    )
}
