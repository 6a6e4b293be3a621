mod v1;

use axum::{
    Router,
    routing::{get, post},
};
use utoipa_axum::router::OpenApiRouter;

use crate::handlers;
use crate::state::AppState;

pub fn api_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().nest("/v1", v1::routes())
}

/// Server-rendered pages and form endpoints.
pub fn page_routes(max_upload_size: u64) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::pages::index))
        .route("/post/{id}", get(handlers::pages::view_post))
        .route("/tags/{tag}", get(handlers::pages::tagged_posts))
        .route("/moderation", get(handlers::pages::moderation))
        .merge(auth_routes())
        .merge(content_routes(max_upload_size))
        .merge(moderation_routes())
        .route("/uploads/images/{filename}", get(handlers::uploads::serve_image))
        .route("/uploads/files/{filename}", get(handlers::uploads::serve_file))
        .route("/report_bug", post(handlers::report::report_bug))
}

fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(handlers::auth::login))
        .route("/login/callback", get(handlers::auth::callback))
        .route("/logout", get(handlers::auth::logout))
}

fn content_routes(max_upload_size: u64) -> Router<AppState> {
    let create = Router::new()
        .route("/create", post(handlers::posts::create_post))
        .layer(handlers::posts::create_post_body_limit(max_upload_size));

    Router::new()
        .route("/post/{id}/comment", post(handlers::engagement::add_comment))
        .route("/post/{id}/like", post(handlers::engagement::like_post))
        .route("/comment/{id}/like", post(handlers::engagement::like_comment))
        .merge(create)
}

fn moderation_routes() -> Router<AppState> {
    Router::new()
        .route("/delete_post/{id}", post(handlers::moderation::delete_post))
        .route("/restore_post/{id}", post(handlers::moderation::restore_post))
        .route("/delete/{id}", post(handlers::moderation::purge_post))
        .route(
            "/delete_comment/{id}",
            post(handlers::moderation::delete_comment),
        )
        .route(
            "/toggle_post_permission/{id}",
            post(handlers::moderation::toggle_post_permission),
        )
}
