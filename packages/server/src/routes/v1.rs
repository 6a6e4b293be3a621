use utoipa_axum::{router::OpenApiRouter, routes};

use crate::handlers::api;
use crate::state::AppState;

pub fn routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(api::list_posts))
        .routes(routes!(api::get_post))
        .routes(routes!(api::get_post_tags))
        .routes(routes!(api::list_tagged_posts))
}
