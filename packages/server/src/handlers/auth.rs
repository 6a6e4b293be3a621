use axum::extract::State;
use axum::response::Redirect;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use rand::Rng;
use serde::Deserialize;
use tracing::instrument;

use crate::error::AppError;
use crate::extractors::auth::AuthUser;
use crate::extractors::form::AppQuery;
use crate::services::account::AccountService;
use crate::state::AppState;
use crate::utils::session::{self, SESSION_COOKIE};

const STATE_COOKIE: &str = "oauth_state";

#[derive(Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
}

/// Start the login flow: remember a random `state` and send the browser to the provider.
#[instrument(skip(state, jar))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Redirect), AppError> {
    let nonce = hex::encode(rand::rng().random::<[u8; 16]>());
    let url = state
        .identity
        .authorize_url(&nonce)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    let cookie = Cookie::build((STATE_COOKIE, nonce))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax);
    Ok((jar.add(cookie), Redirect::to(&url)))
}

/// Finish the login flow. A provider failure changes nothing locally.
#[instrument(skip(state, jar, query))]
pub async fn callback(
    State(state): State<AppState>,
    jar: CookieJar,
    AppQuery(query): AppQuery<CallbackQuery>,
) -> Result<(CookieJar, Redirect), AppError> {
    let expected = jar.get(STATE_COOKIE).map(|c| c.value().to_string());
    match (expected.as_deref(), query.state.as_deref()) {
        (Some(expected), Some(got)) if !expected.is_empty() && expected == got => {}
        _ => return Err(AppError::Validation("Login state mismatch".into())),
    }
    let code = query
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::Validation("Missing authorization code".into()))?;

    let identity = state
        .identity
        .exchange(&code)
        .await
        .map_err(|e| AppError::Upstream(e.to_string()))?;

    let user = AccountService::new(&state.db)
        .upsert(&identity, state.config.posting.default_permission)
        .await?;

    let token = session::sign(&state.config.auth, user.id, &user.external_id)
        .map_err(|e| AppError::Internal(format!("Failed to sign session: {e}")))?;
    let cookie = Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax);

    tracing::info!(user_id = user.id, "User logged in");
    let jar = jar
        .remove(Cookie::build(STATE_COOKIE).path("/"))
        .add(cookie);
    Ok((jar, Redirect::to("/")))
}

#[instrument(skip(auth_user, jar), fields(user_id = auth_user.id()))]
pub async fn logout(auth_user: AuthUser, jar: CookieJar) -> (CookieJar, Redirect) {
    (
        jar.remove(Cookie::build(SESSION_COOKIE).path("/")),
        Redirect::to("/"),
    )
}
