use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::cookie::CookieJar;
use sea_orm::EntityTrait;

use crate::entity::user;
use crate::error::AppError;
use crate::identity::avatar_url;
use crate::state::AppState;
use crate::utils::session::{self, SESSION_COOKIE};

/// Logged-in user, reloaded from the database on every request.
///
/// Add this as a handler parameter to require login. Unauthenticated
/// browsers are redirected to `/login`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: user::Model,
    pub is_moderator: bool,
}

impl AuthUser {
    pub fn id(&self) -> i32 {
        self.user.id
    }

    pub fn can_post(&self) -> bool {
        self.user.can_post
    }

    pub fn avatar_url(&self) -> String {
        avatar_url(
            &self.user.external_id,
            self.user.avatar.as_deref(),
            self.user.discriminator.as_deref(),
        )
    }

    /// Returns `Err(PermissionDenied)` unless the user moderates.
    pub fn require_moderator(&self) -> Result<(), AppError> {
        if self.is_moderator {
            Ok(())
        } else {
            Err(AppError::PermissionDenied)
        }
    }
}

/// Viewer of a public page: logged in or anonymous.
pub struct MaybeUser(pub Option<AuthUser>);

/// Resolve the session cookie into a user. `None` for a missing, invalid or
/// expired token, and for a token whose user no longer exists.
async fn resolve(parts: &Parts, state: &AppState) -> Result<Option<AuthUser>, AppError> {
    let jar = CookieJar::from_headers(&parts.headers);
    let Some(cookie) = jar.get(SESSION_COOKIE) else {
        return Ok(None);
    };
    let Ok(claims) = session::verify(&state.config.auth, cookie.value()) else {
        return Ok(None);
    };

    let user = user::Entity::find_by_id(claims.uid).one(&state.db).await?;
    Ok(user
        .filter(|u| u.external_id == claims.sub)
        .map(|user| AuthUser {
            is_moderator: state.policy.is_moderator(&user),
            user,
        }))
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        resolve(parts, state)
            .await?
            .ok_or(AppError::Unauthenticated)
    }
}

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(resolve(parts, state).await?))
    }
}
