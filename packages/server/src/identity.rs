//! Third-party identity provider.
//!
//! The OAuth flow is hidden behind [`IdentityProvider`]: handlers only ever see
//! an authorization URL and, after the callback, an [`Identity`].

use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use thiserror::Error;

use crate::config::{IdentityConfig, ServerConfig};

const CDN_BASE: &str = "https://cdn.discordapp.com";

/// Identity and display attributes reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub external_id: String,
    pub username: String,
    pub avatar: Option<String>,
    pub discriminator: Option<String>,
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("provider rejected the request: {0}")]
    Rejected(String),
    #[error("provider request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid provider URL: {0}")]
    InvalidUrl(String),
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// URL the browser is sent to. `state` must come back unchanged on the callback.
    fn authorize_url(&self, state: &str) -> Result<String, IdentityError>;

    /// Trade an authorization code for the user's identity.
    async fn exchange(&self, code: &str) -> Result<Identity, IdentityError>;
}

/// Discord OAuth2 (authorization code grant, `identify` scope).
pub struct DiscordProvider {
    http: reqwest::Client,
    config: IdentityConfig,
    redirect_uri: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct DiscordUser {
    id: String,
    username: String,
    avatar: Option<String>,
    discriminator: Option<String>,
}

impl DiscordProvider {
    pub fn new(http: reqwest::Client, config: IdentityConfig, server: &ServerConfig) -> Self {
        let redirect_uri = format!("{}/login/callback", server.public_url.trim_end_matches('/'));
        Self {
            http,
            config,
            redirect_uri,
        }
    }
}

#[async_trait]
impl IdentityProvider for DiscordProvider {
    fn authorize_url(&self, state: &str) -> Result<String, IdentityError> {
        let url = Url::parse_with_params(
            &self.config.authorize_url,
            &[
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", "identify"),
                ("state", state),
            ],
        )
        .map_err(|e| IdentityError::InvalidUrl(e.to_string()))?;
        Ok(url.into())
    }

    async fn exchange(&self, code: &str) -> Result<Identity, IdentityError> {
        let token_response = self
            .http
            .post(&self.config.token_url)
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.redirect_uri.as_str()),
            ])
            .send()
            .await?;
        if !token_response.status().is_success() {
            return Err(IdentityError::Rejected(format!(
                "token endpoint returned {}",
                token_response.status()
            )));
        }
        let token: TokenResponse = token_response.json().await?;

        let me_url = format!("{}/users/@me", self.config.api_base_url.trim_end_matches('/'));
        let user_response = self
            .http
            .get(me_url)
            .bearer_auth(&token.access_token)
            .send()
            .await?;
        if !user_response.status().is_success() {
            return Err(IdentityError::Rejected(format!(
                "user endpoint returned {}",
                user_response.status()
            )));
        }
        let user: DiscordUser = user_response.json().await?;

        Ok(Identity {
            external_id: user.id,
            username: user.username,
            avatar: user.avatar,
            discriminator: user.discriminator,
        })
    }
}

/// Avatar image for a user.
///
/// Uses the uploaded avatar when the provider reported one, otherwise one of
/// the five default avatars picked by `discriminator % 5` (0 when unknown).
pub fn avatar_url(external_id: &str, avatar: Option<&str>, discriminator: Option<&str>) -> String {
    match avatar {
        Some(hash) if !hash.is_empty() => {
            format!("{CDN_BASE}/avatars/{external_id}/{hash}.png")
        }
        _ => {
            let index = discriminator
                .and_then(|d| d.parse::<u32>().ok())
                .map_or(0, |d| d % 5);
            format!("{CDN_BASE}/embed/avatars/{index}.png")
        }
    }
}
