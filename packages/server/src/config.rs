use std::path::PathBuf;

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Deserializer};

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Externally reachable base URL, used to build the OAuth redirect URI.
    pub public_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}
fn default_min_connections() -> u32 {
    1
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    /// Signs session tokens.
    pub secret_key: String,
    #[serde(default = "default_session_ttl_hours")]
    pub session_ttl_hours: i64,
}

fn default_session_ttl_hours() -> i64 {
    24 * 7
}

#[derive(Debug, Deserialize, Clone)]
pub struct IdentityConfig {
    pub client_id: String,
    pub client_secret: String,
    pub authorize_url: String,
    pub token_url: String,
    pub api_base_url: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ModerationConfig {
    /// External identities allowed to moderate. Accepts a TOML array or a
    /// comma-separated string (`CORKBOARD__MODERATION__MODERATOR_IDS=1,2`).
    #[serde(default, deserialize_with = "id_list")]
    pub moderator_ids: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PostingConfig {
    /// Whether newly created users may post before a moderator allows it.
    pub default_permission: bool,
    /// Maximum size of a single uploaded file, in bytes.
    pub max_upload_size: u64,
}

impl Default for PostingConfig {
    fn default() -> Self {
        Self {
            default_permission: false,
            max_upload_size: 16 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub upload_dir: PathBuf,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ReportConfig {
    pub webhook_url: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub identity: IdentityConfig,
    #[serde(default)]
    pub moderation: ModerationConfig,
    pub posting: PostingConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 5001)?
            .set_default("server.public_url", "http://127.0.0.1:5001")?
            .set_default("database.url", "sqlite://corkboard.db?mode=rwc")?
            .set_default("identity.client_id", "")?
            .set_default("identity.client_secret", "")?
            .set_default(
                "identity.authorize_url",
                "https://discord.com/oauth2/authorize",
            )?
            .set_default("identity.token_url", "https://discord.com/api/oauth2/token")?
            .set_default("identity.api_base_url", "https://discord.com/api")?
            .set_default("posting.default_permission", false)?
            .set_default("posting.max_upload_size", 16 * 1024 * 1024)?
            .set_default("storage.upload_dir", "./uploads")?
            // Load from config/config.toml
            .add_source(File::with_name("config/config").required(false))
            // Override from environment (e.g., CORKBOARD__AUTH__SECRET_KEY)
            .add_source(Environment::with_prefix("CORKBOARD").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

/// Deserialize either a list of ids or one comma-separated string of ids.
fn id_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        List(Vec<String>),
        Csv(String),
    }

    let ids = match Raw::deserialize(deserializer)? {
        Raw::List(ids) => ids,
        Raw::Csv(s) => s.split(',').map(str::to_string).collect(),
    };
    Ok(ids
        .into_iter()
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .collect())
}
