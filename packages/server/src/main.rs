use std::sync::Arc;
use std::time::Duration;

use common::storage::FilesystemBlobStore;
use corkboard::config::AppConfig;
use corkboard::database::init_db;
use corkboard::identity::DiscordProvider;
use corkboard::policy::ModeratorSet;
use corkboard::state::AppState;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::load()?;

    let db = init_db(&config.database).await?;
    info!("Database ready");

    let blob_store = FilesystemBlobStore::new(
        config.storage.upload_dir.clone(),
        config.posting.max_upload_size,
    )
    .await?;

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()?;
    let identity = DiscordProvider::new(http.clone(), config.identity.clone(), &config.server);

    if config.moderation.moderator_ids.is_empty() {
        warn!("No moderators configured; moderation pages are unreachable");
    }
    let policy = ModeratorSet::new(config.moderation.moderator_ids.clone());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState {
        db,
        config,
        blob_store: Arc::new(blob_store),
        identity: Arc::new(identity),
        policy: Arc::new(policy),
        http,
    };

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Corkboard listening on http://{addr}");
    axum::serve(listener, corkboard::build_router(state)).await?;

    Ok(())
}
