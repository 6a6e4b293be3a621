use std::sync::Arc;

use common::storage::BlobStore;
use sea_orm::DatabaseConnection;

use crate::config::AppConfig;
use crate::identity::IdentityProvider;
use crate::policy::AuthorizationPolicy;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: AppConfig,
    pub blob_store: Arc<dyn BlobStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub policy: Arc<dyn AuthorizationPolicy>,
    /// Outbound client for the bug-report webhook.
    pub http: reqwest::Client,
}
