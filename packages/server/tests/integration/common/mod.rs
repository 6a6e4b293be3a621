use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{Json, Router, extract::State, http::StatusCode, routing::post};
use reqwest::{Client, header};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde_json::Value;
use tempfile::TempDir;

use common::storage::FilesystemBlobStore;
use corkboard::config::{
    AppConfig, AuthConfig, DatabaseConfig, IdentityConfig, ModerationConfig, PostingConfig,
    ReportConfig, ServerConfig, StorageConfig,
};
use corkboard::entity::{post, user};
use corkboard::identity::{Identity, IdentityError, IdentityProvider};
use corkboard::policy::ModeratorSet;
use corkboard::state::AppState;

pub const MODERATOR_ID: &str = "mod-1";

pub mod routes {
    pub const HOME: &str = "/";
    pub const LOGIN: &str = "/login";
    pub const LOGOUT: &str = "/logout";
    pub const CREATE: &str = "/create";
    pub const MODERATION: &str = "/moderation";
    pub const REPORT_BUG: &str = "/report_bug";
    pub const API_POSTS: &str = "/api/v1/posts";

    pub fn callback(code: &str, state: &str) -> String {
        format!("/login/callback?code={code}&state={state}")
    }

    pub fn post(id: i32) -> String {
        format!("/post/{id}")
    }

    pub fn comment(post_id: i32) -> String {
        format!("/post/{post_id}/comment")
    }

    pub fn like_post(id: i32) -> String {
        format!("/post/{id}/like")
    }

    pub fn like_comment(id: i32) -> String {
        format!("/comment/{id}/like")
    }

    pub fn tag(tag: &str) -> String {
        format!("/tags/{tag}")
    }

    pub fn soft_delete(id: i32) -> String {
        format!("/delete_post/{id}")
    }

    pub fn restore(id: i32) -> String {
        format!("/restore_post/{id}")
    }

    pub fn hard_delete(id: i32) -> String {
        format!("/delete/{id}")
    }

    pub fn delete_comment(id: i32) -> String {
        format!("/delete_comment/{id}")
    }

    pub fn toggle_permission(user_id: i32) -> String {
        format!("/toggle_post_permission/{user_id}")
    }

    pub fn api_post(id: i32) -> String {
        format!("/api/v1/posts/{id}")
    }

    pub fn api_post_tags(id: i32) -> String {
        format!("/api/v1/posts/{id}/tags")
    }

    pub fn api_tag(tag: &str) -> String {
        format!("/api/v1/tags/{tag}")
    }
}

/// Identity provider answering from a fixed table of authorization codes.
struct FixedIdentityProvider {
    identities: HashMap<&'static str, Identity>,
}

impl FixedIdentityProvider {
    fn new() -> Self {
        let identity = |id: &str, name: &str, avatar: Option<&str>, disc: Option<&str>| Identity {
            external_id: id.to_string(),
            username: name.to_string(),
            avatar: avatar.map(str::to_string),
            discriminator: disc.map(str::to_string),
        };
        let identities = HashMap::from([
            ("alice", identity("100", "alice", None, Some("1234"))),
            ("alice-renamed", identity("100", "alice2", Some("newhash"), None)),
            ("bob", identity("200", "bob", Some("bobhash"), None)),
            ("mod", identity(MODERATOR_ID, "moddy", None, None)),
        ]);
        Self { identities }
    }
}

#[async_trait]
impl IdentityProvider for FixedIdentityProvider {
    fn authorize_url(&self, state: &str) -> Result<String, IdentityError> {
        Ok(format!("https://id.example.test/authorize?state={state}"))
    }

    async fn exchange(&self, code: &str) -> Result<Identity, IdentityError> {
        self.identities
            .get(code)
            .cloned()
            .ok_or_else(|| IdentityError::Rejected(format!("unknown code {code}")))
    }
}

/// A running test server.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub db: DatabaseConnection,
    pub upload_dir: PathBuf,
    _dir: TempDir,
}

/// A logged-in browser.
pub struct Session {
    pub user_id: i32,
    cookie: String,
}

/// Parsed HTTP response for test assertions.
pub struct TestResponse {
    pub status: u16,
    /// Raw response body as text.
    pub text: String,
    /// Parsed JSON body, or `Null` if the response is not valid JSON.
    pub body: Value,
    pub location: Option<String>,
    pub headers: header::HeaderMap,
    /// `name=value` pairs from `Set-Cookie`, attributes stripped.
    pub cookies: Vec<(String, String)>,
}

impl TestResponse {
    async fn from_response(res: reqwest::Response) -> Self {
        let status = res.status().as_u16();
        let headers = res.headers().clone();
        let location = headers
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let cookies = headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(|v| v.split(';').next())
            .filter_map(|pair| pair.split_once('='))
            .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
            .collect();
        let text = res.text().await.unwrap_or_default();
        let body = serde_json::from_str(&text).unwrap_or(Value::Null);
        Self {
            status,
            text,
            body,
            location,
            headers,
            cookies,
        }
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// The one-shot notice set by this response, decoded.
    pub fn notice(&self) -> Option<String> {
        let raw = self.cookie("notice").filter(|v| !v.is_empty())?;
        String::from_utf8(hex::decode(raw).ok()?).ok()
    }

    pub fn assert_redirect(&self, to: &str) {
        assert_eq!(self.status, 303, "expected redirect, got: {}", self.text);
        assert_eq!(self.location.as_deref(), Some(to));
    }
}

fn test_config(dir: &TempDir) -> AppConfig {
    AppConfig {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            public_url: "http://127.0.0.1".to_string(),
        },
        database: DatabaseConfig {
            url: format!("sqlite://{}?mode=rwc", dir.path().join("test.db").display()),
            max_connections: 5,
            min_connections: 1,
        },
        auth: AuthConfig {
            secret_key: "test-secret-for-integration-tests".to_string(),
            session_ttl_hours: 1,
        },
        identity: IdentityConfig {
            client_id: "client".to_string(),
            client_secret: "secret".to_string(),
            authorize_url: "https://id.example.test/authorize".to_string(),
            token_url: "https://id.example.test/token".to_string(),
            api_base_url: "https://id.example.test/api".to_string(),
        },
        moderation: ModerationConfig {
            moderator_ids: vec![MODERATOR_ID.to_string()],
        },
        posting: PostingConfig {
            default_permission: false,
            max_upload_size: 1024 * 1024,
        },
        storage: StorageConfig {
            upload_dir: dir.path().join("uploads"),
        },
        report: ReportConfig { webhook_url: None },
    }
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(|_| {}).await
    }

    /// Spawn with a tweaked configuration.
    pub async fn spawn_with(configure: impl FnOnce(&mut AppConfig)) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let mut config = test_config(&dir);
        configure(&mut config);

        let db = corkboard::database::init_db(&config.database)
            .await
            .expect("Failed to initialize test database");
        let blob_store = FilesystemBlobStore::new(
            config.storage.upload_dir.clone(),
            config.posting.max_upload_size,
        )
        .await
        .expect("Failed to create blob store");
        let upload_dir = config.storage.upload_dir.clone();

        let state = AppState {
            db: db.clone(),
            blob_store: Arc::new(blob_store),
            identity: Arc::new(FixedIdentityProvider::new()),
            policy: Arc::new(ModeratorSet::new(config.moderation.moderator_ids.clone())),
            http: Client::new(),
            config,
        };

        let app = corkboard::build_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let client = Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("Failed to build client");

        Self {
            addr,
            client,
            db,
            upload_dir,
            _dir: dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    fn with_session(
        builder: reqwest::RequestBuilder,
        session: Option<&Session>,
    ) -> reqwest::RequestBuilder {
        match session {
            Some(s) => builder.header(header::COOKIE, &s.cookie),
            None => builder,
        }
    }

    pub async fn get(&self, path: &str, session: Option<&Session>) -> TestResponse {
        let res = Self::with_session(self.client.get(self.url(path)), session)
            .send()
            .await
            .expect("Failed to send GET request");
        TestResponse::from_response(res).await
    }

    pub async fn get_with_cookie(&self, path: &str, cookie: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .header(header::COOKIE, cookie)
            .send()
            .await
            .expect("Failed to send GET request");
        TestResponse::from_response(res).await
    }

    pub async fn post_form(
        &self,
        path: &str,
        form: &[(&str, &str)],
        session: Option<&Session>,
    ) -> TestResponse {
        let res = Self::with_session(self.client.post(self.url(path)).form(form), session)
            .send()
            .await
            .expect("Failed to send POST request");
        TestResponse::from_response(res).await
    }

    pub async fn post_multipart(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
        session: Option<&Session>,
    ) -> TestResponse {
        let res = Self::with_session(self.client.post(self.url(path)).multipart(form), session)
            .send()
            .await
            .expect("Failed to send multipart request");
        TestResponse::from_response(res).await
    }

    /// Run the login flow for one of the fixture authorization codes.
    pub async fn login(&self, code: &str) -> Session {
        let start = self.get(routes::LOGIN, None).await;
        assert_eq!(start.status, 303, "Login start failed: {}", start.text);
        let state = start
            .cookie("oauth_state")
            .expect("login must set the state cookie")
            .to_string();

        let res = self
            .get_with_cookie(
                &routes::callback(code, &state),
                &format!("oauth_state={state}"),
            )
            .await;
        res.assert_redirect("/");
        let token = res.cookie("session").expect("callback must set a session");

        let external_id = match code {
            "alice" | "alice-renamed" => "100",
            "bob" => "200",
            _ => MODERATOR_ID,
        };
        let user_id = self.user_by_external_id(external_id).await.id;

        Session {
            user_id,
            cookie: format!("session={token}"),
        }
    }

    pub async fn user_by_external_id(&self, external_id: &str) -> user::Model {
        user::Entity::find()
            .filter(user::Column::ExternalId.eq(external_id))
            .one(&self.db)
            .await
            .unwrap()
            .expect("user must exist")
    }

    pub async fn set_can_post(&self, session: &Session, can_post: bool) {
        let found = user::Entity::find_by_id(session.user_id)
            .one(&self.db)
            .await
            .unwrap()
            .unwrap();
        let mut active: user::ActiveModel = found.into();
        active.can_post = Set(can_post);
        active.update(&self.db).await.unwrap();
    }

    /// Log in and allow posting.
    pub async fn poster(&self, code: &str) -> Session {
        let session = self.login(code).await;
        self.set_can_post(&session, true).await;
        session
    }

    /// Create a text-only post and return its id.
    pub async fn create_post(&self, session: &Session, title: &str, content: &str) -> i32 {
        let form = reqwest::multipart::Form::new()
            .text("title", title.to_string())
            .text("content", content.to_string());
        let res = self.post_multipart(routes::CREATE, form, Some(session)).await;
        res.assert_redirect("/");
        assert_eq!(res.notice().as_deref(), Some("Post created."));
        self.latest_post().await.expect("post must exist").id
    }

    pub async fn latest_post(&self) -> Option<post::Model> {
        post::Entity::find()
            .order_by_desc(post::Column::Id)
            .one(&self.db)
            .await
            .unwrap()
    }

    pub async fn post_count(&self) -> u64 {
        post::Entity::find().count(&self.db).await.unwrap()
    }

    /// Number of stored files in an upload bucket directory.
    pub fn stored_files(&self, bucket: &str) -> usize {
        std::fs::read_dir(self.upload_dir.join(bucket))
            .map(|entries| entries.count())
            .unwrap_or(0)
    }
}

/// A webhook endpoint recording every JSON payload it receives.
pub struct WebhookSink {
    pub url: String,
    pub received: Arc<Mutex<Vec<Value>>>,
}

impl WebhookSink {
    pub async fn spawn(status: StatusCode) -> Self {
        let received = Arc::new(Mutex::new(Vec::new()));

        async fn record(
            State((received, status)): State<(Arc<Mutex<Vec<Value>>>, StatusCode)>,
            Json(payload): Json<Value>,
        ) -> StatusCode {
            received.lock().unwrap().push(payload);
            status
        }

        let app = Router::new()
            .route("/hook", post(record))
            .with_state((received.clone(), status));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind webhook sink");
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: format!("http://{addr}/hook"),
            received,
        }
    }

    pub fn payloads(&self) -> Vec<Value> {
        self.received.lock().unwrap().clone()
    }
}
