// Shared across several integration test binaries; not every helper is
// used by each one.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use replypost::config::{Config, SchedulerConfig};
use replypost::moderation::ProfanityClassifier;
use replypost::replygen::{GenerateError, ReplyGenerator};
use replypost::state::SharedState;

/// Word the mock classifier flags as profanity.
pub const BANNED_WORD: &str = "jabberwock";

/// Classifier stub: flags any text containing BANNED_WORD.
pub struct MockClassifier;

#[async_trait]
impl ProfanityClassifier for MockClassifier {
    async fn contains_profanity(&self, text: &str) -> Result<bool, String> {
        Ok(text.contains(BANNED_WORD))
    }
}

/// Scripted reply generator: fails transiently a fixed number of times,
/// or permanently forever, and counts calls.
pub struct MockGenerator {
    pub reply: String,
    transient_failures: AtomicUsize,
    permanent: bool,
    pub calls: AtomicUsize,
}

impl MockGenerator {
    pub fn succeeding(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            transient_failures: AtomicUsize::new(0),
            permanent: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_transient_failures(failures: usize, reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            transient_failures: AtomicUsize::new(failures),
            permanent: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn permanent_failure() -> Self {
        Self {
            reply: String::new(),
            transient_failures: AtomicUsize::new(0),
            permanent: true,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReplyGenerator for MockGenerator {
    async fn generate(&self, _post: &str, _comment: &str) -> Result<String, GenerateError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.permanent {
            return Err(GenerateError::Permanent("prompt rejected".to_string()));
        }

        let remaining = self.transient_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.transient_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(GenerateError::Transient("upstream timeout".to_string()));
        }

        Ok(self.reply.clone())
    }
}

/// A running test server instance with a dedicated test database.
pub struct TestApp {
    pub addr: SocketAddr,
    pub pool: PgPool,
    pub client: Client,
    pub db_name: String,
    pub state: SharedState,
    pub generator: Arc<MockGenerator>,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn register(&self, username: &str, email: &str, password: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url("/api/v1/auth/register"))
            .json(&json!({ "username": username, "email": email, "password": password }))
            .send()
            .await
            .expect("register request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    pub async fn login(&self, username: &str, password: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url("/api/v1/auth/login"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .expect("login request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Register a user and log in, returning the access token.
    pub async fn signup(&self, username: &str) -> String {
        let email = format!("{username}@test.com");
        let (body, status) = self.register(username, &email, "password123").await;
        assert_eq!(status, StatusCode::OK, "register failed: {body}");

        let (body, status) = self.login(username, "password123").await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        body["access_token"].as_str().unwrap().to_string()
    }

    pub async fn create_post(&self, token: &str, title: &str, content: &str) -> Value {
        let (body, status) = self
            .post_auth(
                "/api/v1/posts",
                token,
                &json!({ "title": title, "content": content }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "create post failed: {body}");
        body
    }

    pub async fn create_comment(&self, token: &str, post_id: &str, content: &str) -> (Value, StatusCode) {
        self.post_auth(
            &format!("/api/v1/posts/{post_id}/comments"),
            token,
            &json!({ "content": content }),
        )
        .await
    }

    pub async fn enable_auto_reply(&self, token: &str, delay_secs: i64) {
        let (body, status) = self
            .put_auth(
                "/api/v1/users/me/auto-reply",
                token,
                &json!({ "enabled": true, "delay_secs": delay_secs }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "enable auto-reply failed: {body}");
    }

    pub async fn get_auth(&self, path: &str, token: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("get request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    pub async fn post_auth(&self, path: &str, token: &str, body: &Value) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("post request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    pub async fn put_auth(&self, path: &str, token: &str, body: &Value) -> (Value, StatusCode) {
        let resp = self
            .client
            .put(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("put request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }
}

/// Spawn a test app whose reply generator always succeeds.
pub async fn spawn_app() -> TestApp {
    spawn_app_with(Arc::new(MockGenerator::succeeding("Thanks for reading!"))).await
}

/// Spawn a test app with a fresh temporary database and the given
/// scripted reply generator. The dispatcher thread is NOT started; tests
/// drive the queue with `worker::tick`.
pub async fn spawn_app_with(generator: Arc<MockGenerator>) -> TestApp {
    let _ = dotenvy::dotenv();

    let base_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for tests");

    let db_name = format!(
        "replypost_test_{}",
        Uuid::now_v7().to_string().replace('-', "")
    );

    // Connect to default postgres DB to create the scratch DB
    let admin_url = base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/postgres"))
        .unwrap_or_else(|| base_url.clone());

    let admin_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&admin_url)
        .await
        .expect("Failed to connect to postgres for test DB creation");

    sqlx::query(&format!("CREATE DATABASE \"{db_name}\""))
        .execute(&admin_pool)
        .await
        .expect("Failed to create test database");

    admin_pool.close().await;

    let test_url = base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/{db_name}"))
        .unwrap_or_else(|| base_url.clone());

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&test_url)
        .await
        .expect("Failed to connect to test database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations on test database");

    let config = Config {
        database_url: test_url,
        jwt_secret: "test-jwt-secret-that-is-long-enough".to_string(),
        host: "127.0.0.1".parse().unwrap(),
        port: 0, // unused, we bind to a random port
        max_body_size: 1_048_576,
        log_level: "warn".to_string(),
        scheduler: SchedulerConfig {
            poll_interval_secs: 1,
            batch_size: 10,
            max_attempts: 5,
            // Zero backoff so retried jobs are due again immediately
            retry_backoff_base_secs: 0,
            retry_backoff_cap_secs: 60,
            stale_claim_secs: 300,
            reply_timeout_secs: 5,
        },
        reply_api: None,
        moderation: None,
    };

    let (app, state) = replypost::build_app_with(
        pool.clone(),
        config,
        Some(Arc::new(MockClassifier)),
        generator.clone(),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app.into_make_service())
            .await
            .expect("Server failed");
    });

    let client = Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    TestApp {
        addr,
        pool,
        client,
        db_name,
        state,
        generator,
    }
}

/// Drop the test database after tests complete.
pub async fn cleanup(app: TestApp) {
    let db_name = app.db_name.clone();
    app.pool.close().await;

    let base_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for tests");
    let admin_url = base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/postgres"))
        .unwrap_or_else(|| base_url.clone());

    let admin_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&admin_url)
        .await
        .expect("Failed to connect for cleanup");

    let _ = sqlx::query(&format!("DROP DATABASE IF EXISTS \"{db_name}\" WITH (FORCE)"))
        .execute(&admin_pool)
        .await;

    admin_pool.close().await;
}
