pub mod config;
pub mod error;
pub mod state;
pub mod auth;
pub mod db;
pub mod models;
pub mod routes;
pub mod moderation;
pub mod replygen;
pub mod autoreply;
pub mod worker;
pub mod rate_limit;

use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue};
use axum::Router;
use sqlx::PgPool;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::moderation::{HttpProfanityClassifier, ProfanityClassifier};
use crate::rate_limit::LoginRateLimiter;
use crate::replygen::{HttpReplyGenerator, ReplyGenerator, UnconfiguredReplyGenerator};
use crate::state::{AppState, SharedState};

/// Build the application router and shared state, constructing the HTTP
/// clients for the external classifier and reply generator from config.
pub fn build_app(pool: PgPool, config: Config) -> (Router, SharedState) {
    let moderation: Option<Arc<dyn ProfanityClassifier>> = match &config.moderation {
        Some(cfg) => Some(Arc::new(HttpProfanityClassifier::new(cfg))),
        None => {
            tracing::warn!("Moderation API not configured; profanity screening disabled");
            None
        }
    };

    let replygen: Arc<dyn ReplyGenerator> = match &config.reply_api {
        Some(cfg) => Arc::new(HttpReplyGenerator::new(
            cfg,
            std::time::Duration::from_secs(config.scheduler.reply_timeout_secs),
        )),
        None => {
            tracing::warn!("Reply API not configured; auto-reply jobs will fail");
            Arc::new(UnconfiguredReplyGenerator)
        }
    };

    build_app_with(pool, config, moderation, replygen)
}

/// Build the router with explicitly supplied external-service clients.
/// Tests use this to inject mock classifiers and generators.
pub fn build_app_with(
    pool: PgPool,
    config: Config,
    moderation: Option<Arc<dyn ProfanityClassifier>>,
    replygen: Arc<dyn ReplyGenerator>,
) -> (Router, SharedState) {
    let max_body_size = config.max_body_size;

    let state: SharedState = Arc::new(AppState {
        pool,
        config,
        moderation,
        replygen,
        login_limiter: LoginRateLimiter::new(),
    });

    let app = Router::new()
        .merge(routes::api_routes())
        .route("/health", axum::routing::get(health))
        .layer(RequestBodyLimitLayer::new(max_body_size))
        .layer(TraceLayer::new_for_http())
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-content-type-options"),
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-frame-options"),
            HeaderValue::from_static("DENY"),
        ))
        .with_state(state.clone());

    (app, state)
}

async fn health() -> &'static str {
    "ok"
}
