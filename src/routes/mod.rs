pub mod analytics;
pub mod auth;
pub mod comments;
pub mod posts;
pub mod users;

use axum::routing::{get, post, put};
use axum::Router;
use serde::Deserialize;

use crate::state::SharedState;

pub fn api_routes() -> Router<SharedState> {
    Router::new()
        // Auth
        .route("/api/v1/auth/register", post(auth::register))
        .route("/api/v1/auth/login", post(auth::login))
        .route("/api/v1/auth/refresh", post(auth::refresh))
        .route("/api/v1/auth/logout", post(auth::logout))
        // Users
        .route("/api/v1/users/me", get(users::me))
        .route("/api/v1/users/me/auto-reply", put(users::update_auto_reply))
        // Posts
        .route("/api/v1/posts", get(posts::list).post(posts::create))
        .route("/api/v1/posts/{id}", get(posts::get))
        // Comments
        .route(
            "/api/v1/posts/{id}/comments",
            get(comments::list_by_post).post(comments::create),
        )
        .route("/api/v1/comments", get(comments::list))
        // Analytics
        .route(
            "/api/v1/analytics/comments-daily",
            get(analytics::comments_daily),
        )
}

/// skip/limit listing parameters shared by the list endpoints.
#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    10
}

impl Pagination {
    pub fn clamped(&self) -> (i64, i64) {
        (self.skip.max(0), self.limit.clamp(1, 100))
    }
}
