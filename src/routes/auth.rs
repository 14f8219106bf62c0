use axum::extract::State;
use axum::Json;
use axum_extra::extract::cookie::{Cookie, SameSite};
use axum_extra::extract::CookieJar;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::auth::jwt::Claims;
use crate::auth::password;
use crate::db;
use crate::error::AppError;
use crate::models::User;
use crate::state::SharedState;

const REFRESH_TTL_DAYS: i64 = 7;

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub refresh_token: String,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

fn session_cookie(name: &'static str, value: String, max_age: time::Duration) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .max_age(max_age)
        .build()
}

fn auth_cookies(access_token: &str, refresh_token: &str) -> CookieJar {
    CookieJar::new()
        .add(session_cookie(
            "access_token",
            access_token.to_string(),
            time::Duration::minutes(15),
        ))
        .add(session_cookie(
            "refresh_token",
            refresh_token.to_string(),
            time::Duration::days(REFRESH_TTL_DAYS),
        ))
}

fn clear_auth_cookies() -> CookieJar {
    CookieJar::new()
        .add(session_cookie("access_token", String::new(), time::Duration::ZERO))
        .add(session_cookie("refresh_token", String::new(), time::Duration::ZERO))
}

/// Refresh tokens are opaque random strings; only their SHA-256 digest is
/// stored server side.
fn new_refresh_token() -> String {
    let bytes: [u8; 32] = rand::random();
    hex::encode(bytes)
}

fn token_digest(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

async fn issue_tokens(
    state: &SharedState,
    user: &User,
) -> Result<(CookieJar, AuthResponse), AppError> {
    let access_token = Claims::for_user(user.id)
        .encode(&state.config.jwt_secret)
        .map_err(AppError::Internal)?;

    let refresh_token = new_refresh_token();
    db::refresh_tokens::store(
        &state.pool,
        user.id,
        &token_digest(&refresh_token),
        Duration::days(REFRESH_TTL_DAYS),
    )
    .await?;

    let jar = auth_cookies(&access_token, &refresh_token);
    Ok((
        jar,
        AuthResponse {
            access_token,
            token_type: "bearer",
            refresh_token,
        },
    ))
}

pub async fn register(
    State(state): State<SharedState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<User>, AppError> {
    if req.username.is_empty() || req.email.is_empty() || req.password.is_empty() {
        return Err(AppError::BadRequest("All fields are required".to_string()));
    }

    if req.password.len() < 8 {
        return Err(AppError::BadRequest(
            "Password must be at least 8 characters".to_string(),
        ));
    }

    if db::users::find_by_email(&state.pool, &req.email)
        .await?
        .is_some()
    {
        return Err(AppError::BadRequest("Email already registered".to_string()));
    }

    if db::users::find_by_username(&state.pool, &req.username)
        .await?
        .is_some()
    {
        return Err(AppError::BadRequest(
            "Username already registered".to_string(),
        ));
    }

    let pw_hash = password::hash(&req.password).map_err(AppError::Internal)?;

    let user = db::users::create(&state.pool, &req.username, &req.email, &pw_hash).await?;

    tracing::info!("Registered user {} ({})", user.username, user.id);

    Ok(Json(user))
}

pub async fn login(
    State(state): State<SharedState>,
    Json(req): Json<LoginRequest>,
) -> Result<(CookieJar, Json<AuthResponse>), AppError> {
    if state.login_limiter.is_limited(&req.username) {
        return Err(AppError::RateLimited(
            "Too many login attempts. Please try again later.".to_string(),
        ));
    }

    let user = db::users::find_by_username(&state.pool, &req.username)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Incorrect username or password".to_string()))?;

    let valid = password::verify(&req.password, &user.password_hash).map_err(AppError::Internal)?;

    if !valid {
        state.login_limiter.record_failure(&req.username);
        return Err(AppError::Unauthorized(
            "Incorrect username or password".to_string(),
        ));
    }

    if !user.is_active {
        return Err(AppError::Unauthorized("Inactive user".to_string()));
    }

    let (jar, body) = issue_tokens(&state, &user).await?;
    Ok((jar, Json(body)))
}

pub async fn refresh(
    State(state): State<SharedState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<AuthResponse>), AppError> {
    let presented = jar
        .get("refresh_token")
        .map(|c| c.value().to_string())
        .ok_or_else(|| AppError::Unauthorized("Missing refresh token".to_string()))?;

    let stored = db::refresh_tokens::lookup(&state.pool, &token_digest(&presented))
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid refresh token".to_string()))?;

    if stored.used {
        tracing::warn!(
            "Refresh token reuse detected for user {}. Revoking all sessions.",
            stored.user_id
        );
        db::refresh_tokens::revoke_all_for_user(&state.pool, stored.user_id).await?;
        return Err(AppError::Unauthorized(
            "Refresh token reuse detected. All sessions revoked.".to_string(),
        ));
    }

    if stored.expires_at < Utc::now() {
        return Err(AppError::Unauthorized("Refresh token expired".to_string()));
    }

    db::refresh_tokens::consume(&state.pool, stored.id).await?;

    let user = db::users::find_by_id(&state.pool, stored.user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".to_string()))?;

    let (new_jar, body) = issue_tokens(&state, &user).await?;
    Ok((new_jar, Json(body)))
}

pub async fn logout(
    State(state): State<SharedState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<MessageResponse>), AppError> {
    if let Some(cookie) = jar.get("refresh_token") {
        db::refresh_tokens::revoke(&state.pool, &token_digest(cookie.value())).await?;
    }

    Ok((
        clear_auth_cookies(),
        Json(MessageResponse {
            message: "Logged out successfully".to_string(),
        }),
    ))
}
