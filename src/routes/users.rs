use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use crate::auth::extractor::AuthUser;
use crate::db;
use crate::error::AppError;
use crate::models::User;
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct AutoReplySettings {
    pub enabled: bool,
    pub delay_secs: i64,
}

pub async fn me(
    State(state): State<SharedState>,
    auth: AuthUser,
) -> Result<Json<User>, AppError> {
    let user = db::users::find_by_id(&state.pool, auth.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(user))
}

/// Enable or disable auto-reply on the caller's posts, with the delay
/// applied between a comment arriving and the generated reply.
pub async fn update_auto_reply(
    State(state): State<SharedState>,
    auth: AuthUser,
    Json(req): Json<AutoReplySettings>,
) -> Result<Json<User>, AppError> {
    if req.delay_secs < 0 {
        return Err(AppError::BadRequest(
            "delay_secs must not be negative".to_string(),
        ));
    }

    let user = db::users::update_auto_reply(&state.pool, auth.user_id, req.enabled, req.delay_secs)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(user))
}
