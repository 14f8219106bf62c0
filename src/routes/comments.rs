use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Duration;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::extractor::AuthUser;
use crate::autoreply;
use crate::db;
use crate::error::AppError;
use crate::moderation;
use crate::models::Comment;
use crate::state::SharedState;

use super::Pagination;

#[derive(Deserialize)]
pub struct CreateCommentRequest {
    pub content: String,
}

pub async fn create(
    State(state): State<SharedState>,
    auth: AuthUser,
    Path(post_id): Path<Uuid>,
    Json(req): Json<CreateCommentRequest>,
) -> Result<Json<Comment>, AppError> {
    if req.content.trim().is_empty() {
        return Err(AppError::BadRequest("Content is required".to_string()));
    }

    let post = db::posts::find_by_id(&state.pool, post_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

    let is_blocked = moderation::screen(&state.moderation, &req.content).await;

    // Blocked comments are stored anyway; analytics counts them.
    let comment =
        db::comments::create(&state.pool, post.id, auth.user_id, &req.content, is_blocked).await?;

    if is_blocked {
        return Err(AppError::BadRequest(
            "Comment contains inappropriate content.".to_string(),
        ));
    }

    let owner = db::users::find_by_id(&state.pool, post.owner_id).await?;
    if let Some(owner) = owner {
        if owner.auto_reply_enabled {
            let delay = Duration::seconds(owner.auto_reply_delay_secs.max(0));
            // Durable before the response goes out; a failed enqueue must not
            // fail the comment itself.
            if let Err(e) =
                autoreply::schedule_auto_reply(&state.pool, comment.id, post.id, owner.id, delay)
                    .await
            {
                tracing::error!("Failed to schedule auto-reply for comment {}: {e}", comment.id);
            }
        }
    }

    Ok(Json(comment))
}

pub async fn list(
    State(state): State<SharedState>,
    _auth: AuthUser,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Vec<Comment>>, AppError> {
    let (skip, limit) = pagination.clamped();
    let comments = db::comments::list(&state.pool, skip, limit).await?;
    Ok(Json(comments))
}

pub async fn list_by_post(
    State(state): State<SharedState>,
    _auth: AuthUser,
    Path(post_id): Path<Uuid>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Vec<Comment>>, AppError> {
    let (skip, limit) = pagination.clamped();
    let comments = db::comments::list_by_post(&state.pool, post_id, skip, limit).await?;
    Ok(Json(comments))
}
