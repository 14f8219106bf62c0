use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::extractor::AuthUser;
use crate::db;
use crate::error::AppError;
use crate::moderation;
use crate::models::Post;
use crate::state::SharedState;

use super::Pagination;

#[derive(Deserialize)]
pub struct CreatePostRequest {
    pub title: String,
    pub content: String,
}

pub async fn create(
    State(state): State<SharedState>,
    auth: AuthUser,
    Json(req): Json<CreatePostRequest>,
) -> Result<Json<Post>, AppError> {
    if req.title.trim().is_empty() || req.content.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Title and content are required".to_string(),
        ));
    }

    let is_blocked = moderation::screen(&state.moderation, &req.title).await
        || moderation::screen(&state.moderation, &req.content).await;

    // Blocked posts are stored anyway; analytics counts them.
    let post = db::posts::create(&state.pool, &req.title, &req.content, auth.user_id, is_blocked)
        .await?;

    if is_blocked {
        return Err(AppError::BadRequest(
            "Post contains inappropriate content.".to_string(),
        ));
    }

    Ok(Json(post))
}

pub async fn list(
    State(state): State<SharedState>,
    _auth: AuthUser,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Vec<Post>>, AppError> {
    let (skip, limit) = pagination.clamped();
    let posts = db::posts::list(&state.pool, skip, limit).await?;
    Ok(Json(posts))
}

pub async fn get(
    State(state): State<SharedState>,
    _auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Post>, AppError> {
    let post = db::posts::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

    Ok(Json(post))
}
