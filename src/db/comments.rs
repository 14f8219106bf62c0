use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Comment, CommentDailyBreakdown};

pub async fn create(
    pool: &PgPool,
    post_id: Uuid,
    author_id: Uuid,
    content: &str,
    is_blocked: bool,
) -> Result<Comment, sqlx::Error> {
    sqlx::query_as::<_, Comment>(
        "INSERT INTO comments (post_id, author_id, content, is_blocked)
         VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(post_id)
    .bind(author_id)
    .bind(content)
    .bind(is_blocked)
    .fetch_one(pool)
    .await
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Comment>, sqlx::Error> {
    sqlx::query_as::<_, Comment>("SELECT * FROM comments WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn list(pool: &PgPool, skip: i64, limit: i64) -> Result<Vec<Comment>, sqlx::Error> {
    sqlx::query_as::<_, Comment>(
        "SELECT * FROM comments ORDER BY created_at DESC LIMIT $1 OFFSET $2",
    )
    .bind(limit)
    .bind(skip)
    .fetch_all(pool)
    .await
}

pub async fn list_by_post(
    pool: &PgPool,
    post_id: Uuid,
    skip: i64,
    limit: i64,
) -> Result<Vec<Comment>, sqlx::Error> {
    sqlx::query_as::<_, Comment>(
        "SELECT * FROM comments WHERE post_id = $1
         ORDER BY created_at ASC LIMIT $2 OFFSET $3",
    )
    .bind(post_id)
    .bind(limit)
    .bind(skip)
    .fetch_all(pool)
    .await
}

/// Per-UTC-day totals of comments and blocked comments in [start, end).
pub async fn daily_breakdown(
    pool: &PgPool,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<CommentDailyBreakdown>, sqlx::Error> {
    sqlx::query_as::<_, CommentDailyBreakdown>(
        "SELECT (created_at AT TIME ZONE 'UTC')::date AS date,
                COUNT(*) AS total_comments,
                COUNT(*) FILTER (WHERE is_blocked) AS blocked_comments
         FROM comments
         WHERE created_at >= $1 AND created_at < $2
         GROUP BY 1
         ORDER BY 1",
    )
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await
}
