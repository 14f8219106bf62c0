use sqlx::PgPool;
use uuid::Uuid;

use crate::models::Post;

pub async fn create(
    pool: &PgPool,
    title: &str,
    content: &str,
    owner_id: Uuid,
    is_blocked: bool,
) -> Result<Post, sqlx::Error> {
    sqlx::query_as::<_, Post>(
        "INSERT INTO posts (title, content, owner_id, is_blocked)
         VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(title)
    .bind(content)
    .bind(owner_id)
    .bind(is_blocked)
    .fetch_one(pool)
    .await
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Post>, sqlx::Error> {
    sqlx::query_as::<_, Post>("SELECT * FROM posts WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn list(pool: &PgPool, skip: i64, limit: i64) -> Result<Vec<Post>, sqlx::Error> {
    sqlx::query_as::<_, Post>(
        "SELECT * FROM posts ORDER BY created_at DESC LIMIT $1 OFFSET $2",
    )
    .bind(limit)
    .bind(skip)
    .fetch_all(pool)
    .await
}
