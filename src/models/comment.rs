use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub is_blocked: bool,
    pub created_at: DateTime<Utc>,
}

/// One row of the comments-daily-breakdown analytics query.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct CommentDailyBreakdown {
    pub date: NaiveDate,
    pub total_comments: i64,
    pub blocked_comments: i64,
}
