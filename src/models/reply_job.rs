use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const KIND_AUTO_REPLY: &str = "auto_reply";

/// Lifecycle of a deferred job. Stored as text; `pending` jobs whose
/// `next_run_at` has passed are claimable, `sent` and `failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    InFlight,
    Sent,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::InFlight => "in_flight",
            JobStatus::Sent => "sent",
            JobStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReplyJob {
    pub id: Uuid,
    pub kind: String,
    pub payload: serde_json::Value,
    pub status: String,
    pub attempt_count: i32,
    pub not_before: DateTime<Utc>,
    pub next_run_at: DateTime<Utc>,
    pub last_error: Option<String>,
    pub result_comment_id: Option<Uuid>,
    pub claimed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Everything needed to execute an auto-reply, snapshotted at enqueue time.
/// `user_id` is the post owner who will author the generated reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoReplyPayload {
    pub comment_id: Uuid,
    pub post_id: Uuid,
    pub user_id: Uuid,
}
