use chrono::{Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::db;
use crate::db::reply_jobs::JobStoreError;
use crate::models::reply_job::{AutoReplyPayload, ReplyJob, KIND_AUTO_REPLY};
use crate::replygen::GenerateError;
use crate::state::SharedState;

/// Result of executing one claimed job. The dispatcher maps this onto the
/// job store transitions (sent / retry / failed).
#[derive(Debug)]
pub enum JobOutcome {
    Sent(Uuid),
    Transient(String),
    Permanent(String),
}

/// Enqueue an auto-reply to fire no earlier than `delay` from now. Durable
/// once this returns; callers on the request path log failures instead of
/// propagating them.
pub async fn schedule_auto_reply(
    pool: &PgPool,
    comment_id: Uuid,
    post_id: Uuid,
    user_id: Uuid,
    delay: Duration,
) -> Result<ReplyJob, JobStoreError> {
    let payload = serde_json::to_value(AutoReplyPayload {
        comment_id,
        post_id,
        user_id,
    })
    .map_err(|e| JobStoreError::Validation(format!("payload serialization failed: {e}")))?;

    db::reply_jobs::enqueue(pool, KIND_AUTO_REPLY, &payload, Utc::now() + delay).await
}

/// Execute one claimed auto_reply job: re-fetch the referenced rows, call
/// the reply generator, and persist the generated comment as the post
/// owner. The comment and post are looked up fresh because either may have
/// been deleted since the job was enqueued.
pub async fn execute(state: &SharedState, job: &ReplyJob) -> JobOutcome {
    let payload: AutoReplyPayload = match serde_json::from_value(job.payload.clone()) {
        Ok(p) => p,
        Err(e) => return JobOutcome::Permanent(format!("invalid payload: {e}")),
    };

    let comment = match db::comments::find_by_id(&state.pool, payload.comment_id).await {
        Ok(Some(c)) => c,
        Ok(None) => return JobOutcome::Permanent("referenced comment missing".to_string()),
        Err(e) => return JobOutcome::Transient(format!("comment lookup failed: {e}")),
    };

    let post = match db::posts::find_by_id(&state.pool, payload.post_id).await {
        Ok(Some(p)) => p,
        Ok(None) => return JobOutcome::Permanent("referenced post missing".to_string()),
        Err(e) => return JobOutcome::Transient(format!("post lookup failed: {e}")),
    };

    let timeout = std::time::Duration::from_secs(state.config.scheduler.reply_timeout_secs);
    let text = match tokio::time::timeout(
        timeout,
        state.replygen.generate(&post.content, &comment.content),
    )
    .await
    {
        Ok(Ok(text)) => text,
        Ok(Err(GenerateError::Transient(msg))) => return JobOutcome::Transient(msg),
        Ok(Err(GenerateError::Permanent(msg))) => return JobOutcome::Permanent(msg),
        Err(_) => {
            return JobOutcome::Transient(format!(
                "reply generation timed out after {}s",
                timeout.as_secs()
            ));
        }
    };

    match db::comments::create(&state.pool, post.id, payload.user_id, &text, false).await {
        Ok(reply) => JobOutcome::Sent(reply.id),
        Err(e) => JobOutcome::Transient(format!("failed to store reply: {e}")),
    }
}
