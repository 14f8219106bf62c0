use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::reply_job::{AutoReplyPayload, JobStatus, ReplyJob, KIND_AUTO_REPLY};

/// Errors from the deferred-job store. `Validation` is a caller bug at
/// enqueue time; `NotFound` and `InvalidState` indicate misuse of the
/// mark operations and are never retried.
#[derive(Debug)]
pub enum JobStoreError {
    Validation(String),
    NotFound(Uuid),
    InvalidState { id: Uuid, status: String },
    Database(sqlx::Error),
}

impl std::fmt::Display for JobStoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStoreError::Validation(msg) => write!(f, "Validation: {msg}"),
            JobStoreError::NotFound(id) => write!(f, "Job {id} not found"),
            JobStoreError::InvalidState { id, status } => {
                write!(f, "Job {id} is '{status}', expected 'in_flight'")
            }
            JobStoreError::Database(err) => write!(f, "Database error: {err}"),
        }
    }
}

impl std::error::Error for JobStoreError {}

impl From<sqlx::Error> for JobStoreError {
    fn from(err: sqlx::Error) -> Self {
        JobStoreError::Database(err)
    }
}

/// Insert a new pending job. The payload is validated against the kind
/// before it is persisted, so a claimed job always deserializes.
pub async fn enqueue(
    pool: &PgPool,
    kind: &str,
    payload: &serde_json::Value,
    not_before: DateTime<Utc>,
) -> Result<ReplyJob, JobStoreError> {
    match kind {
        KIND_AUTO_REPLY => {
            serde_json::from_value::<AutoReplyPayload>(payload.clone())
                .map_err(|e| JobStoreError::Validation(format!("invalid auto_reply payload: {e}")))?;
        }
        other => {
            return Err(JobStoreError::Validation(format!(
                "unknown job kind: {other}"
            )));
        }
    }

    let job = sqlx::query_as::<_, ReplyJob>(
        "INSERT INTO reply_jobs (kind, payload, not_before, next_run_at)
         VALUES ($1, $2, $3, $3) RETURNING *",
    )
    .bind(kind)
    .bind(payload)
    .bind(not_before)
    .fetch_one(pool)
    .await?;

    Ok(job)
}

/// Atomically claim up to `limit` due pending jobs, moving them to
/// in_flight. SKIP LOCKED keeps concurrent claimants from ever receiving
/// overlapping jobs. The attempt counter ticks on claim, not on outcome.
pub async fn claim_due(
    pool: &PgPool,
    now: DateTime<Utc>,
    limit: i64,
) -> Result<Vec<ReplyJob>, JobStoreError> {
    let jobs = sqlx::query_as::<_, ReplyJob>(
        "UPDATE reply_jobs
         SET status = 'in_flight',
             attempt_count = attempt_count + 1,
             claimed_at = now(),
             updated_at = now()
         WHERE id IN (
             SELECT id FROM reply_jobs
             WHERE status = 'pending'
               AND next_run_at <= $1
             ORDER BY next_run_at ASC
             LIMIT $2
             FOR UPDATE SKIP LOCKED
         )
         RETURNING *",
    )
    .bind(now)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(jobs)
}

/// Terminal success: records the id of the reply comment that was created.
pub async fn mark_sent(
    pool: &PgPool,
    id: Uuid,
    result_comment_id: Uuid,
) -> Result<(), JobStoreError> {
    let updated = sqlx::query(
        "UPDATE reply_jobs
         SET status = 'sent', result_comment_id = $2, last_error = NULL, updated_at = now()
         WHERE id = $1 AND status = 'in_flight'",
    )
    .bind(id)
    .bind(result_comment_id)
    .execute(pool)
    .await?
    .rows_affected();

    require_transitioned(pool, id, updated).await
}

/// Put the job back in the queue with its next run pushed out by `backoff_secs`.
/// The schedule is computed on the caller's clock, the same one `claim_due`
/// compares against. The original not_before is untouched.
pub async fn mark_retry(
    pool: &PgPool,
    id: Uuid,
    backoff_secs: u64,
    error: &str,
) -> Result<(), JobStoreError> {
    let next_run = Utc::now() + chrono::Duration::seconds(backoff_secs as i64);
    let updated = sqlx::query(
        "UPDATE reply_jobs
         SET status = 'pending',
             last_error = $2,
             next_run_at = $3,
             claimed_at = NULL,
             updated_at = now()
         WHERE id = $1 AND status = 'in_flight'",
    )
    .bind(id)
    .bind(error)
    .bind(next_run)
    .execute(pool)
    .await?
    .rows_affected();

    require_transitioned(pool, id, updated).await
}

/// Terminal failure. The job is retained for operator inspection.
pub async fn mark_failed(pool: &PgPool, id: Uuid, reason: &str) -> Result<(), JobStoreError> {
    let updated = sqlx::query(
        "UPDATE reply_jobs
         SET status = 'failed', last_error = $2, updated_at = now()
         WHERE id = $1 AND status = 'in_flight'",
    )
    .bind(id)
    .bind(reason)
    .execute(pool)
    .await?
    .rows_affected();

    require_transitioned(pool, id, updated).await
}

async fn require_transitioned(pool: &PgPool, id: Uuid, updated: u64) -> Result<(), JobStoreError> {
    if updated > 0 {
        return Ok(());
    }
    match find_by_id(pool, id).await? {
        None => Err(JobStoreError::NotFound(id)),
        Some(job) => Err(JobStoreError::InvalidState {
            id,
            status: job.status,
        }),
    }
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<ReplyJob>, JobStoreError> {
    let job = sqlx::query_as::<_, ReplyJob>("SELECT * FROM reply_jobs WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(job)
}

pub async fn list_by_status(
    pool: &PgPool,
    status: JobStatus,
) -> Result<Vec<ReplyJob>, JobStoreError> {
    let jobs = sqlx::query_as::<_, ReplyJob>(
        "SELECT * FROM reply_jobs WHERE status = $1 ORDER BY created_at ASC",
    )
    .bind(status.as_str())
    .fetch_all(pool)
    .await?;
    Ok(jobs)
}

/// Orphan recovery: jobs left in_flight longer than the staleness threshold
/// belong to a crashed dispatcher and become claimable again. Returns how
/// many were released.
pub async fn release_stale(pool: &PgPool, older_than_secs: u64) -> Result<u64, JobStoreError> {
    let released = sqlx::query(
        "UPDATE reply_jobs
         SET status = 'pending', claimed_at = NULL, updated_at = now()
         WHERE status = 'in_flight'
           AND claimed_at < now() - make_interval(secs => $1::double precision)",
    )
    .bind(older_than_secs as f64)
    .execute(pool)
    .await?
    .rows_affected();

    Ok(released)
}
