use chrono::Utc;
use tokio::sync::watch;

use crate::autoreply::{self, JobOutcome};
use crate::db;
use crate::db::reply_jobs::JobStoreError;
use crate::models::reply_job::{ReplyJob, KIND_AUTO_REPLY};
use crate::state::SharedState;

/// Start the deferred-reply dispatcher on a dedicated Tokio runtime with
/// its own thread pool. One dispatcher runs per deployment; it blocks its
/// thread until shutdown is signaled and in-flight jobs have finished.
pub fn run_dispatcher(
    state: SharedState,
    shutdown: watch::Receiver<bool>,
) -> std::thread::JoinHandle<()> {
    std::thread::Builder::new()
        .name("reply-dispatcher".into())
        .spawn(move || {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .worker_threads(2)
                .thread_name("reply-worker")
                .enable_all()
                .build()
                .expect("Failed to build dispatcher runtime");

            runtime.block_on(run(state, shutdown));
        })
        .expect("Failed to spawn dispatcher thread")
}

async fn run(state: SharedState, mut shutdown: watch::Receiver<bool>) {
    tracing::info!("Reply dispatcher started");

    // Jobs a crashed predecessor left in_flight become claimable again.
    match db::reply_jobs::release_stale(&state.pool, state.config.scheduler.stale_claim_secs).await
    {
        Ok(0) => {}
        Ok(released) => tracing::warn!("Recovered {released} orphaned reply jobs"),
        Err(e) => tracing::error!("Orphan recovery failed: {e}"),
    }

    let poll_interval = std::time::Duration::from_secs(state.config.scheduler.poll_interval_secs);

    loop {
        if *shutdown.borrow() {
            break;
        }

        match tick(&state).await {
            // Backlog: claim again immediately instead of sleeping.
            Ok(n) if n > 0 => {
                tracing::debug!("Dispatched {n} reply jobs");
                continue;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!("Dispatch tick failed: {e}");
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(poll_interval) => {}
            _ = shutdown.changed() => {}
        }
    }

    tracing::info!("Reply dispatcher stopped");
}

/// Claim one batch of due jobs and execute them concurrently, waiting for
/// every job to reach a terminal or retry state before returning. Returns
/// the number of jobs processed.
pub async fn tick(state: &SharedState) -> Result<usize, JobStoreError> {
    let jobs = db::reply_jobs::claim_due(
        &state.pool,
        Utc::now(),
        state.config.scheduler.batch_size,
    )
    .await?;

    if jobs.is_empty() {
        return Ok(0);
    }

    let mut handles = Vec::with_capacity(jobs.len());
    for job in jobs {
        let state = state.clone();
        handles.push(tokio::spawn(process(state, job)));
    }

    let processed = handles.len();
    for handle in handles {
        let _ = handle.await;
    }

    Ok(processed)
}

/// Execute one claimed job and record its outcome. A failure here is
/// isolated to the job; the dispatch loop never stops because of it.
async fn process(state: SharedState, job: ReplyJob) {
    tracing::debug!(
        "Processing reply job {} (kind={}, attempt={})",
        job.id,
        job.kind,
        job.attempt_count
    );

    let outcome = match job.kind.as_str() {
        KIND_AUTO_REPLY => autoreply::execute(&state, &job).await,
        other => JobOutcome::Permanent(format!("unknown job kind: {other}")),
    };

    let result = match outcome {
        JobOutcome::Sent(comment_id) => {
            db::reply_jobs::mark_sent(&state.pool, job.id, comment_id).await
        }
        JobOutcome::Transient(reason) => {
            if job.attempt_count >= state.config.scheduler.max_attempts {
                tracing::error!(
                    "Reply job {} exhausted {} attempts: {reason}",
                    job.id,
                    job.attempt_count
                );
                db::reply_jobs::mark_failed(
                    &state.pool,
                    job.id,
                    &format!("retries exhausted: {reason}"),
                )
                .await
            } else {
                let backoff = backoff_secs(
                    job.attempt_count,
                    state.config.scheduler.retry_backoff_base_secs,
                    state.config.scheduler.retry_backoff_cap_secs,
                );
                tracing::debug!(
                    "Reply job {} attempt {} failed, retrying in {backoff}s: {reason}",
                    job.id,
                    job.attempt_count
                );
                db::reply_jobs::mark_retry(&state.pool, job.id, backoff, &reason).await
            }
        }
        JobOutcome::Permanent(reason) => {
            tracing::error!("Reply job {} failed permanently: {reason}", job.id);
            db::reply_jobs::mark_failed(&state.pool, job.id, &reason).await
        }
    };

    if let Err(e) = result {
        tracing::error!("Failed to record outcome for reply job {}: {e}", job.id);
    }
}

/// Exponential backoff: base * 2^(attempt - 1), capped.
pub fn backoff_secs(attempt: i32, base: u64, cap: u64) -> u64 {
    let exp = attempt.saturating_sub(1).clamp(0, 32) as u32;
    base.saturating_mul(2u64.saturating_pow(exp)).min(cap)
}
