//! Integration tests for the durable job queue.
//!
//! Exercises `JobRepo` against a real SQLite database to verify that:
//! - Jobs are claimed in submission order, each exactly once
//! - Terminal transitions only apply to active jobs
//! - Interrupted jobs are failed on recovery
//! - Old terminal jobs are purged, live ones are kept

use assert_matches::assert_matches;
use chrono::{Duration, Utc};
use prodshot_core::job::JobResult;
use prodshot_core::request::GenerationRequest;
use prodshot_core::storage::StoredFile;
use prodshot_db::models::job::NewJob;
use prodshot_db::models::status::JobStatus;
use prodshot_db::repositories::JobRepo;
use sqlx::SqlitePool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn new_job(description: &str) -> NewJob {
    NewJob::new(format!("corr-{description}"), GenerationRequest::new(description))
}

fn sample_result() -> JobResult {
    JobResult {
        images: vec![StoredFile {
            url: "/images/1_abc_0.png".to_string(),
            filename: "1_abc_0.png".to_string(),
        }],
        prompt: "professional product photography of a mug".to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn enqueue_persists_waiting_job(pool: SqlitePool) {
    prodshot_db::health_check(&pool).await.unwrap();

    let input = new_job("ceramic mug");
    let job = JobRepo::enqueue(&pool, &input).await.unwrap();

    assert_eq!(job.id, input.id);
    assert_eq!(job.batch_id, input.batch_id);
    assert_eq!(job.batch_id.len(), prodshot_core::naming::BATCH_ID_LEN);
    assert_eq!(job.status(), Some(JobStatus::Waiting));
    assert_eq!(job.request().description, "ceramic mug");
    assert_eq!(job.attempts, 0);
    assert!(job.result().is_none());

    let found = JobRepo::find_by_id(&pool, input.id).await.unwrap().unwrap();
    assert_eq!(found.correlation_id, "corr-ceramic mug");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn claim_follows_submission_order(pool: SqlitePool) {
    let a = JobRepo::enqueue(&pool, &new_job("first")).await.unwrap();
    let b = JobRepo::enqueue(&pool, &new_job("second")).await.unwrap();
    let c = JobRepo::enqueue(&pool, &new_job("third")).await.unwrap();

    let claimed: Vec<_> = [
        JobRepo::claim_next(&pool).await.unwrap().unwrap(),
        JobRepo::claim_next(&pool).await.unwrap().unwrap(),
        JobRepo::claim_next(&pool).await.unwrap().unwrap(),
    ]
    .into_iter()
    .map(|job| job.id)
    .collect();

    assert_eq!(claimed, vec![a.id, b.id, c.id]);
    assert_matches!(JobRepo::claim_next(&pool).await, Ok(None));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn claim_marks_job_active(pool: SqlitePool) {
    JobRepo::enqueue(&pool, &new_job("lamp")).await.unwrap();
    let job = JobRepo::claim_next(&pool).await.unwrap().unwrap();

    assert_eq!(job.status(), Some(JobStatus::Active));
    assert_eq!(job.attempts, 1);
    assert!(job.started_at.is_some());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn concurrent_claims_never_share_a_job(pool: SqlitePool) {
    for i in 0..10 {
        JobRepo::enqueue(&pool, &new_job(&format!("item {i}"))).await.unwrap();
    }

    let mut handles = Vec::new();
    for _ in 0..4 {
        let pool = pool.clone();
        handles.push(tokio::spawn(async move {
            let mut ids = Vec::new();
            while let Some(job) = JobRepo::claim_next(&pool).await.unwrap() {
                ids.push(job.id);
            }
            ids
        }));
    }

    let mut all = Vec::new();
    for handle in handles {
        all.extend(handle.await.unwrap());
    }
    let total = all.len();
    all.sort();
    all.dedup();
    assert_eq!(total, 10);
    assert_eq!(all.len(), 10);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn complete_stores_result_once(pool: SqlitePool) {
    let job = JobRepo::enqueue(&pool, &new_job("watch")).await.unwrap();

    // Not active yet.
    assert!(!JobRepo::complete(&pool, job.id, &sample_result()).await.unwrap());

    JobRepo::claim_next(&pool).await.unwrap();
    assert!(JobRepo::complete(&pool, job.id, &sample_result()).await.unwrap());
    assert!(!JobRepo::fail(&pool, job.id, "late failure").await.unwrap());

    let stored = JobRepo::find_by_id(&pool, job.id).await.unwrap().unwrap();
    assert_eq!(stored.status(), Some(JobStatus::Completed));
    assert_eq!(stored.result(), Some(&sample_result()));
    assert!(stored.error_message.is_none());
    assert!(stored.completed_at.is_some());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn fail_stores_message(pool: SqlitePool) {
    let job = JobRepo::enqueue(&pool, &new_job("sofa")).await.unwrap();
    JobRepo::claim_next(&pool).await.unwrap();

    assert!(JobRepo::fail(&pool, job.id, "service unavailable").await.unwrap());

    let stored = JobRepo::find_by_id(&pool, job.id).await.unwrap().unwrap();
    assert_eq!(stored.status(), Some(JobStatus::Failed));
    assert_eq!(stored.error_message.as_deref(), Some("service unavailable"));
    assert!(stored.is_terminal());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn recovery_fails_only_active_jobs(pool: SqlitePool) {
    let active = JobRepo::enqueue(&pool, &new_job("one")).await.unwrap();
    let waiting = JobRepo::enqueue(&pool, &new_job("two")).await.unwrap();
    JobRepo::claim_next(&pool).await.unwrap();

    let recovered = JobRepo::recover_interrupted(&pool, "worker restarted").await.unwrap();
    assert_eq!(recovered, 1);

    let active = JobRepo::find_by_id(&pool, active.id).await.unwrap().unwrap();
    let waiting = JobRepo::find_by_id(&pool, waiting.id).await.unwrap().unwrap();
    assert_eq!(active.status(), Some(JobStatus::Failed));
    assert_matches!(active.error_message.as_deref(), Some("worker restarted"));
    assert_eq!(waiting.status(), Some(JobStatus::Waiting));
    assert_matches!(waiting.error_message, None);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn counts_and_listing(pool: SqlitePool) {
    let a = JobRepo::enqueue(&pool, &new_job("a")).await.unwrap();
    JobRepo::enqueue(&pool, &new_job("b")).await.unwrap();
    JobRepo::enqueue(&pool, &new_job("c")).await.unwrap();
    JobRepo::claim_next(&pool).await.unwrap();
    JobRepo::fail(&pool, a.id, "boom").await.unwrap();
    JobRepo::claim_next(&pool).await.unwrap();

    let counts = JobRepo::count_by_status(&pool).await.unwrap();
    assert_eq!((counts.waiting, counts.active, counts.failed), (1, 1, 1));
    assert_eq!(counts.completed, 0);

    let recent = JobRepo::list_recent(&pool, None, 2).await.unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].request().description, "c");

    let failed = JobRepo::list_recent(&pool, Some(JobStatus::Failed), 50).await.unwrap();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].id, a.id);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn purge_removes_only_old_terminal_jobs(pool: SqlitePool) {
    let done = JobRepo::enqueue(&pool, &new_job("done")).await.unwrap();
    JobRepo::claim_next(&pool).await.unwrap();
    JobRepo::complete(&pool, done.id, &sample_result()).await.unwrap();
    let waiting = JobRepo::enqueue(&pool, &new_job("waiting")).await.unwrap();

    // Cutoff in the past keeps everything.
    let purged = JobRepo::purge_terminal(&pool, Utc::now() - Duration::hours(1))
        .await
        .unwrap();
    assert_eq!(purged, 0);

    let purged = JobRepo::purge_terminal(&pool, Utc::now() + Duration::seconds(1))
        .await
        .unwrap();
    assert_eq!(purged, 1);
    assert!(JobRepo::find_by_id(&pool, done.id).await.unwrap().is_none());
    assert!(JobRepo::find_by_id(&pool, waiting.id).await.unwrap().is_some());
}
