//! Repository integration tests.
//!
//! These need a live Postgres with migrations applied; run them explicitly:
//!
//! ```text
//! DATABASE_URL=postgres://localhost/docpreview_test cargo test -p docpreview-db -- --ignored
//! ```

use docpreview_core::models::{ConversionJob, JobStatus, PreviewStatus};
use docpreview_core::StatusReporter;
use docpreview_db::{JobQueueRepository, PreviewRepository};
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

async fn test_pool() -> sqlx::PgPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for db tests");
    let pool = PgPoolOptions::new()
        .max_connections(4)
        .connect(&url)
        .await
        .expect("connect to test database");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("run migrations");
    pool
}

fn sample_job() -> ConversionJob {
    ConversionJob {
        document_id: Uuid::new_v4(),
        owner_id: Uuid::new_v4(),
        storage_key: "documents/relatorio.doc".to_string(),
        mime_type: "application/msword".to_string(),
        file_name: "relatorio.doc".to_string(),
    }
}

#[tokio::test]
#[ignore]
async fn enqueue_claim_complete_round_trip() {
    let pool = test_pool().await;
    let queue = JobQueueRepository::new(pool);

    let job = sample_job();
    let id = queue.enqueue(&job, 3).await.unwrap();

    let claimed = queue
        .claim_next_job()
        .await
        .unwrap()
        .expect("job should be claimable");
    assert_eq!(claimed.status, JobStatus::Running);
    let payload = claimed.conversion_job().unwrap();
    assert_eq!(payload.document_id, job.document_id);

    queue.mark_completed(claimed.id).await.unwrap();
    let row = queue.get_job(id).await.unwrap().unwrap();
    assert_eq!(row.status, JobStatus::Completed);
}

#[tokio::test]
#[ignore]
async fn retry_pushes_job_back_to_pending_with_backoff() {
    let pool = test_pool().await;
    let queue = JobQueueRepository::new(pool);

    let id = queue.enqueue(&sample_job(), 3).await.unwrap();
    let claimed = queue.claim_next_job().await.unwrap().unwrap();
    assert_eq!(claimed.id, id);

    queue.schedule_retry(id, 60, "renderer returned 500").await.unwrap();

    let row = queue.get_job(id).await.unwrap().unwrap();
    assert_eq!(row.status, JobStatus::Pending);
    assert_eq!(row.retry_count, 1);
    assert_eq!(row.last_error.as_deref(), Some("renderer returned 500"));
    // Backed off into the future; not claimable right now.
    assert!(row.scheduled_at > chrono::Utc::now());
}

#[tokio::test]
#[ignore]
async fn status_writes_are_exclusive_overwrites() {
    let pool = test_pool().await;
    let previews = PreviewRepository::new(pool);
    let document_id = Uuid::new_v4();

    previews.upsert_pending(document_id).await.unwrap();

    previews
        .mark_ready(document_id, "previews/abc.pdf", "http://store/previews/abc.pdf")
        .await
        .unwrap();
    let record = previews.get(document_id).await.unwrap().unwrap();
    assert_eq!(record.preview_status, PreviewStatus::Ready);
    assert!(record.preview_key.is_some());
    assert!(record.preview_error.is_none());

    previews.mark_error(document_id, "soffice exited 1").await.unwrap();
    let record = previews.get(document_id).await.unwrap().unwrap();
    assert_eq!(record.preview_status, PreviewStatus::Error);
    assert!(record.preview_key.is_none());
    assert!(record.preview_url.is_none());
    assert_eq!(record.preview_error.as_deref(), Some("soffice exited 1"));
}
