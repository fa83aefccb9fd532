use bae_common::Money;
use chrono::{DateTime, Utc};
use log::trace;
use sqlx::SqliteConnection;

use crate::{
    db_types::{Job, JobStatus, NewJob},
    traits::AuctionApiError,
};

pub async fn insert_job(job: NewJob, conn: &mut SqliteConnection) -> Result<Job, AuctionApiError> {
    let job = sqlx::query_as(
        r#"
            INSERT INTO jobs (
                customer_id,
                title,
                category,
                budget_min,
                budget_max,
                currency,
                expires_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *;
        "#,
    )
    .bind(job.customer_id)
    .bind(job.title)
    .bind(job.category)
    .bind(job.budget_min)
    .bind(job.budget_max)
    .bind(job.currency)
    .bind(job.expires_at)
    .fetch_one(conn)
    .await?;
    Ok(job)
}

pub async fn fetch_job(job_id: i64, conn: &mut SqliteConnection) -> Result<Option<Job>, sqlx::Error> {
    let job = sqlx::query_as("SELECT * FROM jobs WHERE id = $1").bind(job_id).fetch_optional(conn).await?;
    Ok(job)
}

/// Fetches the job row while taking SQLite's write lock for the enclosing transaction. This is
/// the SQLite analogue of `SELECT … FOR UPDATE`: a second writer touching the same database
/// blocks until the transaction commits or rolls back, so bid placement on a job serializes.
pub async fn lock_job(job_id: i64, conn: &mut SqliteConnection) -> Result<Option<Job>, sqlx::Error> {
    let job = sqlx::query_as("UPDATE jobs SET updated_at = CURRENT_TIMESTAMP WHERE id = $1 RETURNING *")
        .bind(job_id)
        .fetch_optional(conn)
        .await?;
    Ok(job)
}

/// Writes the recalculated denormalised summary (and any status/deadline change) back to the job
/// row. Only called while the placement transaction holds the job lock.
pub async fn update_job_summary(
    job_id: i64,
    bid_count: i64,
    lowest_bid: Option<Money>,
    status: JobStatus,
    expires_at: Option<DateTime<Utc>>,
    conn: &mut SqliteConnection,
) -> Result<Job, AuctionApiError> {
    let job: Option<Job> = sqlx::query_as(
        r#"
            UPDATE jobs SET
                bid_count = $2,
                lowest_bid = $3,
                status = $4,
                expires_at = $5,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $1
            RETURNING *;
        "#,
    )
    .bind(job_id)
    .bind(bid_count)
    .bind(lowest_bid)
    .bind(status.to_string())
    .bind(expires_at)
    .fetch_optional(conn)
    .await?;
    job.ok_or(AuctionApiError::JobNotFound(job_id))
}

/// The `Posted/Bidding → Assigned` compare-and-set. Returns `None` when the job was already
/// resolved (the guard failed), which callers surface as `AuctionClosed`.
pub async fn try_assign(
    job_id: i64,
    worker_id: &str,
    bid_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<Job>, sqlx::Error> {
    let job = sqlx::query_as(
        r#"
            UPDATE jobs SET
                status = 'Assigned',
                assigned_worker_id = $2,
                accepted_bid_id = $3,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $1 AND status IN ('Posted', 'Bidding')
            RETURNING *;
        "#,
    )
    .bind(job_id)
    .bind(worker_id)
    .bind(bid_id)
    .fetch_optional(conn)
    .await?;
    Ok(job)
}

/// Recomputes `bid_count` and `lowest_bid` from the bids table. Used after a withdrawal, where
/// the incremental update would leave a stale summary behind.
pub async fn recompute_summary(job_id: i64, conn: &mut SqliteConnection) -> Result<Job, AuctionApiError> {
    let job: Option<Job> = sqlx::query_as(
        r#"
            UPDATE jobs SET
                bid_count = (
                    SELECT COUNT(*) FROM bids
                    WHERE job_id = $1 AND status IN ('Pending', 'Accepted', 'Outbid')
                ),
                lowest_bid = (
                    SELECT MIN(amount) FROM bids
                    WHERE job_id = $1 AND status IN ('Pending', 'Accepted', 'Outbid')
                ),
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $1
            RETURNING *;
        "#,
    )
    .bind(job_id)
    .fetch_optional(conn)
    .await?;
    job.ok_or(AuctionApiError::JobNotFound(job_id))
}

/// Flips open jobs whose deadline has passed to `Expired` and returns them.
pub async fn expire_overdue(now: DateTime<Utc>, conn: &mut SqliteConnection) -> Result<Vec<Job>, AuctionApiError> {
    let jobs: Vec<Job> = sqlx::query_as(
        r#"
            UPDATE jobs SET status = 'Expired', updated_at = CURRENT_TIMESTAMP
            WHERE status IN ('Posted', 'Bidding')
              AND expires_at IS NOT NULL
              AND expires_at <= $1
            RETURNING *;
        "#,
    )
    .bind(now)
    .fetch_all(conn)
    .await?;
    trace!("📦️ {} overdue jobs expired", jobs.len());
    Ok(jobs)
}
