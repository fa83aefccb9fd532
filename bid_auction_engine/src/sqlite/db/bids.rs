use log::{debug, trace};
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db_types::{Bid, BidStatus, NewBid},
    traits::AuctionApiError,
};

pub async fn insert_bid(bid: &NewBid, conn: &mut SqliteConnection) -> Result<Bid, AuctionApiError> {
    let bid: Bid = sqlx::query_as(
        r#"
            INSERT INTO bids (
                job_id,
                worker_id,
                amount,
                message,
                estimated_duration_hours
            ) VALUES ($1, $2, $3, $4, $5)
            RETURNING *;
        "#,
    )
    .bind(bid.job_id)
    .bind(&bid.worker_id)
    .bind(bid.amount)
    .bind(&bid.message)
    .bind(bid.estimated_duration_hours)
    .fetch_one(conn)
    .await?;
    debug!("🔨️ Bid [{}] by {} saved against job #{}", bid.id, bid.worker_id, bid.job_id);
    Ok(bid)
}

pub async fn fetch_bid(bid_id: i64, conn: &mut SqliteConnection) -> Result<Option<Bid>, sqlx::Error> {
    let bid = sqlx::query_as("SELECT * FROM bids WHERE id = $1").bind(bid_id).fetch_optional(conn).await?;
    Ok(bid)
}

/// Whether the worker already has a live bid on the job. `Outbid` bids are still live; only
/// terminal bids free the slot up.
pub async fn active_bid_exists(job_id: i64, worker_id: &str, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let (count,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM bids WHERE job_id = $1 AND worker_id = $2 AND status IN ('Pending', 'Accepted', 'Outbid')",
    )
    .bind(job_id)
    .bind(worker_id)
    .fetch_one(conn)
    .await?;
    Ok(count > 0)
}

pub async fn update_bid_status(
    bid_id: i64,
    status: BidStatus,
    conn: &mut SqliteConnection,
) -> Result<Bid, AuctionApiError> {
    let result: Option<Bid> =
        sqlx::query_as("UPDATE bids SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *")
            .bind(status.to_string())
            .bind(bid_id)
            .fetch_optional(conn)
            .await?;
    result.ok_or(AuctionApiError::BidNotFound(bid_id))
}

/// Rejects every live bid on the job other than the winner. Idempotent: bids already rejected by
/// a previous attempt are simply not matched again.
pub async fn reject_other_bids(
    job_id: i64,
    winning_bid_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<Bid>, AuctionApiError> {
    let rejected: Vec<Bid> = sqlx::query_as(
        r#"
            UPDATE bids SET status = 'Rejected', updated_at = CURRENT_TIMESTAMP
            WHERE job_id = $1 AND id != $2 AND status IN ('Pending', 'Outbid')
            RETURNING *;
        "#,
    )
    .bind(job_id)
    .bind(winning_bid_id)
    .fetch_all(conn)
    .await?;
    trace!("🔨️ {} losing bids rejected on job #{job_id}", rejected.len());
    Ok(rejected)
}

/// All bids on the job, ordered for ranking: `(amount ASC, id ASC)`. Ids follow insertion
/// order, so equal amounts rank by earliest submission.
pub async fn bids_for_job(job_id: i64, conn: &mut SqliteConnection) -> Result<Vec<Bid>, sqlx::Error> {
    let bids = sqlx::query_as("SELECT * FROM bids WHERE job_id = $1 ORDER BY amount ASC, id ASC")
        .bind(job_id)
        .fetch_all(conn)
        .await?;
    Ok(bids)
}

pub async fn bids_for_worker(worker_id: &str, conn: &mut SqliteConnection) -> Result<Vec<Bid>, sqlx::Error> {
    let bids = sqlx::query_as("SELECT * FROM bids WHERE worker_id = $1 ORDER BY created_at DESC, id DESC")
        .bind(worker_id)
        .fetch_all(conn)
        .await?;
    Ok(bids)
}

/// 1-indexed rank of the bid among the job's active bids, ties broken by earliest submission.
/// Returns `None` when the bid itself is no longer active.
///
/// Row ids are assigned in insertion order, so `id` is the tie-break. `created_at` is not
/// comparable against bound parameters (the column default stores a different text format).
pub async fn bid_rank(bid: &Bid, conn: &mut SqliteConnection) -> Result<Option<i64>, sqlx::Error> {
    if !bid.status.is_active() {
        return Ok(None);
    }
    let (ahead,): (i64,) = sqlx::query_as(
        r#"
            SELECT COUNT(*) FROM bids
            WHERE job_id = $1
              AND status IN ('Pending', 'Accepted', 'Outbid')
              AND (amount < $2 OR (amount = $2 AND id < $3))
        "#,
    )
    .bind(bid.job_id)
    .bind(bid.amount)
    .bind(bid.id)
    .fetch_one(conn)
    .await?;
    Ok(Some(ahead + 1))
}

/// Expires the pending bids on the given jobs, as part of the overdue sweep.
pub async fn expire_pending_for_jobs(job_ids: &[i64], conn: &mut SqliteConnection) -> Result<u64, AuctionApiError> {
    if job_ids.is_empty() {
        return Ok(0);
    }
    let mut builder = QueryBuilder::new("UPDATE bids SET status = 'Expired', updated_at = CURRENT_TIMESTAMP ");
    builder.push("WHERE status = 'Pending' AND job_id IN (");
    let mut ids = builder.separated(", ");
    for id in job_ids {
        ids.push_bind(id);
    }
    builder.push(")");
    let result = builder.build().execute(conn).await?;
    Ok(result.rows_affected())
}
