//! `SqliteDatabase` is a concrete implementation of an auction engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the
//! [`crate::traits`] module.
use std::fmt::Debug;

use chrono::{Duration, Utc};
use log::*;
use sqlx::SqlitePool;

use super::db::{bids, conversations, db_url, jobs, new_pool, payments};
use crate::{
    db_types::{Bid, BidStatus, Job, JobStatus, NewBid, NewJob, NewPayment, Payment},
    helpers::{authz, skills},
    payment_objects::PaymentUpdate,
    traits::{
        AcceptedBid,
        AuctionApiError,
        AuctionDatabase,
        BidPlacement,
        EscrowApiError,
        EscrowDatabase,
        ANTI_SNIPE_WINDOW_SECS,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new connection pool against the URL in `BAE_DATABASE_URL`.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        Self::new_with_url(&url, max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl AuctionDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn insert_job(&self, job: NewJob) -> Result<Job, AuctionApiError> {
        if !job.budget_min.is_positive() || job.budget_max < job.budget_min {
            return Err(AuctionApiError::InvalidState(format!(
                "budget range {}–{} is not valid",
                job.budget_min, job.budget_max
            )));
        }
        let mut conn = self.pool.acquire().await?;
        let job = jobs::insert_job(job, &mut conn).await?;
        debug!("📦️ Job #{} posted by {} in category '{}'", job.id, job.customer_id, job.category);
        Ok(job)
    }

    async fn fetch_job(&self, job_id: i64) -> Result<Option<Job>, AuctionApiError> {
        let mut conn = self.pool.acquire().await?;
        Ok(jobs::fetch_job(job_id, &mut conn).await?)
    }

    async fn fetch_bid(&self, bid_id: i64) -> Result<Option<Bid>, AuctionApiError> {
        let mut conn = self.pool.acquire().await?;
        Ok(bids::fetch_bid(bid_id, &mut conn).await?)
    }

    /// The entire validation-and-write sequence runs inside one transaction whose first statement
    /// takes the write lock on the job row, so concurrent placements on the same job serialize.
    /// Early returns drop the transaction and roll everything back, including the lock touch.
    async fn place_bid(&self, new_bid: NewBid) -> Result<BidPlacement, AuctionApiError> {
        let mut tx = self.pool.begin().await?;
        let job =
            jobs::lock_job(new_bid.job_id, &mut tx).await?.ok_or(AuctionApiError::JobNotFound(new_bid.job_id))?;
        if !job.status.is_open() {
            return Err(AuctionApiError::InvalidState(format!(
                "job #{} is {} and not accepting bids",
                job.id, job.status
            )));
        }
        let now = Utc::now();
        if let Some(expires_at) = job.expires_at {
            if expires_at <= now {
                return Err(AuctionApiError::Expired);
            }
        }
        if !new_bid.amount.is_positive() {
            return Err(AuctionApiError::InvalidState("bid amount must be positive".to_string()));
        }
        if new_bid.amount > job.budget_max {
            return Err(AuctionApiError::BudgetExceeded);
        }
        if let Some(lowest) = job.lowest_bid {
            if new_bid.amount >= lowest {
                return Err(AuctionApiError::NotCompetitive);
            }
        }
        if bids::active_bid_exists(job.id, &new_bid.worker_id, &mut tx).await? {
            return Err(AuctionApiError::DuplicateBid);
        }
        if !new_bid.skills.is_empty() && !skills::matches_category(&new_bid.skills, &job.category) {
            return Err(AuctionApiError::SkillMismatch);
        }

        let bid = bids::insert_bid(&new_bid, &mut tx).await?;
        let mut expires_at = job.expires_at;
        let mut timer_extended = false;
        if let Some(deadline) = job.expires_at {
            let remaining = deadline - now;
            if remaining > Duration::zero() && remaining < Duration::seconds(ANTI_SNIPE_WINDOW_SECS) {
                expires_at = Some(now + Duration::seconds(ANTI_SNIPE_WINDOW_SECS));
                timer_extended = true;
                debug!("🔨️⏰️ Late bid on job #{}. Deadline pushed to {}", job.id, expires_at.unwrap());
            }
        }
        let status = if job.status == JobStatus::Posted { JobStatus::Bidding } else { job.status };
        let lowest_bid = Some(job.lowest_bid.map_or(new_bid.amount, |l| l.min(new_bid.amount)));
        let job = jobs::update_job_summary(job.id, job.bid_count + 1, lowest_bid, status, expires_at, &mut tx).await?;
        tx.commit().await?;
        debug!(
            "🔨️ Bid [{}] of {} placed on job #{}. {} active bids, lowest is {}",
            bid.id,
            bid.amount,
            job.id,
            job.bid_count,
            job.lowest_bid.unwrap_or_default()
        );
        Ok(BidPlacement { job, bid, timer_extended })
    }

    /// A sequence of idempotent writes guarded by the status compare-and-set, committed as one
    /// transaction. An interrupted acceptance can simply be retried.
    async fn accept_bid(&self, bid_id: i64, customer_id: &str) -> Result<AcceptedBid, AuctionApiError> {
        let mut tx = self.pool.begin().await?;
        let bid = bids::fetch_bid(bid_id, &mut tx).await?.ok_or(AuctionApiError::BidNotFound(bid_id))?;
        let job = jobs::fetch_job(bid.job_id, &mut tx).await?.ok_or(AuctionApiError::JobNotFound(bid.job_id))?;
        authz::job_owner(&job, customer_id).into_result().map_err(AuctionApiError::Forbidden)?;
        // A resolved auction rejects every acceptance except a retry of the one that won it.
        if !job.status.is_open() && job.accepted_bid_id != Some(bid.id) {
            return Err(AuctionApiError::AuctionClosed);
        }
        if bid.status.is_terminal() && bid.status != BidStatus::Accepted {
            return Err(AuctionApiError::InvalidState(format!(
                "bid {bid_id} is {} and cannot win the auction",
                bid.status
            )));
        }
        let job = match jobs::try_assign(job.id, &bid.worker_id, bid.id, &mut tx).await? {
            Some(job) => job,
            // The CAS failed. A retry of an acceptance that already went through is allowed to
            // re-apply the idempotent writes below; any other resolved job is a closed auction.
            None => jobs::fetch_job(bid.job_id, &mut tx)
                .await?
                .filter(|j| j.accepted_bid_id == Some(bid.id))
                .ok_or(AuctionApiError::AuctionClosed)?,
        };
        let winner = bids::update_bid_status(bid.id, BidStatus::Accepted, &mut tx).await?;
        let rejected = bids::reject_other_bids(job.id, bid.id, &mut tx).await?;
        let payment = payments::upsert_payment(&NewPayment::for_assignment(&job, &winner), &mut tx)
            .await
            .map_err(|e| AuctionApiError::DatabaseError(e.to_string()))?;
        let conversation =
            conversations::ensure_conversation(job.id, &job.customer_id, &winner.worker_id, &mut tx).await?;
        tx.commit().await?;
        info!(
            "🔨️🏆️ Bid [{}] by {} won job #{}. {} other bids rejected",
            winner.id,
            winner.worker_id,
            job.id,
            rejected.len()
        );
        Ok(AcceptedBid { job, winner, rejected, payment, conversation })
    }

    async fn withdraw_bid(&self, bid_id: i64, worker_id: &str) -> Result<Bid, AuctionApiError> {
        let mut tx = self.pool.begin().await?;
        let bid = bids::fetch_bid(bid_id, &mut tx).await?.ok_or(AuctionApiError::BidNotFound(bid_id))?;
        authz::bid_owner(&bid, worker_id).into_result().map_err(AuctionApiError::Forbidden)?;
        if bid.status != BidStatus::Pending {
            return Err(AuctionApiError::InvalidState(format!(
                "bid {bid_id} is {} and can no longer be withdrawn",
                bid.status
            )));
        }
        let bid = bids::update_bid_status(bid.id, BidStatus::Withdrawn, &mut tx).await?;
        // The withdrawn bid may have been the current lowest, so the summary is rebuilt from the
        // remaining active bids instead of patched incrementally.
        let job = jobs::recompute_summary(bid.job_id, &mut tx).await?;
        tx.commit().await?;
        debug!(
            "🔨️ Bid [{}] withdrawn from job #{}. {} active bids remain",
            bid.id, job.id, job.bid_count
        );
        Ok(bid)
    }

    async fn bids_for_job(&self, job_id: i64) -> Result<Vec<Bid>, AuctionApiError> {
        let mut conn = self.pool.acquire().await?;
        Ok(bids::bids_for_job(job_id, &mut conn).await?)
    }

    async fn bids_for_worker(&self, worker_id: &str) -> Result<Vec<Bid>, AuctionApiError> {
        let mut conn = self.pool.acquire().await?;
        Ok(bids::bids_for_worker(worker_id, &mut conn).await?)
    }

    async fn bid_rank(&self, bid_id: i64) -> Result<Option<i64>, AuctionApiError> {
        let mut conn = self.pool.acquire().await?;
        let bid = bids::fetch_bid(bid_id, &mut conn).await?.ok_or(AuctionApiError::BidNotFound(bid_id))?;
        Ok(bids::bid_rank(&bid, &mut conn).await?)
    }

    async fn expire_overdue_jobs(&self) -> Result<Vec<Job>, AuctionApiError> {
        let mut tx = self.pool.begin().await?;
        let expired = jobs::expire_overdue(Utc::now(), &mut tx).await?;
        let job_ids = expired.iter().map(|j| j.id).collect::<Vec<_>>();
        let n = bids::expire_pending_for_jobs(&job_ids, &mut tx).await?;
        tx.commit().await?;
        if !expired.is_empty() {
            info!("📦️⏰️ {} jobs and {n} pending bids swept to Expired", expired.len());
        }
        Ok(expired)
    }

    async fn close(&mut self) -> Result<(), AuctionApiError> {
        self.pool.close().await;
        Ok(())
    }
}

impl EscrowDatabase for SqliteDatabase {
    /// Writes commit through an explicit transaction so a pooled connection is never handed
    /// back mid-statement, which would leave it serving stale snapshots to later reads.
    async fn upsert_payment(&self, payment: NewPayment) -> Result<Payment, EscrowApiError> {
        let mut tx = self.pool.begin().await?;
        let payment = payments::upsert_payment(&payment, &mut tx).await?;
        tx.commit().await?;
        Ok(payment)
    }

    async fn fetch_payment_for_job(&self, job_id: i64) -> Result<Option<Payment>, EscrowApiError> {
        let mut conn = self.pool.acquire().await?;
        Ok(payments::fetch_payment_for_job(job_id, &mut conn).await?)
    }

    async fn payments_for_user(&self, user_id: &str) -> Result<Vec<Payment>, EscrowApiError> {
        let mut conn = self.pool.acquire().await?;
        Ok(payments::payments_for_user(user_id, &mut conn).await?)
    }

    async fn update_payment(&self, job_id: i64, update: PaymentUpdate) -> Result<Payment, EscrowApiError> {
        let mut tx = self.pool.begin().await?;
        let payment = payments::update_payment(job_id, update, &mut tx).await?;
        tx.commit().await?;
        payment.ok_or(EscrowApiError::PaymentNotFound(job_id))
    }
}
