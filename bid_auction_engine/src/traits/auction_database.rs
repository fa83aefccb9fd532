use thiserror::Error;

use crate::{
    db_types::{Bid, Job, NewBid, NewJob},
    traits::{AcceptedBid, BidPlacement},
};

/// A bid arriving with less than this many seconds left on the clock pushes the deadline out to
/// `now + ANTI_SNIPE_WINDOW_SECS`, guaranteeing competitors a minimum reaction window.
pub const ANTI_SNIPE_WINDOW_SECS: i64 = 120;

/// The storage contract for the auction engine.
///
/// This behaviour includes:
/// * Maintaining the job ledger (posting state, denormalised bid summary, assignment).
/// * Validating and recording bids under per-job serialization.
/// * Resolving a winner and cascading the loser rejections.
#[allow(async_fn_in_trait)]
pub trait AuctionDatabase: Clone {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Records a newly posted job with `Posted` status and an empty bid summary.
    async fn insert_job(&self, job: NewJob) -> Result<Job, AuctionApiError>;

    async fn fetch_job(&self, job_id: i64) -> Result<Option<Job>, AuctionApiError>;

    async fn fetch_bid(&self, bid_id: i64) -> Result<Option<Bid>, AuctionApiError>;

    /// Validates and places a bid in a single atomic unit of work.
    ///
    /// The implementation must take an exclusive lock on the job row for the duration of
    /// validation and write, so that two concurrent bids on the same job serialize while bids on
    /// different jobs proceed in parallel. Within that unit of work it must:
    /// * run the validation chain (job open, deadline, budget, competitiveness, duplicate,
    ///   skill match) before any mutation;
    /// * insert the bid with `Pending` status;
    /// * bump `bid_count`, fold the amount into `lowest_bid`, and promote `Posted → Bidding`;
    /// * apply the anti-sniping extension when the deadline is less than
    ///   [`ANTI_SNIPE_WINDOW_SECS`] away.
    ///
    /// A validation failure must leave no partial state behind.
    async fn place_bid(&self, bid: NewBid) -> Result<BidPlacement, AuctionApiError>;

    /// Resolves the auction in favour of the given bid, on behalf of `customer_id`.
    ///
    /// The `Posted/Bidding → Assigned` transition is a compare-and-set on the job status: losing
    /// the race (the job was assigned concurrently) fails with
    /// [`AuctionApiError::AuctionClosed`] and never double-applies. The remaining writes (winner
    /// accepted, losers rejected, escrow row upserted, conversation ensured) are idempotent and
    /// safe to retry.
    async fn accept_bid(&self, bid_id: i64, customer_id: &str) -> Result<AcceptedBid, AuctionApiError>;

    /// Withdraws a `Pending` bid on behalf of its owning worker, then recomputes the job's
    /// `lowest_bid`/`bid_count` summary from the remaining active bids so the summary invariant
    /// holds.
    async fn withdraw_bid(&self, bid_id: i64, worker_id: &str) -> Result<Bid, AuctionApiError>;

    /// All bids on a job, active ones first, ordered by `(amount ASC, created_at ASC)`.
    async fn bids_for_job(&self, job_id: i64) -> Result<Vec<Bid>, AuctionApiError>;

    /// All bids ever submitted by a worker, newest first.
    async fn bids_for_worker(&self, worker_id: &str) -> Result<Vec<Bid>, AuctionApiError>;

    /// The 1-indexed position of the bid among the job's active bids, ordered by
    /// `(amount ASC, created_at ASC)`. `None` when the bid is no longer active.
    async fn bid_rank(&self, bid_id: i64) -> Result<Option<i64>, AuctionApiError>;

    /// Flips jobs whose deadline has passed (and their pending bids) to `Expired`, returning the
    /// jobs that were closed. Intended to be driven by an external sweeper.
    async fn expire_overdue_jobs(&self) -> Result<Vec<Job>, AuctionApiError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), AuctionApiError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuctionApiError {
    #[error("We have an internal database problem: {0}")]
    DatabaseError(String),
    #[error("The requested job {0} does not exist")]
    JobNotFound(i64),
    #[error("The requested bid {0} does not exist")]
    BidNotFound(i64),
    #[error("Not permitted: {0}")]
    Forbidden(String),
    #[error("Invalid lifecycle state: {0}")]
    InvalidState(String),
    #[error("The auction is closed")]
    AuctionClosed,
    #[error("The bidding deadline has passed")]
    Expired,
    #[error("The bid amount exceeds the job's maximum budget")]
    BudgetExceeded,
    #[error("A lower bid already exists on this job")]
    NotCompetitive,
    #[error("The worker already has an active bid on this job")]
    DuplicateBid,
    #[error("The worker's declared skills do not match the job category")]
    SkillMismatch,
}

impl From<sqlx::Error> for AuctionApiError {
    fn from(e: sqlx::Error) -> Self {
        AuctionApiError::DatabaseError(e.to_string())
    }
}
