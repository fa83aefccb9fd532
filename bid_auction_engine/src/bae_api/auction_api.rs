use std::fmt::Debug;

use log::*;

use crate::{
    bid_objects::{rank_bids, BidGroups, RankedBid},
    db_types::{Bid, Job, NewBid, NewJob},
    events::{BidAcceptedEvent, BidPlacedEvent, EventProducers, TimerExtendedEvent},
    traits::{AcceptedBid, AuctionApiError, AuctionDatabase, BidPlacement},
};

/// `AuctionApi` is the primary entry point for the bid auction flows: posting jobs, placing and
/// withdrawing bids, and resolving a winner. It wraps a storage backend and emits events to the
/// registered hook subscribers after each successful mutation.
pub struct AuctionApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for AuctionApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AuctionApi")
    }
}

impl<B> AuctionApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

impl<B> AuctionApi<B>
where B: AuctionDatabase
{
    /// Records a newly posted job. The job starts in `Posted` status with an empty bid summary.
    pub async fn post_job(&self, job: NewJob) -> Result<Job, AuctionApiError> {
        self.db.insert_job(job).await
    }

    pub async fn job(&self, job_id: i64) -> Result<Option<Job>, AuctionApiError> {
        self.db.fetch_job(job_id).await
    }

    pub async fn bid(&self, bid_id: i64) -> Result<Option<Bid>, AuctionApiError> {
        self.db.fetch_bid(bid_id).await
    }

    /// Validates and places a bid.
    ///
    /// The backend serializes concurrent placements per job and applies the whole validation
    /// chain before writing anything, so a failure here guarantees no partial state. On success
    /// a `BidPlaced` event goes to the job owner's notification hook and, if the anti-sniping
    /// extension fired, a `TimerExtended` event goes to the job's realtime timer channel.
    pub async fn place_bid(&self, bid: NewBid) -> Result<BidPlacement, AuctionApiError> {
        let placement = self.db.place_bid(bid).await?;
        self.call_bid_placed_hook(&placement).await;
        if placement.timer_extended {
            self.call_timer_extended_hook(&placement).await;
        }
        debug!(
            "🔨️📦️ Bid [{}] placed on job #{}. Processing complete",
            placement.bid.id, placement.job.id
        );
        Ok(placement)
    }

    /// Resolves the auction in favour of `bid_id` on behalf of the job owner, rejecting every
    /// other live bid and opening the escrow. Emits a `BidAccepted` event carrying the winner
    /// and the rejected bidders for notification fan-out.
    pub async fn accept_bid(&self, bid_id: i64, customer_id: &str) -> Result<AcceptedBid, AuctionApiError> {
        let accepted = self.db.accept_bid(bid_id, customer_id).await?;
        self.call_bid_accepted_hook(&accepted).await;
        debug!(
            "🔨️🏆️ Job #{} assigned to {}. Processing complete",
            accepted.job.id, accepted.winner.worker_id
        );
        Ok(accepted)
    }

    /// Withdraws a pending bid on behalf of its owner. The job's summary fields are rebuilt so
    /// `lowest_bid` never points at a bid that is no longer competing.
    pub async fn withdraw_bid(&self, bid_id: i64, worker_id: &str) -> Result<Bid, AuctionApiError> {
        self.db.withdraw_bid(bid_id, worker_id).await
    }

    /// The job's bids in auction order, with ranks attached to the active ones.
    pub async fn bids_for_job(&self, job_id: i64) -> Result<Vec<RankedBid>, AuctionApiError> {
        let bids = self.db.bids_for_job(job_id).await?;
        Ok(rank_bids(bids))
    }

    /// A worker's bid history, grouped by status.
    pub async fn my_bids(&self, worker_id: &str) -> Result<BidGroups, AuctionApiError> {
        let bids = self.db.bids_for_worker(worker_id).await?;
        Ok(BidGroups::from_bids(bids))
    }

    /// Whether the given bid is still live but no longer in first place.
    pub async fn is_outbid(&self, bid_id: i64) -> Result<bool, AuctionApiError> {
        let rank = self.db.bid_rank(bid_id).await?;
        Ok(rank.map(|r| r > 1).unwrap_or(false))
    }

    /// Sweeps overdue jobs (and their pending bids) to `Expired`. Driven by an external
    /// scheduler; the engine itself never polls.
    pub async fn expire_overdue_jobs(&self) -> Result<Vec<Job>, AuctionApiError> {
        self.db.expire_overdue_jobs().await
    }

    async fn call_bid_placed_hook(&self, placement: &BidPlacement) {
        for emitter in &self.producers.bid_placed_producer {
            trace!("🔨️📬️ Notifying bid placed hook subscribers");
            let event = BidPlacedEvent::new(placement.job.clone(), placement.bid.clone());
            emitter.publish_event(event).await;
        }
    }

    async fn call_timer_extended_hook(&self, placement: &BidPlacement) {
        let Some(deadline) = placement.new_deadline() else {
            return;
        };
        for emitter in &self.producers.timer_extended_producer {
            trace!("⏰️📬️ Notifying timer extended hook subscribers");
            let event = TimerExtendedEvent::new(placement.job.id, deadline);
            emitter.publish_event(event).await;
        }
    }

    async fn call_bid_accepted_hook(&self, accepted: &AcceptedBid) {
        for emitter in &self.producers.bid_accepted_producer {
            trace!("🏆️📬️ Notifying bid accepted hook subscribers");
            let event =
                BidAcceptedEvent::new(accepted.job.clone(), accepted.winner.clone(), accepted.rejected.clone());
            emitter.publish_event(event).await;
        }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut B {
        &mut self.db
    }
}
