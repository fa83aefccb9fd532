use serde::{Deserialize, Serialize};

use crate::db_types::{Bid, BidStatus};

/// A bid together with its 1-indexed auction position. `rank` is `None` for bids that no longer
/// compete (rejected, withdrawn, expired).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedBid {
    pub bid: Bid,
    pub rank: Option<i64>,
}

impl RankedBid {
    /// A live bid sitting anywhere but first place is outbid.
    pub fn is_outbid(&self) -> bool {
        self.bid.status.is_active() && self.rank.map(|r| r > 1).unwrap_or(false)
    }
}

/// Ranks an ordered bid list. The input must already be sorted by
/// `(amount ASC, created_at ASC, id ASC)`; active bids are numbered in order, terminal ones get
/// no rank.
pub fn rank_bids(bids: Vec<Bid>) -> Vec<RankedBid> {
    let mut next_rank = 1;
    bids.into_iter()
        .map(|bid| {
            let rank = if bid.status.is_active() {
                let r = next_rank;
                next_rank += 1;
                Some(r)
            } else {
                None
            };
            RankedBid { bid, rank }
        })
        .collect()
}

/// A worker's bid history bucketed by status, for the "my bids" view.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BidGroups {
    pub pending: Vec<Bid>,
    pub accepted: Vec<Bid>,
    pub rejected: Vec<Bid>,
    pub withdrawn: Vec<Bid>,
    pub expired: Vec<Bid>,
    pub outbid: Vec<Bid>,
}

impl BidGroups {
    pub fn from_bids(bids: Vec<Bid>) -> Self {
        let mut groups = Self::default();
        for bid in bids {
            match bid.status {
                BidStatus::Pending => groups.pending.push(bid),
                BidStatus::Accepted => groups.accepted.push(bid),
                BidStatus::Rejected => groups.rejected.push(bid),
                BidStatus::Withdrawn => groups.withdrawn.push(bid),
                BidStatus::Expired => groups.expired.push(bid),
                BidStatus::Outbid => groups.outbid.push(bid),
            }
        }
        groups
    }

    pub fn total(&self) -> usize {
        self.pending.len()
            + self.accepted.len()
            + self.rejected.len()
            + self.withdrawn.len()
            + self.expired.len()
            + self.outbid.len()
    }
}

#[cfg(test)]
mod test {
    use bae_common::Money;
    use chrono::Utc;

    use super::*;

    fn bid(id: i64, amount: i64, status: BidStatus) -> Bid {
        Bid {
            id,
            job_id: 1,
            worker_id: format!("worker-{id}"),
            amount: Money::from(amount),
            status,
            message: None,
            estimated_duration_hours: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn ranking_skips_terminal_bids() {
        let bids = vec![
            bid(1, 100, BidStatus::Pending),
            bid(2, 120, BidStatus::Withdrawn),
            bid(3, 150, BidStatus::Pending),
        ];
        let ranked = rank_bids(bids);
        assert_eq!(ranked[0].rank, Some(1));
        assert_eq!(ranked[1].rank, None);
        assert_eq!(ranked[2].rank, Some(2));
        assert!(!ranked[0].is_outbid());
        assert!(ranked[2].is_outbid());
    }

    #[test]
    fn grouping_buckets_every_bid() {
        let bids = vec![
            bid(1, 100, BidStatus::Pending),
            bid(2, 120, BidStatus::Rejected),
            bid(3, 90, BidStatus::Accepted),
            bid(4, 80, BidStatus::Pending),
        ];
        let groups = BidGroups::from_bids(bids);
        assert_eq!(groups.pending.len(), 2);
        assert_eq!(groups.rejected.len(), 1);
        assert_eq!(groups.accepted.len(), 1);
        assert_eq!(groups.total(), 4);
    }
}
