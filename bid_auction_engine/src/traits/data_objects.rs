use serde::{Deserialize, Serialize};

use crate::db_types::{Bid, Conversation, Job, Payment};

/// The result of a successful bid placement. `job` reflects the refreshed summary fields, and,
/// when `timer_extended` is set, the pushed-out deadline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BidPlacement {
    pub job: Job,
    pub bid: Bid,
    /// True when the bid landed inside the anti-sniping window and the deadline was extended.
    pub timer_extended: bool,
}

impl BidPlacement {
    pub fn new_deadline(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        if self.timer_extended {
            self.job.expires_at
        } else {
            None
        }
    }
}

/// Everything that came out of resolving an auction: the assigned job, the winning bid, the bids
/// that were rejected in the cascade, the freshly upserted escrow row and the conversation thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcceptedBid {
    pub job: Job,
    pub winner: Bid,
    pub rejected: Vec<Bid>,
    pub payment: Payment,
    pub conversation: Conversation,
}
