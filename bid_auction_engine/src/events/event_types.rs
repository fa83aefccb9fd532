use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::db_types::{Bid, Job};

/// A message destined for the notification sink: `notify(user_id, kind, title, body, data)`.
/// Delivery is at-least-once and duplicates are tolerable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub user_id: String,
    pub kind: String,
    pub title: String,
    pub body: String,
    pub data: serde_json::Value,
}

//--------------------------------------  BidPlacedEvent  ------------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BidPlacedEvent {
    pub job: Job,
    pub bid: Bid,
}

impl BidPlacedEvent {
    pub fn new(job: Job, bid: Bid) -> Self {
        Self { job, bid }
    }

    /// The "new bid" notification for the job owner.
    pub fn notification(&self) -> Notification {
        Notification {
            user_id: self.job.customer_id.clone(),
            kind: "bid_placed".to_string(),
            title: "New bid received".to_string(),
            body: format!("A bid of {} was placed on '{}'", self.bid.amount, self.job.title),
            data: json!({ "job_id": self.job.id, "bid_id": self.bid.id, "amount": self.bid.amount }),
        }
    }
}

//-------------------------------------- TimerExtendedEvent ----------------------------------------------------------
/// Emitted when a late bid pushed the deadline out; broadcast on the job's timer channel so
/// competing workers see the new clock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerExtendedEvent {
    pub job_id: i64,
    pub new_deadline: DateTime<Utc>,
}

impl TimerExtendedEvent {
    pub fn new(job_id: i64, new_deadline: DateTime<Utc>) -> Self {
        Self { job_id, new_deadline }
    }

    pub fn channel(&self) -> String {
        format!("job-timer:{}", self.job_id)
    }

    pub fn payload(&self) -> serde_json::Value {
        json!({ "job_id": self.job_id, "expires_at": self.new_deadline })
    }
}

//--------------------------------------  BidAcceptedEvent -----------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BidAcceptedEvent {
    pub job: Job,
    pub winner: Bid,
    pub rejected: Vec<Bid>,
}

impl BidAcceptedEvent {
    pub fn new(job: Job, winner: Bid, rejected: Vec<Bid>) -> Self {
        Self { job, winner, rejected }
    }

    pub fn channel(&self) -> String {
        format!("job-bids:{}", self.job.id)
    }

    pub fn payload(&self) -> serde_json::Value {
        json!({ "job_id": self.job.id, "bid_id": self.winner.id, "worker_id": self.winner.worker_id })
    }

    /// One congratulation for the winner, one regret per rejected bidder.
    pub fn notifications(&self) -> Vec<Notification> {
        let mut result = vec![Notification {
            user_id: self.winner.worker_id.clone(),
            kind: "bid_accepted".to_string(),
            title: "Your bid was accepted".to_string(),
            body: format!("You won '{}' for {}", self.job.title, self.winner.amount),
            data: json!({ "job_id": self.job.id, "bid_id": self.winner.id }),
        }];
        for bid in &self.rejected {
            result.push(Notification {
                user_id: bid.worker_id.clone(),
                kind: "bid_rejected".to_string(),
                title: "Your bid was not selected".to_string(),
                body: format!("Another bid was chosen for '{}'", self.job.title),
                data: json!({ "job_id": self.job.id, "bid_id": bid.id }),
            });
        }
        result
    }
}
