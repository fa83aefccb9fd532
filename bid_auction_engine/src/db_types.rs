use std::{fmt::Display, str::FromStr};

use bae_common::{Money, DEFAULT_CURRENCY};
use chrono::{DateTime, Utc};
use log::error;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Invalid status: {0}")]
pub struct ConversionError(String);

//--------------------------------------     JobStatus      ----------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum JobStatus {
    /// The job has been posted and no bids have been received yet.
    Posted,
    /// At least one bid has been received and the auction is running.
    Bidding,
    /// A winning bid has been accepted and a worker assigned.
    Assigned,
    InProgress,
    Completed,
    Reviewed,
    /// The customer closed the job before assigning a worker.
    Cancelled,
    /// The bidding deadline passed without an assignment.
    Expired,
    Disputed,
}

impl JobStatus {
    /// A job accepts new bids only while it is `Posted` or `Bidding`.
    pub fn is_open(&self) -> bool {
        matches!(self, JobStatus::Posted | JobStatus::Bidding)
    }
}

impl Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobStatus::Posted => "Posted",
            JobStatus::Bidding => "Bidding",
            JobStatus::Assigned => "Assigned",
            JobStatus::InProgress => "InProgress",
            JobStatus::Completed => "Completed",
            JobStatus::Reviewed => "Reviewed",
            JobStatus::Cancelled => "Cancelled",
            JobStatus::Expired => "Expired",
            JobStatus::Disputed => "Disputed",
        };
        write!(f, "{s}")
    }
}

impl FromStr for JobStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Posted" => Ok(Self::Posted),
            "Bidding" => Ok(Self::Bidding),
            "Assigned" => Ok(Self::Assigned),
            "InProgress" => Ok(Self::InProgress),
            "Completed" => Ok(Self::Completed),
            "Reviewed" => Ok(Self::Reviewed),
            "Cancelled" => Ok(Self::Cancelled),
            "Expired" => Ok(Self::Expired),
            "Disputed" => Ok(Self::Disputed),
            s => Err(ConversionError(format!("Invalid job status: {s}"))),
        }
    }
}

impl From<String> for JobStatus {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid job status: {value}. But this conversion cannot fail. Defaulting to Posted");
            JobStatus::Posted
        })
    }
}

//--------------------------------------     BidStatus      ----------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum BidStatus {
    /// The bid is live and competing.
    Pending,
    /// The bid won the auction. Terminal.
    Accepted,
    /// Another bid won the auction. Terminal.
    Rejected,
    /// The worker withdrew the bid. Terminal.
    Withdrawn,
    /// The auction expired before resolution. Terminal.
    Expired,
    /// The bid is still live, but a lower bid exists.
    Outbid,
}

impl BidStatus {
    /// Active bids are the ones that participate in ranking and in the job's denormalised
    /// `lowest_bid` / `bid_count` summary.
    pub fn is_active(&self) -> bool {
        matches!(self, BidStatus::Pending | BidStatus::Accepted | BidStatus::Outbid)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BidStatus::Accepted | BidStatus::Rejected | BidStatus::Withdrawn | BidStatus::Expired)
    }
}

impl Display for BidStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BidStatus::Pending => "Pending",
            BidStatus::Accepted => "Accepted",
            BidStatus::Rejected => "Rejected",
            BidStatus::Withdrawn => "Withdrawn",
            BidStatus::Expired => "Expired",
            BidStatus::Outbid => "Outbid",
        };
        write!(f, "{s}")
    }
}

impl FromStr for BidStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Accepted" => Ok(Self::Accepted),
            "Rejected" => Ok(Self::Rejected),
            "Withdrawn" => Ok(Self::Withdrawn),
            "Expired" => Ok(Self::Expired),
            "Outbid" => Ok(Self::Outbid),
            s => Err(ConversionError(format!("Invalid bid status: {s}"))),
        }
    }
}

impl From<String> for BidStatus {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid bid status: {value}. But this conversion cannot fail. Defaulting to Pending");
            BidStatus::Pending
        })
    }
}

//--------------------------------------   PaymentStatus    ----------------------------------------------------------
/// Escrow lifecycle: `Pending → Authorized → Captured → (Voided | Refunded)`, with
/// `Authorized → Voided` for pre-capture cancellation. `Failed` is only ever entered when the
/// gateway rejects the `Pending → Authorized` hold, and authorization may be retried from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum PaymentStatus {
    Pending,
    Authorized,
    Captured,
    Voided,
    Refunded,
    Failed,
    Disputed,
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentStatus::Pending => "Pending",
            PaymentStatus::Authorized => "Authorized",
            PaymentStatus::Captured => "Captured",
            PaymentStatus::Voided => "Voided",
            PaymentStatus::Refunded => "Refunded",
            PaymentStatus::Failed => "Failed",
            PaymentStatus::Disputed => "Disputed",
        };
        write!(f, "{s}")
    }
}

impl FromStr for PaymentStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Authorized" => Ok(Self::Authorized),
            "Captured" => Ok(Self::Captured),
            "Voided" => Ok(Self::Voided),
            "Refunded" => Ok(Self::Refunded),
            "Failed" => Ok(Self::Failed),
            "Disputed" => Ok(Self::Disputed),
            s => Err(ConversionError(format!("Invalid payment status: {s}"))),
        }
    }
}

impl From<String> for PaymentStatus {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid payment status: {value}. But this conversion cannot fail. Defaulting to Pending");
            PaymentStatus::Pending
        })
    }
}

//--------------------------------------        Job         ----------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Job {
    pub id: i64,
    pub customer_id: String,
    pub title: String,
    pub category: String,
    pub status: JobStatus,
    pub budget_min: Money,
    pub budget_max: Money,
    pub currency: String,
    /// Advisory bidding deadline. Enforced at write time; a background sweeper handles the
    /// terminal flip.
    pub expires_at: Option<DateTime<Utc>>,
    /// Denormalised count of active bids, kept in lockstep with the bids table.
    pub bid_count: i64,
    /// Denormalised minimum active bid amount, or None when no active bids exist.
    pub lowest_bid: Option<Money>,
    pub assigned_worker_id: Option<String>,
    pub accepted_bid_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------       NewJob       ----------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewJob {
    pub customer_id: String,
    pub title: String,
    pub category: String,
    pub budget_min: Money,
    pub budget_max: Money,
    pub currency: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl NewJob {
    pub fn new<S: Into<String>>(customer_id: S, title: S, category: S, budget_min: Money, budget_max: Money) -> Self {
        Self {
            customer_id: customer_id.into(),
            title: title.into(),
            category: category.into(),
            budget_min,
            budget_max,
            currency: DEFAULT_CURRENCY.to_string(),
            expires_at: None,
        }
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn with_currency<S: Into<String>>(mut self, currency: S) -> Self {
        self.currency = currency.into();
        self
    }
}

//--------------------------------------        Bid         ----------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Bid {
    pub id: i64,
    pub job_id: i64,
    pub worker_id: String,
    pub amount: Money,
    pub status: BidStatus,
    pub message: Option<String>,
    pub estimated_duration_hours: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------       NewBid       ----------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewBid {
    pub job_id: i64,
    pub worker_id: String,
    pub amount: Money,
    /// An optional pitch from the worker, shown to the customer.
    pub message: Option<String>,
    pub estimated_duration_hours: Option<i64>,
    /// The worker's declared skill set, used for the category match check. An empty set skips
    /// the check.
    pub skills: Vec<String>,
}

impl NewBid {
    pub fn new<S: Into<String>>(job_id: i64, worker_id: S, amount: Money) -> Self {
        Self {
            job_id,
            worker_id: worker_id.into(),
            amount,
            message: None,
            estimated_duration_hours: None,
            skills: Vec::new(),
        }
    }

    pub fn with_message<S: Into<String>>(mut self, message: S) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_duration(mut self, hours: i64) -> Self {
        self.estimated_duration_hours = Some(hours);
        self
    }

    pub fn with_skills<S: Into<String>, I: IntoIterator<Item = S>>(mut self, skills: I) -> Self {
        self.skills = skills.into_iter().map(Into::into).collect();
        self
    }
}

//--------------------------------------      Payment       ----------------------------------------------------------
/// The escrow record for a job. There is at most one non-superseded payment row per job.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    pub job_id: i64,
    pub customer_id: String,
    pub worker_id: String,
    pub amount: Money,
    pub platform_fee: Money,
    pub worker_payout: Money,
    pub currency: String,
    pub status: PaymentStatus,
    /// The gateway's payment-intent id. None until the hold has been placed successfully.
    pub intent_id: Option<String>,
    /// Human-readable context for the latest transition, e.g. a void or refund reason.
    pub memo: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------     NewPayment     ----------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub job_id: i64,
    pub customer_id: String,
    pub worker_id: String,
    pub amount: Money,
    pub platform_fee: Money,
    pub worker_payout: Money,
    pub currency: String,
}

impl NewPayment {
    /// Builds the escrow row for an accepted bid. The fee split is derived from the bid amount
    /// and is exact: `platform_fee + worker_payout == amount`.
    pub fn for_assignment(job: &Job, winning_bid: &Bid) -> Self {
        let amount = winning_bid.amount;
        Self {
            job_id: job.id,
            customer_id: job.customer_id.clone(),
            worker_id: winning_bid.worker_id.clone(),
            amount,
            platform_fee: amount.platform_fee(),
            worker_payout: amount.worker_payout(),
            currency: job.currency.clone(),
        }
    }
}

//--------------------------------------   Conversation     ----------------------------------------------------------
/// The message thread opened between customer and worker when a bid is accepted.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Conversation {
    pub id: i64,
    pub job_id: i64,
    pub customer_id: String,
    pub worker_id: String,
    pub created_at: DateTime<Utc>,
}
