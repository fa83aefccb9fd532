//! Per-operation authorization checks.
//!
//! Each check returns a typed [`Decision`] rather than erroring through a middleware chain, so
//! callers can map a denial onto their own error taxonomy.
use crate::db_types::{Bid, Job, Payment};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(String),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    /// Converts the decision into a `Result`, carrying the denial reason.
    pub fn into_result(self) -> Result<(), String> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(reason) => Err(reason),
        }
    }
}

/// Only the customer who posted the job may resolve its auction.
pub fn job_owner(job: &Job, user_id: &str) -> Decision {
    if job.customer_id == user_id {
        Decision::Allow
    } else {
        Decision::Deny(format!("user {user_id} does not own job {}", job.id))
    }
}

/// Only the worker who submitted the bid may withdraw it.
pub fn bid_owner(bid: &Bid, user_id: &str) -> Decision {
    if bid.worker_id == user_id {
        Decision::Allow
    } else {
        Decision::Deny(format!("user {user_id} does not own bid {}", bid.id))
    }
}

/// The paying customer is the only party allowed to authorize or capture the escrow.
pub fn payment_payer(payment: &Payment, user_id: &str) -> Decision {
    if payment.customer_id == user_id {
        Decision::Allow
    } else {
        Decision::Deny(format!("user {user_id} is not the payer on job {}", payment.job_id))
    }
}

/// Either participant (customer or worker) may void, refund or inspect the escrow.
pub fn payment_participant(payment: &Payment, user_id: &str) -> Decision {
    if payment.customer_id == user_id || payment.worker_id == user_id {
        Decision::Allow
    } else {
        Decision::Deny(format!("user {user_id} is not a participant on job {}", payment.job_id))
    }
}

#[cfg(test)]
mod test {
    use bae_common::Money;
    use chrono::Utc;

    use super::*;
    use crate::db_types::PaymentStatus;

    fn payment() -> Payment {
        Payment {
            id: 1,
            job_id: 7,
            customer_id: "cust-1".to_string(),
            worker_id: "worker-1".to_string(),
            amount: Money::from_major(100),
            platform_fee: Money::from_major(18),
            worker_payout: Money::from_major(82),
            currency: "AED".to_string(),
            status: PaymentStatus::Pending,
            intent_id: None,
            memo: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn participants_are_both_sides_only() {
        let p = payment();
        assert!(payment_participant(&p, "cust-1").is_allowed());
        assert!(payment_participant(&p, "worker-1").is_allowed());
        assert!(!payment_participant(&p, "stranger").is_allowed());
    }

    #[test]
    fn payer_is_customer_only() {
        let p = payment();
        assert!(payment_payer(&p, "cust-1").is_allowed());
        assert!(payment_payer(&p, "worker-1").into_result().is_err());
    }
}
