use thiserror::Error;

use crate::{
    db_types::{NewPayment, Payment},
    payment_objects::PaymentUpdate,
    traits::{AuctionApiError, GatewayError},
};

/// The storage contract for the escrow payment state machine. Rows are keyed one-to-one with
/// jobs; the `UNIQUE(job_id)` constraint is the only serialization the escrow layer relies on.
#[allow(async_fn_in_trait)]
pub trait EscrowDatabase: Clone {
    /// Inserts the escrow row for a job, or refreshes the amounts on the existing row. The
    /// status and gateway intent of an existing row are never clobbered by the upsert.
    async fn upsert_payment(&self, payment: NewPayment) -> Result<Payment, EscrowApiError>;

    async fn fetch_payment_for_job(&self, job_id: i64) -> Result<Option<Payment>, EscrowApiError>;

    /// All payments where the given user is the paying customer or the paid worker, newest first.
    async fn payments_for_user(&self, user_id: &str) -> Result<Vec<Payment>, EscrowApiError>;

    /// Applies the non-empty fields of `update` to the job's payment row.
    async fn update_payment(&self, job_id: i64, update: PaymentUpdate) -> Result<Payment, EscrowApiError>;
}

#[derive(Debug, Clone, Error)]
pub enum EscrowApiError {
    #[error("We have an internal database problem: {0}")]
    DatabaseError(String),
    #[error("The requested job {0} does not exist")]
    JobNotFound(i64),
    #[error("No payment exists for job {0}")]
    PaymentNotFound(i64),
    #[error("Not permitted: {0}")]
    Forbidden(String),
    #[error("Invalid lifecycle state: {0}")]
    InvalidState(String),
    #[error("The payment for job {0} has no gateway intent. Authorize the escrow first")]
    NoPaymentIntent(i64),
    #[error(transparent)]
    GatewayError(#[from] GatewayError),
    #[error("The requested payment update would result in a no-op")]
    PaymentModificationNoOp,
}

impl From<sqlx::Error> for EscrowApiError {
    fn from(e: sqlx::Error) -> Self {
        EscrowApiError::DatabaseError(e.to_string())
    }
}

impl From<AuctionApiError> for EscrowApiError {
    fn from(e: AuctionApiError) -> Self {
        match e {
            AuctionApiError::JobNotFound(id) => EscrowApiError::JobNotFound(id),
            AuctionApiError::Forbidden(reason) => EscrowApiError::Forbidden(reason),
            AuctionApiError::DatabaseError(msg) => EscrowApiError::DatabaseError(msg),
            other => EscrowApiError::InvalidState(other.to_string()),
        }
    }
}
