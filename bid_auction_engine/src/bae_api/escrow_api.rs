use std::fmt::Debug;

use bae_common::Money;
use log::*;

use crate::{
    db_types::{NewPayment, Payment, PaymentStatus},
    helpers::authz,
    payment_objects::PaymentUpdate,
    traits::{AuctionDatabase, EscrowApiError, EscrowDatabase, GatewayError, GatewayHold, PaymentGateway},
};

/// `EscrowApi` drives the escrow payment state machine:
/// `Pending → Authorized → Captured → (Voided | Refunded)`, with `Authorized → Voided` for
/// pre-capture cancellation.
///
/// Every transition talks to the external payment gateway first and only persists the new status
/// once the gateway call succeeded, so a gateway failure leaves the row in its prior state and
/// the operation safely retryable. The one exception is authorization, where a gateway rejection
/// records the `Failed` status (the state machine's only failure transition) before surfacing
/// the error.
pub struct EscrowApi<B, G> {
    db: B,
    gateway: G,
}

impl<B, G> Debug for EscrowApi<B, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EscrowApi")
    }
}

impl<B, G> EscrowApi<B, G> {
    pub fn new(db: B, gateway: G) -> Self {
        Self { db, gateway }
    }
}

impl<B, G> EscrowApi<B, G>
where
    B: EscrowDatabase + AuctionDatabase,
    G: PaymentGateway,
{
    /// Places the manual-capture hold for a job's escrow on behalf of the paying customer.
    ///
    /// The escrow row normally exists already (acceptance creates it); when the customer
    /// authorizes first, the row is created here from the job's accepted bid. The whole
    /// operation is an upsert keyed on the job id: calling it twice touches the same row, and a
    /// row that is already `Authorized` is returned as-is without a second gateway call.
    pub async fn authorize_escrow(&self, job_id: i64, customer_id: &str) -> Result<Payment, EscrowApiError> {
        let payment = match self.fetch_payment_for_job(job_id).await? {
            Some(p) => {
                authz::payment_payer(&p, customer_id).into_result().map_err(EscrowApiError::Forbidden)?;
                p
            },
            None => self.create_payment_for_job(job_id, customer_id).await?,
        };
        match payment.status {
            PaymentStatus::Authorized => {
                debug!("💰️ Escrow for job #{job_id} is already authorized. Nothing to do.");
                return Ok(payment);
            },
            PaymentStatus::Pending | PaymentStatus::Failed => {},
            other => {
                return Err(EscrowApiError::InvalidState(format!(
                    "the payment for job #{job_id} is {other} and can no longer be authorized"
                )))
            },
        }
        let hold = match self.place_hold(&payment).await {
            Ok(hold) => hold,
            Err(e) => {
                // The only transition into Failed. Authorization may be retried from it.
                let update = PaymentUpdate::default().with_status(PaymentStatus::Failed).with_memo(&e.0);
                self.db.update_payment(job_id, update).await?;
                error!("💰️ Escrow authorization for job #{job_id} failed: {e}");
                return Err(EscrowApiError::GatewayError(e));
            },
        };
        let status = if hold.capturable { PaymentStatus::Authorized } else { PaymentStatus::Pending };
        let update = PaymentUpdate::default().with_status(status).with_intent_id(hold.intent_id);
        let payment = self.db.update_payment(job_id, update).await?;
        info!("💰️ Escrow hold of {} placed for job #{job_id}. Status is {}", payment.amount, payment.status);
        Ok(payment)
    }

    /// Captures the authorized hold, optionally for a partial amount. The persisted amounts are
    /// recomputed from what the gateway reports as captured, never from caller input.
    pub async fn capture_payment(
        &self,
        job_id: i64,
        customer_id: &str,
        amount: Option<Money>,
    ) -> Result<Payment, EscrowApiError> {
        let payment = self.require_payment(job_id).await?;
        authz::payment_payer(&payment, customer_id).into_result().map_err(EscrowApiError::Forbidden)?;
        let intent_id = payment.intent_id.as_deref().ok_or(EscrowApiError::NoPaymentIntent(job_id))?;
        if payment.status != PaymentStatus::Authorized {
            return Err(EscrowApiError::InvalidState(format!(
                "the payment for job #{job_id} is {} and cannot be captured",
                payment.status
            )));
        }
        let requested = amount.map(|a| a.to_minor_units(&payment.currency));
        let captured_minor = self.gateway.capture(intent_id, requested).await?;
        let captured = Money::from_minor_units(captured_minor, &payment.currency);
        let update = PaymentUpdate::default().with_status(PaymentStatus::Captured).with_amounts(captured);
        let payment = self.db.update_payment(job_id, update).await?;
        info!("💰️✅️ Captured {} for job #{job_id}. Worker payout is {}", payment.amount, payment.worker_payout);
        Ok(payment)
    }

    /// Cancels an uncaptured hold. Either participant may void, e.g. when the job is cancelled
    /// before work starts.
    pub async fn void_payment(&self, job_id: i64, user_id: &str, reason: &str) -> Result<Payment, EscrowApiError> {
        let payment = self.require_payment(job_id).await?;
        authz::payment_participant(&payment, user_id).into_result().map_err(EscrowApiError::Forbidden)?;
        let intent_id = payment.intent_id.as_deref().ok_or(EscrowApiError::NoPaymentIntent(job_id))?;
        if payment.status != PaymentStatus::Authorized {
            return Err(EscrowApiError::InvalidState(format!(
                "the payment for job #{job_id} is {} and cannot be voided",
                payment.status
            )));
        }
        self.gateway.cancel(intent_id).await?;
        let update = PaymentUpdate::default().with_status(PaymentStatus::Voided).with_memo(reason);
        let payment = self.db.update_payment(job_id, update).await?;
        info!("💰️❌️ Escrow hold for job #{job_id} voided: {reason}");
        Ok(payment)
    }

    /// Reverses a captured payment in full.
    pub async fn refund_payment(&self, job_id: i64, user_id: &str, reason: &str) -> Result<Payment, EscrowApiError> {
        let payment = self.require_payment(job_id).await?;
        authz::payment_participant(&payment, user_id).into_result().map_err(EscrowApiError::Forbidden)?;
        let intent_id = payment.intent_id.as_deref().ok_or(EscrowApiError::NoPaymentIntent(job_id))?;
        if payment.status != PaymentStatus::Captured {
            return Err(EscrowApiError::InvalidState(format!(
                "the payment for job #{job_id} is {} and cannot be refunded",
                payment.status
            )));
        }
        let minor = payment.amount.to_minor_units(&payment.currency);
        self.gateway.refund(intent_id, minor, reason).await?;
        let update = PaymentUpdate::default().with_status(PaymentStatus::Refunded).with_memo(reason);
        let payment = self.db.update_payment(job_id, update).await?;
        info!("💰️↩️ Refunded {} for job #{job_id}: {reason}", payment.amount);
        Ok(payment)
    }

    /// The payment row for a job, visible to its participants only.
    pub async fn payment_status(&self, job_id: i64, user_id: &str) -> Result<Payment, EscrowApiError> {
        let payment = self.require_payment(job_id).await?;
        authz::payment_participant(&payment, user_id).into_result().map_err(EscrowApiError::Forbidden)?;
        Ok(payment)
    }

    /// Every payment the user participates in, on either side.
    pub async fn payments_for_user(&self, user_id: &str) -> Result<Vec<Payment>, EscrowApiError> {
        self.db.payments_for_user(user_id).await
    }

    /// Builds the escrow row for a job whose bid was accepted but whose payment row does not
    /// exist yet (the customer authorized before the acceptance writes completed). The caller
    /// is checked against the job owner before anything is written.
    async fn create_payment_for_job(&self, job_id: i64, customer_id: &str) -> Result<Payment, EscrowApiError> {
        let job = AuctionDatabase::fetch_job(&self.db, job_id).await?.ok_or(EscrowApiError::JobNotFound(job_id))?;
        authz::job_owner(&job, customer_id).into_result().map_err(EscrowApiError::Forbidden)?;
        let bid_id = job.accepted_bid_id.ok_or_else(|| {
            EscrowApiError::InvalidState(format!("job #{job_id} has no accepted bid to escrow"))
        })?;
        let bid = AuctionDatabase::fetch_bid(&self.db, bid_id)
            .await?
            .ok_or_else(|| EscrowApiError::InvalidState(format!("accepted bid {bid_id} is missing")))?;
        self.db.upsert_payment(NewPayment::for_assignment(&job, &bid)).await
    }

    async fn require_payment(&self, job_id: i64) -> Result<Payment, EscrowApiError> {
        self.fetch_payment_for_job(job_id).await?.ok_or(EscrowApiError::PaymentNotFound(job_id))
    }

    async fn fetch_payment_for_job(&self, job_id: i64) -> Result<Option<Payment>, EscrowApiError> {
        EscrowDatabase::fetch_payment_for_job(&self.db, job_id).await
    }

    /// Resolves the gateway-side references and places the manual-capture hold.
    async fn place_hold(&self, payment: &Payment) -> Result<GatewayHold, GatewayError> {
        let customer_ref = self.gateway.ensure_customer(&payment.customer_id).await?;
        let destination = self.gateway.payout_destination(&payment.worker_id).await?;
        let minor = payment.amount.to_minor_units(&payment.currency);
        self.gateway.authorize(minor, &payment.currency, &customer_ref, destination.as_deref()).await
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }
}
