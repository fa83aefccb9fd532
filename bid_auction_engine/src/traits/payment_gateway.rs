use thiserror::Error;

/// The external payment gateway contract. All amounts crossing this boundary are in the
/// gateway's minor units for the given currency (see [`bae_common::Money::to_minor_units`]).
///
/// The engine never retries gateway calls on its own; callers retry idempotently against the
/// same intent id.
#[allow(async_fn_in_trait)]
pub trait PaymentGateway: Clone {
    /// Resolves the gateway-side customer record for a payer, creating one if necessary.
    async fn ensure_customer(&self, payer_ref: &str) -> Result<String, GatewayError>;

    /// The worker's payout destination, if the worker has a connected account. A `None` simply
    /// means the hold is placed without a transfer destination.
    async fn payout_destination(&self, worker_ref: &str) -> Result<Option<String>, GatewayError>;

    /// Places a manual-capture hold and returns the gateway's intent handle.
    async fn authorize(
        &self,
        minor_amount: i64,
        currency: &str,
        customer_ref: &str,
        destination: Option<&str>,
    ) -> Result<GatewayHold, GatewayError>;

    /// Captures the hold, optionally for a partial amount. Returns the amount the gateway
    /// actually captured, in minor units.
    async fn capture(&self, intent_id: &str, minor_amount: Option<i64>) -> Result<i64, GatewayError>;

    /// Cancels an uncaptured hold.
    async fn cancel(&self, intent_id: &str) -> Result<(), GatewayError>;

    /// Reverses a captured payment.
    async fn refund(&self, intent_id: &str, minor_amount: i64, reason: &str) -> Result<(), GatewayError>;
}

/// The gateway's answer to an authorization request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayHold {
    pub intent_id: String,
    /// True when the gateway reports the hold as capturable. When false the escrow row stays
    /// `Pending` even though an intent id exists.
    pub capturable: bool,
}

#[derive(Debug, Clone, Error)]
#[error("Payment gateway call failed: {0}")]
pub struct GatewayError(pub String);
