use bae_common::Money;

use crate::db_types::PaymentStatus;

/// A partial update against a job's payment row. Only the populated fields are written; an empty
/// update is rejected as a no-op.
#[derive(Debug, Clone, Default)]
pub struct PaymentUpdate {
    pub new_status: Option<PaymentStatus>,
    pub new_intent_id: Option<String>,
    pub new_memo: Option<String>,
    pub new_amount: Option<Money>,
    pub new_platform_fee: Option<Money>,
    pub new_worker_payout: Option<Money>,
}

impl PaymentUpdate {
    pub fn is_empty(&self) -> bool {
        self.new_status.is_none()
            && self.new_intent_id.is_none()
            && self.new_memo.is_none()
            && self.new_amount.is_none()
            && self.new_platform_fee.is_none()
            && self.new_worker_payout.is_none()
    }

    pub fn with_status(mut self, status: PaymentStatus) -> Self {
        self.new_status = Some(status);
        self
    }

    pub fn with_intent_id<S: Into<String>>(mut self, intent_id: S) -> Self {
        self.new_intent_id = Some(intent_id.into());
        self
    }

    pub fn with_memo<S: Into<String>>(mut self, memo: S) -> Self {
        self.new_memo = Some(memo.into());
        self
    }

    /// Replaces the escrowed amount and rederives the fee split from it.
    pub fn with_amounts(mut self, amount: Money) -> Self {
        self.new_amount = Some(amount);
        self.new_platform_fee = Some(amount.platform_fee());
        self.new_worker_payout = Some(amount.worker_payout());
        self
    }
}
