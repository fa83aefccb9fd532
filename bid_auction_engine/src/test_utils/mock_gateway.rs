//! An in-memory payment gateway for tests. Records every intent it issues and can be told to
//! reject specific operations to exercise the failure paths.
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use crate::traits::{GatewayError, GatewayHold, PaymentGateway};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntentState {
    Held,
    Captured(i64),
    Cancelled,
    Refunded(i64),
}

#[derive(Debug, Clone)]
pub struct IntentRecord {
    pub minor_amount: i64,
    pub currency: String,
    pub customer_ref: String,
    pub destination: Option<String>,
    pub state: IntentState,
}

#[derive(Default)]
struct GatewayState {
    next_intent: u64,
    intents: HashMap<String, IntentRecord>,
    fail_authorize: bool,
    fail_capture: bool,
    connected_workers: bool,
}

/// The mock starts out with workers "connected" (payout destinations resolve) and every call
/// succeeding.
#[derive(Clone)]
pub struct MockGateway {
    state: Arc<Mutex<GatewayState>>,
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGateway {
    pub fn new() -> Self {
        let state = GatewayState { connected_workers: true, ..GatewayState::default() };
        Self { state: Arc::new(Mutex::new(state)) }
    }

    pub fn fail_next_authorize(&self) {
        self.state.lock().unwrap().fail_authorize = true;
    }

    pub fn fail_next_capture(&self) {
        self.state.lock().unwrap().fail_capture = true;
    }

    pub fn disconnect_workers(&self) {
        self.state.lock().unwrap().connected_workers = false;
    }

    pub fn intent(&self, intent_id: &str) -> Option<IntentRecord> {
        self.state.lock().unwrap().intents.get(intent_id).cloned()
    }

    pub fn intent_count(&self) -> usize {
        self.state.lock().unwrap().intents.len()
    }
}

impl PaymentGateway for MockGateway {
    async fn ensure_customer(&self, payer_ref: &str) -> Result<String, GatewayError> {
        Ok(format!("cus_{payer_ref}"))
    }

    async fn payout_destination(&self, worker_ref: &str) -> Result<Option<String>, GatewayError> {
        let connected = self.state.lock().unwrap().connected_workers;
        Ok(connected.then(|| format!("acct_{worker_ref}")))
    }

    async fn authorize(
        &self,
        minor_amount: i64,
        currency: &str,
        customer_ref: &str,
        destination: Option<&str>,
    ) -> Result<GatewayHold, GatewayError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_authorize {
            state.fail_authorize = false;
            return Err(GatewayError("card declined".to_string()));
        }
        state.next_intent += 1;
        let intent_id = format!("pi_mock_{:06}", state.next_intent);
        state.intents.insert(intent_id.clone(), IntentRecord {
            minor_amount,
            currency: currency.to_string(),
            customer_ref: customer_ref.to_string(),
            destination: destination.map(String::from),
            state: IntentState::Held,
        });
        Ok(GatewayHold { intent_id, capturable: true })
    }

    async fn capture(&self, intent_id: &str, minor_amount: Option<i64>) -> Result<i64, GatewayError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_capture {
            state.fail_capture = false;
            return Err(GatewayError("capture rejected".to_string()));
        }
        let record = state
            .intents
            .get_mut(intent_id)
            .ok_or_else(|| GatewayError(format!("no such intent: {intent_id}")))?;
        if record.state != IntentState::Held {
            return Err(GatewayError(format!("intent {intent_id} is not capturable")));
        }
        let captured = minor_amount.unwrap_or(record.minor_amount).min(record.minor_amount);
        record.state = IntentState::Captured(captured);
        Ok(captured)
    }

    async fn cancel(&self, intent_id: &str) -> Result<(), GatewayError> {
        let mut state = self.state.lock().unwrap();
        let record = state
            .intents
            .get_mut(intent_id)
            .ok_or_else(|| GatewayError(format!("no such intent: {intent_id}")))?;
        if record.state != IntentState::Held {
            return Err(GatewayError(format!("intent {intent_id} is not cancellable")));
        }
        record.state = IntentState::Cancelled;
        Ok(())
    }

    async fn refund(&self, intent_id: &str, minor_amount: i64, _reason: &str) -> Result<(), GatewayError> {
        let mut state = self.state.lock().unwrap();
        let record = state
            .intents
            .get_mut(intent_id)
            .ok_or_else(|| GatewayError(format!("no such intent: {intent_id}")))?;
        match record.state {
            IntentState::Captured(captured) if minor_amount <= captured => {
                record.state = IntentState::Refunded(minor_amount);
                Ok(())
            },
            _ => Err(GatewayError(format!("intent {intent_id} is not refundable"))),
        }
    }
}
