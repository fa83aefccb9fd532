//! Escrow state-machine tests, driven through the public API against a mock gateway.
mod support;

use bae_common::Money;
use bid_auction_engine::{
    db_types::{Job, NewBid, NewJob, PaymentStatus},
    test_utils::mock_gateway::{IntentState, MockGateway},
    EscrowApi,
    EscrowApiError,
    SqliteDatabase,
};
use support::{auction, new_db, quick_job};

/// Posts a job, runs a two-bid auction and accepts carol's 140 bid, leaving a `Pending` escrow
/// row behind.
async fn assigned_job(db: &SqliteDatabase, job: NewJob) -> Job {
    let api = auction(db);
    let job = api.post_job(job).await.unwrap();
    api.place_bid(NewBid::new(job.id, "bob", Money::from_major(150))).await.unwrap();
    let winner = api.place_bid(NewBid::new(job.id, "carol", Money::from_major(140))).await.unwrap().bid;
    api.accept_bid(winner.id, "alice").await.unwrap();
    api.job(job.id).await.unwrap().unwrap()
}

fn escrow(db: &SqliteDatabase) -> (EscrowApi<SqliteDatabase, MockGateway>, MockGateway) {
    let gateway = MockGateway::new();
    (EscrowApi::new(db.clone(), gateway.clone()), gateway)
}

#[tokio::test]
async fn authorize_capture_refund_lifecycle() {
    let db = new_db().await;
    let job = assigned_job(&db, quick_job("alice")).await;
    let (api, gateway) = escrow(&db);

    let payment = api.authorize_escrow(job.id, "alice").await.unwrap();
    assert_eq!(payment.status, PaymentStatus::Authorized);
    assert_eq!(payment.amount, Money::from_major(140));
    assert_eq!(payment.platform_fee, Money::from(25_200));
    assert_eq!(payment.worker_payout, Money::from(114_800));
    let intent_id = payment.intent_id.clone().unwrap();
    // AED has two decimal places, so the hold goes out in fils.
    let intent = gateway.intent(&intent_id).unwrap();
    assert_eq!(intent.minor_amount, 14_000);
    assert_eq!(intent.currency, "AED");
    assert_eq!(intent.destination.as_deref(), Some("acct_carol"));

    let payment = api.capture_payment(job.id, "alice", None).await.unwrap();
    assert_eq!(payment.status, PaymentStatus::Captured);
    assert_eq!(payment.amount, Money::from_major(140));
    assert_eq!(payment.platform_fee + payment.worker_payout, payment.amount);
    assert_eq!(gateway.intent(&intent_id).unwrap().state, IntentState::Captured(14_000));

    // Either side may trigger the refund once funds have moved.
    let payment = api.refund_payment(job.id, "carol", "work was never started").await.unwrap();
    assert_eq!(payment.status, PaymentStatus::Refunded);
    assert_eq!(payment.memo.as_deref(), Some("work was never started"));
    assert_eq!(gateway.intent(&intent_id).unwrap().state, IntentState::Refunded(14_000));
}

#[tokio::test]
async fn authorizing_twice_reuses_the_hold() {
    let db = new_db().await;
    let job = assigned_job(&db, quick_job("alice")).await;
    let (api, gateway) = escrow(&db);

    let first = api.authorize_escrow(job.id, "alice").await.unwrap();
    let second = api.authorize_escrow(job.id, "alice").await.unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(first.intent_id, second.intent_id);
    assert_eq!(gateway.intent_count(), 1);
}

#[tokio::test]
async fn only_the_paying_customer_may_authorize_or_capture() {
    let db = new_db().await;
    let job = assigned_job(&db, quick_job("alice")).await;
    let (api, _gateway) = escrow(&db);

    let err = api.authorize_escrow(job.id, "carol").await.unwrap_err();
    assert!(matches!(err, EscrowApiError::Forbidden(_)));
    let err = api.authorize_escrow(job.id, "mallory").await.unwrap_err();
    assert!(matches!(err, EscrowApiError::Forbidden(_)));
    api.authorize_escrow(job.id, "alice").await.unwrap();
    let err = api.capture_payment(job.id, "carol", None).await.unwrap_err();
    assert!(matches!(err, EscrowApiError::Forbidden(_)));
    // The worker can still see the payment, a stranger cannot.
    api.payment_status(job.id, "carol").await.unwrap();
    let err = api.payment_status(job.id, "mallory").await.unwrap_err();
    assert!(matches!(err, EscrowApiError::Forbidden(_)));
}

#[tokio::test]
async fn a_denied_authorization_never_creates_the_escrow_row() {
    let db = new_db().await;
    let job = assigned_job(&db, quick_job("alice")).await;
    // Simulate the acceptance writes not having landed yet.
    sqlx::query("DELETE FROM payments WHERE job_id = $1").bind(job.id).execute(db.pool()).await.unwrap();

    let (api, gateway) = escrow(&db);
    let err = api.authorize_escrow(job.id, "mallory").await.unwrap_err();
    assert!(matches!(err, EscrowApiError::Forbidden(_)));
    let (rows,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM payments WHERE job_id = $1")
        .bind(job.id)
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(rows, 0);
    assert_eq!(gateway.intent_count(), 0);

    // The rightful customer recreates the row and authorizes as usual.
    let payment = api.authorize_escrow(job.id, "alice").await.unwrap();
    assert_eq!(payment.status, PaymentStatus::Authorized);
}

#[tokio::test]
async fn unresolved_auctions_have_nothing_to_escrow() {
    let db = new_db().await;
    let api = auction(&db);
    let job = api.post_job(quick_job("alice")).await.unwrap();
    let (escrow_api, _gateway) = escrow(&db);
    let err = escrow_api.authorize_escrow(job.id, "alice").await.unwrap_err();
    assert!(matches!(err, EscrowApiError::InvalidState(_)));
    let err = escrow_api.authorize_escrow(9999, "alice").await.unwrap_err();
    assert!(matches!(err, EscrowApiError::JobNotFound(9999)));
}

#[tokio::test]
async fn a_declined_authorization_is_recorded_and_retryable() {
    let db = new_db().await;
    let job = assigned_job(&db, quick_job("alice")).await;
    let (api, gateway) = escrow(&db);

    gateway.fail_next_authorize();
    let err = api.authorize_escrow(job.id, "alice").await.unwrap_err();
    assert!(matches!(err, EscrowApiError::GatewayError(_)));
    let payment = api.payment_status(job.id, "alice").await.unwrap();
    assert_eq!(payment.status, PaymentStatus::Failed);
    assert!(payment.intent_id.is_none());
    assert_eq!(payment.memo.as_deref(), Some("card declined"));

    // The failure transition is the retryable one.
    let payment = api.authorize_escrow(job.id, "alice").await.unwrap();
    assert_eq!(payment.status, PaymentStatus::Authorized);
    assert!(payment.intent_id.is_some());
}

#[tokio::test]
async fn a_failed_capture_leaves_the_hold_in_place() {
    let db = new_db().await;
    let job = assigned_job(&db, quick_job("alice")).await;
    let (api, gateway) = escrow(&db);
    api.authorize_escrow(job.id, "alice").await.unwrap();

    gateway.fail_next_capture();
    let err = api.capture_payment(job.id, "alice", None).await.unwrap_err();
    assert!(matches!(err, EscrowApiError::GatewayError(_)));
    let payment = api.payment_status(job.id, "alice").await.unwrap();
    assert_eq!(payment.status, PaymentStatus::Authorized);

    let payment = api.capture_payment(job.id, "alice", None).await.unwrap();
    assert_eq!(payment.status, PaymentStatus::Captured);
}

#[tokio::test]
async fn capture_requires_an_authorized_hold() {
    let db = new_db().await;
    let job = assigned_job(&db, quick_job("alice")).await;
    let (api, _gateway) = escrow(&db);
    let err = api.capture_payment(job.id, "alice", None).await.unwrap_err();
    assert!(matches!(err, EscrowApiError::NoPaymentIntent(_)));
}

#[tokio::test]
async fn partial_captures_rederive_the_fee_split() {
    let db = new_db().await;
    let job = assigned_job(&db, quick_job("alice")).await;
    let (api, _gateway) = escrow(&db);
    api.authorize_escrow(job.id, "alice").await.unwrap();

    let payment = api.capture_payment(job.id, "alice", Some(Money::from_major(100))).await.unwrap();
    assert_eq!(payment.amount, Money::from_major(100));
    assert_eq!(payment.platform_fee, Money::from(18_000));
    assert_eq!(payment.worker_payout, Money::from(82_000));
    assert_eq!(payment.platform_fee + payment.worker_payout, payment.amount);
}

#[tokio::test]
async fn voiding_cancels_the_hold_before_capture() {
    let db = new_db().await;
    let job = assigned_job(&db, quick_job("alice")).await;
    let (api, gateway) = escrow(&db);
    let authorized = api.authorize_escrow(job.id, "alice").await.unwrap();

    // The worker backing out voids the escrow too.
    let payment = api.void_payment(job.id, "carol", "worker unavailable").await.unwrap();
    assert_eq!(payment.status, PaymentStatus::Voided);
    assert_eq!(payment.memo.as_deref(), Some("worker unavailable"));
    let intent_id = authorized.intent_id.unwrap();
    assert_eq!(gateway.intent(&intent_id).unwrap().state, IntentState::Cancelled);

    let err = api.capture_payment(job.id, "alice", None).await.unwrap_err();
    assert!(matches!(err, EscrowApiError::InvalidState(_)));
    let err = api.refund_payment(job.id, "alice", "too late").await.unwrap_err();
    assert!(matches!(err, EscrowApiError::InvalidState(_)));
}

#[tokio::test]
async fn refunds_only_apply_to_captured_payments() {
    let db = new_db().await;
    let job = assigned_job(&db, quick_job("alice")).await;
    let (api, _gateway) = escrow(&db);
    api.authorize_escrow(job.id, "alice").await.unwrap();
    let err = api.refund_payment(job.id, "alice", "changed my mind").await.unwrap_err();
    assert!(matches!(err, EscrowApiError::InvalidState(_)));
}

#[tokio::test]
async fn three_decimal_currencies_round_trip_through_the_gateway() {
    let db = new_db().await;
    let api = auction(&db);
    let job = api.post_job(quick_job("alice").with_currency("KWD")).await.unwrap();
    // 12.345 KWD, exactly representable and within budget.
    let winner = api.place_bid(NewBid::new(job.id, "carol", Money::from(12_345))).await.unwrap().bid;
    api.accept_bid(winner.id, "alice").await.unwrap();

    let (escrow_api, gateway) = escrow(&db);
    let payment = escrow_api.authorize_escrow(job.id, "alice").await.unwrap();
    // KWD holds go out in thousandths of a dinar.
    let intent = gateway.intent(payment.intent_id.as_deref().unwrap()).unwrap();
    assert_eq!(intent.minor_amount, 12_345);
    assert_eq!(intent.currency, "KWD");

    let payment = escrow_api.capture_payment(job.id, "alice", None).await.unwrap();
    assert_eq!(payment.amount, Money::from(12_345));
    assert_eq!(payment.platform_fee + payment.worker_payout, payment.amount);
}

#[tokio::test]
async fn payments_are_listed_for_both_participants() {
    let db = new_db().await;
    let job_a = assigned_job(&db, quick_job("alice")).await;
    let job_b = assigned_job(&db, quick_job("alice")).await;
    let (api, _gateway) = escrow(&db);
    api.authorize_escrow(job_a.id, "alice").await.unwrap();

    let mine = api.payments_for_user("alice").await.unwrap();
    assert_eq!(mine.len(), 2);
    let theirs = api.payments_for_user("carol").await.unwrap();
    assert_eq!(theirs.len(), 2);
    assert!(theirs.iter().any(|p| p.job_id == job_a.id && p.status == PaymentStatus::Authorized));
    assert!(theirs.iter().any(|p| p.job_id == job_b.id && p.status == PaymentStatus::Pending));
    assert!(api.payments_for_user("mallory").await.unwrap().is_empty());
}
