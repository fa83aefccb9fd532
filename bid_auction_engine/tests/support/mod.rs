#![allow(dead_code)]
use bae_common::Money;
use bid_auction_engine::{
    db_types::NewJob,
    events::EventProducers,
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    AuctionApi,
    SqliteDatabase,
};

pub async fn new_db() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating connection to test database")
}

pub fn auction(db: &SqliteDatabase) -> AuctionApi<SqliteDatabase> {
    AuctionApi::new(db.clone(), EventProducers::default())
}

/// A plumbing job with a 50–500 budget and no deadline.
pub fn quick_job(customer: &str) -> NewJob {
    NewJob::new(customer, "Fix the kitchen sink", "Plumbing", Money::from_major(50), Money::from_major(500))
}
