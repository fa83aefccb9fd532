//! Concurrency tests. Bid placement must serialize per job so that the denormalized summary on
//! the job row always matches the live bids underneath it.
mod support;

use bae_common::Money;
use bid_auction_engine::{db_types::NewBid, AuctionApiError};
use futures_util::future::join_all;
use support::{auction, new_db, quick_job};

#[tokio::test]
async fn competing_bids_serialize_and_the_lower_one_wins() {
    let db = new_db().await;
    let api = auction(&db);
    let job = api.post_job(quick_job("alice")).await.unwrap();
    // Whichever order these two commit in, the book ends up with 140 on top. If 140 lands first,
    // 150 is rejected as not competitive instead.
    let first = api.place_bid(NewBid::new(job.id, "bob", Money::from_major(150))).await;
    let second = api.place_bid(NewBid::new(job.id, "carol", Money::from_major(140))).await;
    assert!(first.is_ok());
    assert!(second.is_ok());
    let job = api.job(job.id).await.unwrap().unwrap();
    assert_eq!(job.bid_count, 2);
    assert_eq!(job.lowest_bid, Some(Money::from_major(140)));
}

#[tokio::test]
async fn a_burst_of_bids_leaves_a_consistent_summary() {
    let db = new_db().await;
    let api = auction(&db);
    let job = api.post_job(quick_job("alice")).await.unwrap();

    let amounts = [150i64, 145, 140, 135, 130, 125, 120, 115];
    let tasks = amounts.iter().enumerate().map(|(i, &amount)| {
        let db = db.clone();
        let job_id = job.id;
        tokio::spawn(async move {
            let api = auction(&db);
            let worker = format!("worker-{i}");
            api.place_bid(NewBid::new(job_id, worker, Money::from_major(amount))).await.map(|p| p.bid.amount)
        })
    });
    let results = join_all(tasks).await;

    let mut landed = Vec::new();
    for res in results {
        match res.unwrap() {
            Ok(amount) => landed.push(amount),
            // The only legitimate way to lose the race.
            Err(AuctionApiError::NotCompetitive) => {},
            Err(e) => panic!("unexpected placement error: {e}"),
        }
    }
    assert!(!landed.is_empty());

    let job = api.job(job.id).await.unwrap().unwrap();
    let bids = api.bids_for_job(job.id).await.unwrap();
    assert_eq!(job.bid_count as usize, landed.len());
    assert_eq!(bids.len(), landed.len());
    assert_eq!(job.lowest_bid, landed.iter().min().copied());
    let lowest_live = bids.iter().map(|r| r.bid.amount).min();
    assert_eq!(job.lowest_bid, lowest_live);
}

#[tokio::test]
async fn bids_on_different_jobs_do_not_contend() {
    let db = new_db().await;
    let api = auction(&db);
    let job_a = api.post_job(quick_job("alice")).await.unwrap();
    let job_b = api.post_job(quick_job("alice")).await.unwrap();

    let tasks = (0..6i64).map(|i| {
        let db = db.clone();
        let job_id = if i % 2 == 0 { job_a.id } else { job_b.id };
        let amount = Money::from_major(200 - 10 * i);
        tokio::spawn(async move {
            let api = auction(&db);
            api.place_bid(NewBid::new(job_id, format!("worker-{i}"), amount)).await
        })
    });
    let results = join_all(tasks).await;
    let successes = results
        .into_iter()
        .filter(|r| matches!(r, Ok(Ok(_))))
        .count();
    assert!(successes >= 2, "at least the first bid on each job must land, got {successes}");

    for job in [job_a, job_b] {
        let job = api.job(job.id).await.unwrap().unwrap();
        let bids = api.bids_for_job(job.id).await.unwrap();
        assert_eq!(job.bid_count as usize, bids.len());
        assert_eq!(job.lowest_bid, bids.iter().map(|r| r.bid.amount).min());
    }
}
