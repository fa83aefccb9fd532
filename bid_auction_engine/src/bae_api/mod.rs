pub mod auction_api;
pub mod bid_objects;
pub mod escrow_api;
pub mod payment_objects;
