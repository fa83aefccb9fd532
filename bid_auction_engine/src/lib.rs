//! Bid Auction Engine
//!
//! The Bid Auction Engine is the core of a reverse-auction services marketplace: customers post
//! jobs, workers compete by underbidding each other, and the winning bid is settled through a
//! held (escrow) payment. This library contains the auction and escrow logic only; rendering,
//! authentication and feed ranking live elsewhere and consume this crate's API.
//!
//! The library is divided into two main sections:
//! 1. Database management and control ([`mod@sqlite`]). SQLite is the reference backend. You
//!    should never need to access the database directly; instead, use the public API. The
//!    exception is the data types used in the database, which are defined in the `db_types`
//!    module and are public.
//! 2. The engine public API: [`AuctionApi`] for the bidding flows (placement with per-job
//!    serialization, anti-sniping deadline extension, winner resolution) and [`EscrowApi`] for
//!    the payment state machine (`authorize → capture / void / refund`) against an external
//!    payment gateway. Backends implement the traits in [`mod@traits`].
//!
//! The engine also provides a set of events that can be subscribed to. These events are emitted
//! when certain actions occur within the auction: a bid is placed, a deadline is extended by a
//! late bid, a winner is chosen. A simple hook framework lets the notification sink and the
//! realtime broadcaster react to them without the core knowing either exists.
mod bae_api;
pub mod db_types;
pub mod events;
pub mod helpers;
pub mod traits;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;

pub use traits::{AuctionApiError, AuctionDatabase, EscrowApiError, EscrowDatabase, GatewayError, PaymentGateway};

pub use bae_api::{
    auction_api::AuctionApi,
    bid_objects,
    bid_objects::{BidGroups, RankedBid},
    escrow_api::EscrowApi,
    payment_objects,
    payment_objects::PaymentUpdate,
};
