//! The behaviour contracts that a storage backend and a payment gateway must implement in order
//! to drive the auction engine. The sqlite module provides the reference backend; the gateway is
//! an external collaborator and only a mock implementation ships with the engine.
mod auction_database;
mod data_objects;
mod escrow_database;
mod payment_gateway;

pub use auction_database::{AuctionApiError, AuctionDatabase, ANTI_SNIPE_WINDOW_SECS};
pub use data_objects::{AcceptedBid, BidPlacement};
pub use escrow_database::{EscrowApiError, EscrowDatabase};
pub use payment_gateway::{GatewayError, GatewayHold, PaymentGateway};
