//! courtside-fulfillment: payment event fulfillment engine
//!
//! Long-running service that:
//! - Receives payment gateway webhooks (signature-verified, raw body)
//! - Turns captured payments into exactly-once domain state: tickets,
//!   sale ledgers, entitlements, pairing confirmations
//! - Coordinates two-seat group payments (holds, deferred second charge)
//! - Reverses fulfillment on refunds

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod fulfillment;
pub mod gateway;
pub mod notify;
pub mod reversal;
pub mod state;
pub mod sweep;
pub mod worker;
