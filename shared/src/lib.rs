//! Shared types for the Courtside fulfillment platform
//!
//! Domain models, pricing math, scenario metadata, and the unified
//! error system used by the fulfillment service.

pub mod anchor;
pub mod error;
pub mod models;
pub mod pricing;
pub mod scenario;

// Re-exports
pub use http;
pub use serde::{Deserialize, Serialize};

pub use anchor::AnchorKey;
pub use scenario::{Buyer, PaymentScenario};
