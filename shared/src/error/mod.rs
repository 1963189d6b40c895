//! Unified error system for the Courtside fulfillment platform
//!
//! This module provides:
//! - [`ErrorCode`]: standardized error codes for all failure modes
//! - [`ErrorCategory`]: classification of errors by domain
//! - [`AppError`]: rich error type with codes, messages, and details
//! - [`ApiResponse`]: unified API response format
//!
//! # Error Code Ranges
//!
//! - 0xxx: General errors
//! - 1xxx: Event / metadata errors
//! - 2xxx: Account attribution errors
//! - 3xxx: Inventory errors
//! - 4xxx: Pairing errors
//! - 5xxx: Payment errors
//! - 6xxx: Sale / promo errors
//! - 7xxx: Resale errors
//! - 8xxx: Operations queue errors
//! - 9xxx: System errors
//!
//! # Example
//!
//! ```
//! use shared::error::{AppError, ErrorCode, ApiResponse};
//!
//! // Create a simple error
//! let err = AppError::new(ErrorCode::StockInsufficient);
//!
//! // Create an error with custom message
//! let err = AppError::with_message(ErrorCode::InvalidMetadata, "items is not a JSON array");
//!
//! // Create an error with details
//! let err = AppError::invalid_metadata("missing required key")
//!     .with_detail("key", "purchaseId");
//!
//! // Convert to API response
//! let response = ApiResponse::<()>::error(&err);
//! ```

mod category;
mod codes;
mod http;
mod types;

pub use category::ErrorCategory;
pub use codes::{ErrorCode, InvalidErrorCode};
pub use types::{ApiResponse, AppError, AppResult};
