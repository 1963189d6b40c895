//! Unified error codes for the Courtside fulfillment platform
//!
//! Error codes are organized by category:
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

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility (Rust, TypeScript, etc.)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,
    /// Invalid format
    InvalidFormat = 6,
    /// Required field missing
    RequiredField = 7,
    /// Value out of range
    ValueOutOfRange = 8,

    // ==================== 1xxx: Event / metadata ====================
    /// Event metadata missing or malformed
    InvalidMetadata = 1001,
    /// Unknown payment scenario tag
    UnknownScenario = 1002,
    /// `items` metadata is not a valid line-item array
    InvalidItems = 1003,
    /// `breakdown` metadata does not match the pricing schema
    InvalidBreakdown = 1004,
    /// Webhook signature verification failed
    SignatureInvalid = 1005,
    /// Event already processed (not an error for callers)
    DuplicateEvent = 1006,
    /// Event carries no usable anchor (no purchase, event, or intent id)
    AnchorUnresolved = 1007,

    // ==================== 2xxx: Account ====================
    /// Cannot attribute the event to an owning account (retryable)
    OrgNotResolved = 2001,
    /// Referenced user does not exist
    UserNotFound = 2002,

    // ==================== 3xxx: Inventory ====================
    /// Remaining inventory below requested quantity
    StockInsufficient = 3001,
    /// Ticket type not found
    TicketTypeNotFound = 3002,

    // ==================== 4xxx: Pairing ====================
    /// Pairing not found
    PairingNotFound = 4001,
    /// Pairing is not in split-payment mode
    PairingNotSplit = 4002,
    /// Pairing is not in full-payment mode
    PairingNotFull = 4003,
    /// Pairing has been cancelled
    PairingCancelled = 4004,
    /// Pairing slot not found
    SlotNotFound = 4005,
    /// Pairing slot has already been paid
    SlotAlreadyPaid = 4006,
    /// Capacity hold has expired
    HoldExpired = 4007,
    /// Pairing carries no second-charge guarantee
    GuaranteeNotFound = 4008,

    // ==================== 5xxx: Payment ====================
    /// Payment processing failed
    PaymentFailed = 5001,
    /// Captured amount does not match the expected total
    AmountMismatch = 5002,
    /// Idempotency key reused with a different payload
    IdempotencyKeyMismatch = 5003,
    /// Payment has already been refunded
    PaymentAlreadyRefunded = 5004,
    /// Actual gateway fee lookup failed (estimate stands)
    FeeLookupFailed = 5005,

    // ==================== 6xxx: Sale / promo ====================
    /// Sale summary not found
    SaleNotFound = 6001,
    /// Promo code not found
    PromoCodeNotFound = 6002,
    /// Promo code redemption limit reached
    PromoExhausted = 6003,

    // ==================== 7xxx: Resale ====================
    /// Resale listing not found
    ListingNotFound = 7001,
    /// Resale listing is not active
    ListingNotActive = 7002,

    // ==================== 8xxx: Operations queue ====================
    /// Queued operation not found
    OperationNotFound = 8001,
    /// Operation exceeded its retry budget
    OperationDeadLettered = 8002,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
    /// Network error
    NetworkError = 9003,
    /// Operation timeout
    TimeoutError = 9004,
    /// Configuration error
    ConfigError = 9005,
    /// Payment gateway API error
    GatewayError = 9006,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Retryable errors leave the ledger row in a state a later delivery
    /// may still resolve; terminal errors will fail the same way again.
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorCode::OrgNotResolved
                | ErrorCode::NetworkError
                | ErrorCode::TimeoutError
                | ErrorCode::DatabaseError
                | ErrorCode::GatewayError
        )
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::Unknown => "An unknown error occurred",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::AlreadyExists => "Resource already exists",
            ErrorCode::InvalidRequest => "Invalid request",
            ErrorCode::InvalidFormat => "Invalid format",
            ErrorCode::RequiredField => "Required field is missing",
            ErrorCode::ValueOutOfRange => "Value is out of range",

            // Event / metadata
            ErrorCode::InvalidMetadata => "Event metadata missing or malformed",
            ErrorCode::UnknownScenario => "Unknown payment scenario tag",
            ErrorCode::InvalidItems => "Invalid line-item metadata",
            ErrorCode::InvalidBreakdown => "Invalid pricing breakdown metadata",
            ErrorCode::SignatureInvalid => "Webhook signature verification failed",
            ErrorCode::DuplicateEvent => "Event already processed",
            ErrorCode::AnchorUnresolved => "Event carries no usable anchor id",

            // Account
            ErrorCode::OrgNotResolved => "Cannot resolve owning account for event",
            ErrorCode::UserNotFound => "User not found",

            // Inventory
            ErrorCode::StockInsufficient => "Insufficient inventory remaining",
            ErrorCode::TicketTypeNotFound => "Ticket type not found",

            // Pairing
            ErrorCode::PairingNotFound => "Pairing not found",
            ErrorCode::PairingNotSplit => "Pairing is not in split-payment mode",
            ErrorCode::PairingNotFull => "Pairing is not in full-payment mode",
            ErrorCode::PairingCancelled => "Pairing has been cancelled",
            ErrorCode::SlotNotFound => "Pairing slot not found",
            ErrorCode::SlotAlreadyPaid => "Pairing slot has already been paid",
            ErrorCode::HoldExpired => "Capacity hold has expired",
            ErrorCode::GuaranteeNotFound => "Pairing has no second-charge guarantee",

            // Payment
            ErrorCode::PaymentFailed => "Payment processing failed",
            ErrorCode::AmountMismatch => "Captured amount does not match expected total",
            ErrorCode::IdempotencyKeyMismatch => {
                "Idempotency key reused with a different payload"
            }
            ErrorCode::PaymentAlreadyRefunded => "Payment has already been refunded",
            ErrorCode::FeeLookupFailed => "Gateway fee lookup failed",

            // Sale / promo
            ErrorCode::SaleNotFound => "Sale summary not found",
            ErrorCode::PromoCodeNotFound => "Promo code not found",
            ErrorCode::PromoExhausted => "Promo code redemption limit reached",

            // Resale
            ErrorCode::ListingNotFound => "Resale listing not found",
            ErrorCode::ListingNotActive => "Resale listing is not active",

            // Operations queue
            ErrorCode::OperationNotFound => "Queued operation not found",
            ErrorCode::OperationDeadLettered => "Operation exceeded its retry budget",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
            ErrorCode::NetworkError => "Network error",
            ErrorCode::TimeoutError => "Operation timed out",
            ErrorCode::ConfigError => "Configuration error",
            ErrorCode::GatewayError => "Payment gateway API error",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            4 => Ok(ErrorCode::AlreadyExists),
            5 => Ok(ErrorCode::InvalidRequest),
            6 => Ok(ErrorCode::InvalidFormat),
            7 => Ok(ErrorCode::RequiredField),
            8 => Ok(ErrorCode::ValueOutOfRange),

            // Event / metadata
            1001 => Ok(ErrorCode::InvalidMetadata),
            1002 => Ok(ErrorCode::UnknownScenario),
            1003 => Ok(ErrorCode::InvalidItems),
            1004 => Ok(ErrorCode::InvalidBreakdown),
            1005 => Ok(ErrorCode::SignatureInvalid),
            1006 => Ok(ErrorCode::DuplicateEvent),
            1007 => Ok(ErrorCode::AnchorUnresolved),

            // Account
            2001 => Ok(ErrorCode::OrgNotResolved),
            2002 => Ok(ErrorCode::UserNotFound),

            // Inventory
            3001 => Ok(ErrorCode::StockInsufficient),
            3002 => Ok(ErrorCode::TicketTypeNotFound),

            // Pairing
            4001 => Ok(ErrorCode::PairingNotFound),
            4002 => Ok(ErrorCode::PairingNotSplit),
            4003 => Ok(ErrorCode::PairingNotFull),
            4004 => Ok(ErrorCode::PairingCancelled),
            4005 => Ok(ErrorCode::SlotNotFound),
            4006 => Ok(ErrorCode::SlotAlreadyPaid),
            4007 => Ok(ErrorCode::HoldExpired),
            4008 => Ok(ErrorCode::GuaranteeNotFound),

            // Payment
            5001 => Ok(ErrorCode::PaymentFailed),
            5002 => Ok(ErrorCode::AmountMismatch),
            5003 => Ok(ErrorCode::IdempotencyKeyMismatch),
            5004 => Ok(ErrorCode::PaymentAlreadyRefunded),
            5005 => Ok(ErrorCode::FeeLookupFailed),

            // Sale / promo
            6001 => Ok(ErrorCode::SaleNotFound),
            6002 => Ok(ErrorCode::PromoCodeNotFound),
            6003 => Ok(ErrorCode::PromoExhausted),

            // Resale
            7001 => Ok(ErrorCode::ListingNotFound),
            7002 => Ok(ErrorCode::ListingNotActive),

            // Operations queue
            8001 => Ok(ErrorCode::OperationNotFound),
            8002 => Ok(ErrorCode::OperationDeadLettered),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::DatabaseError),
            9003 => Ok(ErrorCode::NetworkError),
            9004 => Ok(ErrorCode::TimeoutError),
            9005 => Ok(ErrorCode::ConfigError),
            9006 => Ok(ErrorCode::GatewayError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_values() {
        // General
        assert_eq!(ErrorCode::Success.code(), 0);
        assert_eq!(ErrorCode::Unknown.code(), 1);
        assert_eq!(ErrorCode::ValidationFailed.code(), 2);
        assert_eq!(ErrorCode::NotFound.code(), 3);
        assert_eq!(ErrorCode::AlreadyExists.code(), 4);
        assert_eq!(ErrorCode::InvalidRequest.code(), 5);

        // Event / metadata
        assert_eq!(ErrorCode::InvalidMetadata.code(), 1001);
        assert_eq!(ErrorCode::UnknownScenario.code(), 1002);
        assert_eq!(ErrorCode::InvalidItems.code(), 1003);
        assert_eq!(ErrorCode::InvalidBreakdown.code(), 1004);
        assert_eq!(ErrorCode::SignatureInvalid.code(), 1005);
        assert_eq!(ErrorCode::DuplicateEvent.code(), 1006);
        assert_eq!(ErrorCode::AnchorUnresolved.code(), 1007);

        // Account
        assert_eq!(ErrorCode::OrgNotResolved.code(), 2001);
        assert_eq!(ErrorCode::UserNotFound.code(), 2002);

        // Inventory
        assert_eq!(ErrorCode::StockInsufficient.code(), 3001);
        assert_eq!(ErrorCode::TicketTypeNotFound.code(), 3002);

        // Pairing
        assert_eq!(ErrorCode::PairingNotFound.code(), 4001);
        assert_eq!(ErrorCode::PairingNotSplit.code(), 4002);
        assert_eq!(ErrorCode::PairingNotFull.code(), 4003);
        assert_eq!(ErrorCode::PairingCancelled.code(), 4004);
        assert_eq!(ErrorCode::SlotNotFound.code(), 4005);
        assert_eq!(ErrorCode::SlotAlreadyPaid.code(), 4006);
        assert_eq!(ErrorCode::HoldExpired.code(), 4007);
        assert_eq!(ErrorCode::GuaranteeNotFound.code(), 4008);

        // Payment
        assert_eq!(ErrorCode::PaymentFailed.code(), 5001);
        assert_eq!(ErrorCode::AmountMismatch.code(), 5002);
        assert_eq!(ErrorCode::IdempotencyKeyMismatch.code(), 5003);
        assert_eq!(ErrorCode::PaymentAlreadyRefunded.code(), 5004);
        assert_eq!(ErrorCode::FeeLookupFailed.code(), 5005);

        // Sale / promo
        assert_eq!(ErrorCode::SaleNotFound.code(), 6001);
        assert_eq!(ErrorCode::PromoCodeNotFound.code(), 6002);
        assert_eq!(ErrorCode::PromoExhausted.code(), 6003);

        // Resale
        assert_eq!(ErrorCode::ListingNotFound.code(), 7001);
        assert_eq!(ErrorCode::ListingNotActive.code(), 7002);

        // Operations queue
        assert_eq!(ErrorCode::OperationNotFound.code(), 8001);
        assert_eq!(ErrorCode::OperationDeadLettered.code(), 8002);

        // System
        assert_eq!(ErrorCode::InternalError.code(), 9001);
        assert_eq!(ErrorCode::DatabaseError.code(), 9002);
        assert_eq!(ErrorCode::NetworkError.code(), 9003);
        assert_eq!(ErrorCode::TimeoutError.code(), 9004);
        assert_eq!(ErrorCode::ConfigError.code(), 9005);
        assert_eq!(ErrorCode::GatewayError.code(), 9006);
    }

    #[test]
    fn test_is_success() {
        assert!(ErrorCode::Success.is_success());
        assert!(!ErrorCode::Unknown.is_success());
        assert!(!ErrorCode::StockInsufficient.is_success());
        assert!(!ErrorCode::InternalError.is_success());
    }

    #[test]
    fn test_is_retryable() {
        assert!(ErrorCode::OrgNotResolved.is_retryable());
        assert!(ErrorCode::NetworkError.is_retryable());
        assert!(ErrorCode::GatewayError.is_retryable());
        // Terminal errors fail identically on retry
        assert!(!ErrorCode::InvalidMetadata.is_retryable());
        assert!(!ErrorCode::StockInsufficient.is_retryable());
        assert!(!ErrorCode::PairingCancelled.is_retryable());
    }

    #[test]
    fn test_try_from_valid() {
        assert_eq!(ErrorCode::try_from(0), Ok(ErrorCode::Success));
        assert_eq!(ErrorCode::try_from(1001), Ok(ErrorCode::InvalidMetadata));
        assert_eq!(ErrorCode::try_from(3001), Ok(ErrorCode::StockInsufficient));
        assert_eq!(ErrorCode::try_from(4002), Ok(ErrorCode::PairingNotSplit));
        assert_eq!(ErrorCode::try_from(5004), Ok(ErrorCode::PaymentAlreadyRefunded));
        assert_eq!(ErrorCode::try_from(9001), Ok(ErrorCode::InternalError));
    }

    #[test]
    fn test_try_from_invalid() {
        assert_eq!(ErrorCode::try_from(999), Err(InvalidErrorCode(999)));
        assert_eq!(ErrorCode::try_from(10000), Err(InvalidErrorCode(10000)));
        assert_eq!(ErrorCode::try_from(4321), Err(InvalidErrorCode(4321)));
    }

    #[test]
    fn test_from_error_code_to_u16() {
        let code: u16 = ErrorCode::Success.into();
        assert_eq!(code, 0);

        let code: u16 = ErrorCode::StockInsufficient.into();
        assert_eq!(code, 3001);

        let code: u16 = ErrorCode::InternalError.into();
        assert_eq!(code, 9001);
    }

    #[test]
    fn test_serialize() {
        let code = ErrorCode::NotFound;
        let json = serde_json::to_string(&code).unwrap();
        assert_eq!(json, "3");

        let code = ErrorCode::PairingNotFound;
        let json = serde_json::to_string(&code).unwrap();
        assert_eq!(json, "4001");
    }

    #[test]
    fn test_deserialize() {
        let code: ErrorCode = serde_json::from_str("0").unwrap();
        assert_eq!(code, ErrorCode::Success);

        let code: ErrorCode = serde_json::from_str("3001").unwrap();
        assert_eq!(code, ErrorCode::StockInsufficient);

        let code: ErrorCode = serde_json::from_str("9001").unwrap();
        assert_eq!(code, ErrorCode::InternalError);
    }

    #[test]
    fn test_deserialize_invalid() {
        let result: Result<ErrorCode, _> = serde_json::from_str("999");
        assert!(result.is_err());

        let result: Result<ErrorCode, _> = serde_json::from_str("10000");
        assert!(result.is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", ErrorCode::Success), "0");
        assert_eq!(format!("{}", ErrorCode::NotFound), "3");
        assert_eq!(format!("{}", ErrorCode::PairingNotSplit), "4002");
        assert_eq!(format!("{}", ErrorCode::InternalError), "9001");
    }

    #[test]
    fn test_message() {
        assert_eq!(
            ErrorCode::StockInsufficient.message(),
            "Insufficient inventory remaining"
        );
        assert_eq!(
            ErrorCode::InvalidMetadata.message(),
            "Event metadata missing or malformed"
        );
        assert_eq!(ErrorCode::SlotNotFound.message(), "Pairing slot not found");
        assert_eq!(ErrorCode::InternalError.message(), "Internal server error");
    }

    #[test]
    fn test_roundtrip() {
        let codes = [
            ErrorCode::Success,
            ErrorCode::InvalidMetadata,
            ErrorCode::StockInsufficient,
            ErrorCode::PairingCancelled,
            ErrorCode::PaymentAlreadyRefunded,
            ErrorCode::InternalError,
        ];

        for code in codes {
            let json = serde_json::to_string(&code).unwrap();
            let parsed: ErrorCode = serde_json::from_str(&json).unwrap();
            assert_eq!(code, parsed);
        }
    }

    #[test]
    fn test_hash() {
        use std::collections::HashSet;

        let mut set = HashSet::new();
        set.insert(ErrorCode::Success);
        set.insert(ErrorCode::NotFound);
        set.insert(ErrorCode::Success); // Duplicate

        assert_eq!(set.len(), 2);
        assert!(set.contains(&ErrorCode::Success));
        assert!(set.contains(&ErrorCode::NotFound));
    }
}
