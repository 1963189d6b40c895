//! Error category classification

use super::codes::ErrorCode;
use serde::{Deserialize, Serialize};

/// Error category classification based on error code ranges
///
/// Categories are determined by the leading digit of the error code:
/// - 0xxx: General errors
/// - 1xxx: Event / metadata errors
/// - 2xxx: Account attribution errors
/// - 3xxx: Inventory errors
/// - 4xxx: Pairing errors
/// - 5xxx: Payment errors
/// - 6xxx: Sale / promo errors
/// - 7xxx: Resale errors
/// - 8xxx: Operations queue errors
/// - 9xxx: System errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// General errors (0xxx)
    General,
    /// Event / metadata errors (1xxx)
    Event,
    /// Account attribution errors (2xxx)
    Account,
    /// Inventory errors (3xxx)
    Inventory,
    /// Pairing errors (4xxx)
    Pairing,
    /// Payment errors (5xxx)
    Payment,
    /// Sale / promo errors (6xxx)
    Sale,
    /// Resale errors (7xxx)
    Resale,
    /// Operations queue errors (8xxx)
    Operations,
    /// System errors (9xxx)
    System,
}

impl ErrorCategory {
    /// Determine category from error code value
    pub fn from_code(code: u16) -> Self {
        match code {
            0..1000 => Self::General,
            1000..2000 => Self::Event,
            2000..3000 => Self::Account,
            3000..4000 => Self::Inventory,
            4000..5000 => Self::Pairing,
            5000..6000 => Self::Payment,
            6000..7000 => Self::Sale,
            7000..8000 => Self::Resale,
            8000..9000 => Self::Operations,
            _ => Self::System,
        }
    }

    /// Get the string name for this category
    pub fn name(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Event => "event",
            Self::Account => "account",
            Self::Inventory => "inventory",
            Self::Pairing => "pairing",
            Self::Payment => "payment",
            Self::Sale => "sale",
            Self::Resale => "resale",
            Self::Operations => "operations",
            Self::System => "system",
        }
    }
}

impl ErrorCode {
    /// Get the category for this error code
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::from_code(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_from_code() {
        assert_eq!(ErrorCategory::from_code(0), ErrorCategory::General);
        assert_eq!(ErrorCategory::from_code(8), ErrorCategory::General);
        assert_eq!(ErrorCategory::from_code(999), ErrorCategory::General);

        assert_eq!(ErrorCategory::from_code(1001), ErrorCategory::Event);
        assert_eq!(ErrorCategory::from_code(1999), ErrorCategory::Event);

        assert_eq!(ErrorCategory::from_code(2001), ErrorCategory::Account);
        assert_eq!(ErrorCategory::from_code(3001), ErrorCategory::Inventory);
        assert_eq!(ErrorCategory::from_code(4001), ErrorCategory::Pairing);
        assert_eq!(ErrorCategory::from_code(5001), ErrorCategory::Payment);
        assert_eq!(ErrorCategory::from_code(6001), ErrorCategory::Sale);
        assert_eq!(ErrorCategory::from_code(7001), ErrorCategory::Resale);
        assert_eq!(ErrorCategory::from_code(8001), ErrorCategory::Operations);
        assert_eq!(ErrorCategory::from_code(9001), ErrorCategory::System);
        assert_eq!(ErrorCategory::from_code(10000), ErrorCategory::System);
    }

    #[test]
    fn test_error_code_category() {
        assert_eq!(ErrorCode::Success.category(), ErrorCategory::General);
        assert_eq!(ErrorCode::InvalidMetadata.category(), ErrorCategory::Event);
        assert_eq!(ErrorCode::OrgNotResolved.category(), ErrorCategory::Account);
        assert_eq!(
            ErrorCode::StockInsufficient.category(),
            ErrorCategory::Inventory
        );
        assert_eq!(ErrorCode::SlotNotFound.category(), ErrorCategory::Pairing);
        assert_eq!(ErrorCode::PaymentFailed.category(), ErrorCategory::Payment);
        assert_eq!(ErrorCode::SaleNotFound.category(), ErrorCategory::Sale);
        assert_eq!(ErrorCode::ListingNotFound.category(), ErrorCategory::Resale);
        assert_eq!(
            ErrorCode::OperationDeadLettered.category(),
            ErrorCategory::Operations
        );
        assert_eq!(ErrorCode::InternalError.category(), ErrorCategory::System);
    }

    #[test]
    fn test_category_name() {
        assert_eq!(ErrorCategory::General.name(), "general");
        assert_eq!(ErrorCategory::Event.name(), "event");
        assert_eq!(ErrorCategory::Account.name(), "account");
        assert_eq!(ErrorCategory::Inventory.name(), "inventory");
        assert_eq!(ErrorCategory::Pairing.name(), "pairing");
        assert_eq!(ErrorCategory::Payment.name(), "payment");
        assert_eq!(ErrorCategory::Sale.name(), "sale");
        assert_eq!(ErrorCategory::Resale.name(), "resale");
        assert_eq!(ErrorCategory::Operations.name(), "operations");
        assert_eq!(ErrorCategory::System.name(), "system");
    }

    #[test]
    fn test_category_serialize() {
        let category = ErrorCategory::Pairing;
        let json = serde_json::to_string(&category).unwrap();
        assert_eq!(json, "\"pairing\"");

        let category: ErrorCategory = serde_json::from_str("\"inventory\"").unwrap();
        assert_eq!(category, ErrorCategory::Inventory);
    }
}
