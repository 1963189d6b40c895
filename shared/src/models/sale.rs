//! Sale ledger models (summary + lines)

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SaleStatus {
    Paid,
    Refunded,
}

impl SaleStatus {
    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Paid => "PAID",
            Self::Refunded => "REFUNDED",
        }
    }

    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "PAID" => Some(Self::Paid),
            "REFUNDED" => Some(Self::Refunded),
            _ => None,
        }
    }
}

/// One summary per purchase, upserted by `purchase_id`
///
/// Re-delivery of the same gateway event overwrites fields rather than
/// appending. Invariant: sum of line gross amounts equals `subtotal`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleSummary {
    pub purchase_id: String,
    pub subtotal: i64,
    pub discount_total: i64,
    pub platform_fee: i64,
    pub gateway_fee: i64,
    /// Amount owed to the organizer after all fees
    pub net: i64,
    /// Amount actually charged to the buyer
    pub total: i64,
    pub currency: String,
    pub status: SaleStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

/// One line per distinct purchased ticket type
///
/// Lines are deleted and recreated under the upserted summary, so a
/// reprocessed event converges rather than accumulating.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct SaleLine {
    pub id: String,
    pub purchase_id: String,
    pub ticket_type_id: String,
    /// Unit price in minor units
    pub unit_price: i64,
    pub quantity: i32,
    /// Discount allocated to this line (whole line, not per unit)
    pub discount: i64,
    /// Platform fee share allocated to this line
    pub fee_share: i64,
    /// Position of this line within the purchase (stable across rebuilds)
    pub line_index: i32,
}

impl SaleLine {
    /// Gross amount for this line before discount
    pub fn gross(&self) -> i64 {
        self.unit_price * self.quantity as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_roundtrip() {
        assert_eq!(SaleStatus::from_db("PAID"), Some(SaleStatus::Paid));
        assert_eq!(SaleStatus::from_db("REFUNDED"), Some(SaleStatus::Refunded));
        assert_eq!(SaleStatus::from_db("paid"), None);
    }

    #[test]
    fn test_line_gross() {
        let line = SaleLine {
            id: "sl_1".into(),
            purchase_id: "pu_1".into(),
            ticket_type_id: "tt_1".into(),
            unit_price: 2500,
            quantity: 3,
            discount: 0,
            fee_share: 0,
            line_index: 0,
        };
        assert_eq!(line.gross(), 7500);
    }
}
