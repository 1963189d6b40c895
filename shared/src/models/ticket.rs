//! Issued ticket model

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketStatus {
    Active,
    Refunded,
}

impl TicketStatus {
    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Refunded => "REFUNDED",
        }
    }

    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "ACTIVE" => Some(Self::Active),
            "REFUNDED" => Some(Self::Refunded),
            _ => None,
        }
    }
}

/// An issued unit of access
///
/// Idempotency key for issuance: `(purchase_id, ticket_type_id,
/// emission_index)`, unique at the storage layer. Emission indices for a
/// given purchase + type are contiguous from 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: String,
    pub purchase_id: String,
    pub ticket_type_id: String,
    /// 0..N-1 within one purchase for the same ticket type
    pub emission_index: i32,
    pub owner_user_id: Option<String>,
    pub guest_email: Option<String>,
    pub guest_name: Option<String>,
    /// Unit price paid in minor units
    pub price: i64,
    /// Price plus the fee allocated to this unit
    pub total_paid: i64,
    pub currency: String,
    pub status: TicketStatus,
    /// Opaque access secret, rotated on resale transfer
    pub access_code: String,
    pub sale_line_id: Option<String>,
    pub pairing_slot_id: Option<String>,
    pub intent_id: Option<String>,
    pub created_at: i64,
}

/// Generate an opaque access secret for a new ticket
pub fn new_access_code() -> String {
    use rand::Rng;
    const CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
    let mut rng = rand::thread_rng();
    (0..20)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_roundtrip() {
        assert_eq!(TicketStatus::from_db("ACTIVE"), Some(TicketStatus::Active));
        assert_eq!(
            TicketStatus::from_db("REFUNDED"),
            Some(TicketStatus::Refunded)
        );
        assert_eq!(TicketStatus::from_db(""), None);
    }

    #[test]
    fn test_access_code_shape() {
        let code = new_access_code();
        assert_eq!(code.len(), 20);
        // Charset excludes ambiguous characters
        assert!(!code.contains('O'));
        assert!(!code.contains('0'));
        assert!(!code.contains('I'));
        assert!(!code.contains('1'));
    }

    #[test]
    fn test_access_codes_differ() {
        assert_ne!(new_access_code(), new_access_code());
    }
}
