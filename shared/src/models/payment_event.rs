//! Payment event (dedup ledger) model

use serde::{Deserialize, Serialize};

/// Status of a dedup-ledger row
///
/// Transitions are monotonic: `Processing → {Ok|Error} → Refunded`.
/// A `Refunded` row is never resurrected to `Ok`; the conditional
/// UPDATEs in the db layer enforce this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentEventStatus {
    Processing,
    Ok,
    Error,
    Refunded,
}

impl PaymentEventStatus {
    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Processing => "PROCESSING",
            Self::Ok => "OK",
            Self::Error => "ERROR",
            Self::Refunded => "REFUNDED",
        }
    }

    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "PROCESSING" => Some(Self::Processing),
            "OK" => Some(Self::Ok),
            "ERROR" => Some(Self::Error),
            "REFUNDED" => Some(Self::Refunded),
            _ => None,
        }
    }

    /// Whether a row in this status may move to `to`
    ///
    /// An `Error` row re-enters `Processing` on re-delivery. A fulfilled
    /// (`Ok`) row never reprocesses and never degrades to `Error`; its only
    /// exit is `Refunded`. `Refunded` is terminal.
    pub fn can_transition_to(&self, to: Self) -> bool {
        matches!(
            (*self, to),
            (Self::Processing, Self::Ok | Self::Error | Self::Refunded)
                | (Self::Error, Self::Processing | Self::Refunded)
                | (Self::Ok, Self::Refunded)
        )
    }
}

/// One dedup-ledger row per logical purchase
///
/// `anchor` is the stable key (purchase id, else gateway event id, else
/// intent id). Re-delivery of the same event updates the row in place
/// rather than duplicating it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentEvent {
    pub anchor: String,
    pub status: PaymentEventStatus,
    pub attempts: i32,
    /// Captured amount in minor units
    pub amount: i64,
    pub currency: String,
    pub user_id: Option<String>,
    pub intent_id: Option<String>,
    /// Gateway event id of the most recent delivery
    pub last_event_id: Option<String>,
    pub error_message: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_db_roundtrip() {
        for s in [
            PaymentEventStatus::Processing,
            PaymentEventStatus::Ok,
            PaymentEventStatus::Error,
            PaymentEventStatus::Refunded,
        ] {
            assert_eq!(PaymentEventStatus::from_db(s.as_db()), Some(s));
        }
        assert_eq!(PaymentEventStatus::from_db("BOGUS"), None);
    }

    #[test]
    fn test_refunded_is_terminal() {
        let refunded = PaymentEventStatus::Refunded;
        assert!(!refunded.can_transition_to(PaymentEventStatus::Ok));
        assert!(!refunded.can_transition_to(PaymentEventStatus::Processing));
        assert!(!refunded.can_transition_to(PaymentEventStatus::Error));
    }

    #[test]
    fn test_error_rows_reprocess() {
        // A re-delivery retries a failed purchase
        assert!(PaymentEventStatus::Error.can_transition_to(PaymentEventStatus::Processing));
        assert!(PaymentEventStatus::Processing.can_transition_to(PaymentEventStatus::Ok));
        assert!(PaymentEventStatus::Processing.can_transition_to(PaymentEventStatus::Error));
    }

    #[test]
    fn test_fulfilled_rows_only_refund() {
        // A fulfilled row must not degrade or reprocess, only refund
        assert!(!PaymentEventStatus::Ok.can_transition_to(PaymentEventStatus::Error));
        assert!(!PaymentEventStatus::Ok.can_transition_to(PaymentEventStatus::Processing));
        assert!(!PaymentEventStatus::Error.can_transition_to(PaymentEventStatus::Ok));
        assert!(PaymentEventStatus::Ok.can_transition_to(PaymentEventStatus::Refunded));
        assert!(PaymentEventStatus::Error.can_transition_to(PaymentEventStatus::Refunded));
    }

    #[test]
    fn test_serde_screaming_snake() {
        let json = serde_json::to_string(&PaymentEventStatus::Processing).unwrap();
        assert_eq!(json, "\"PROCESSING\"");
        let s: PaymentEventStatus = serde_json::from_str("\"REFUNDED\"").unwrap();
        assert_eq!(s, PaymentEventStatus::Refunded);
    }
}
