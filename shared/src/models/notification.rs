//! Notification outbox model
//!
//! Only the enqueue contract lives in this engine; delivery is owned by
//! an external collaborator reading the outbox.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    PurchaseConfirmed,
    PartnerPaid,
    DeadlineExpired,
    OffSessionActionRequired,
}

impl NotificationKind {
    pub fn as_db(&self) -> &'static str {
        match self {
            Self::PurchaseConfirmed => "PURCHASE_CONFIRMED",
            Self::PartnerPaid => "PARTNER_PAID",
            Self::DeadlineExpired => "DEADLINE_EXPIRED",
            Self::OffSessionActionRequired => "OFF_SESSION_ACTION_REQUIRED",
        }
    }

    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "PURCHASE_CONFIRMED" => Some(Self::PurchaseConfirmed),
            "PARTNER_PAID" => Some(Self::PartnerPaid),
            "DEADLINE_EXPIRED" => Some(Self::DeadlineExpired),
            "OFF_SESSION_ACTION_REQUIRED" => Some(Self::OffSessionActionRequired),
            _ => None,
        }
    }
}

/// One outbox row, deduplicated by `dedupe_key`
///
/// The key is derived from the triggering entity id (for example
/// `<purchase_id>:notify:<user_id>`), so re-running fulfillment enqueues
/// at most one notification per trigger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub dedupe_key: String,
    pub kind: NotificationKind,
    pub target_user_id: Option<String>,
    pub target_email: Option<String>,
    pub payload: serde_json::Value,
    pub created_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_roundtrip() {
        for k in [
            NotificationKind::PurchaseConfirmed,
            NotificationKind::PartnerPaid,
            NotificationKind::DeadlineExpired,
            NotificationKind::OffSessionActionRequired,
        ] {
            assert_eq!(NotificationKind::from_db(k.as_db()), Some(k));
        }
        assert_eq!(NotificationKind::from_db("SOMETHING"), None);
    }
}
