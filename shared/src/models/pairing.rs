//! Pairing (two-seat group purchase) models and state machine

use serde::{Deserialize, Serialize};

/// How a pairing's two seats are paid for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMode {
    /// One payer covers both seats in a single charge
    Full,
    /// Each seat pays independently
    Split,
}

impl PaymentMode {
    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Full => "FULL",
            Self::Split => "SPLIT",
        }
    }

    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "FULL" => Some(Self::Full),
            "SPLIT" => Some(Self::Split),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SlotRole {
    Captain,
    Partner,
}

impl SlotRole {
    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Captain => "CAPTAIN",
            Self::Partner => "PARTNER",
        }
    }

    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "CAPTAIN" => Some(Self::Captain),
            "PARTNER" => Some(Self::Partner),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SlotOccupancy {
    Pending,
    Filled,
    Cancelled,
}

impl SlotOccupancy {
    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Filled => "FILLED",
            Self::Cancelled => "CANCELLED",
        }
    }

    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(Self::Pending),
            "FILLED" => Some(Self::Filled),
            "CANCELLED" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SlotPayment {
    Unpaid,
    Paid,
}

impl SlotPayment {
    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Unpaid => "UNPAID",
            Self::Paid => "PAID",
        }
    }

    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "UNPAID" => Some(Self::Unpaid),
            "PAID" => Some(Self::Paid),
            _ => None,
        }
    }
}

/// Aggregate lifecycle of a pairing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PairingStatus {
    PendingOnePaid,
    PendingPartnerPayment,
    ConfirmedCaptainFull,
    Confirmed,
    Complete,
    Cancelled,
    /// A previously confirmed pairing lost one seat to a partial refund
    Incomplete,
}

impl PairingStatus {
    pub fn as_db(&self) -> &'static str {
        match self {
            Self::PendingOnePaid => "PENDING_ONE_PAID",
            Self::PendingPartnerPayment => "PENDING_PARTNER_PAYMENT",
            Self::ConfirmedCaptainFull => "CONFIRMED_CAPTAIN_FULL",
            Self::Confirmed => "CONFIRMED",
            Self::Complete => "COMPLETE",
            Self::Cancelled => "CANCELLED",
            Self::Incomplete => "INCOMPLETE",
        }
    }

    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "PENDING_ONE_PAID" => Some(Self::PendingOnePaid),
            "PENDING_PARTNER_PAYMENT" => Some(Self::PendingPartnerPayment),
            "CONFIRMED_CAPTAIN_FULL" => Some(Self::ConfirmedCaptainFull),
            "CONFIRMED" => Some(Self::Confirmed),
            "COMPLETE" => Some(Self::Complete),
            "CANCELLED" => Some(Self::Cancelled),
            "INCOMPLETE" => Some(Self::Incomplete),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Cancelled | Self::Incomplete)
    }
}

/// Status of the deferred second-charge guarantee
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GuaranteeStatus {
    None,
    Pending,
    /// The off-session charge requires customer authentication
    NeedsAuth,
    Paid,
    Failed,
}

impl GuaranteeStatus {
    pub fn as_db(&self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Pending => "PENDING",
            Self::NeedsAuth => "NEEDS_AUTH",
            Self::Paid => "PAID",
            Self::Failed => "FAILED",
        }
    }

    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "NONE" => Some(Self::None),
            "PENDING" => Some(Self::Pending),
            "NEEDS_AUTH" => Some(Self::NeedsAuth),
            "PAID" => Some(Self::Paid),
            "FAILED" => Some(Self::Failed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HoldStatus {
    Active,
    Cancelled,
    Expired,
}

impl HoldStatus {
    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Cancelled => "CANCELLED",
            Self::Expired => "EXPIRED",
        }
    }

    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "ACTIVE" => Some(Self::Active),
            "CANCELLED" => Some(Self::Cancelled),
            "EXPIRED" => Some(Self::Expired),
            _ => None,
        }
    }
}

/// One seat within a pairing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairingSlot {
    pub id: String,
    pub pairing_id: String,
    pub role: SlotRole,
    pub occupancy: SlotOccupancy,
    pub payment: SlotPayment,
    /// Player identity occupying this seat, if claimed
    pub player_user_id: Option<String>,
    pub ticket_id: Option<String>,
}

/// A two-seat group purchase unit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pairing {
    pub id: String,
    pub event_id: String,
    pub ticket_type_id: String,
    pub captain_user_id: String,
    pub partner_user_id: Option<String>,
    pub payment_mode: PaymentMode,
    pub status: PairingStatus,
    /// Invite/link tokens, cleared once the partner is bound or the
    /// pairing is cancelled
    pub invite_token: Option<String>,
    pub link_token: Option<String>,
    pub guarantee_status: GuaranteeStatus,
    /// Epoch millis deadline for the second-charge grace period
    pub grace_deadline: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A time-boxed reservation of pairing capacity
///
/// At most one `Active` hold exists per pairing (partial unique index).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hold {
    pub id: String,
    pub pairing_id: String,
    pub status: HoldStatus,
    pub expires_at: i64,
    pub created_at: i64,
}

/// Recompute the aggregate pairing status after a payment lands
///
/// A pairing is `Complete` iff every slot is filled and paid. With every
/// seat paid but the partner seat still awaiting its claim, a full-mode
/// pairing sits at `ConfirmedCaptainFull` and a split-mode pairing at
/// `Confirmed`. Any unpaid seat leaves the pairing waiting on the partner.
pub fn resolve_status(mode: PaymentMode, slots: &[PairingSlot]) -> PairingStatus {
    if slots
        .iter()
        .any(|s| s.occupancy == SlotOccupancy::Cancelled)
    {
        return PairingStatus::Cancelled;
    }

    let all_paid = slots.iter().all(|s| s.payment == SlotPayment::Paid);
    let all_filled = slots.iter().all(|s| s.occupancy == SlotOccupancy::Filled);
    let any_paid = slots.iter().any(|s| s.payment == SlotPayment::Paid);

    if all_paid && all_filled {
        PairingStatus::Complete
    } else if all_paid {
        match mode {
            PaymentMode::Full => PairingStatus::ConfirmedCaptainFull,
            PaymentMode::Split => PairingStatus::Confirmed,
        }
    } else if any_paid {
        PairingStatus::PendingPartnerPayment
    } else {
        PairingStatus::PendingOnePaid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(role: SlotRole, occupancy: SlotOccupancy, payment: SlotPayment) -> PairingSlot {
        PairingSlot {
            id: format!("sl_{}", role.as_db()),
            pairing_id: "pr_1".into(),
            role,
            occupancy,
            payment,
            player_user_id: None,
            ticket_id: None,
        }
    }

    #[test]
    fn test_complete_requires_all_filled_and_paid() {
        let slots = [
            slot(SlotRole::Captain, SlotOccupancy::Filled, SlotPayment::Paid),
            slot(SlotRole::Partner, SlotOccupancy::Filled, SlotPayment::Paid),
        ];
        assert_eq!(
            resolve_status(PaymentMode::Full, &slots),
            PairingStatus::Complete
        );
        assert_eq!(
            resolve_status(PaymentMode::Split, &slots),
            PairingStatus::Complete
        );
    }

    #[test]
    fn test_full_mode_paid_but_partner_unclaimed() {
        // Captain paid both seats; partner seat not yet claimed
        let slots = [
            slot(SlotRole::Captain, SlotOccupancy::Filled, SlotPayment::Paid),
            slot(SlotRole::Partner, SlotOccupancy::Pending, SlotPayment::Paid),
        ];
        assert_eq!(
            resolve_status(PaymentMode::Full, &slots),
            PairingStatus::ConfirmedCaptainFull
        );
    }

    #[test]
    fn test_split_mode_one_seat_paid() {
        let slots = [
            slot(SlotRole::Captain, SlotOccupancy::Filled, SlotPayment::Paid),
            slot(SlotRole::Partner, SlotOccupancy::Pending, SlotPayment::Unpaid),
        ];
        assert_eq!(
            resolve_status(PaymentMode::Split, &slots),
            PairingStatus::PendingPartnerPayment
        );
    }

    #[test]
    fn test_split_mode_both_paid_partner_unclaimed() {
        let slots = [
            slot(SlotRole::Captain, SlotOccupancy::Filled, SlotPayment::Paid),
            slot(SlotRole::Partner, SlotOccupancy::Pending, SlotPayment::Paid),
        ];
        assert_eq!(
            resolve_status(PaymentMode::Split, &slots),
            PairingStatus::Confirmed
        );
    }

    #[test]
    fn test_cancelled_slot_cancels_pairing() {
        let slots = [
            slot(SlotRole::Captain, SlotOccupancy::Filled, SlotPayment::Paid),
            slot(SlotRole::Partner, SlotOccupancy::Cancelled, SlotPayment::Unpaid),
        ];
        assert_eq!(
            resolve_status(PaymentMode::Split, &slots),
            PairingStatus::Cancelled
        );
    }

    #[test]
    fn test_nothing_paid() {
        let slots = [
            slot(SlotRole::Captain, SlotOccupancy::Filled, SlotPayment::Unpaid),
            slot(SlotRole::Partner, SlotOccupancy::Pending, SlotPayment::Unpaid),
        ];
        assert_eq!(
            resolve_status(PaymentMode::Split, &slots),
            PairingStatus::PendingOnePaid
        );
    }

    #[test]
    fn test_status_db_roundtrip() {
        for s in [
            PairingStatus::PendingOnePaid,
            PairingStatus::PendingPartnerPayment,
            PairingStatus::ConfirmedCaptainFull,
            PairingStatus::Confirmed,
            PairingStatus::Complete,
            PairingStatus::Cancelled,
            PairingStatus::Incomplete,
        ] {
            assert_eq!(PairingStatus::from_db(s.as_db()), Some(s));
        }
    }

    #[test]
    fn test_terminal_states() {
        assert!(PairingStatus::Complete.is_terminal());
        assert!(PairingStatus::Cancelled.is_terminal());
        assert!(PairingStatus::Incomplete.is_terminal());
        assert!(!PairingStatus::Confirmed.is_terminal());
        assert!(!PairingStatus::PendingPartnerPayment.is_terminal());
    }

    #[test]
    fn test_guarantee_status_roundtrip() {
        for s in [
            GuaranteeStatus::None,
            GuaranteeStatus::Pending,
            GuaranteeStatus::NeedsAuth,
            GuaranteeStatus::Paid,
            GuaranteeStatus::Failed,
        ] {
            assert_eq!(GuaranteeStatus::from_db(s.as_db()), Some(s));
        }
    }
}
