//! Scenario handlers
//!
//! Each handler runs inside the single transaction the dispatcher opens
//! for the event. Handlers never touch the dedup ledger themselves; the
//! dispatcher owns PROCESSING/OK/ERROR transitions.

pub mod dispatch;
pub mod group_full;
pub mod group_split;
pub mod resale;
pub mod second_charge;
pub mod single;

/// Facts about the gateway event every handler needs
pub struct EventContext<'a> {
    pub intent_id: &'a str,
    /// Captured amount, minor units
    pub amount: i64,
    pub currency: &'a str,
    /// Gateway customer, when the intent carried one (off-session charges)
    pub customer_id: Option<&'a str>,
    pub now: i64,
    /// Partner-seat hold lifetime (also schedules the deferred second
    /// charge), milliseconds
    pub hold_ttl_ms: i64,
    /// NEEDS_AUTH grace window, milliseconds
    pub grace_window_ms: i64,
}
