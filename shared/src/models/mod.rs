//! Domain models for the fulfillment engine
//!
//! All monetary amounts are i64 minor units (cents); all timestamps are
//! i64 epoch milliseconds. Status enums convert to/from their database
//! representation via `as_db()` / `from_db()`.

pub mod entitlement;
pub mod notification;
pub mod operation;
pub mod pairing;
pub mod payment_event;
pub mod promo;
pub mod resale;
pub mod sale;
pub mod ticket;
pub mod ticket_type;

// Re-exports
pub use entitlement::{Entitlement, EntitlementKind, EntitlementStatus, OwnerKey};
pub use notification::{Notification, NotificationKind};
pub use operation::{MAX_ATTEMPTS, Operation, OperationStatus, OperationType, RETRY_DELAY_MS};
pub use pairing::{
    GuaranteeStatus, Hold, HoldStatus, Pairing, PairingSlot, PairingStatus, PaymentMode,
    SlotOccupancy, SlotPayment, SlotRole, resolve_status,
};
pub use payment_event::{PaymentEvent, PaymentEventStatus};
pub use promo::PromoRedemption;
pub use resale::{ResaleListing, ResaleListingStatus};
pub use sale::{SaleLine, SaleStatus, SaleSummary};
pub use ticket::{Ticket, TicketStatus, new_access_code};
pub use ticket_type::TicketType;
