//! Database access layer
//!
//! All functions take `&mut PgConnection` so they compose inside a single
//! transaction per gateway event (pass `tx.as_mut()`). Idempotency is
//! enforced in SQL: unique keys plus `ON CONFLICT` upserts.

pub mod entitlements;
pub mod holds;
pub mod notifications;
pub mod operations;
pub mod pairings;
pub mod payment_events;
pub mod promos;
pub mod resale;
pub mod sales;
pub mod ticket_types;
pub mod tickets;

/// Outcome of an idempotent upsert.
///
/// `inserted` is derived from `RETURNING (xmax = 0)`: true when this call
/// created the row, false when a prior delivery already had.
#[derive(Debug, Clone, Copy)]
pub struct Applied {
    pub inserted: bool,
}
