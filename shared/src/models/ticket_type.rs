//! Ticket type (inventory) model

use serde::{Deserialize, Serialize};

/// A sellable ticket category with finite inventory
///
/// Remaining stock is `total_quantity - sold_quantity`. Refunds decrement
/// `sold_quantity`, floored at zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct TicketType {
    pub id: String,
    pub event_id: String,
    pub name: String,
    /// Unit price in minor units
    pub price: i64,
    pub currency: String,
    pub total_quantity: i32,
    pub sold_quantity: i32,
}

impl TicketType {
    pub fn remaining(&self) -> i32 {
        self.total_quantity - self.sold_quantity
    }
}
