//! Promo redemption model

use serde::{Deserialize, Serialize};

/// One redemption row per purchase + code
///
/// Deleted on refund so the code becomes usable again.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct PromoRedemption {
    pub id: String,
    pub purchase_id: String,
    pub code: String,
    pub user_id: Option<String>,
    /// Discount granted by this redemption, minor units
    pub discount: i64,
    pub created_at: i64,
}
