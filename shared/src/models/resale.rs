//! Resale listing model

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResaleListingStatus {
    Listed,
    Sold,
    Cancelled,
}

impl ResaleListingStatus {
    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Listed => "LISTED",
            Self::Sold => "SOLD",
            Self::Cancelled => "CANCELLED",
        }
    }

    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "LISTED" => Some(Self::Listed),
            "SOLD" => Some(Self::Sold),
            "CANCELLED" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// A ticket offered for resale by its current owner
///
/// On fulfillment of a resale purchase the listing flips to `Sold`, the
/// underlying ticket's owner is swapped to the buyer, and its access
/// code is rotated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResaleListing {
    pub id: String,
    pub ticket_id: String,
    pub seller_user_id: String,
    /// Asking price in minor units
    pub price: i64,
    pub currency: String,
    pub status: ResaleListingStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_roundtrip() {
        for s in [
            ResaleListingStatus::Listed,
            ResaleListingStatus::Sold,
            ResaleListingStatus::Cancelled,
        ] {
            assert_eq!(ResaleListingStatus::from_db(s.as_db()), Some(s));
        }
        assert_eq!(ResaleListingStatus::from_db("listed"), None);
    }
}
