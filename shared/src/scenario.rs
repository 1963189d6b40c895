//! Payment scenario metadata
//!
//! Gateway metadata is an untyped string map set at purchase time. It is
//! validated exactly once here, at the dispatcher boundary, into a closed
//! tagged enum; every downstream handler consumes the typed variant and
//! never re-parses raw metadata.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, ErrorCode};
use crate::pricing::Breakdown;

/// Who the purchase belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Buyer {
    RegisteredUser {
        user_id: String,
    },
    Guest {
        email: String,
        name: Option<String>,
        phone: Option<String>,
    },
}

impl Buyer {
    pub fn user_id(&self) -> Option<&str> {
        match self {
            Self::RegisteredUser { user_id } => Some(user_id),
            Self::Guest { .. } => None,
        }
    }

    pub fn email(&self) -> Option<&str> {
        match self {
            Self::RegisteredUser { .. } => None,
            Self::Guest { email, .. } => Some(email),
        }
    }

    fn from_metadata(metadata: &HashMap<String, String>) -> Result<Self, AppError> {
        if let Some(user_id) = non_empty(metadata, "userId") {
            Ok(Self::RegisteredUser {
                user_id: user_id.to_string(),
            })
        } else if let Some(email) = non_empty(metadata, "guestEmail") {
            Ok(Self::Guest {
                email: email.to_string(),
                name: non_empty(metadata, "guestName").map(str::to_string),
                phone: non_empty(metadata, "guestPhone").map(str::to_string),
            })
        } else {
            Err(AppError::invalid_metadata(
                "metadata carries neither userId nor guestEmail",
            ))
        }
    }
}

/// One requested line item from the `items` metadata blob
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItemSpec {
    pub ticket_type_id: String,
    pub quantity: i32,
}

/// The closed set of fulfillment scenarios, selected by the
/// `paymentScenario` metadata tag (absent tag means a plain single
/// purchase)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PaymentScenario {
    SinglePurchase {
        purchase_id: String,
        buyer: Buyer,
        items: Vec<LineItemSpec>,
        breakdown: Option<Breakdown>,
        promo_code: Option<String>,
    },
    GroupFull {
        purchase_id: String,
        pairing_id: String,
        ticket_type_id: String,
        event_id: String,
        buyer: Buyer,
        breakdown: Option<Breakdown>,
    },
    GroupSplit {
        purchase_id: String,
        pairing_id: String,
        slot_id: String,
        ticket_type_id: String,
        buyer: Buyer,
        breakdown: Option<Breakdown>,
    },
    SecondCharge {
        purchase_id: String,
        pairing_id: String,
    },
    Resale {
        purchase_id: String,
        listing_id: String,
        buyer: Buyer,
    },
}

impl PaymentScenario {
    /// Validate raw gateway metadata into a typed scenario
    ///
    /// Missing or malformed required keys reject the event with
    /// `InvalidMetadata`; an unrecognized tag rejects with
    /// `UnknownScenario`. Neither leaves any side effect.
    pub fn parse(metadata: &HashMap<String, String>) -> Result<Self, AppError> {
        let tag = non_empty(metadata, "paymentScenario").unwrap_or("DEFAULT");
        match tag {
            "DEFAULT" | "SINGLE_PURCHASE" => Self::parse_single(metadata),
            "GROUP_FULL" => Self::parse_group_full(metadata),
            "GROUP_SPLIT" => Self::parse_group_split(metadata),
            "GROUP_SPLIT_SECOND_CHARGE" => Self::parse_second_charge(metadata),
            "RESALE" => Self::parse_resale(metadata),
            other => Err(AppError::with_message(
                ErrorCode::UnknownScenario,
                format!("unknown payment scenario tag: {other}"),
            )
            .with_detail("paymentScenario", other)),
        }
    }

    /// Tag string for logging
    pub fn tag(&self) -> &'static str {
        match self {
            Self::SinglePurchase { .. } => "DEFAULT",
            Self::GroupFull { .. } => "GROUP_FULL",
            Self::GroupSplit { .. } => "GROUP_SPLIT",
            Self::SecondCharge { .. } => "GROUP_SPLIT_SECOND_CHARGE",
            Self::Resale { .. } => "RESALE",
        }
    }

    /// The logical purchase id this scenario fulfills
    pub fn purchase_id(&self) -> &str {
        match self {
            Self::SinglePurchase { purchase_id, .. }
            | Self::GroupFull { purchase_id, .. }
            | Self::GroupSplit { purchase_id, .. }
            | Self::SecondCharge { purchase_id, .. }
            | Self::Resale { purchase_id, .. } => purchase_id,
        }
    }

    fn parse_single(metadata: &HashMap<String, String>) -> Result<Self, AppError> {
        let purchase_id = require(metadata, "purchaseId")?;
        let buyer = Buyer::from_metadata(metadata)?;
        let items = parse_items(require(metadata, "items")?)?;
        let breakdown = parse_breakdown(metadata)?;
        Ok(Self::SinglePurchase {
            purchase_id,
            buyer,
            items,
            breakdown,
            promo_code: non_empty(metadata, "promoCode").map(str::to_string),
        })
    }

    fn parse_group_full(metadata: &HashMap<String, String>) -> Result<Self, AppError> {
        Ok(Self::GroupFull {
            purchase_id: require(metadata, "purchaseId")?,
            pairing_id: require(metadata, "pairingId")?,
            ticket_type_id: require(metadata, "ticketTypeId")?,
            event_id: require(metadata, "eventId")?,
            buyer: Buyer::from_metadata(metadata)?,
            breakdown: parse_breakdown(metadata)?,
        })
    }

    fn parse_group_split(metadata: &HashMap<String, String>) -> Result<Self, AppError> {
        Ok(Self::GroupSplit {
            purchase_id: require(metadata, "purchaseId")?,
            pairing_id: require(metadata, "pairingId")?,
            slot_id: require(metadata, "slotId")?,
            ticket_type_id: require(metadata, "ticketTypeId")?,
            buyer: Buyer::from_metadata(metadata)?,
            breakdown: parse_breakdown(metadata)?,
        })
    }

    fn parse_second_charge(metadata: &HashMap<String, String>) -> Result<Self, AppError> {
        Ok(Self::SecondCharge {
            purchase_id: require(metadata, "purchaseId")?,
            pairing_id: require(metadata, "pairingId")?,
        })
    }

    fn parse_resale(metadata: &HashMap<String, String>) -> Result<Self, AppError> {
        Ok(Self::Resale {
            purchase_id: require(metadata, "purchaseId")?,
            listing_id: require(metadata, "listingId")?,
            buyer: Buyer::from_metadata(metadata)?,
        })
    }
}

fn non_empty<'a>(metadata: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    metadata.get(key).map(String::as_str).filter(|s| !s.is_empty())
}

fn require(metadata: &HashMap<String, String>, key: &str) -> Result<String, AppError> {
    non_empty(metadata, key)
        .map(str::to_string)
        .ok_or_else(|| {
            AppError::invalid_metadata(format!("missing required metadata key: {key}"))
                .with_detail("key", key)
        })
}

fn parse_items(raw: String) -> Result<Vec<LineItemSpec>, AppError> {
    let items: Vec<LineItemSpec> = serde_json::from_str(&raw).map_err(|e| {
        AppError::with_message(ErrorCode::InvalidItems, format!("items is not valid JSON: {e}"))
    })?;
    if items.is_empty() {
        return Err(AppError::with_message(
            ErrorCode::InvalidItems,
            "items must contain at least one line",
        ));
    }
    if items.iter().any(|i| i.quantity < 1) {
        return Err(AppError::with_message(
            ErrorCode::InvalidItems,
            "item quantity must be at least 1",
        ));
    }
    Ok(items)
}

fn parse_breakdown(metadata: &HashMap<String, String>) -> Result<Option<Breakdown>, AppError> {
    match non_empty(metadata, "breakdown") {
        None => Ok(None),
        Some(raw) => Breakdown::from_metadata(raw).map(Some).ok_or_else(|| {
            AppError::new(ErrorCode::InvalidBreakdown).with_detail("breakdown", raw)
        }),
    }
}
