//! Reversal engine: undo exactly what a refunded charge paid for

use std::collections::{HashMap, HashSet};

use sqlx::Connection;

use shared::models::{PairingStatus, SlotOccupancy, SlotPayment};

use crate::db;
use crate::error::ServiceResult;
use crate::state::AppState;

/// Process one `charge.refunded` event.
///
/// Locates the tickets the charge paid for, flips the still-ACTIVE ones,
/// and reverses their side effects: stock, sale ledger, promo
/// redemptions, entitlements, pairing slots, resale listings, and the
/// dedup ledger. Already-REFUNDED tickets reverse nothing twice.
pub async fn process_refund(
    state: &AppState,
    charge: &serde_json::Value,
) -> ServiceResult<()> {
    let intent_id = charge["payment_intent"].as_str().unwrap_or("");
    let purchase_hint = charge["metadata"]["purchaseId"].as_str().unwrap_or("");
    let now = chrono::Utc::now().timestamp_millis();

    let mut conn = state.pool.acquire().await?;
    let mut tx = conn.begin().await?;

    let mut tickets = if intent_id.is_empty() {
        Vec::new()
    } else {
        db::tickets::list_by_intent(tx.as_mut(), intent_id).await?
    };
    if tickets.is_empty() && !purchase_hint.is_empty() {
        tickets = db::tickets::list_by_purchase(tx.as_mut(), purchase_hint).await?;
    }
    if tickets.is_empty() {
        tracing::warn!(intent_id, purchase_hint, "Refund matched no tickets");
        return Ok(());
    }

    let ids: Vec<String> = tickets.iter().map(|t| t.id.clone()).collect();
    let flipped = db::tickets::refund_active(tx.as_mut(), &ids).await?;
    if flipped.is_empty() {
        tracing::info!(intent_id, "All matched tickets already refunded, nothing to do");
        tx.commit().await?;
        return Ok(());
    }
    let flipped_ids: HashSet<&str> = flipped.iter().map(|(id, _)| id.as_str()).collect();

    // Stock back per type, floored at zero in SQL
    let mut per_type: HashMap<&str, i32> = HashMap::new();
    for (_, ticket_type_id) in &flipped {
        *per_type.entry(ticket_type_id.as_str()).or_default() += 1;
    }
    for (ticket_type_id, count) in per_type {
        db::ticket_types::release(tx.as_mut(), ticket_type_id, count).await?;
    }

    // Pairing seats attached to refunded tickets reopen
    let mut touched_pairings: HashSet<String> = HashSet::new();
    for ticket in tickets.iter().filter(|t| flipped_ids.contains(t.id.as_str())) {
        if let Some(slot) = db::pairings::find_slot_by_ticket(tx.as_mut(), &ticket.id).await? {
            db::pairings::unbind_slot(tx.as_mut(), &slot.id, SlotOccupancy::Cancelled).await?;
            touched_pairings.insert(slot.pairing_id);
        }
        // A resale seat goes back on the market
        if let Some(listing) = db::resale::find_by_ticket(tx.as_mut(), &ticket.id).await? {
            db::resale::relist(tx.as_mut(), &listing.id, now).await?;
        }
    }
    for pairing_id in &touched_pairings {
        let slots = db::pairings::list_slots(tx.as_mut(), pairing_id).await?;
        let other_paid = slots.iter().any(|s| s.payment == SlotPayment::Paid);
        let status = if other_paid {
            PairingStatus::Incomplete
        } else {
            PairingStatus::Cancelled
        };
        db::pairings::update_status(tx.as_mut(), pairing_id, status, now).await?;
        if status == PairingStatus::Cancelled {
            db::pairings::clear_tokens(tx.as_mut(), pairing_id, now).await?;
        }
        db::holds::release(tx.as_mut(), pairing_id).await?;
        tracing::info!(pairing_id, status = status.as_db(), "Pairing reversed");
    }

    // Ledger-level reversal per affected purchase
    let purchases: HashSet<&str> = tickets
        .iter()
        .filter(|t| flipped_ids.contains(t.id.as_str()))
        .map(|t| t.purchase_id.as_str())
        .collect();
    for purchase_id in purchases {
        db::sales::mark_refunded(tx.as_mut(), purchase_id, now).await?;
        db::promos::delete_for_purchase(tx.as_mut(), purchase_id).await?;
        db::entitlements::revoke_for_purchase(tx.as_mut(), purchase_id).await?;
        db::payment_events::mark_refunded(tx.as_mut(), purchase_id, now).await?;
        tracing::info!(purchase_id, "Purchase reversed");
    }

    tx.commit().await?;
    tracing::info!(intent_id, refunded = flipped.len(), "Refund processed");
    Ok(())
}
