//! GROUP_FULL fulfillment: one charge covers both seats of a pairing

use sqlx::PgConnection;
use uuid::Uuid;

use shared::error::{AppError, ErrorCode};
use shared::models::{
    EntitlementKind, NotificationKind, OwnerKey, PairingStatus, SlotOccupancy, SlotRole,
    new_access_code, resolve_status,
};
use shared::pricing::Breakdown;
use shared::scenario::Buyer;

use crate::db;
use crate::error::ServiceResult;
use crate::notify;

use super::EventContext;

pub async fn fulfill(
    conn: &mut PgConnection,
    purchase_id: &str,
    pairing_id: &str,
    ticket_type_id: &str,
    buyer: &Buyer,
    breakdown: Option<&Breakdown>,
    ctx: &EventContext<'_>,
) -> ServiceResult<()> {
    let pairing = db::pairings::get_for_update(conn, pairing_id)
        .await?
        .ok_or_else(|| AppError::pairing_not_found(pairing_id))?;
    if pairing.status == PairingStatus::Cancelled {
        return Err(AppError::with_message(
            ErrorCode::PairingCancelled,
            format!("pairing {pairing_id} is cancelled"),
        )
        .into());
    }

    let tt = db::ticket_types::get(conn, ticket_type_id)
        .await?
        .ok_or_else(|| AppError::ticket_type_not_found(ticket_type_id))?;

    let existing = db::tickets::existing_emission_indices(conn, purchase_id, ticket_type_id)
        .await?;
    let needed = (0..2).filter(|i| !existing.contains(i)).count() as i32;
    if needed > 0 && !db::ticket_types::reserve(conn, ticket_type_id, needed).await? {
        // Dispatcher compensates: pairing cancelled, hold released
        return Err(AppError::stock_insufficient(ticket_type_id).into());
    }

    // One two-unit sale line
    let (platform_fee, gateway_fee, discount_total) = breakdown
        .map(|b| (b.platform_fee, b.gateway_fee, b.discount_total))
        .unwrap_or((0, 0, 0));
    let subtotal = tt.price * 2;
    db::sales::upsert_summary(
        conn,
        &db::sales::UpsertSummary {
            purchase_id,
            subtotal,
            discount_total,
            platform_fee,
            gateway_fee,
            net: ctx.amount - platform_fee - gateway_fee,
            total: ctx.amount,
            currency: &tt.currency,
            now: ctx.now,
        },
    )
    .await?;
    db::sales::delete_lines(conn, purchase_id).await?;
    let line_id = format!("{purchase_id}:0");
    db::sales::create_line(
        conn,
        &db::sales::CreateLine {
            id: &line_id,
            purchase_id,
            ticket_type_id,
            unit_price: tt.price,
            quantity: 2,
            discount: discount_total,
            fee_share: platform_fee,
            line_index: 0,
        },
    )
    .await?;

    let slots = db::pairings::list_slots(conn, pairing_id).await?;
    let unit_fees = shared::pricing::unit_fee_split(platform_fee, 2);

    // Captain seat at emission 0, partner seat at emission 1
    for slot in &slots {
        let emission_index = match slot.role {
            SlotRole::Captain => 0,
            SlotRole::Partner => 1,
        };
        let (owner_user_id, guest_email, guest_name) = match slot.role {
            SlotRole::Captain => (
                buyer.user_id().or(Some(pairing.captain_user_id.as_str())),
                buyer.email(),
                None,
            ),
            SlotRole::Partner => (
                slot.player_user_id
                    .as_deref()
                    .or(pairing.partner_user_id.as_deref()),
                None,
                None,
            ),
        };

        let access_code = new_access_code();
        let (ticket_id, _) = db::tickets::upsert(
            conn,
            &db::tickets::CreateTicket {
                id: &Uuid::new_v4().to_string(),
                purchase_id,
                ticket_type_id,
                emission_index,
                owner_user_id,
                guest_email,
                guest_name,
                price: tt.price,
                total_paid: tt.price + unit_fees[emission_index as usize],
                currency: &tt.currency,
                access_code: &access_code,
                sale_line_id: Some(&line_id),
                pairing_slot_id: Some(&slot.id),
                intent_id: Some(ctx.intent_id),
                now: ctx.now,
            },
        )
        .await?;

        // Partner seat stays PENDING until someone claims it
        let occupancy = if owner_user_id.is_some() {
            SlotOccupancy::Filled
        } else {
            SlotOccupancy::Pending
        };
        db::pairings::mark_slot_paid(conn, &slot.id, &ticket_id, owner_user_id, occupancy)
            .await?;

        let owner_key = OwnerKey::derive(None, owner_user_id, guest_email).as_key();
        db::entitlements::upsert(
            conn,
            &db::entitlements::CreateEntitlement {
                id: &Uuid::new_v4().to_string(),
                purchase_id,
                sale_line_id: &line_id,
                line_index: emission_index,
                owner_key: &owner_key,
                kind: EntitlementKind::TournamentEntry.as_db(),
                now: ctx.now,
            },
        )
        .await?;
    }

    let slots = db::pairings::list_slots(conn, pairing_id).await?;
    let status = resolve_status(pairing.payment_mode, &slots);
    db::pairings::update_status(conn, pairing_id, status, ctx.now).await?;
    db::holds::release(conn, pairing_id).await?;

    notify::enqueue(
        conn,
        purchase_id,
        NotificationKind::PurchaseConfirmed,
        notify::Target {
            user_id: Some(&pairing.captain_user_id),
            email: buyer.email(),
        },
        serde_json::json!({ "pairingId": pairing_id, "purchaseId": purchase_id }),
        ctx.now,
    )
    .await?;

    tracing::info!(
        purchase_id,
        pairing_id,
        status = status.as_db(),
        "Group full payment fulfilled"
    );
    Ok(())
}

/// Compensation run in its own transaction after the fulfillment
/// transaction rolled back on a stock shortfall.
pub async fn cancel_on_stock_failure(
    conn: &mut PgConnection,
    pairing_id: &str,
    now: i64,
) -> ServiceResult<()> {
    if db::pairings::get_for_update(conn, pairing_id).await?.is_none() {
        return Ok(());
    }
    db::pairings::update_status(conn, pairing_id, PairingStatus::Cancelled, now).await?;
    db::pairings::clear_tokens(conn, pairing_id, now).await?;
    db::holds::release(conn, pairing_id).await?;
    tracing::warn!(pairing_id, "Pairing cancelled: insufficient stock");
    Ok(())
}
