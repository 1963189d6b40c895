//! GROUP_SPLIT fulfillment: one charge pays exactly one seat

use sqlx::PgConnection;
use uuid::Uuid;

use shared::error::{AppError, ErrorCode};
use shared::models::{
    EntitlementKind, NotificationKind, OperationType, OwnerKey, PairingStatus, PaymentMode,
    SlotOccupancy, SlotPayment, SlotRole, new_access_code, resolve_status,
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
    slot_id: &str,
    ticket_type_id: &str,
    buyer: &Buyer,
    breakdown: Option<&Breakdown>,
    ctx: &EventContext<'_>,
) -> ServiceResult<()> {
    let pairing = db::pairings::get_for_update(conn, pairing_id)
        .await?
        .ok_or_else(|| AppError::pairing_not_found(pairing_id))?;
    if pairing.payment_mode != PaymentMode::Split {
        return Err(AppError::with_message(
            ErrorCode::PairingNotSplit,
            format!("pairing {pairing_id} is not in split payment mode"),
        )
        .into());
    }
    if pairing.status == PairingStatus::Cancelled {
        return Err(AppError::with_message(
            ErrorCode::PairingCancelled,
            format!("pairing {pairing_id} is cancelled"),
        )
        .into());
    }

    let slot = db::pairings::get_slot(conn, slot_id)
        .await?
        .filter(|s| s.pairing_id == pairing_id)
        .ok_or_else(|| AppError::slot_not_found(slot_id))?;
    if slot.payment == SlotPayment::Paid && slot.ticket_id.is_some() {
        tracing::info!(pairing_id, slot_id, "Slot already paid, nothing to do");
        return Ok(());
    }

    let tt = db::ticket_types::get(conn, ticket_type_id)
        .await?
        .ok_or_else(|| AppError::ticket_type_not_found(ticket_type_id))?;

    let emission_index = match slot.role {
        SlotRole::Captain => 0,
        SlotRole::Partner => 1,
    };
    let existing = db::tickets::existing_emission_indices(conn, purchase_id, ticket_type_id)
        .await?;
    if !existing.contains(&emission_index)
        && !db::ticket_types::reserve(conn, ticket_type_id, 1).await?
    {
        // Dispatcher compensates: pairing cancelled, hold released
        return Err(AppError::stock_insufficient(ticket_type_id).into());
    }

    let (platform_fee, gateway_fee, discount_total) = breakdown
        .map(|b| (b.platform_fee, b.gateway_fee, b.discount_total))
        .unwrap_or((0, 0, 0));
    db::sales::upsert_summary(
        conn,
        &db::sales::UpsertSummary {
            purchase_id,
            subtotal: tt.price,
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
            quantity: 1,
            discount: discount_total,
            fee_share: platform_fee,
            line_index: 0,
        },
    )
    .await?;

    let access_code = new_access_code();
    let (ticket_id, _) = db::tickets::upsert(
        conn,
        &db::tickets::CreateTicket {
            id: &Uuid::new_v4().to_string(),
            purchase_id,
            ticket_type_id,
            emission_index,
            owner_user_id: buyer.user_id(),
            guest_email: buyer.email(),
            guest_name: match buyer {
                Buyer::Guest { name, .. } => name.as_deref(),
                Buyer::RegisteredUser { .. } => None,
            },
            price: tt.price,
            total_paid: ctx.amount,
            currency: &tt.currency,
            access_code: &access_code,
            sale_line_id: Some(&line_id),
            pairing_slot_id: Some(&slot.id),
            intent_id: Some(ctx.intent_id),
            now: ctx.now,
        },
    )
    .await?;

    let occupancy = if buyer.user_id().is_some() || slot.player_user_id.is_some() {
        SlotOccupancy::Filled
    } else {
        SlotOccupancy::Pending
    };
    db::pairings::mark_slot_paid(conn, &slot.id, &ticket_id, buyer.user_id(), occupancy)
        .await?;

    // Partner-assignment rule: the paying user claims the partner seat
    // when it is unclaimed (or already theirs), burning the invite tokens
    if slot.role == SlotRole::Partner {
        if let Some(payer) = buyer.user_id() {
            let claimable = payer != pairing.captain_user_id
                && pairing
                    .partner_user_id
                    .as_deref()
                    .is_none_or(|existing| existing == payer);
            if claimable {
                db::pairings::assign_partner(conn, pairing_id, payer, ctx.now).await?;
            }
        }
    }

    let owner_key = OwnerKey::derive(None, buyer.user_id(), buyer.email()).as_key();
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

    let slots = db::pairings::list_slots(conn, pairing_id).await?;
    let status = resolve_status(pairing.payment_mode, &slots);
    db::pairings::update_status(conn, pairing_id, status, ctx.now).await?;

    if matches!(status, PairingStatus::Confirmed | PairingStatus::Complete) {
        db::holds::release(conn, pairing_id).await?;
    } else {
        // One seat is still unpaid; this payment restarts the window in
        // which the open seat must resolve
        db::holds::refresh(
            conn,
            &Uuid::new_v4().to_string(),
            pairing_id,
            ctx.now + ctx.hold_ttl_ms,
            ctx.now,
        )
        .await?;
    }

    if matches!(status, PairingStatus::Confirmed | PairingStatus::Complete) {
        db::operations::enqueue(
            conn,
            &db::operations::EnqueueOperation {
                id: &Uuid::new_v4().to_string(),
                dedupe_key: &format!("{pairing_id}:tournament-entry"),
                op_type: OperationType::TournamentEntry,
                payload: &serde_json::json!({ "pairingId": pairing_id }),
                run_after: None,
                now: ctx.now,
            },
        )
        .await?;
        notify::enqueue(
            conn,
            pairing_id,
            NotificationKind::PartnerPaid,
            notify::Target {
                user_id: Some(&pairing.captain_user_id),
                email: None,
            },
            serde_json::json!({ "pairingId": pairing_id }),
            ctx.now,
        )
        .await?;
    }

    // Captain paid with a seat guarantee: schedule the deferred charge
    // for the other seat at hold expiry
    let other_unpaid = slots
        .iter()
        .any(|s| s.id != slot.id && s.payment == SlotPayment::Unpaid);
    if slot.role == SlotRole::Captain
        && other_unpaid
        && pairing.guarantee_status == shared::models::GuaranteeStatus::Pending
    {
        if let Some(customer_id) = ctx.customer_id {
            db::operations::enqueue(
                conn,
                &db::operations::EnqueueOperation {
                    id: &Uuid::new_v4().to_string(),
                    dedupe_key: &format!("{pairing_id}:second-charge"),
                    op_type: OperationType::SecondChargeAttempt,
                    payload: &serde_json::json!({
                        "pairingId": pairing_id,
                        "purchaseId": format!("{pairing_id}:guarantee"),
                        "customerId": customer_id,
                        "amount": ctx.amount,
                        "currency": tt.currency,
                    }),
                    run_after: Some(ctx.now + ctx.hold_ttl_ms),
                    now: ctx.now,
                },
            )
            .await?;
        } else {
            tracing::warn!(
                pairing_id,
                "Guarantee pending but intent carries no customer, cannot schedule second charge"
            );
        }
    }

    notify::enqueue(
        conn,
        purchase_id,
        NotificationKind::PurchaseConfirmed,
        notify::Target {
            user_id: buyer.user_id(),
            email: buyer.email(),
        },
        serde_json::json!({ "pairingId": pairing_id, "purchaseId": purchase_id }),
        ctx.now,
    )
    .await?;

    tracing::info!(
        purchase_id,
        pairing_id,
        slot_id,
        status = status.as_db(),
        "Group split payment fulfilled"
    );
    Ok(())
}
