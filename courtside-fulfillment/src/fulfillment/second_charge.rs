//! Deferred second-seat charge outcomes (split-pairing guarantee)
//!
//! Three terminal routes for the off-session attempt: `succeeded` lands
//! here via the dispatcher like any payment; `requires_action` parks the
//! guarantee behind a grace deadline; a decline or cancellation fails the
//! guarantee and the pairing with it.

use sqlx::PgConnection;
use uuid::Uuid;

use shared::error::AppError;
use shared::models::{
    EntitlementKind, GuaranteeStatus, NotificationKind, OwnerKey, PairingStatus, SlotPayment,
    SlotOccupancy, SlotRole, new_access_code, resolve_status,
};

use crate::db;
use crate::error::ServiceResult;
use crate::notify;

use super::EventContext;

/// The off-session charge succeeded: pay the open seat, settle the
/// guarantee, complete the pairing when both seats are claimed.
pub async fn fulfill(
    conn: &mut PgConnection,
    purchase_id: &str,
    pairing_id: &str,
    ctx: &EventContext<'_>,
) -> ServiceResult<()> {
    let pairing = db::pairings::get_for_update(conn, pairing_id)
        .await?
        .ok_or_else(|| AppError::pairing_not_found(pairing_id))?;
    if pairing.status == PairingStatus::Cancelled {
        tracing::warn!(
            pairing_id,
            "Second charge succeeded for a cancelled pairing, leaving it cancelled"
        );
        return Ok(());
    }

    let slots = db::pairings::list_slots(conn, pairing_id).await?;
    let open = slots.iter().find(|s| s.payment == SlotPayment::Unpaid);

    if let Some(slot) = open {
        let tt = db::ticket_types::get(conn, &pairing.ticket_type_id)
            .await?
            .ok_or_else(|| AppError::ticket_type_not_found(&pairing.ticket_type_id))?;

        let emission_index = match slot.role {
            SlotRole::Captain => 0,
            SlotRole::Partner => 1,
        };
        let existing = db::tickets::existing_emission_indices(
            conn,
            purchase_id,
            &pairing.ticket_type_id,
        )
        .await?;
        if !existing.contains(&emission_index)
            && !db::ticket_types::reserve(conn, &pairing.ticket_type_id, 1).await?
        {
            return Err(AppError::stock_insufficient(&pairing.ticket_type_id).into());
        }

        db::sales::upsert_summary(
            conn,
            &db::sales::UpsertSummary {
                purchase_id,
                subtotal: tt.price,
                discount_total: 0,
                platform_fee: 0,
                gateway_fee: 0,
                net: ctx.amount,
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
                ticket_type_id: &pairing.ticket_type_id,
                unit_price: tt.price,
                quantity: 1,
                discount: 0,
                fee_share: 0,
                line_index: 0,
            },
        )
        .await?;

        let owner = slot
            .player_user_id
            .as_deref()
            .or(pairing.partner_user_id.as_deref());
        let access_code = new_access_code();
        let (ticket_id, _) = db::tickets::upsert(
            conn,
            &db::tickets::CreateTicket {
                id: &Uuid::new_v4().to_string(),
                purchase_id,
                ticket_type_id: &pairing.ticket_type_id,
                emission_index,
                owner_user_id: owner,
                guest_email: None,
                guest_name: None,
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

        let occupancy = if owner.is_some() {
            SlotOccupancy::Filled
        } else {
            SlotOccupancy::Pending
        };
        db::pairings::mark_slot_paid(conn, &slot.id, &ticket_id, owner, occupancy).await?;

        let owner_key = OwnerKey::derive(None, owner, None).as_key();
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

    db::pairings::set_guarantee(conn, pairing_id, GuaranteeStatus::Paid, None, ctx.now).await?;
    let slots = db::pairings::list_slots(conn, pairing_id).await?;
    let status = resolve_status(pairing.payment_mode, &slots);
    db::pairings::update_status(conn, pairing_id, status, ctx.now).await?;
    db::holds::release(conn, pairing_id).await?;

    notify::enqueue(
        conn,
        pairing_id,
        NotificationKind::PartnerPaid,
        notify::Target {
            user_id: Some(&pairing.captain_user_id),
            email: None,
        },
        serde_json::json!({ "pairingId": pairing_id, "purchaseId": purchase_id }),
        ctx.now,
    )
    .await?;

    tracing::info!(
        pairing_id,
        purchase_id,
        status = status.as_db(),
        "Second charge fulfilled"
    );
    Ok(())
}

/// The attempt needs customer authentication: park the guarantee and give
/// both parties a grace window to act.
pub async fn apply_requires_action(
    conn: &mut PgConnection,
    pairing_id: &str,
    grace_window_ms: i64,
    now: i64,
) -> ServiceResult<()> {
    let pairing = db::pairings::get_for_update(conn, pairing_id)
        .await?
        .ok_or_else(|| AppError::pairing_not_found(pairing_id))?;
    if pairing.status == PairingStatus::Cancelled {
        return Ok(());
    }

    let deadline = now + grace_window_ms;
    db::pairings::set_guarantee(conn, pairing_id, GuaranteeStatus::NeedsAuth, Some(deadline), now)
        .await?;

    for user in [Some(pairing.captain_user_id.as_str()), pairing.partner_user_id.as_deref()]
        .into_iter()
        .flatten()
    {
        notify::enqueue(
            conn,
            pairing_id,
            NotificationKind::OffSessionActionRequired,
            notify::Target { user_id: Some(user), email: None },
            serde_json::json!({ "pairingId": pairing_id, "graceDeadline": deadline }),
            now,
        )
        .await?;
    }

    tracing::info!(pairing_id, deadline, "Second charge requires action, grace window opened");
    Ok(())
}

/// The attempt is not recoverable (declined, cancelled, or grace lapsed):
/// fail the guarantee and cancel the pairing.
pub async fn apply_failure(
    conn: &mut PgConnection,
    pairing_id: &str,
    reason: &str,
    now: i64,
) -> ServiceResult<()> {
    let Some(pairing) = db::pairings::get_for_update(conn, pairing_id).await? else {
        return Ok(());
    };
    if pairing.status == PairingStatus::Cancelled {
        return Ok(());
    }

    db::pairings::set_guarantee(conn, pairing_id, GuaranteeStatus::Failed, None, now).await?;
    db::pairings::update_status(conn, pairing_id, PairingStatus::Cancelled, now).await?;
    db::pairings::clear_tokens(conn, pairing_id, now).await?;
    db::holds::release(conn, pairing_id).await?;

    for user in [Some(pairing.captain_user_id.as_str()), pairing.partner_user_id.as_deref()]
        .into_iter()
        .flatten()
    {
        notify::enqueue(
            conn,
            pairing_id,
            NotificationKind::DeadlineExpired,
            notify::Target { user_id: Some(user), email: None },
            serde_json::json!({ "pairingId": pairing_id, "reason": reason }),
            now,
        )
        .await?;
    }

    tracing::warn!(pairing_id, reason, "Second charge failed, pairing cancelled");
    Ok(())
}
