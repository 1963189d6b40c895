//! Background operations worker
//!
//! Claims due operations in small batches and dispatches by type. Every
//! operation body is idempotent, so a crash between execution and the OK
//! mark only costs a redundant retry.

use sqlx::Connection;
use uuid::Uuid;

use shared::error::AppError;
use shared::models::{
    EntitlementKind, GuaranteeStatus, Operation, OperationType, OwnerKey, PairingStatus,
    SlotPayment,
};

use crate::db;
use crate::error::{ServiceError, ServiceResult};
use crate::fulfillment::{EventContext, second_charge};
use crate::gateway::{self, ChargeOutcome};
use crate::state::AppState;

const POLL_INTERVAL_SECS: u64 = 10;
const BATCH_SIZE: i64 = 10;

pub async fn run(state: AppState) {
    let mut interval = tokio::time::interval(std::time::Duration::from_secs(POLL_INTERVAL_SECS));
    loop {
        interval.tick().await;
        if let Err(e) = run_once(&state).await {
            tracing::error!(error = %e, "Worker pass failed");
        }
    }
}

pub async fn run_once(state: &AppState) -> ServiceResult<()> {
    let now = chrono::Utc::now().timestamp_millis();
    let ops = db::operations::claim_due(&state.pool, now, BATCH_SIZE).await?;
    for op in ops {
        let op_id = op.id.clone();
        let op_type = op.op_type;
        let attempts = op.attempts;
        match execute(state, op).await {
            Ok(()) => {
                let done = chrono::Utc::now().timestamp_millis();
                db::operations::mark_ok(&state.pool, &op_id, done).await?;
                tracing::info!(op_id, op_type = op_type.as_db(), "Operation completed");
            }
            Err(e) => {
                let done = chrono::Utc::now().timestamp_millis();
                let message = e.to_string();
                db::operations::mark_failed(&state.pool, &op_id, attempts, &message, done)
                    .await?;
                tracing::warn!(
                    op_id,
                    op_type = op_type.as_db(),
                    attempts = attempts + 1,
                    error = %message,
                    "Operation failed"
                );
            }
        }
    }
    Ok(())
}

async fn execute(state: &AppState, op: Operation) -> ServiceResult<()> {
    match op.op_type {
        OperationType::SecondChargeAttempt => second_charge_attempt(state, &op).await,
        OperationType::TournamentEntry => tournament_entry(state, &op).await,
        OperationType::ReceiptEmail => receipt_email(state, &op).await,
    }
}

fn payload_str<'a>(op: &'a Operation, key: &str) -> ServiceResult<&'a str> {
    op.payload[key]
        .as_str()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            ServiceError::App(AppError::invalid_request(format!(
                "operation payload missing {key}"
            )))
        })
}

/// Attempt the deferred off-session charge for the unpaid seat
async fn second_charge_attempt(state: &AppState, op: &Operation) -> ServiceResult<()> {
    let pairing_id = payload_str(op, "pairingId")?;
    let purchase_id = payload_str(op, "purchaseId")?;
    let customer_id = payload_str(op, "customerId")?;
    let amount = op.payload["amount"].as_i64().unwrap_or(0);
    let currency = op.payload["currency"].as_str().unwrap_or("eur").to_string();
    let now = chrono::Utc::now().timestamp_millis();

    // Advisory re-check at execution time: the partner may have paid, or
    // the pairing may be gone. A plain read is enough; the authoritative
    // guard is the row lock taken inside the outcome transaction below.
    let mut conn = state.pool.acquire().await?;
    let Some(pairing) = db::pairings::get(&mut *conn, pairing_id).await? else {
        tracing::warn!(pairing_id, "Second charge for a vanished pairing, dropping");
        return Ok(());
    };
    if pairing.status == PairingStatus::Cancelled
        || pairing.guarantee_status != GuaranteeStatus::Pending
    {
        tracing::info!(pairing_id, "Guarantee no longer pending, skipping charge");
        return Ok(());
    }
    let slots = db::pairings::list_slots(&mut *conn, pairing_id).await?;
    if slots.iter().all(|s| s.payment == SlotPayment::Paid) {
        tracing::info!(pairing_id, "All slots paid, no second charge needed");
        return Ok(());
    }
    drop(conn);

    // The dedupe key is stable across retries of this operation, so a
    // retry after a local failure replays the same charge at the gateway
    // instead of creating a second one
    let charge = gateway::OffSessionCharge {
        customer_id,
        amount,
        currency: &currency,
        pairing_id,
        purchase_id,
        idempotency_key: &op.dedupe_key,
    };
    let (intent_id, outcome) =
        gateway::create_off_session_intent(&state.http, &state.gateway_secret_key, &charge).await?;

    // The gateway also delivers the outcome by webhook; applying it here
    // too is safe because every transition below is idempotent
    let mut conn = state.pool.acquire().await?;
    let mut tx = conn.begin().await?;
    match outcome {
        ChargeOutcome::Succeeded => {
            let ctx = EventContext {
                intent_id: &intent_id,
                amount,
                currency: &currency,
                customer_id: Some(customer_id),
                now,
                hold_ttl_ms: state.hold_ttl_minutes * 60 * 1000,
                grace_window_ms: state.grace_window_hours * 60 * 60 * 1000,
            };
            second_charge::fulfill(tx.as_mut(), purchase_id, pairing_id, &ctx).await?;
        }
        ChargeOutcome::RequiresAction => {
            let grace_ms = state.grace_window_hours * 60 * 60 * 1000;
            second_charge::apply_requires_action(tx.as_mut(), pairing_id, grace_ms, now).await?;
        }
        ChargeOutcome::Failed => {
            second_charge::apply_failure(tx.as_mut(), pairing_id, "off-session charge declined", now)
                .await?;
        }
    }
    tx.commit().await?;
    Ok(())
}

/// Register both seats of a confirmed pairing for the tournament
async fn tournament_entry(state: &AppState, op: &Operation) -> ServiceResult<()> {
    let pairing_id = payload_str(op, "pairingId")?;
    let now = chrono::Utc::now().timestamp_millis();

    let mut conn = state.pool.acquire().await?;
    let mut tx = conn.begin().await?;
    let Some(_pairing) = db::pairings::get_for_update(tx.as_mut(), pairing_id).await? else {
        tracing::warn!(pairing_id, "Tournament entry for a vanished pairing, dropping");
        return Ok(());
    };
    let slots = db::pairings::list_slots(tx.as_mut(), pairing_id).await?;

    for slot in slots.iter().filter(|s| s.payment == SlotPayment::Paid) {
        let Some(ticket_id) = slot.ticket_id.as_deref() else {
            continue;
        };
        let Some(ticket) = db::tickets::get(tx.as_mut(), ticket_id).await? else {
            continue;
        };
        let owner_key = OwnerKey::derive(
            None,
            slot.player_user_id.as_deref().or(ticket.owner_user_id.as_deref()),
            ticket.guest_email.as_deref(),
        )
        .as_key();
        db::entitlements::upsert(
            tx.as_mut(),
            &db::entitlements::CreateEntitlement {
                id: &Uuid::new_v4().to_string(),
                purchase_id: &ticket.purchase_id,
                sale_line_id: ticket.sale_line_id.as_deref().unwrap_or(&ticket.purchase_id),
                line_index: ticket.emission_index,
                owner_key: &owner_key,
                kind: EntitlementKind::TournamentEntry.as_db(),
                now,
            },
        )
        .await?;
    }
    tx.commit().await?;
    Ok(())
}

/// Receipt delivery runs in a separate mailer; here we only verify the
/// sale the receipt would describe still exists.
async fn receipt_email(state: &AppState, op: &Operation) -> ServiceResult<()> {
    let purchase_id = payload_str(op, "purchaseId")?;
    let mut conn = state.pool.acquire().await?;
    let lines = db::sales::list_lines(&mut *conn, purchase_id).await?;
    tracing::info!(purchase_id, lines = lines.len(), "Receipt prepared");
    Ok(())
}
