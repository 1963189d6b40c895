//! Hold-expiry sweep
//!
//! Runs on a fixed interval: expires overdue holds, cancels pairings that
//! ran out of time without a guarantee, and fails guarantees whose
//! NEEDS_AUTH grace window lapsed. Every transition here is guarded by
//! status predicates, so overlapping sweeps are harmless.

use sqlx::Connection;

use shared::models::{GuaranteeStatus, NotificationKind, PairingStatus};

use crate::db;
use crate::error::ServiceResult;
use crate::fulfillment::second_charge;
use crate::notify;
use crate::state::AppState;

pub const SWEEP_INTERVAL_SECS: u64 = 60;

pub async fn run(state: AppState) {
    let mut interval = tokio::time::interval(std::time::Duration::from_secs(SWEEP_INTERVAL_SECS));
    loop {
        interval.tick().await;
        if let Err(e) = run_once(&state).await {
            tracing::error!(error = %e, "Hold sweep failed");
        }
    }
}

pub async fn run_once(state: &AppState) -> ServiceResult<()> {
    let now = chrono::Utc::now().timestamp_millis();

    for pairing_id in db::holds::expire_due(&state.pool, now).await? {
        if let Err(e) = expire_pairing_hold(state, &pairing_id, now).await {
            tracing::error!(pairing_id, error = %e, "Failed to process expired hold");
        }
    }

    for pairing_id in db::pairings::list_grace_expired(&state.pool, now).await? {
        let mut conn = state.pool.acquire().await?;
        let mut tx = conn.begin().await?;
        second_charge::apply_failure(tx.as_mut(), &pairing_id, "grace window expired", now)
            .await?;
        tx.commit().await?;
    }

    Ok(())
}

/// A hold ran out: cancel the pairing unless a payment or a pending
/// guarantee is carrying it.
async fn expire_pairing_hold(state: &AppState, pairing_id: &str, now: i64) -> ServiceResult<()> {
    let mut conn = state.pool.acquire().await?;
    let mut tx = conn.begin().await?;

    let Some(pairing) = db::pairings::get_for_update(tx.as_mut(), pairing_id).await? else {
        return Ok(());
    };
    if pairing.status.is_terminal() {
        return Ok(());
    }
    // A scheduled second charge (or its grace window) keeps the pairing
    // alive past hold expiry
    if matches!(
        pairing.guarantee_status,
        GuaranteeStatus::Pending | GuaranteeStatus::NeedsAuth
    ) {
        tracing::info!(pairing_id, "Hold expired but guarantee is carrying the pairing");
        return Ok(());
    }
    if matches!(
        pairing.status,
        PairingStatus::Confirmed | PairingStatus::ConfirmedCaptainFull | PairingStatus::Complete
    ) {
        return Ok(());
    }

    db::pairings::update_status(tx.as_mut(), pairing_id, PairingStatus::Cancelled, now).await?;
    db::pairings::clear_tokens(tx.as_mut(), pairing_id, now).await?;

    for user in [Some(pairing.captain_user_id.as_str()), pairing.partner_user_id.as_deref()]
        .into_iter()
        .flatten()
    {
        notify::enqueue(
            tx.as_mut(),
            pairing_id,
            NotificationKind::DeadlineExpired,
            notify::Target { user_id: Some(user), email: None },
            serde_json::json!({ "pairingId": pairing_id }),
            now,
        )
        .await?;
    }

    tx.commit().await?;
    tracing::info!(pairing_id, "Pairing cancelled: hold expired unpaid");
    Ok(())
}
