//! Gateway webhook handler
//!
//! POST /gateway/webhook: handles gateway events (raw body for signature
//! verification)

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use sqlx::Connection;

use crate::fulfillment::{dispatch, second_charge};
use crate::gateway;
use crate::reversal;
use crate::state::AppState;
use crate::{db, error::ServiceError};

/// Handle incoming gateway webhook events
///
/// Must receive raw body (not JSON) for HMAC signature verification.
pub async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    // 1. Get signature header
    let sig_header = match headers
        .get("gateway-signature")
        .and_then(|v| v.to_str().ok())
    {
        Some(s) => s,
        None => {
            tracing::warn!("Missing Gateway-Signature header");
            return StatusCode::BAD_REQUEST;
        }
    };

    // 2. Verify signature
    if let Err(e) =
        gateway::verify_webhook_signature(&body, sig_header, &state.gateway_webhook_secret)
    {
        tracing::warn!(error = e, "Webhook signature verification failed");
        return StatusCode::BAD_REQUEST;
    }

    // 3. Parse JSON event
    let event: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(%e, "Failed to parse webhook JSON");
            return StatusCode::BAD_REQUEST;
        }
    };

    let event_type = event["type"].as_str().unwrap_or("");
    tracing::info!(event_type = event_type, "Received gateway webhook");

    // 4. Idempotency: claim the event id before doing any work
    let event_id = match event["id"].as_str() {
        Some(id) => id,
        None => {
            tracing::warn!("Webhook event missing id");
            return StatusCode::BAD_REQUEST;
        }
    };

    let now = chrono::Utc::now().timestamp_millis();
    match record_event(&state.pool, event_id, event_type, now).await {
        Ok(false) => {
            tracing::info!(event_id = event_id, "Duplicate webhook event, skipping");
            return StatusCode::OK;
        }
        Err(e) => {
            tracing::error!(%e, "DB error recording webhook event");
            return StatusCode::INTERNAL_SERVER_ERROR;
        }
        Ok(true) => {} // New event, proceed
    }

    let object = &event["data"]["object"];

    // 5. Handle event types
    let status = match event_type {
        "payment_intent.succeeded" => {
            match dispatch::process_succeeded_intent(&state, event_id, object).await {
                Ok(()) => StatusCode::OK,
                // Retryable failures get a 500 so the gateway re-delivers;
                // terminal ones are recorded on the ledger and acknowledged
                Err(e) if e.is_retryable() => StatusCode::INTERNAL_SERVER_ERROR,
                Err(_) => StatusCode::OK,
            }
        }
        "payment_intent.payment_failed" | "payment_intent.canceled" => {
            handle_intent_failed(&state, object).await
        }
        "charge.refunded" => match reversal::process_refund(&state, object).await {
            Ok(()) => StatusCode::OK,
            Err(e) if e.is_retryable() => StatusCode::INTERNAL_SERVER_ERROR,
            Err(_) => StatusCode::OK,
        },
        _ => {
            tracing::debug!(event_type = event_type, "Unhandled webhook event type");
            StatusCode::OK
        }
    };

    // A 500 asks the gateway to re-deliver, so the event id must pass the
    // dedup check again when it comes back
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        if let Err(e) = forget_event(&state.pool, event_id).await {
            tracing::error!(event_id, %e, "Failed to release event for re-delivery");
        }
    }
    status
}

/// Record a gateway event id before processing it. Returns `false` when a
/// prior delivery already claimed the id, in which case the event must be
/// acknowledged without reprocessing. INSERT-first eliminates the
/// check-then-insert race between concurrent deliveries.
pub async fn record_event(
    pool: &sqlx::PgPool,
    event_id: &str,
    event_type: &str,
    now: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO processed_webhook_events (event_id, event_type, processed_at)
         VALUES ($1, $2, $3) ON CONFLICT DO NOTHING",
    )
    .bind(event_id)
    .bind(event_type)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Forget a recorded event id so the gateway's re-delivery of it is
/// processed instead of being treated as a duplicate. Called only after a
/// retryable failure, once the 500 is already decided.
pub async fn forget_event(pool: &sqlx::PgPool, event_id: &str) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM processed_webhook_events WHERE event_id = $1")
        .bind(event_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// A failed or cancelled intent only matters to us when it was the
/// deferred second-seat charge; anything else is recorded on the ledger
/// and left alone.
async fn handle_intent_failed(state: &AppState, intent: &serde_json::Value) -> StatusCode {
    let metadata = dispatch::metadata_map(intent);
    let now = chrono::Utc::now().timestamp_millis();

    if metadata.get("paymentScenario").map(String::as_str) == Some("GROUP_SPLIT_SECOND_CHARGE") {
        let Some(pairing_id) = metadata.get("pairingId") else {
            tracing::warn!("Second-charge failure without pairingId");
            return StatusCode::OK;
        };
        let result: Result<(), ServiceError> = async {
            let mut conn = state.pool.acquire().await?;
            let mut tx = conn.begin().await?;
            second_charge::apply_failure(tx.as_mut(), pairing_id, "payment failed", now).await?;
            tx.commit().await?;
            Ok(())
        }
        .await;
        return match result {
            Ok(()) => StatusCode::OK,
            Err(e) => {
                tracing::error!(pairing_id, error = %e, "Failed to apply second-charge failure");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
    }

    // Ordinary purchase failures: note them on the ledger when we can
    // anchor them, nothing was fulfilled
    if let Some(purchase_id) = metadata.get("purchaseId") {
        let mut conn = match state.pool.acquire().await {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(%e, "DB error acquiring connection");
                return StatusCode::INTERNAL_SERVER_ERROR;
            }
        };
        if let Err(e) =
            db::payment_events::mark_error(&mut *conn, purchase_id, "payment failed", now).await
        {
            tracing::error!(purchase_id, %e, "Failed to record payment failure");
            return StatusCode::INTERNAL_SERVER_ERROR;
        }
    }
    StatusCode::OK
}
