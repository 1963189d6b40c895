//! Fulfillment dispatcher
//!
//! One gateway event, one ledger claim, one transaction. Malformed
//! metadata is dropped before any side effect; handler failures roll the
//! transaction back and leave only the ledger ERROR behind.

use std::collections::HashMap;

use sqlx::Connection;
use uuid::Uuid;

use shared::anchor::AnchorKey;
use shared::error::ErrorCode;
use shared::models::{NotificationKind, OperationType};
use shared::scenario::PaymentScenario;

use crate::db;
use crate::error::{ServiceError, ServiceResult};
use crate::notify;
use crate::state::AppState;

use super::{EventContext, group_full, group_split, resale, second_charge, single};

/// Extract the gateway metadata object as a plain string map
pub fn metadata_map(intent: &serde_json::Value) -> HashMap<String, String> {
    intent["metadata"]
        .as_object()
        .map(|m| {
            m.iter()
                .filter_map(|(k, v)| Some((k.clone(), v.as_str()?.to_string())))
                .collect()
        })
        .unwrap_or_default()
}

/// Process one `payment_intent.succeeded` event end to end
pub async fn process_succeeded_intent(
    state: &AppState,
    event_id: &str,
    intent: &serde_json::Value,
) -> ServiceResult<()> {
    let metadata = metadata_map(intent);
    let scenario = match PaymentScenario::parse(&metadata) {
        Ok(s) => s,
        Err(e)
            if matches!(
                e.code,
                ErrorCode::InvalidMetadata
                    | ErrorCode::UnknownScenario
                    | ErrorCode::InvalidItems
                    | ErrorCode::InvalidBreakdown
            ) =>
        {
            // No anchor to record against; drop with no side effects
            tracing::warn!(event_id, error = %e, "Unfulfillable event metadata, dropping");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let intent_id = intent["id"].as_str().unwrap_or("");
    let amount = intent["amount_received"]
        .as_i64()
        .or_else(|| intent["amount"].as_i64())
        .unwrap_or(0);
    let currency = intent["currency"].as_str().unwrap_or("eur");
    let customer_id = intent["customer"].as_str();
    let now = chrono::Utc::now().timestamp_millis();

    let anchor = AnchorKey::resolve(
        Some(scenario.purchase_id()),
        Some(event_id),
        Some(intent_id),
    )
    .map_err(ServiceError::App)?;

    let ctx = EventContext {
        intent_id,
        amount,
        currency,
        customer_id,
        now,
        hold_ttl_ms: state.hold_ttl_minutes * 60 * 1000,
        grace_window_ms: state.grace_window_hours * 60 * 60 * 1000,
    };

    // Claim the anchor outside the event transaction so attempts and
    // ERROR marks survive a rollback
    let mut conn = state.pool.acquire().await?;
    let claim = db::payment_events::claim(
        &mut *conn,
        &db::payment_events::ClaimEvent {
            anchor: anchor.as_str(),
            amount,
            currency,
            user_id: metadata.get("userId").map(String::as_str),
            intent_id,
            event_id,
            now,
        },
    )
    .await?;
    match claim {
        db::payment_events::Claim::Acquired { attempts } => {
            tracing::info!(anchor = %anchor, attempts, scenario = scenario.tag(), "Processing event");
        }
        db::payment_events::Claim::AlreadyFulfilled => {
            tracing::info!(anchor = %anchor, "Anchor already fulfilled, skipping");
            return Ok(());
        }
        db::payment_events::Claim::Refunded => {
            tracing::warn!(anchor = %anchor, "Anchor already refunded, skipping");
            return Ok(());
        }
    }

    // Tickets already issued for this purchase mean a prior delivery
    // completed the work but died before marking OK
    if anchor.is_purchase()
        && !matches!(scenario, PaymentScenario::SecondCharge { .. })
        && db::tickets::count_by_purchase(&mut *conn, anchor.as_str()).await? > 0
    {
        db::payment_events::mark_ok(&mut *conn, anchor.as_str(), now).await?;
        tracing::info!(anchor = %anchor, "Tickets already issued, re-marked OK");
        return Ok(());
    }

    let result = run_in_transaction(&mut *conn, &scenario, &ctx, &anchor).await;

    match result {
        Ok(()) => {
            // OK mark committed inside the transaction; only the
            // post-commit fee reconciliation remains
            if let PaymentScenario::SinglePurchase { purchase_id, .. } = &scenario {
                reconcile_gateway_fee(state, purchase_id, intent_id).await;
            }
            Ok(())
        }
        Err(e) => {
            let message = e.to_string();
            db::payment_events::mark_error(&mut *conn, anchor.as_str(), &message, now).await?;

            // Stock shortfall on a group purchase kills the pairing even
            // though the fulfillment transaction rolled back
            if let ServiceError::App(app) = &e {
                if app.code == ErrorCode::StockInsufficient {
                    if let Some(pairing_id) = scenario_pairing_id(&scenario) {
                        group_full::cancel_on_stock_failure(&mut *conn, pairing_id, now).await?;
                    }
                }
            }

            tracing::error!(anchor = %anchor, error = %message, "Event fulfillment failed");
            Err(e)
        }
    }
}

fn scenario_pairing_id(scenario: &PaymentScenario) -> Option<&str> {
    match scenario {
        PaymentScenario::GroupFull { pairing_id, .. }
        | PaymentScenario::GroupSplit { pairing_id, .. }
        | PaymentScenario::SecondCharge { pairing_id, .. } => Some(pairing_id),
        _ => None,
    }
}

async fn run_in_transaction(
    conn: &mut sqlx::PgConnection,
    scenario: &PaymentScenario,
    ctx: &EventContext<'_>,
    anchor: &AnchorKey,
) -> ServiceResult<()> {
    let mut tx = conn.begin().await?;

    match scenario {
        PaymentScenario::SinglePurchase {
            purchase_id,
            buyer,
            items,
            breakdown,
            promo_code,
        } => {
            single::fulfill(
                tx.as_mut(),
                purchase_id,
                buyer,
                items,
                breakdown.as_ref(),
                promo_code.as_deref(),
                ctx,
            )
            .await?;
            notify::enqueue(
                tx.as_mut(),
                purchase_id,
                NotificationKind::PurchaseConfirmed,
                notify::Target {
                    user_id: buyer.user_id(),
                    email: buyer.email(),
                },
                serde_json::json!({ "purchaseId": purchase_id }),
                ctx.now,
            )
            .await?;
            db::operations::enqueue(
                tx.as_mut(),
                &db::operations::EnqueueOperation {
                    id: &Uuid::new_v4().to_string(),
                    dedupe_key: &format!("{purchase_id}:receipt"),
                    op_type: OperationType::ReceiptEmail,
                    payload: &serde_json::json!({ "purchaseId": purchase_id }),
                    run_after: None,
                    now: ctx.now,
                },
            )
            .await?;
        }
        PaymentScenario::GroupFull {
            purchase_id,
            pairing_id,
            ticket_type_id,
            buyer,
            breakdown,
            ..
        } => {
            group_full::fulfill(
                tx.as_mut(),
                purchase_id,
                pairing_id,
                ticket_type_id,
                buyer,
                breakdown.as_ref(),
                ctx,
            )
            .await?;
        }
        PaymentScenario::GroupSplit {
            purchase_id,
            pairing_id,
            slot_id,
            ticket_type_id,
            buyer,
            breakdown,
        } => {
            group_split::fulfill(
                tx.as_mut(),
                purchase_id,
                pairing_id,
                slot_id,
                ticket_type_id,
                buyer,
                breakdown.as_ref(),
                ctx,
            )
            .await?;
        }
        PaymentScenario::SecondCharge {
            purchase_id,
            pairing_id,
        } => {
            second_charge::fulfill(tx.as_mut(), purchase_id, pairing_id, ctx).await?;
        }
        PaymentScenario::Resale {
            purchase_id,
            listing_id,
            buyer,
        } => {
            resale::fulfill(tx.as_mut(), purchase_id, listing_id, buyer, ctx).await?;
        }
    }

    // OK commits atomically with the domain writes
    db::payment_events::mark_ok(tx.as_mut(), anchor.as_str(), ctx.now).await?;
    tx.commit().await?;
    Ok(())
}

/// Post-commit, best-effort: replace the estimated gateway fee with the
/// actual one from the balance transaction. Failure leaves the estimate.
async fn reconcile_gateway_fee(state: &AppState, purchase_id: &str, intent_id: &str) {
    if intent_id.is_empty() {
        return;
    }
    match crate::gateway::fetch_intent_fee(&state.http, &state.gateway_secret_key, intent_id).await
    {
        Ok(Some(fee)) => {
            let now = chrono::Utc::now().timestamp_millis();
            let mut conn = match state.pool.acquire().await {
                Ok(c) => c,
                Err(e) => {
                    tracing::warn!(purchase_id, error = %e, "Fee reconciliation skipped");
                    return;
                }
            };
            if let Err(e) =
                db::sales::update_gateway_fee(&mut *conn, purchase_id, fee, now).await
            {
                tracing::warn!(purchase_id, error = %e, "Failed to store actual gateway fee");
            } else {
                tracing::info!(purchase_id, fee, "Gateway fee reconciled");
            }
        }
        Ok(None) => {
            tracing::debug!(purchase_id, "No balance transaction yet, keeping estimate");
        }
        Err(e) => {
            tracing::warn!(purchase_id, error = %e, "Gateway fee lookup failed, keeping estimate");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_map_extracts_strings_only() {
        let intent = serde_json::json!({
            "metadata": {
                "purchaseId": "pu_1",
                "userId": "us_1",
                "amount": 42
            }
        });
        let m = metadata_map(&intent);
        assert_eq!(m.get("purchaseId").map(String::as_str), Some("pu_1"));
        assert_eq!(m.get("userId").map(String::as_str), Some("us_1"));
        // Non-string values are not silently stringified
        assert!(!m.contains_key("amount"));
    }

    #[test]
    fn test_metadata_map_missing_object() {
        let intent = serde_json::json!({ "id": "pi_1" });
        assert!(metadata_map(&intent).is_empty());
    }
}
