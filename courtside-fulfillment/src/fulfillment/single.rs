//! Single-purchase fulfillment: stock, sale ledger, tickets, entitlements

use sqlx::PgConnection;
use uuid::Uuid;

use shared::error::AppError;
use shared::models::{EntitlementKind, OwnerKey, new_access_code};
use shared::pricing::{self, Breakdown, FeeMode};
use shared::scenario::{Buyer, LineItemSpec};

use crate::db;
use crate::error::ServiceResult;

use super::EventContext;

/// Fulfill a plain single purchase inside the event transaction.
///
/// Stock is all-or-nothing per line: a line that cannot be covered is
/// skipped whole. The event only fails when no line could be fulfilled at
/// all (and nothing already exists from a prior delivery).
pub async fn fulfill(
    conn: &mut PgConnection,
    purchase_id: &str,
    buyer: &Buyer,
    items: &[LineItemSpec],
    breakdown: Option<&Breakdown>,
    promo_code: Option<&str>,
    ctx: &EventContext<'_>,
) -> ServiceResult<()> {
    // Resolve every requested type up front
    let mut types = Vec::with_capacity(items.len());
    for item in items {
        let tt = db::ticket_types::get(conn, &item.ticket_type_id)
            .await?
            .ok_or_else(|| AppError::ticket_type_not_found(&item.ticket_type_id))?;
        types.push(tt);
    }

    let gross: Vec<i64> = items
        .iter()
        .zip(&types)
        .map(|(item, tt)| tt.price * i64::from(item.quantity))
        .collect();
    let subtotal: i64 = gross.iter().sum();
    let currency = types
        .first()
        .map(|t| t.currency.as_str())
        .unwrap_or(ctx.currency);

    // Checkout attaches the computed breakdown as metadata; when it is
    // missing (legacy purchases) fall back to the captured amount with no
    // fee attribution.
    let owned_breakdown;
    let breakdown = match breakdown {
        Some(b) => b,
        None => {
            tracing::warn!(purchase_id, "No breakdown metadata, using captured amount");
            owned_breakdown = Breakdown {
                subtotal,
                discount_total: (subtotal - ctx.amount).max(0),
                platform_fee: 0,
                gateway_fee: 0,
                net: ctx.amount,
                total: ctx.amount,
                currency: currency.to_string(),
                fee_mode: FeeMode::Absorbed,
            };
            &owned_breakdown
        }
    };

    if pricing::drift_exceeds(breakdown.total, ctx.amount) {
        // The gateway captured the charge; its amount wins
        tracing::warn!(
            purchase_id,
            expected = breakdown.total,
            captured = ctx.amount,
            "Breakdown total drifts from captured amount"
        );
    }

    let discounts = pricing::allocate_discount(&gross, breakdown.discount_total);

    // Rebuild the sale ledger
    db::sales::upsert_summary(
        conn,
        &db::sales::UpsertSummary {
            purchase_id,
            subtotal,
            discount_total: breakdown.discount_total,
            platform_fee: breakdown.platform_fee,
            gateway_fee: breakdown.gateway_fee,
            net: breakdown.net,
            total: ctx.amount,
            currency,
            now: ctx.now,
        },
    )
    .await?;
    db::sales::delete_lines(conn, purchase_id).await?;

    let owner_key = OwnerKey::derive(None, buyer.user_id(), buyer.email()).as_key();
    let mut created_total = 0u32;
    let mut existed_total = 0u32;

    for (line_index, (item, tt)) in items.iter().zip(&types).enumerate() {
        let line_index = line_index as i32;
        let fee_share = pricing::line_fee_share(breakdown.platform_fee, gross[line_index as usize], subtotal);
        // Stable line id so re-deliveries land on the same rows
        let line_id = format!("{purchase_id}:{line_index}");

        let existing =
            db::tickets::existing_emission_indices(conn, purchase_id, &item.ticket_type_id)
                .await?;
        let missing: Vec<i32> = (0..item.quantity)
            .filter(|i| !existing.contains(i))
            .collect();
        existed_total += existing.len() as u32;

        if !missing.is_empty() {
            // All-or-nothing per line: skip the whole line on shortfall,
            // before it gets a sale ledger row
            let reserved =
                db::ticket_types::reserve(conn, &item.ticket_type_id, missing.len() as i32)
                    .await?;
            if !reserved {
                tracing::warn!(
                    purchase_id,
                    ticket_type_id = %item.ticket_type_id,
                    requested = missing.len(),
                    "Insufficient stock, skipping line"
                );
                continue;
            }
        }

        db::sales::create_line(
            conn,
            &db::sales::CreateLine {
                id: &line_id,
                purchase_id,
                ticket_type_id: &item.ticket_type_id,
                unit_price: tt.price,
                quantity: item.quantity,
                discount: discounts[line_index as usize],
                fee_share,
                line_index,
            },
        )
        .await?;

        let unit_fees = pricing::unit_fee_split(fee_share, item.quantity as u32);
        let unit_discounts =
            pricing::unit_fee_split(discounts[line_index as usize], item.quantity as u32);

        for emission_index in 0..item.quantity {
            let idx = emission_index as usize;
            if missing.contains(&emission_index) {
                let ticket_id = Uuid::new_v4().to_string();
                let access_code = new_access_code();
                db::tickets::upsert(
                    conn,
                    &db::tickets::CreateTicket {
                        id: &ticket_id,
                        purchase_id,
                        ticket_type_id: &item.ticket_type_id,
                        emission_index,
                        owner_user_id: buyer.user_id(),
                        guest_email: buyer.email(),
                        guest_name: match buyer {
                            Buyer::Guest { name, .. } => name.as_deref(),
                            Buyer::RegisteredUser { .. } => None,
                        },
                        price: tt.price,
                        total_paid: tt.price - unit_discounts[idx] + unit_fees[idx],
                        currency,
                        access_code: &access_code,
                        sale_line_id: Some(&line_id),
                        pairing_slot_id: None,
                        intent_id: Some(ctx.intent_id),
                        now: ctx.now,
                    },
                )
                .await?;
                created_total += 1;
            }

            db::entitlements::upsert(
                conn,
                &db::entitlements::CreateEntitlement {
                    id: &Uuid::new_v4().to_string(),
                    purchase_id,
                    sale_line_id: &line_id,
                    line_index: emission_index,
                    owner_key: &owner_key,
                    kind: EntitlementKind::EventEntry.as_db(),
                    now: ctx.now,
                },
            )
            .await?;
        }
    }

    if created_total == 0 && existed_total == 0 {
        return Err(AppError::with_message(
            shared::error::ErrorCode::StockInsufficient,
            "no line could be fulfilled for this purchase",
        )
        .into());
    }

    if let Some(code) = promo_code {
        db::promos::upsert(
            conn,
            &db::promos::CreateRedemption {
                id: &Uuid::new_v4().to_string(),
                purchase_id,
                code,
                user_id: buyer.user_id(),
                discount: breakdown.discount_total,
                now: ctx.now,
            },
        )
        .await?;
    }

    tracing::info!(
        purchase_id,
        created = created_total,
        existing = existed_total,
        "Single purchase fulfilled"
    );
    Ok(())
}
