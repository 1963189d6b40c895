//! Resale fulfillment: transfer an existing ticket to its new owner

use sqlx::PgConnection;

use shared::error::{AppError, ErrorCode};
use shared::models::{NotificationKind, ResaleListingStatus, new_access_code};
use shared::scenario::Buyer;

use crate::db;
use crate::error::ServiceResult;
use crate::notify;

use super::EventContext;

pub async fn fulfill(
    conn: &mut PgConnection,
    purchase_id: &str,
    listing_id: &str,
    buyer: &Buyer,
    ctx: &EventContext<'_>,
) -> ServiceResult<()> {
    let listing = db::resale::get_for_update(conn, listing_id)
        .await?
        .ok_or_else(|| {
            AppError::with_message(
                ErrorCode::ListingNotFound,
                format!("resale listing {listing_id} not found"),
            )
        })?;

    if listing.status == ResaleListingStatus::Sold {
        // Re-delivery of an already-fulfilled resale
        tracing::info!(listing_id, "Listing already sold, nothing to do");
        return Ok(());
    }
    if !db::resale::mark_sold(conn, listing_id, ctx.now).await? {
        return Err(AppError::with_message(
            ErrorCode::ListingNotActive,
            format!("resale listing {listing_id} is not active"),
        )
        .into());
    }

    let ticket = db::tickets::get(conn, &listing.ticket_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("ticket {}", listing.ticket_id)))?;

    // Owner swap with a fresh access secret; the seller's code dies here
    let access_code = new_access_code();
    db::tickets::transfer_owner(
        conn,
        &ticket.id,
        buyer.user_id(),
        buyer.email(),
        match buyer {
            Buyer::Guest { name, .. } => name.as_deref(),
            Buyer::RegisteredUser { .. } => None,
        },
        &access_code,
    )
    .await?;

    db::sales::upsert_summary(
        conn,
        &db::sales::UpsertSummary {
            purchase_id,
            subtotal: listing.price,
            discount_total: 0,
            platform_fee: 0,
            gateway_fee: 0,
            net: ctx.amount,
            total: ctx.amount,
            currency: &listing.currency,
            now: ctx.now,
        },
    )
    .await?;

    notify::enqueue(
        conn,
        purchase_id,
        NotificationKind::PurchaseConfirmed,
        notify::Target {
            user_id: buyer.user_id(),
            email: buyer.email(),
        },
        serde_json::json!({ "listingId": listing_id, "ticketId": ticket.id }),
        ctx.now,
    )
    .await?;

    tracing::info!(purchase_id, listing_id, ticket_id = %ticket.id, "Resale fulfilled");
    Ok(())
}
