//! Resale listings

use sqlx::PgConnection;

use shared::models::{ResaleListing, ResaleListingStatus};

type ListingRow = (String, String, String, i64, String, String, i64, i64);

fn map_listing(r: ListingRow) -> ResaleListing {
    let (id, ticket_id, seller_user_id, price, currency, status, created_at, updated_at) = r;
    ResaleListing {
        id,
        ticket_id,
        seller_user_id,
        price,
        currency,
        status: ResaleListingStatus::from_db(&status).unwrap_or(ResaleListingStatus::Cancelled),
        created_at,
        updated_at,
    }
}

pub async fn get_for_update(
    conn: &mut PgConnection,
    id: &str,
) -> Result<Option<ResaleListing>, sqlx::Error> {
    let row: Option<ListingRow> = sqlx::query_as(
        "SELECT id, ticket_id, seller_user_id, price, currency, status, created_at, updated_at
         FROM resale_listings WHERE id = $1 FOR UPDATE",
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(row.map(map_listing))
}

/// Guarded flip LISTED -> SOLD; false when another purchase won the race
/// or the listing was withdrawn.
pub async fn mark_sold(conn: &mut PgConnection, id: &str, now: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE resale_listings SET status = 'SOLD', updated_at = $2
         WHERE id = $1 AND status = 'LISTED'",
    )
    .bind(id)
    .bind(now)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Refund of a resale purchase puts the seat back on the market
pub async fn relist(conn: &mut PgConnection, id: &str, now: i64) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE resale_listings SET status = 'LISTED', updated_at = $2
         WHERE id = $1 AND status = 'SOLD'",
    )
    .bind(id)
    .bind(now)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn find_by_ticket(
    conn: &mut PgConnection,
    ticket_id: &str,
) -> Result<Option<ResaleListing>, sqlx::Error> {
    let row: Option<ListingRow> = sqlx::query_as(
        "SELECT id, ticket_id, seller_user_id, price, currency, status, created_at, updated_at
         FROM resale_listings WHERE ticket_id = $1
         ORDER BY updated_at DESC LIMIT 1",
    )
    .bind(ticket_id)
    .fetch_optional(conn)
    .await?;
    Ok(row.map(map_listing))
}
