//! Sale ledger: one summary per purchase, lines rebuilt on re-delivery

use sqlx::PgConnection;

use shared::models::SaleLine;

pub struct UpsertSummary<'a> {
    pub purchase_id: &'a str,
    pub subtotal: i64,
    pub discount_total: i64,
    pub platform_fee: i64,
    pub gateway_fee: i64,
    pub net: i64,
    pub total: i64,
    pub currency: &'a str,
    pub now: i64,
}

pub struct CreateLine<'a> {
    pub id: &'a str,
    pub purchase_id: &'a str,
    pub ticket_type_id: &'a str,
    pub unit_price: i64,
    pub quantity: i32,
    pub discount: i64,
    pub fee_share: i64,
    pub line_index: i32,
}

/// Overwrite the summary for this purchase (re-delivery rebuilds it)
pub async fn upsert_summary(
    conn: &mut PgConnection,
    s: &UpsertSummary<'_>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO sales
            (purchase_id, subtotal, discount_total, platform_fee, gateway_fee,
             net, total, currency, status, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'PAID', $9, $9)
         ON CONFLICT (purchase_id) DO UPDATE SET
            subtotal = $2, discount_total = $3, platform_fee = $4,
            gateway_fee = $5, net = $6, total = $7, currency = $8,
            status = 'PAID', updated_at = $9",
    )
    .bind(s.purchase_id)
    .bind(s.subtotal)
    .bind(s.discount_total)
    .bind(s.platform_fee)
    .bind(s.gateway_fee)
    .bind(s.net)
    .bind(s.total)
    .bind(s.currency)
    .bind(s.now)
    .execute(conn)
    .await?;
    Ok(())
}

/// Lines are not patched in place: drop them and recreate under the
/// upserted summary so a re-delivery cannot leave a stale mixture.
pub async fn delete_lines(conn: &mut PgConnection, purchase_id: &str) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM sale_lines WHERE purchase_id = $1")
        .bind(purchase_id)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn create_line(conn: &mut PgConnection, l: &CreateLine<'_>) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO sale_lines
            (id, purchase_id, ticket_type_id, unit_price, quantity, discount,
             fee_share, line_index)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
    )
    .bind(l.id)
    .bind(l.purchase_id)
    .bind(l.ticket_type_id)
    .bind(l.unit_price)
    .bind(l.quantity)
    .bind(l.discount)
    .bind(l.fee_share)
    .bind(l.line_index)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn list_lines(
    conn: &mut PgConnection,
    purchase_id: &str,
) -> Result<Vec<SaleLine>, sqlx::Error> {
    sqlx::query_as::<_, SaleLine>(
        "SELECT id, purchase_id, ticket_type_id, unit_price, quantity, discount,
                fee_share, line_index
         FROM sale_lines WHERE purchase_id = $1
         ORDER BY line_index",
    )
    .bind(purchase_id)
    .fetch_all(conn)
    .await
}

/// Post-commit correction once the gateway reports the actual charge fee
pub async fn update_gateway_fee(
    conn: &mut PgConnection,
    purchase_id: &str,
    gateway_fee: i64,
    now: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE sales
         SET gateway_fee = $2, net = total - platform_fee - $2, updated_at = $3
         WHERE purchase_id = $1",
    )
    .bind(purchase_id)
    .bind(gateway_fee)
    .bind(now)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn mark_refunded(
    conn: &mut PgConnection,
    purchase_id: &str,
    now: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE sales SET status = 'REFUNDED', updated_at = $2 WHERE purchase_id = $1")
        .bind(purchase_id)
        .bind(now)
        .execute(conn)
        .await?;
    Ok(())
}
