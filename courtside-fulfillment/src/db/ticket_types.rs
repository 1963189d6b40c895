//! Ticket-type inventory

use sqlx::PgConnection;

use shared::models::TicketType;

pub async fn get(conn: &mut PgConnection, id: &str) -> Result<Option<TicketType>, sqlx::Error> {
    sqlx::query_as::<_, TicketType>(
        "SELECT id, event_id, name, price, currency, total_quantity, sold_quantity
         FROM ticket_types WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(conn)
    .await
}

/// All-or-nothing reservation: the WHERE clause is the oversell guard, so
/// a shortfall surfaces as zero rows affected rather than a dirty counter.
pub async fn reserve(
    conn: &mut PgConnection,
    id: &str,
    quantity: i32,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE ticket_types
         SET sold_quantity = sold_quantity + $2
         WHERE id = $1 AND sold_quantity + $2 <= total_quantity",
    )
    .bind(id)
    .bind(quantity)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Refund release, floored at zero
pub async fn release(
    conn: &mut PgConnection,
    id: &str,
    quantity: i32,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE ticket_types
         SET sold_quantity = GREATEST(sold_quantity - $2, 0)
         WHERE id = $1",
    )
    .bind(id)
    .bind(quantity)
    .execute(conn)
    .await?;
    Ok(())
}
