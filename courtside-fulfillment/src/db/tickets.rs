//! Issued tickets, idempotent on `(purchase_id, ticket_type_id, emission_index)`

use sqlx::PgConnection;

use shared::models::{Ticket, TicketStatus};

use super::Applied;

pub struct CreateTicket<'a> {
    pub id: &'a str,
    pub purchase_id: &'a str,
    pub ticket_type_id: &'a str,
    pub emission_index: i32,
    pub owner_user_id: Option<&'a str>,
    pub guest_email: Option<&'a str>,
    pub guest_name: Option<&'a str>,
    pub price: i64,
    pub total_paid: i64,
    pub currency: &'a str,
    pub access_code: &'a str,
    pub sale_line_id: Option<&'a str>,
    pub pairing_slot_id: Option<&'a str>,
    pub intent_id: Option<&'a str>,
    pub now: i64,
}

/// Idempotent issue: a duplicate delivery lands on the existing row and
/// keeps its id and access code. Returns the canonical ticket id.
pub async fn upsert(
    conn: &mut PgConnection,
    t: &CreateTicket<'_>,
) -> Result<(String, Applied), sqlx::Error> {
    let (id, inserted): (String, bool) = sqlx::query_as(
        "INSERT INTO tickets
            (id, purchase_id, ticket_type_id, emission_index, owner_user_id,
             guest_email, guest_name, price, total_paid, currency, status,
             access_code, sale_line_id, pairing_slot_id, intent_id, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 'ACTIVE', $11, $12, $13, $14, $15)
         ON CONFLICT (purchase_id, ticket_type_id, emission_index) DO UPDATE SET
            intent_id = $14,
            sale_line_id = $12
         RETURNING id, (xmax = 0)",
    )
    .bind(t.id)
    .bind(t.purchase_id)
    .bind(t.ticket_type_id)
    .bind(t.emission_index)
    .bind(t.owner_user_id)
    .bind(t.guest_email)
    .bind(t.guest_name)
    .bind(t.price)
    .bind(t.total_paid)
    .bind(t.currency)
    .bind(t.access_code)
    .bind(t.sale_line_id)
    .bind(t.pairing_slot_id)
    .bind(t.intent_id)
    .bind(t.now)
    .fetch_one(conn)
    .await?;
    Ok((id, Applied { inserted }))
}

pub async fn count_by_purchase(
    conn: &mut PgConnection,
    purchase_id: &str,
) -> Result<i64, sqlx::Error> {
    let (n,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tickets WHERE purchase_id = $1")
        .bind(purchase_id)
        .fetch_one(conn)
        .await?;
    Ok(n)
}

/// Emission indices already issued for one purchase + type (idempotency scan)
pub async fn existing_emission_indices(
    conn: &mut PgConnection,
    purchase_id: &str,
    ticket_type_id: &str,
) -> Result<Vec<i32>, sqlx::Error> {
    let rows: Vec<(i32,)> = sqlx::query_as(
        "SELECT emission_index FROM tickets
         WHERE purchase_id = $1 AND ticket_type_id = $2",
    )
    .bind(purchase_id)
    .bind(ticket_type_id)
    .fetch_all(conn)
    .await?;
    Ok(rows.into_iter().map(|r| r.0).collect())
}

pub async fn list_by_purchase(
    conn: &mut PgConnection,
    purchase_id: &str,
) -> Result<Vec<Ticket>, sqlx::Error> {
    fetch_tickets(conn, "purchase_id", purchase_id).await
}

pub async fn list_by_intent(
    conn: &mut PgConnection,
    intent_id: &str,
) -> Result<Vec<Ticket>, sqlx::Error> {
    fetch_tickets(conn, "intent_id", intent_id).await
}

pub async fn get(conn: &mut PgConnection, id: &str) -> Result<Option<Ticket>, sqlx::Error> {
    let mut rows = fetch_tickets(conn, "id", id).await?;
    Ok(rows.pop())
}

/// Flip ACTIVE tickets to REFUNDED; returns the ids actually flipped so
/// a re-delivered refund (all rows already REFUNDED) reverses nothing twice.
pub async fn refund_active(
    conn: &mut PgConnection,
    ids: &[String],
) -> Result<Vec<(String, String)>, sqlx::Error> {
    sqlx::query_as(
        "UPDATE tickets SET status = 'REFUNDED'
         WHERE id = ANY($1) AND status = 'ACTIVE'
         RETURNING id, ticket_type_id",
    )
    .bind(ids)
    .fetch_all(conn)
    .await
}

/// Resale transfer: swap the owner and rotate the access secret
pub async fn transfer_owner(
    conn: &mut PgConnection,
    id: &str,
    owner_user_id: Option<&str>,
    guest_email: Option<&str>,
    guest_name: Option<&str>,
    access_code: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE tickets
         SET owner_user_id = $2, guest_email = $3, guest_name = $4, access_code = $5
         WHERE id = $1",
    )
    .bind(id)
    .bind(owner_user_id)
    .bind(guest_email)
    .bind(guest_name)
    .bind(access_code)
    .execute(conn)
    .await?;
    Ok(())
}

async fn fetch_tickets(
    conn: &mut PgConnection,
    column: &str,
    value: &str,
) -> Result<Vec<Ticket>, sqlx::Error> {
    type Row = (
        String,
        String,
        String,
        i32,
        Option<String>,
        Option<String>,
        Option<String>,
        i64,
        i64,
        String,
        String,
        String,
        Option<String>,
        Option<String>,
        Option<String>,
        i64,
    );
    // `column` is one of three compile-time literals, never user input
    let sql = format!(
        "SELECT id, purchase_id, ticket_type_id, emission_index, owner_user_id,
                guest_email, guest_name, price, total_paid, currency, status,
                access_code, sale_line_id, pairing_slot_id, intent_id, created_at
         FROM tickets WHERE {column} = $1
         ORDER BY ticket_type_id, emission_index"
    );
    let rows: Vec<Row> = sqlx::query_as(&sql).bind(value).fetch_all(conn).await?;
    Ok(rows
        .into_iter()
        .map(
            |(
                id,
                purchase_id,
                ticket_type_id,
                emission_index,
                owner_user_id,
                guest_email,
                guest_name,
                price,
                total_paid,
                currency,
                status,
                access_code,
                sale_line_id,
                pairing_slot_id,
                intent_id,
                created_at,
            )| Ticket {
                id,
                purchase_id,
                ticket_type_id,
                emission_index,
                owner_user_id,
                guest_email,
                guest_name,
                price,
                total_paid,
                currency,
                status: TicketStatus::from_db(&status).unwrap_or(TicketStatus::Refunded),
                access_code,
                sale_line_id,
                pairing_slot_id,
                intent_id,
                created_at,
            },
        )
        .collect())
}
