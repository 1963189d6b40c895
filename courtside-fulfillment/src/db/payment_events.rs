//! Dedup ledger: one row per logical purchase, keyed by anchor

use sqlx::PgConnection;

use shared::models::{PaymentEvent, PaymentEventStatus};

pub struct ClaimEvent<'a> {
    pub anchor: &'a str,
    pub amount: i64,
    pub currency: &'a str,
    pub user_id: Option<&'a str>,
    pub intent_id: &'a str,
    pub event_id: &'a str,
    pub now: i64,
}

/// Result of claiming an anchor for processing
pub enum Claim {
    /// Row is now PROCESSING; `attempts` includes this delivery
    Acquired { attempts: i32 },
    /// Row is already OK; the duplicate delivery must be a no-op
    AlreadyFulfilled,
    /// Row is REFUNDED, a terminal state that is never resurrected
    Refunded,
}

/// Upsert the ledger row to PROCESSING with `attempts + 1`.
///
/// The conflict guard refuses to touch OK and REFUNDED rows, which is how
/// duplicate deliveries of an already-settled purchase are detected.
pub async fn claim(conn: &mut PgConnection, c: &ClaimEvent<'_>) -> Result<Claim, sqlx::Error> {
    let row: Option<(i32,)> = sqlx::query_as(
        "INSERT INTO payment_events
            (anchor, status, attempts, amount, currency, user_id, intent_id,
             last_event_id, created_at, updated_at)
         VALUES ($1, 'PROCESSING', 1, $2, $3, $4, $5, $6, $7, $7)
         ON CONFLICT (anchor) DO UPDATE SET
            status = 'PROCESSING',
            attempts = payment_events.attempts + 1,
            amount = $2,
            currency = $3,
            user_id = COALESCE($4, payment_events.user_id),
            intent_id = $5,
            last_event_id = $6,
            error_message = NULL,
            updated_at = $7
         WHERE payment_events.status NOT IN ('OK', 'REFUNDED')
         RETURNING attempts",
    )
    .bind(c.anchor)
    .bind(c.amount)
    .bind(c.currency)
    .bind(c.user_id)
    .bind(c.intent_id)
    .bind(c.event_id)
    .bind(c.now)
    .fetch_optional(&mut *conn)
    .await?;

    if let Some((attempts,)) = row {
        return Ok(Claim::Acquired { attempts });
    }

    let status: Option<(String,)> =
        sqlx::query_as("SELECT status FROM payment_events WHERE anchor = $1")
            .bind(c.anchor)
            .fetch_optional(conn)
            .await?;
    match status.as_ref().map(|s| s.0.as_str()) {
        Some("REFUNDED") => Ok(Claim::Refunded),
        _ => Ok(Claim::AlreadyFulfilled),
    }
}

pub async fn mark_ok(conn: &mut PgConnection, anchor: &str, now: i64) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE payment_events
         SET status = 'OK', error_message = NULL, updated_at = $2
         WHERE anchor = $1 AND status <> 'REFUNDED'",
    )
    .bind(anchor)
    .bind(now)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn mark_error(
    conn: &mut PgConnection,
    anchor: &str,
    message: &str,
    now: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE payment_events
         SET status = 'ERROR', error_message = $2, updated_at = $3
         WHERE anchor = $1 AND status NOT IN ('OK', 'REFUNDED')",
    )
    .bind(anchor)
    .bind(message)
    .bind(now)
    .execute(conn)
    .await?;
    Ok(())
}

/// Terminal transition; reachable from any prior state
pub async fn mark_refunded(
    conn: &mut PgConnection,
    anchor: &str,
    now: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE payment_events SET status = 'REFUNDED', updated_at = $2 WHERE anchor = $1",
    )
    .bind(anchor)
    .bind(now)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn get(
    conn: &mut PgConnection,
    anchor: &str,
) -> Result<Option<PaymentEvent>, sqlx::Error> {
    type Row = (
        String,
        String,
        i32,
        i64,
        String,
        Option<String>,
        Option<String>,
        Option<String>,
        Option<String>,
        i64,
        i64,
    );
    let row: Option<Row> = sqlx::query_as(
        "SELECT anchor, status, attempts, amount, currency, user_id, intent_id,
                last_event_id, error_message, created_at, updated_at
         FROM payment_events WHERE anchor = $1",
    )
    .bind(anchor)
    .fetch_optional(conn)
    .await?;

    Ok(row.map(
        |(
            anchor,
            status,
            attempts,
            amount,
            currency,
            user_id,
            intent_id,
            last_event_id,
            error_message,
            created_at,
            updated_at,
        )| PaymentEvent {
            anchor,
            status: PaymentEventStatus::from_db(&status)
                .unwrap_or(PaymentEventStatus::Error),
            attempts,
            amount,
            currency,
            user_id,
            intent_id,
            last_event_id,
            error_message,
            created_at,
            updated_at,
        },
    ))
}
