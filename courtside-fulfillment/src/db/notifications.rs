//! Notification outbox (delivery happens elsewhere)

use sqlx::PgConnection;

use shared::models::NotificationKind;

pub struct EnqueueNotification<'a> {
    /// Stable key derived from the triggering entity, e.g.
    /// `<purchase_id>:PURCHASE_CONFIRMED:<owner>`
    pub dedupe_key: &'a str,
    pub kind: NotificationKind,
    pub target_user_id: Option<&'a str>,
    pub target_email: Option<&'a str>,
    pub payload: &'a serde_json::Value,
    pub now: i64,
}

/// Deduped insert so re-running fulfillment never double-notifies
pub async fn enqueue(
    conn: &mut PgConnection,
    id: &str,
    n: &EnqueueNotification<'_>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO notifications
            (id, dedupe_key, kind, target_user_id, target_email, payload, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7)
         ON CONFLICT (dedupe_key) DO NOTHING",
    )
    .bind(id)
    .bind(n.dedupe_key)
    .bind(n.kind.as_db())
    .bind(n.target_user_id)
    .bind(n.target_email)
    .bind(n.payload)
    .bind(n.now)
    .execute(conn)
    .await?;
    Ok(())
}
