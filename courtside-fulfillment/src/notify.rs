//! Outbox helpers
//!
//! Notifications are written inside the event transaction with stable
//! dedupe keys, so a re-delivered event cannot notify twice. Delivery is
//! a separate concern and happens outside this service.

use sqlx::PgConnection;
use uuid::Uuid;

use shared::models::NotificationKind;

use crate::db;
use crate::error::ServiceResult;

pub struct Target<'a> {
    pub user_id: Option<&'a str>,
    pub email: Option<&'a str>,
}

pub async fn enqueue(
    conn: &mut PgConnection,
    entity_id: &str,
    kind: NotificationKind,
    target: Target<'_>,
    payload: serde_json::Value,
    now: i64,
) -> ServiceResult<()> {
    let owner = target.user_id.or(target.email).unwrap_or("unknown");
    let dedupe_key = format!("{entity_id}:{}:{owner}", kind.as_db());
    let id = Uuid::new_v4().to_string();
    db::notifications::enqueue(
        conn,
        &id,
        &db::notifications::EnqueueNotification {
            dedupe_key: &dedupe_key,
            kind,
            target_user_id: target.user_id,
            target_email: target.email,
            payload: &payload,
            now,
        },
    )
    .await?;
    Ok(())
}
