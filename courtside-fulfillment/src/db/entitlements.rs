//! Entitlement mirror, one row per paid unit

use sqlx::PgConnection;

use super::Applied;

pub struct CreateEntitlement<'a> {
    pub id: &'a str,
    pub purchase_id: &'a str,
    pub sale_line_id: &'a str,
    pub line_index: i32,
    /// Derived owner key (`identity:` > `user:` > `email:` > `unknown`)
    pub owner_key: &'a str,
    pub kind: &'a str,
    pub now: i64,
}

/// Idempotent on the full five-column identity; a re-delivery reactivates
/// rather than duplicating.
pub async fn upsert(
    conn: &mut PgConnection,
    e: &CreateEntitlement<'_>,
) -> Result<Applied, sqlx::Error> {
    let (inserted,): (bool,) = sqlx::query_as(
        "INSERT INTO entitlements
            (id, purchase_id, sale_line_id, line_index, owner_key, kind, status, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, 'ACTIVE', $7)
         ON CONFLICT (purchase_id, sale_line_id, line_index, owner_key, kind)
         DO UPDATE SET status = 'ACTIVE'
         RETURNING (xmax = 0)",
    )
    .bind(e.id)
    .bind(e.purchase_id)
    .bind(e.sale_line_id)
    .bind(e.line_index)
    .bind(e.owner_key)
    .bind(e.kind)
    .bind(e.now)
    .fetch_one(conn)
    .await?;
    Ok(Applied { inserted })
}

pub async fn revoke_for_purchase(
    conn: &mut PgConnection,
    purchase_id: &str,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE entitlements SET status = 'REVOKED'
         WHERE purchase_id = $1 AND status = 'ACTIVE'",
    )
    .bind(purchase_id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}
