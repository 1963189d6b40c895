//! Partner-seat holds: at most one ACTIVE hold per pairing

use sqlx::{PgConnection, PgPool};

/// Create or refresh the pairing's active hold, pushing `expires_at` out
/// by the configured TTL.
pub async fn refresh(
    conn: &mut PgConnection,
    id: &str,
    pairing_id: &str,
    expires_at: i64,
    now: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO pairing_holds (id, pairing_id, status, expires_at, created_at)
         VALUES ($1, $2, 'ACTIVE', $3, $4)
         ON CONFLICT (pairing_id) WHERE status = 'ACTIVE'
         DO UPDATE SET expires_at = $3",
    )
    .bind(id)
    .bind(pairing_id)
    .bind(expires_at)
    .bind(now)
    .execute(conn)
    .await?;
    Ok(())
}

/// Cancel the pairing's active hold, if any (payment received or pairing
/// cancelled)
pub async fn release(conn: &mut PgConnection, pairing_id: &str) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE pairing_holds SET status = 'CANCELLED'
         WHERE pairing_id = $1 AND status = 'ACTIVE'",
    )
    .bind(pairing_id)
    .execute(conn)
    .await?;
    Ok(())
}

/// Sweep transition: flip holds past deadline to EXPIRED and return the
/// pairings they were guarding. Idempotent, safe under overlapping sweeps.
pub async fn expire_due(pool: &PgPool, now: i64) -> Result<Vec<String>, sqlx::Error> {
    let rows: Vec<(String,)> = sqlx::query_as(
        "UPDATE pairing_holds SET status = 'EXPIRED'
         WHERE status = 'ACTIVE' AND expires_at < $1
         RETURNING pairing_id",
    )
    .bind(now)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(|r| r.0).collect())
}
