//! Promo code redemptions

use sqlx::PgConnection;

use super::Applied;

pub struct CreateRedemption<'a> {
    pub id: &'a str,
    pub purchase_id: &'a str,
    pub code: &'a str,
    pub user_id: Option<&'a str>,
    pub discount: i64,
    pub now: i64,
}

/// One redemption per purchase + code; re-delivery refreshes the amount
pub async fn upsert(
    conn: &mut PgConnection,
    r: &CreateRedemption<'_>,
) -> Result<Applied, sqlx::Error> {
    let (inserted,): (bool,) = sqlx::query_as(
        "INSERT INTO promo_redemptions (id, purchase_id, code, user_id, discount, created_at)
         VALUES ($1, $2, $3, $4, $5, $6)
         ON CONFLICT (purchase_id, code) DO UPDATE SET discount = $5
         RETURNING (xmax = 0)",
    )
    .bind(r.id)
    .bind(r.purchase_id)
    .bind(r.code)
    .bind(r.user_id)
    .bind(r.discount)
    .bind(r.now)
    .fetch_one(conn)
    .await?;
    Ok(Applied { inserted })
}

/// Refund reversal frees the code for reuse
pub async fn delete_for_purchase(
    conn: &mut PgConnection,
    purchase_id: &str,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM promo_redemptions WHERE purchase_id = $1")
        .bind(purchase_id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}
