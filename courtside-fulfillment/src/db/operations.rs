//! Retryable operations queue

use sqlx::{PgConnection, PgPool};

use shared::models::{
    MAX_ATTEMPTS, Operation, OperationStatus, OperationType, RETRY_DELAY_MS,
};

pub struct EnqueueOperation<'a> {
    pub id: &'a str,
    pub dedupe_key: &'a str,
    pub op_type: OperationType,
    pub payload: &'a serde_json::Value,
    /// Earliest execution time; None means immediately
    pub run_after: Option<i64>,
    pub now: i64,
}

/// Deduped enqueue: a re-delivered event never queues the same work twice
pub async fn enqueue(conn: &mut PgConnection, op: &EnqueueOperation<'_>) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO operations
            (id, dedupe_key, op_type, payload, status, attempts, next_retry_at,
             created_at, updated_at)
         VALUES ($1, $2, $3, $4, 'PENDING', 0, $5, $6, $6)
         ON CONFLICT (dedupe_key) DO NOTHING",
    )
    .bind(op.id)
    .bind(op.dedupe_key)
    .bind(op.op_type.as_db())
    .bind(op.payload)
    .bind(op.run_after)
    .bind(op.now)
    .execute(conn)
    .await?;
    Ok(())
}

/// Claim a batch of due operations for one worker pass.
///
/// SKIP LOCKED keeps concurrent workers from double-claiming; the rows are
/// flipped to PROCESSING in the same statement.
pub async fn claim_due(pool: &PgPool, now: i64, limit: i64) -> Result<Vec<Operation>, sqlx::Error> {
    type Row = (
        String,
        String,
        String,
        serde_json::Value,
        String,
        i32,
        Option<i64>,
        Option<String>,
        i64,
        i64,
    );
    let rows: Vec<Row> = sqlx::query_as(
        "UPDATE operations SET status = 'PROCESSING', updated_at = $1
         WHERE id IN (
            SELECT id FROM operations
            WHERE status IN ('PENDING', 'ERROR')
              AND (next_retry_at IS NULL OR next_retry_at <= $1)
            ORDER BY created_at
            LIMIT $2
            FOR UPDATE SKIP LOCKED
         )
         RETURNING id, dedupe_key, op_type, payload, status, attempts,
                   next_retry_at, last_error, created_at, updated_at",
    )
    .bind(now)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .filter_map(
            |(
                id,
                dedupe_key,
                op_type,
                payload,
                status,
                attempts,
                next_retry_at,
                last_error,
                created_at,
                updated_at,
            )| {
                Some(Operation {
                    id,
                    dedupe_key,
                    op_type: OperationType::from_db(&op_type)?,
                    payload,
                    status: OperationStatus::from_db(&status)?,
                    attempts,
                    next_retry_at,
                    last_error,
                    created_at,
                    updated_at,
                })
            },
        )
        .collect())
}

pub async fn mark_ok(pool: &PgPool, id: &str, now: i64) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE operations SET status = 'OK', last_error = NULL, updated_at = $2 WHERE id = $1",
    )
    .bind(id)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(())
}

/// Record a failed attempt: retry later, or dead-letter once the budget
/// is exhausted.
pub async fn mark_failed(
    pool: &PgPool,
    id: &str,
    attempts: i32,
    error: &str,
    now: i64,
) -> Result<(), sqlx::Error> {
    let next_attempts = attempts + 1;
    if next_attempts >= MAX_ATTEMPTS {
        sqlx::query(
            "UPDATE operations
             SET status = 'DEAD_LETTER', attempts = $2, last_error = $3, updated_at = $4
             WHERE id = $1",
        )
        .bind(id)
        .bind(next_attempts)
        .bind(error)
        .bind(now)
        .execute(pool)
        .await?;
    } else {
        sqlx::query(
            "UPDATE operations
             SET status = 'ERROR', attempts = $2, last_error = $3,
                 next_retry_at = $4, updated_at = $5
             WHERE id = $1",
        )
        .bind(id)
        .bind(next_attempts)
        .bind(error)
        .bind(now + RETRY_DELAY_MS)
        .bind(now)
        .execute(pool)
        .await?;
    }
    Ok(())
}
