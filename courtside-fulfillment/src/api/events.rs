//! Ledger introspection for operators
//!
//! Read-only lookup of a dedup-ledger row by anchor, used to answer
//! "did this purchase get fulfilled" without the database console.

use axum::Json;
use axum::extract::{Path, State};

use shared::error::AppError;
use shared::models::PaymentEvent;

use crate::db;
use crate::state::AppState;

/// GET /api/events/{anchor}
pub async fn get_event(
    State(state): State<AppState>,
    Path(anchor): Path<String>,
) -> Result<Json<PaymentEvent>, AppError> {
    let mut conn = state
        .pool
        .acquire()
        .await
        .map_err(|e| AppError::database(e.to_string()))?;
    let event = db::payment_events::get(&mut *conn, &anchor)
        .await
        .map_err(|e| AppError::database(e.to_string()))?
        .ok_or_else(|| AppError::not_found(format!("no ledger entry for anchor {anchor}")))?;
    Ok(Json(event))
}
