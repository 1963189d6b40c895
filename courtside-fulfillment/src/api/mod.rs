//! API routes for courtside-fulfillment

pub mod events;
pub mod health;
pub mod webhook;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Create the combined router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/gateway/webhook", post(webhook::handle_webhook))
        .route("/api/events/{anchor}", get(events::get_event))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
