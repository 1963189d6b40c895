//! DB-backed integration tests for the fulfillment pipeline.
//!
//! Each test gets its own database via `#[sqlx::test]`, with the crate's
//! migrations applied. Requires `DATABASE_URL` pointing at a Postgres
//! server with CREATE DATABASE rights.

use courtside_fulfillment::api::webhook;
use courtside_fulfillment::db;
use courtside_fulfillment::fulfillment::dispatch;
use courtside_fulfillment::reversal;
use courtside_fulfillment::state::AppState;
use serde_json::json;
use shared::models::{PairingStatus, PaymentEventStatus};
use sqlx::PgPool;

fn test_state(pool: PgPool) -> AppState {
    AppState {
        pool,
        http: reqwest::Client::new(),
        gateway_secret_key: "sk_test".into(),
        gateway_webhook_secret: "whsec_test".into(),
        grace_window_hours: 24,
        hold_ttl_minutes: 30,
    }
}

async fn seed_ticket_type(pool: &PgPool, id: &str, price: i64, total: i32) {
    sqlx::query(
        "INSERT INTO ticket_types (id, event_id, name, price, currency, total_quantity)
         VALUES ($1, 'ev_1', 'General', $2, 'eur', $3)",
    )
    .bind(id)
    .bind(price)
    .bind(total)
    .execute(pool)
    .await
    .unwrap();
}

async fn sold_quantity(pool: &PgPool, ticket_type_id: &str) -> i32 {
    let (n,): (i32,) = sqlx::query_as("SELECT sold_quantity FROM ticket_types WHERE id = $1")
        .bind(ticket_type_id)
        .fetch_one(pool)
        .await
        .unwrap();
    n
}

/// A `payment_intent.succeeded` payload without an intent id, so the
/// post-commit fee lookup is skipped and nothing leaves the database.
fn succeeded_intent(purchase_id: &str, items: &str, amount: i64) -> serde_json::Value {
    json!({
        "amount": amount,
        "currency": "eur",
        "metadata": {
            "purchaseId": purchase_id,
            "userId": "us_1",
            "items": items,
        }
    })
}

#[sqlx::test(migrations = "./migrations")]
async fn duplicate_delivery_issues_tickets_once(pool: PgPool) {
    seed_ticket_type(&pool, "tt_1", 2500, 10).await;
    let state = test_state(pool.clone());
    let intent = succeeded_intent("pu_1", r#"[{"ticketTypeId":"tt_1","quantity":2}]"#, 5000);

    dispatch::process_succeeded_intent(&state, "evt_1", &intent)
        .await
        .unwrap();
    // The gateway re-delivers the same capture under a fresh event id
    dispatch::process_succeeded_intent(&state, "evt_2", &intent)
        .await
        .unwrap();

    let mut conn = pool.acquire().await.unwrap();
    assert_eq!(
        db::tickets::count_by_purchase(&mut *conn, "pu_1").await.unwrap(),
        2
    );
    assert_eq!(sold_quantity(&pool, "tt_1").await, 2);

    let event = db::payment_events::get(&mut *conn, "pu_1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event.status, PaymentEventStatus::Ok);
    // The second delivery short-circuits on the fulfilled ledger row
    assert_eq!(event.attempts, 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn reserve_refuses_oversell_at_exact_capacity(pool: PgPool) {
    seed_ticket_type(&pool, "tt_1", 2500, 2).await;
    let mut conn = pool.acquire().await.unwrap();

    assert!(db::ticket_types::reserve(&mut *conn, "tt_1", 2).await.unwrap());
    assert_eq!(sold_quantity(&pool, "tt_1").await, 2);

    // Exactly full: one more seat must not go through
    assert!(!db::ticket_types::reserve(&mut *conn, "tt_1", 1).await.unwrap());
    assert_eq!(sold_quantity(&pool, "tt_1").await, 2);

    // Release is floored at zero even when over-released
    db::ticket_types::release(&mut *conn, "tt_1", 3).await.unwrap();
    assert_eq!(sold_quantity(&pool, "tt_1").await, 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn refund_redelivery_reverses_once(pool: PgPool) {
    seed_ticket_type(&pool, "tt_1", 2500, 5).await;
    let state = test_state(pool.clone());
    let intent = succeeded_intent("pu_1", r#"[{"ticketTypeId":"tt_1","quantity":2}]"#, 5000);
    dispatch::process_succeeded_intent(&state, "evt_1", &intent)
        .await
        .unwrap();
    assert_eq!(sold_quantity(&pool, "tt_1").await, 2);

    let charge = json!({ "metadata": { "purchaseId": "pu_1" } });
    reversal::process_refund(&state, &charge).await.unwrap();
    reversal::process_refund(&state, &charge).await.unwrap();

    // Stock came back exactly once
    assert_eq!(sold_quantity(&pool, "tt_1").await, 0);

    let (refunded,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM tickets WHERE purchase_id = 'pu_1' AND status = 'REFUNDED'",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(refunded, 2);

    let mut conn = pool.acquire().await.unwrap();
    let event = db::payment_events::get(&mut *conn, "pu_1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event.status, PaymentEventStatus::Refunded);

    // A refunded anchor refuses re-fulfillment
    dispatch::process_succeeded_intent(&state, "evt_9", &intent)
        .await
        .unwrap();
    assert_eq!(sold_quantity(&pool, "tt_1").await, 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn released_event_id_is_processed_again(pool: PgPool) {
    // First delivery claims the id, the duplicate is refused
    assert!(webhook::record_event(&pool, "evt_1", "payment_intent.succeeded", 1)
        .await
        .unwrap());
    assert!(!webhook::record_event(&pool, "evt_1", "payment_intent.succeeded", 2)
        .await
        .unwrap());

    // A retryable failure releases the id, so the gateway's re-delivery
    // of the same event goes through the pipeline instead of being
    // swallowed as a duplicate
    webhook::forget_event(&pool, "evt_1").await.unwrap();
    assert!(webhook::record_event(&pool, "evt_1", "payment_intent.succeeded", 3)
        .await
        .unwrap());
}

#[sqlx::test(migrations = "./migrations")]
async fn stock_short_line_gets_no_sale_line(pool: PgPool) {
    seed_ticket_type(&pool, "tt_a", 2500, 5).await;
    seed_ticket_type(&pool, "tt_b", 2500, 0).await;
    let state = test_state(pool.clone());
    let intent = succeeded_intent(
        "pu_1",
        r#"[{"ticketTypeId":"tt_a","quantity":1},{"ticketTypeId":"tt_b","quantity":1}]"#,
        5000,
    );
    dispatch::process_succeeded_intent(&state, "evt_1", &intent)
        .await
        .unwrap();

    // The skipped line left neither tickets nor a priced ledger row
    let lines: Vec<(String,)> =
        sqlx::query_as("SELECT ticket_type_id FROM sale_lines WHERE purchase_id = 'pu_1'")
            .fetch_all(&pool)
            .await
            .unwrap();
    assert_eq!(lines, vec![("tt_a".to_string(),)]);

    let mut conn = pool.acquire().await.unwrap();
    assert_eq!(
        db::tickets::count_by_purchase(&mut *conn, "pu_1").await.unwrap(),
        1
    );
    assert_eq!(sold_quantity(&pool, "tt_a").await, 1);
    assert_eq!(sold_quantity(&pool, "tt_b").await, 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn pairing_advisory_read_outside_transaction(pool: PgPool) {
    seed_ticket_type(&pool, "tt_1", 2500, 10).await;
    sqlx::query(
        "INSERT INTO pairings (id, event_id, ticket_type_id, captain_user_id,
                               payment_mode, status, guarantee_status, created_at, updated_at)
         VALUES ('pr_1', 'ev_1', 'tt_1', 'us_1', 'SPLIT', 'PENDING_PARTNER_PAYMENT',
                 'PENDING', 1, 1)",
    )
    .execute(&pool)
    .await
    .unwrap();

    // The worker's pre-charge re-check runs on a plain pooled connection,
    // outside any transaction
    let mut conn = pool.acquire().await.unwrap();
    let pairing = db::pairings::get(&mut *conn, "pr_1").await.unwrap().unwrap();
    assert_eq!(pairing.status, PairingStatus::PendingPartnerPayment);
    assert!(db::pairings::get(&mut *conn, "pr_nope").await.unwrap().is_none());
}
