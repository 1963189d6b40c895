//! Two-seat pairings, their slots, and the guarantee sub-record

use sqlx::{PgConnection, PgPool};

use shared::models::{
    GuaranteeStatus, Pairing, PairingSlot, PairingStatus, PaymentMode, SlotOccupancy, SlotPayment,
    SlotRole,
};

type PairingRow = (
    String,
    String,
    String,
    String,
    Option<String>,
    String,
    String,
    Option<String>,
    Option<String>,
    String,
    Option<i64>,
    i64,
    i64,
);

const PAIRING_COLS: &str = "id, event_id, ticket_type_id, captain_user_id, partner_user_id,
     payment_mode, status, invite_token, link_token, guarantee_status,
     grace_deadline, created_at, updated_at";

fn map_pairing(r: PairingRow) -> Pairing {
    let (
        id,
        event_id,
        ticket_type_id,
        captain_user_id,
        partner_user_id,
        payment_mode,
        status,
        invite_token,
        link_token,
        guarantee_status,
        grace_deadline,
        created_at,
        updated_at,
    ) = r;
    Pairing {
        id,
        event_id,
        ticket_type_id,
        captain_user_id,
        partner_user_id,
        payment_mode: PaymentMode::from_db(&payment_mode).unwrap_or(PaymentMode::Full),
        status: PairingStatus::from_db(&status).unwrap_or(PairingStatus::Cancelled),
        invite_token,
        link_token,
        guarantee_status: GuaranteeStatus::from_db(&guarantee_status)
            .unwrap_or(GuaranteeStatus::None),
        grace_deadline,
        created_at,
        updated_at,
    }
}

/// Plain read, no lock. For advisory checks outside a transaction, where a
/// `FOR UPDATE` lock would be released at the end of the statement anyway.
pub async fn get(conn: &mut PgConnection, id: &str) -> Result<Option<Pairing>, sqlx::Error> {
    let sql = format!("SELECT {PAIRING_COLS} FROM pairings WHERE id = $1");
    let row: Option<PairingRow> = sqlx::query_as(&sql).bind(id).fetch_optional(conn).await?;
    Ok(row.map(map_pairing))
}

/// Row-lock the pairing for the duration of the event transaction
pub async fn get_for_update(
    conn: &mut PgConnection,
    id: &str,
) -> Result<Option<Pairing>, sqlx::Error> {
    let sql = format!("SELECT {PAIRING_COLS} FROM pairings WHERE id = $1 FOR UPDATE");
    let row: Option<PairingRow> = sqlx::query_as(&sql).bind(id).fetch_optional(conn).await?;
    Ok(row.map(map_pairing))
}

type SlotRow = (String, String, String, String, String, Option<String>, Option<String>);

fn map_slot(r: SlotRow) -> PairingSlot {
    let (id, pairing_id, role, occupancy, payment, player_user_id, ticket_id) = r;
    PairingSlot {
        id,
        pairing_id,
        role: SlotRole::from_db(&role).unwrap_or(SlotRole::Partner),
        occupancy: SlotOccupancy::from_db(&occupancy).unwrap_or(SlotOccupancy::Pending),
        payment: SlotPayment::from_db(&payment).unwrap_or(SlotPayment::Unpaid),
        player_user_id,
        ticket_id,
    }
}

pub async fn list_slots(
    conn: &mut PgConnection,
    pairing_id: &str,
) -> Result<Vec<PairingSlot>, sqlx::Error> {
    let rows: Vec<SlotRow> = sqlx::query_as(
        "SELECT id, pairing_id, role, occupancy, payment, player_user_id, ticket_id
         FROM pairing_slots WHERE pairing_id = $1
         ORDER BY role",
    )
    .bind(pairing_id)
    .fetch_all(conn)
    .await?;
    Ok(rows.into_iter().map(map_slot).collect())
}

pub async fn get_slot(
    conn: &mut PgConnection,
    slot_id: &str,
) -> Result<Option<PairingSlot>, sqlx::Error> {
    let row: Option<SlotRow> = sqlx::query_as(
        "SELECT id, pairing_id, role, occupancy, payment, player_user_id, ticket_id
         FROM pairing_slots WHERE id = $1",
    )
    .bind(slot_id)
    .fetch_optional(conn)
    .await?;
    Ok(row.map(map_slot))
}

/// Find the slot a refunded ticket was attached to, if any
pub async fn find_slot_by_ticket(
    conn: &mut PgConnection,
    ticket_id: &str,
) -> Result<Option<PairingSlot>, sqlx::Error> {
    let row: Option<SlotRow> = sqlx::query_as(
        "SELECT id, pairing_id, role, occupancy, payment, player_user_id, ticket_id
         FROM pairing_slots WHERE ticket_id = $1",
    )
    .bind(ticket_id)
    .fetch_optional(conn)
    .await?;
    Ok(row.map(map_slot))
}

pub async fn mark_slot_paid(
    conn: &mut PgConnection,
    slot_id: &str,
    ticket_id: &str,
    player_user_id: Option<&str>,
    occupancy: SlotOccupancy,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE pairing_slots
         SET payment = 'PAID', occupancy = $2, ticket_id = $3,
             player_user_id = COALESCE($4, player_user_id)
         WHERE id = $1",
    )
    .bind(slot_id)
    .bind(occupancy.as_db())
    .bind(ticket_id)
    .bind(player_user_id)
    .execute(conn)
    .await?;
    Ok(())
}

/// Reversal: detach the ticket and reopen the seat
pub async fn unbind_slot(
    conn: &mut PgConnection,
    slot_id: &str,
    occupancy: SlotOccupancy,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE pairing_slots
         SET payment = 'UNPAID', occupancy = $2, ticket_id = NULL
         WHERE id = $1",
    )
    .bind(slot_id)
    .bind(occupancy.as_db())
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn update_status(
    conn: &mut PgConnection,
    id: &str,
    status: PairingStatus,
    now: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE pairings SET status = $2, updated_at = $3 WHERE id = $1")
        .bind(id)
        .bind(status.as_db())
        .bind(now)
        .execute(conn)
        .await?;
    Ok(())
}

/// Bind the partner identity and burn the invite/link tokens
pub async fn assign_partner(
    conn: &mut PgConnection,
    id: &str,
    partner_user_id: &str,
    now: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE pairings
         SET partner_user_id = $2, invite_token = NULL, link_token = NULL, updated_at = $3
         WHERE id = $1",
    )
    .bind(id)
    .bind(partner_user_id)
    .bind(now)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn clear_tokens(conn: &mut PgConnection, id: &str, now: i64) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE pairings
         SET invite_token = NULL, link_token = NULL, updated_at = $2
         WHERE id = $1",
    )
    .bind(id)
    .bind(now)
    .execute(conn)
    .await?;
    Ok(())
}

/// Pairings whose NEEDS_AUTH grace window has lapsed (sweep input)
pub async fn list_grace_expired(pool: &PgPool, now: i64) -> Result<Vec<String>, sqlx::Error> {
    let rows: Vec<(String,)> = sqlx::query_as(
        "SELECT id FROM pairings
         WHERE guarantee_status = 'NEEDS_AUTH'
           AND grace_deadline IS NOT NULL AND grace_deadline < $1",
    )
    .bind(now)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(|r| r.0).collect())
}

pub async fn set_guarantee(
    conn: &mut PgConnection,
    id: &str,
    status: GuaranteeStatus,
    grace_deadline: Option<i64>,
    now: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE pairings
         SET guarantee_status = $2, grace_deadline = $3, updated_at = $4
         WHERE id = $1",
    )
    .bind(id)
    .bind(status.as_db())
    .bind(grace_deadline)
    .bind(now)
    .execute(conn)
    .await?;
    Ok(())
}
