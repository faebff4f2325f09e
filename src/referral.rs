//! Referral workflow on client records.
//!
//! ```text
//! (none) ──refer──▶ pending ──complete──▶ completed
//!                      │  ▲                   │
//!                      │  └──────refer────────┘
//!                      ▼
//!                 in_progress ──complete──▶ completed
//! ```
//!
//! `refer` overwrites whatever referral was there before. `in_progress` and
//! `cancelled` are never entered by this module but are respected when a
//! row already carries them. Every transition is one read-modify-write of a
//! single client row.

use rusqlite::Connection;

use crate::authorization::{authorize, AccessError, Caller, Operation};
use crate::db::{self, DatabaseError};
use crate::models::{next_update_stamp, now_local, Client, ReferralState, ReferralStatus};

#[derive(Debug, thiserror::Error)]
pub enum ReferralError {
    #[error("Client not found")]
    ClientNotFound,
    #[error("Doctor not found")]
    DoctorNotFound,
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error("Only the assigned doctor can complete this referral")]
    NotAssignedDoctor,
    #[error("Client has no referral to complete")]
    NotReferred,
    #[error("Referral is already {}", .0.label().to_lowercase())]
    Closed(ReferralStatus),
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

// ═══════════════════════════════════════════════════════════
// Pure transitions
// ═══════════════════════════════════════════════════════════

/// Point the referral at `doctor_id`, resetting every other referral field.
fn apply_refer(
    state: &mut ReferralState,
    doctor_id: i64,
    doctor_username: &str,
    notes: &str,
    now: chrono::NaiveDateTime,
) {
    *state = ReferralState {
        referred_to: Some(doctor_id),
        referred_to_username: Some(doctor_username.to_string()),
        referral_status: ReferralStatus::Pending,
        referral_notes: notes.trim().to_string(),
        is_referred: true,
        referred_at: Some(now),
        referral_completed_at: None,
        referral_seen: false,
    };
}

fn apply_complete(
    state: &mut ReferralState,
    caller_id: i64,
    now: chrono::NaiveDateTime,
) -> Result<(), ReferralError> {
    let assigned = match (state.is_referred, state.referred_to) {
        (true, Some(doctor)) => doctor,
        _ => return Err(ReferralError::NotReferred),
    };
    if assigned != caller_id {
        return Err(ReferralError::NotAssignedDoctor);
    }
    if !state.referral_status.is_open() {
        return Err(ReferralError::Closed(state.referral_status));
    }
    state.referral_status = ReferralStatus::Completed;
    state.referral_completed_at = Some(now);
    Ok(())
}

fn load_client(conn: &Connection, client_id: i64) -> Result<Client, ReferralError> {
    db::get_client(conn, client_id)?.ok_or(ReferralError::ClientNotFound)
}

fn persist(conn: &Connection, client: &mut Client) -> Result<(), ReferralError> {
    let stamp = next_update_stamp(&client.updated_at);
    db::save_referral(conn, client.id, &client.referral, &stamp)?;
    client.updated_at = stamp;
    Ok(())
}

// ═══════════════════════════════════════════════════════════
// Operations
// ═══════════════════════════════════════════════════════════

/// Refer a client to a doctor. Any staff role may refer.
pub fn refer_client(
    conn: &Connection,
    caller: &Caller,
    client_id: i64,
    doctor_id: i64,
    notes: &str,
) -> Result<Client, ReferralError> {
    authorize(caller, Operation::ReferClient)?;

    let mut client = load_client(conn, client_id)?;
    let doctor = db::get_doctor(conn, doctor_id)?.ok_or(ReferralError::DoctorNotFound)?;

    apply_refer(&mut client.referral, doctor.id, &doctor.username, notes, now_local());
    persist(conn, &mut client)?;

    tracing::info!(
        client_id,
        doctor = %doctor.username,
        by = %caller.username,
        "Client referred"
    );
    Ok(client)
}

/// Complete a referral. Only the doctor the client is referred to may do this.
pub fn complete_referral(
    conn: &Connection,
    caller: &Caller,
    client_id: i64,
) -> Result<Client, ReferralError> {
    authorize(caller, Operation::CompleteReferral)?;

    let mut client = load_client(conn, client_id)?;
    apply_complete(&mut client.referral, caller.user_id, now_local())?;
    persist(conn, &mut client)?;

    tracing::info!(client_id, doctor = %caller.username, "Referral completed");
    Ok(client)
}

/// Record that the assigned doctor has seen the referral.
/// Clients not referred to the caller are reported as not found.
pub fn mark_referral_seen(
    conn: &Connection,
    caller: &Caller,
    client_id: i64,
) -> Result<Client, ReferralError> {
    authorize(caller, Operation::MarkReferralSeen)?;

    let mut client = load_client(conn, client_id)?;
    if !client.is_referred_to(caller.user_id) {
        return Err(ReferralError::ClientNotFound);
    }
    client.referral.referral_seen = true;
    persist(conn, &mut client)?;

    tracing::debug!(client_id, doctor = %caller.username, "Referral acknowledged");
    Ok(client)
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════
