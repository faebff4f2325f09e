//! Dashboard query/search: filtered client listings, per-role stats,
//! the incremental table fragment, and pending-referral lookups.
//!
//! Stats are computed from the same filtered listing that is returned, so
//! `total_count` always equals the number of rows shown.

use chrono::NaiveDate;
use rusqlite::Connection;
use serde::Serialize;

use crate::authorization::{authorize, AccessError, Caller, Operation, Role};
use crate::db::{self, DatabaseError};
use crate::models::{now_local, Client, DoctorSummary, ReferralStatus};

#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DoctorStats {
    pub total_clients: u32,
    pub my_patients_count: u32,
    pub pending_referrals: u32,
    pub completed_treatments: u32,
    pub new_today: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReceptionistStats {
    pub total_clients: u32,
    pub with_diagnosis: u32,
    pub today_count: u32,
    pub referred_count: u32,
}

/// Role-specific header counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum DashboardStats {
    Doctor(DoctorStats),
    Receptionist(ReceptionistStats),
}

/// One dashboard query result; both response shapes are built from it.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardResult {
    pub clients: Vec<Client>,
    pub stats: DashboardStats,
    pub total_count: usize,
}

/// Full dashboard page view model.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardPage {
    pub role: Role,
    pub query: String,
    pub clients: Vec<Client>,
    pub stats: DashboardStats,
    pub total_count: usize,
    pub doctors: Vec<DoctorSummary>,
}

/// Incremental refresh payload.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardFragment {
    pub clients_html: String,
    pub total_count: usize,
    pub stats: DashboardStats,
}

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

fn count_where(clients: &[Client], pred: impl Fn(&Client) -> bool) -> u32 {
    clients.iter().filter(|c| pred(*c)).count() as u32
}

pub fn doctor_stats(clients: &[Client], doctor_id: i64, today: NaiveDate) -> DoctorStats {
    DoctorStats {
        total_clients: clients.len() as u32,
        my_patients_count: count_where(clients, |c| {
            c.is_referred_to(doctor_id) || c.has_diagnosis()
        }),
        pending_referrals: count_where(clients, |c| {
            c.is_referred_to(doctor_id) && c.referral.referral_status == ReferralStatus::Pending
        }),
        completed_treatments: count_where(clients, |c| {
            c.has_treatment_plan() && c.has_diagnosis()
        }),
        new_today: count_where(clients, |c| c.created_at.date() == today),
    }
}

pub fn receptionist_stats(clients: &[Client], today: NaiveDate) -> ReceptionistStats {
    ReceptionistStats {
        total_clients: clients.len() as u32,
        with_diagnosis: count_where(clients, Client::has_diagnosis),
        today_count: count_where(clients, |c| c.created_at.date() == today),
        referred_count: count_where(clients, |c| c.referral.is_referred),
    }
}

pub fn stats_for(caller: &Caller, clients: &[Client], today: NaiveDate) -> DashboardStats {
    match caller.role {
        Role::Doctor => DashboardStats::Doctor(doctor_stats(clients, caller.user_id, today)),
        Role::Receptionist => DashboardStats::Receptionist(receptionist_stats(clients, today)),
    }
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Trimmed query, or `None` when blank.
pub fn normalize_query(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|q| !q.is_empty())
}

/// Filtered listing plus stats for the caller's role.
pub fn search(
    conn: &Connection,
    caller: &Caller,
    query: Option<&str>,
) -> Result<DashboardResult, DashboardError> {
    authorize(caller, Operation::ViewDashboard)?;

    let clients = db::list_clients(conn, normalize_query(query))?;
    let stats = stats_for(caller, &clients, now_local().date());
    Ok(DashboardResult {
        total_count: clients.len(),
        clients,
        stats,
    })
}

pub fn dashboard_page(
    conn: &Connection,
    caller: &Caller,
    query: Option<&str>,
) -> Result<DashboardPage, DashboardError> {
    let result = search(conn, caller, query)?;
    Ok(DashboardPage {
        role: caller.role,
        query: normalize_query(query).unwrap_or_default().to_string(),
        clients: result.clients,
        stats: result.stats,
        total_count: result.total_count,
        doctors: db::list_doctors(conn)?,
    })
}

pub fn dashboard_fragment(
    conn: &Connection,
    caller: &Caller,
    query: Option<&str>,
) -> Result<DashboardFragment, DashboardError> {
    let result = search(conn, caller, query)?;
    Ok(DashboardFragment {
        clients_html: render_clients_table(&result.clients, caller.role),
        total_count: result.total_count,
        stats: result.stats,
    })
}

/// Clients referred to the caller that are still pending, newest first.
pub fn pending_referrals(conn: &Connection, caller: &Caller) -> Result<Vec<Client>, DashboardError> {
    authorize(caller, Operation::ListPendingReferrals)?;
    Ok(db::list_pending_referrals(conn, caller.user_id)?)
}

/// Pending-referral count for the notification badge. Non-doctors get 0.
pub fn poll_pending_count(conn: &Connection, caller: &Caller) -> Result<u32, DashboardError> {
    authorize(caller, Operation::PollNotifications)?;
    if !caller.is_doctor() {
        return Ok(0);
    }
    Ok(db::count_pending_referrals(conn, caller.user_id)?)
}

// ---------------------------------------------------------------------------
// Fragment rendering
// ---------------------------------------------------------------------------

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// Render the `<tbody>` of the dashboard client table.
pub fn render_clients_table(clients: &[Client], role: Role) -> String {
    let columns = if role == Role::Doctor { 7 } else { 6 };
    let mut html = String::from("<tbody>");

    if clients.is_empty() {
        html.push_str(&format!(
            "<tr><td colspan=\"{columns}\" class=\"empty\">No clients found.</td></tr>"
        ));
    }

    for client in clients {
        let referral = if client.referral.is_referred {
            format!(
                "{} ({})",
                client.referral.referral_status.label(),
                escape_html(
                    client
                        .referral
                        .referred_to_username
                        .as_deref()
                        .unwrap_or("unassigned")
                )
            )
        } else {
            "-".to_string()
        };

        html.push_str(&format!(
            "<tr data-client-id=\"{id}\">\
             <td><a href=\"/clients/{id}\">{name}</a></td>\
             <td>{age}</td><td>{gender}</td><td>{phone}</td>\
             <td>{email}</td><td>{referral}</td>",
            id = client.id,
            name = escape_html(&client.full_name()),
            age = client.age,
            gender = client.gender.as_str(),
            phone = escape_html(&client.phone),
            email = escape_html(client.email.as_deref().unwrap_or("")),
        ));

        if role == Role::Doctor {
            html.push_str(&format!(
                "<td class=\"actions\">\
                 <a href=\"/clients/{id}/medical\">Edit</a> \
                 <a href=\"/clients/{id}/delete\">Delete</a></td>",
                id = client.id,
            ));
        }
        html.push_str("</tr>");
    }

    html.push_str("</tbody>");
    html
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
