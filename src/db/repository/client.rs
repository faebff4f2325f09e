use std::str::FromStr;

use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};

use super::map_constraint;
use crate::db::DatabaseError;
use crate::models::*;

const CLIENT_SELECT: &str =
    "SELECT c.id, c.first_name, c.last_name, c.age, c.email, c.phone, c.gender,
            c.diagnosis, c.treatment_plan, c.prescriptions, c.doctor_notes,
            c.created_by, cu.username, c.created_at, c.updated_at, c.last_visited,
            c.referred_to, ru.username, c.referral_status, c.referral_notes,
            c.is_referred, c.referred_at, c.referral_completed_at, c.referral_seen
     FROM clients c
     JOIN users cu ON cu.id = c.created_by
     LEFT JOIN users ru ON ru.id = c.referred_to";

const NEWEST_FIRST: &str = "ORDER BY c.created_at DESC, c.id DESC";

struct ClientRow {
    id: i64,
    first_name: String,
    last_name: String,
    age: i64,
    email: Option<String>,
    phone: String,
    gender: String,
    diagnosis: String,
    treatment_plan: String,
    prescriptions: String,
    doctor_notes: String,
    created_by: i64,
    created_by_username: String,
    created_at: String,
    updated_at: String,
    last_visited: Option<String>,
    referred_to: Option<i64>,
    referred_to_username: Option<String>,
    referral_status: String,
    referral_notes: String,
    is_referred: i32,
    referred_at: Option<String>,
    referral_completed_at: Option<String>,
    referral_seen: i32,
}

fn read_client_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ClientRow> {
    Ok(ClientRow {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        age: row.get(3)?,
        email: row.get(4)?,
        phone: row.get(5)?,
        gender: row.get(6)?,
        diagnosis: row.get(7)?,
        treatment_plan: row.get(8)?,
        prescriptions: row.get(9)?,
        doctor_notes: row.get(10)?,
        created_by: row.get(11)?,
        created_by_username: row.get(12)?,
        created_at: row.get(13)?,
        updated_at: row.get(14)?,
        last_visited: row.get(15)?,
        referred_to: row.get(16)?,
        referred_to_username: row.get(17)?,
        referral_status: row.get(18)?,
        referral_notes: row.get(19)?,
        is_referred: row.get(20)?,
        referred_at: row.get(21)?,
        referral_completed_at: row.get(22)?,
        referral_seen: row.get(23)?,
    })
}

fn client_from_row(row: ClientRow) -> Result<Client, DatabaseError> {
    let age = u8::try_from(row.age)
        .map_err(|_| DatabaseError::ConstraintViolation(format!("age out of range: {}", row.age)))?;

    Ok(Client {
        id: row.id,
        first_name: row.first_name,
        last_name: row.last_name,
        age,
        email: row.email,
        phone: row.phone,
        gender: Gender::from_str(&row.gender)?,
        diagnosis: row.diagnosis,
        treatment_plan: row.treatment_plan,
        prescriptions: row.prescriptions,
        doctor_notes: row.doctor_notes,
        created_by: row.created_by,
        created_by_username: row.created_by_username,
        created_at: parse_timestamp(&row.created_at).unwrap_or_default(),
        updated_at: parse_timestamp(&row.updated_at).unwrap_or_default(),
        last_visited: row.last_visited.as_deref().and_then(parse_timestamp),
        referral: ReferralState {
            referred_to: row.referred_to,
            referred_to_username: row.referred_to_username,
            referral_status: ReferralStatus::from_str(&row.referral_status)?,
            referral_notes: row.referral_notes,
            is_referred: row.is_referred != 0,
            referred_at: row.referred_at.as_deref().and_then(parse_timestamp),
            referral_completed_at: row.referral_completed_at.as_deref().and_then(parse_timestamp),
            referral_seen: row.referral_seen != 0,
        },
    })
}

fn collect_clients(
    stmt: &mut rusqlite::Statement<'_>,
    params: impl rusqlite::Params,
) -> Result<Vec<Client>, DatabaseError> {
    let rows = stmt.query_map(params, read_client_row)?;
    let mut clients = Vec::new();
    for row in rows {
        clients.push(client_from_row(row?)?);
    }
    Ok(clients)
}

/// Escape `%`, `_` and `\` so the query matches literally inside LIKE.
fn like_pattern(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len() + 2);
    escaped.push('%');
    for ch in query.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

pub fn insert_client(
    conn: &Connection,
    identity: &ClientIdentity,
    created_by: i64,
) -> Result<i64, DatabaseError> {
    let now = format_timestamp(&now_local());
    conn.execute(
        "INSERT INTO clients (first_name, last_name, age, email, phone, gender,
         created_by, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
        params![
            identity.first_name,
            identity.last_name,
            identity.age,
            identity.email,
            identity.phone,
            identity.gender.as_str(),
            created_by,
            now,
        ],
    )
    .map_err(|e| map_constraint(e, "client record rejected by schema"))?;
    Ok(conn.last_insert_rowid())
}

pub fn get_client(conn: &Connection, id: i64) -> Result<Option<Client>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("{CLIENT_SELECT} WHERE c.id = ?1"),
            params![id],
            read_client_row,
        )
        .optional()?;
    row.map(client_from_row).transpose()
}

/// All clients, newest first. A query restricts to clients whose first name,
/// last name, phone or email contains it, ignoring case (Unicode-aware).
pub fn list_clients(conn: &Connection, query: Option<&str>) -> Result<Vec<Client>, DatabaseError> {
    match query {
        Some(q) => {
            let mut stmt = conn.prepare(&format!(
                "{CLIENT_SELECT}
                 WHERE ulower(c.first_name) LIKE ?1 ESCAPE '\\'
                    OR ulower(c.last_name) LIKE ?1 ESCAPE '\\'
                    OR ulower(c.phone) LIKE ?1 ESCAPE '\\'
                    OR ulower(c.email) LIKE ?1 ESCAPE '\\'
                 {NEWEST_FIRST}"
            ))?;
            collect_clients(&mut stmt, params![like_pattern(&q.to_lowercase())])
        }
        None => {
            let mut stmt = conn.prepare(&format!("{CLIENT_SELECT} {NEWEST_FIRST}"))?;
            collect_clients(&mut stmt, [])
        }
    }
}

/// Clients referred to `doctor_id` whose referral is still pending.
pub fn list_pending_referrals(
    conn: &Connection,
    doctor_id: i64,
) -> Result<Vec<Client>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "{CLIENT_SELECT}
         WHERE c.referred_to = ?1 AND c.referral_status = 'pending'
         {NEWEST_FIRST}"
    ))?;
    collect_clients(&mut stmt, params![doctor_id])
}

pub fn count_pending_referrals(conn: &Connection, doctor_id: i64) -> Result<u32, DatabaseError> {
    conn.query_row(
        "SELECT COUNT(*) FROM clients WHERE referred_to = ?1 AND referral_status = 'pending'",
        params![doctor_id],
        |row| row.get(0),
    )
    .map_err(DatabaseError::from)
}

pub fn update_medical(
    conn: &Connection,
    id: i64,
    update: &MedicalUpdate,
    updated_at: &NaiveDateTime,
) -> Result<(), DatabaseError> {
    let identity = &update.identity;
    let changed = conn
        .execute(
            "UPDATE clients SET first_name = ?1, last_name = ?2, age = ?3, email = ?4,
             phone = ?5, gender = ?6, diagnosis = ?7, treatment_plan = ?8,
             prescriptions = ?9, doctor_notes = ?10, updated_at = ?11
             WHERE id = ?12",
            params![
                identity.first_name,
                identity.last_name,
                identity.age,
                identity.email,
                identity.phone,
                identity.gender.as_str(),
                update.diagnosis,
                update.treatment_plan,
                update.prescriptions,
                update.doctor_notes,
                format_timestamp(updated_at),
                id,
            ],
        )
        .map_err(|e| map_constraint(e, "client record rejected by schema"))?;
    if changed == 0 {
        return Err(DatabaseError::not_found("client", id));
    }
    Ok(())
}

/// Persist the referral sub-state of one client in a single row write.
pub fn save_referral(
    conn: &Connection,
    id: i64,
    referral: &ReferralState,
    updated_at: &NaiveDateTime,
) -> Result<(), DatabaseError> {
    let changed = conn
        .execute(
            "UPDATE clients SET referred_to = ?1, referral_status = ?2, referral_notes = ?3,
             is_referred = ?4, referred_at = ?5, referral_completed_at = ?6,
             referral_seen = ?7, updated_at = ?8
             WHERE id = ?9",
            params![
                referral.referred_to,
                referral.referral_status.as_str(),
                referral.referral_notes,
                referral.is_referred as i32,
                referral.referred_at.as_ref().map(format_timestamp),
                referral.referral_completed_at.as_ref().map(format_timestamp),
                referral.referral_seen as i32,
                format_timestamp(updated_at),
                id,
            ],
        )
        .map_err(|e| map_constraint(e, "referral target rejected by schema"))?;
    if changed == 0 {
        return Err(DatabaseError::not_found("client", id));
    }
    Ok(())
}

pub fn delete_client(conn: &Connection, id: i64) -> Result<(), DatabaseError> {
    let changed = conn.execute("DELETE FROM clients WHERE id = ?1", params![id])?;
    if changed == 0 {
        return Err(DatabaseError::not_found("client", id));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::insert_user;
    use crate::db::sqlite::open_memory_database;

    fn test_db() -> (Connection, i64) {
        let conn = open_memory_database().unwrap();
        let user = insert_user(
            &conn,
            &NewUser {
                username: "desk".into(),
                email: "desk@clinic.test".into(),
                phone: None,
                user_type: UserType::Receptionist,
                is_superuser: false,
                password_hash: "h".into(),
                password_salt: "s".into(),
            },
        )
        .unwrap();
        (conn, user)
    }

    fn identity(first: &str, last: &str, phone: &str, email: Option<&str>) -> ClientIdentity {
        ClientIdentity {
            first_name: first.into(),
            last_name: last.into(),
            age: 30,
            email: email.map(str::to_string),
            phone: phone.into(),
            gender: Gender::Female,
        }
    }

    #[test]
    fn insert_and_fetch_client() {
        let (conn, user) = test_db();
        let id = insert_client(&conn, &identity("Abeba", "Kebede", "+251911111111", None), user)
            .unwrap();
        let client = get_client(&conn, id).unwrap().unwrap();
        assert_eq!(client.full_name(), "Abeba Kebede");
        assert_eq!(client.created_by_username, "desk");
        assert_eq!(client.created_at, client.updated_at);
        assert!(!client.referral.is_referred);
        assert_eq!(client.referral.referral_status, ReferralStatus::Pending);
        assert!(get_client(&conn, id + 1).unwrap().is_none());
    }

    #[test]
    fn list_is_newest_first() {
        let (conn, user) = test_db();
        let first = insert_client(&conn, &identity("A", "One", "+251911111111", None), user).unwrap();
        let second = insert_client(&conn, &identity("B", "Two", "+251922222222", None), user).unwrap();
        let ids: Vec<_> = list_clients(&conn, None).unwrap().iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![second, first]);
    }

    #[test]
    fn search_matches_any_field_case_insensitively() {
        let (conn, user) = test_db();
        insert_client(&conn, &identity("Abeba", "Kebede", "+251911111111", None), user).unwrap();
        insert_client(
            &conn,
            &identity("Tola", "Bekele", "+251922222222", Some("tola@mail.test")),
            user,
        )
        .unwrap();

        assert_eq!(list_clients(&conn, Some("abeba")).unwrap().len(), 1);
        assert_eq!(list_clients(&conn, Some("BEKELE")).unwrap().len(), 1);
        assert_eq!(list_clients(&conn, Some("92222")).unwrap().len(), 1);
        assert_eq!(list_clients(&conn, Some("MAIL.TEST")).unwrap().len(), 1);
        assert_eq!(list_clients(&conn, Some("be")).unwrap().len(), 2);
        assert!(list_clients(&conn, Some("zzz")).unwrap().is_empty());
    }

    #[test]
    fn search_folds_non_ascii_case() {
        let (conn, user) = test_db();
        insert_client(
            &conn,
            &identity("Élise", "Öztürk", "+251933333333", Some("ÉLISE@mail.test")),
            user,
        )
        .unwrap();
        insert_client(&conn, &identity("Abeba", "Kebede", "+251911111111", None), user).unwrap();

        assert_eq!(list_clients(&conn, Some("élise")).unwrap().len(), 1);
        assert_eq!(list_clients(&conn, Some("ÖZTÜRK")).unwrap().len(), 1);
        assert_eq!(list_clients(&conn, Some("élise@")).unwrap().len(), 1);
        assert!(list_clients(&conn, Some("öz_")).unwrap().is_empty());
    }

    #[test]
    fn search_treats_wildcards_literally() {
        let (conn, user) = test_db();
        insert_client(&conn, &identity("Abeba", "Kebede", "+251911111111", None), user).unwrap();
        assert!(list_clients(&conn, Some("%")).unwrap().is_empty());
        assert!(list_clients(&conn, Some("_")).unwrap().is_empty());
    }

    #[test]
    fn update_and_delete_missing_client_is_not_found() {
        let (conn, _) = test_db();
        let update = MedicalUpdate {
            identity: identity("A", "B", "+251911111111", None),
            diagnosis: String::new(),
            treatment_plan: String::new(),
            prescriptions: String::new(),
            doctor_notes: String::new(),
        };
        let err = update_medical(&conn, 42, &update, &now_local()).unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
        let err = delete_client(&conn, 42).unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }

    #[test]
    fn deleting_referral_target_nulls_reference() {
        let (conn, user) = test_db();
        let doctor = insert_user(
            &conn,
            &NewUser {
                username: "drtemp".into(),
                email: String::new(),
                phone: None,
                user_type: UserType::Doctor,
                is_superuser: false,
                password_hash: "h".into(),
                password_salt: "s".into(),
            },
        )
        .unwrap();
        let id = insert_client(&conn, &identity("A", "B", "+251911111111", None), user).unwrap();
        let referral = ReferralState {
            referred_to: Some(doctor),
            is_referred: true,
            referred_at: Some(now_local()),
            ..Default::default()
        };
        save_referral(&conn, id, &referral, &now_local()).unwrap();
        assert_eq!(count_pending_referrals(&conn, doctor).unwrap(), 1);

        conn.execute("DELETE FROM users WHERE id = ?1", params![doctor]).unwrap();
        let client = get_client(&conn, id).unwrap().unwrap();
        assert_eq!(client.referral.referred_to, None);
        assert!(client.referral.is_referred);
    }
}
