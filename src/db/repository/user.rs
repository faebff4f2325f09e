use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension};

use super::map_constraint;
use crate::db::DatabaseError;
use crate::models::*;

const USER_COLUMNS: &str =
    "id, username, email, phone, user_type, is_superuser, created_at";

struct UserRow {
    id: i64,
    username: String,
    email: String,
    phone: Option<String>,
    user_type: String,
    is_superuser: i32,
    created_at: String,
}

fn read_user_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        phone: row.get(3)?,
        user_type: row.get(4)?,
        is_superuser: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn user_from_row(row: UserRow) -> Result<User, DatabaseError> {
    Ok(User {
        id: row.id,
        username: row.username,
        email: row.email,
        phone: row.phone,
        user_type: UserType::from_str(&row.user_type)?,
        is_superuser: row.is_superuser != 0,
        created_at: parse_timestamp(&row.created_at).unwrap_or_default(),
    })
}

pub fn insert_user(conn: &Connection, user: &NewUser) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO users (username, email, phone, user_type, is_superuser,
         password_hash, password_salt, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            user.username,
            user.email,
            user.phone,
            user.user_type.as_str(),
            user.is_superuser as i32,
            user.password_hash,
            user.password_salt,
            format_timestamp(&now_local()),
        ],
    )
    .map_err(|e| map_constraint(e, "username already exists"))?;
    Ok(conn.last_insert_rowid())
}

pub fn get_user(conn: &Connection, id: i64) -> Result<Option<User>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            params![id],
            read_user_row,
        )
        .optional()?;
    row.map(user_from_row).transpose()
}

/// Password material for `username`, or `None` when no such account exists.
pub fn get_credentials(
    conn: &Connection,
    username: &str,
) -> Result<Option<StoredCredentials>, DatabaseError> {
    conn.query_row(
        "SELECT id, password_hash, password_salt FROM users WHERE username = ?1",
        params![username],
        |row| {
            Ok(StoredCredentials {
                user_id: row.get(0)?,
                password_hash: row.get(1)?,
                password_salt: row.get(2)?,
            })
        },
    )
    .optional()
    .map_err(DatabaseError::from)
}

pub fn username_exists(conn: &Connection, username: &str) -> Result<bool, DatabaseError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM users WHERE username = ?1",
        params![username],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

pub fn count_users(conn: &Connection) -> Result<u32, DatabaseError> {
    conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
        .map_err(DatabaseError::from)
}

/// Accounts that may receive referrals: doctors and superusers.
pub fn list_doctors(conn: &Connection) -> Result<Vec<DoctorSummary>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, username FROM users
         WHERE user_type = 'doctor' OR is_superuser = 1
         ORDER BY username",
    )?;

    let rows = stmt.query_map([], |row| {
        Ok(DoctorSummary {
            id: row.get(0)?,
            username: row.get(1)?,
        })
    })?;

    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

/// Fetch a user only if it can act as a doctor.
pub fn get_doctor(conn: &Connection, id: i64) -> Result<Option<User>, DatabaseError> {
    let row = conn
        .query_row(
            &format!(
                "SELECT {USER_COLUMNS} FROM users
                 WHERE id = ?1 AND (user_type = 'doctor' OR is_superuser = 1)"
            ),
            params![id],
            read_user_row,
        )
        .optional()?;
    row.map(user_from_row).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;

    fn new_user(username: &str, user_type: UserType, is_superuser: bool) -> NewUser {
        NewUser {
            username: username.into(),
            email: format!("{username}@clinic.test"),
            phone: None,
            user_type,
            is_superuser,
            password_hash: "hash".into(),
            password_salt: "salt".into(),
        }
    }

    #[test]
    fn insert_and_fetch_user() {
        let conn = open_memory_database().unwrap();
        let id = insert_user(&conn, &new_user("drsmith", UserType::Doctor, false)).unwrap();
        let user = get_user(&conn, id).unwrap().unwrap();
        assert_eq!(user.username, "drsmith");
        assert_eq!(user.user_type, UserType::Doctor);
        assert!(!user.is_superuser);
        assert!(get_user(&conn, id + 1).unwrap().is_none());
    }

    #[test]
    fn duplicate_username_is_constraint_violation() {
        let conn = open_memory_database().unwrap();
        insert_user(&conn, &new_user("front", UserType::Receptionist, false)).unwrap();
        let err = insert_user(&conn, &new_user("front", UserType::Receptionist, false))
            .unwrap_err();
        assert!(matches!(err, DatabaseError::ConstraintViolation(_)));
        assert!(username_exists(&conn, "front").unwrap());
    }

    #[test]
    fn doctors_include_superusers_only() {
        let conn = open_memory_database().unwrap();
        let doc = insert_user(&conn, &new_user("b-doc", UserType::Doctor, false)).unwrap();
        let admin = insert_user(&conn, &new_user("a-admin", UserType::Receptionist, true)).unwrap();
        let desk = insert_user(&conn, &new_user("c-desk", UserType::Receptionist, false)).unwrap();

        let doctors = list_doctors(&conn).unwrap();
        let names: Vec<_> = doctors.iter().map(|d| d.username.as_str()).collect();
        assert_eq!(names, vec!["a-admin", "b-doc"]);

        assert!(get_doctor(&conn, doc).unwrap().is_some());
        assert!(get_doctor(&conn, admin).unwrap().is_some());
        assert!(get_doctor(&conn, desk).unwrap().is_none());
    }

    #[test]
    fn credentials_lookup() {
        let conn = open_memory_database().unwrap();
        let id = insert_user(&conn, &new_user("drsmith", UserType::Doctor, false)).unwrap();
        let creds = get_credentials(&conn, "drsmith").unwrap().unwrap();
        assert_eq!(creds.user_id, id);
        assert_eq!(creds.password_hash, "hash");
        assert!(get_credentials(&conn, "nobody").unwrap().is_none());
        assert_eq!(count_users(&conn).unwrap(), 1);
    }
}
