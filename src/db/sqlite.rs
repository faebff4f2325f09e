use std::path::Path;

use rusqlite::functions::FunctionFlags;
use rusqlite::Connection;

use super::DatabaseError;

/// Open a SQLite connection to the given path and run migrations.
/// The parent directory is created when missing.
pub fn open_database(path: &Path) -> Result<Connection, DatabaseError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let conn = Connection::open(path)?;
    configure_pragmas(&conn)?;
    register_functions(&conn)?;
    run_migrations(&conn)?;
    Ok(conn)
}

/// Open an in-memory database (for testing)
pub fn open_memory_database() -> Result<Connection, DatabaseError> {
    let conn = Connection::open_in_memory()?;
    configure_pragmas(&conn)?;
    register_functions(&conn)?;
    run_migrations(&conn)?;
    Ok(conn)
}

fn configure_pragmas(conn: &Connection) -> Result<(), DatabaseError> {
    conn.execute_batch(
        "PRAGMA journal_mode=DELETE;
         PRAGMA foreign_keys=ON;
         PRAGMA busy_timeout=5000;"
    )?;
    Ok(())
}

/// `ulower(text)`: Unicode lowercase. SQLite's own `lower()` and `LIKE`
/// only fold ASCII. NULL stays NULL.
fn register_functions(conn: &Connection) -> Result<(), DatabaseError> {
    conn.create_scalar_function(
        "ulower",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| Ok(ctx.get::<Option<String>>(0)?.map(|s| s.to_lowercase())),
    )?;
    Ok(())
}

/// Run all pending migrations
pub fn run_migrations(conn: &Connection) -> Result<(), DatabaseError> {
    let current_version = get_current_version(conn);

    let migrations: Vec<(i64, &str)> = vec![
        (1, include_str!("../../resources/migrations/001_initial.sql")),
        (2, include_str!("../../resources/migrations/002_referral_seen.sql")),
    ];

    for (version, sql) in migrations {
        if version > current_version {
            tracing::info!("Running migration v{version}");
            conn.execute_batch(sql).map_err(|e| DatabaseError::MigrationFailed {
                version,
                reason: e.to_string(),
            })?;
        }
    }

    Ok(())
}

/// Get the current schema version (0 if no schema exists yet)
fn get_current_version(conn: &Connection) -> i64 {
    conn.query_row(
        "SELECT MAX(version) FROM schema_version",
        [],
        |row| row.get::<_, i64>(0),
    )
    .unwrap_or(0)
}

/// Count tables in the database (for verification)
pub fn count_tables(conn: &Connection) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        [],
        |row| row.get::<_, i64>(0),
    )?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_initializes_all_tables() {
        let conn = open_memory_database().unwrap();
        // schema_version + users + clients
        let count = count_tables(&conn).unwrap();
        assert_eq!(count, 3, "Expected 3 tables, got {count}");
    }

    #[test]
    fn schema_version_is_current() {
        let conn = open_memory_database().unwrap();
        let version: i64 = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, 2);
    }

    #[test]
    fn migration_idempotent() {
        let conn = open_memory_database().unwrap();
        // Run migrations again: should not error
        let result = run_migrations(&conn);
        assert!(result.is_ok());
    }

    #[test]
    fn foreign_keys_enabled() {
        let conn = open_memory_database().unwrap();
        let fk: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(fk, 1);
    }

    #[test]
    fn reopening_file_database_keeps_schema() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("clinic.db");
        drop(open_database(&path).unwrap());
        let conn = open_database(&path).unwrap();
        assert_eq!(count_tables(&conn).unwrap(), 3);
    }

    #[test]
    fn ulower_folds_non_ascii_and_keeps_null() {
        let conn = open_memory_database().unwrap();
        let (folded, null): (String, Option<String>) = conn
            .query_row("SELECT ulower('ÉLISE ÖZTÜRK'), ulower(NULL)", [], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .unwrap();
        assert_eq!(folded, "élise öztürk");
        assert_eq!(null, None);
    }

    #[test]
    fn age_check_constraint_enforced() {
        let conn = open_memory_database().unwrap();
        conn.execute(
            "INSERT INTO users (username, user_type, password_hash, password_salt, created_at)
             VALUES ('doc', 'doctor', 'h', 's', '2026-01-01 00:00:00.000000')",
            [],
        )
        .unwrap();
        let result = conn.execute(
            "INSERT INTO clients (first_name, last_name, age, phone, gender, created_by,
             created_at, updated_at)
             VALUES ('A', 'B', 0, '+251912345678', 'M', 1, 'x', 'x')",
            [],
        );
        assert!(result.is_err());
    }
}
