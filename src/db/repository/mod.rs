//! Repository layer: entity-scoped database operations.
//!
//! One sub-module per table. All public functions are re-exported here.

mod client;
mod user;

// Re-export all public items from sub-modules
pub use client::*;
pub use user::*;

/// Map a UNIQUE/CHECK/FK failure to `ConstraintViolation`, everything else
/// to `Sqlite`.
pub(crate) fn map_constraint(err: rusqlite::Error, what: &str) -> super::DatabaseError {
    match &err {
        rusqlite::Error::SqliteFailure(code, _)
            if code.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            super::DatabaseError::ConstraintViolation(what.to_string())
        }
        _ => super::DatabaseError::Sqlite(err),
    }
}
