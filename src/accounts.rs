//! Staff accounts: receptionist signup, login check, bootstrap superuser.

use rusqlite::Connection;

use crate::authorization::{authorize, AccessError, Caller, Operation};
use crate::config::BootstrapAdmin;
use crate::crypto::{hash_password, verify_password, CryptoError, PasswordRecord};
use crate::db::{self, DatabaseError};
use crate::models::{NewUser, User, UserType};
use crate::validation::{validate_signup, FieldErrors, SignupForm};

#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error("Invalid account data")]
    Validation(FieldErrors),
    /// Same message for unknown user and wrong password.
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

/// Create a receptionist account. Only doctors may do this.
pub fn sign_up_receptionist(
    conn: &Connection,
    caller: &Caller,
    form: &SignupForm,
) -> Result<User, AccountError> {
    authorize(caller, Operation::SignUpStaff)?;

    let input = validate_signup(form).map_err(AccountError::Validation)?;
    if db::username_exists(conn, &input.username)? {
        return Err(AccountError::Validation(FieldErrors::single(
            "username",
            "A user with that username already exists.",
        )));
    }

    let record = hash_password(&input.password);
    let id = db::insert_user(
        conn,
        &NewUser {
            username: input.username,
            email: input.email,
            phone: input.phone,
            user_type: UserType::Receptionist,
            is_superuser: false,
            password_hash: record.hash,
            password_salt: record.salt,
        },
    )?;

    let user = db::get_user(conn, id)?.ok_or_else(|| DatabaseError::not_found("user", id))?;
    tracing::info!(username = %user.username, by = %caller.username, "Receptionist account created");
    Ok(user)
}

/// Check a username/password pair.
pub fn authenticate(conn: &Connection, username: &str, password: &str) -> Result<User, AccountError> {
    let Some(stored) = db::get_credentials(conn, username.trim())? else {
        let _ = verify_password(password, &PasswordRecord::decoy());
        tracing::warn!("Login attempt for unknown user");
        return Err(AccountError::InvalidCredentials);
    };

    let record = PasswordRecord {
        hash: stored.password_hash,
        salt: stored.password_salt,
    };
    match verify_password(password, &record) {
        Ok(()) => {}
        Err(CryptoError::WrongPassword) => {
            tracing::warn!(user_id = stored.user_id, "Login failed: wrong password");
            return Err(AccountError::InvalidCredentials);
        }
        Err(CryptoError::CorruptedRecord) => {
            tracing::error!(user_id = stored.user_id, "Stored password record is unreadable");
            return Err(AccountError::InvalidCredentials);
        }
    }

    db::get_user(conn, stored.user_id)?.ok_or(AccountError::InvalidCredentials)
}

/// Create the first superuser when the user table is empty.
/// Returns `true` when an account was created.
pub fn bootstrap_admin(conn: &Connection, admin: &BootstrapAdmin) -> Result<bool, AccountError> {
    if db::count_users(conn)? > 0 {
        return Ok(false);
    }

    let record = hash_password(&admin.password);
    db::insert_user(
        conn,
        &NewUser {
            username: admin.username.clone(),
            email: admin.email.clone(),
            phone: None,
            user_type: UserType::Doctor,
            is_superuser: true,
            password_hash: record.hash,
            password_salt: record.salt,
        },
    )?;
    tracing::info!(username = %admin.username, "Bootstrap superuser created");
    Ok(true)
}
