use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::enums::UserType;

/// Staff account. Password material never leaves the repository layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub phone: Option<String>,
    pub user_type: UserType,
    pub is_superuser: bool,
    pub created_at: NaiveDateTime,
}

/// Insert payload for a staff account; `password_hash`/`password_salt`
/// are base64 strings produced by `crypto::password`.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub phone: Option<String>,
    pub user_type: UserType,
    pub is_superuser: bool,
    pub password_hash: String,
    pub password_salt: String,
}

/// Stored password material for a login check.
#[derive(Debug, Clone)]
pub struct StoredCredentials {
    pub user_id: i64,
    pub password_hash: String,
    pub password_salt: String,
}

/// Minimal doctor listing for the referral picker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorSummary {
    pub id: i64,
    pub username: String,
}
