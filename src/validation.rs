//! Input validation shared by every entry point that accepts client or
//! staff data.
//!
//! Phone numbers have exactly one canonical shape, `+2519` followed by
//! eight digits. Registration, the medical edit and staff signup all go
//! through `normalize_phone`.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::models::{ClientIdentity, Gender, MedicalUpdate};

pub const PHONE_PREFIX: &str = "+2519";
pub const PHONE_SUFFIX_LEN: usize = 8;
pub const PHONE_LEN: usize = PHONE_PREFIX.len() + PHONE_SUFFIX_LEN;

pub const MIN_AGE: u8 = 1;
pub const MAX_AGE: u8 = 120;

const NAME_MAX_CHARS: usize = 100;
const EMAIL_MAX_CHARS: usize = 254;
const USERNAME_MAX_CHARS: usize = 150;
const PASSWORD_MIN_CHARS: usize = 8;

const REQUIRED: &str = "This field is required.";

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());

static USERNAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w.@+-]+$").unwrap());

// ═══════════════════════════════════════════════════════════
// Field errors
// ═══════════════════════════════════════════════════════════

/// Per-field validation messages, keyed by form field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(transparent)]
#[error("{} field(s) failed validation", .0.len())]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-field error.
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn messages(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    fn finish<T>(self, value: Option<T>) -> Result<T, FieldErrors> {
        match value {
            Some(v) if self.is_empty() => Ok(v),
            _ => Err(self),
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Phone
// ═══════════════════════════════════════════════════════════

/// Canonicalise a phone number to `+2519XXXXXXXX`.
///
/// Accepts the full form or the bare 8-digit suffix. Spaces, dashes and
/// parentheses are ignored.
pub fn normalize_phone(input: &str) -> Result<String, &'static str> {
    let cleaned: String = input
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '-' | '(' | ')'))
        .collect();

    if cleaned.is_empty() {
        return Err("Phone number is required");
    }

    let (suffix, full_form) = if cleaned.starts_with('+') {
        match cleaned.strip_prefix(PHONE_PREFIX) {
            Some(rest) => (rest, true),
            None => return Err("Phone number must start with +2519"),
        }
    } else {
        (cleaned.as_str(), false)
    };

    if !suffix.chars().all(|c| c.is_ascii_digit()) {
        return Err("Phone number must contain only digits");
    }
    if suffix.len() != PHONE_SUFFIX_LEN {
        return Err(if full_form {
            "Phone number must be 13 characters including +2519"
        } else {
            "Please enter exactly 8 digits"
        });
    }

    Ok(format!("{PHONE_PREFIX}{suffix}"))
}

/// The 8-digit suffix of a canonical phone number.
pub fn phone_suffix(canonical: &str) -> Option<&str> {
    canonical
        .strip_prefix(PHONE_PREFIX)
        .filter(|s| s.len() == PHONE_SUFFIX_LEN && s.chars().all(|c| c.is_ascii_digit()))
}

// ═══════════════════════════════════════════════════════════
// Client forms
// ═══════════════════════════════════════════════════════════

/// Raw client registration form, as submitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientForm {
    pub first_name: String,
    pub last_name: String,
    pub age: String,
    pub email: String,
    pub phone: String,
    pub gender: String,
}

/// Raw medical edit form. `phone` may hold the suffix only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MedicalForm {
    pub first_name: String,
    pub last_name: String,
    pub age: String,
    pub email: String,
    pub phone: String,
    pub gender: String,
    pub diagnosis: String,
    pub treatment_plan: String,
    pub prescriptions: String,
    pub doctor_notes: String,
}

impl MedicalForm {
    fn identity_form(&self) -> ClientForm {
        ClientForm {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            age: self.age.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            gender: self.gender.clone(),
        }
    }

    /// Pre-filled form for an existing client; the phone shows its suffix.
    pub fn from_client(client: &crate::models::Client) -> Self {
        Self {
            first_name: client.first_name.clone(),
            last_name: client.last_name.clone(),
            age: client.age.to_string(),
            email: client.email.clone().unwrap_or_default(),
            phone: phone_suffix(&client.phone)
                .unwrap_or(&client.phone)
                .to_string(),
            gender: client.gender.as_str().to_string(),
            diagnosis: client.diagnosis.clone(),
            treatment_plan: client.treatment_plan.clone(),
            prescriptions: client.prescriptions.clone(),
            doctor_notes: client.doctor_notes.clone(),
        }
    }
}

fn check_name(field: &str, raw: &str, errors: &mut FieldErrors) -> Option<String> {
    let value = raw.trim();
    if value.is_empty() {
        errors.add(field, REQUIRED);
        return None;
    }
    if value.chars().count() > NAME_MAX_CHARS {
        errors.add(
            field,
            format!("Ensure this value has at most {NAME_MAX_CHARS} characters."),
        );
        return None;
    }
    Some(value.to_string())
}

/// Age must be a whole number in [1, 120].
pub fn check_age(raw: &str) -> Result<u8, &'static str> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(REQUIRED);
    }
    let age: i64 = raw.parse().map_err(|_| "Enter a whole number.")?;
    if age < i64::from(MIN_AGE) || age > i64::from(MAX_AGE) {
        return Err("Age must be between 1 and 120.");
    }
    Ok(age as u8)
}

fn check_email(raw: &str, required: bool, errors: &mut FieldErrors) -> Option<Option<String>> {
    let value = raw.trim();
    if value.is_empty() {
        if required {
            errors.add("email", REQUIRED);
            return None;
        }
        return Some(None);
    }
    if value.chars().count() > EMAIL_MAX_CHARS || !EMAIL_PATTERN.is_match(value) {
        errors.add("email", "Enter a valid email address.");
        return None;
    }
    Some(Some(value.to_string()))
}

fn check_identity(form: &ClientForm, errors: &mut FieldErrors) -> Option<ClientIdentity> {
    let first_name = check_name("first_name", &form.first_name, errors);
    let last_name = check_name("last_name", &form.last_name, errors);

    let age = check_age(&form.age)
        .map_err(|msg| errors.add("age", msg))
        .ok();

    let email = check_email(&form.email, false, errors);

    let phone = normalize_phone(&form.phone)
        .map_err(|msg| errors.add("phone", msg))
        .ok();

    let gender = match form.gender.trim() {
        "" => {
            errors.add("gender", REQUIRED);
            None
        }
        raw => raw
            .parse::<Gender>()
            .map_err(|_| errors.add("gender", "Select a valid choice."))
            .ok(),
    };

    Some(ClientIdentity {
        first_name: first_name?,
        last_name: last_name?,
        age: age?,
        email: email?,
        phone: phone?,
        gender: gender?,
    })
}

/// Validate a registration form.
pub fn validate_client(form: &ClientForm) -> Result<ClientIdentity, FieldErrors> {
    let mut errors = FieldErrors::new();
    let identity = check_identity(form, &mut errors);
    errors.finish(identity)
}

/// Validate a medical edit form. Free-text findings are trimmed and may be empty.
pub fn validate_medical(form: &MedicalForm) -> Result<MedicalUpdate, FieldErrors> {
    let mut errors = FieldErrors::new();
    let identity = check_identity(&form.identity_form(), &mut errors);
    let update = identity.map(|identity| MedicalUpdate {
        identity,
        diagnosis: form.diagnosis.trim().to_string(),
        treatment_plan: form.treatment_plan.trim().to_string(),
        prescriptions: form.prescriptions.trim().to_string(),
        doctor_notes: form.doctor_notes.trim().to_string(),
    });
    errors.finish(update)
}

// ═══════════════════════════════════════════════════════════
// Staff signup form
// ═══════════════════════════════════════════════════════════

/// Raw signup form. Passwords are never echoed back.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SignupForm {
    pub username: String,
    pub email: String,
    pub phone: String,
    #[serde(skip_serializing)]
    pub password1: String,
    #[serde(skip_serializing)]
    pub password2: String,
}

/// Signup input after shape checks (uniqueness is checked by `accounts`).
#[derive(Debug, Clone)]
pub struct SignupInput {
    pub username: String,
    pub email: String,
    pub phone: Option<String>,
    pub password: String,
}

pub fn validate_signup(form: &SignupForm) -> Result<SignupInput, FieldErrors> {
    let mut errors = FieldErrors::new();

    let username = form.username.trim();
    let username = if username.is_empty() {
        errors.add("username", REQUIRED);
        None
    } else if username.chars().count() > USERNAME_MAX_CHARS
        || !USERNAME_PATTERN.is_match(username)
    {
        errors.add(
            "username",
            "Enter a valid username. Use at most 150 letters, digits and @/./+/-/_ characters.",
        );
        None
    } else {
        Some(username.to_string())
    };

    let email = check_email(&form.email, true, &mut errors).flatten();

    let phone = if form.phone.trim().is_empty() {
        Some(None)
    } else {
        normalize_phone(&form.phone)
            .map(Some)
            .map_err(|msg| errors.add("phone", msg))
            .ok()
    };

    let password = if form.password1.is_empty() {
        errors.add("password1", REQUIRED);
        None
    } else if form.password1 != form.password2 {
        errors.add("password2", "The two password fields didn't match.");
        None
    } else {
        let mut ok = true;
        if form.password1.chars().count() < PASSWORD_MIN_CHARS {
            errors.add(
                "password1",
                "This password is too short. It must contain at least 8 characters.",
            );
            ok = false;
        }
        if form.password1.chars().all(|c| c.is_ascii_digit()) {
            errors.add("password1", "This password is entirely numeric.");
            ok = false;
        }
        ok.then(|| form.password1.clone())
    };

    let input = match (username, email, phone, password) {
        (Some(username), Some(email), Some(phone), Some(password)) => Some(SignupInput {
            username,
            email,
            phone,
            password,
        }),
        _ => None,
    };
    errors.finish(input)
}
