use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use super::CryptoError;

/// Reduced under test builds so handler tests stay fast.
pub const PBKDF2_ITERATIONS: u32 = if cfg!(test) { 1_000 } else { 600_000 };
pub const HASH_LENGTH: usize = 32;
pub const SALT_LENGTH: usize = 16;

const ALGORITHM: &str = "pbkdf2_sha256";

/// Stored form of a password: `pbkdf2_sha256$<iterations>$<base64 hash>`
/// plus a base64 salt kept in its own column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordRecord {
    pub hash: String,
    pub salt: String,
}

impl PasswordRecord {
    /// Well-formed record that no password matches. Checking against it
    /// costs the same as checking a real record.
    pub fn decoy() -> Self {
        Self {
            hash: format!(
                "{ALGORITHM}${PBKDF2_ITERATIONS}${}",
                STANDARD.encode([0u8; HASH_LENGTH])
            ),
            salt: STANDARD.encode([0u8; SALT_LENGTH]),
        }
    }
}

fn derive(password: &str, salt: &[u8], iterations: u32) -> [u8; HASH_LENGTH] {
    let mut out = [0u8; HASH_LENGTH];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut out);
    out
}

/// Generate a cryptographically random salt
pub fn generate_salt() -> [u8; SALT_LENGTH] {
    use rand::RngCore;
    let mut salt = [0u8; SALT_LENGTH];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}

/// Hash a password with a fresh random salt.
pub fn hash_password(password: &str) -> PasswordRecord {
    hash_password_with(password, &generate_salt(), PBKDF2_ITERATIONS)
}

fn hash_password_with(password: &str, salt: &[u8], iterations: u32) -> PasswordRecord {
    let mut derived = derive(password, salt, iterations);
    let record = PasswordRecord {
        hash: format!("{ALGORITHM}${iterations}${}", STANDARD.encode(derived)),
        salt: STANDARD.encode(salt),
    };
    derived.zeroize();
    record
}

/// Check a password against a stored record in constant time.
pub fn verify_password(password: &str, record: &PasswordRecord) -> Result<(), CryptoError> {
    let mut parts = record.hash.splitn(3, '$');
    let (Some(ALGORITHM), Some(iterations), Some(expected)) =
        (parts.next(), parts.next(), parts.next())
    else {
        return Err(CryptoError::CorruptedRecord);
    };

    let iterations: u32 = iterations
        .parse()
        .map_err(|_| CryptoError::CorruptedRecord)?;
    let expected = STANDARD
        .decode(expected)
        .map_err(|_| CryptoError::CorruptedRecord)?;
    let salt = STANDARD
        .decode(&record.salt)
        .map_err(|_| CryptoError::CorruptedRecord)?;

    let mut derived = derive(password, &salt, iterations);
    let matches: bool = derived.as_slice().ct_eq(expected.as_slice()).into();
    derived.zeroize();

    if matches {
        Ok(())
    } else {
        Err(CryptoError::WrongPassword)
    }
}
