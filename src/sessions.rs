//! In-memory login sessions keyed by the SHA-256 of an opaque bearer token.
//!
//! Raw tokens are handed to the client once and never stored.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Hash a bearer token string using SHA-256.
pub fn hash_token(token: &str) -> [u8; 32] {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().into()
}

/// Generate a random bearer token (URL-safe base64, 32 bytes of entropy).
pub fn generate_token() -> String {
    use base64::Engine;
    let bytes: [u8; 32] = rand::random();
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

#[derive(Debug)]
struct SessionEntry {
    user_id: i64,
    last_seen: Instant,
}

/// Token-hash → user map with an idle timeout. Each successful lookup
/// extends the session.
#[derive(Debug)]
pub struct SessionStore {
    entries: HashMap<[u8; 32], SessionEntry>,
    idle_timeout: Duration,
}

impl SessionStore {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            idle_timeout,
        }
    }

    /// Start a session for `user_id` and return the raw token.
    pub fn issue(&mut self, user_id: i64) -> String {
        if self.entries.len() > 1000 {
            self.prune();
        }
        let token = generate_token();
        self.entries.insert(
            hash_token(&token),
            SessionEntry {
                user_id,
                last_seen: Instant::now(),
            },
        );
        token
    }

    /// User behind `token`, if the session exists and has not idled out.
    pub fn resolve(&mut self, token: &str) -> Option<i64> {
        let key = hash_token(token);
        let now = Instant::now();
        let entry = self.entries.get_mut(&key)?;
        if now.duration_since(entry.last_seen) >= self.idle_timeout {
            self.entries.remove(&key);
            return None;
        }
        entry.last_seen = now;
        Some(entry.user_id)
    }

    /// Returns `true` if a session was removed.
    pub fn revoke(&mut self, token: &str) -> bool {
        self.entries.remove(&hash_token(token)).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn prune(&mut self) {
        let now = Instant::now();
        let idle = self.idle_timeout;
        self.entries
            .retain(|_, entry| now.duration_since(entry.last_seen) < idle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_is_url_safe_and_random() {
        let a = generate_token();
        let b = generate_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
        assert!(a
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn hash_is_deterministic() {
        assert_eq!(hash_token("abc"), hash_token("abc"));
        assert_ne!(hash_token("abc"), hash_token("abd"));
    }

    #[test]
    fn issue_resolve_revoke() {
        let mut store = SessionStore::new(Duration::from_secs(60));
        let token = store.issue(7);
        assert_eq!(store.resolve(&token), Some(7));
        assert_eq!(store.resolve("forged"), None);
        assert!(store.revoke(&token));
        assert!(!store.revoke(&token));
        assert_eq!(store.resolve(&token), None);
        assert!(store.is_empty());
    }

    #[test]
    fn idle_session_expires() {
        let mut store = SessionStore::new(Duration::ZERO);
        let token = store.issue(1);
        assert_eq!(store.resolve(&token), None);
        assert_eq!(store.len(), 0);
    }
}
