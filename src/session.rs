//! Admin sessions keyed by opaque bearer tokens.
//!
//! Sessions live in process memory only: a restart signs every admin out.
//! Expired entries are dropped when touched or during the sweep that runs
//! before each new session is created. There is no background timer.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use rand::RngCore;

use crate::error::AppError;

pub const SESSION_TTL_HOURS: i64 = 8;
pub const TOKEN_BYTES: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminSession {
    pub token: String,
    pub username: String,
    pub expires_at: DateTime<Utc>,
}

impl AdminSession {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Storage for admin sessions. Every method takes the current time so
/// expiry is decided by the caller's clock.
pub trait SessionStore: Send + Sync {
    fn create(&self, username: &str, now: DateTime<Utc>) -> Result<AdminSession, AppError>;

    /// Returns the live session for `token`. An expired entry is removed and
    /// reported as absent.
    fn lookup(&self, token: &str, now: DateTime<Utc>) -> Result<Option<AdminSession>, AppError>;

    fn revoke(&self, token: &str) -> Result<(), AppError>;

    /// Drops every expired session, returning how many were removed.
    fn sweep_expired(&self, now: DateTime<Utc>) -> Result<usize, AppError>;
}

pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub struct MemorySessionStore {
    ttl: Duration,
    sessions: Mutex<HashMap<String, AdminSession>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::with_ttl(Duration::hours(SESSION_TTL_HOURS))
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        MemorySessionStore {
            ttl,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> Result<usize, AppError> {
        Ok(self.sessions.lock()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, AppError> {
        Ok(self.len()? == 0)
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore for MemorySessionStore {
    fn create(&self, username: &str, now: DateTime<Utc>) -> Result<AdminSession, AppError> {
        let mut sessions = self.sessions.lock()?;
        sessions.retain(|_, session| !session.is_expired(now));

        let session = AdminSession {
            token: generate_token(),
            username: username.to_string(),
            expires_at: now + self.ttl,
        };
        sessions.insert(session.token.clone(), session.clone());

        Ok(session)
    }

    fn lookup(&self, token: &str, now: DateTime<Utc>) -> Result<Option<AdminSession>, AppError> {
        let mut sessions = self.sessions.lock()?;

        match sessions.get(token) {
            Some(session) if session.is_expired(now) => {
                sessions.remove(token);
                Ok(None)
            }
            Some(session) => Ok(Some(session.clone())),
            None => Ok(None),
        }
    }

    fn revoke(&self, token: &str) -> Result<(), AppError> {
        self.sessions.lock()?.remove(token);
        Ok(())
    }

    fn sweep_expired(&self, now: DateTime<Utc>) -> Result<usize, AppError> {
        let mut sessions = self.sessions.lock()?;
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired(now));
        Ok(before - sessions.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_is_64_hex_chars() {
        let token = generate_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(token, generate_token());
    }

    #[test]
    fn test_session_expires_after_eight_hours() {
        let store = MemorySessionStore::new();
        let t = Utc::now();
        let session = store.create("admin", t).unwrap();

        let early = t + Duration::hours(7) + Duration::minutes(59);
        let late = t + Duration::hours(8) + Duration::minutes(1);

        assert_eq!(
            store.lookup(&session.token, early).unwrap().map(|s| s.username),
            Some("admin".to_string())
        );
        assert!(store.lookup(&session.token, late).unwrap().is_none());
        // the expired entry was dropped on access
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_revoked_token_stays_rejected() {
        let store = MemorySessionStore::new();
        let now = Utc::now();
        let session = store.create("admin", now).unwrap();

        store.revoke(&session.token).unwrap();
        assert!(store.lookup(&session.token, now).unwrap().is_none());
        assert!(store.lookup(&session.token, now).unwrap().is_none());

        // revoking again is a no-op
        store.revoke(&session.token).unwrap();
        store.revoke("never-issued").unwrap();
    }

    #[test]
    fn test_create_sweeps_expired_sessions() {
        let store = MemorySessionStore::with_ttl(Duration::minutes(10));
        let t = Utc::now();

        store.create("admin", t).unwrap();
        store.create("admin", t).unwrap();
        assert_eq!(store.len().unwrap(), 2);

        store.create("admin", t + Duration::minutes(11)).unwrap();
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn test_poisoned_store_reports_errors() {
        let store = std::sync::Arc::new(MemorySessionStore::new());
        let now = Utc::now();
        store.create("admin", now).unwrap();

        let poisoner = store.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.sessions.lock().unwrap();
            panic!("poison the session map");
        })
        .join();

        assert!(matches!(store.len(), Err(AppError::Unexpected(_))));
        assert!(store.is_empty().is_err());
        assert!(store.lookup("anything", now).is_err());
    }

    #[test]
    fn test_sweep_expired() {
        let store = MemorySessionStore::with_ttl(Duration::minutes(5));
        let t = Utc::now();

        store.create("admin", t).unwrap();
        store.create("admin", t + Duration::minutes(3)).unwrap();

        assert_eq!(store.sweep_expired(t + Duration::minutes(6)).unwrap(), 1);
        assert_eq!(store.sweep_expired(t + Duration::minutes(6)).unwrap(), 0);
        assert_eq!(store.len().unwrap(), 1);
    }
}
